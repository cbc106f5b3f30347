//! Named convention queries registered per repository.

use crate::query::builder::{QueryDescriptor, QueryForm};
use crate::repo::error::DerivationReason;
use std::collections::BTreeMap;

/// Lookup table from a stable query key to its prepared descriptor.
#[derive(Debug, Default)]
pub struct QueryRegistry {
    queries: BTreeMap<String, QueryDescriptor>,
}

impl QueryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `descriptor` under `key`. Keys cannot be re-registered.
    pub fn insert(
        &mut self,
        key: impl Into<String>,
        descriptor: QueryDescriptor,
    ) -> Result<(), DerivationReason> {
        let key = key.into();
        if self.queries.contains_key(&key) {
            return Err(DerivationReason::AlreadyRegistered);
        }
        self.queries.insert(key, descriptor);
        Ok(())
    }

    /// Returns the descriptor for `key` if it was registered with `form`.
    pub fn lookup(&self, key: &str, form: QueryForm) -> Result<&QueryDescriptor, DerivationReason> {
        let descriptor = self
            .queries
            .get(key)
            .ok_or(DerivationReason::UnknownQuery)?;
        if descriptor.form() != form {
            return Err(DerivationReason::FormMismatch {
                registered: descriptor.form(),
                requested: form,
            });
        }
        Ok(descriptor)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.queries.keys().map(String::as_str)
    }
}
