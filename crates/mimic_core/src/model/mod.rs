//! Entity shape declarations and resolved metadata.
//!
//! # Responsibility
//! - Define the capability every managed entity type implements.
//! - Validate identifier invariants once per repository instance.
//!
//! # Invariants
//! - Every entity has exactly one identifier attribute with an accessor.

pub mod metadata;
pub mod schema;
