//! Entity metadata resolution.
//!
//! # Responsibility
//! - Validate an [`EntitySchema`] once and turn it into resolved metadata.
//! - Own the identifier accessor used by `save` and `delete_by_id`.
//!
//! # Invariants
//! - Exactly one attribute is the identifier.
//! - Every attribute, identifier included, has an accessor.
//! - Resolution is pure over the schema: the same type always yields the
//!   same identifier attribute.

use crate::model::schema::{
    is_valid_name, storage_name, Accessor, Attribute, AttributeKind, Entity, EntitySchema,
    IdAssigner,
};
use crate::repo::error::{InitReason, RepoError, RepoResult};
use rusqlite::types::Value;
use std::collections::BTreeSet;

/// One attribute paired with its storage column and accessor.
pub struct MappedAttribute<E> {
    pub attribute: Attribute,
    pub column: String,
    pub accessor: Accessor<E>,
}

/// Resolved, immutable description of one entity type.
pub struct EntityMetadata<E> {
    entity_name: &'static str,
    table_name: String,
    identifier_index: usize,
    attributes: Vec<MappedAttribute<E>>,
    id_assigner: Option<IdAssigner<E>>,
}

impl<E: Entity> EntityMetadata<E> {
    /// Resolves metadata from the entity's declared schema.
    pub fn resolve() -> RepoResult<Self> {
        Self::from_schema(E::schema())
    }
}

impl<E> EntityMetadata<E> {
    /// Validates `schema` and builds metadata from it.
    pub fn from_schema(schema: EntitySchema<E>) -> RepoResult<Self> {
        let entity = schema.name();
        let fail = |reason: InitReason| RepoError::Initialization { entity, reason };

        if !is_valid_name(entity) {
            return Err(fail(InitReason::InvalidName(entity.to_string())));
        }

        let mut seen = BTreeSet::new();
        let mut columns = BTreeSet::new();
        for attribute in schema.attributes() {
            if !is_valid_name(attribute.name) {
                return Err(fail(InitReason::InvalidName(attribute.name.to_string())));
            }
            if !seen.insert(attribute.name) {
                return Err(fail(InitReason::DuplicateAttribute(attribute.name)));
            }
            let column = attribute.column_name();
            if columns.contains(&column) {
                return Err(fail(InitReason::DuplicateColumn(column)));
            }
            columns.insert(column);
        }

        let identifiers: Vec<usize> = schema
            .attributes()
            .iter()
            .enumerate()
            .filter(|(_, attribute)| attribute.identifier)
            .map(|(index, _)| index)
            .collect();
        let identifier_index = match identifiers.as_slice() {
            [] => return Err(fail(InitReason::NoIdentifier)),
            [index] => *index,
            _ => return Err(fail(InitReason::MultipleIdentifiers)),
        };

        let mut attributes = Vec::with_capacity(schema.attributes().len());
        for (index, attribute) in schema.attributes().iter().enumerate() {
            let Some(accessor) = schema.accessor_for(attribute.name) else {
                let reason = if index == identifier_index {
                    InitReason::NoIdentifierAccessor
                } else {
                    InitReason::NoAttributeAccessor(attribute.name)
                };
                return Err(fail(reason));
            };
            attributes.push(MappedAttribute {
                attribute: attribute.clone(),
                column: attribute.column_name(),
                accessor,
            });
        }

        Ok(Self {
            entity_name: entity,
            table_name: storage_name(entity),
            identifier_index,
            attributes,
            id_assigner: schema.assigner(),
        })
    }

    pub fn entity_name(&self) -> &'static str {
        self.entity_name
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    pub fn identifier(&self) -> &MappedAttribute<E> {
        &self.attributes[self.identifier_index]
    }

    /// All attributes in declaration order, identifier included.
    pub fn attributes(&self) -> &[MappedAttribute<E>] {
        &self.attributes
    }

    /// Attributes other than the identifier, in declaration order.
    pub fn value_attributes(&self) -> impl Iterator<Item = &MappedAttribute<E>> {
        self.attributes
            .iter()
            .filter(|mapped| !mapped.attribute.identifier)
    }

    pub fn attribute(&self, name: &str) -> Option<&MappedAttribute<E>> {
        self.attributes
            .iter()
            .find(|mapped| mapped.attribute.name == name)
    }

    /// Reads the identifier value of `entity`.
    pub fn identifier_value(&self, entity: &E) -> Value {
        (self.identifier().accessor)(entity)
    }

    /// Writes a store-generated key back into `entity`.
    ///
    /// Only integer identifiers with a registered assigner are written.
    pub fn assign_identifier(&self, entity: &mut E, key: i64) -> bool {
        match (self.identifier().attribute.kind, self.id_assigner) {
            (AttributeKind::Integer, Some(assign)) => {
                assign(entity, key);
                true
            }
            _ => false,
        }
    }

    /// Comma-separated select list aliasing every column to its attribute name.
    pub fn select_list(&self) -> String {
        self.attributes
            .iter()
            .map(|mapped| format!("\"{}\" AS \"{}\"", mapped.column, mapped.attribute.name))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Returns whether an identifier value counts as "not yet assigned".
///
/// NULL, integer zero and empty text are all treated as absent.
pub fn is_absent_identifier(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Integer(0) => true,
        Value::Text(text) => text.is_empty(),
        _ => false,
    }
}
