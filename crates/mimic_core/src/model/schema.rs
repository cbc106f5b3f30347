//! Declarative entity schema contracts.
//!
//! # Responsibility
//! - Let an entity type describe its attributes, identifier and accessors.
//! - Provide the naming rules that map attribute names to storage names.
//!
//! # Invariants
//! - Attribute names are lowerCamelCase identifiers (`birthYear`).
//! - Storage names are the snake_case form of the declared name.
//! - A schema is plain data: building it twice yields the same shape.

use once_cell::sync::Lazy;
use regex::Regex;
use rusqlite::types::Value;
use rusqlite::Row;

static NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9]*$").expect("valid name regex"));
static WORD_BOUNDARY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([a-z0-9])([A-Z])").expect("valid boundary regex"));

/// Reads one attribute value from an entity instance.
pub type Accessor<E> = fn(&E) -> Value;

/// Writes a store-generated integer key back into an entity instance.
pub type IdAssigner<E> = fn(&mut E, i64);

/// Capability implemented by every type managed by a repository.
pub trait Entity: Sized {
    /// Returns the declarative shape of this entity type.
    fn schema() -> EntitySchema<Self>;

    /// Decodes one row whose columns are aliased to attribute names.
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self>;
}

/// Storage class of one attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeKind {
    Integer,
    Real,
    Text,
    Blob,
}

impl AttributeKind {
    pub fn sql_type(self) -> &'static str {
        match self {
            Self::Integer => "INTEGER",
            Self::Real => "REAL",
            Self::Text => "TEXT",
            Self::Blob => "BLOB",
        }
    }
}

/// One declared attribute of an entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    /// lowerCamelCase attribute name used by convention queries.
    pub name: &'static str,
    pub kind: AttributeKind,
    /// Marks the attribute that uniquely addresses an instance.
    pub identifier: bool,
    /// The store assigns the value when the instance is first persisted.
    pub generated: bool,
    pub nullable: bool,
    pub unique: bool,
}

impl Attribute {
    /// Declares a plain nullable attribute.
    pub fn new(name: &'static str, kind: AttributeKind) -> Self {
        Self {
            name,
            kind,
            identifier: false,
            generated: false,
            nullable: true,
            unique: false,
        }
    }

    /// Declares the identifier attribute.
    pub fn id(name: &'static str, kind: AttributeKind) -> Self {
        Self {
            identifier: true,
            nullable: false,
            ..Self::new(name, kind)
        }
    }

    pub fn generated(mut self) -> Self {
        self.generated = true;
        self
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Returns the storage column name for this attribute.
    pub fn column_name(&self) -> String {
        storage_name(self.name)
    }
}

/// Declarative shape of an entity type.
///
/// Attributes and accessors are declared separately so that a schema can
/// describe an identifier that nothing can read; resolution rejects it.
pub struct EntitySchema<E> {
    name: &'static str,
    attributes: Vec<Attribute>,
    accessors: Vec<(&'static str, Accessor<E>)>,
    id_assigner: Option<IdAssigner<E>>,
}

impl<E> EntitySchema<E> {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            attributes: Vec::new(),
            accessors: Vec::new(),
            id_assigner: None,
        }
    }

    pub fn attribute(mut self, attribute: Attribute) -> Self {
        self.attributes.push(attribute);
        self
    }

    pub fn accessor(mut self, attribute: &'static str, accessor: Accessor<E>) -> Self {
        self.accessors.push((attribute, accessor));
        self
    }

    pub fn id_assigner(mut self, assigner: IdAssigner<E>) -> Self {
        self.id_assigner = Some(assigner);
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    /// Returns the accessor registered for `attribute`, if any.
    pub fn accessor_for(&self, attribute: &str) -> Option<Accessor<E>> {
        self.accessors
            .iter()
            .find(|(name, _)| *name == attribute)
            .map(|(_, accessor)| *accessor)
    }

    pub fn assigner(&self) -> Option<IdAssigner<E>> {
        self.id_assigner
    }
}

/// Returns whether `name` can be used as an entity or attribute name.
pub fn is_valid_name(name: &str) -> bool {
    NAME_RE.is_match(name)
}

/// Converts a declared camelCase/PascalCase name into its snake_case storage name.
pub fn storage_name(name: &str) -> String {
    WORD_BOUNDARY_RE
        .replace_all(name, "${1}_${2}")
        .to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::{is_valid_name, storage_name, Attribute, AttributeKind};

    #[test]
    fn storage_name_converts_camel_case() {
        assert_eq!(storage_name("birthYear"), "birth_year");
        assert_eq!(storage_name("Person"), "person");
        assert_eq!(storage_name("OrderLine2Item"), "order_line2_item");
    }

    #[test]
    fn name_validation_rejects_sql_fragments() {
        assert!(is_valid_name("birthYear"));
        assert!(!is_valid_name("name; DROP TABLE"));
        assert!(!is_valid_name("1st"));
        assert!(!is_valid_name(""));
    }

    #[test]
    fn identifier_attribute_is_not_nullable() {
        let id = Attribute::id("id", AttributeKind::Integer).generated();
        assert!(id.identifier);
        assert!(id.generated);
        assert!(!id.nullable);
    }
}
