#![allow(dead_code)]

use mimic_core::{Attribute, AttributeKind, Entity, EntitySchema};
use rusqlite::Row;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Person {
    pub id: Option<i64>,
    pub name: String,
    pub birth_year: i64,
}

impl Person {
    pub fn new(name: &str, birth_year: i64) -> Self {
        Self {
            id: None,
            name: name.to_string(),
            birth_year,
        }
    }
}

impl Entity for Person {
    fn schema() -> EntitySchema<Self> {
        EntitySchema::new("Person")
            .attribute(Attribute::id("id", AttributeKind::Integer).generated())
            .attribute(Attribute::new("name", AttributeKind::Text).not_null())
            .attribute(Attribute::new("birthYear", AttributeKind::Integer).not_null())
            .accessor("id", |person: &Person| person.id.into())
            .accessor("name", |person: &Person| person.name.clone().into())
            .accessor("birthYear", |person: &Person| person.birth_year.into())
            .id_assigner(|person: &mut Person, key| person.id = Some(key))
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            name: row.get("name")?,
            birth_year: row.get("birthYear")?,
        })
    }
}

/// Item names are unique, which lets tests provoke constraint violations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    pub id: Option<i64>,
    pub name: String,
}

impl Item {
    pub fn new(name: &str) -> Self {
        Self {
            id: None,
            name: name.to_string(),
        }
    }

    pub fn change_name(&mut self, name: &str) {
        self.name = name.to_string();
    }
}

impl Entity for Item {
    fn schema() -> EntitySchema<Self> {
        EntitySchema::new("Item")
            .attribute(Attribute::id("id", AttributeKind::Integer).generated())
            .attribute(Attribute::new("name", AttributeKind::Text).not_null().unique())
            .accessor("id", |item: &Item| item.id.into())
            .accessor("name", |item: &Item| item.name.clone().into())
            .id_assigner(|item: &mut Item, key| item.id = Some(key))
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            name: row.get("name")?,
        })
    }
}

/// Caller-assigned text identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Country {
    pub code: String,
    pub name: String,
}

impl Entity for Country {
    fn schema() -> EntitySchema<Self> {
        EntitySchema::new("Country")
            .attribute(Attribute::id("code", AttributeKind::Text))
            .attribute(Attribute::new("name", AttributeKind::Text))
            .accessor("code", |country: &Country| country.code.clone().into())
            .accessor("name", |country: &Country| country.name.clone().into())
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            code: row.get("code")?,
            name: row.get("name")?,
        })
    }
}

pub struct NoIdEntity {
    pub name: String,
}

impl Entity for NoIdEntity {
    fn schema() -> EntitySchema<Self> {
        EntitySchema::new("NoIdEntity")
            .attribute(Attribute::new("name", AttributeKind::Text))
            .accessor("name", |entity: &NoIdEntity| entity.name.clone().into())
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            name: row.get("name")?,
        })
    }
}

pub struct TwoIdEntity {
    pub id: i64,
    pub other_id: i64,
}

impl Entity for TwoIdEntity {
    fn schema() -> EntitySchema<Self> {
        EntitySchema::new("TwoIdEntity")
            .attribute(Attribute::id("id", AttributeKind::Integer))
            .attribute(Attribute::id("otherId", AttributeKind::Integer))
            .accessor("id", |entity: &TwoIdEntity| entity.id.into())
            .accessor("otherId", |entity: &TwoIdEntity| entity.other_id.into())
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            other_id: row.get("otherId")?,
        })
    }
}

pub struct NoIdAccessorEntity {
    pub id: i64,
    pub name: String,
}

impl Entity for NoIdAccessorEntity {
    fn schema() -> EntitySchema<Self> {
        EntitySchema::new("NoIdAccessorEntity")
            .attribute(Attribute::id("id", AttributeKind::Integer))
            .attribute(Attribute::new("name", AttributeKind::Text))
            .accessor("name", |entity: &NoIdAccessorEntity| entity.name.clone().into())
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            name: row.get("name")?,
        })
    }
}
