//! Demo entry point for the repository engine.
//!
//! # Responsibility
//! - Show concrete repositories composed from `MimicRepository`.
//! - Keep output deterministic for quick local sanity checks.
//!
//! Usage: `mimic_cli [DB_PATH]`. Without a path the default in-memory unit is used.

use log::error;
use mimic_core::{
    default_log_level, init_logging, register_unit, Attribute, AttributeKind, CrudRepository,
    Entity, EntitySchema, LogTarget, MimicRepository, PersistenceUnit, RepoResult, Storage,
    DEFAULT_UNIT_NAME,
};
use rusqlite::Row;
use std::path::PathBuf;
use std::process::ExitCode;

const FILE_UNIT_NAME: &str = "mimic-cli";

#[derive(Debug, Clone)]
struct Person {
    id: Option<i64>,
    name: String,
    birth_year: i64,
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

#[derive(Debug, Clone)]
struct Item {
    id: Option<i64>,
    name: String,
}

impl Entity for Item {
    fn schema() -> EntitySchema<Self> {
        EntitySchema::new("Item")
            .attribute(Attribute::id("id", AttributeKind::Integer).generated())
            .attribute(Attribute::new("name", AttributeKind::Text).not_null())
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

struct ItemRepository {
    inner: MimicRepository<Item, i64>,
}

impl ItemRepository {
    const FIND_BY_NAME: &'static str = "findByName";

    fn open(unit: &str) -> RepoResult<Self> {
        let mut inner = MimicRepository::open(unit)?;
        inner.register_query(Self::FIND_BY_NAME)?;
        Ok(Self { inner })
    }

    fn find_by_name(&self, name: &str) -> RepoResult<Vec<Item>> {
        self.inner.find_by(Self::FIND_BY_NAME, &[&name])
    }
}

/// People repository with its query methods.
struct PersonRepository {
    inner: MimicRepository<Person, i64>,
}

impl PersonRepository {
    const FIND_BY_NAME: &'static str = "findByName";
    const FIND_BY_NAME_AND_BIRTH_YEAR: &'static str = "findByNameAndBirthYear";
    const COUNT_BY_BIRTH_YEAR: &'static str = "countByBirthYear";

    fn open(unit: &str) -> RepoResult<Self> {
        let mut inner = MimicRepository::open(unit)?;
        inner.register_query(Self::FIND_BY_NAME)?;
        inner.register_query(Self::FIND_BY_NAME_AND_BIRTH_YEAR)?;
        inner.register_query(Self::COUNT_BY_BIRTH_YEAR)?;
        Ok(Self { inner })
    }

    fn find_by_name(&self, name: &str) -> RepoResult<Vec<Person>> {
        self.inner.find_by(Self::FIND_BY_NAME, &[&name])
    }

    fn find_by_name_and_birth_year(&self, name: &str, birth_year: i64) -> RepoResult<Vec<Person>> {
        self.inner
            .find_by(Self::FIND_BY_NAME_AND_BIRTH_YEAR, &[&name, &birth_year])
    }

    fn count_by_birth_year(&self, birth_year: i64) -> RepoResult<u64> {
        self.inner.count_by(Self::COUNT_BY_BIRTH_YEAR, &[&birth_year])
    }
}

fn main() -> ExitCode {
    if let Err(err) = init_logging(default_log_level(), LogTarget::Stderr) {
        eprintln!("logging disabled: {err}");
    }

    let unit = match std::env::args_os().nth(1).map(PathBuf::from) {
        Some(path) => {
            let unit = PersistenceUnit::new(FILE_UNIT_NAME, Storage::File(path));
            if let Err(err) = register_unit(unit) {
                eprintln!("cannot register unit: {err}");
                return ExitCode::FAILURE;
            }
            FILE_UNIT_NAME
        }
        None => DEFAULT_UNIT_NAME,
    };

    match run(unit) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("event=cli_run module=cli status=error error_code={} error={err}", err.code());
            eprintln!("mimic_cli failed: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(unit: &str) -> RepoResult<()> {
    let mut people = PersonRepository::open(unit)?;
    println!("mimic_core version={}", mimic_core::core_version());

    for (name, birth_year) in [("IU", 1993), ("IU", 1995), ("Taeyeon", 1989)] {
        let saved = people.inner.save(Person {
            id: None,
            name: name.to_string(),
            birth_year,
        })?;
        println!("saved id={:?} name={} birth_year={}", saved.id, saved.name, saved.birth_year);
    }

    println!("count={}", people.inner.count()?);
    println!("find_by_name(IU)={}", people.find_by_name("IU")?.len());
    for person in people.find_by_name_and_birth_year("IU", 1995)? {
        println!("find_by_name_and_birth_year(IU,1995) id={:?}", person.id);
    }
    println!("count_by_birth_year(1993)={}", people.count_by_birth_year(1993)?);

    people.inner.delete_all()?;
    println!("count_after_delete_all={}", people.inner.count()?);

    let mut items = ItemRepository::open(unit)?;
    let mut jean = items.inner.save(Item {
        id: None,
        name: "black jean".to_string(),
    })?;
    jean.name = "blue jean".to_string();
    let jean = items.inner.save(jean)?;
    println!("item id={:?} name={}", jean.id, jean.name);
    println!("find_by_name(black jean)={}", items.find_by_name("black jean")?.len());
    println!("find_by_name(blue jean)={}", items.find_by_name("blue jean")?.len());
    if let Some(id) = jean.id {
        items.inner.delete_by_id(id)?;
    }
    println!("item_count_after_delete_by_id={}", items.inner.count()?);
    Ok(())
}
