mod support;

use mimic_core::{
    create_session, register_unit, CrudRepository, DbError, InitReason, MimicRepository,
    PersistenceUnit, RepoError, SchemaMode, Storage, DEFAULT_UNIT_NAME,
};
use std::time::Duration;
use support::Item;
use tempfile::TempDir;

fn unique_unit_name(prefix: &str) -> String {
    format!("{prefix}-{}", uuid::Uuid::new_v4())
}

#[test]
fn registering_identical_unit_twice_is_accepted() {
    let name = unique_unit_name("idempotent");
    let unit = PersistenceUnit::new(name, Storage::Memory);

    register_unit(unit.clone()).unwrap();
    register_unit(unit).unwrap();
}

#[test]
fn registering_different_settings_under_same_name_conflicts() {
    let name = unique_unit_name("conflict");
    register_unit(PersistenceUnit::new(name.clone(), Storage::Memory)).unwrap();

    let err = register_unit(
        PersistenceUnit::new(name.clone(), Storage::Memory)
            .with_busy_timeout(Duration::from_millis(10)),
    )
    .unwrap_err();

    assert!(matches!(err, DbError::UnitConflict(ref conflicting) if *conflicting == name));
}

#[test]
fn invalid_unit_name_is_rejected() {
    let err = register_unit(PersistenceUnit::new("bad name!", Storage::Memory)).unwrap_err();
    assert!(matches!(err, DbError::InvalidUnit { .. }));
}

#[test]
fn unknown_unit_fails_repository_construction() {
    let result: Result<MimicRepository<Item, i64>, _> = MimicRepository::open("never-registered");

    assert!(matches!(
        result.err().unwrap(),
        RepoError::Db(DbError::UnknownUnit(ref name)) if name == "never-registered"
    ));
}

#[test]
fn default_unit_is_available_without_registration() {
    let mut repo: MimicRepository<Item, i64> = MimicRepository::open_default().unwrap();
    assert_eq!(repo.session().unit(), DEFAULT_UNIT_NAME);

    let name = format!("default-{}", uuid::Uuid::new_v4());
    let saved = repo.save(Item::new(&name)).unwrap();
    assert!(repo.find_by_id(saved.id.unwrap()).unwrap().is_some());
}

#[test]
fn shared_memory_sessions_of_one_unit_see_same_data() {
    let name = unique_unit_name("shared");
    register_unit(PersistenceUnit::new(name.clone(), Storage::SharedMemory)).unwrap();

    let mut writer: MimicRepository<Item, i64> = MimicRepository::open(&name).unwrap();
    let reader: MimicRepository<Item, i64> = MimicRepository::open(&name).unwrap();

    let saved = writer.save(Item::new("shared item")).unwrap();

    let found = reader.find_by_id(saved.id.unwrap()).unwrap().unwrap();
    assert_eq!(found.name, "shared item");
}

#[test]
fn shared_memory_units_differing_by_separator_or_case_are_isolated() {
    let base = uuid::Uuid::new_v4().simple().to_string();
    let dashed = format!("shop-{base}");
    let camel = format!("shopX{base}");
    let lower = format!("shopx{base}");
    for name in [&dashed, &camel, &lower] {
        register_unit(PersistenceUnit::new(name.clone(), Storage::SharedMemory)).unwrap();
    }

    let mut writer: MimicRepository<Item, i64> = MimicRepository::open(&dashed).unwrap();
    let camel_reader: MimicRepository<Item, i64> = MimicRepository::open(&camel).unwrap();
    let lower_reader: MimicRepository<Item, i64> = MimicRepository::open(&lower).unwrap();

    writer.save(Item::new("only in dashed unit")).unwrap();

    assert_eq!(writer.count().unwrap(), 1);
    assert_eq!(camel_reader.count().unwrap(), 0);
    assert_eq!(lower_reader.count().unwrap(), 0);
}

#[test]
fn private_memory_sessions_are_isolated() {
    let name = unique_unit_name("private");
    register_unit(PersistenceUnit::new(name.clone(), Storage::Memory)).unwrap();

    let mut first: MimicRepository<Item, i64> = MimicRepository::open(&name).unwrap();
    let second: MimicRepository<Item, i64> = MimicRepository::open(&name).unwrap();

    first.save(Item::new("only here")).unwrap();

    assert_eq!(first.count().unwrap(), 1);
    assert_eq!(second.count().unwrap(), 0);
}

#[test]
fn file_unit_persists_across_sessions() {
    let dir = TempDir::new().unwrap();
    let name = unique_unit_name("file");
    register_unit(PersistenceUnit::new(
        name.clone(),
        Storage::File(dir.path().join("items.sqlite3")),
    ))
    .unwrap();

    {
        let mut repo: MimicRepository<Item, i64> = MimicRepository::open(&name).unwrap();
        repo.save(Item::new("durable")).unwrap();
    }

    let repo: MimicRepository<Item, i64> = MimicRepository::open(&name).unwrap();
    let all = repo.find_all().unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].name, "durable");
}

#[test]
fn validate_mode_requires_existing_table() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("validated.sqlite3");
    let name = unique_unit_name("validate");
    register_unit(
        PersistenceUnit::new(name.clone(), Storage::File(path)).with_schema_mode(SchemaMode::Validate),
    )
    .unwrap();

    let result: Result<MimicRepository<Item, i64>, _> = MimicRepository::open(&name);
    assert!(matches!(
        result.err().unwrap(),
        RepoError::Initialization {
            reason: InitReason::MissingTable(_),
            ..
        }
    ));

    create_session(&name)
        .unwrap()
        .connection()
        .execute_batch("CREATE TABLE item (id INTEGER PRIMARY KEY, name TEXT NOT NULL);")
        .unwrap();

    let repo: MimicRepository<Item, i64> = MimicRepository::open(&name).unwrap();
    assert_eq!(repo.count().unwrap(), 0);
}

#[test]
fn schema_mode_none_leaves_store_untouched() {
    let name = unique_unit_name("untouched");
    register_unit(
        PersistenceUnit::new(name.clone(), Storage::Memory).with_schema_mode(SchemaMode::None),
    )
    .unwrap();

    let repo: MimicRepository<Item, i64> = MimicRepository::open(&name).unwrap();

    let err = repo.count().unwrap_err();
    assert!(matches!(err, RepoError::Crud { .. }));
}

#[test]
fn unit_deserializes_from_json_with_defaults() {
    let unit: PersistenceUnit = serde_json::from_str(
        r#"{
            "name": "catalog",
            "storage": { "kind": "file", "path": "/var/lib/catalog.sqlite3" }
        }"#,
    )
    .unwrap();

    assert_eq!(unit.name, "catalog");
    assert_eq!(
        unit.storage,
        Storage::File("/var/lib/catalog.sqlite3".into())
    );
    assert_eq!(unit.schema_mode, SchemaMode::Create);
    assert!(unit.foreign_keys);
    assert_eq!(unit.busy_timeout_ms, 5_000);
}

#[test]
fn unit_deserializes_shared_memory_and_explicit_mode() {
    let unit: PersistenceUnit = serde_json::from_str(
        r#"{
            "name": "scratch",
            "storage": { "kind": "shared_memory" },
            "schema_mode": "validate",
            "busy_timeout_ms": 250
        }"#,
    )
    .unwrap();

    assert_eq!(unit.storage, Storage::SharedMemory);
    assert_eq!(unit.schema_mode, SchemaMode::Validate);
    assert_eq!(unit.busy_timeout_ms, 250);
}
