use super::*;

#[tokio::test]
async fn missing_key_reads_as_none() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    assert_eq!(storage.get("notes").await.expect("get"), None);
}

#[tokio::test]
async fn set_overwrites_previous_value() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    storage.set("notes", "[1]").await.expect("first write");
    storage.set("notes", "[1,2]").await.expect("second write");
    assert_eq!(
        storage.get("notes").await.expect("get").as_deref(),
        Some("[1,2]")
    );
}

#[tokio::test]
async fn memory_storage_round_trips_values() {
    let storage = MemoryStorage::with_entry("notes", "[]");
    assert_eq!(storage.get("notes").await.expect("get").as_deref(), Some("[]"));
    storage.set("notes", "[{}]").await.expect("set");
    assert_eq!(
        storage.get("notes").await.expect("get").as_deref(),
        Some("[{}]")
    );
    assert_eq!(storage.get("other").await.expect("get"), None);
}

#[test]
fn normalizes_plain_file_path_to_sqlite_url() {
    assert_eq!(
        normalize_database_url("./data/notes.db"),
        "sqlite://./data/notes.db"
    );
    assert_eq!(normalize_database_url("sqlite::memory:"), "sqlite::memory:");
    assert_eq!(
        normalize_database_url("sqlite:data\\notes.db"),
        "sqlite://data/notes.db"
    );
}

#[test]
fn memory_urls_have_no_file_path() {
    assert_eq!(sqlite_path("sqlite::memory:"), None);
    assert_eq!(sqlite_path("sqlite://file:notes?mode=memory"), None);
    assert_eq!(
        sqlite_path("sqlite://./data/notes.db?mode=rwc"),
        Some(PathBuf::from("./data/notes.db"))
    );
}

#[test]
fn prepare_creates_parent_directory() {
    let temp_root = tempfile::tempdir().expect("tempdir");
    let db_path = temp_root.path().join("nested").join("notes.db");

    let prepared = prepare_database_url(db_path.to_string_lossy().as_ref()).expect("prepare");
    assert!(prepared.starts_with("sqlite://"));
    assert!(temp_root.path().join("nested").exists());
}
