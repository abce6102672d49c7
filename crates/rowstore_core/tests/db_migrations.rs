use rowstore_core::db::migrations::latest_version;
use rowstore_core::db::{open_db, open_db_in_memory, DbError};
use rowstore_core::{RepoError, SqliteRowRepository};
use rusqlite::Connection;

#[test]
fn open_db_in_memory_applies_all_migrations() {
    let conn = open_db_in_memory().unwrap();

    assert_eq!(schema_version(&conn), latest_version());
    assert_table_exists(&conn, "files");
    assert_table_exists(&conn, "file_rows");
    assert_index_exists(&conn, "idx_file_rows_file_position");
}

#[test]
fn opening_same_database_twice_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("rowstore.db");

    let conn_first = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn_first), latest_version());
    drop(conn_first);

    let conn_second = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn_second), latest_version());
    assert_table_exists(&conn_second, "file_rows");
}

#[test]
fn opening_database_with_newer_schema_version_returns_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.db");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("PRAGMA user_version = 999;").unwrap();
    drop(conn);

    let err = open_db(&path).unwrap_err();
    match err {
        DbError::UnsupportedSchemaVersion {
            db_version,
            latest_supported,
        } => {
            assert_eq!(db_version, 999);
            assert_eq!(latest_supported, latest_version());
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn repository_rejects_unmigrated_connection() {
    let conn = Connection::open_in_memory().unwrap();

    let err = SqliteRowRepository::try_new(&conn).err().unwrap();
    assert!(matches!(
        err,
        RepoError::UninitializedConnection {
            expected_version,
            actual_version: 0,
        } if expected_version == latest_version()
    ));
}

#[test]
fn position_index_rejects_duplicate_positions_in_one_file() {
    let conn = open_db_in_memory().unwrap();
    conn.execute_batch(
        "INSERT INTO files (file_uuid, display_name) VALUES ('f1', 'one'), ('f2', 'two');
         INSERT INTO file_rows (row_uuid, file_uuid, position, content) VALUES ('r1', 'f1', 1.0, 'a');
         INSERT INTO file_rows (row_uuid, file_uuid, position, content) VALUES ('r2', 'f2', 1.0, 'b');",
    )
    .unwrap();

    let duplicate = conn.execute(
        "INSERT INTO file_rows (row_uuid, file_uuid, position, content) VALUES ('r3', 'f1', 1.0, 'c');",
        [],
    );
    assert!(duplicate.is_err());
}

#[test]
fn deleting_file_cascades_to_rows() {
    let conn = open_db_in_memory().unwrap();
    conn.execute_batch(
        "INSERT INTO files (file_uuid, display_name) VALUES ('f1', 'one');
         INSERT INTO file_rows (row_uuid, file_uuid, position, content) VALUES ('r1', 'f1', 1.0, 'a');
         DELETE FROM files WHERE file_uuid = 'f1';",
    )
    .unwrap();

    let remaining: i64 = conn
        .query_row("SELECT COUNT(*) FROM file_rows;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(remaining, 0);
}

fn schema_version(conn: &Connection) -> u32 {
    conn.query_row("PRAGMA user_version;", [], |row| row.get(0))
        .unwrap()
}

fn assert_table_exists(conn: &Connection, table_name: &str) {
    assert_schema_object(conn, "table", table_name);
}

fn assert_index_exists(conn: &Connection, index_name: &str) {
    assert_schema_object(conn, "index", index_name);
}

fn assert_schema_object(conn: &Connection, kind: &str, name: &str) {
    let exists: i64 = conn
        .query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = ?1 AND name = ?2
            );",
            [kind, name],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(exists, 1, "{kind} {name} does not exist");
}
