use rowstore_core::db::open_db_in_memory;
use rowstore_core::{
    ErrorKind, FileService, FileServiceError, RowService, RowServiceError, SqliteFileRepository,
    SqliteRowRepository,
};
use uuid::Uuid;

fn setup() -> rusqlite::Connection {
    open_db_in_memory().unwrap()
}

#[test]
fn create_file_trims_name_and_starts_empty() {
    let conn = setup();
    let service = FileService::new(SqliteFileRepository::try_new(&conn).unwrap());

    let file = service.create_file("  orders.csv \n").unwrap();
    assert_eq!(file.display_name, "orders.csv");
    assert_eq!(file.row_count, 0);
    assert!(file.created_at > 0);

    let loaded = service.get_file(file.file_id).unwrap();
    assert_eq!(loaded, file);
}

#[test]
fn create_file_rejects_blank_name() {
    let conn = setup();
    let service = FileService::new(SqliteFileRepository::try_new(&conn).unwrap());

    let err = service.create_file("   ").unwrap_err();
    assert!(matches!(err, FileServiceError::InvalidDisplayName));
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    assert!(service.list_files().unwrap().is_empty());
}

#[test]
fn list_files_reports_row_counts() {
    let conn = setup();
    let files = FileService::new(SqliteFileRepository::try_new(&conn).unwrap());
    let rows = RowService::new(SqliteRowRepository::try_new(&conn).unwrap());

    let first = files.create_file("first.csv").unwrap();
    let second = files.create_file("second.csv").unwrap();
    rows.append_rows(
        first.file_id,
        &["a".to_string(), "b".to_string(), "c".to_string()],
    )
    .unwrap();

    let listed = files.list_files().unwrap();
    assert_eq!(listed.len(), 2);
    let count_of = |id| {
        listed
            .iter()
            .find(|file| file.file_id == id)
            .map(|file| file.row_count)
            .unwrap()
    };
    assert_eq!(count_of(first.file_id), 3);
    assert_eq!(count_of(second.file_id), 0);
}

#[test]
fn delete_file_cascades_and_reports_not_found_on_retry() {
    let conn = setup();
    let files = FileService::new(SqliteFileRepository::try_new(&conn).unwrap());
    let rows = RowService::new(SqliteRowRepository::try_new(&conn).unwrap());

    let file = files.create_file("doomed.csv").unwrap();
    let row = rows.insert_before(file.file_id, 0, "only row").unwrap();

    files.delete_file(file.file_id).unwrap();

    let err = files.get_file(file.file_id).unwrap_err();
    assert!(matches!(err, FileServiceError::FileNotFound(id) if id == file.file_id));

    let err = rows.get_row(file.file_id, row.row_id).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let err = rows.list_ordered(file.file_id).unwrap_err();
    assert!(matches!(err, RowServiceError::FileNotFound(id) if id == file.file_id));

    let err = files.delete_file(file.file_id).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[test]
fn get_unknown_file_is_not_found() {
    let conn = setup();
    let service = FileService::new(SqliteFileRepository::try_new(&conn).unwrap());
    let unknown = Uuid::new_v4();

    let err = service.get_file(unknown).unwrap_err();
    assert!(matches!(err, FileServiceError::FileNotFound(id) if id == unknown));
}

#[test]
fn file_record_serializes_for_presentation_layer() {
    let conn = setup();
    let service = FileService::new(SqliteFileRepository::try_new(&conn).unwrap());
    let file = service.create_file("export.csv").unwrap();

    let json = serde_json::to_value(&file).unwrap();
    assert_eq!(json["display_name"], "export.csv");
    assert_eq!(json["row_count"], 0);
    assert_eq!(json["file_id"], file.file_id.to_string());
}
