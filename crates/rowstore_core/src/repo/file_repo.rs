//! File repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Create, read, list and delete file containers.
//!
//! # Invariants
//! - File listing is deterministic: `created_at ASC, file_uuid ASC`.
//! - Deleting a file removes all of its rows through `ON DELETE CASCADE`.

use super::error::{RepoError, RepoResult};
use super::schema::{
    ensure_connection_ready, parse_uuid, FILES_COLUMNS, FILES_TABLE, ROWS_COLUMNS, ROWS_TABLE,
};
use crate::model::file::{FileId, FileRecord};
use rusqlite::{params, Connection, Row as SqlRow};
use uuid::Uuid;

const FILE_SELECT_SQL: &str = "SELECT
    f.file_uuid AS file_uuid,
    f.display_name AS display_name,
    f.created_at AS created_at,
    (SELECT COUNT(*) FROM file_rows r WHERE r.file_uuid = f.file_uuid) AS row_count
FROM files f";

/// Repository interface for file containers.
pub trait FileRepository {
    /// Creates one empty file.
    fn create_file(&self, display_name: &str) -> RepoResult<FileRecord>;
    /// Loads one file by id.
    fn get_file(&self, file_id: FileId) -> RepoResult<Option<FileRecord>>;
    /// Lists all files in creation order.
    fn list_files(&self) -> RepoResult<Vec<FileRecord>>;
    /// Deletes one file and every row it owns.
    fn delete_file(&self, file_id: FileId) -> RepoResult<()>;
}

/// SQLite-backed file repository.
pub struct SqliteFileRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteFileRepository<'conn> {
    /// Creates repository from migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(
            conn,
            &[(FILES_TABLE, FILES_COLUMNS), (ROWS_TABLE, ROWS_COLUMNS)],
        )?;
        Ok(Self { conn })
    }
}

impl FileRepository for SqliteFileRepository<'_> {
    fn create_file(&self, display_name: &str) -> RepoResult<FileRecord> {
        let file_uuid = Uuid::new_v4();
        self.conn.execute(
            "INSERT INTO files (file_uuid, display_name) VALUES (?1, ?2);",
            params![file_uuid.to_string(), display_name],
        )?;
        self.get_file(file_uuid)?
            .ok_or(RepoError::FileNotFound(file_uuid))
    }

    fn get_file(&self, file_id: FileId) -> RepoResult<Option<FileRecord>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{FILE_SELECT_SQL} WHERE f.file_uuid = ?1;"))?;
        let mut rows = stmt.query([file_id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_file_row(row)?));
        }
        Ok(None)
    }

    fn list_files(&self) -> RepoResult<Vec<FileRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "{FILE_SELECT_SQL} ORDER BY f.created_at ASC, f.file_uuid ASC;"
        ))?;
        let mut rows = stmt.query([])?;
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            items.push(parse_file_row(row)?);
        }
        Ok(items)
    }

    fn delete_file(&self, file_id: FileId) -> RepoResult<()> {
        let changed = self.conn.execute(
            "DELETE FROM files WHERE file_uuid = ?1;",
            [file_id.to_string()],
        )?;
        if changed == 0 {
            return Err(RepoError::FileNotFound(file_id));
        }
        Ok(())
    }
}

fn parse_file_row(row: &SqlRow<'_>) -> RepoResult<FileRecord> {
    let file_uuid_text: String = row.get("file_uuid")?;
    let row_count: i64 = row.get("row_count")?;
    let row_count = u64::try_from(row_count).map_err(|_| {
        RepoError::InvalidData(format!("negative row count `{row_count}` for file"))
    })?;

    Ok(FileRecord {
        file_id: parse_uuid(&file_uuid_text, "files.file_uuid")?,
        display_name: row.get("display_name")?,
        created_at: row.get("created_at")?,
        row_count,
    })
}
