//! Ordered row repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist rows of one file and keep their fractional positions ordered.
//! - Keep SQL details and position arithmetic inside repository boundary.
//!
//! # Invariants
//! - Row listing is deterministic: `position ASC, row_uuid ASC`.
//! - Positions of rows in one file are pairwise distinct and strictly positive.
//! - Insert/move write the position of the target row only, unless the slot
//!   has run out of precision and the whole file is rebalanced in the same
//!   transaction.
//! - Every mutation runs in one `IMMEDIATE` transaction and either applies
//!   fully or not at all.

use super::error::{RepoError, RepoResult};
use super::schema::{
    ensure_connection_ready, ensure_file_exists, file_exists, parse_uuid, FILES_COLUMNS,
    FILES_TABLE, ROWS_COLUMNS, ROWS_TABLE,
};
use crate::model::file::FileId;
use crate::model::position::{rebalanced_positions, slot_position};
use crate::model::row::{Row, RowId};
use log::warn;
use rusqlite::{params, Connection, Row as SqlRow, Transaction, TransactionBehavior};
use uuid::Uuid;

const ROW_SELECT_SQL: &str = "SELECT
    row_uuid,
    file_uuid,
    position,
    content,
    created_at,
    updated_at
FROM file_rows";

/// Repository interface for ordered row operations.
///
/// Ordinal arguments are zero-based slots in the current ordering. Values
/// past the end are clamped to the end.
pub trait RowRepository {
    /// Lists every row of a file ordered by position.
    fn list_ordered(&self, file_id: FileId) -> RepoResult<Vec<Row>>;
    /// Loads `limit` rows starting at ordinal `offset`, plus the file's total
    /// row count, from one consistent snapshot.
    fn page(&self, file_id: FileId, offset: u64, limit: u32) -> RepoResult<(Vec<Row>, u64)>;
    /// Loads one row of a file.
    fn get_row(&self, file_id: FileId, row_id: RowId) -> RepoResult<Option<Row>>;
    /// Inserts a new row so it lands at ordinal `anchor_index`.
    fn insert_at(&self, file_id: FileId, anchor_index: u64, content: &str) -> RepoResult<Row>;
    /// Appends rows after the current last row, preserving input order.
    fn append_all(&self, file_id: FileId, contents: &[String]) -> RepoResult<Vec<Row>>;
    /// Moves one row to ordinal `target_index` of the ordering before the move.
    fn move_to(&self, file_id: FileId, row_id: RowId, target_index: u64) -> RepoResult<Row>;
    /// Replaces row content; position untouched.
    fn update_content(&self, file_id: FileId, row_id: RowId, content: &str) -> RepoResult<Row>;
    /// Deletes one row permanently.
    fn delete_row(&self, file_id: FileId, row_id: RowId) -> RepoResult<()>;
    /// Reassigns evenly spaced positions to every row of a file.
    ///
    /// Returns the number of rows rewritten.
    fn rebalance(&self, file_id: FileId) -> RepoResult<usize>;
}

/// SQLite-backed ordered row repository.
pub struct SqliteRowRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteRowRepository<'conn> {
    /// Creates repository from migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(
            conn,
            &[(FILES_TABLE, FILES_COLUMNS), (ROWS_TABLE, ROWS_COLUMNS)],
        )?;
        Ok(Self { conn })
    }

    fn write_tx(&self) -> RepoResult<Transaction<'conn>> {
        Ok(Transaction::new_unchecked(
            self.conn,
            TransactionBehavior::Immediate,
        )?)
    }

    fn read_tx(&self) -> RepoResult<Transaction<'conn>> {
        Ok(Transaction::new_unchecked(
            self.conn,
            TransactionBehavior::Deferred,
        )?)
    }
}

impl RowRepository for SqliteRowRepository<'_> {
    fn list_ordered(&self, file_id: FileId) -> RepoResult<Vec<Row>> {
        let tx = self.read_tx()?;
        ensure_file_exists(&tx, file_id)?;
        let rows = load_ordered_rows(&tx, file_id, None)?;
        tx.commit()?;
        Ok(rows)
    }

    fn page(&self, file_id: FileId, offset: u64, limit: u32) -> RepoResult<(Vec<Row>, u64)> {
        let tx = self.read_tx()?;
        ensure_file_exists(&tx, file_id)?;
        let total = count_rows(&tx, file_id)?;
        let rows = if offset >= total {
            Vec::new()
        } else {
            load_ordered_rows(&tx, file_id, Some((offset, limit)))?
        };
        tx.commit()?;
        Ok((rows, total))
    }

    fn get_row(&self, file_id: FileId, row_id: RowId) -> RepoResult<Option<Row>> {
        load_row(self.conn, file_id, row_id)
    }

    fn insert_at(&self, file_id: FileId, anchor_index: u64, content: &str) -> RepoResult<Row> {
        let tx = self.write_tx()?;
        ensure_file_exists(&tx, file_id)?;

        let slot = anchor_index.min(count_rows(&tx, file_id)?);
        let position = free_slot_position(&tx, file_id, slot, None)?;
        let row_id = insert_row(&tx, file_id, position, content)?;
        let row = load_required_row(&tx, file_id, row_id)?;

        tx.commit()?;
        Ok(row)
    }

    fn append_all(&self, file_id: FileId, contents: &[String]) -> RepoResult<Vec<Row>> {
        let tx = self.write_tx()?;
        ensure_file_exists(&tx, file_id)?;

        let mut count = count_rows(&tx, file_id)?;
        let mut row_ids = Vec::with_capacity(contents.len());
        for content in contents {
            let position = free_slot_position(&tx, file_id, count, None)?;
            row_ids.push(insert_row(&tx, file_id, position, content)?);
            count += 1;
        }

        // Read back after the loop: a rebalance mid-batch may have moved
        // rows inserted earlier in the same transaction.
        let mut rows = Vec::with_capacity(row_ids.len());
        for row_id in row_ids {
            rows.push(load_required_row(&tx, file_id, row_id)?);
        }

        tx.commit()?;
        Ok(rows)
    }

    fn move_to(&self, file_id: FileId, row_id: RowId, target_index: u64) -> RepoResult<Row> {
        let tx = self.write_tx()?;
        ensure_file_exists(&tx, file_id)?;
        let row = load_required_row(&tx, file_id, row_id)?;

        let count = count_rows(&tx, file_id)?;
        let current = ordinal_of(&tx, &row)?;
        let target = target_index.min(count);
        if target == current || target == current + 1 {
            tx.commit()?;
            return Ok(row);
        }

        // Slot among the remaining rows once the moved row is taken out.
        let slot = if target > current { target - 1 } else { target };
        let position = free_slot_position(&tx, file_id, slot, Some(row_id))?;
        tx.execute(
            "UPDATE file_rows
             SET position = ?3,
                 updated_at = (strftime('%s', 'now') * 1000)
             WHERE row_uuid = ?1
               AND file_uuid = ?2;",
            params![row_id.to_string(), file_id.to_string(), position],
        )?;
        let moved = load_required_row(&tx, file_id, row_id)?;

        tx.commit()?;
        Ok(moved)
    }

    fn update_content(&self, file_id: FileId, row_id: RowId, content: &str) -> RepoResult<Row> {
        let tx = self.write_tx()?;
        let changed = tx.execute(
            "UPDATE file_rows
             SET content = ?3,
                 updated_at = (strftime('%s', 'now') * 1000)
             WHERE row_uuid = ?1
               AND file_uuid = ?2;",
            params![row_id.to_string(), file_id.to_string(), content],
        )?;
        if changed == 0 {
            return Err(missing_row_error(&tx, file_id, row_id)?);
        }
        let row = load_required_row(&tx, file_id, row_id)?;

        tx.commit()?;
        Ok(row)
    }

    fn delete_row(&self, file_id: FileId, row_id: RowId) -> RepoResult<()> {
        let tx = self.write_tx()?;
        let changed = tx.execute(
            "DELETE FROM file_rows
             WHERE row_uuid = ?1
               AND file_uuid = ?2;",
            params![row_id.to_string(), file_id.to_string()],
        )?;
        if changed == 0 {
            return Err(missing_row_error(&tx, file_id, row_id)?);
        }

        tx.commit()?;
        Ok(())
    }

    fn rebalance(&self, file_id: FileId) -> RepoResult<usize> {
        let tx = self.write_tx()?;
        ensure_file_exists(&tx, file_id)?;
        let rewritten = rebalance_file(&tx, file_id)?;
        tx.commit()?;
        Ok(rewritten)
    }
}

/// Computes a free position for `slot`, rebalancing the file once if the
/// neighbours are too close to split.
fn free_slot_position(
    conn: &Connection,
    file_id: FileId,
    slot: u64,
    excluding: Option<RowId>,
) -> RepoResult<f64> {
    let (prev, next) = slot_neighbours(conn, file_id, slot, excluding)?;
    if let Some(position) = slot_position(prev, next) {
        return Ok(position);
    }

    warn!(
        "event=rows_rebalance module=rows status=start reason=precision_exhausted file_id={} slot={}",
        file_id, slot
    );
    let rewritten = rebalance_file(conn, file_id)?;
    warn!(
        "event=rows_rebalance module=rows status=ok reason=precision_exhausted file_id={} rows={}",
        file_id, rewritten
    );

    let (prev, next) = slot_neighbours(conn, file_id, slot, excluding)?;
    slot_position(prev, next).ok_or(RepoError::PositionExhausted { file_id })
}

fn slot_neighbours(
    conn: &Connection,
    file_id: FileId,
    slot: u64,
    excluding: Option<RowId>,
) -> RepoResult<(Option<f64>, Option<f64>)> {
    let prev = match slot.checked_sub(1) {
        Some(ordinal) => position_at(conn, file_id, ordinal, excluding)?,
        None => None,
    };
    let next = position_at(conn, file_id, slot, excluding)?;
    Ok((prev, next))
}

fn position_at(
    conn: &Connection,
    file_id: FileId,
    ordinal: u64,
    excluding: Option<RowId>,
) -> RepoResult<Option<f64>> {
    let excluded = excluding.map(|id| id.to_string()).unwrap_or_default();
    let mut stmt = conn.prepare_cached(
        "SELECT position
         FROM file_rows
         WHERE file_uuid = ?1
           AND row_uuid <> ?2
         ORDER BY position ASC, row_uuid ASC
         LIMIT 1 OFFSET ?3;",
    )?;
    let mut rows = stmt.query(params![
        file_id.to_string(),
        excluded,
        sql_index(ordinal)
    ])?;
    if let Some(row) = rows.next()? {
        return Ok(Some(row.get(0)?));
    }
    Ok(None)
}

fn ordinal_of(conn: &Connection, row: &Row) -> RepoResult<u64> {
    let before: i64 = conn.query_row(
        "SELECT COUNT(*)
         FROM file_rows
         WHERE file_uuid = ?1
           AND (position < ?2 OR (position = ?2 AND row_uuid < ?3));",
        params![row.file_id.to_string(), row.position, row.row_id.to_string()],
        |sql_row| sql_row.get(0),
    )?;
    to_count(before)
}

fn count_rows(conn: &Connection, file_id: FileId) -> RepoResult<u64> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM file_rows WHERE file_uuid = ?1;",
        [file_id.to_string()],
        |row| row.get(0),
    )?;
    to_count(count)
}

/// Rewrites every row of the file to evenly spaced positions.
///
/// Rows are first parked on negative keys so the unique position index never
/// sees two rows on the same key mid-rewrite.
fn rebalance_file(conn: &Connection, file_id: FileId) -> RepoResult<usize> {
    let row_ids = ordered_row_ids(conn, file_id)?;

    {
        let mut park = conn.prepare_cached(
            "UPDATE file_rows
             SET position = ?2
             WHERE row_uuid = ?1;",
        )?;
        for (index, row_id) in row_ids.iter().enumerate() {
            park.execute(params![row_id.to_string(), -((index + 1) as f64)])?;
        }
    }

    let mut assign = conn.prepare_cached(
        "UPDATE file_rows
         SET position = ?2,
             updated_at = (strftime('%s', 'now') * 1000)
         WHERE row_uuid = ?1;",
    )?;
    for (row_id, position) in row_ids.iter().zip(rebalanced_positions(row_ids.len())) {
        assign.execute(params![row_id.to_string(), position])?;
    }

    Ok(row_ids.len())
}

fn ordered_row_ids(conn: &Connection, file_id: FileId) -> RepoResult<Vec<RowId>> {
    let mut stmt = conn.prepare(
        "SELECT row_uuid
         FROM file_rows
         WHERE file_uuid = ?1
         ORDER BY position ASC, row_uuid ASC;",
    )?;
    let mut rows = stmt.query([file_id.to_string()])?;
    let mut ids = Vec::new();
    while let Some(row) = rows.next()? {
        let value: String = row.get(0)?;
        ids.push(parse_uuid(&value, "file_rows.row_uuid")?);
    }
    Ok(ids)
}

fn insert_row(conn: &Connection, file_id: FileId, position: f64, content: &str) -> RepoResult<RowId> {
    let row_id = Uuid::new_v4();
    conn.execute(
        "INSERT INTO file_rows (row_uuid, file_uuid, position, content)
         VALUES (?1, ?2, ?3, ?4);",
        params![row_id.to_string(), file_id.to_string(), position, content],
    )?;
    Ok(row_id)
}

fn load_ordered_rows(
    conn: &Connection,
    file_id: FileId,
    window: Option<(u64, u32)>,
) -> RepoResult<Vec<Row>> {
    let mut items = Vec::new();
    match window {
        Some((offset, limit)) => {
            let mut stmt = conn.prepare(&format!(
                "{ROW_SELECT_SQL}
                 WHERE file_uuid = ?1
                 ORDER BY position ASC, row_uuid ASC
                 LIMIT ?2 OFFSET ?3;"
            ))?;
            let mut rows = stmt.query(params![
                file_id.to_string(),
                i64::from(limit),
                sql_index(offset)
            ])?;
            while let Some(row) = rows.next()? {
                items.push(parse_row(row)?);
            }
        }
        None => {
            let mut stmt = conn.prepare(&format!(
                "{ROW_SELECT_SQL}
                 WHERE file_uuid = ?1
                 ORDER BY position ASC, row_uuid ASC;"
            ))?;
            let mut rows = stmt.query([file_id.to_string()])?;
            while let Some(row) = rows.next()? {
                items.push(parse_row(row)?);
            }
        }
    }
    Ok(items)
}

fn load_row(conn: &Connection, file_id: FileId, row_id: RowId) -> RepoResult<Option<Row>> {
    let mut stmt = conn.prepare(&format!(
        "{ROW_SELECT_SQL}
         WHERE row_uuid = ?1
           AND file_uuid = ?2;"
    ))?;
    let mut rows = stmt.query(params![row_id.to_string(), file_id.to_string()])?;
    if let Some(row) = rows.next()? {
        return Ok(Some(parse_row(row)?));
    }
    Ok(None)
}

fn load_required_row(conn: &Connection, file_id: FileId, row_id: RowId) -> RepoResult<Row> {
    load_row(conn, file_id, row_id)?.ok_or(RepoError::RowNotFound { file_id, row_id })
}

/// Picks the not-found error for a write that matched nothing.
fn missing_row_error(conn: &Connection, file_id: FileId, row_id: RowId) -> RepoResult<RepoError> {
    if file_exists(conn, file_id)? {
        Ok(RepoError::RowNotFound { file_id, row_id })
    } else {
        Ok(RepoError::FileNotFound(file_id))
    }
}

fn parse_row(row: &SqlRow<'_>) -> RepoResult<Row> {
    let row_uuid_text: String = row.get("row_uuid")?;
    let file_uuid_text: String = row.get("file_uuid")?;
    let position: f64 = row.get("position")?;
    if !position.is_finite() || position <= 0.0 {
        return Err(RepoError::InvalidData(format!(
            "invalid position `{position}` in file_rows.position"
        )));
    }

    Ok(Row {
        row_id: parse_uuid(&row_uuid_text, "file_rows.row_uuid")?,
        file_id: parse_uuid(&file_uuid_text, "file_rows.file_uuid")?,
        position,
        content: row.get("content")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

fn sql_index(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

fn to_count(value: i64) -> RepoResult<u64> {
    u64::try_from(value)
        .map_err(|_| RepoError::InvalidData(format!("negative row count `{value}`")))
}
