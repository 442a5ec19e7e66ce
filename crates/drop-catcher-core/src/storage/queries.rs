use super::models::{MoveRecord, MoveStatus};
use super::sqlite::Database;
use super::MoveRecordStore;
use crate::error::{Error, ErrorCode};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Result, Row};
use tracing::debug;

const MOVE_RECORD_COLUMNS: &str = "id, created_at, source_directory, source_file_name, file_size, \
     content_hash, status, move_completed_at, target_directory, target_file_name, \
     error_code, error_message";

impl Database {
    // ── Move Records ─────────────────────────────────────────────

    pub fn insert_move_record(&self, record: &MoveRecord) -> Result<String> {
        self.connection().execute(
            "INSERT INTO move_record \
             (id, created_at, source_directory, source_file_name, file_size, content_hash, \
              status, move_completed_at, target_directory, target_file_name, error_code, \
              error_message) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            params![
                record.id,
                format_timestamp(&record.created_at),
                record.source_directory,
                record.source_file_name,
                record.file_size,
                record.content_hash,
                record.status.as_str(),
                record.move_completed_at.as_ref().map(format_timestamp),
                record.target_directory,
                record.target_file_name,
                record.error_code.map(|code| code.as_str()),
                record.error_message,
            ],
        )?;
        debug!("Inserted {} move record {}", record.status, record.id);
        Ok(record.id.clone())
    }

    /// Insert or overwrite the row with the record's id. Writing the same
    /// record twice leaves a single identical row.
    pub fn upsert_move_record(&self, record: &MoveRecord) -> Result<()> {
        self.connection().execute(
            "INSERT INTO move_record \
             (id, created_at, source_directory, source_file_name, file_size, content_hash, \
              status, move_completed_at, target_directory, target_file_name, error_code, \
              error_message) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12) \
             ON CONFLICT(id) DO UPDATE SET \
                 created_at = excluded.created_at, \
                 source_directory = excluded.source_directory, \
                 source_file_name = excluded.source_file_name, \
                 file_size = excluded.file_size, \
                 content_hash = excluded.content_hash, \
                 status = excluded.status, \
                 move_completed_at = excluded.move_completed_at, \
                 target_directory = excluded.target_directory, \
                 target_file_name = excluded.target_file_name, \
                 error_code = excluded.error_code, \
                 error_message = excluded.error_message",
            params![
                record.id,
                format_timestamp(&record.created_at),
                record.source_directory,
                record.source_file_name,
                record.file_size,
                record.content_hash,
                record.status.as_str(),
                record.move_completed_at.as_ref().map(format_timestamp),
                record.target_directory,
                record.target_file_name,
                record.error_code.map(|code| code.as_str()),
                record.error_message,
            ],
        )?;
        debug!("Upserted {} move record {}", record.status, record.id);
        Ok(())
    }

    pub fn get_move_record(&self, id: &str) -> Result<Option<MoveRecord>> {
        match self.connection().query_row(
            &format!("SELECT {} FROM move_record WHERE id = ?1", MOVE_RECORD_COLUMNS),
            params![id],
            map_move_record,
        ) {
            Ok(record) => Ok(Some(record)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Most recent records first.
    pub fn list_move_records(&self, limit: i64) -> Result<Vec<MoveRecord>> {
        let mut stmt = self.connection().prepare(&format!(
            "SELECT {} FROM move_record ORDER BY created_at DESC, rowid DESC LIMIT ?1",
            MOVE_RECORD_COLUMNS
        ))?;
        let records = stmt
            .query_map(params![limit], map_move_record)?
            .collect::<Result<Vec<_>>>()?;
        Ok(records)
    }

    /// Number of records per status, in lifecycle order. Statuses without rows are omitted.
    pub fn count_by_status(&self) -> Result<Vec<(MoveStatus, i64)>> {
        let mut stmt = self
            .connection()
            .prepare("SELECT status, COUNT(*) FROM move_record GROUP BY status")?;
        let mut counts = stmt
            .query_map([], |row| {
                let status: String = row.get(0)?;
                Ok((parse_column::<MoveStatus>(0, &status)?, row.get::<_, i64>(1)?))
            })?
            .collect::<Result<Vec<_>>>()?;
        counts.sort_by_key(|(status, _)| MoveStatus::ALL.iter().position(|s| s == status));
        Ok(counts)
    }
}

impl MoveRecordStore for Database {
    fn insert(&self, record: &MoveRecord) -> Result<String, Error> {
        Ok(self.insert_move_record(record)?)
    }

    fn upsert(&self, record: &MoveRecord) -> Result<(), Error> {
        Ok(self.upsert_move_record(record)?)
    }
}

fn format_timestamp(timestamp: &DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn map_move_record(row: &Row<'_>) -> Result<MoveRecord> {
    let created_at: String = row.get(1)?;
    let status: String = row.get(6)?;
    let move_completed_at: Option<String> = row.get(7)?;
    let error_code: Option<String> = row.get(10)?;

    Ok(MoveRecord {
        id: row.get(0)?,
        created_at: parse_timestamp(1, &created_at)?,
        source_directory: row.get(2)?,
        source_file_name: row.get(3)?,
        file_size: row.get(4)?,
        content_hash: row.get(5)?,
        status: parse_column(6, &status)?,
        move_completed_at: move_completed_at
            .map(|value| parse_timestamp(7, &value))
            .transpose()?,
        target_directory: row.get(8)?,
        target_file_name: row.get(9)?,
        error_code: error_code
            .map(|value| parse_column::<ErrorCode>(10, &value))
            .transpose()?,
        error_message: row.get(11)?,
    })
}

fn parse_timestamp(column: usize, value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|timestamp| timestamp.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(column, Type::Text, Box::new(e)))
}

fn parse_column<T>(column: usize, value: &str) -> Result<T>
where
    T: std::str::FromStr<Err = Error>,
{
    value
        .parse::<T>()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(column, Type::Text, Box::new(e)))
}
