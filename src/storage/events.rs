//! Event storage operations for `bugtrack`.
//!
//! Events are written in the same transaction as the mutation that caused
//! them and read back newest first.

use chrono::{DateTime, Utc};
use rusqlite::{Connection, Transaction, params};
use uuid::Uuid;

use crate::error::Result;
use crate::model::{Event, EventType};
use crate::util::time::format_storage;

/// Insert an event within a transaction.
///
/// # Errors
///
/// Returns an error if the database insert fails.
pub fn insert_event(tx: &Transaction<'_>, event: &Event) -> Result<i64> {
    tx.execute(
        r"
        INSERT INTO events (issue_id, event_type, actor, old_value, new_value, comment, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        ",
        params![
            event.issue_id.to_string(),
            event.event_type.as_str(),
            event.actor,
            event.old_value,
            event.new_value,
            event.comment,
            format_storage(&event.created_at),
        ],
    )?;

    Ok(tx.last_insert_rowid())
}

/// Get events for an issue, ordered by `created_at` DESC (newest first).
///
/// `limit` of 0 means no limit.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub fn get_events(conn: &Connection, issue_id: &Uuid, limit: usize) -> Result<Vec<Event>> {
    let mut stmt = conn.prepare(
        r"
        SELECT id, issue_id, event_type, actor, old_value, new_value, comment, created_at
        FROM events
        WHERE issue_id = ?1
        ORDER BY created_at DESC, id DESC
        LIMIT ?2
        ",
    )?;

    // SQLite treats a negative LIMIT as unbounded.
    let limit = if limit == 0 {
        -1
    } else {
        i64::try_from(limit).unwrap_or(i64::MAX)
    };

    let events = stmt
        .query_map(params![issue_id.to_string(), limit], event_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(events)
}

/// Get event count for an issue.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub fn count_events(conn: &Connection, issue_id: &Uuid) -> Result<i64> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM events WHERE issue_id = ?1",
        params![issue_id.to_string()],
        |row| row.get(0),
    )?;
    Ok(count)
}

fn event_from_row(row: &rusqlite::Row) -> rusqlite::Result<Event> {
    let issue_id: String = row.get(1)?;
    let event_type: String = row.get(2)?;
    let created_at: String = row.get(7)?;

    Ok(Event {
        id: row.get(0)?,
        issue_id: Uuid::parse_str(&issue_id).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(1, rusqlite::types::Type::Text, Box::new(e))
        })?,
        event_type: EventType::parse_lenient(&event_type),
        actor: row.get(3)?,
        old_value: row.get(4)?,
        new_value: row.get(5)?,
        comment: row.get(6)?,
        created_at: DateTime::parse_from_rfc3339(&created_at)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(
                    7,
                    rusqlite::types::Type::Text,
                    Box::new(e),
                )
            })?,
    })
}
