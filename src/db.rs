// 💾 Record Store - Saved location records in SQLite
//
// Records are immutable snapshots: the denormalized name fields were
// resolved at write time and are returned as stored, never re-resolved.
// Update replaces the whole denormalized field set and stamps updated_at;
// created_at is frozen at insert.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};

use crate::materializer::LocationPayload;

// ============================================================================
// LOCATION RECORD
// ============================================================================

/// A persisted city/township selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationRecord {
    /// Stable identity (UUID), assigned at insert
    pub id: String,

    pub city_id: String,
    pub city_name: String,
    pub township_id: String,
    pub township_name: String,
    pub full_address: String,

    pub created_at: DateTime<Utc>,

    /// Absent until the record is first updated
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

// ============================================================================
// SCHEMA
// ============================================================================

pub fn setup_database(conn: &Connection) -> Result<()> {
    // Enable WAL mode for crash recovery
    conn.pragma_update(None, "journal_mode", "WAL")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS locations (
            id TEXT PRIMARY KEY,
            city_id TEXT NOT NULL,
            city_name TEXT NOT NULL,
            township_id TEXT NOT NULL,
            township_name TEXT NOT NULL,
            full_address TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT
        )",
        [],
    )
    .context("Failed to create locations table")?;

    Ok(())
}

// ============================================================================
// CRUD OPERATIONS
// ============================================================================

/// Insert a materialized payload as a new record.
///
/// Identity and created_at are assigned here, not by the caller.
pub fn insert_location(conn: &Connection, payload: &LocationPayload) -> Result<LocationRecord> {
    let record = LocationRecord {
        id: uuid::Uuid::new_v4().to_string(),
        city_id: payload.city_id.clone(),
        city_name: payload.city_name.clone(),
        township_id: payload.township_id.clone(),
        township_name: payload.township_name.clone(),
        full_address: payload.full_address.clone(),
        created_at: Utc::now(),
        updated_at: None,
    };

    conn.execute(
        "INSERT INTO locations
            (id, city_id, city_name, township_id, township_name, full_address, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, NULL)",
        params![
            record.id,
            record.city_id,
            record.city_name,
            record.township_id,
            record.township_name,
            record.full_address,
            record.created_at.to_rfc3339(),
        ],
    )
    .context("Failed to insert location record")?;

    Ok(record)
}

/// All records, newest first.
pub fn list_locations(conn: &Connection) -> Result<Vec<LocationRecord>> {
    let mut stmt = conn.prepare(
        "SELECT id, city_id, city_name, township_id, township_name,
                full_address, created_at, updated_at
         FROM locations
         ORDER BY created_at DESC",
    )?;

    let records = stmt
        .query_map([], row_to_record)?
        .collect::<Result<Vec<_>, _>>()
        .context("Failed to read location records")?;

    Ok(records)
}

/// Single record by id, `None` when it does not exist.
pub fn get_location(conn: &Connection, id: &str) -> Result<Option<LocationRecord>> {
    let record = conn
        .query_row(
            "SELECT id, city_id, city_name, township_id, township_name,
                    full_address, created_at, updated_at
             FROM locations
             WHERE id = ?1",
            params![id],
            row_to_record,
        )
        .optional()
        .context("Failed to read location record")?;

    Ok(record)
}

/// Replace the denormalized fields of an existing record and stamp
/// updated_at. `None` when the record does not exist.
pub fn update_location(
    conn: &Connection,
    id: &str,
    payload: &LocationPayload,
) -> Result<Option<LocationRecord>> {
    let updated_at = Utc::now();

    let changed = conn
        .execute(
            "UPDATE locations
             SET city_id = ?1, city_name = ?2, township_id = ?3,
                 township_name = ?4, full_address = ?5, updated_at = ?6
             WHERE id = ?7",
            params![
                payload.city_id,
                payload.city_name,
                payload.township_id,
                payload.township_name,
                payload.full_address,
                updated_at.to_rfc3339(),
                id,
            ],
        )
        .context("Failed to update location record")?;

    if changed == 0 {
        return Ok(None);
    }

    get_location(conn, id)
}

/// Delete by id; `false` when the record did not exist.
pub fn delete_location(conn: &Connection, id: &str) -> Result<bool> {
    let deleted = conn
        .execute("DELETE FROM locations WHERE id = ?1", params![id])
        .context("Failed to delete location record")?;

    Ok(deleted > 0)
}

fn row_to_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<LocationRecord> {
    let created_at_str: String = row.get(6)?;
    let updated_at_str: Option<String> = row.get(7)?;

    let updated_at = match updated_at_str {
        Some(s) => Some(
            DateTime::parse_from_rfc3339(&s)
                .map_err(|_| rusqlite::Error::InvalidQuery)?
                .with_timezone(&Utc),
        ),
        None => None,
    };

    Ok(LocationRecord {
        id: row.get(0)?,
        city_id: row.get(1)?,
        city_name: row.get(2)?,
        township_id: row.get(3)?,
        township_name: row.get(4)?,
        full_address: row.get(5)?,
        created_at: DateTime::parse_from_rfc3339(&created_at_str)
            .map_err(|_| rusqlite::Error::InvalidQuery)?
            .with_timezone(&Utc),
        updated_at,
    })
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn test_payload(city_id: &str, township_id: &str) -> LocationPayload {
        LocationPayload {
            city_id: city_id.to_string(),
            city_name: format!("City {}", city_id),
            township_id: township_id.to_string(),
            township_name: format!("Township {}", township_id),
            full_address: format!("City {}Township {}", city_id, township_id),
        }
    }

    fn open_test_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        setup_database(&conn).unwrap();
        conn
    }

    #[test]
    fn insert_assigns_identity_and_created_at() {
        let conn = open_test_db();

        let record = insert_location(&conn, &test_payload("A", "A1")).unwrap();

        assert!(!record.id.is_empty());
        assert!(record.updated_at.is_none());
        assert_eq!(record.city_name, "City A");
        assert_eq!(record.full_address, "City ATownship A1");
    }

    #[test]
    fn list_returns_newest_first() {
        let conn = open_test_db();

        let first = insert_location(&conn, &test_payload("A", "A1")).unwrap();
        std::thread::sleep(std::time::Duration::from_millis(5));
        let second = insert_location(&conn, &test_payload("B", "B1")).unwrap();

        let records = list_locations(&conn).unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id, second.id);
        assert_eq!(records[1].id, first.id);
    }

    #[test]
    fn get_round_trips_stored_fields() {
        let conn = open_test_db();
        let inserted = insert_location(&conn, &test_payload("A", "A1")).unwrap();

        let fetched = get_location(&conn, &inserted.id).unwrap().unwrap();

        assert_eq!(fetched, inserted);
    }

    #[test]
    fn get_missing_record_is_none() {
        let conn = open_test_db();

        assert!(get_location(&conn, "no-such-id").unwrap().is_none());
    }

    #[test]
    fn update_replaces_fields_and_stamps_updated_at() {
        let conn = open_test_db();
        let inserted = insert_location(&conn, &test_payload("A", "A1")).unwrap();

        let updated = update_location(&conn, &inserted.id, &test_payload("B", "B1"))
            .unwrap()
            .unwrap();

        assert_eq!(updated.id, inserted.id);
        assert_eq!(updated.city_id, "B");
        assert_eq!(updated.township_name, "Township B1");
        assert_eq!(updated.full_address, "City BTownship B1");
        assert_eq!(updated.created_at, inserted.created_at);
        assert!(updated.updated_at.is_some());
    }

    #[test]
    fn update_with_same_payload_reproduces_fields() {
        let conn = open_test_db();
        let payload = test_payload("A", "A1");
        let inserted = insert_location(&conn, &payload).unwrap();

        let updated = update_location(&conn, &inserted.id, &payload)
            .unwrap()
            .unwrap();

        assert_eq!(updated.city_name, inserted.city_name);
        assert_eq!(updated.township_name, inserted.township_name);
        assert_eq!(updated.full_address, inserted.full_address);
    }

    #[test]
    fn update_missing_record_is_none() {
        let conn = open_test_db();

        let result = update_location(&conn, "no-such-id", &test_payload("A", "A1")).unwrap();

        assert!(result.is_none());
    }

    #[test]
    fn delete_reports_whether_record_existed() {
        let conn = open_test_db();
        let inserted = insert_location(&conn, &test_payload("A", "A1")).unwrap();

        assert!(delete_location(&conn, &inserted.id).unwrap());
        assert!(!delete_location(&conn, &inserted.id).unwrap());
        assert!(list_locations(&conn).unwrap().is_empty());
    }
}
