use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{Connection, Row, params};

use gatehouse_types::models::{DeviceStatus, HistoryAction};

use crate::Database;
use crate::models::{DeviceRow, HistoryRow, RemovalKind, RemovalRow, format_ts, parse_ts};

const DEVICE_COLUMNS: &str =
    "d.id, d.android_id, d.email, d.status, d.approved_at, d.expires_at, d.created_at, d.updated_at, d.notes";

const REMOVAL_COLUMNS: &str = "r.id, r.android_id, r.kind, r.was_approved, r.approved_at, r.expires_at, \
     r.removed_at, r.removed_by, r.reason, r.original_notes";

const HISTORY_COLUMNS: &str =
    "id, device_id, android_id, action, previous_status, new_status, action_by, created_at, notes";

impl Database {
    // -- Read-only views --

    pub fn get_device(&self, android_id: &str) -> Result<Option<DeviceRow>> {
        self.with_conn(|conn| find_device(conn, android_id))
    }

    /// Pending and approved devices, oldest registration first.
    pub fn list_active_devices(&self) -> Result<Vec<DeviceRow>> {
        self.with_conn(list_active)
    }

    pub fn list_removed_devices(&self, kind: RemovalKind) -> Result<Vec<(DeviceRow, RemovalRow)>> {
        self.with_conn(|conn| list_removed(conn, kind))
    }

    pub fn get_history(&self, android_id: &str) -> Result<Vec<HistoryRow>> {
        self.with_conn(|conn| list_history(conn, android_id))
    }

    pub fn get_expired_android_ids(&self, now: DateTime<Utc>) -> Result<Vec<String>> {
        self.with_conn(|conn| expired_android_ids(conn, now))
    }
}

// -- Devices --

pub fn find_device(conn: &Connection, android_id: &str) -> Result<Option<DeviceRow>> {
    let sql = format!("SELECT {} FROM devices d WHERE d.android_id = ?1", DEVICE_COLUMNS);
    let row = conn
        .query_row(&sql, [android_id], |row| map_device(row, 0))
        .optional()?;
    Ok(row)
}

pub fn insert_device(conn: &Connection, device: &DeviceRow) -> Result<()> {
    conn.execute(
        "INSERT INTO devices (id, android_id, email, status, approved_at, expires_at, created_at, updated_at, notes)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            device.id,
            device.android_id,
            device.email,
            device.status.as_str(),
            device.approved_at.map(format_ts),
            device.expires_at.map(format_ts),
            format_ts(device.created_at),
            format_ts(device.updated_at),
            device.notes,
        ],
    )?;
    Ok(())
}

/// Moves a device into the approved state with a fresh window.
pub fn set_approval(
    conn: &Connection,
    android_id: &str,
    approved_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    notes: Option<&str>,
) -> Result<()> {
    conn.execute(
        "UPDATE devices
         SET status = 'approved', approved_at = ?2, expires_at = ?3, updated_at = ?2, notes = ?4
         WHERE android_id = ?1",
        params![android_id, format_ts(approved_at), format_ts(expires_at), notes],
    )?;
    Ok(())
}

pub fn set_expiry(
    conn: &Connection,
    android_id: &str,
    expires_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    notes: Option<&str>,
) -> Result<()> {
    conn.execute(
        "UPDATE devices SET expires_at = ?2, updated_at = ?3, notes = ?4
         WHERE android_id = ?1 AND status = 'approved'",
        params![android_id, format_ts(expires_at), format_ts(updated_at), notes],
    )?;
    Ok(())
}

/// Flips an active device to disabled/rejected and clears its approval
/// window; the window itself is kept in the removal snapshot.
pub fn mark_removed(
    conn: &Connection,
    android_id: &str,
    kind: RemovalKind,
    updated_at: DateTime<Utc>,
) -> Result<()> {
    conn.execute(
        "UPDATE devices
         SET status = ?2, approved_at = NULL, expires_at = NULL, updated_at = ?3
         WHERE android_id = ?1",
        params![android_id, kind.status().as_str(), format_ts(updated_at)],
    )?;
    Ok(())
}

/// Brings a removed device back as approved under a new row id.
/// `created_at` is left untouched.
pub fn reactivate(
    conn: &Connection,
    android_id: &str,
    new_id: &str,
    approved_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    notes: Option<&str>,
) -> Result<()> {
    conn.execute(
        "UPDATE devices
         SET id = ?2, status = 'approved', approved_at = ?3, expires_at = ?4, updated_at = ?3, notes = ?5
         WHERE android_id = ?1",
        params![android_id, new_id, format_ts(approved_at), format_ts(expires_at), notes],
    )?;
    Ok(())
}

fn list_active(conn: &Connection) -> Result<Vec<DeviceRow>> {
    let sql = format!(
        "SELECT {} FROM devices d
         WHERE d.status IN ('pending', 'approved')
         ORDER BY d.created_at, d.rowid",
        DEVICE_COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([], |row| map_device(row, 0))?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Approved devices whose deadline is strictly before `now`.
pub fn expired_android_ids(conn: &Connection, now: DateTime<Utc>) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT android_id FROM devices
         WHERE status = 'approved' AND expires_at < ?1
         ORDER BY expires_at",
    )?;
    let ids = stmt
        .query_map([format_ts(now)], |row| row.get::<_, String>(0))?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(ids)
}

// -- Removal snapshots --

pub fn find_removal(conn: &Connection, android_id: &str) -> Result<Option<RemovalRow>> {
    let sql = format!("SELECT {} FROM device_removals r WHERE r.android_id = ?1", REMOVAL_COLUMNS);
    let row = conn
        .query_row(&sql, [android_id], |row| map_removal(row, 0))
        .optional()?;
    Ok(row)
}

pub fn insert_removal(conn: &Connection, removal: &RemovalRow) -> Result<()> {
    conn.execute(
        "INSERT INTO device_removals
            (id, android_id, kind, was_approved, approved_at, expires_at, removed_at, removed_by, reason, original_notes)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            removal.id,
            removal.android_id,
            removal.kind.as_str(),
            removal.was_approved,
            removal.approved_at.map(format_ts),
            removal.expires_at.map(format_ts),
            format_ts(removal.removed_at),
            removal.removed_by,
            removal.reason,
            removal.original_notes,
        ],
    )?;
    Ok(())
}

pub fn delete_removal(conn: &Connection, android_id: &str) -> Result<()> {
    conn.execute("DELETE FROM device_removals WHERE android_id = ?1", [android_id])?;
    Ok(())
}

fn list_removed(conn: &Connection, kind: RemovalKind) -> Result<Vec<(DeviceRow, RemovalRow)>> {
    // Device columns occupy 0..9, removal columns start at 9
    let sql = format!(
        "SELECT {}, {} FROM device_removals r
         JOIN devices d ON d.android_id = r.android_id
         WHERE r.kind = ?1
         ORDER BY r.removed_at, r.rowid",
        DEVICE_COLUMNS, REMOVAL_COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([kind.as_str()], |row| Ok((map_device(row, 0)?, map_removal(row, 9)?)))?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

// -- History --

pub fn insert_history(conn: &Connection, entry: &HistoryRow) -> Result<()> {
    conn.execute(
        "INSERT INTO device_history
            (id, device_id, android_id, action, previous_status, new_status, action_by, created_at, notes)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            entry.id,
            entry.device_id,
            entry.android_id,
            entry.action.as_str(),
            entry.previous_status,
            entry.new_status,
            entry.action_by,
            format_ts(entry.created_at),
            entry.notes,
        ],
    )?;
    Ok(())
}

fn list_history(conn: &Connection, android_id: &str) -> Result<Vec<HistoryRow>> {
    let sql = format!(
        "SELECT {} FROM device_history WHERE android_id = ?1 ORDER BY created_at, rowid",
        HISTORY_COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([android_id], |row| {
            Ok(HistoryRow {
                id: row.get(0)?,
                device_id: row.get(1)?,
                android_id: row.get(2)?,
                action: parse_col::<HistoryAction>(row, 3)?,
                previous_status: row.get(4)?,
                new_status: row.get(5)?,
                action_by: row.get(6)?,
                created_at: ts_col(row, 7)?,
                notes: row.get(8)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

// -- Row mapping --

fn map_device(row: &Row<'_>, at: usize) -> rusqlite::Result<DeviceRow> {
    Ok(DeviceRow {
        id: row.get(at)?,
        android_id: row.get(at + 1)?,
        email: row.get(at + 2)?,
        status: parse_col::<DeviceStatus>(row, at + 3)?,
        approved_at: opt_ts_col(row, at + 4)?,
        expires_at: opt_ts_col(row, at + 5)?,
        created_at: ts_col(row, at + 6)?,
        updated_at: ts_col(row, at + 7)?,
        notes: row.get(at + 8)?,
    })
}

fn map_removal(row: &Row<'_>, at: usize) -> rusqlite::Result<RemovalRow> {
    let kind = match row.get::<_, String>(at + 2)?.as_str() {
        "disabled" => RemovalKind::Disabled,
        "rejected" => RemovalKind::Rejected,
        other => return Err(conversion_error(at + 2, format!("unknown removal kind '{}'", other))),
    };

    Ok(RemovalRow {
        id: row.get(at)?,
        android_id: row.get(at + 1)?,
        kind,
        was_approved: row.get(at + 3)?,
        approved_at: opt_ts_col(row, at + 4)?,
        expires_at: opt_ts_col(row, at + 5)?,
        removed_at: ts_col(row, at + 6)?,
        removed_by: row.get(at + 7)?,
        reason: row.get(at + 8)?,
        original_notes: row.get(at + 9)?,
    })
}

fn parse_col<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: std::str::FromStr<Err = String>,
{
    let raw: String = row.get(idx)?;
    raw.parse().map_err(|e| conversion_error(idx, e))
}

fn ts_col(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    parse_ts_col(idx, &raw)
}

fn opt_ts_col(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|raw| parse_ts_col(idx, &raw)).transpose()
}

fn parse_ts_col(idx: usize, raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    parse_ts(raw).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e))
    })
}

fn conversion_error(idx: usize, msg: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, msg.into())
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
