use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |r| r.get(0),
    )?;

    if version < 1 {
        info!("Device store: running migration v1 (initial schema)");
        conn.execute_batch(
            "
            CREATE TABLE devices (
                id          TEXT PRIMARY KEY,
                android_id  TEXT NOT NULL UNIQUE,
                email       TEXT NOT NULL,
                status      TEXT NOT NULL DEFAULT 'pending'
                            CHECK (status IN ('pending', 'approved', 'disabled', 'rejected')),
                approved_at TEXT,
                expires_at  TEXT,
                created_at  TEXT NOT NULL,
                updated_at  TEXT NOT NULL,
                notes       TEXT,
                CHECK ((status = 'approved') = (approved_at IS NOT NULL AND expires_at IS NOT NULL)),
                CHECK ((approved_at IS NULL) = (expires_at IS NULL))
            );

            CREATE INDEX idx_devices_expiry
                ON devices(status, expires_at);

            -- Disable/reject snapshot, one per removed device
            CREATE TABLE device_removals (
                id              TEXT PRIMARY KEY,
                android_id      TEXT NOT NULL UNIQUE
                                REFERENCES devices(android_id) ON DELETE CASCADE,
                kind            TEXT NOT NULL CHECK (kind IN ('disabled', 'rejected')),
                was_approved    INTEGER NOT NULL DEFAULT 0,
                approved_at     TEXT,
                expires_at      TEXT,
                removed_at      TEXT NOT NULL,
                removed_by      TEXT NOT NULL,
                reason          TEXT,
                original_notes  TEXT
            );

            -- Append-only; keyed by android_id so entries outlive row id changes
            CREATE TABLE device_history (
                id              TEXT PRIMARY KEY,
                device_id       TEXT NOT NULL,
                android_id      TEXT NOT NULL,
                action          TEXT NOT NULL CHECK (action IN
                                ('registered', 'approved', 'extended', 'disabled', 'rejected', 'reapproved')),
                previous_status INTEGER,
                new_status      INTEGER,
                action_by       TEXT NOT NULL,
                created_at      TEXT NOT NULL,
                notes           TEXT
            );

            CREATE INDEX idx_history_android_id
                ON device_history(android_id, created_at);

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}
