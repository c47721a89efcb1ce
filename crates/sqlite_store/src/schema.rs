//! Table layout of the promotion database.

use rusqlite::Connection;
use tracing::debug;

use crate::errors::SqliteResult;

/// Statements creating every table and index. Safe to run on an existing
/// database.
pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS promotion_request (
    id                 TEXT PRIMARY KEY NOT NULL,
    application_id     TEXT NOT NULL,
    source_environment TEXT NOT NULL,
    target_environment TEXT NOT NULL,
    status             TEXT NOT NULL,
    created_at         TEXT NOT NULL,
    updated_at         TEXT NOT NULL,
    version            INTEGER NOT NULL,
    payload_json       TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_promotion_request_application
    ON promotion_request(application_id);
CREATE INDEX IF NOT EXISTS idx_promotion_request_status
    ON promotion_request(status);
CREATE INDEX IF NOT EXISTS idx_promotion_request_created_at
    ON promotion_request(created_at);

CREATE TABLE IF NOT EXISTS promotion_diff (
    promotion_id   TEXT NOT NULL REFERENCES promotion_request(id) ON DELETE CASCADE,
    config_key     TEXT NOT NULL,
    source_value   TEXT,
    source_type    TEXT,
    source_version INTEGER NOT NULL DEFAULT 0,
    target_value   TEXT,
    target_type    TEXT,
    target_version INTEGER NOT NULL DEFAULT 0,
    change_type    TEXT NOT NULL,
    PRIMARY KEY (promotion_id, config_key)
);
"#;

/// Enable foreign keys and create any missing tables.
pub fn ensure_schema(conn: &Connection) -> SqliteResult<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.execute_batch(SCHEMA)?;
    debug!("Promotion schema ready");
    Ok(())
}
