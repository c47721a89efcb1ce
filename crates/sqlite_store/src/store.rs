//! [`PromotionStore`] backed by SQLite.

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use promotion_core::{
    ConfigDiff, ConfigRecord, PromotionFilter, PromotionId, PromotionRequest, PromotionStatus,
    PromotionStore, StoreError,
};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Transaction};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{debug, instrument};

use crate::errors::{SqliteResult, SqliteStoreError};
use crate::schema::ensure_schema;

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;

/// Promotion requests and diffs persisted in a single SQLite database.
///
/// The connection is shared behind a mutex and every query runs on the
/// blocking thread pool.
#[derive(Clone)]
pub struct SqlitePromotionStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqlitePromotionStore {
    /// Open (or create) the database file at `path`.
    pub fn open(path: impl AsRef<Path>) -> SqliteResult<Self> {
        let conn = Connection::open(path.as_ref())?;
        Self::from_connection(conn)
    }

    /// A private database that disappears with the store.
    pub fn open_in_memory() -> SqliteResult<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    pub fn from_connection(conn: Connection) -> SqliteResult<Self> {
        ensure_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    async fn with_conn<T, F>(&self, operation: F) -> Result<T, StoreError>
    where
        F: FnOnce(&mut Connection) -> SqliteResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        let result = tokio::task::spawn_blocking(move || {
            let mut guard = conn
                .lock()
                .map_err(|e| SqliteStoreError::Lock(e.to_string()))?;
            operation(&mut guard)
        })
        .await
        .map_err(|e| SqliteStoreError::Task(e.to_string()))
        .and_then(|inner| inner);

        result.map_err(StoreError::from)
    }
}

/// Fixed-width UTC timestamp so that text ordering matches time ordering.
fn timestamp(value: &DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn encode(request: &PromotionRequest) -> SqliteResult<String> {
    Ok(serde_json::to_string(request)?)
}

/// Rebuild a request from its payload. The `version` column is authoritative.
fn decode(payload: &str, version: i64) -> SqliteResult<PromotionRequest> {
    let mut request: PromotionRequest = serde_json::from_str(payload)?;
    request.version = to_u64(version)?;
    Ok(request)
}

fn to_u64(value: i64) -> SqliteResult<u64> {
    u64::try_from(value).map_err(|_| SqliteStoreError::Corrupt(format!("negative counter {value}")))
}

fn to_column(version: u64) -> SqliteResult<i64> {
    i64::try_from(version)
        .map_err(|_| SqliteStoreError::Corrupt(format!("version {version} out of range")))
}

fn load_request(conn: &Connection, id: &PromotionId) -> SqliteResult<Option<PromotionRequest>> {
    let row: Option<(String, i64)> = conn
        .query_row(
            "SELECT payload_json, version FROM promotion_request WHERE id = ?1",
            params![id.to_string()],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?;

    row.map(|(payload, version)| decode(&payload, version))
        .transpose()
}

fn current_version(conn: &Connection, id: &PromotionId) -> SqliteResult<Option<u64>> {
    let version: Option<i64> = conn
        .query_row(
            "SELECT version FROM promotion_request WHERE id = ?1",
            params![id.to_string()],
            |row| row.get(0),
        )
        .optional()?;
    version.map(to_u64).transpose()
}

fn insert_diffs(tx: &Transaction<'_>, id: &PromotionId, diffs: &[ConfigDiff]) -> SqliteResult<()> {
    let mut stmt = tx.prepare(
        "INSERT INTO promotion_diff (
            promotion_id, config_key,
            source_value, source_type, source_version,
            target_value, target_type, target_version,
            change_type
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
    )?;

    let promotion_id = id.to_string();
    for diff in diffs {
        stmt.execute(params![
            promotion_id,
            diff.config_key(),
            diff.source_value(),
            diff.source_type(),
            diff.source_version(),
            diff.target_value(),
            diff.target_type(),
            diff.target_version(),
            diff.change_type().as_str(),
        ])?;
    }
    Ok(())
}

struct DiffRow {
    config_key: String,
    source_value: Option<String>,
    source_type: Option<String>,
    source_version: u32,
    target_value: Option<String>,
    target_type: Option<String>,
    target_version: u32,
    change_type: String,
}

fn record(value: Option<String>, config_type: Option<String>, version: u32) -> Option<ConfigRecord> {
    value.map(|value| match config_type {
        Some(config_type) => ConfigRecord::new(value, config_type, version),
        None => ConfigRecord {
            version,
            ..ConfigRecord::untyped(value)
        },
    })
}

impl DiffRow {
    fn into_diff(self) -> SqliteResult<ConfigDiff> {
        let key = self.config_key;
        let source = record(self.source_value, self.source_type, self.source_version);
        let target = record(self.target_value, self.target_type, self.target_version);

        let diff = ConfigDiff::from_records(key.clone(), source, target).ok_or_else(|| {
            SqliteStoreError::Corrupt(format!("diff row for key '{key}' has neither side"))
        })?;

        if diff.change_type().as_str() != self.change_type {
            return Err(SqliteStoreError::Corrupt(format!(
                "diff row for key '{key}' is stored as {} but its values describe {}",
                self.change_type,
                diff.change_type()
            )));
        }
        Ok(diff)
    }
}

fn load_diffs(conn: &Connection, id: &PromotionId) -> SqliteResult<Vec<ConfigDiff>> {
    let mut stmt = conn.prepare(
        "SELECT config_key,
                source_value, source_type, source_version,
                target_value, target_type, target_version,
                change_type
           FROM promotion_diff
          WHERE promotion_id = ?1
          ORDER BY config_key",
    )?;

    let rows = stmt.query_map(params![id.to_string()], |row| {
        Ok(DiffRow {
            config_key: row.get(0)?,
            source_value: row.get(1)?,
            source_type: row.get(2)?,
            source_version: row.get(3)?,
            target_value: row.get(4)?,
            target_type: row.get(5)?,
            target_version: row.get(6)?,
            change_type: row.get(7)?,
        })
    })?;

    let mut diffs = Vec::new();
    for row in rows {
        diffs.push(row?.into_diff()?);
    }
    Ok(diffs)
}

fn query_requests(
    conn: &Connection,
    filter: &PromotionFilter,
    limit: Option<usize>,
) -> SqliteResult<Vec<PromotionRequest>> {
    let mut clauses = Vec::new();
    let mut values = Vec::new();

    if let Some(application_id) = &filter.application_id {
        values.push(application_id.clone());
        clauses.push(format!("application_id = ?{}", values.len()));
    }
    if let Some(status) = filter.status {
        values.push(status.as_str().to_string());
        clauses.push(format!("status = ?{}", values.len()));
    }
    if let Some(source) = &filter.source_environment {
        values.push(source.clone());
        clauses.push(format!("source_environment = ?{}", values.len()));
    }
    if let Some(target) = &filter.target_environment {
        values.push(target.clone());
        clauses.push(format!("target_environment = ?{}", values.len()));
    }

    let mut sql = String::from("SELECT payload_json, version FROM promotion_request");
    if !clauses.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&clauses.join(" AND "));
    }
    sql.push_str(" ORDER BY created_at DESC, id DESC");
    if let Some(limit) = limit {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        sql.push_str(&format!(" LIMIT {limit}"));
    }

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params_from_iter(values.iter()), |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
    })?;

    let mut requests = Vec::new();
    for row in rows {
        let (payload, version) = row?;
        requests.push(decode(&payload, version)?);
    }
    Ok(requests)
}

#[async_trait]
impl PromotionStore for SqlitePromotionStore {
    #[instrument(skip(self, request, diffs), fields(promotion_id = %request.id))]
    async fn insert(
        &self,
        request: &PromotionRequest,
        diffs: &[ConfigDiff],
    ) -> Result<PromotionRequest, StoreError> {
        let mut stored = request.clone();
        stored.version = 1;
        let diffs = diffs.to_vec();

        self.with_conn(move |conn| {
            let tx = conn.transaction()?;
            if current_version(&tx, &stored.id)?.is_some() {
                return Err(StoreError::AlreadyExists {
                    id: stored.id.clone(),
                }
                .into());
            }

            tx.execute(
                "INSERT INTO promotion_request (
                    id, application_id, source_environment, target_environment,
                    status, created_at, updated_at, version, payload_json
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    stored.id.to_string(),
                    stored.application_id.as_str(),
                    stored.source_environment.as_str(),
                    stored.target_environment.as_str(),
                    stored.status().as_str(),
                    timestamp(&stored.created_at),
                    timestamp(&stored.updated_at),
                    to_column(stored.version)?,
                    encode(&stored)?,
                ],
            )?;
            insert_diffs(&tx, &stored.id, &diffs)?;
            tx.commit()?;

            debug!(diff_count = diffs.len(), "Inserted promotion request");
            Ok(stored)
        })
        .await
    }

    async fn get(&self, id: &PromotionId) -> Result<PromotionRequest, StoreError> {
        let id = id.clone();
        self.with_conn(move |conn| {
            load_request(conn, &id)?.ok_or_else(|| StoreError::NotFound { id }.into())
        })
        .await
    }

    #[instrument(skip(self, request), fields(promotion_id = %request.id, version = request.version))]
    async fn save(&self, request: &PromotionRequest) -> Result<PromotionRequest, StoreError> {
        let mut stored = request.clone();
        stored.version = request.version + 1;
        let expected = request.version;

        self.with_conn(move |conn| {
            let rows = conn.execute(
                "UPDATE promotion_request
                    SET status = ?1,
                        updated_at = ?2,
                        payload_json = ?3,
                        version = version + 1
                  WHERE id = ?4 AND version = ?5",
                params![
                    stored.status().as_str(),
                    timestamp(&stored.updated_at),
                    encode(&stored)?,
                    stored.id.to_string(),
                    to_column(expected)?,
                ],
            )?;

            if rows == 0 {
                return Err(match current_version(conn, &stored.id)? {
                    Some(actual) => StoreError::VersionConflict {
                        id: stored.id.clone(),
                        expected,
                        actual,
                    },
                    None => StoreError::NotFound {
                        id: stored.id.clone(),
                    },
                }
                .into());
            }
            Ok(stored)
        })
        .await
    }

    #[instrument(skip(self, diffs), fields(promotion_id = %id))]
    async fn replace_diffs(
        &self,
        id: &PromotionId,
        expected_version: u64,
        diffs: &[ConfigDiff],
    ) -> Result<PromotionRequest, StoreError> {
        let id = id.clone();
        let diffs = diffs.to_vec();

        self.with_conn(move |conn| {
            let tx = conn.transaction()?;
            let mut stored =
                load_request(&tx, &id)?.ok_or_else(|| StoreError::NotFound { id: id.clone() })?;

            if stored.version != expected_version {
                return Err(StoreError::VersionConflict {
                    id: id.clone(),
                    expected: expected_version,
                    actual: stored.version,
                }
                .into());
            }
            if stored.status() != PromotionStatus::PendingApproval {
                return Err(StoreError::DiffsFrozen {
                    id: id.clone(),
                    status: stored.status(),
                }
                .into());
            }

            stored.version += 1;
            stored.updated_at = Utc::now();
            tx.execute(
                "UPDATE promotion_request
                    SET updated_at = ?1,
                        payload_json = ?2,
                        version = version + 1
                  WHERE id = ?3 AND version = ?4",
                params![
                    timestamp(&stored.updated_at),
                    encode(&stored)?,
                    id.to_string(),
                    to_column(expected_version)?,
                ],
            )?;
            tx.execute(
                "DELETE FROM promotion_diff WHERE promotion_id = ?1",
                params![id.to_string()],
            )?;
            insert_diffs(&tx, &id, &diffs)?;
            tx.commit()?;

            debug!(diff_count = diffs.len(), "Replaced promotion diffs");
            Ok(stored)
        })
        .await
    }

    async fn diffs(&self, id: &PromotionId) -> Result<Vec<ConfigDiff>, StoreError> {
        let id = id.clone();
        self.with_conn(move |conn| {
            if current_version(conn, &id)?.is_none() {
                return Err(StoreError::NotFound { id }.into());
            }
            load_diffs(conn, &id)
        })
        .await
    }

    async fn list(&self, filter: &PromotionFilter) -> Result<Vec<PromotionRequest>, StoreError> {
        let filter = filter.clone();
        self.with_conn(move |conn| query_requests(conn, &filter, None))
            .await
    }

    async fn recent(&self, limit: usize) -> Result<Vec<PromotionRequest>, StoreError> {
        self.with_conn(move |conn| query_requests(conn, &PromotionFilter::default(), Some(limit)))
            .await
    }

    async fn count_by_status(&self) -> Result<BTreeMap<PromotionStatus, u64>, StoreError> {
        self.with_conn(|conn| {
            let mut stmt =
                conn.prepare("SELECT status, COUNT(*) FROM promotion_request GROUP BY status")?;
            let rows = stmt.query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
            })?;

            let mut counts = BTreeMap::new();
            for row in rows {
                let (status, count) = row?;
                let status: PromotionStatus = status
                    .parse()
                    .map_err(|_| SqliteStoreError::Corrupt(format!("unknown status '{status}'")))?;
                counts.insert(status, to_u64(count)?);
            }
            Ok(counts)
        })
        .await
    }
}
