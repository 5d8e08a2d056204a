//! SQLite-backed snapshot arena

use crate::StoreError;
use retrodict_domain::{SnapshotKind, SnapshotStore, VersionId, WorldModelSnapshot};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

/// Snapshot store persisted to a SQLite database
///
/// Each snapshot is one row: indexed version and parent columns for history
/// queries, and the full snapshot as a JSON body.
///
/// # Thread Safety
///
/// The connection sits behind a mutex, so one store can be shared between
/// update tasks. Publication runs inside a transaction.
pub struct SqliteSnapshotStore {
    conn: Mutex<Connection>,
}

impl SqliteSnapshotStore {
    /// Open (or create) a store at the given database path
    ///
    /// Use `:memory:` for an in-memory database (useful for testing).
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use retrodict_store::SqliteSnapshotStore;
    ///
    /// let store = SqliteSnapshotStore::new("history.db").unwrap();
    /// ```
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        conn.execute_batch(include_str!("schema.sql"))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Number of published snapshots
    pub fn len(&self) -> Result<usize, StoreError> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM snapshots", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Poisoned("sqlite connection".to_string()))
    }

    /// Convert VersionId to bytes for storage
    fn version_to_bytes(id: VersionId) -> Vec<u8> {
        id.value().to_be_bytes().to_vec()
    }

    /// Convert bytes to VersionId
    fn bytes_to_version(bytes: &[u8]) -> Result<VersionId, StoreError> {
        if bytes.len() != 16 {
            return Err(StoreError::InvalidData(format!(
                "Expected 16 bytes for VersionId, got {}",
                bytes.len()
            )));
        }
        let mut arr = [0u8; 16];
        arr.copy_from_slice(bytes);
        Ok(VersionId::from_value(u128::from_be_bytes(arr)))
    }

    fn version_column(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<VersionId> {
        let bytes: Vec<u8> = row.get(idx)?;
        Self::bytes_to_version(&bytes).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Blob, Box::new(e))
        })
    }

    fn kind_label(kind: &SnapshotKind) -> String {
        match kind {
            SnapshotKind::Initial => "initial".to_string(),
            SnapshotKind::Update => "update".to_string(),
            SnapshotKind::Revision => "revision".to_string(),
            SnapshotKind::Counterfactual { label } => format!("counterfactual:{}", label),
        }
    }

    fn exists(conn: &Connection, version: &[u8]) -> Result<bool, StoreError> {
        Ok(conn
            .query_row(
                "SELECT 1 FROM snapshots WHERE version = ?1",
                params![version],
                |_| Ok(true),
            )
            .optional()?
            .unwrap_or(false))
    }
}

impl SnapshotStore for SqliteSnapshotStore {
    type Error = StoreError;

    fn publish(&self, snapshot: WorldModelSnapshot) -> Result<Arc<WorldModelSnapshot>, Self::Error> {
        let body = serde_json::to_string(&snapshot)?;
        let version = Self::version_to_bytes(snapshot.version());
        let parent = snapshot.parent().map(Self::version_to_bytes);

        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        if Self::exists(&tx, &version)? {
            return Err(StoreError::DuplicateVersion(snapshot.version()));
        }
        if let (Some(id), Some(bytes)) = (snapshot.parent(), &parent) {
            if !Self::exists(&tx, bytes)? {
                return Err(StoreError::UnknownParent(id));
            }
        }
        tx.execute(
            "INSERT INTO snapshots (version, parent, kind, generated_at, body)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                &version,
                &parent,
                Self::kind_label(snapshot.kind()),
                snapshot.generated_at() as i64,
                &body,
            ],
        )?;
        tx.commit()?;

        tracing::debug!("Persisted snapshot {} ({} bytes)", snapshot.version(), body.len());
        Ok(Arc::new(snapshot))
    }

    fn get(&self, version: VersionId) -> Result<Option<Arc<WorldModelSnapshot>>, Self::Error> {
        let conn = self.lock()?;
        let body: Option<String> = conn
            .query_row(
                "SELECT body FROM snapshots WHERE version = ?1",
                params![Self::version_to_bytes(version)],
                |row| row.get(0),
            )
            .optional()?;
        match body {
            Some(body) => Ok(Some(Arc::new(serde_json::from_str(&body)?))),
            None => Ok(None),
        }
    }

    fn children(&self, version: VersionId) -> Result<Vec<VersionId>, Self::Error> {
        let conn = self.lock()?;
        let mut stmt =
            conn.prepare("SELECT version FROM snapshots WHERE parent = ?1 ORDER BY seq")?;
        let children = stmt
            .query_map(params![Self::version_to_bytes(version)], |row| {
                Self::version_column(row, 0)
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(children)
    }

    fn heads(&self) -> Result<Vec<VersionId>, Self::Error> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT s.version FROM snapshots s
             WHERE NOT EXISTS (SELECT 1 FROM snapshots c WHERE c.parent = s.version)
             ORDER BY s.seq",
        )?;
        let heads = stmt
            .query_map([], |row| Self::version_column(row, 0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(heads)
    }

    /// Walks parent pointers without decoding snapshot bodies
    fn lineage(&self, version: VersionId) -> Result<Vec<VersionId>, Self::Error> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT parent FROM snapshots WHERE version = ?1")?;
        let mut chain = Vec::new();
        let mut cursor = Some(version);
        while let Some(current) = cursor {
            let parent: Option<Option<Vec<u8>>> = stmt
                .query_row(params![Self::version_to_bytes(current)], |row| row.get(0))
                .optional()?;
            match parent {
                Some(parent) => {
                    chain.push(current);
                    cursor = parent.as_deref().map(Self::bytes_to_version).transpose()?;
                }
                None => break,
            }
        }
        Ok(chain)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_bytes_roundtrip() {
        let id = VersionId::new();
        let bytes = SqliteSnapshotStore::version_to_bytes(id);
        assert_eq!(bytes.len(), 16);
        assert_eq!(SqliteSnapshotStore::bytes_to_version(&bytes).unwrap(), id);
        assert!(SqliteSnapshotStore::bytes_to_version(&[0u8; 3]).is_err());
    }

    #[test]
    fn test_kind_labels() {
        assert_eq!(SqliteSnapshotStore::kind_label(&SnapshotKind::Revision), "revision");
        assert_eq!(
            SqliteSnapshotStore::kind_label(&SnapshotKind::Counterfactual {
                label: "no drought".into()
            }),
            "counterfactual:no drought"
        );
    }
}
