//! Key-value storage and reactor-state persistence.
//!
//! All operations are synchronous blocking I/O; the runner persists under
//! its own event loop, which is exactly the ordering the state record
//! needs (the on-disk state never lags what the next handler sees).

use attestor_reactor::ReactorState;
use rocksdb::{WriteBatch, WriteOptions, DB};
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

/// The single well-known key the reactor state record lives under.
pub const REACTOR_STATE_KEY: &[u8] = b"attestor/reactor-state";

/// Version byte prefixed to the persisted record.
const STATE_VERSION: u8 = 1;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(String),
    #[error("unknown state record version: {0}")]
    UnknownVersion(u8),
    #[error("corrupt state record: {0}")]
    Corrupt(String),
}

/// Synchronous key-value store seam.
///
/// The host chain provides the real store; [`RocksDbStore`] is the
/// production implementation and [`MemoryStore`] backs tests.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StorageError>;
    fn put(&self, key: &[u8], value: &[u8]) -> Result<(), StorageError>;
}

/// RocksDB-backed store. Writes are synced to disk before returning.
pub struct RocksDbStore {
    db: DB,
}

impl RocksDbStore {
    /// Open or create a database at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let mut opts = rocksdb::Options::default();
        opts.create_if_missing(true);
        let db = DB::open(&opts, path).map_err(|e| StorageError::Database(e.to_string()))?;
        Ok(Self { db })
    }
}

impl KeyValueStore for RocksDbStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StorageError> {
        self.db
            .get(key)
            .map_err(|e| StorageError::Database(e.to_string()))
    }

    fn put(&self, key: &[u8], value: &[u8]) -> Result<(), StorageError> {
        let mut batch = WriteBatch::default();
        batch.put(key, value);
        let mut write_opts = WriteOptions::default();
        write_opts.set_sync(true);
        self.db
            .write_opt(batch, &write_opts)
            .map_err(|e| StorageError::Database(e.to_string()))
    }
}

/// In-memory store for tests.
#[derive(Default)]
pub struct MemoryStore {
    map: parking_lot::RwLock<HashMap<Vec<u8>, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StorageError> {
        Ok(self.map.read().get(key).cloned())
    }

    fn put(&self, key: &[u8], value: &[u8]) -> Result<(), StorageError> {
        self.map.write().insert(key.to_vec(), value.to_vec());
        Ok(())
    }
}

/// Load the reactor state record, defaulting to an empty one when the key
/// has never been written.
pub fn load_reactor_state(store: &dyn KeyValueStore) -> Result<ReactorState, StorageError> {
    let Some(bytes) = store.get(REACTOR_STATE_KEY)? else {
        return Ok(ReactorState::default());
    };
    let Some((&version, payload)) = bytes.split_first() else {
        return Err(StorageError::Corrupt("empty record".into()));
    };
    if version != STATE_VERSION {
        return Err(StorageError::UnknownVersion(version));
    }
    sbor::basic_decode(payload).map_err(|e| StorageError::Corrupt(format!("{e:?}")))
}

/// Persist the reactor state record under its well-known key.
pub fn save_reactor_state(
    store: &dyn KeyValueStore,
    state: &ReactorState,
) -> Result<(), StorageError> {
    let payload =
        sbor::basic_encode(state).map_err(|e| StorageError::Corrupt(format!("{e:?}")))?;
    let mut bytes = Vec::with_capacity(1 + payload.len());
    bytes.push(STATE_VERSION);
    bytes.extend(payload);
    store.put(REACTOR_STATE_KEY, &bytes)
}
