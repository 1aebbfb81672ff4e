use std::sync::{Arc, Mutex};

use tracing::{debug, trace, warn};

use super::storage::Storage;
use crate::error::{StorageError, StorageResult};
use crate::lock;
use crate::store::{Store, Subscription};
use crate::value::{Record, Value};

/// Where and how a store is persisted.
#[derive(Clone)]
pub struct PersistOptions {
    key: String,
    storage: Option<Arc<dyn Storage>>,
    hydrate: bool,
}

impl PersistOptions {
    /// Persist under `key`. A storage backend must be attached with
    /// [`PersistOptions::storage`] for anything to be written.
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            storage: None,
            hydrate: true,
        }
    }

    pub fn storage(mut self, storage: impl Storage + 'static) -> Self {
        self.storage = Some(Arc::new(storage));
        self
    }

    /// Attach a backend that the caller keeps a handle to.
    pub fn shared_storage(mut self, storage: Arc<dyn Storage>) -> Self {
        self.storage = Some(storage);
        self
    }

    /// Whether to merge the stored document into the store first. Defaults
    /// to `true`.
    pub fn hydrate(mut self, hydrate: bool) -> Self {
        self.hydrate = hydrate;
        self
    }

    pub fn key(&self) -> &str {
        &self.key
    }
}

impl std::fmt::Debug for PersistOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PersistOptions")
            .field("key", &self.key)
            .field("storage", &self.storage.is_some())
            .field("hydrate", &self.hydrate)
            .finish()
    }
}

/// Mirror a store into durable storage.
///
/// Merges the stored document into the store (unless hydration is off),
/// writes the current snapshot, then writes the latest snapshot after every
/// change. Writes are serialized per call, and each one reads the store's
/// state at write time, so passes that finish out of order on different
/// threads never leave an older snapshot in storage. Read, parse and write
/// failures are logged and never reach the caller. Without a
/// storage backend nothing happens and an inactive subscription is returned.
///
/// ```
/// use std::sync::Arc;
/// use snapstore::{persist, MemoryStorage, PersistOptions, Record, Store};
///
/// let storage = Arc::new(MemoryStorage::new());
/// let store = Store::new(Record::from([("count", 0)])).unwrap();
/// persist(&store, PersistOptions::new("counter").shared_storage(storage.clone()));
///
/// store.set("count", 1);
/// assert_eq!(storage.item("counter").as_deref(), Some(r#"{"count":1}"#));
/// ```
pub fn persist(store: &Store, options: PersistOptions) -> Subscription {
    let PersistOptions {
        key,
        storage,
        hydrate,
    } = options;
    let Some(storage) = storage else {
        warn!(key = %key, "no storage configured; state will not be persisted");
        return Subscription::inactive();
    };

    if hydrate {
        restore(store, storage.as_ref(), &key);
    }
    let initial = store.get_state();
    let saved = save(storage.as_ref(), &key, &initial).then_some(initial);

    let latest = store.downgrade();
    let last_saved = Mutex::new(saved);
    store.subscribe(move |next, _prev| {
        let mut last_saved = lock::mutex(&last_saved);
        let state = latest.get_state().unwrap_or_else(|| next.clone());
        if last_saved.as_ref().is_some_and(|saved| saved.ptr_eq(&state)) {
            trace!(key = %key, "latest snapshot already persisted");
            return;
        }
        if save(storage.as_ref(), &key, &state) {
            *last_saved = Some(state);
        }
    })
}

/// Encode a snapshot as a JSON document.
pub fn encode(state: &Record) -> StorageResult<String> {
    Ok(serde_json::to_string(state)?)
}

/// Decode a JSON document into a record.
pub fn decode(raw: &str) -> StorageResult<Record> {
    match serde_json::from_str::<Value>(raw)? {
        Value::Record(record) => Ok(record),
        other => Err(StorageError::NotARecord(other.type_name())),
    }
}

fn restore(store: &Store, storage: &dyn Storage, key: &str) {
    let raw = match storage.get_item(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => {
            debug!(key, "nothing persisted yet");
            return;
        }
        Err(e) => {
            warn!(key, error = %e, "failed to read persisted state; keeping current state");
            return;
        }
    };
    match decode(&raw) {
        Ok(record) => {
            debug!(key, keys = record.len(), "restoring persisted state");
            store.set_state(record);
        }
        Err(e) => warn!(key, error = %e, "ignoring unreadable persisted state"),
    }
}

/// Write `state` under `key`; returns whether it was stored.
fn save(storage: &dyn Storage, key: &str, state: &Record) -> bool {
    let outcome = encode(state).and_then(|json| storage.set_item(key, &json));
    if let Err(e) = &outcome {
        warn!(key, error = %e, "failed to persist state");
    }
    outcome.is_ok()
}
