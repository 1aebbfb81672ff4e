use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, RwLock, Weak};

use tracing::{debug, error, trace, warn};

use super::subscription::{SubscriberList, Subscription};
use super::update::{Initial, Update};
use crate::error::{StoreError, StoreResult};
use crate::lock;
use crate::value::{shallow_equal, Record, Value};

/// Operation names that no state key may take.
pub const RESERVED_NAMES: [&str; 8] = [
    "g",
    "s",
    "u",
    "d",
    "getState",
    "setState",
    "subscribe",
    "destroy",
];

/// Whether `name` is one of [`RESERVED_NAMES`].
pub fn is_reserved(name: &str) -> bool {
    RESERVED_NAMES.contains(&name)
}

/// A reactive store holding an immutable snapshot of a [`Record`].
///
/// Every write goes through the same change detection: each key of the
/// incoming partial is compared with the current value using
/// [`shallow_equal`]. When nothing changed the snapshot stays the same
/// reference and no listener runs. Otherwise a new snapshot is installed and
/// listeners run in subscription order with `(next, previous)`.
///
/// Handles are cheap to clone and share one state.
///
/// ```
/// use snapstore::{Record, Store};
///
/// let store = Store::new(Record::from([("count", 0)])).unwrap();
/// let before = store.get_state();
///
/// store.set("count", 0);
/// assert!(store.get_state().ptr_eq(&before));
///
/// store.set("count", 5);
/// assert_eq!(store.get("count").as_i64(), Some(5));
/// ```
#[derive(Clone)]
pub struct Store {
    state: Arc<RwLock<Record>>,
    subscribers: Arc<SubscriberList>,
}

impl Store {
    /// Create a store from a record or a factory producing one.
    ///
    /// Fails if a key of the initial record is a reserved operation name.
    pub fn new<'a>(initial: impl Into<Initial<'a>>) -> StoreResult<Self> {
        let state = initial.into().resolve();
        if let Some(key) = state.keys().find(|key| is_reserved(key)) {
            return Err(StoreError::ReservedKey(key.to_owned()));
        }
        debug!(keys = state.len(), "store created");
        Ok(Self {
            state: Arc::new(RwLock::new(state)),
            subscribers: Arc::new(SubscriberList::new()),
        })
    }

    /// The current snapshot.
    ///
    /// Returns the same reference until an effective change occurs.
    pub fn get_state(&self) -> Record {
        lock::read(&self.state).clone()
    }

    /// Read the snapshot without cloning the handle.
    pub fn read<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&Record) -> R,
    {
        let state = lock::read(&self.state);
        f(&state)
    }

    /// A handle to the state that does not keep the store alive.
    pub(crate) fn downgrade(&self) -> WeakStore {
        WeakStore {
            state: Arc::downgrade(&self.state),
        }
    }

    /// Merge a partial record, or the result of a function of the current
    /// snapshot, into the state.
    pub fn set_state<'a>(&self, update: impl Into<Update<'a>>) {
        match update.into() {
            Update::Partial(partial) => self.apply(partial),
            Update::With(f) => self.set_state_with(f),
        }
    }

    /// Compute a partial from the current snapshot and merge it.
    pub fn set_state_with<F>(&self, f: F)
    where
        F: FnOnce(&Record) -> Record,
    {
        let current = self.get_state();
        self.apply(f(&current));
    }

    /// Register a listener called with `(next, previous)` on every effective
    /// change.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&Record, &Record) + Send + Sync + 'static,
    {
        if self.subscribers.is_closed() {
            debug!("subscribe on a destroyed store; listener will never run");
        }
        self.subscribers.add(Arc::new(listener))
    }

    /// Drop every listener. The store keeps accepting reads and writes but
    /// never notifies again.
    pub fn destroy(&self) {
        if !self.subscribers.is_closed() {
            debug!(subscribers = self.subscribers.len(), "store destroyed");
        }
        self.subscribers.close();
    }

    pub fn is_destroyed(&self) -> bool {
        self.subscribers.is_closed()
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// The current value under `key`, `Undefined` when absent.
    pub fn get(&self, key: &str) -> Value {
        lock::read(&self.state).value(key)
    }

    /// Assign one key, with the same change detection as [`Store::set_state`].
    ///
    /// Assigning to a reserved operation name is refused with a warning.
    pub fn set(&self, key: &str, value: impl Into<Value>) {
        if is_reserved(key) {
            warn!(key, "cannot overwrite store method: {key}");
            return;
        }
        self.apply(Record::new().with(key, value));
    }

    /// Keys of the current snapshot, in insertion order.
    pub fn keys(&self) -> Vec<String> {
        lock::read(&self.state).keys().map(str::to_owned).collect()
    }

    /// Short alias for [`Store::get_state`].
    pub fn g(&self) -> Record {
        self.get_state()
    }

    /// Short alias for [`Store::set_state`].
    pub fn s<'a>(&self, update: impl Into<Update<'a>>) {
        self.set_state(update);
    }

    /// Short alias for [`Store::subscribe`].
    pub fn u<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&Record, &Record) + Send + Sync + 'static,
    {
        self.subscribe(listener)
    }

    /// Short alias for [`Store::destroy`].
    pub fn d(&self) {
        self.destroy();
    }

    fn apply(&self, partial: Record) {
        let candidates: Vec<(&str, &Value)> = partial
            .iter()
            .filter(|(key, _)| {
                let reserved = is_reserved(key);
                if reserved {
                    warn!(key = *key, "cannot overwrite store method: {key}");
                }
                !reserved
            })
            .collect();

        let (next, prev) = {
            let mut state = lock::write(&self.state);
            let changes: Vec<(String, Value)> = candidates
                .into_iter()
                .filter(|(key, candidate)| !shallow_equal(&state.value(key), candidate))
                .map(|(key, candidate)| (key.to_owned(), candidate.clone()))
                .collect();
            if changes.is_empty() {
                trace!("update produced no effective change");
                return;
            }
            debug!(changed = changes.len(), "state updated");
            let prev = state.clone();
            let next = prev.merged(changes);
            *state = next.clone();
            (next, prev)
        };

        self.notify(&next, &prev);
    }

    /// Run the listeners registered at the start of the pass, skipping any
    /// removed since. A panicking listener does not stop the others.
    fn notify(&self, next: &Record, prev: &Record) {
        for registration in self.subscribers.snapshot() {
            if !registration.is_active() {
                continue;
            }
            let listener = &registration.listener;
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| listener(next, prev)));
            if let Err(payload) = outcome {
                error!(
                    subscriber = registration.id,
                    reason = panic_message(payload.as_ref()),
                    "store subscriber panicked"
                );
            }
        }
    }
}

/// Non-owning view of a store's state, for listeners that need the latest
/// snapshot rather than the one their pass was started with.
#[derive(Clone)]
pub(crate) struct WeakStore {
    state: Weak<RwLock<Record>>,
}

impl WeakStore {
    /// The current snapshot, or `None` once every store handle is gone.
    pub(crate) fn get_state(&self) -> Option<Record> {
        self.state.upgrade().map(|state| lock::read(&state).clone())
    }
}

/// Create a new store. See [`Store::new`].
///
/// # Example
///
/// ```
/// use snapstore::{create_store, Initial, Record};
///
/// let store = create_store(Initial::from_fn(|| Record::from([("count", 5)]))).unwrap();
/// assert_eq!(store.get("count").as_i64(), Some(5));
/// ```
pub fn create_store<'a>(initial: impl Into<Initial<'a>>) -> StoreResult<Store> {
    Store::new(initial)
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("state", &self.get_state())
            .field("subscribers", &self.subscriber_count())
            .field("destroyed", &self.is_destroyed())
            .finish()
    }
}
