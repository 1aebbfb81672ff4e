use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, RwLock, Weak};

use crate::lock;
use crate::value::Record;

/// A state listener, called with `(next, previous)` snapshots.
pub(crate) type Listener = Arc<dyn Fn(&Record, &Record) + Send + Sync>;

#[derive(Clone)]
pub(crate) struct Registration {
    pub(crate) id: usize,
    active: Arc<AtomicBool>,
    pub(crate) listener: Listener,
}

impl Registration {
    pub(crate) fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }
}

/// Ordered listener registrations of one store.
pub(crate) struct SubscriberList {
    entries: RwLock<Vec<Registration>>,
    next_id: AtomicUsize,
    closed: AtomicBool,
}

impl SubscriberList {
    pub(crate) fn new() -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
            next_id: AtomicUsize::new(0),
            closed: AtomicBool::new(false),
        }
    }

    /// Append a listener. A closed list hands back an inactive subscription.
    pub(crate) fn add(self: &Arc<Self>, listener: Listener) -> Subscription {
        // `closed` is only set under the entries lock, so checking it here
        // cannot race with `close`.
        let mut entries = lock::write(&self.entries);
        if self.is_closed() {
            return Subscription::inactive();
        }
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let active = Arc::new(AtomicBool::new(true));
        entries.push(Registration {
            id,
            active: Arc::clone(&active),
            listener,
        });
        Subscription {
            id,
            active,
            list: Arc::downgrade(self),
        }
    }

    fn remove(&self, id: usize) {
        lock::write(&self.entries).retain(|entry| entry.id != id);
    }

    /// Deactivate and drop every registration, and refuse new ones.
    pub(crate) fn close(&self) {
        let mut entries = lock::write(&self.entries);
        self.closed.store(true, Ordering::SeqCst);
        for entry in entries.drain(..) {
            entry.active.store(false, Ordering::SeqCst);
        }
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub(crate) fn len(&self) -> usize {
        lock::read(&self.entries).len()
    }

    /// The registrations at this instant, in subscription order.
    pub(crate) fn snapshot(&self) -> Vec<Registration> {
        lock::read(&self.entries).clone()
    }
}

/// Handle to one store subscription.
///
/// [`Subscription::unsubscribe`] removes exactly this registration and is
/// safe to call any number of times. Dropping the handle leaves the listener
/// registered.
#[derive(Clone, Debug)]
pub struct Subscription {
    id: usize,
    active: Arc<AtomicBool>,
    list: Weak<SubscriberList>,
}

impl Subscription {
    /// A handle that is not attached to any store.
    pub(crate) fn inactive() -> Self {
        Self {
            id: usize::MAX,
            active: Arc::new(AtomicBool::new(false)),
            list: Weak::new(),
        }
    }

    /// Remove this registration from its store.
    pub fn unsubscribe(&self) {
        if !self.active.swap(false, Ordering::SeqCst) {
            return;
        }
        if let Some(list) = self.list.upgrade() {
            list.remove(self.id);
        }
    }

    /// Whether the listener is still registered.
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }
}

impl std::fmt::Debug for SubscriberList {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriberList")
            .field("len", &self.len())
            .field("closed", &self.is_closed())
            .finish()
    }
}
