use tracing::debug;

use crate::store::{Store, Subscription};
use crate::value::Record;

/// Trace every state transition of `store` under `name`.
///
/// Logs the state once on attach and then, for each change, the keys whose
/// values changed. Events are emitted at `debug` level on the
/// `snapstore::middleware::inspector` target.
pub fn devtools(store: &Store, name: impl Into<String>) -> Subscription {
    let name = name.into();
    debug!(store = %name, state = %store.get_state(), "devtools attached");

    store.subscribe(move |next, prev| {
        let changed = changed_keys(prev, next);
        debug!(store = %name, ?changed, state = %next, "state transition");
    })
}

/// Keys added, removed, or whose value is no longer strictly equal.
pub fn changed_keys<'a>(prev: &'a Record, next: &'a Record) -> Vec<&'a str> {
    let mut changed: Vec<&str> = next
        .iter()
        .filter(|(key, value)| prev.get(key).map_or(true, |old| !old.strict_eq(value)))
        .map(|(key, _)| key)
        .collect();
    changed.extend(prev.keys().filter(|key| !next.contains_key(key)));
    changed
}
