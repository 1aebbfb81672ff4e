//! A counter that survives restarts.
//!
//! Run it several times: the count picks up where the last run stopped.

use snapstore::{persist, FileStorage, PersistOptions, Record, Store};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt().init();

    let dir = std::env::temp_dir().join("snapstore-demo");
    let storage = FileStorage::open(&dir)?;

    let store = Store::new(Record::from([("count", 0)]))?;
    persist(&store, PersistOptions::new("counter").storage(storage));

    store.set_state_with(|state| {
        let count = state.value("count").as_i64().unwrap_or(0);
        Record::from([("count", count + 1)])
    });

    println!(
        "count is now {} (stored in {})",
        store.get("count"),
        dir.display()
    );
    Ok(())
}
