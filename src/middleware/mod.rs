//! Store middleware.
//!
//! Middleware are ordinary subscribers: [`persist`] mirrors snapshots into a
//! [`Storage`] backend and [`devtools`] traces transitions.

mod inspector;
mod persistence;
mod storage;

pub use inspector::{changed_keys, devtools};
pub use persistence::{decode, encode, persist, PersistOptions};
pub use storage::{FileStorage, MemoryStorage, Storage};
