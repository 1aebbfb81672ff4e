//! # Snapstore
//!
//! A snapshot-based reactive state store with memoized selectors.
//!
//! ## Store
//!
//! - [`Store`] - holds an immutable [`Record`] snapshot, detects effective
//!   changes per key and notifies subscribers only when something changed
//! - Keys are readable and writable directly ([`Store::get`], [`Store::set`]);
//!   operation names are reserved and cannot be shadowed
//!
//! ## Selectors
//!
//! - [`Selector`] - a derivation over a snapshot, memoized on the snapshot
//!   reference and optionally on an output equality predicate
//!
//! ## Equality
//!
//! - [`shallow_equal`] - one-level structural equality, shared by change
//!   detection and selectors
//!
//! ## Middleware
//!
//! - [`persist`] - mirror snapshots into a [`Storage`] backend
//! - [`devtools`] - trace state transitions

pub mod error;
mod lock;
pub mod middleware;
pub mod selector;
pub mod store;
pub mod value;

// Re-export main types for convenience
pub use error::{StorageError, StorageResult, StoreError, StoreResult};
pub use middleware::{devtools, persist, FileStorage, MemoryStorage, PersistOptions, Storage};
pub use selector::{create_selector, create_selector_with, Selector};
pub use store::{create_store, Initial, Store, Subscription, Update};
pub use value::{shallow_equal, Record, Value};
