//! The reactive store.
//!
//! A [`Store`] holds one immutable snapshot, detects effective changes per
//! key with [`shallow_equal`](crate::shallow_equal), and notifies its
//! subscribers only when something actually changed.

mod store;
mod subscription;
mod update;

pub use store::{create_store, is_reserved, Store, RESERVED_NAMES};
pub(crate) use store::WeakStore;
pub use subscription::Subscription;
pub use update::{Initial, Update};
