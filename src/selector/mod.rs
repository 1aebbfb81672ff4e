//! Memoized selectors over store snapshots.

mod selector;

pub use selector::{create_selector, create_selector_with, Selector};
