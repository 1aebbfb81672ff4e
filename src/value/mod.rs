//! Dynamic state values.
//!
//! Stores hold [`Record`]s: shared, insertion-ordered maps from string keys
//! to [`Value`]s. Composite values carry a reference identity, which is what
//! change detection and selector memoization key on.

mod codec;
mod record;
mod shallow;
mod value;

pub use record::Record;
pub use shallow::shallow_equal;
pub use value::Value;
