use crate::value::{Record, Value};

/// The first snapshot of a store: a record, or a factory producing one.
pub enum Initial<'a> {
    Record(Record),
    Factory(Box<dyn FnOnce() -> Record + 'a>),
}

impl<'a> Initial<'a> {
    /// Build the initial state lazily.
    pub fn from_fn<F>(factory: F) -> Self
    where
        F: FnOnce() -> Record + 'a,
    {
        Initial::Factory(Box::new(factory))
    }

    pub(crate) fn resolve(self) -> Record {
        match self {
            Initial::Record(record) => record,
            Initial::Factory(factory) => factory(),
        }
    }
}

impl From<Record> for Initial<'_> {
    fn from(record: Record) -> Self {
        Initial::Record(record)
    }
}

impl<K, V, const N: usize> From<[(K, V); N]> for Initial<'_>
where
    K: Into<String>,
    V: Into<Value>,
{
    fn from(entries: [(K, V); N]) -> Self {
        Initial::Record(Record::from(entries))
    }
}

/// A state change request: a partial record to merge, or a function of the
/// current snapshot returning one.
pub enum Update<'a> {
    Partial(Record),
    With(Box<dyn FnOnce(&Record) -> Record + 'a>),
}

impl<'a> Update<'a> {
    pub fn with<F>(f: F) -> Self
    where
        F: FnOnce(&Record) -> Record + 'a,
    {
        Update::With(Box::new(f))
    }
}

impl From<Record> for Update<'_> {
    fn from(partial: Record) -> Self {
        Update::Partial(partial)
    }
}

impl<K, V, const N: usize> From<[(K, V); N]> for Update<'_>
where
    K: Into<String>,
    V: Into<Value>,
{
    fn from(entries: [(K, V); N]) -> Self {
        Update::Partial(Record::from(entries))
    }
}
