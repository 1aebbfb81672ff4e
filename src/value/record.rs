use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;

use super::shallow::records_shallow_equal;
use super::value::Value;

/// An immutable, shared, insertion-ordered map from string keys to values.
///
/// Cloning a record is cheap and yields the same reference
/// ([`Record::ptr_eq`]). Records held by a store are never edited in place;
/// the store derives a new record for every effective change and reuses the
/// untouched values.
#[derive(Clone, Default)]
pub struct Record(Arc<IndexMap<String, Value>>);

impl Record {
    /// Create an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    ///
    /// Edits in place only while this handle is the sole owner; a shared
    /// record is copied first, so other holders never observe the change.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        Arc::make_mut(&mut self.0).insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// The value under `key`, or `Undefined` when absent.
    pub fn value(&self, key: &str) -> Value {
        self.0.get(key).cloned().unwrap_or_default()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Whether both handles point at the very same record.
    pub fn ptr_eq(&self, other: &Record) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// One-level structural comparison, see [`shallow_equal`](super::shallow_equal).
    pub fn shallow_eq(&self, other: &Record) -> bool {
        records_shallow_equal(self, other)
    }

    /// A new record holding every entry of `self`, overwritten by `changes`.
    pub(crate) fn merged<I>(&self, changes: I) -> Record
    where
        I: IntoIterator<Item = (String, Value)>,
    {
        let mut map = IndexMap::clone(&self.0);
        map.extend(changes);
        Record(Arc::new(map))
    }
}

impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other) || self.0 == other.0
    }
}

impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.0.iter()).finish()
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let json = serde_json::to_string(self).map_err(|_| fmt::Error)?;
        f.write_str(&json)
    }
}

impl<K, V> FromIterator<(K, V)> for Record
where
    K: Into<String>,
    V: Into<Value>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Record(Arc::new(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        ))
    }
}

impl<K, V, const N: usize> From<[(K, V); N]> for Record
where
    K: Into<String>,
    V: Into<Value>,
{
    fn from(entries: [(K, V); N]) -> Self {
        entries.into_iter().collect()
    }
}

impl<'a> IntoIterator for &'a Record {
    type Item = (&'a String, &'a Value);
    type IntoIter = indexmap::map::Iter<'a, String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_and_lookup() {
        let record = Record::new().with("count", 0).with("name", "test");

        assert_eq!(record.len(), 2);
        assert_eq!(record.get("count"), Some(&Value::from(0)));
        assert!(record.value("missing").is_undefined());
        assert_eq!(record.keys().collect::<Vec<_>>(), ["count", "name"]);
    }

    #[test]
    fn with_on_shared_record_copies() {
        let original = Record::from([("a", 1)]);
        let alias = original.clone();
        let extended = alias.with("b", 2);

        assert!(!original.contains_key("b"));
        assert!(!extended.ptr_eq(&original));
        assert_eq!(extended.len(), 2);
    }

    #[test]
    fn merged_shares_untouched_values() {
        let user = Value::from(Record::from([("name", "John")]));
        let base = Record::new().with("user", user.clone()).with("count", 0);

        let next = base.merged([("count".to_string(), Value::from(1))]);

        assert!(!next.ptr_eq(&base));
        assert!(next.value("user").strict_eq(&user));
        assert_eq!(next.value("count"), Value::from(1));
        assert_eq!(base.value("count"), Value::from(0));
    }

    #[test]
    fn equality_ignores_identity() {
        let a = Record::from([("x", 1), ("y", 2)]);
        let b = Record::from([("y", 2), ("x", 1)]);
        assert_eq!(a, b);
        assert!(!a.ptr_eq(&b));
    }
}
