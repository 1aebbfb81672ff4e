use super::record::Record;
use super::value::Value;

/// One-level structural equality.
///
/// - strictly equal values (same primitive, same composite reference) are equal;
/// - `Null`/`Undefined` on only one side is never equal, and
///   `Null` is not equal to `Undefined`;
/// - two records are equal when they have the same keys and each pair of
///   values is strictly equal;
/// - two lists are equal when they have the same length and each pair of
///   elements is strictly equal.
///
/// Nested composites are compared by reference only. There is no recursion.
///
/// ```
/// use snapstore::{shallow_equal, Record, Value};
///
/// let a = Value::from(Record::from([("a", 1), ("b", 2)]));
/// let b = Value::from(Record::from([("a", 1), ("b", 2)]));
/// assert!(shallow_equal(&a, &b));
///
/// let nested_a = Value::from(Record::new().with("a", Record::from([("b", 1)])));
/// let nested_b = Value::from(Record::new().with("a", Record::from([("b", 1)])));
/// assert!(!shallow_equal(&nested_a, &nested_b));
/// ```
pub fn shallow_equal(a: &Value, b: &Value) -> bool {
    if a.strict_eq(b) {
        return true;
    }
    if a.is_nullish() || b.is_nullish() {
        return false;
    }
    match (a, b) {
        (Value::Record(a), Value::Record(b)) => records_shallow_equal(a, b),
        (Value::List(a), Value::List(b)) => {
            a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| x.strict_eq(y))
        }
        _ => false,
    }
}

pub(crate) fn records_shallow_equal(a: &Record, b: &Record) -> bool {
    if a.ptr_eq(b) {
        return true;
    }
    a.len() == b.len()
        && a
            .iter()
            .all(|(key, value)| b.get(key).is_some_and(|other| value.strict_eq(other)))
}
