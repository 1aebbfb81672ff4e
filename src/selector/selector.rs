use std::sync::{Arc, RwLock};

use crate::lock;
use crate::value::Record;

type Extract<T> = dyn Fn(&Record) -> T + Send + Sync;
type ResultEq<T> = dyn Fn(&T, &T) -> bool + Send + Sync;

struct Cached<T> {
    input: Record,
    output: T,
}

/// A memoized derivation over a state snapshot.
///
/// The selector keeps a single cache entry: the last input record and the
/// output produced for it. Calling it again with the same record reference
/// returns the cached output without running the extractor. With a result
/// equality predicate, a recomputed output judged equal to the previous one
/// is discarded in favour of the previous output, so consumers comparing
/// outputs by identity see no change.
///
/// Clones share the cache. Selectors are not tied to a store.
#[derive(Clone)]
pub struct Selector<T> {
    extract: Arc<Extract<T>>,
    result_eq: Option<Arc<ResultEq<T>>>,
    cached: Arc<RwLock<Option<Cached<T>>>>,
}

impl<T: Clone> Selector<T> {
    /// Create a selector memoized on the input reference only.
    pub fn new<F>(extract: F) -> Self
    where
        F: Fn(&Record) -> T + Send + Sync + 'static,
    {
        Self {
            extract: Arc::new(extract),
            result_eq: None,
            cached: Arc::new(RwLock::new(None)),
        }
    }

    /// Create a selector that also keeps its previous output whenever
    /// `result_eq(previous, candidate)` holds.
    pub fn with_equality<F, E>(extract: F, result_eq: E) -> Self
    where
        F: Fn(&Record) -> T + Send + Sync + 'static,
        E: Fn(&T, &T) -> bool + Send + Sync + 'static,
    {
        Self {
            extract: Arc::new(extract),
            result_eq: Some(Arc::new(result_eq)),
            cached: Arc::new(RwLock::new(None)),
        }
    }

    /// Derive the value for `state`.
    ///
    /// The extractor runs at most once per call and without any lock held,
    /// so it may call other selectors. If it panics the panic propagates and
    /// the cache keeps its previous entry.
    pub fn select(&self, state: &Record) -> T {
        let (hit, previous) = {
            let cached = lock::read(&self.cached);
            match cached.as_ref() {
                Some(entry) if entry.input.ptr_eq(state) => (Some(entry.output.clone()), None),
                Some(entry) => (None, Some(entry.output.clone())),
                None => (None, None),
            }
        };
        if let Some(output) = hit {
            return output;
        }

        let candidate = (self.extract)(state);
        let output = match (previous, &self.result_eq) {
            (Some(previous), Some(eq)) if eq(&previous, &candidate) => previous,
            _ => candidate,
        };

        *lock::write(&self.cached) = Some(Cached {
            input: state.clone(),
            output: output.clone(),
        });
        output
    }

    /// Forget the cached entry.
    pub fn reset(&self) {
        *lock::write(&self.cached) = None;
    }

    /// Whether an output is cached.
    pub fn is_cached(&self) -> bool {
        lock::read(&self.cached).is_some()
    }
}

/// Create a selector memoized on the input reference.
///
/// # Example
///
/// ```
/// use snapstore::{create_selector, Record};
///
/// let doubled = create_selector(|state: &Record| state.value("count").as_i64().unwrap_or(0) * 2);
/// let state = Record::from([("count", 5)]);
/// assert_eq!(doubled.select(&state), 10);
/// ```
pub fn create_selector<T, F>(extract: F) -> Selector<T>
where
    T: Clone,
    F: Fn(&Record) -> T + Send + Sync + 'static,
{
    Selector::new(extract)
}

/// Create a selector that also preserves its previous output when
/// `result_eq(previous, next)` holds.
pub fn create_selector_with<T, F, E>(extract: F, result_eq: E) -> Selector<T>
where
    T: Clone,
    F: Fn(&Record) -> T + Send + Sync + 'static,
    E: Fn(&T, &T) -> bool + Send + Sync + 'static,
{
    Selector::with_equality(extract, result_eq)
}

impl<T> std::fmt::Debug for Selector<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Selector")
            .field("cached", &lock::read(&self.cached).is_some())
            .field("result_eq", &self.result_eq.is_some())
            .finish()
    }
}
