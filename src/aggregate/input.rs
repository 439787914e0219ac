// ============================================================================
// spark-aggregate - Aggregate Input
// The caller-facing spec: constants, live queries, and nested containers
// ============================================================================

use std::cell::{Ref, RefCell};
use std::rc::Rc;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;

use crate::core::value::Value;
use crate::primitives::observable::Observable;
use crate::primitives::subject::Subject;

// =============================================================================
// QUERY CAPABILITY
// =============================================================================

/// Anything that can be asked for a stream of results.
///
/// `fetch` yields a finite stream (current results, then completion).
/// `watch` yields a potentially unbounded stream of result updates; sources
/// without a live mode just fetch.
pub trait Query {
    fn fetch(&self) -> Observable;

    fn watch(&self) -> Observable {
        self.fetch()
    }
}

// =============================================================================
// INPUT
// =============================================================================

/// One node of an aggregate spec as supplied by the caller.
///
/// Build trees with the `spec!` macro, the `From` impls, or
/// [`Input::map`] / [`Input::seq`].
#[derive(Clone)]
pub enum Input {
    /// A constant. Arrays and objects inside it are walked as containers.
    Value(Value),
    /// A stream used as-is in both fetch and watch mode
    Stream(Observable),
    /// A query resolved per activation with `fetch()` or `watch()`
    Query(Rc<dyn Query>),
    Seq(Vec<Input>),
    Map(IndexMap<String, Input>),
    /// A node shared by reference; editable until the aggregate is built
    Shared(SharedInput),
}

impl Input {
    pub fn seq<I>(items: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Input>,
    {
        Input::Seq(items.into_iter().map(Into::into).collect())
    }

    pub fn map<K, V, I>(entries: I) -> Self
    where
        K: Into<String>,
        V: Into<Input>,
        I: IntoIterator<Item = (K, V)>,
    {
        Input::Map(entries.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }

    pub fn query(query: impl Query + 'static) -> Self {
        Input::Query(Rc::new(query))
    }

    pub fn constant(value: impl Into<Value>) -> Self {
        Input::Value(value.into())
    }
}

impl std::fmt::Debug for Input {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Input::Value(v) => f.debug_tuple("Value").field(v).finish(),
            Input::Stream(_) => f.write_str("Stream"),
            Input::Query(_) => f.write_str("Query"),
            Input::Seq(items) => f.debug_tuple("Seq").field(items).finish(),
            Input::Map(map) => f.debug_tuple("Map").field(map).finish(),
            Input::Shared(shared) => f.debug_tuple("Shared").field(&shared.as_ptr()).finish(),
        }
    }
}

// =============================================================================
// SHARED INPUT
// =============================================================================

/// A spec node that can be referenced from several places.
///
/// Because the contents stay mutable, a shared node can end up inside
/// itself; the tree builder rejects that with a cycle error.
#[derive(Clone)]
pub struct SharedInput {
    inner: Rc<RefCell<Input>>,
}

impl SharedInput {
    pub fn new(input: impl Into<Input>) -> Self {
        Self {
            inner: Rc::new(RefCell::new(input.into())),
        }
    }

    /// Replace the contents.
    pub fn set(&self, input: impl Into<Input>) {
        *self.inner.borrow_mut() = input.into();
    }

    /// Edit the contents in place.
    pub fn update(&self, f: impl FnOnce(&mut Input)) {
        f(&mut self.inner.borrow_mut());
    }

    pub fn borrow(&self) -> Ref<'_, Input> {
        self.inner.borrow()
    }

    /// Identity of the node, used by the cycle guard.
    pub fn as_ptr(&self) -> *const RefCell<Input> {
        Rc::as_ptr(&self.inner)
    }
}

// =============================================================================
// CONVERSIONS
// =============================================================================

impl From<Value> for Input {
    fn from(value: Value) -> Self {
        Input::Value(value)
    }
}

impl From<serde_json::Value> for Input {
    fn from(json: serde_json::Value) -> Self {
        Input::Value(json.into())
    }
}

impl From<Observable> for Input {
    fn from(stream: Observable) -> Self {
        Input::Stream(stream)
    }
}

impl From<Subject> for Input {
    fn from(subject: Subject) -> Self {
        Input::Stream(subject.as_observable())
    }
}

impl From<&Subject> for Input {
    fn from(subject: &Subject) -> Self {
        Input::Stream(subject.as_observable())
    }
}

impl<Q: Query + 'static> From<Rc<Q>> for Input {
    fn from(query: Rc<Q>) -> Self {
        Input::Query(query)
    }
}

impl From<Rc<dyn Query>> for Input {
    fn from(query: Rc<dyn Query>) -> Self {
        Input::Query(query)
    }
}

impl From<SharedInput> for Input {
    fn from(shared: SharedInput) -> Self {
        Input::Shared(shared)
    }
}

impl From<&SharedInput> for Input {
    fn from(shared: &SharedInput) -> Self {
        Input::Shared(shared.clone())
    }
}

impl From<Vec<Input>> for Input {
    fn from(items: Vec<Input>) -> Self {
        Input::Seq(items)
    }
}

impl From<IndexMap<String, Input>> for Input {
    fn from(map: IndexMap<String, Input>) -> Self {
        Input::Map(map)
    }
}

macro_rules! constant_input {
    ($($t:ty),* $(,)?) => {
        $(
            impl From<$t> for Input {
                fn from(v: $t) -> Self {
                    Input::Value(Value::from(v))
                }
            }
        )*
    };
}

constant_input!(bool, f64, i32, i64, u32, &str, String, DateTime<Utc>, Bytes);

// =============================================================================
// TESTS
// =============================================================================
