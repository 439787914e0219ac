// Shared doubles for the integration tests: an in-memory table that answers
// queries in fetch and watch mode, and a recorder for composite streams.
#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use spark_aggregate::{
    FnObserver, Input, LeafError, Observable, Query, Subject, Subscription, Value,
};

// =============================================================================
// TABLE
// =============================================================================

struct TableInner {
    rows: RefCell<Vec<Value>>,
    changes: Subject,
    fetches: Cell<usize>,
    watches: Cell<usize>,
}

/// Rows keyed by a numeric `id`, always read back in id order.
#[derive(Clone)]
pub struct Table {
    inner: Rc<TableInner>,
}

impl Table {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(TableInner {
                rows: RefCell::new(Vec::new()),
                changes: Subject::new(),
                fetches: Cell::new(0),
                watches: Cell::new(0),
            }),
        }
    }

    pub fn insert(&self, rows: impl IntoIterator<Item = serde_json::Value>) {
        {
            let mut stored = self.inner.rows.borrow_mut();
            stored.extend(rows.into_iter().map(Value::from));
            stored.sort_by(|a, b| id_of(a).total_cmp(&id_of(b)));
        }
        self.inner.changes.next(Value::Null);
    }

    pub fn all(&self) -> TableQuery {
        TableQuery {
            table: self.clone(),
            above: None,
            below: None,
            limit: None,
            single: None,
        }
    }

    /// The row with this id, or `null`.
    pub fn find(&self, id: i64) -> TableQuery {
        TableQuery {
            single: Some(id as f64),
            ..self.all()
        }
    }

    pub fn above(&self, id: i64) -> TableQuery {
        self.all().above(id)
    }

    /// How many times any query on this table was fetched or watched.
    pub fn fetches(&self) -> usize {
        self.inner.fetches.get()
    }

    pub fn watches(&self) -> usize {
        self.inner.watches.get()
    }

    /// Live change listeners (one per watched query).
    pub fn listeners(&self) -> usize {
        self.inner.changes.observer_count()
    }
}

fn id_of(row: &Value) -> f64 {
    row.get("id").and_then(Value::as_f64).unwrap_or(f64::NAN)
}

// =============================================================================
// TABLE QUERY
// =============================================================================

#[derive(Clone)]
pub struct TableQuery {
    table: Table,
    above: Option<f64>,
    below: Option<f64>,
    limit: Option<usize>,
    single: Option<f64>,
}

impl TableQuery {
    /// Rows with `id >= id`.
    pub fn above(mut self, id: i64) -> Self {
        self.above = Some(id as f64);
        self
    }

    /// Rows with `id < id`.
    pub fn below(mut self, id: i64) -> Self {
        self.below = Some(id as f64);
        self
    }

    pub fn limit(mut self, n: usize) -> Self {
        self.limit = Some(n);
        self
    }

    pub fn results(&self) -> Value {
        let rows = self.table.inner.rows.borrow();
        if let Some(id) = self.single {
            return rows.iter().find(|row| id_of(row) == id).cloned().unwrap_or_default();
        }
        let matching = rows
            .iter()
            .filter(|row| self.above.is_none_or(|min| id_of(row) >= min))
            .filter(|row| self.below.is_none_or(|max| id_of(row) < max))
            .take(self.limit.unwrap_or(usize::MAX))
            .cloned();
        Value::Array(matching.collect())
    }
}

impl Query for TableQuery {
    fn fetch(&self) -> Observable {
        self.table.inner.fetches.set(self.table.inner.fetches.get() + 1);
        let query = self.clone();
        Observable::new(move |subscriber| {
            subscriber.next(query.results());
            subscriber.complete();
            None
        })
    }

    fn watch(&self) -> Observable {
        self.table.inner.watches.set(self.table.inner.watches.get() + 1);
        let query = self.clone();
        Observable::new(move |subscriber| {
            subscriber.next(query.results());
            let listener = query.table.inner.changes.as_observable().subscribe_fn({
                let query = query.clone();
                let subscriber = subscriber.clone();
                move |_| subscriber.next(query.results())
            });
            Some(Box::new(move || drop(listener)))
        })
    }
}

impl From<TableQuery> for Input {
    fn from(query: TableQuery) -> Self {
        Input::query(query)
    }
}

// =============================================================================
// RECORDER
// =============================================================================

/// Everything a composite stream delivered, in order.
#[derive(Clone, Default)]
pub struct Recorder {
    pub values: Rc<RefCell<Vec<Value>>>,
    pub error: Rc<RefCell<Option<LeafError>>>,
    pub completed: Rc<Cell<bool>>,
}

impl Recorder {
    pub fn subscribe(observable: &Observable) -> (Self, Subscription) {
        let recorder = Recorder::default();
        let observer = FnObserver::new({
            let values = recorder.values.clone();
            move |v| values.borrow_mut().push(v)
        })
        .on_error({
            let error = recorder.error.clone();
            move |e| *error.borrow_mut() = Some(e)
        })
        .on_complete({
            let completed = recorder.completed.clone();
            move || completed.set(true)
        });
        let subscription = observable.subscribe(observer);
        (recorder, subscription)
    }

    pub fn json(&self) -> Vec<serde_json::Value> {
        self.values.borrow().iter().map(Value::to_json).collect()
    }

    pub fn count(&self) -> usize {
        self.values.borrow().len()
    }

    pub fn last(&self) -> Option<Value> {
        self.values.borrow().last().cloned()
    }

    pub fn completed(&self) -> bool {
        self.completed.get()
    }

    pub fn errored(&self) -> bool {
        self.error.borrow().is_some()
    }
}

/// Route `tracing` output through the test harness. Safe to call repeatedly.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
