// ============================================================================
// spark-aggregate - Type Definitions
// Shared function types and the observer protocol
// ============================================================================

use super::error::LeafError;
use super::value::Value;

// =============================================================================
// FUNCTION TYPES
// =============================================================================

/// Teardown run when a subscription ends
pub type TeardownFn = Box<dyn FnOnce()>;

/// Equality function used to suppress repeated composites
pub type EqualsFn<T> = fn(&T, &T) -> bool;

/// Default equality using PartialEq
pub fn default_equals<T: PartialEq>(a: &T, b: &T) -> bool {
    a == b
}

// =============================================================================
// OBSERVER
// =============================================================================

/// Receiver of stream events.
///
/// All methods take `&self`; implementations keep their own interior
/// state. An observer may unsubscribe from inside any of these calls.
pub trait Observer {
    fn next(&self, value: Value);

    fn error(&self, error: LeafError);

    fn complete(&self);
}

/// Observer assembled from closures.
///
/// # Example
///
/// ```
/// use spark_aggregate::{FnObserver, Observable, Value};
/// use std::cell::RefCell;
/// use std::rc::Rc;
///
/// let seen = Rc::new(RefCell::new(Vec::new()));
/// let sink = seen.clone();
/// let _sub = Observable::of([Value::from(1), Value::from(2)])
///     .subscribe(FnObserver::new(move |v| sink.borrow_mut().push(v)));
/// assert_eq!(seen.borrow().len(), 2);
/// ```
pub struct FnObserver {
    on_next: Box<dyn Fn(Value)>,
    on_error: Option<Box<dyn Fn(LeafError)>>,
    on_complete: Option<Box<dyn Fn()>>,
}

impl FnObserver {
    pub fn new(on_next: impl Fn(Value) + 'static) -> Self {
        Self {
            on_next: Box::new(on_next),
            on_error: None,
            on_complete: None,
        }
    }

    pub fn on_error(mut self, on_error: impl Fn(LeafError) + 'static) -> Self {
        self.on_error = Some(Box::new(on_error));
        self
    }

    pub fn on_complete(mut self, on_complete: impl Fn() + 'static) -> Self {
        self.on_complete = Some(Box::new(on_complete));
        self
    }
}

impl Observer for FnObserver {
    fn next(&self, value: Value) {
        (self.on_next)(value);
    }

    fn error(&self, error: LeafError) {
        match &self.on_error {
            Some(on_error) => on_error(error),
            None => tracing::debug!(%error, "unhandled stream error"),
        }
    }

    fn complete(&self) {
        if let Some(on_complete) = &self.on_complete {
            on_complete();
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
