// ============================================================================
// spark-aggregate - Observable
// Cold push-based streams of Value
// ============================================================================
//
// An Observable is a producer closure. Each subscribe() runs the producer
// once with a fresh Subscriber, so every subscription is independent. The
// producer may emit synchronously before returning; whatever teardown it
// returns is attached to that subscriber.
// ============================================================================

use std::rc::Rc;

use crate::core::error::LeafError;
use crate::core::types::{FnObserver, Observer, TeardownFn};
use crate::core::value::Value;
use crate::primitives::subscriber::{Subscriber, Subscription};

/// Producer signature: drive the subscriber, optionally return cleanup
pub type ProducerFn = dyn Fn(Subscriber) -> Option<TeardownFn>;

/// A cold stream of values terminated by completion or error.
///
/// # Example
///
/// ```
/// use spark_aggregate::{Observable, Value};
/// use std::cell::RefCell;
/// use std::rc::Rc;
///
/// let seen = Rc::new(RefCell::new(Vec::new()));
/// let sink = seen.clone();
/// let sub = Observable::just(Value::from("hi")).subscribe_fn(move |v| sink.borrow_mut().push(v));
///
/// assert_eq!(*seen.borrow(), vec![Value::from("hi")]);
/// assert!(sub.is_closed());
/// ```
#[derive(Clone)]
pub struct Observable {
    producer: Rc<ProducerFn>,
}

impl Observable {
    /// Create an observable from a producer function.
    pub fn new<F>(producer: F) -> Self
    where
        F: Fn(Subscriber) -> Option<TeardownFn> + 'static,
    {
        Self {
            producer: Rc::new(producer),
        }
    }

    /// Emit one value, then complete.
    pub fn just(value: Value) -> Self {
        Self::new(move |subscriber| {
            subscriber.next(value.clone());
            subscriber.complete();
            None
        })
    }

    /// Emit every value in order, then complete.
    pub fn of(values: impl IntoIterator<Item = Value>) -> Self {
        let values: Rc<[Value]> = values.into_iter().collect();
        Self::new(move |subscriber| {
            for value in values.iter() {
                if subscriber.is_closed() {
                    break;
                }
                subscriber.next(value.clone());
            }
            subscriber.complete();
            None
        })
    }

    /// Complete without emitting.
    pub fn empty() -> Self {
        Self::new(|subscriber| {
            subscriber.complete();
            None
        })
    }

    /// Never emit and never terminate.
    pub fn never() -> Self {
        Self::new(|_| None)
    }

    /// Fail immediately with the given error.
    pub fn fail(error: LeafError) -> Self {
        Self::new(move |subscriber| {
            subscriber.error(error.clone());
            None
        })
    }

    /// Subscribe an observer, starting one independent run of the producer.
    pub fn subscribe(&self, observer: impl Observer + 'static) -> Subscription {
        self.subscribe_with(Subscriber::new(observer))
    }

    /// Subscribe with only a value callback.
    pub fn subscribe_fn(&self, on_next: impl Fn(Value) + 'static) -> Subscription {
        self.subscribe(FnObserver::new(on_next))
    }

    /// Subscribe an already-built subscriber.
    pub fn subscribe_with(&self, subscriber: Subscriber) -> Subscription {
        if let Some(teardown) = (self.producer)(subscriber.clone()) {
            subscriber.add_teardown(teardown);
        }
        Subscription::new(subscriber)
    }
}

impl std::fmt::Debug for Observable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Observable").finish_non_exhaustive()
    }
}

// =============================================================================
// TESTS
// =============================================================================
