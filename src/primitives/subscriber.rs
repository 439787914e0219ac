// ============================================================================
// spark-aggregate - Subscriber & Subscription
//
// The protocol guard between a producer and its observer, and the RAII
// handle a consumer holds.
// ============================================================================
//
// A Subscriber wraps one observer and enforces the stream grammar:
//
//   next* (error | complete)?
//
// Once closed (terminal signal or unsubscribe) it forwards nothing more and
// runs its teardowns in reverse registration order. Producers hold clones of
// the Subscriber; the consumer holds the Subscription.
// ============================================================================

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::core::constants::*;
use crate::core::error::LeafError;
use crate::core::types::{Observer, TeardownFn};
use crate::core::value::Value;

// =============================================================================
// SUBSCRIBER INNER
// =============================================================================

struct SubscriberInner {
    flags: Cell<u32>,

    /// Taken out on close so the observer is released with the subscription
    observer: RefCell<Option<Rc<dyn Observer>>>,

    teardowns: RefCell<Vec<TeardownFn>>,
}

impl SubscriberInner {
    fn has(&self, flag: u32) -> bool {
        self.flags.get() & flag != 0
    }

    fn set(&self, flag: u32) {
        self.flags.set(self.flags.get() | flag);
    }

    /// Clone the observer out so no borrow is held while it runs.
    fn observer(&self) -> Option<Rc<dyn Observer>> {
        self.observer.borrow().clone()
    }

    fn close(&self) -> Option<Rc<dyn Observer>> {
        self.set(CLOSED);
        self.observer.borrow_mut().take()
    }

    fn run_teardowns(&self) {
        if self.has(TEARING_DOWN) {
            return;
        }
        self.set(TEARING_DOWN);

        // From here on add_teardown runs its argument directly.
        let teardowns: Vec<_> = self.teardowns.borrow_mut().drain(..).collect();
        for teardown in teardowns.into_iter().rev() {
            teardown();
        }
    }
}

// =============================================================================
// SUBSCRIBER
// =============================================================================

/// Producer-side handle to one observer.
///
/// Cheap to clone. All methods are no-ops once the subscriber is closed.
#[derive(Clone)]
pub struct Subscriber {
    inner: Rc<SubscriberInner>,
}

impl Subscriber {
    pub fn new(observer: impl Observer + 'static) -> Self {
        Self::from_rc(Rc::new(observer))
    }

    pub fn from_rc(observer: Rc<dyn Observer>) -> Self {
        Self {
            inner: Rc::new(SubscriberInner {
                flags: Cell::new(0),
                observer: RefCell::new(Some(observer)),
                teardowns: RefCell::new(Vec::new()),
            }),
        }
    }

    /// Forward a value unless closed.
    pub fn next(&self, value: Value) {
        if self.inner.has(CLOSED) {
            return;
        }
        if let Some(observer) = self.inner.observer() {
            observer.next(value);
        }
    }

    /// Deliver the terminal error, then release resources.
    pub fn error(&self, error: LeafError) {
        if self.inner.has(CLOSED) {
            return;
        }
        self.inner.set(ERRORED);
        let observer = self.inner.close();
        if let Some(observer) = observer {
            observer.error(error);
        }
        self.inner.run_teardowns();
    }

    /// Deliver completion, then release resources.
    pub fn complete(&self) {
        if self.inner.has(CLOSED) {
            return;
        }
        self.inner.set(COMPLETED);
        let observer = self.inner.close();
        if let Some(observer) = observer {
            observer.complete();
        }
        self.inner.run_teardowns();
    }

    /// Stop forwarding and run teardowns. Idempotent.
    pub fn unsubscribe(&self) {
        if !self.inner.has(CLOSED) {
            // Drop the observer outside the borrow.
            let _observer = self.inner.close();
        }
        self.inner.run_teardowns();
    }

    /// Register cleanup for when the subscription ends.
    ///
    /// Runs immediately if the subscriber has already closed.
    pub fn add_teardown(&self, teardown: TeardownFn) {
        if self.inner.has(TEARING_DOWN) {
            teardown();
            return;
        }
        self.inner.teardowns.borrow_mut().push(teardown);
    }

    pub fn is_closed(&self) -> bool {
        self.inner.has(CLOSED)
    }

    pub fn is_completed(&self) -> bool {
        self.inner.has(COMPLETED)
    }

    pub fn is_errored(&self) -> bool {
        self.inner.has(ERRORED)
    }

    /// Identity comparison, used to remove a subscriber from a list.
    pub fn ptr_eq(&self, other: &Subscriber) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl std::fmt::Debug for Subscriber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscriber")
            .field("closed", &self.is_closed())
            .field("completed", &self.is_completed())
            .field("errored", &self.is_errored())
            .finish()
    }
}

// =============================================================================
// SUBSCRIPTION
// =============================================================================

/// Consumer-side handle for one subscription.
///
/// Dropping the handle unsubscribes. Use [`Subscription::detach`] to keep the
/// stream running without holding the handle.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    subscriber: Option<Subscriber>,
}

impl Subscription {
    pub(crate) fn new(subscriber: Subscriber) -> Self {
        Self {
            subscriber: Some(subscriber),
        }
    }

    /// Stop receiving events and release the producer. Idempotent, and safe
    /// after the stream has already terminated.
    pub fn unsubscribe(&self) {
        if let Some(subscriber) = &self.subscriber {
            subscriber.unsubscribe();
        }
    }

    /// True once the stream terminated or was unsubscribed.
    pub fn is_closed(&self) -> bool {
        self.subscriber.as_ref().is_none_or(Subscriber::is_closed)
    }

    /// Let the subscription live on until its stream terminates.
    pub fn detach(mut self) {
        self.subscriber = None;
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

// =============================================================================
// TESTS
// =============================================================================
