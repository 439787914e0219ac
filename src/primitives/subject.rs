// ============================================================================
// spark-aggregate - Subject
// Hot multicast source driven imperatively
// ============================================================================

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use crate::core::error::LeafError;
use crate::core::value::Value;
use crate::primitives::observable::Observable;
use crate::primitives::subscriber::Subscriber;

#[derive(Clone)]
enum Terminal {
    Completed,
    Errored(LeafError),
}

struct SubjectInner {
    subscribers: RefCell<Vec<Subscriber>>,
    terminal: RefCell<Option<Terminal>>,
    /// Lifetime count of subscribers that left before the subject ended
    unsubscribed: Cell<usize>,
}

impl SubjectInner {
    /// Snapshot the current subscribers so callbacks can (un)subscribe freely.
    fn snapshot(&self) -> Vec<Subscriber> {
        self.subscribers.borrow().clone()
    }

    fn remove(&self, subscriber: &Subscriber) {
        let mut subscribers = self.subscribers.borrow_mut();
        let before = subscribers.len();
        subscribers.retain(|s| !s.ptr_eq(subscriber));
        if subscribers.len() < before && self.terminal.borrow().is_none() {
            self.unsubscribed.set(self.unsubscribed.get() + 1);
        }
    }
}

/// A hot source: every current subscriber receives every value pushed.
///
/// Subscribers that arrive after `complete` or `error` receive that terminal
/// signal immediately.
///
/// # Example
///
/// ```
/// use spark_aggregate::{Subject, Value};
/// use std::cell::Cell;
/// use std::rc::Rc;
///
/// let subject = Subject::new();
/// let count = Rc::new(Cell::new(0));
/// let c = count.clone();
/// let _sub = subject.as_observable().subscribe_fn(move |_| c.set(c.get() + 1));
///
/// subject.next(Value::from(1));
/// subject.next(Value::from(2));
/// assert_eq!(count.get(), 2);
/// ```
#[derive(Clone)]
pub struct Subject {
    inner: Rc<SubjectInner>,
}

impl Subject {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(SubjectInner {
                subscribers: RefCell::new(Vec::new()),
                terminal: RefCell::new(None),
                unsubscribed: Cell::new(0),
            }),
        }
    }

    pub fn next(&self, value: Value) {
        if self.is_terminated() {
            return;
        }
        for subscriber in self.inner.snapshot() {
            subscriber.next(value.clone());
        }
    }

    pub fn error(&self, error: LeafError) {
        if self.is_terminated() {
            return;
        }
        *self.inner.terminal.borrow_mut() = Some(Terminal::Errored(error.clone()));
        let subscribers: Vec<_> = self.inner.subscribers.borrow_mut().drain(..).collect();
        for subscriber in subscribers {
            subscriber.error(error.clone());
        }
    }

    pub fn complete(&self) {
        if self.is_terminated() {
            return;
        }
        *self.inner.terminal.borrow_mut() = Some(Terminal::Completed);
        let subscribers: Vec<_> = self.inner.subscribers.borrow_mut().drain(..).collect();
        for subscriber in subscribers {
            subscriber.complete();
        }
    }

    pub fn is_terminated(&self) -> bool {
        self.inner.terminal.borrow().is_some()
    }

    /// Number of live subscribers.
    pub fn observer_count(&self) -> usize {
        self.inner.subscribers.borrow().len()
    }

    /// How many subscribers unsubscribed before the subject terminated.
    pub fn cancellation_count(&self) -> usize {
        self.inner.unsubscribed.get()
    }

    /// View this subject as a stream.
    ///
    /// The observable only holds a weak reference: once every `Subject`
    /// handle is gone, new subscribers are completed immediately.
    pub fn as_observable(&self) -> Observable {
        let weak: Weak<SubjectInner> = Rc::downgrade(&self.inner);
        Observable::new(move |subscriber| {
            let Some(inner) = weak.upgrade() else {
                subscriber.complete();
                return None;
            };

            let terminal = inner.terminal.borrow().clone();
            match terminal {
                Some(Terminal::Completed) => {
                    subscriber.complete();
                    return None;
                }
                Some(Terminal::Errored(error)) => {
                    subscriber.error(error);
                    return None;
                }
                None => {}
            }

            inner.subscribers.borrow_mut().push(subscriber.clone());
            let weak = Rc::downgrade(&inner);
            Some(Box::new(move || {
                if let Some(inner) = weak.upgrade() {
                    inner.remove(&subscriber);
                }
            }))
        })
    }
}

impl Default for Subject {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Subject> for Observable {
    fn from(subject: Subject) -> Self {
        subject.as_observable()
    }
}

impl From<&Subject> for Observable {
    fn from(subject: &Subject) -> Self {
        subject.as_observable()
    }
}

// =============================================================================
// TESTS
// =============================================================================
