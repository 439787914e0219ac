// ============================================================================
// spark-aggregate - Subscription Manager
//
// One Activation per subscription to an aggregate stream. It subscribes
// every leaf, keeps their latest values, pushes a composite whenever all
// leaves have one, and tears every leaf down on the first error, on overall
// completion, or when the downstream unsubscribes.
// ============================================================================
//
// State machine:
//
//   Idle -> Active -> Completed | Errored | Cancelled
//
// Everything runs on the callback path of whichever leaf pushed. A leaf may
// push while it is being subscribed, and the downstream may unsubscribe from
// inside its own callback, so no RefCell borrow is ever held across a call
// into a leaf or into the downstream subscriber.
// ============================================================================

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use tracing::{debug, trace};

use crate::aggregate::combine::{all_present, recombine};
use crate::aggregate::leaf::{LeafAdapter, LeafHandle, LeafState, Mode};
use crate::aggregate::options::AggregateOptions;
use crate::aggregate::tree::BuiltSpec;
use crate::core::error::LeafError;
use crate::core::types::EqualsFn;
use crate::core::value::Value;
use crate::primitives::subscriber::Subscriber;

// =============================================================================
// ACTIVATION IDS
// =============================================================================

thread_local! {
    static NEXT_ACTIVATION_ID: Cell<u64> = const { Cell::new(1) };
}

fn next_activation_id() -> u64 {
    NEXT_ACTIVATION_ID.with(|id| {
        let current = id.get();
        id.set(current.wrapping_add(1));
        current
    })
}

// =============================================================================
// STATE
// =============================================================================

/// Lifecycle of one activation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActivationState {
    Idle,
    Active,
    Completed,
    Errored,
    Cancelled,
}

impl ActivationState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ActivationState::Completed | ActivationState::Errored | ActivationState::Cancelled
        )
    }
}

// =============================================================================
// ACTIVATION
// =============================================================================

pub(crate) struct Activation {
    id: u64,
    mode: Mode,
    state: Cell<ActivationState>,
    spec: Rc<BuiltSpec>,
    leaves: RefCell<Vec<LeafState>>,
    handles: RefCell<Vec<Option<LeafHandle>>>,
    /// Leaves that have not produced a value yet
    missing: Cell<usize>,
    /// Leaves that have not completed yet
    running: Cell<usize>,
    downstream: Subscriber,
    equals: Option<EqualsFn<Value>>,
    last_emitted: RefCell<Option<Value>>,
}

impl Activation {
    /// Create an activation, tie its cancellation to `downstream`, and
    /// subscribe all of its leaves.
    ///
    /// The cancel teardown is registered before the first leaf is
    /// subscribed, so a downstream that unsubscribes from inside an early
    /// emission releases every leaf before `unsubscribe` returns. Leaves may
    /// emit, complete, or fail before this returns; the returned activation
    /// can already be terminal.
    pub(crate) fn start(
        spec: Rc<BuiltSpec>,
        mode: Mode,
        options: &AggregateOptions,
        downstream: Subscriber,
    ) -> Rc<Self> {
        let count = spec.leaves.len();
        let activation = Rc::new(Self {
            id: next_activation_id(),
            mode,
            state: Cell::new(ActivationState::Idle),
            spec,
            leaves: RefCell::new((0..count).map(|_| LeafState::new()).collect()),
            handles: RefCell::new((0..count).map(|_| None).collect()),
            missing: Cell::new(count),
            running: Cell::new(count),
            downstream: downstream.clone(),
            equals: options.equals,
            last_emitted: RefCell::new(None),
        });
        downstream.add_teardown(Box::new(cloned!(activation => move || activation.cancel())));
        activation.run();
        activation
    }

    #[cfg(test)]
    fn state(&self) -> ActivationState {
        self.state.get()
    }

    fn is_active(&self) -> bool {
        self.state.get() == ActivationState::Active
    }

    fn run(self: &Rc<Self>) {
        // Downstream was already closed when the teardown was attached.
        if self.state.get() != ActivationState::Idle {
            return;
        }

        let count = self.spec.leaves.len();
        self.state.set(ActivationState::Active);
        debug!(activation = self.id, leaves = count, mode = ?self.mode, "activation started");

        if count == 0 {
            self.emit_snapshot();
            self.finish();
            return;
        }

        for index in 0..count {
            if !self.is_active() {
                break;
            }

            let adapter = LeafAdapter::new(self.spec.leaves[index].resolve(self.mode));
            let weak = Rc::downgrade(self);
            let on_value = on_leaf(&weak, move |a, value| a.on_value(index, value));
            let on_error = on_leaf(&weak, move |a, error| a.on_error(index, error));
            let on_complete = move || {
                if let Some(activation) = weak.upgrade() {
                    activation.on_complete(index);
                }
            };
            let handle = adapter.activate(on_value, on_complete, on_error);

            if self.is_active() {
                self.handles.borrow_mut()[index] = Some(handle);
            } else {
                // Terminated while this leaf was subscribing; it must not outlive us.
                handle.cancel();
            }
        }
    }

    fn on_value(&self, index: usize, value: Value) {
        if !self.is_active() {
            return;
        }

        {
            let mut leaves = self.leaves.borrow_mut();
            let leaf = &mut leaves[index];
            if leaf.is_terminal() {
                return;
            }
            if leaf.record(value) {
                self.missing.set(self.missing.get() - 1);
            }
        }
        trace!(activation = self.id, leaf = index, missing = self.missing.get(), "leaf value");

        if self.missing.get() == 0 {
            self.emit_snapshot();
        }
    }

    fn on_complete(&self, index: usize) {
        if !self.is_active() {
            return;
        }

        {
            let mut leaves = self.leaves.borrow_mut();
            if leaves[index].is_terminal() {
                return;
            }
            leaves[index].mark_completed();
        }
        self.running.set(self.running.get() - 1);
        trace!(activation = self.id, leaf = index, running = self.running.get(), "leaf completed");

        if self.running.get() == 0 {
            self.finish();
        }
    }

    fn on_error(&self, index: usize, error: LeafError) {
        if !self.is_active() {
            return;
        }

        self.state.set(ActivationState::Errored);
        self.leaves.borrow_mut()[index].mark_errored(error.clone());
        debug!(activation = self.id, leaf = index, %error, "leaf failed, cancelling siblings");

        self.release_leaves();
        self.downstream.error(error);
    }

    /// Downstream unsubscribed. Idempotent, silent.
    pub(crate) fn cancel(&self) {
        if self.state.get().is_terminal() {
            return;
        }

        self.state.set(ActivationState::Cancelled);
        debug!(activation = self.id, "activation cancelled");
        self.release_leaves();
    }

    fn finish(&self) {
        self.state.set(ActivationState::Completed);
        debug!(activation = self.id, "activation completed");
        self.release_leaves();
        self.downstream.complete();
    }

    fn emit_snapshot(&self) {
        let snapshot = {
            let leaves = self.leaves.borrow();
            debug_assert!(all_present(&leaves));
            recombine(&self.spec.root, &leaves)
        };

        if let Some(equals) = self.equals {
            let mut last = self.last_emitted.borrow_mut();
            if last.as_ref().is_some_and(|previous| equals(previous, &snapshot)) {
                trace!(activation = self.id, "composite unchanged, suppressed");
                return;
            }
            *last = Some(snapshot.clone());
        }

        trace!(activation = self.id, kind = snapshot.kind(), "composite emitted");
        self.downstream.next(snapshot);
    }

    /// Cancel every leaf subscription still open.
    fn release_leaves(&self) {
        for leaf in self.leaves.borrow_mut().iter_mut() {
            leaf.mark_cancelled();
        }

        let handles = std::mem::take(&mut *self.handles.borrow_mut());
        for handle in handles.into_iter().flatten() {
            handle.cancel();
        }
    }

    #[cfg(test)]
    fn leaf_states(&self) -> Vec<LeafState> {
        self.leaves.borrow().clone()
    }
}

/// Wrap a leaf callback so it only holds the activation weakly.
fn on_leaf<T>(
    weak: &Weak<Activation>,
    f: impl Fn(&Activation, T) + 'static,
) -> impl Fn(T) + 'static {
    let weak = weak.clone();
    move |arg| {
        if let Some(activation) = weak.upgrade() {
            f(&*activation, arg);
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::input::Input;
    use crate::aggregate::tree::build;
    use crate::core::constants::DEFAULT_MAX_DEPTH;
    use crate::core::types::{FnObserver, TeardownFn};
    use crate::primitives::{Observable, Subject};
    use serde_json::json;

    struct Recorder {
        values: Rc<RefCell<Vec<Value>>>,
        errors: Rc<RefCell<Vec<LeafError>>>,
        completed: Rc<Cell<bool>>,
    }

    fn recorder() -> (Subscriber, Recorder) {
        let rec = Recorder {
            values: Rc::new(RefCell::new(Vec::new())),
            errors: Rc::new(RefCell::new(Vec::new())),
            completed: Rc::new(Cell::new(false)),
        };
        let (v, e, c) = (rec.values.clone(), rec.errors.clone(), rec.completed.clone());
        let subscriber = Subscriber::new(
            FnObserver::new(move |value| v.borrow_mut().push(value))
                .on_error(move |error| e.borrow_mut().push(error))
                .on_complete(move || c.set(true)),
        );
        (subscriber, rec)
    }

    fn activate(input: Input) -> (Rc<Activation>, Subscriber, Recorder) {
        let spec = Rc::new(build(&input, DEFAULT_MAX_DEPTH).unwrap());
        let (subscriber, rec) = recorder();
        let activation = Activation::start(spec, Mode::Fetch, &AggregateOptions::default(), subscriber.clone());
        (activation, subscriber, rec)
    }

    #[test]
    fn constant_spec_emits_once_and_completes() {
        let (activation, _sub, rec) = activate(Input::from(json!({ "a": 1, "b": [true] })));

        assert_eq!(*rec.values.borrow(), vec![Value::from(json!({ "a": 1, "b": [true] }))]);
        assert!(rec.completed.get());
        assert_eq!(activation.state(), ActivationState::Completed);
    }

    #[test]
    fn waits_for_every_leaf() {
        let (a, b) = (Subject::new(), Subject::new());
        let (activation, _sub, rec) = activate(Input::seq([Input::from(&a), Input::from(&b)]));

        a.next(Value::from(1));
        assert!(rec.values.borrow().is_empty());

        b.next(Value::from(2));
        a.next(Value::from(3));

        assert_eq!(
            *rec.values.borrow(),
            vec![Value::from(json!([1, 2])), Value::from(json!([3, 2]))]
        );
        assert_eq!(activation.state(), ActivationState::Active);
    }

    #[test]
    fn completes_after_all_leaves_complete() {
        let (a, b) = (Subject::new(), Subject::new());
        let (activation, _sub, rec) = activate(Input::seq([Input::from(&a), Input::from(&b)]));

        a.next(Value::Null);
        a.complete();
        assert!(!rec.completed.get());

        b.complete();
        assert!(rec.completed.get());
        assert!(rec.values.borrow().is_empty(), "b never produced a value");
        assert_eq!(activation.state(), ActivationState::Completed);
    }

    #[test]
    fn error_cancels_siblings_and_propagates_the_same_error() {
        let (a, b, c) = (Subject::new(), Subject::new(), Subject::new());
        let (activation, _sub, rec) =
            activate(Input::seq([Input::from(&a), Input::from(&b), Input::from(&c)]));

        let error = LeafError::new("b broke");
        b.error(error.clone());

        assert_eq!(activation.state(), ActivationState::Errored);
        assert_eq!(a.cancellation_count(), 1);
        assert_eq!(c.cancellation_count(), 1);
        assert_eq!(rec.errors.borrow().len(), 1);
        assert!(rec.errors.borrow()[0].same_as(&error));

        let states = activation.leaf_states();
        assert!(states[0].is_cancelled());
        assert!(states[1].is_errored());
        assert!(states[2].is_cancelled());

        a.next(Value::Null);
        c.complete();
        assert!(rec.values.borrow().is_empty());
        assert!(!rec.completed.get());
    }

    #[test]
    fn synchronous_error_skips_remaining_leaves() {
        let later = Subject::new();
        let (activation, _sub, rec) = activate(Input::seq([
            Input::from(Observable::fail(LeafError::new("early"))),
            Input::from(&later),
        ]));

        assert_eq!(activation.state(), ActivationState::Errored);
        assert_eq!(rec.errors.borrow().len(), 1);
        assert_eq!(later.observer_count(), 0);
        assert_eq!(later.cancellation_count(), 0, "never subscribed");
    }

    #[test]
    fn cancel_releases_leaves_and_is_silent() {
        let (a, b) = (Subject::new(), Subject::new());
        let (activation, _sub, rec) = activate(Input::seq([Input::from(&a), Input::from(&b)]));

        activation.cancel();
        activation.cancel();

        assert_eq!(activation.state(), ActivationState::Cancelled);
        assert_eq!(a.observer_count() + b.observer_count(), 0);
        a.next(Value::Null);
        b.next(Value::Null);
        a.error(LeafError::new("ignored"));
        assert!(rec.values.borrow().is_empty());
        assert!(rec.errors.borrow().is_empty());
        assert!(!rec.completed.get());
    }

    #[test]
    fn cancel_after_completion_is_a_no_op() {
        let (activation, _sub, rec) = activate(Input::from(1));
        activation.cancel();
        assert_eq!(activation.state(), ActivationState::Completed);
        assert!(rec.completed.get());
    }

    #[test]
    fn distinct_option_suppresses_equal_composites() {
        let a = Subject::new();
        let spec = Rc::new(build(&Input::from(&a), DEFAULT_MAX_DEPTH).unwrap());
        let (subscriber, rec) = recorder();
        let _activation = Activation::start(spec, Mode::Watch, &AggregateOptions::default().distinct(), subscriber);

        a.next(Value::from(1));
        a.next(Value::from(1));
        a.next(Value::from(2));

        assert_eq!(*rec.values.borrow(), vec![Value::from(1), Value::from(2)]);
    }

    #[test]
    fn unsubscribe_during_first_pass_releases_siblings_before_returning() {
        let teardowns = Rc::new(Cell::new(0));
        let open = Observable::new(cloned!(teardowns => move |subscriber: Subscriber| {
            subscriber.next(Value::from(0));
            Some(Box::new(cloned!(teardowns => move || teardowns.set(teardowns.get() + 1))) as TeardownFn)
        }));
        let input = Input::seq([
            Input::from(open),
            Input::from(Observable::of([1i32, 2, 3].map(Value::from))),
        ]);
        let spec = Rc::new(build(&input, DEFAULT_MAX_DEPTH).unwrap());

        // The downstream unsubscribes itself from inside its first value.
        let this: Rc<RefCell<Option<Subscriber>>> = Rc::default();
        let nexts = Rc::new(Cell::new(0));
        let released_at_return = Rc::new(Cell::new(None));
        let downstream = Subscriber::new(FnObserver::new(
            cloned!(this, nexts, released_at_return, teardowns => move |_: Value| {
                nexts.set(nexts.get() + 1);
                let me = this.borrow().clone();
                if let Some(me) = me {
                    me.unsubscribe();
                    released_at_return.set(Some(teardowns.get()));
                }
            }),
        ));
        *this.borrow_mut() = Some(downstream.clone());

        let activation = Activation::start(spec, Mode::Fetch, &AggregateOptions::default(), downstream);

        assert_eq!(nexts.get(), 1);
        assert_eq!(released_at_return.get(), Some(1));
        assert_eq!(teardowns.get(), 1);
        assert_eq!(activation.state(), ActivationState::Cancelled);
        assert!(activation.leaf_states().iter().all(LeafState::is_terminal));

        this.borrow_mut().take();
    }

    #[test]
    fn already_closed_downstream_subscribes_nothing() {
        let a = Subject::new();
        let spec = Rc::new(build(&Input::from(&a), DEFAULT_MAX_DEPTH).unwrap());
        let (subscriber, rec) = recorder();
        subscriber.unsubscribe();

        let activation = Activation::start(spec, Mode::Watch, &AggregateOptions::default(), subscriber);

        assert_eq!(activation.state(), ActivationState::Cancelled);
        assert_eq!(a.observer_count(), 0);
        a.next(Value::Null);
        assert!(rec.values.borrow().is_empty());
    }

    #[test]
    fn terminal_states() {
        assert!(!ActivationState::Idle.is_terminal());
        assert!(!ActivationState::Active.is_terminal());
        assert!(ActivationState::Completed.is_terminal());
        assert!(ActivationState::Errored.is_terminal());
        assert!(ActivationState::Cancelled.is_terminal());
    }
}
