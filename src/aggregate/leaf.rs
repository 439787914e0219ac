// ============================================================================
// spark-aggregate - Leaf Adapter
// One reactive source, its per-activation state, and its cancel handle
// ============================================================================

use std::rc::Rc;

use crate::aggregate::input::Query;
use crate::core::constants::*;
use crate::core::error::LeafError;
use crate::core::types::FnObserver;
use crate::core::value::Value;
use crate::primitives::observable::Observable;
use crate::primitives::subscriber::Subscription;

// =============================================================================
// MODE & SOURCE
// =============================================================================

/// How query leaves are resolved for one activation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    /// Current results, then completion
    Fetch,
    /// Results followed by every later change
    Watch,
}

/// Where a reactive leaf gets its stream from.
#[derive(Clone)]
pub enum LeafSource {
    Stream(Observable),
    Query(Rc<dyn Query>),
}

impl LeafSource {
    /// Produce the stream for one activation. Queries are asked afresh each
    /// time, so activations never share an upstream subscription.
    pub fn resolve(&self, mode: Mode) -> Observable {
        match (self, mode) {
            (LeafSource::Stream(stream), _) => stream.clone(),
            (LeafSource::Query(query), Mode::Fetch) => query.fetch(),
            (LeafSource::Query(query), Mode::Watch) => query.watch(),
        }
    }
}

// =============================================================================
// LEAF STATE
// =============================================================================

/// What an activation knows about one leaf.
#[derive(Debug, Clone, Default)]
pub struct LeafState {
    last_value: Option<Value>,
    error: Option<LeafError>,
    flags: u32,
}

impl LeafState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a new value. Returns true if this is the leaf's first value.
    pub fn record(&mut self, value: Value) -> bool {
        let first = !self.has_value();
        self.last_value = Some(value);
        self.flags |= LEAF_HAS_VALUE;
        first
    }

    pub fn mark_completed(&mut self) {
        self.flags |= LEAF_COMPLETED;
    }

    pub fn mark_errored(&mut self, error: LeafError) {
        self.error = Some(error);
        self.flags |= LEAF_ERRORED;
    }

    /// Flag a leaf that was still running when the activation ended.
    pub fn mark_cancelled(&mut self) {
        if !self.is_terminal() {
            self.flags |= LEAF_CANCELLED;
        }
    }

    pub fn last_value(&self) -> Option<&Value> {
        self.last_value.as_ref()
    }

    pub fn error(&self) -> Option<&LeafError> {
        self.error.as_ref()
    }

    pub fn has_value(&self) -> bool {
        self.flags & LEAF_HAS_VALUE != 0
    }

    pub fn is_completed(&self) -> bool {
        self.flags & LEAF_COMPLETED != 0
    }

    pub fn is_errored(&self) -> bool {
        self.flags & LEAF_ERRORED != 0
    }

    pub fn is_cancelled(&self) -> bool {
        self.flags & LEAF_CANCELLED != 0
    }

    /// No further events are accepted for this leaf.
    pub fn is_terminal(&self) -> bool {
        self.flags & LEAF_TERMINAL_MASK != 0
    }
}

// =============================================================================
// LEAF ADAPTER
// =============================================================================

/// Consumes one leaf stream on behalf of an activation.
pub struct LeafAdapter {
    source: Observable,
}

impl LeafAdapter {
    pub fn new(source: Observable) -> Self {
        Self { source }
    }

    /// Start consuming the source.
    ///
    /// `on_value` runs synchronously for each emission, in source order, and
    /// may already run before this returns. `on_complete` and `on_error` run
    /// at most once between them.
    pub fn activate(
        &self,
        on_value: impl Fn(Value) + 'static,
        on_complete: impl Fn() + 'static,
        on_error: impl Fn(LeafError) + 'static,
    ) -> LeafHandle {
        let observer = FnObserver::new(on_value)
            .on_complete(on_complete)
            .on_error(on_error);
        LeafHandle {
            subscription: self.source.subscribe(observer),
        }
    }
}

/// Cancel handle for one activated leaf. Dropping it cancels.
pub struct LeafHandle {
    subscription: Subscription,
}

impl LeafHandle {
    /// Stop forwarding and release the upstream subscription. Idempotent,
    /// safe after the leaf has completed or failed.
    pub fn cancel(&self) {
        self.subscription.unsubscribe();
    }

    pub fn is_closed(&self) -> bool {
        self.subscription.is_closed()
    }
}

// =============================================================================
// TESTS
// =============================================================================
