// ============================================================================
// spark-aggregate - Aggregate Query
// Public entry points: aggregate(), fetch(), watch(), and models
// ============================================================================

use std::rc::Rc;

use tracing::debug;

use crate::aggregate::activation::Activation;
use crate::aggregate::input::{Input, Query};
use crate::aggregate::leaf::Mode;
use crate::aggregate::options::AggregateOptions;
use crate::aggregate::tree::{build, BuiltSpec, SpecTree};
use crate::core::error::MalformedSpecError;
use crate::primitives::observable::Observable;

// =============================================================================
// AGGREGATE QUERY
// =============================================================================

/// A built aggregate. Cheap to clone; building subscribes nothing.
///
/// Every subscription to [`fetch`](Self::fetch) or [`watch`](Self::watch) is
/// an independent activation with its own leaf subscriptions.
///
/// # Example
///
/// ```
/// use spark_aggregate::{aggregate, spec, Subject, Value};
/// use std::cell::RefCell;
/// use std::rc::Rc;
///
/// let price = Subject::new();
/// let query = aggregate(spec!({ "symbol" => "ACME", "price" => (&price) })).unwrap();
///
/// let seen = Rc::new(RefCell::new(Vec::new()));
/// let sink = seen.clone();
/// let _sub = query.watch().subscribe_fn(move |v| sink.borrow_mut().push(v));
///
/// price.next(Value::from(10));
/// price.next(Value::from(11));
///
/// assert_eq!(seen.borrow().len(), 2);
/// assert_eq!(seen.borrow()[1].get("price"), Some(&Value::from(11)));
/// ```
#[derive(Clone)]
pub struct AggregateQuery {
    spec: Rc<BuiltSpec>,
    options: AggregateOptions,
}

impl AggregateQuery {
    /// Stream of composites with query leaves resolved by `fetch()`.
    pub fn fetch(&self) -> Observable {
        self.observe(Mode::Fetch)
    }

    /// Stream of composites with query leaves resolved by `watch()`.
    pub fn watch(&self) -> Observable {
        self.observe(Mode::Watch)
    }

    /// Stream of composites for the given mode.
    pub fn observe(&self, mode: Mode) -> Observable {
        let spec = self.spec.clone();
        let options = self.options;
        Observable::new(move |subscriber| {
            Activation::start(spec.clone(), mode, &options, subscriber);
            None
        })
    }

    /// Number of reactive leaves in the spec.
    pub fn leaf_count(&self) -> usize {
        self.spec.leaves.len()
    }

    /// The built shape of the spec.
    pub fn shape(&self) -> &SpecTree {
        &self.spec.root
    }

    pub fn options(&self) -> &AggregateOptions {
        &self.options
    }
}

impl Query for AggregateQuery {
    fn fetch(&self) -> Observable {
        AggregateQuery::fetch(self)
    }

    fn watch(&self) -> Observable {
        AggregateQuery::watch(self)
    }
}

impl From<AggregateQuery> for Input {
    fn from(query: AggregateQuery) -> Self {
        Input::Query(Rc::new(query))
    }
}

impl std::fmt::Debug for AggregateQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AggregateQuery")
            .field("spec", &self.spec)
            .field("options", &self.options)
            .finish()
    }
}

// =============================================================================
// CONSTRUCTORS
// =============================================================================

/// Build an aggregate from a spec with default options.
///
/// Fails before anything is subscribed if the spec contains itself or nests
/// too deeply.
pub fn aggregate(input: impl Into<Input>) -> Result<AggregateQuery, MalformedSpecError> {
    aggregate_with_options(input, AggregateOptions::default())
}

/// Build an aggregate with explicit options.
pub fn aggregate_with_options(
    input: impl Into<Input>,
    options: AggregateOptions,
) -> Result<AggregateQuery, MalformedSpecError> {
    let input = input.into();
    let spec = build(&input, options.max_depth)?;
    debug!(leaves = spec.leaves.len(), root = ?spec.root.kind(), "aggregate built");
    Ok(AggregateQuery {
        spec: Rc::new(spec),
        options,
    })
}

// =============================================================================
// MODEL
// =============================================================================

/// A reusable aggregate template: a function from arguments to a spec.
///
/// # Example
///
/// ```
/// use spark_aggregate::{model, spec};
///
/// let page = model(|offset: u32| spec!({ "offset" => offset, "limit" => 20 }));
/// let query = page.call(40).unwrap();
/// assert_eq!(query.leaf_count(), 0);
/// ```
pub struct Model<A> {
    build: Rc<dyn Fn(A) -> Input>,
    options: AggregateOptions,
}

impl<A> Model<A> {
    pub fn new(build: impl Fn(A) -> Input + 'static) -> Self {
        Self {
            build: Rc::new(build),
            options: AggregateOptions::default(),
        }
    }

    pub fn with_options(mut self, options: AggregateOptions) -> Self {
        self.options = options;
        self
    }

    /// Build the aggregate for one set of arguments.
    pub fn call(&self, args: A) -> Result<AggregateQuery, MalformedSpecError> {
        aggregate_with_options((self.build)(args), self.options)
    }
}

impl<A> Clone for Model<A> {
    fn clone(&self) -> Self {
        Self {
            build: self.build.clone(),
            options: self.options,
        }
    }
}

/// Create a [`Model`] from a spec-producing function.
pub fn model<A, F>(build: F) -> Model<A>
where
    F: Fn(A) -> Input + 'static,
{
    Model::new(build)
}

// =============================================================================
// TESTS
// =============================================================================
