// ============================================================================
// spark-aggregate - Ergonomic Macros
// ============================================================================

/// Build an aggregate [`Input`](crate::Input) with JSON-like syntax.
///
/// Braces make a map node, brackets make a sequence node, and anything else
/// goes through `Input::from`. Values that are more than one token (method
/// calls, references, negative numbers) need parentheses.
///
/// # Usage
///
/// ```rust
/// use spark_aggregate::{aggregate, spec, Subject, Value};
///
/// let quotes = Subject::new();
/// let input = spec!({
///     "symbol" => "ACME",
///     "window" => [1, 5, 15],
///     "live" => (&quotes),
///     "offset" => (-3),
/// });
///
/// let query = aggregate(input).unwrap();
/// assert_eq!(query.leaf_count(), 1);
/// ```
#[macro_export]
macro_rules! spec {
    ({}) => {
        $crate::Input::map(::std::vec::Vec::<(::std::string::String, $crate::Input)>::new())
    };
    ([]) => {
        $crate::Input::seq(::std::vec::Vec::<$crate::Input>::new())
    };
    ({ $($key:literal => $value:tt),+ $(,)? }) => {
        $crate::Input::map([
            $( ($key, $crate::spec!($value)) ),+
        ])
    };
    ([ $($value:tt),+ $(,)? ]) => {
        $crate::Input::seq([
            $( $crate::spec!($value) ),+
        ])
    };
    ($other:expr) => {
        $crate::Input::from($other)
    };
}

/// Clone variables into a move closure.
///
/// # Usage
///
/// ```rust
/// use spark_aggregate::{cloned, Value};
/// use std::cell::RefCell;
/// use std::rc::Rc;
///
/// let seen = Rc::new(RefCell::new(Vec::new()));
/// let push = cloned!(seen => move |v: Value| seen.borrow_mut().push(v));
/// push(Value::from(1));
/// assert_eq!(seen.borrow().len(), 1);
/// ```
#[macro_export]
macro_rules! cloned {
    ($($n:ident),+ => $e:expr) => {
        {
            $( let $n = $n.clone(); )+
            $e
        }
    };
}
