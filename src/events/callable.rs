//! # Closed-set callable dispatch.
//!
//! A [`Callable`] names one of a small, closed set of callable shapes the
//! runtime knows how to invoke. Collaborator code (DSP, GPIO, audio, console)
//! hands closures to the event table at start-up; member-bound functions are
//! expressed as closures capturing their collaborator (`Arc<Collaborator>`).
//!
//! The set is closed by construction: supporting a new collaborator signature
//! means adding one enum variant and one dispatch arm here. There is no
//! run-time plugin mechanism.
//!
//! ## Example
//! ```
//! use std::sync::Arc;
//! use beatcore::{ArgValue, Callable, RetValue};
//!
//! let double = Callable::int_in_int_out(|v| v * 2);
//! assert!(double.accepts(&ArgValue::Int(21)));
//! assert_eq!(double.invoke(&ArgValue::Int(21)).unwrap(), RetValue::Int(42));
//! ```

use std::fmt;
use std::sync::Arc;

use crate::error::RuntimeError;

/// Zero-argument, no-result callable.
pub type NoArgFn = Arc<dyn Fn() + Send + Sync>;
/// Zero-argument callable returning an integer.
pub type IntOutFn = Arc<dyn Fn() -> i64 + Send + Sync>;
/// Zero-argument callable returning text.
pub type TextOutFn = Arc<dyn Fn() -> String + Send + Sync>;
/// Zero-argument callable returning a float.
pub type FloatOutFn = Arc<dyn Fn() -> f64 + Send + Sync>;
/// One-integer-argument, no-result callable.
pub type IntInFn = Arc<dyn Fn(i64) + Send + Sync>;
/// One-integer-argument callable returning an integer.
pub type IntInIntOutFn = Arc<dyn Fn(i64) -> i64 + Send + Sync>;
/// One-float-argument callable returning a float.
pub type FloatInFloatOutFn = Arc<dyn Fn(f64) -> f64 + Send + Sync>;
/// One-text-argument, no-result callable.
pub type TextInFn = Arc<dyn Fn(Arc<str>) + Send + Sync>;

/// The at-most-one argument value carried alongside an event's callable.
#[derive(Clone, Debug)]
pub enum ArgValue {
    /// No argument.
    None,
    /// Integer argument.
    Int(i64),
    /// Float argument.
    Float(f64),
    /// Text argument (shared, cheap to clone into the queue).
    Text(Arc<str>),
}

impl ArgValue {
    /// Returns a short stable name for the argument variant.
    pub fn as_label(&self) -> &'static str {
        match self {
            ArgValue::None => "none",
            ArgValue::Int(_) => "int",
            ArgValue::Float(_) => "float",
            ArgValue::Text(_) => "text",
        }
    }
}

/// The at-most-one result value of a callable invocation.
#[derive(Clone, Debug, PartialEq)]
pub enum RetValue {
    /// Void shapes produce no result; no register slot is written.
    None,
    /// Integer result, written to the integer register slot.
    Int(i64),
    /// Float result, written to the float register slot.
    Float(f64),
    /// Text result, written to the text register slot.
    Text(String),
}

/// A callable matching one of the runtime's fixed shapes.
///
/// Cheap to clone: every variant holds an `Arc`'d closure.
#[derive(Clone)]
pub enum Callable {
    /// `fn()`
    NoArg(NoArgFn),
    /// `fn() -> i64`
    IntOut(IntOutFn),
    /// `fn() -> String`
    TextOut(TextOutFn),
    /// `fn() -> f64`
    FloatOut(FloatOutFn),
    /// `fn(i64)`
    IntIn(IntInFn),
    /// `fn(i64) -> i64`
    IntInIntOut(IntInIntOutFn),
    /// `fn(f64) -> f64`
    FloatInFloatOut(FloatInFloatOutFn),
    /// `fn(Arc<str>)`
    TextIn(TextInFn),
}

impl Callable {
    /// Wraps a zero-argument, no-result closure.
    pub fn no_arg(f: impl Fn() + Send + Sync + 'static) -> Self {
        Callable::NoArg(Arc::new(f))
    }

    /// Wraps a zero-argument closure returning an integer.
    pub fn int_out(f: impl Fn() -> i64 + Send + Sync + 'static) -> Self {
        Callable::IntOut(Arc::new(f))
    }

    /// Wraps a zero-argument closure returning text.
    pub fn text_out(f: impl Fn() -> String + Send + Sync + 'static) -> Self {
        Callable::TextOut(Arc::new(f))
    }

    /// Wraps a zero-argument closure returning a float.
    pub fn float_out(f: impl Fn() -> f64 + Send + Sync + 'static) -> Self {
        Callable::FloatOut(Arc::new(f))
    }

    /// Wraps a one-integer-argument, no-result closure.
    pub fn int_in(f: impl Fn(i64) + Send + Sync + 'static) -> Self {
        Callable::IntIn(Arc::new(f))
    }

    /// Wraps a one-integer-argument closure returning an integer.
    pub fn int_in_int_out(f: impl Fn(i64) -> i64 + Send + Sync + 'static) -> Self {
        Callable::IntInIntOut(Arc::new(f))
    }

    /// Wraps a one-float-argument closure returning a float.
    pub fn float_in_float_out(f: impl Fn(f64) -> f64 + Send + Sync + 'static) -> Self {
        Callable::FloatInFloatOut(Arc::new(f))
    }

    /// Wraps a one-text-argument, no-result closure.
    pub fn text_in(f: impl Fn(Arc<str>) + Send + Sync + 'static) -> Self {
        Callable::TextIn(Arc::new(f))
    }

    /// Returns a short stable name for the shape.
    pub fn shape(&self) -> &'static str {
        match self {
            Callable::NoArg(_) => "no_arg",
            Callable::IntOut(_) => "int_out",
            Callable::TextOut(_) => "text_out",
            Callable::FloatOut(_) => "float_out",
            Callable::IntIn(_) => "int_in",
            Callable::IntInIntOut(_) => "int_in_int_out",
            Callable::FloatInFloatOut(_) => "float_in_float_out",
            Callable::TextIn(_) => "text_in",
        }
    }

    /// Reports whether this shape accepts the given argument.
    ///
    /// Checked once at bind time by the event table builder; an event whose
    /// shape rejects its argument is never constructed.
    pub fn accepts(&self, arg: &ArgValue) -> bool {
        matches!(
            (self, arg),
            (Callable::NoArg(_), ArgValue::None)
                | (Callable::IntOut(_), ArgValue::None)
                | (Callable::TextOut(_), ArgValue::None)
                | (Callable::FloatOut(_), ArgValue::None)
                | (Callable::IntIn(_), ArgValue::Int(_))
                | (Callable::IntInIntOut(_), ArgValue::Int(_))
                | (Callable::FloatInFloatOut(_), ArgValue::Float(_))
                | (Callable::TextIn(_), ArgValue::Text(_))
        )
    }

    /// Invokes the callable with the given argument.
    ///
    /// Returns the shape's result value, or [`RuntimeError::ShapeMismatch`]
    /// if the argument does not fit the shape (unreachable for events built
    /// through the table builder, which validates with [`Callable::accepts`]).
    pub fn invoke(&self, arg: &ArgValue) -> Result<RetValue, RuntimeError> {
        match (self, arg) {
            (Callable::NoArg(f), ArgValue::None) => {
                f();
                Ok(RetValue::None)
            }
            (Callable::IntOut(f), ArgValue::None) => Ok(RetValue::Int(f())),
            (Callable::TextOut(f), ArgValue::None) => Ok(RetValue::Text(f())),
            (Callable::FloatOut(f), ArgValue::None) => Ok(RetValue::Float(f())),
            (Callable::IntIn(f), ArgValue::Int(v)) => {
                f(*v);
                Ok(RetValue::None)
            }
            (Callable::IntInIntOut(f), ArgValue::Int(v)) => Ok(RetValue::Int(f(*v))),
            (Callable::FloatInFloatOut(f), ArgValue::Float(v)) => Ok(RetValue::Float(f(*v))),
            (Callable::TextIn(f), ArgValue::Text(s)) => {
                f(Arc::clone(s));
                Ok(RetValue::None)
            }
            _ => Err(RuntimeError::ShapeMismatch {
                shape: self.shape(),
            }),
        }
    }
}

impl fmt::Debug for Callable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Callable").field(&self.shape()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicI64, Ordering};

    #[test]
    fn test_accepts_matches_shapes() {
        assert!(Callable::no_arg(|| {}).accepts(&ArgValue::None));
        assert!(!Callable::no_arg(|| {}).accepts(&ArgValue::Int(1)));
        assert!(Callable::int_in(|_| {}).accepts(&ArgValue::Int(1)));
        assert!(!Callable::int_in(|_| {}).accepts(&ArgValue::Float(1.0)));
        assert!(Callable::text_in(|_| {}).accepts(&ArgValue::Text("x".into())));
    }

    #[test]
    fn test_invoke_returns_typed_results() {
        let c = Callable::int_out(|| 7);
        assert_eq!(c.invoke(&ArgValue::None).unwrap(), RetValue::Int(7));

        let c = Callable::float_in_float_out(|v| v / 2.0);
        assert_eq!(
            c.invoke(&ArgValue::Float(3.0)).unwrap(),
            RetValue::Float(1.5)
        );

        let c = Callable::text_out(|| "bpm".to_string());
        assert_eq!(
            c.invoke(&ArgValue::None).unwrap(),
            RetValue::Text("bpm".to_string())
        );
    }

    #[test]
    fn test_invoke_runs_side_effects() {
        let hits = Arc::new(AtomicI64::new(0));
        let h = hits.clone();
        let c = Callable::int_in(move |v| {
            h.fetch_add(v, Ordering::SeqCst);
        });
        c.invoke(&ArgValue::Int(5)).unwrap();
        c.invoke(&ArgValue::Int(3)).unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 8);
    }

    #[test]
    fn test_invoke_mismatch_reports_shape() {
        let c = Callable::int_in(|_| {});
        let err = c.invoke(&ArgValue::None).unwrap_err();
        assert_eq!(err, RuntimeError::ShapeMismatch { shape: "int_in" });
    }
}
