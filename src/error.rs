//! Error taxonomy for the evaluator, the dataset loader and the format
//! registry (spec §7).
//!
//! The evaluator's errors are kept separate from the loader's and the
//! registry's: an [`EvalError`] is one half of the two-valued result every
//! operator produces, while [`DatasetError`] and [`FormatError`] are
//! ordinary `Result` errors surfaced by non-evaluator APIs.

use std::fmt;

use thiserror::Error;

/// Errors the expression evaluator can produce.
///
/// Every variant corresponds to a named failure mode in spec §7. `FatalError`
/// should never be observed on a well-formed expression tree; it exists so
/// that an exhaustive operator match has somewhere to put "this cannot
/// happen" without panicking.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvalError {
    /// An operand was not of a type the operator accepts.
    #[error("type error: {0}")]
    TypeError(String),

    /// Division or remainder by zero, or an XSD numeric overflow.
    #[error("arithmetic error: {0}")]
    ArithmeticError(String),

    /// An XSD cast could not reach the target datatype from the source.
    #[error("cannot cast to {target}: {reason}")]
    CastError { target: String, reason: String },

    /// A literal's lexical form does not match its claimed datatype.
    #[error("lexical error: {0}")]
    LexicalError(String),

    /// A regular expression failed to compile or execute.
    #[error("regex error: {0}")]
    RegexError(String),

    /// The operator is a recognised placeholder with no implementation at
    /// this layer (`SAMPLE`, `GROUP_CONCAT`).
    #[error("not implemented: {0}")]
    NotImplemented(&'static str),

    /// An expression node carried an operator tag the evaluator does not
    /// recognise. Unreachable for trees built through `expr::build`.
    #[error("fatal: unknown operator {0:?}")]
    FatalError(String),
}

impl EvalError {
    pub fn type_error(msg: impl Into<String>) -> Self {
        EvalError::TypeError(msg.into())
    }

    pub fn arithmetic(msg: impl Into<String>) -> Self {
        EvalError::ArithmeticError(msg.into())
    }
}

/// Errors from [`crate::dataset::Dataset::load`].
#[derive(Error, Debug)]
pub enum DatasetError {
    #[error("unrecognised RDF format {0:?}, downgrading to guess")]
    UnknownFormat(String),

    #[error("I/O error while loading triples: {0}")]
    Io(#[from] std::io::Error),

    #[error("RDF parse error: {0}")]
    Parse(String),

    #[error("base URI must be a non-empty absolute URI, got {0:?}")]
    InvalidBaseUri(String),
}

/// Errors from the result-format registry (spec §4.5).
#[derive(Error, Debug)]
pub enum FormatError {
    #[error("no formatter registered for {0}")]
    NotFound(String),

    #[error("factory {0:?} lacks the requested capability")]
    MissingCapability(String),

    #[error("row source exhausted with error: {0}")]
    RowSource(String),
}

/// A placeholder for the parser's `raptor_locator` (spec §4.3): file/line/
/// column context attached to diagnostics. The evaluator never constructs
/// one; it only threads through whatever the caller supplies.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Locator {
    pub uri: Option<String>,
    pub line: Option<usize>,
    pub column: Option<usize>,
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.uri, self.line) {
            (Some(uri), Some(line)) => write!(f, "{}:{}", uri, line),
            (Some(uri), None) => write!(f, "{}", uri),
            (None, Some(line)) => write!(f, "line {}", line),
            (None, None) => write!(f, "<unknown location>"),
        }
    }
}
