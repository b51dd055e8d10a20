//! A typed expression evaluator, an in-memory RDF triple dataset, and a
//! pluggable result-format registry for a SPARQL/RDQL query engine.
//!
//! The SPARQL/RDQL parser, the RDF syntax parser's full surface, result-set
//! codec bodies, and the query planner are external collaborators; this
//! crate covers the evaluation core those layers sit on top of:
//!
//! - [`term`] — the RDF term/literal model and its typed operations
//!   (coercion, comparison, arithmetic, casting).
//! - [`expr`] — the expression tree ([`expr::build`]) and its recursive
//!   evaluator ([`expr::eval`]).
//! - [`dataset`] — the append-only triple store and its position-based
//!   match iterator, plus a minimal Turtle/N-Triples/TriG/N-Quads loader.
//! - [`formats`] — the name/URI/MIME-indexed result-format registry.
//! - [`world`] — shared evaluation context: blank-node minting, the
//!   compiled-regex cache, and comparison flags.
//! - [`binding`] — shared, interior-mutable variable binding slots.
//! - [`error`] — the evaluator/dataset/format error taxonomies.

pub mod binding;
pub mod dataset;
pub mod error;
pub mod expr;
pub mod formats;
pub mod term;
pub mod world;

pub use binding::Binding;
pub use dataset::{Dataset, Triple, TriplePart};
pub use error::{DatasetError, EvalError, FormatError, Locator};
pub use expr::eval::evaluate;
pub use expr::{Expr, Op};
pub use term::Term;
pub use world::{EvalFlags, World};
