//! The expression tree (spec §3 "Expression node", §4.2).
//!
//! An [`Expr`] is a cheap-to-clone handle (`Rc<ExprNode>`) over a node
//! carrying an operator tag, up to three positional child expressions, and
//! the operator-specific extras (`literal`, `name`, `args`, `params`,
//! `flags`). `Clone` on `Expr` is spec §4.2's `ref()`; the last `Drop` is
//! `release()`, and because the tree is acyclic (a DAG rooted at the
//! caller, normally a tree) ordinary `Rc` counting needs no cycle
//! collector.

pub mod build;
pub mod eval;
pub mod visit;

use std::rc::Rc;

use crate::term::Term;

/// Operator tags. Grouped the way spec §9 suggests for readability rather
/// than mirroring the source's single flat enum 1:1; the evaluator's match
/// arms (in `eval`) follow the same grouping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    // Three-valued logic
    And,
    Or,
    // Comparison
    Eq,
    Neq,
    Lt,
    Gt,
    Le,
    Ge,
    // Legacy RDQL string (in)equality — lexical comparison, no type check
    StrEq,
    StrNeq,
    // Arithmetic
    Plus,
    Minus,
    Star,
    Slash,
    Rem,
    // Unary
    Uminus,
    Tilde,
    Bang,
    // Term inspection
    Bound,
    Str,
    Lang,
    Langmatches,
    Datatype,
    Isuri,
    Isblank,
    Isliteral,
    Isnumeric,
    Sameterm,
    // Pattern matching
    Regex,
    StrMatch,
    StrNmatch,
    // Control flow / sequences
    If,
    Coalesce,
    In,
    NotIn,
    // Construction
    Uri,
    Strlang,
    Strdt,
    Bnode,
    Cast,
    Literal,
    // Extension
    Function,
    // Aggregates (placeholders at this layer except the COUNT-style pass
    // through, per spec §4.3)
    Count,
    Sum,
    Avg,
    Min,
    Max,
    Sample,
    GroupConcat,
    Varstar,
    // Ordering / grouping wrappers
    OrderCondAsc,
    OrderCondDesc,
    GroupCondAsc,
    GroupCondDesc,
}

/// Operator-specific bits. The only bit this core interprets is `DISTINCT`
/// on an aggregate; the rest (e.g. extension-call flags on `FUNCTION`) are
/// opaque payload the planner defines meaning for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExprFlags(pub u32);

impl ExprFlags {
    pub const NONE: ExprFlags = ExprFlags(0);
    pub const DISTINCT: ExprFlags = ExprFlags(1 << 0);

    pub fn contains(self, other: ExprFlags) -> bool {
        self.0 & other.0 == other.0
    }
}

/// The node itself. Not constructed directly outside this module; use the
/// factories in [`build`].
#[derive(Debug)]
pub struct ExprNode {
    pub op: Op,
    pub arg1: Option<Expr>,
    pub arg2: Option<Expr>,
    pub arg3: Option<Expr>,
    pub literal: Option<Term>,
    pub name: Option<Rc<str>>,
    pub args: Option<Vec<Expr>>,
    pub params: Option<Vec<Expr>>,
    pub flags: ExprFlags,
}

/// A reference-counted handle to an [`ExprNode`] (spec §4.2 ownership
/// rule). `Expr::clone` is `ref()`; dropping the last handle recursively
/// drops owned children, which is `release()`.
#[derive(Debug, Clone)]
pub struct Expr(pub(crate) Rc<ExprNode>);

impl Expr {
    pub fn op(&self) -> Op {
        self.0.op
    }

    pub fn arg1(&self) -> Option<&Expr> {
        self.0.arg1.as_ref()
    }

    pub fn arg2(&self) -> Option<&Expr> {
        self.0.arg2.as_ref()
    }

    pub fn arg3(&self) -> Option<&Expr> {
        self.0.arg3.as_ref()
    }

    pub fn literal(&self) -> Option<&Term> {
        self.0.literal.as_ref()
    }

    pub fn name(&self) -> Option<&str> {
        self.0.name.as_deref()
    }

    pub fn args(&self) -> Option<&[Expr]> {
        self.0.args.as_deref()
    }

    pub fn params(&self) -> Option<&[Expr]> {
        self.0.params.as_deref()
    }

    pub fn flags(&self) -> ExprFlags {
        self.0.flags
    }

    /// Reference-count identity, not structural equality: two separately
    /// constructed but identical-looking trees are not `ptr_eq`.
    pub fn ptr_eq(a: &Expr, b: &Expr) -> bool {
        Rc::ptr_eq(&a.0, &b.0)
    }
}
