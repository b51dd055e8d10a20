//! Expression node constructors (spec §4.2), grouped by arity/class: 0-op
//! constants, 1/2/3-op with child expressions, string-ops (an expression
//! plus an attached literal), literal-wrapping, function calls, aggregates,
//! cast, coalesce, the `IN`/`NOT IN` set operators, and group-concat.
//!
//! Safe Rust has no allocation-failure path to unwind through, so unlike the
//! source's `tidy:`-label cleanup these factories are infallible: passing
//! owned `Expr`s in and getting an owned `Expr` out is itself spec §4.2's
//! ownership rule, enforced by the type system rather than by hand-written
//! release calls.

use std::rc::Rc;

use super::{Expr, ExprFlags, ExprNode, Op};
use crate::term::Term;

fn node(op: Op) -> ExprNode {
    ExprNode {
        op,
        arg1: None,
        arg2: None,
        arg3: None,
        literal: None,
        name: None,
        args: None,
        params: None,
        flags: ExprFlags::NONE,
    }
}

/// `VARSTAR`, the sentinel for `COUNT(*)` (spec §4.3).
pub fn varstar() -> Expr {
    Expr(Rc::new(node(Op::Varstar)))
}

/// One-operand expressions: `TILDE`, `BANG`, `UMINUS`, `BOUND`, `STR`,
/// `LANG`, `DATATYPE`, `ISURI`, `ISBLANK`, `ISLITERAL`, `ISNUMERIC`,
/// `ORDER_COND_*`, `GROUP_COND_*`, the COUNT-style aggregate pass-throughs,
/// and the `URI`/`IRI` constructor (spec §4.2 arg1-only shape).
pub fn unary(op: Op, arg: Expr) -> Expr {
    let mut n = node(op);
    n.arg1 = Some(arg);
    Expr(Rc::new(n))
}

/// Two-operand expressions: `AND`, `OR`, `EQ`/`NEQ`/`LT`/`GT`/`LE`/`GE`,
/// `PLUS`/`MINUS`/`STAR`/`SLASH`/`REM`, `STR_EQ`/`STR_NEQ`, `LANGMATCHES`,
/// `SAMETERM`, `STRLANG`, `STRDT`.
pub fn binary(op: Op, left: Expr, right: Expr) -> Expr {
    let mut n = node(op);
    n.arg1 = Some(left);
    n.arg2 = Some(right);
    Expr(Rc::new(n))
}

/// `IF(cond, then, else)`, the only 3-operand expression.
pub fn if_then_else(cond: Expr, then_branch: Expr, else_branch: Expr) -> Expr {
    let mut n = node(Op::If);
    n.arg1 = Some(cond);
    n.arg2 = Some(then_branch);
    n.arg3 = Some(else_branch);
    Expr(Rc::new(n))
}

/// A string-op: one expression plus an attached literal pattern, used by
/// the legacy `STR_MATCH`/`STR_NMATCH` (a regex pattern held as `literal`
/// rather than as a second expression, per spec §4.2).
pub fn string_op(op: Op, text: Expr, pattern: Term) -> Expr {
    let mut n = node(op);
    n.arg1 = Some(text);
    n.literal = Some(pattern);
    Expr(Rc::new(n))
}

/// `REGEX(text, pattern, flags?)`. Unlike the legacy `STR_MATCH`, both
/// pattern and flags are themselves expressions (so they can be computed,
/// not just literal).
pub fn regex(text: Expr, pattern: Expr, flags: Option<Expr>) -> Expr {
    let mut n = node(Op::Regex);
    n.arg1 = Some(text);
    n.arg2 = Some(pattern);
    n.arg3 = flags;
    Expr(Rc::new(n))
}

/// Wrap a literal value (spec §4.3 `LITERAL`). `VarRef` literals flatten at
/// evaluation time except under `BOUND`, which inspects the binding
/// directly.
pub fn literal(value: Term) -> Expr {
    let mut n = node(Op::Literal);
    n.literal = Some(value);
    Expr(Rc::new(n))
}

/// An external extension function call: a URI name, an ordered argument
/// sequence, an optional parameter sequence, and a flags bitset whose
/// meaning is extension-defined.
pub fn function(name: impl Into<Rc<str>>, args: Vec<Expr>, params: Vec<Expr>, flags: ExprFlags) -> Expr {
    let mut n = node(Op::Function);
    n.name = Some(name.into());
    n.args = Some(args);
    n.params = if params.is_empty() { None } else { Some(params) };
    n.flags = flags;
    Expr(Rc::new(n))
}

/// An aggregate marker (`COUNT`, `SUM`, `AVG`, `MIN`, `MAX`, `SAMPLE`,
/// `GROUP_CONCAT` go through [`group_concat`] instead): one argument plus
/// `flags`, which always carries the implicit `AGGREGATE` role this crate
/// represents by setting no extra bit — aggregation itself is the
/// planner's responsibility, this layer only recognises the shape (spec
/// §4.3).
pub fn aggregate(op: Op, arg: Expr, flags: ExprFlags) -> Expr {
    let mut n = node(op);
    n.arg1 = Some(arg);
    n.flags = flags;
    Expr(Rc::new(n))
}

/// `GROUP_CONCAT(flags, args, separator?)`.
pub fn group_concat(args: Vec<Expr>, separator: Option<Term>, flags: ExprFlags) -> Expr {
    let mut n = node(Op::GroupConcat);
    n.args = Some(args);
    n.literal = separator;
    n.flags = flags;
    Expr(Rc::new(n))
}

/// `CAST(value, target-datatype-uri)`.
pub fn cast(value: Expr, target_datatype: impl Into<Rc<str>>) -> Expr {
    let mut n = node(Op::Cast);
    n.arg1 = Some(value);
    n.name = Some(target_datatype.into());
    Expr(Rc::new(n))
}

/// `COALESCE(e1, …, en)`.
pub fn coalesce(args: Vec<Expr>) -> Expr {
    let mut n = node(Op::Coalesce);
    n.args = Some(args);
    Expr(Rc::new(n))
}

/// `IN(x, e1…en)` / `NOT IN`, sharing a discriminant expression (`arg1`)
/// and an argument sequence.
pub fn in_set(negated: bool, discriminant: Expr, set: Vec<Expr>) -> Expr {
    let mut n = node(if negated { Op::NotIn } else { Op::In });
    n.arg1 = Some(discriminant);
    n.args = Some(set);
    Expr(Rc::new(n))
}

/// `BNODE()` / `BNODE(s)`: zero or one argument.
pub fn bnode(arg: Option<Expr>) -> Expr {
    let mut n = node(Op::Bnode);
    n.arg1 = arg;
    Expr(Rc::new(n))
}
