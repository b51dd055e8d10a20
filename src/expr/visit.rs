//! Generic tree traversal and the small analyses built on top of it (spec
//! §2 item 6 / §4.6): pre-order walk, constant-folding classification,
//! variable-mention detection, and evaluating an argument sequence into a
//! list of result literals.

use crate::binding::Binding;
use crate::error::{EvalError, Locator};
use crate::term::Term;
use crate::world::{EvalFlags, World};

use super::eval::evaluate;
use super::{Expr, Op};

/// Visit `expr` and every descendant, pre-order (a node before its
/// children), calling `visitor` once per node.
pub fn walk<F: FnMut(&Expr)>(expr: &Expr, visitor: &mut F) {
    visitor(expr);
    for child in [expr.arg1(), expr.arg2(), expr.arg3()] {
        if let Some(child) = child {
            walk(child, visitor);
        }
    }
    if let Some(args) = expr.args() {
        for a in args {
            walk(a, visitor);
        }
    }
    if let Some(params) = expr.params() {
        for p in params {
            walk(p, visitor);
        }
    }
}

/// `true` iff no descendant depends on anything outside the expression
/// itself: no `VarRef` literal and no argument-less `BNODE()` (which mints
/// a fresh id on every evaluation, per spec §4.3's determinism note).
/// Constant expressions may safely be evaluated once and cached by a
/// caller; this crate does not do so itself.
pub fn is_constant(expr: &Expr) -> bool {
    let mut constant = true;
    walk(expr, &mut |node| {
        if let Op::Literal = node.op() {
            if let Some(Term::Var(_)) = node.literal() {
                constant = false;
            }
        }
        if node.op() == Op::Bnode && node.arg1().is_none() {
            constant = false;
        }
    });
    constant
}

/// Collect every distinct variable binding mentioned anywhere in `expr`
/// (including under `BOUND`).
pub fn variables_mentioned(expr: &Expr) -> Vec<Binding> {
    let mut found: Vec<Binding> = Vec::new();
    walk(expr, &mut |node| {
        if let Op::Literal = node.op() {
            if let Some(Term::Var(b)) = node.literal() {
                if !found.iter().any(|existing| existing == b) {
                    found.push(b.clone());
                }
            }
        }
    });
    found
}

/// Evaluate every expression in `exprs` against the same world/bindings,
/// collecting a result literal per element. Used by `COALESCE`, `IN`/`NOT
/// IN`, and function argument lists (spec §4.6).
pub fn eval_sequence(
    world: &World,
    locator: Option<&Locator>,
    exprs: &[Expr],
    flags: EvalFlags,
) -> Vec<Result<Term, EvalError>> {
    exprs
        .iter()
        .map(|e| evaluate(world, locator, e, flags))
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::expr::{build, Op};

    #[test]
    fn literal_tree_with_no_variable_or_bare_bnode_is_constant() {
        let e = build::binary(
            Op::Plus,
            build::literal(Term::integer(1)),
            build::literal(Term::integer(2)),
        );
        assert!(is_constant(&e));
    }

    #[test]
    fn a_variable_reference_makes_the_tree_non_constant() {
        let binding = Binding::new("x");
        let e = build::unary(Op::Str, build::literal(Term::Var(binding)));
        assert!(!is_constant(&e));
    }

    #[test]
    fn argument_less_bnode_is_not_constant() {
        let e = build::bnode(None);
        assert!(!is_constant(&e));
        let e2 = build::bnode(Some(build::literal(Term::plain_string("stable"))));
        assert!(is_constant(&e2));
    }

    #[test]
    fn variables_mentioned_collects_each_distinct_binding_once() {
        let x = Binding::new("x");
        let e = build::binary(
            Op::And,
            build::unary(Op::Bound, build::literal(Term::Var(x.clone()))),
            build::literal(Term::Var(x.clone())),
        );
        let found = variables_mentioned(&e);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0], x);
    }

    #[test]
    fn eval_sequence_preserves_order_and_per_item_errors() {
        let world = World::new();
        let ok = build::literal(Term::integer(1));
        let bad = build::unary(Op::Lang, build::literal(Term::uri("http://example/x")));
        let results = eval_sequence(&world, None, &[ok, bad], EvalFlags::NONE);
        assert!(results[0].is_ok());
        assert!(results[1].is_err());
    }
}
