//! The recursive expression evaluator (spec §4.3): walks an [`Expr`] tree
//! to a single result [`Term`] or a defined [`EvalError`], applying SPARQL
//! value semantics including three-valued logic and type-error
//! propagation.

use crate::error::{EvalError, Locator};
use crate::term::{self, RdfTermType, Term};
use crate::world::{EvalFlags, World};

use super::visit::eval_sequence;
use super::{Expr, Op};

/// `evaluate(world, locator?, expr, flags) -> Term | Error` (spec §6).
///
/// A pure function of `expr` and the current variable bindings, with the
/// sole exception of `BNODE()` with no argument, which mints a fresh
/// identifier on every call (spec §4.3 "Determinism").
pub fn evaluate(
    world: &World,
    locator: Option<&Locator>,
    expr: &Expr,
    flags: EvalFlags,
) -> Result<Term, EvalError> {
    match expr.op() {
        // --- three-valued logic --------------------------------------
        Op::And => eval_and(world, locator, expr, flags),
        Op::Or => eval_or(world, locator, expr, flags),

        // --- comparison -------------------------------------------------
        Op::Eq => {
            let (a, b) = eval_pair(world, locator, expr, flags)?;
            Ok(Term::boolean(term::equals(&a, &b, flags)?))
        }
        Op::Neq => {
            let (a, b) = eval_pair(world, locator, expr, flags)?;
            Ok(Term::boolean(!term::equals(&a, &b, flags)?))
        }
        Op::Lt => compare_bool(world, locator, expr, flags, |o| o.is_lt()),
        Op::Gt => compare_bool(world, locator, expr, flags, |o| o.is_gt()),
        Op::Le => compare_bool(world, locator, expr, flags, |o| o.is_le()),
        Op::Ge => compare_bool(world, locator, expr, flags, |o| o.is_ge()),

        // --- legacy RDQL lexical (in)equality ----------------------------
        Op::StrEq => {
            let (a, b) = eval_pair(world, locator, expr, flags)?;
            let (sa, sb) = (term::as_string(&a, flags)?, term::as_string(&b, flags)?);
            Ok(Term::boolean(str_eq(&sa, &sb, flags)))
        }
        Op::StrNeq => {
            let (a, b) = eval_pair(world, locator, expr, flags)?;
            let (sa, sb) = (term::as_string(&a, flags)?, term::as_string(&b, flags)?);
            Ok(Term::boolean(!str_eq(&sa, &sb, flags)))
        }

        // --- arithmetic ---------------------------------------------------
        Op::Plus => {
            let (a, b) = eval_pair(world, locator, expr, flags)?;
            term::add(&a, &b)
        }
        Op::Minus => {
            let (a, b) = eval_pair(world, locator, expr, flags)?;
            term::subtract(&a, &b)
        }
        Op::Star => {
            let (a, b) = eval_pair(world, locator, expr, flags)?;
            term::multiply(&a, &b)
        }
        Op::Slash => {
            let (a, b) = eval_pair(world, locator, expr, flags)?;
            term::divide(&a, &b)
        }
        Op::Rem => {
            let (a, b) = eval_pair(world, locator, expr, flags)?;
            term::modulo(&a, &b)
        }

        // --- unary ----------------------------------------------------
        Op::Uminus => {
            let a = eval_arg1(world, locator, expr, flags)?;
            term::negate(&a)
        }
        Op::Tilde => {
            let a = eval_arg1(world, locator, expr, flags)?;
            let i = term::as_integer(&a)?;
            Ok(Term::integer(!i))
        }
        Op::Bang => {
            let a = eval_arg1(world, locator, expr, flags)?;
            Ok(Term::boolean(!term::as_boolean(&a)?))
        }

        // --- term inspection -------------------------------------------
        Op::Bound => eval_bound(expr),
        Op::Str => {
            let a = eval_arg1(world, locator, expr, flags)?;
            Ok(Term::plain_string(a.lexical_form()?))
        }
        Op::Lang => {
            let a = eval_arg1(world, locator, expr, flags)?;
            match a {
                Term::String { lang, .. } => {
                    Ok(Term::plain_string(lang.map(|l| l.to_string()).unwrap_or_default()))
                }
                _ => Err(EvalError::type_error("LANG() requires a string literal")),
            }
        }
        Op::Langmatches => {
            let (a, b) = eval_pair(world, locator, expr, flags)?;
            let (tag, range) = (term::as_string(&a, flags)?, term::as_string(&b, flags)?);
            Ok(Term::boolean(language_matches(&tag, &range)))
        }
        Op::Datatype => {
            let a = eval_arg1(world, locator, expr, flags)?;
            match &a {
                Term::String { lang: Some(_), .. } => Err(EvalError::type_error(
                    "DATATYPE() is undefined for a language-tagged literal",
                )),
                _ => a
                    .datatype()
                    .map(Term::Uri)
                    .ok_or_else(|| EvalError::type_error("DATATYPE() requires a literal")),
            }
        }
        Op::Isuri => {
            let a = eval_arg1(world, locator, expr, flags)?;
            Ok(Term::boolean(a.rdf_term_type()? == RdfTermType::Uri))
        }
        Op::Isblank => {
            let a = eval_arg1(world, locator, expr, flags)?;
            Ok(Term::boolean(a.rdf_term_type()? == RdfTermType::Blank))
        }
        Op::Isliteral => {
            let a = eval_arg1(world, locator, expr, flags)?;
            Ok(Term::boolean(a.rdf_term_type()? == RdfTermType::StringTerm))
        }
        Op::Isnumeric => {
            let a = eval_arg1(world, locator, expr, flags)?;
            Ok(Term::boolean(term::is_numeric(&a)?))
        }
        Op::Sameterm => {
            let (a, b) = eval_pair(world, locator, expr, flags)?;
            Ok(Term::boolean(term::same_term(&a, &b)))
        }

        // --- pattern matching -------------------------------------------
        Op::Regex => eval_regex(world, locator, expr, flags),
        Op::StrMatch => eval_strmatch(world, locator, expr, flags, false),
        Op::StrNmatch => eval_strmatch(world, locator, expr, flags, true),

        // --- control flow / sequences ------------------------------------
        Op::If => {
            let cond = expr
                .arg1()
                .ok_or_else(|| EvalError::type_error("IF requires a condition"))?;
            let b = term::as_boolean(&evaluate(world, locator, cond, flags)?)?;
            let branch = if b { expr.arg2() } else { expr.arg3() };
            let branch = branch.ok_or_else(|| EvalError::type_error("IF is missing a branch"))?;
            evaluate(world, locator, branch, flags)
        }
        Op::Coalesce => eval_coalesce(world, locator, expr, flags),
        Op::In => eval_in(world, locator, expr, flags, false),
        Op::NotIn => eval_in(world, locator, expr, flags, true),

        // --- construction --------------------------------------------
        Op::Uri => {
            let a = eval_arg1(world, locator, expr, flags)?;
            Ok(Term::uri(term::as_string(&a, flags)?))
        }
        Op::Strlang => {
            let a = expr
                .arg1()
                .ok_or_else(|| EvalError::type_error("STRLANG requires a value"))?;
            let b = expr
                .arg2()
                .ok_or_else(|| EvalError::type_error("STRLANG requires a language tag"))?;
            let value = term::as_string(&evaluate(world, locator, a, flags)?, flags)?;
            // Fixed per spec §9: the language tag comes from the evaluated
            // `arg2`, not from re-reading `arg1` a second time.
            let lang = term::as_string(&evaluate(world, locator, b, flags)?, flags)?;
            Ok(Term::lang_string(value, lang))
        }
        Op::Strdt => {
            let a = expr
                .arg1()
                .ok_or_else(|| EvalError::type_error("STRDT requires a value"))?;
            let b = expr
                .arg2()
                .ok_or_else(|| EvalError::type_error("STRDT requires a datatype"))?;
            let value = term::as_string(&evaluate(world, locator, a, flags)?, flags)?;
            let dt_term = evaluate(world, locator, b, flags)?;
            let datatype = match &dt_term {
                Term::Uri(u) => u.to_string(),
                other => term::as_string(other, flags)?,
            };
            Ok(Term::typed_string(value, datatype))
        }
        Op::Bnode => match expr.arg1() {
            Some(arg) => {
                let s = term::as_string(&evaluate(world, locator, arg, flags)?, flags)?;
                Ok(Term::blank(s))
            }
            None => Ok(Term::blank(world.fresh_bnode_id())),
        },
        Op::Cast => {
            let a = expr
                .arg1()
                .ok_or_else(|| EvalError::type_error("CAST requires a value"))?;
            let target = expr
                .name()
                .ok_or_else(|| EvalError::type_error("CAST requires a target datatype"))?;
            let value = evaluate(world, locator, a, flags)?;
            term::cast(&value, target, flags)
        }
        Op::Literal => eval_literal(expr),

        // --- extension -------------------------------------------------
        Op::Function => {
            log::warn!(
                "unresolved extension function {} ({})",
                expr.name().unwrap_or("<unnamed>"),
                locator.map(|l| l.to_string()).unwrap_or_default(),
            );
            Ok(Term::boolean(false))
        }

        // --- aggregate placeholders --------------------------------------
        Op::Count | Op::Sum | Op::Avg | Op::Min | Op::Max => {
            let a = eval_arg1(world, locator, expr, flags)?;
            Ok(a)
        }
        Op::Sample => Err(EvalError::NotImplemented("SAMPLE")),
        Op::GroupConcat => Err(EvalError::NotImplemented("GROUP_CONCAT")),
        Op::Varstar => Err(EvalError::type_error(
            "VARSTAR (COUNT(*)) has no value outside of COUNT",
        )),

        // --- ordering / grouping wrappers --------------------------------
        Op::OrderCondAsc | Op::OrderCondDesc | Op::GroupCondAsc | Op::GroupCondDesc => {
            eval_arg1(world, locator, expr, flags)
        }
    }
}

fn eval_arg1(
    world: &World,
    locator: Option<&Locator>,
    expr: &Expr,
    flags: EvalFlags,
) -> Result<Term, EvalError> {
    let arg = expr
        .arg1()
        .ok_or_else(|| EvalError::type_error("missing operand"))?;
    evaluate(world, locator, arg, flags)
}

fn eval_pair(
    world: &World,
    locator: Option<&Locator>,
    expr: &Expr,
    flags: EvalFlags,
) -> Result<(Term, Term), EvalError> {
    let a = expr
        .arg1()
        .ok_or_else(|| EvalError::type_error("missing left operand"))?;
    let b = expr
        .arg2()
        .ok_or_else(|| EvalError::type_error("missing right operand"))?;
    let left = evaluate(world, locator, a, flags)?;
    let right = evaluate(world, locator, b, flags)?;
    Ok((left, right))
}

fn compare_bool(
    world: &World,
    locator: Option<&Locator>,
    expr: &Expr,
    flags: EvalFlags,
    pred: impl FnOnce(std::cmp::Ordering) -> bool,
) -> Result<Term, EvalError> {
    let (a, b) = eval_pair(world, locator, expr, flags)?;
    Ok(Term::boolean(pred(term::compare(&a, &b, flags)?)))
}

fn str_eq(a: &str, b: &str, flags: EvalFlags) -> bool {
    if flags.contains(EvalFlags::NOCASE) {
        a.eq_ignore_ascii_case(b)
    } else {
        a == b
    }
}

/// Kleene `AND`: `false` dominates (short-circuits without evaluating the
/// right operand), `Error` dominates over `true` (spec §4.3 three-valued
/// logic table, both cells of the "symmetric" note).
fn eval_and(
    world: &World,
    locator: Option<&Locator>,
    expr: &Expr,
    flags: EvalFlags,
) -> Result<Term, EvalError> {
    let left = eval_arg1(world, locator, expr, flags).and_then(|t| term::as_boolean(&t));
    if let Ok(false) = left {
        return Ok(Term::boolean(false));
    }
    let arg2 = expr
        .arg2()
        .ok_or_else(|| EvalError::type_error("AND requires a right operand"))?;
    let right = evaluate(world, locator, arg2, flags).and_then(|t| term::as_boolean(&t));
    match (left, right) {
        (Ok(true), Ok(r)) => Ok(Term::boolean(r)),
        (Ok(true), Err(e)) => Err(e),
        (Err(_), Ok(false)) => Ok(Term::boolean(false)),
        (Err(e), Ok(true)) => Err(e),
        (Err(e), Err(_)) => Err(e),
        (Ok(false), _) => unreachable!("handled by the short-circuit above"),
    }
}

/// Kleene `OR`: `true` dominates (short-circuits), `Error` dominates over
/// `false`.
fn eval_or(
    world: &World,
    locator: Option<&Locator>,
    expr: &Expr,
    flags: EvalFlags,
) -> Result<Term, EvalError> {
    let left = eval_arg1(world, locator, expr, flags).and_then(|t| term::as_boolean(&t));
    if let Ok(true) = left {
        return Ok(Term::boolean(true));
    }
    let arg2 = expr
        .arg2()
        .ok_or_else(|| EvalError::type_error("OR requires a right operand"))?;
    let right = evaluate(world, locator, arg2, flags).and_then(|t| term::as_boolean(&t));
    match (left, right) {
        (Ok(false), Ok(r)) => Ok(Term::boolean(r)),
        (Ok(false), Err(e)) => Err(e),
        (Err(_), Ok(true)) => Ok(Term::boolean(true)),
        (Err(e), Ok(false)) => Err(e),
        (Err(e), Err(_)) => Err(e),
        (Ok(true), _) => unreachable!("handled by the short-circuit above"),
    }
}

fn eval_bound(expr: &Expr) -> Result<Term, EvalError> {
    let arg = expr
        .arg1()
        .ok_or_else(|| EvalError::type_error("BOUND requires an operand"))?;
    if arg.op() != Op::Literal {
        return Err(EvalError::type_error(
            "BOUND requires a literal-wrapping variable reference, not a computed expression",
        ));
    }
    match arg.literal() {
        Some(Term::Var(binding)) => Ok(Term::boolean(binding.is_bound())),
        _ => Err(EvalError::type_error("BOUND requires a variable reference")),
    }
}

/// Literal evaluation flattens a `VarRef` to its current binding — the one
/// case in the evaluator that does *not* go through this is `BOUND`, which
/// inspects binding state directly instead (spec §9).
fn eval_literal(expr: &Expr) -> Result<Term, EvalError> {
    match expr.literal() {
        Some(Term::Var(binding)) => binding
            .value()
            .ok_or_else(|| EvalError::type_error(format!("{:?} is not bound", binding))),
        Some(other) => Ok(other.clone()),
        None => Err(EvalError::type_error("LITERAL node carries no value")),
    }
}

/// RFC 4647 §3.3.1 basic filtering: `*` matches any non-empty tag;
/// otherwise a case-insensitive exact match or hierarchical prefix match at
/// `-`-separated subtag boundaries (spec §8 LANGMATCHES table).
pub fn language_matches(tag: &str, range: &str) -> bool {
    if range == "*" {
        return !tag.is_empty();
    }
    if tag.is_empty() {
        return false;
    }
    let tag = tag.to_ascii_lowercase();
    let range = range.to_ascii_lowercase();
    tag == range || tag.starts_with(&format!("{}-", range))
}

fn eval_regex(
    world: &World,
    locator: Option<&Locator>,
    expr: &Expr,
    flags: EvalFlags,
) -> Result<Term, EvalError> {
    let text_expr = expr
        .arg1()
        .ok_or_else(|| EvalError::type_error("REGEX requires text"))?;
    let pattern_expr = expr
        .arg2()
        .ok_or_else(|| EvalError::type_error("REGEX requires a pattern"))?;
    let text = term::as_string(&evaluate(world, locator, text_expr, flags)?, flags)?;
    let pattern = term::as_string(&evaluate(world, locator, pattern_expr, flags)?, flags)?;
    let flag_str = match expr.arg3() {
        Some(f) => term::as_string(&evaluate(world, locator, f, flags)?, flags)?,
        None => String::new(),
    };
    let case_insensitive = flag_str.contains('i');
    let re = world.compiled_regex(&pattern, case_insensitive)?;
    Ok(Term::boolean(re.is_match(&text)))
}

/// `STR_MATCH`/`STR_NMATCH`: the pattern is an attached literal, not a
/// second expression, and (unlike `REGEX`) this legacy form carries no
/// separate case-insensitivity flag — matching is always case-sensitive
/// (see DESIGN.md).
fn eval_strmatch(
    world: &World,
    locator: Option<&Locator>,
    expr: &Expr,
    flags: EvalFlags,
    negate: bool,
) -> Result<Term, EvalError> {
    let text_expr = expr
        .arg1()
        .ok_or_else(|| EvalError::type_error("string match requires text"))?;
    let pattern = expr
        .literal()
        .ok_or_else(|| EvalError::type_error("string match requires an attached pattern"))?;
    let text = term::as_string(&evaluate(world, locator, text_expr, flags)?, flags)?;
    let pattern_str = term::as_string(pattern, flags)?;
    let re = world.compiled_regex(&pattern_str, false)?;
    let m = re.is_match(&text);
    Ok(Term::boolean(if negate { !m } else { m }))
}

fn eval_coalesce(
    world: &World,
    locator: Option<&Locator>,
    expr: &Expr,
    flags: EvalFlags,
) -> Result<Term, EvalError> {
    let args = expr
        .args()
        .ok_or_else(|| EvalError::type_error("COALESCE requires at least one argument"))?;
    let mut last_err = None;
    for result in eval_sequence(world, locator, args, flags) {
        match result {
            Ok(v) => return Ok(v),
            Err(e) => last_err = Some(e),
        }
    }
    Err(last_err.unwrap_or_else(|| EvalError::type_error("COALESCE with no arguments")))
}

fn eval_in(
    world: &World,
    locator: Option<&Locator>,
    expr: &Expr,
    flags: EvalFlags,
    negated: bool,
) -> Result<Term, EvalError> {
    let discriminant = eval_arg1(world, locator, expr, flags)?;
    let set = expr
        .args()
        .ok_or_else(|| EvalError::type_error("IN requires a candidate set"))?;
    let mut first_err = None;
    let mut found = false;
    for result in eval_sequence(world, locator, set, flags) {
        let candidate = match result {
            Ok(v) => v,
            Err(e) => {
                first_err.get_or_insert(e);
                continue;
            }
        };
        match term::equals(&discriminant, &candidate, flags) {
            Ok(true) => {
                found = true;
                break;
            }
            Ok(false) => {}
            Err(e) => {
                first_err.get_or_insert(e);
            }
        }
    }
    if found {
        return Ok(Term::boolean(!negated));
    }
    match first_err {
        Some(e) => Err(e),
        None => Ok(Term::boolean(negated)),
    }
}

#[cfg(test)]
mod test {
    use std::rc::Rc;

    use test_case::test_case;

    use super::*;
    use crate::expr::build;

    fn lit(t: Term) -> Expr {
        build::literal(t)
    }

    fn eval(e: &Expr) -> Result<Term, EvalError> {
        evaluate(&World::new(), None, e, EvalFlags::NONE)
    }

    fn is_error<T>(r: &Result<T, EvalError>) -> bool {
        r.is_err()
    }

    #[test]
    fn and_or_truth_table_error_cells() {
        let t = || lit(Term::boolean(true));
        let f = || lit(Term::boolean(false));
        let err = || build::unary(Op::Lang, lit(Term::uri("http://example/x")));

        // true AND error = error
        assert!(is_error(&eval(&build::binary(Op::And, t(), err()))));
        // false AND error = false (short-circuits, never touches the error)
        assert_eq!(eval(&build::binary(Op::And, f(), err())).unwrap().to_string(), "false");
        // false OR error = error
        assert!(is_error(&eval(&build::binary(Op::Or, f(), err()))));
        // true OR error = true (short-circuits)
        assert_eq!(eval(&build::binary(Op::Or, t(), err())).unwrap().to_string(), "true");
    }

    #[test]
    fn and_is_kleene_k3() {
        let t = || lit(Term::boolean(true));
        let f = || lit(Term::boolean(false));
        assert_eq!(eval(&build::binary(Op::And, t(), t())).unwrap().to_string(), "true");
        assert_eq!(eval(&build::binary(Op::And, t(), f())).unwrap().to_string(), "false");
        assert_eq!(eval(&build::binary(Op::And, f(), t())).unwrap().to_string(), "false");
        assert_eq!(eval(&build::binary(Op::And, f(), f())).unwrap().to_string(), "false");
    }

    #[test_case("en", "*", true)]
    #[test_case("", "*", false)]
    #[test_case("en-US", "en", true)]
    #[test_case("en", "en-US", false)]
    #[test_case("fr-CA", "fr-ca", true)]
    #[test_case("de", "en", false)]
    fn langmatches_table(tag: &str, range: &str, expected: bool) {
        assert_eq!(language_matches(tag, range), expected);
    }

    #[test]
    fn coalesce_identity_laws() {
        let five = lit(Term::integer(5));
        let err = || build::unary(Op::Lang, lit(Term::uri("http://example/x")));

        assert_eq!(
            eval(&build::coalesce(vec![five.clone()])).unwrap().to_string(),
            "5"
        );
        assert_eq!(
            eval(&build::coalesce(vec![err(), five.clone()])).unwrap().to_string(),
            "5"
        );
        assert_eq!(
            eval(&build::coalesce(vec![five.clone(), lit(Term::integer(9))]))
                .unwrap()
                .to_string(),
            "5"
        );
    }

    #[test]
    fn round_trip_literal() {
        let l = Term::integer(7);
        assert_eq!(eval(&lit(l)).unwrap().to_string(), "7");
    }

    #[test]
    fn plus_on_literals_matches_end_to_end_scenario() {
        let sum = build::binary(Op::Plus, lit(Term::integer(1)), lit(Term::integer(1)));
        assert_eq!(eval(&sum).unwrap().to_string(), "2");
    }

    #[test]
    fn slash_by_zero_is_an_error_not_infinity() {
        let div = build::binary(Op::Slash, lit(Term::integer(1)), lit(Term::integer(0)));
        assert!(is_error(&eval(&div)));
    }

    #[test]
    fn in_set_short_circuits_past_an_earlier_equals_error() {
        // IN(5, "x", 5) must be true even though comparing 5 to "x" errors.
        let discriminant = lit(Term::integer(5));
        let set = vec![lit(Term::plain_string("x")), lit(Term::integer(5))];
        let expr = build::in_set(false, discriminant, set);
        assert_eq!(eval(&expr).unwrap().to_string(), "true");
    }

    #[test]
    fn in_set_with_no_match_propagates_the_earlier_error() {
        let discriminant = lit(Term::integer(5));
        let set = vec![lit(Term::plain_string("x"))];
        let expr = build::in_set(false, discriminant, set);
        assert!(is_error(&eval(&expr)));
    }

    #[test]
    fn strlang_reads_the_tag_from_the_second_argument() {
        let expr = build::binary(
            Op::Strlang,
            lit(Term::plain_string("chat")),
            lit(Term::plain_string("fr")),
        );
        match eval(&expr).unwrap() {
            Term::String { lang: Some(l), .. } => assert_eq!(&*l, "fr"),
            other => panic!("expected a language-tagged string, got {:?}", other),
        }
    }

    #[test]
    fn regex_cache_is_transparent_across_repeated_evaluation() {
        let world = World::new();
        let e = build::regex(
            lit(Term::plain_string("Hello")),
            lit(Term::plain_string("^hel")),
            Some(lit(Term::plain_string("i"))),
        );
        for _ in 0..3 {
            assert_eq!(evaluate(&world, None, &e, EvalFlags::NONE).unwrap().to_string(), "true");
        }
    }

    #[test]
    fn expression_tree_refcount_drops_to_one_on_release_of_clones() {
        let leaf = lit(Term::integer(1));
        let clone_a = leaf.clone();
        let clone_b = leaf.clone();
        assert_eq!(Rc::strong_count(&leaf.0), 3);
        drop(clone_a);
        drop(clone_b);
        assert_eq!(Rc::strong_count(&leaf.0), 1);
    }

    #[test]
    fn bound_reflects_binding_state_without_flattening() {
        let binding = crate::binding::Binding::new("x");
        let bound_expr = build::unary(Op::Bound, lit(Term::Var(binding.clone())));
        assert_eq!(eval(&bound_expr).unwrap().to_string(), "false");
        binding.set(Term::integer(1));
        assert_eq!(eval(&bound_expr).unwrap().to_string(), "true");
    }
}
