//! The RDF term and literal model (spec §3, §4.1).
//!
//! A [`Term`] is immutable once constructed and cheap to clone: lexical
//! text, URIs, blank node ids and language tags are stored behind `Rc<str>`.
//! Numeric and date-time variants additionally carry the parsed value
//! alongside the original lexical form, so evaluating a bare literal back
//! out reproduces exactly what was parsed in (spec §8 property 4, "round
//! trip").

pub mod ns;

use std::fmt;
use std::rc::Rc;

use chrono::{DateTime, FixedOffset, NaiveDateTime, Utc};

use crate::binding::Binding;
use crate::error::EvalError;
use crate::world::EvalFlags;

/// One of the RDF term kinds spec §4.1's `get-rdf-term-type` distinguishes.
/// Typed and plain literals are both reported as `StringTerm`, matching the
/// spec note "strings include typed literals".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RdfTermType {
    Uri,
    Blank,
    StringTerm,
}

/// A parsed `xsd:dateTime` value, keeping whichever of zoned/naive form the
/// lexical text actually carried.
#[derive(Debug, Clone)]
pub enum DateTimeValue {
    Zoned(DateTime<FixedOffset>),
    Naive(NaiveDateTime),
}

impl DateTimeValue {
    /// Milliseconds since the Unix epoch, treating a naive value as if it
    /// were UTC. This is the only point where "naive vs zoned" ambiguity is
    /// resolved; see DESIGN.md.
    fn instant_millis(&self) -> i64 {
        match self {
            DateTimeValue::Zoned(dt) => dt.with_timezone(&Utc).timestamp_millis(),
            DateTimeValue::Naive(dt) => dt.and_utc().timestamp_millis(),
        }
    }

    fn parse(s: &str) -> Result<Self, EvalError> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Ok(DateTimeValue::Zoned(dt));
        }
        for fmt in &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S"] {
            if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
                return Ok(DateTimeValue::Naive(dt));
            }
        }
        Err(EvalError::LexicalError(format!(
            "{:?} is not a valid xsd:dateTime lexical form",
            s
        )))
    }
}

impl PartialEq for DateTimeValue {
    fn eq(&self, other: &Self) -> bool {
        self.instant_millis() == other.instant_millis()
    }
}

impl PartialOrd for DateTimeValue {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.instant_millis().cmp(&other.instant_millis()))
    }
}

impl fmt::Display for DateTimeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DateTimeValue::Zoned(dt) => write!(f, "{}", dt.to_rfc3339()),
            DateTimeValue::Naive(dt) => write!(f, "{}", dt.format("%Y-%m-%dT%H:%M:%S%.f")),
        }
    }
}

/// An RDF term (spec §3). Cloning is O(1): every owned string is behind an
/// `Rc`, and `VarRef` is itself a shared, interior-mutable binding.
#[derive(Debug, Clone)]
pub enum Term {
    Uri(Rc<str>),
    Blank(Rc<str>),
    /// A plain, language-tagged or datatyped string literal. Invariant:
    /// at most one of `lang`/`datatype` is `Some` (spec §3).
    String {
        lexical: Rc<str>,
        lang: Option<Rc<str>>,
        datatype: Option<Rc<str>>,
    },
    Integer(i64, Rc<str>),
    Decimal(f64, Rc<str>),
    Double(f64, Rc<str>),
    Float(f32, Rc<str>),
    Boolean(bool),
    DateTime(DateTimeValue, Rc<str>),
    /// A reference to a variable binding slot, flattened by `LITERAL`
    /// evaluation everywhere except `BOUND` (spec §9).
    Var(Binding),
}

impl Term {
    pub fn uri(u: impl Into<Rc<str>>) -> Term {
        Term::Uri(u.into())
    }

    pub fn blank(id: impl Into<Rc<str>>) -> Term {
        Term::Blank(id.into())
    }

    pub fn plain_string(text: impl Into<Rc<str>>) -> Term {
        Term::String {
            lexical: text.into(),
            lang: None,
            datatype: None,
        }
    }

    pub fn lang_string(text: impl Into<Rc<str>>, lang: impl Into<Rc<str>>) -> Term {
        Term::String {
            lexical: text.into(),
            lang: Some(lang.into()),
            datatype: None,
        }
    }

    pub fn typed_string(text: impl Into<Rc<str>>, datatype: impl Into<Rc<str>>) -> Term {
        Term::String {
            lexical: text.into(),
            lang: None,
            datatype: Some(datatype.into()),
        }
    }

    pub fn integer(i: i64) -> Term {
        Term::Integer(i, i.to_string().into())
    }

    pub fn boolean(b: bool) -> Term {
        Term::Boolean(b)
    }

    /// The stored lexical form, with no language/datatype decoration
    /// (spec §4.1 `as-string`, undecorated case).
    pub fn lexical_form(&self) -> Result<String, EvalError> {
        Ok(match self {
            Term::Uri(u) => u.to_string(),
            Term::Blank(id) => id.to_string(),
            Term::String { lexical, .. } => lexical.to_string(),
            Term::Integer(_, lex) => lex.to_string(),
            Term::Decimal(_, lex) => lex.to_string(),
            Term::Double(_, lex) => lex.to_string(),
            Term::Float(_, lex) => lex.to_string(),
            Term::Boolean(b) => b.to_string(),
            Term::DateTime(_, lex) => lex.to_string(),
            Term::Var(_) => {
                return Err(EvalError::type_error(
                    "cannot take the lexical form of an unresolved variable reference",
                ))
            }
        })
    }

    /// The language tag, if this is a language-tagged string literal.
    pub fn language(&self) -> Option<Rc<str>> {
        match self {
            Term::String { lang: Some(l), .. } => Some(l.clone()),
            _ => None,
        }
    }

    /// The datatype URI per RDF 1.1: `xsd:string` for a plain literal,
    /// `rdf:langString` for a language-tagged one, the explicit datatype for
    /// a typed one, and the natural XSD type for the concrete numeric/
    /// boolean/date-time variants.
    pub fn datatype(&self) -> Option<Rc<str>> {
        match self {
            Term::String {
                lang: Some(_), ..
            } => Some(ns::rdf::LANG_STRING.into()),
            Term::String {
                datatype: Some(d), ..
            } => Some(d.clone()),
            Term::String { .. } => Some(ns::xsd::STRING.into()),
            Term::Integer(..) => Some(ns::xsd::INTEGER.into()),
            Term::Decimal(..) => Some(ns::xsd::DECIMAL.into()),
            Term::Double(..) => Some(ns::xsd::DOUBLE.into()),
            Term::Float(..) => Some(ns::xsd::FLOAT.into()),
            Term::Boolean(_) => Some(ns::xsd::BOOLEAN.into()),
            Term::DateTime(..) => Some(ns::xsd::DATE_TIME.into()),
            Term::Uri(_) | Term::Blank(_) | Term::Var(_) => None,
        }
    }

    /// `get-rdf-term-type` (spec §4.1).
    pub fn rdf_term_type(&self) -> Result<RdfTermType, EvalError> {
        match self {
            Term::Uri(_) => Ok(RdfTermType::Uri),
            Term::Blank(_) => Ok(RdfTermType::Blank),
            Term::Var(_) => Err(EvalError::type_error(
                "rdf-term-type of an unresolved variable reference",
            )),
            _ => Ok(RdfTermType::StringTerm),
        }
    }
}

/// If `t` is a `String` literal whose datatype is one of the XSD types this
/// crate parses natively, re-parse it into the concrete variant, surfacing a
/// `LexicalError` if the lexical form doesn't match the claimed datatype.
/// Otherwise returns `t` unchanged. Every value operation below goes through
/// this first, which is where "invalid lexical form ⇒ Error" (spec §4.3) is
/// enforced for datatypes the caller only declared via `STRDT`.
fn promote(t: &Term) -> Result<Term, EvalError> {
    let (lexical, datatype) = match t {
        Term::String {
            lexical,
            datatype: Some(dt),
            lang: None,
        } => (lexical.clone(), dt.clone()),
        other => return Ok(other.clone()),
    };
    match datatype.as_ref() {
        ns::xsd::INTEGER => lexical
            .trim()
            .parse::<i64>()
            .map(|i| Term::Integer(i, lexical.clone()))
            .map_err(|_| invalid_lexical(&lexical, &datatype)),
        ns::xsd::DECIMAL | ns::xsd::DOUBLE => lexical
            .trim()
            .parse::<f64>()
            .map(|d| {
                if datatype.as_ref() == ns::xsd::DECIMAL {
                    Term::Decimal(d, lexical.clone())
                } else {
                    Term::Double(d, lexical.clone())
                }
            })
            .map_err(|_| invalid_lexical(&lexical, &datatype)),
        ns::xsd::FLOAT => lexical
            .trim()
            .parse::<f32>()
            .map(|f| Term::Float(f, lexical.clone()))
            .map_err(|_| invalid_lexical(&lexical, &datatype)),
        ns::xsd::BOOLEAN => parse_xsd_boolean(&lexical)
            .map(Term::Boolean)
            .ok_or_else(|| invalid_lexical(&lexical, &datatype)),
        ns::xsd::DATE_TIME => {
            DateTimeValue::parse(&lexical).map(|v| Term::DateTime(v, lexical.clone()))
        }
        _ => Ok(Term::String {
            lexical,
            lang: None,
            datatype: Some(datatype),
        }),
    }
}

fn invalid_lexical(lexical: &str, datatype: &str) -> EvalError {
    EvalError::LexicalError(format!("{:?} is not a valid lexical form of {}", lexical, datatype))
}

fn parse_xsd_boolean(s: &str) -> Option<bool> {
    match s.trim() {
        "true" | "1" => Some(true),
        "false" | "0" => Some(false),
        _ => None,
    }
}

/// `is-numeric(t)` (spec §4.1).
pub fn is_numeric(t: &Term) -> Result<bool, EvalError> {
    Ok(matches!(
        promote(t)?,
        Term::Integer(..) | Term::Decimal(..) | Term::Double(..) | Term::Float(..)
    ))
}

/// `as-boolean(t)` (spec §4.1).
pub fn as_boolean(t: &Term) -> Result<bool, EvalError> {
    match promote(t)? {
        Term::Boolean(b) => Ok(b),
        Term::Integer(i, _) => Ok(i != 0),
        Term::Decimal(d, _) | Term::Double(d, _) => Ok(d != 0.0 && !d.is_nan()),
        Term::Float(f, _) => Ok(f != 0.0 && !f.is_nan()),
        Term::String { lexical, .. } => Ok(!lexical.is_empty()),
        Term::Uri(_) => Err(EvalError::type_error("a URI has no boolean value")),
        Term::Blank(_) => Err(EvalError::type_error("a blank node has no boolean value")),
        Term::DateTime(..) => Err(EvalError::type_error("a dateTime has no boolean value")),
        Term::Var(_) => Err(EvalError::type_error("unresolved variable reference")),
    }
}

/// `as-integer(t)` (spec §4.1). Decimals/doubles/floats truncate toward
/// zero.
pub fn as_integer(t: &Term) -> Result<i64, EvalError> {
    match promote(t)? {
        Term::Integer(i, _) => Ok(i),
        Term::Decimal(d, _) | Term::Double(d, _) => Ok(d.trunc() as i64),
        Term::Float(f, _) => Ok(f.trunc() as i64),
        Term::String { lexical, .. } => lexical
            .trim()
            .parse::<i64>()
            .map_err(|_| EvalError::type_error(format!("{:?} is not an integer", lexical))),
        other => Err(EvalError::type_error(format!(
            "{:?} cannot be coerced to an integer",
            other
        ))),
    }
}

/// Widen any numeric term to `f64`, used by `compare`'s promotion ladder.
fn as_numeric_double(t: &Term) -> Result<f64, EvalError> {
    match promote(t)? {
        Term::Integer(i, _) => Ok(i as f64),
        Term::Decimal(d, _) | Term::Double(d, _) => Ok(d),
        Term::Float(f, _) => Ok(f as f64),
        other => Err(EvalError::type_error(format!("{:?} is not numeric", other))),
    }
}

/// `as-string(t, flags)` (spec §4.1). Under `XQUERY`, numeric/boolean/
/// date-time terms are rendered through XSD canonical form instead of the
/// stored lexical text.
pub fn as_string(t: &Term, flags: EvalFlags) -> Result<String, EvalError> {
    if !flags.contains(EvalFlags::XQUERY) {
        return t.lexical_form();
    }
    Ok(match promote(t)? {
        Term::Integer(i, _) => i.to_string(),
        Term::Decimal(d, _) => canonical_decimal(d),
        Term::Double(d, _) => canonical_double(d),
        Term::Float(f, _) => canonical_double(f as f64),
        Term::Boolean(b) => b.to_string(),
        Term::DateTime(v, _) => v.to_string(),
        other => other.lexical_form()?,
    })
}

fn canonical_decimal(d: f64) -> String {
    if d.fract() == 0.0 {
        format!("{:.1}", d)
    } else {
        format!("{}", d)
    }
}

fn canonical_double(d: f64) -> String {
    if d.is_nan() {
        "NaN".to_string()
    } else if d.is_infinite() {
        if d > 0.0 {
            "INF".to_string()
        } else {
            "-INF".to_string()
        }
    } else {
        format!("{:E}", d)
    }
}

/// `same-term(a, b)` (spec §4.1): strict syntactic identity, no coercion.
/// This is what makes `"1"^^xsd:integer` and `"01"^^xsd:integer` distinct
/// even though `equals` considers them the same value (spec §8 property 3).
pub fn same_term(a: &Term, b: &Term) -> bool {
    use Term::*;
    match (a, b) {
        (Uri(x), Uri(y)) => x == y,
        (Blank(x), Blank(y)) => x == y,
        (
            String {
                lexical: l1,
                lang: g1,
                datatype: d1,
            },
            String {
                lexical: l2,
                lang: g2,
                datatype: d2,
            },
        ) => l1 == l2 && g1 == g2 && d1 == d2,
        (Integer(_, l1), Integer(_, l2)) => l1 == l2,
        (Decimal(_, l1), Decimal(_, l2)) => l1 == l2,
        (Double(_, l1), Double(_, l2)) => l1 == l2,
        (Float(_, l1), Float(_, l2)) => l1 == l2,
        (Boolean(x), Boolean(y)) => x == y,
        (DateTime(_, l1), DateTime(_, l2)) => l1 == l2,
        (Var(x), Var(y)) => x == y,
        _ => false,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Family {
    Numeric,
    Boolean,
    DateTime,
    StringLike,
}

fn family_of(t: &Term) -> Result<Family, EvalError> {
    match promote(t)? {
        Term::Integer(..) | Term::Decimal(..) | Term::Double(..) | Term::Float(..) => {
            Ok(Family::Numeric)
        }
        Term::Boolean(_) => Ok(Family::Boolean),
        Term::DateTime(..) => Ok(Family::DateTime),
        Term::String { .. } => Ok(Family::StringLike),
        Term::Uri(_) | Term::Blank(_) => Err(EvalError::type_error(
            "URIs and blank nodes have no value-comparable family",
        )),
        Term::Var(_) => Err(EvalError::type_error("unresolved variable reference")),
    }
}

/// `compare(a, b, flags)` (spec §4.1): a total order within one compatible
/// family (numeric with promotion, date-time, or string with optional
/// case-folding). Cross-family pairs, and URI/blank-node operands, are a
/// `TypeError`.
pub fn compare(a: &Term, b: &Term, flags: EvalFlags) -> Result<std::cmp::Ordering, EvalError> {
    match (a, b) {
        (Term::Uri(x), Term::Uri(y)) => return Ok(x.cmp(y)),
        (Term::Blank(x), Term::Blank(y)) => return Ok(x.cmp(y)),
        _ => {}
    }
    let fa = family_of(a)?;
    let fb = family_of(b)?;
    if fa != fb {
        return Err(EvalError::type_error(format!(
            "cannot compare {:?} with {:?}",
            fa, fb
        )));
    }
    match fa {
        Family::Numeric => {
            let (x, y) = (as_numeric_double(a)?, as_numeric_double(b)?);
            x.partial_cmp(&y)
                .ok_or_else(|| EvalError::type_error("NaN operand is not comparable"))
        }
        Family::Boolean => Ok(as_boolean(a)?.cmp(&as_boolean(b)?)),
        Family::DateTime => {
            let (x, y) = (promote(a)?, promote(b)?);
            if let (Term::DateTime(x, _), Term::DateTime(y, _)) = (x, y) {
                x.partial_cmp(&y)
                    .ok_or_else(|| EvalError::type_error("dateTime values not comparable"))
            } else {
                unreachable!("family_of guarantees DateTime variant")
            }
        }
        Family::StringLike => {
            let (sa, sb) = (as_string(a, EvalFlags::NONE)?, as_string(b, EvalFlags::NONE)?);
            if flags.contains(EvalFlags::NOCASE) {
                Ok(sa.to_lowercase().cmp(&sb.to_lowercase()))
            } else {
                Ok(sa.cmp(&sb))
            }
        }
    }
}

/// `equals(a, b, flags)` (spec §4.1): SPARQL RDF-term equality. Different
/// RDF term kinds (URI vs blank vs literal) are simply unequal; literals of
/// incompatible families (e.g. a numeric literal against a plain string)
/// are a `TypeError` since SPARQL `=` cannot meaningfully relate them.
pub fn equals(a: &Term, b: &Term, flags: EvalFlags) -> Result<bool, EvalError> {
    match (a, b) {
        (Term::Uri(_), Term::Uri(_)) => return Ok(same_term(a, b)),
        (Term::Blank(_), Term::Blank(_)) => return Ok(same_term(a, b)),
        (Term::Uri(_) | Term::Blank(_), _) | (_, Term::Uri(_) | Term::Blank(_)) => {
            return Ok(false)
        }
        _ => {}
    }
    let fa = family_of(a)?;
    let fb = family_of(b)?;
    if fa != fb {
        return Err(EvalError::type_error(format!(
            "cannot equate {:?} with {:?}",
            fa, fb
        )));
    }
    Ok(match fa {
        Family::Numeric => as_numeric_double(a)? == as_numeric_double(b)?,
        Family::Boolean => as_boolean(a)? == as_boolean(b)?,
        Family::DateTime => {
            if let (Term::DateTime(x, _), Term::DateTime(y, _)) = (promote(a)?, promote(b)?) {
                x == y
            } else {
                false
            }
        }
        Family::StringLike => {
            let (ta, tb) = (promote(a)?, promote(b)?);
            if let (
                Term::String {
                    lexical: l1,
                    lang: g1,
                    datatype: d1,
                },
                Term::String {
                    lexical: l2,
                    lang: g2,
                    datatype: d2,
                },
            ) = (ta, tb)
            {
                let lexical_eq = if flags.contains(EvalFlags::NOCASE) {
                    l1.to_lowercase() == l2.to_lowercase()
                } else {
                    l1 == l2
                };
                let lang_eq = match (&g1, &g2) {
                    (Some(x), Some(y)) => x.eq_ignore_ascii_case(y),
                    (None, None) => true,
                    _ => false,
                };
                lexical_eq && lang_eq && d1 == d2
            } else {
                false
            }
        }
    })
}

/// `negate(a)` (spec §4.1).
pub fn negate(a: &Term) -> Result<Term, EvalError> {
    match promote(a)? {
        Term::Integer(i, _) => Ok(Term::integer(-i)),
        Term::Decimal(d, _) => Ok(Term::Decimal(-d, format!("{}", -d).into())),
        Term::Double(d, _) => Ok(Term::Double(-d, canonical_double(-d).into())),
        Term::Float(f, _) => Ok(Term::Float(-f, canonical_double(-f as f64).into())),
        other => Err(EvalError::type_error(format!("{:?} is not numeric", other))),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum NumericRank {
    Integer,
    Decimal,
    Float,
    Double,
}

enum Numeric {
    Integer(i64),
    Decimal(f64),
    Float(f32),
    Double(f64),
}

fn numeric_of(t: &Term) -> Result<Numeric, EvalError> {
    match promote(t)? {
        Term::Integer(i, _) => Ok(Numeric::Integer(i)),
        Term::Decimal(d, _) => Ok(Numeric::Decimal(d)),
        Term::Float(f, _) => Ok(Numeric::Float(f)),
        Term::Double(d, _) => Ok(Numeric::Double(d)),
        other => Err(EvalError::type_error(format!("{:?} is not numeric", other))),
    }
}

fn numeric_rank(n: &Numeric) -> NumericRank {
    match n {
        Numeric::Integer(_) => NumericRank::Integer,
        Numeric::Decimal(_) => NumericRank::Decimal,
        Numeric::Float(_) => NumericRank::Float,
        Numeric::Double(_) => NumericRank::Double,
    }
}

fn numeric_value(n: &Numeric) -> f64 {
    match *n {
        Numeric::Integer(i) => i as f64,
        Numeric::Decimal(d) => d,
        Numeric::Float(f) => f as f64,
        Numeric::Double(d) => d,
    }
}

/// Apply `op` under the integer→decimal→float→double promotion ladder
/// (spec §4.1), producing a term of the higher-ranked operand's type.
fn numeric_binop(
    a: &Term,
    b: &Term,
    int_op: impl FnOnce(i64, i64) -> Option<i64>,
    float_op: impl FnOnce(f64, f64) -> f64,
) -> Result<Term, EvalError> {
    let (na, nb) = (numeric_of(a)?, numeric_of(b)?);
    let rank = numeric_rank(&na).max(numeric_rank(&nb));
    if rank == NumericRank::Integer {
        if let (Numeric::Integer(x), Numeric::Integer(y)) = (&na, &nb) {
            return match int_op(*x, *y) {
                Some(v) => Ok(Term::integer(v)),
                None => Err(EvalError::arithmetic("integer overflow")),
            };
        }
    }
    let (x, y) = (numeric_value(&na), numeric_value(&nb));
    let v = float_op(x, y);
    Ok(match rank {
        NumericRank::Integer | NumericRank::Decimal => Term::Decimal(v, format!("{}", v).into()),
        NumericRank::Float => Term::Float(v as f32, canonical_double(v as f32 as f64).into()),
        NumericRank::Double => Term::Double(v, canonical_double(v).into()),
    })
}

pub fn add(a: &Term, b: &Term) -> Result<Term, EvalError> {
    numeric_binop(a, b, i64::checked_add, |x, y| x + y)
}

pub fn subtract(a: &Term, b: &Term) -> Result<Term, EvalError> {
    numeric_binop(a, b, i64::checked_sub, |x, y| x - y)
}

pub fn multiply(a: &Term, b: &Term) -> Result<Term, EvalError> {
    numeric_binop(a, b, i64::checked_mul, |x, y| x * y)
}

fn is_zero(n: &Numeric) -> bool {
    numeric_value(n) == 0.0
}

/// `/` (spec §4.1, §4.3): zero divisor is always an `ArithmeticError`,
/// regardless of operand type, matching the explicit contract in spec §4.3
/// rather than IEEE-754 infinities.
pub fn divide(a: &Term, b: &Term) -> Result<Term, EvalError> {
    let nb = numeric_of(b)?;
    if is_zero(&nb) {
        return Err(EvalError::arithmetic("division by zero"));
    }
    let na = numeric_of(a)?;
    let rank = numeric_rank(&na).max(numeric_rank(&nb));
    let v = numeric_value(&na) / numeric_value(&nb);
    Ok(match rank {
        NumericRank::Integer | NumericRank::Decimal => Term::Decimal(v, format!("{}", v).into()),
        NumericRank::Float => Term::Float(v as f32, canonical_double(v as f32 as f64).into()),
        NumericRank::Double => Term::Double(v, canonical_double(v).into()),
    })
}

/// `%` (spec §4.3): zero divisor is an `ArithmeticError`.
pub fn modulo(a: &Term, b: &Term) -> Result<Term, EvalError> {
    let nb = numeric_of(b)?;
    if is_zero(&nb) {
        return Err(EvalError::arithmetic("remainder by zero"));
    }
    let na = numeric_of(a)?;
    if let (Numeric::Integer(x), Numeric::Integer(y)) = (&na, &nb) {
        return Ok(Term::integer(x % y));
    }
    let v = numeric_value(&na) % numeric_value(&nb);
    let rank = numeric_rank(&na).max(numeric_rank(&nb));
    Ok(match rank {
        NumericRank::Integer | NumericRank::Decimal => Term::Decimal(v, format!("{}", v).into()),
        NumericRank::Float => Term::Float(v as f32, canonical_double(v as f32 as f64).into()),
        NumericRank::Double => Term::Double(v, canonical_double(v).into()),
    })
}

/// `cast(term, target_datatype_uri, flags)` (spec §4.1). Only literal
/// sources can be cast; a URI or blank node is always a `CastError`.
pub fn cast(term: &Term, target: &str, flags: EvalFlags) -> Result<Term, EvalError> {
    if matches!(term, Term::Uri(_) | Term::Blank(_) | Term::Var(_)) {
        return Err(EvalError::CastError {
            target: target.to_string(),
            reason: "only literals can be cast".to_string(),
        });
    }
    let cast_err = |reason: &str| EvalError::CastError {
        target: target.to_string(),
        reason: reason.to_string(),
    };
    match target {
        ns::xsd::STRING => Ok(Term::plain_string(as_string(term, flags)?)),
        ns::xsd::BOOLEAN => match promote(term)? {
            Term::Boolean(b) => Ok(Term::Boolean(b)),
            Term::Integer(i, _) => Ok(Term::Boolean(i != 0)),
            Term::Decimal(d, _) | Term::Double(d, _) => Ok(Term::Boolean(d != 0.0)),
            Term::Float(f, _) => Ok(Term::Boolean(f != 0.0)),
            Term::String { lexical, .. } => {
                parse_xsd_boolean(&lexical).map(Term::Boolean).ok_or_else(|| {
                    cast_err(&format!("{:?} is not a valid xsd:boolean lexical form", lexical))
                })
            }
            other => Err(cast_err(&format!("cannot cast {:?} to xsd:boolean", other))),
        },
        ns::xsd::INTEGER => match as_integer(term) {
            Ok(i) => Ok(Term::integer(i)),
            Err(_) => Err(cast_err("source is not integer-convertible")),
        },
        ns::xsd::DECIMAL | ns::xsd::DOUBLE | ns::xsd::FLOAT => {
            let v = match promote(term)? {
                Term::Integer(i, _) => i as f64,
                Term::Decimal(d, _) | Term::Double(d, _) => d,
                Term::Float(f, _) => f as f64,
                Term::Boolean(b) => {
                    if b {
                        1.0
                    } else {
                        0.0
                    }
                }
                Term::String { lexical, .. } => lexical
                    .trim()
                    .parse::<f64>()
                    .map_err(|_| cast_err(&format!("{:?} is not numeric", lexical)))?,
                other => return Err(cast_err(&format!("cannot cast {:?} to a number", other))),
            };
            Ok(match target {
                ns::xsd::DECIMAL => Term::Decimal(v, format!("{}", v).into()),
                ns::xsd::FLOAT => Term::Float(v as f32, canonical_double(v as f32 as f64).into()),
                _ => Term::Double(v, canonical_double(v).into()),
            })
        }
        ns::xsd::DATE_TIME => match promote(term)? {
            Term::DateTime(v, lex) => Ok(Term::DateTime(v, lex)),
            Term::String { lexical, .. } => {
                DateTimeValue::parse(&lexical).map(|v| Term::DateTime(v, lexical))
            }
            other => Err(cast_err(&format!("cannot cast {:?} to xsd:dateTime", other))),
        },
        other_target => Err(cast_err(&format!("unsupported cast target {:?}", other_target))),
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Uri(u) => write!(f, "<{}>", u),
            Term::Blank(id) => write!(f, "_:{}", id),
            Term::String {
                lexical,
                lang: Some(l),
                ..
            } => write!(f, "\"{}\"@{}", lexical, l),
            Term::String {
                lexical,
                datatype: Some(d),
                ..
            } => write!(f, "\"{}\"^^<{}>", lexical, d),
            Term::String { lexical, .. } => write!(f, "\"{}\"", lexical),
            Term::Integer(_, lex) => write!(f, "{}", lex),
            Term::Decimal(_, lex) => write!(f, "{}", lex),
            Term::Double(_, lex) => write!(f, "{}", lex),
            Term::Float(_, lex) => write!(f, "{}", lex),
            Term::Boolean(b) => write!(f, "{}", b),
            Term::DateTime(v, _) => write!(f, "\"{}\"^^<{}>", v, ns::xsd::DATE_TIME),
            Term::Var(b) => write!(f, "{:?}", b),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn same_term_distinguishes_lexical_form_but_equals_does_not() {
        let a = Term::typed_string("1", ns::xsd::INTEGER);
        let b = Term::typed_string("01", ns::xsd::INTEGER);
        assert!(!same_term(&a, &b));
        assert!(equals(&a, &b, EvalFlags::NONE).unwrap());
    }

    #[test]
    fn equals_cross_kind_is_false_not_error() {
        let uri = Term::uri("http://example/s");
        let lit = Term::plain_string("s");
        assert!(!equals(&uri, &lit, EvalFlags::NONE).unwrap());
    }

    #[test]
    fn equals_incompatible_literal_families_is_type_error() {
        let n = Term::integer(5);
        let s = Term::plain_string("5");
        assert!(equals(&n, &s, EvalFlags::NONE).is_err());
    }

    #[test]
    fn numeric_promotion_ladder_picks_highest_rank() {
        let i = Term::integer(2);
        let d = Term::typed_string("1.5", ns::xsd::DOUBLE);
        match add(&i, &d).unwrap() {
            Term::Double(v, _) => assert!((v - 3.5).abs() < 1e-9),
            other => panic!("expected Double, got {:?}", other),
        }
    }

    #[test]
    fn divide_by_zero_is_arithmetic_error_not_infinity() {
        let err = divide(&Term::integer(1), &Term::integer(0)).unwrap_err();
        assert!(matches!(err, EvalError::ArithmeticError(_)));
    }

    #[test]
    fn modulo_by_zero_is_arithmetic_error() {
        let err = modulo(&Term::integer(4), &Term::integer(0)).unwrap_err();
        assert!(matches!(err, EvalError::ArithmeticError(_)));
    }

    #[test]
    fn cast_string_to_integer_round_trips_lexical_form() {
        let s = Term::plain_string("42");
        let cast_result = cast(&s, ns::xsd::INTEGER, EvalFlags::NONE).unwrap();
        assert_eq!(as_integer(&cast_result).unwrap(), 42);
    }

    #[test]
    fn cast_uri_is_always_an_error() {
        let u = Term::uri("http://example/s");
        assert!(cast(&u, ns::xsd::STRING, EvalFlags::NONE).is_err());
    }

    #[test]
    fn invalid_lexical_form_is_a_lexical_error() {
        let bogus = Term::typed_string("not-a-number", ns::xsd::INTEGER);
        let err = is_numeric(&bogus).unwrap_err();
        assert!(matches!(err, EvalError::LexicalError(_)));
    }

    #[test]
    fn compare_orders_strings_case_sensitively_by_default() {
        let a = Term::plain_string("B");
        let b = Term::plain_string("a");
        assert_eq!(compare(&a, &b, EvalFlags::NONE).unwrap(), std::cmp::Ordering::Less);
        assert_eq!(
            compare(&a, &b, EvalFlags::NOCASE).unwrap(),
            std::cmp::Ordering::Greater
        );
    }
}
