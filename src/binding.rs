//! Variable binding slots (spec §3 "Variable binding").
//!
//! A binding is a named slot with an optional bound term. The parser
//! creates bindings; a row-iteration layer outside this crate mutates them
//! between rows. The evaluator only ever reads through a binding — see
//! [`crate::expr::eval`]'s handling of `LITERAL` and `BOUND`.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::term::Term;

/// A named variable slot, shared by reference so that every `VarRef` in an
/// expression tree and every row binding referring to the same SPARQL
/// variable observe the same value.
#[derive(Clone)]
pub struct Binding(Rc<RefCell<BindingInner>>);

struct BindingInner {
    name: String,
    value: Option<Term>,
}

impl Binding {
    pub fn new(name: impl Into<String>) -> Self {
        Binding(Rc::new(RefCell::new(BindingInner {
            name: name.into(),
            value: None,
        })))
    }

    pub fn name(&self) -> String {
        self.0.borrow().name.clone()
    }

    /// `true` iff a value is currently bound. This is exactly the
    /// predicate `BOUND(?v)` inspects (spec §4.3); it must never flatten.
    pub fn is_bound(&self) -> bool {
        self.0.borrow().value.is_some()
    }

    /// The current value, if bound. This is what `LITERAL` evaluation
    /// flattens to.
    pub fn value(&self) -> Option<Term> {
        self.0.borrow().value.clone()
    }

    /// Bind a value. Called by the row-iteration layer only; the evaluator
    /// never calls this.
    pub fn set(&self, value: Term) {
        self.0.borrow_mut().value = Some(value);
    }

    /// Clear the binding. Called by the row-iteration layer only.
    pub fn clear(&self) {
        self.0.borrow_mut().value = None;
    }
}

impl fmt::Debug for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.0.borrow();
        write!(f, "?{}", inner.name)
    }
}

impl PartialEq for Binding {
    /// Bindings are compared by slot identity, not by name or value: two
    /// distinct variables that happen to share a name are not the same
    /// binding.
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}
