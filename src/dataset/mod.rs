//! The in-memory triple dataset and its position-based match iterator
//! (spec §3, §4.4): an append-only triple list queried by `(S?, P?, O?)`
//! patterns with exactly one unbound position.

pub mod load;

use crate::term::{self, Term};
use crate::world::EvalFlags;

pub use load::RdfFormat;

/// Which position of a triple a [`MatchIterator`] yields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriplePart {
    Subject,
    Predicate,
    Object,
}

/// Three terms plus an optional named-graph origin (spec §3).
#[derive(Debug, Clone)]
pub struct Triple {
    pub subject: Term,
    pub predicate: Term,
    pub object: Term,
    pub graph: Option<Term>,
}

impl Triple {
    pub fn new(subject: Term, predicate: Term, object: Term) -> Self {
        Triple {
            subject,
            predicate,
            object,
            graph: None,
        }
    }

    pub fn in_graph(subject: Term, predicate: Term, object: Term, graph: Term) -> Self {
        Triple {
            subject,
            predicate,
            object,
            graph: Some(graph),
        }
    }

    fn part(&self, which: TriplePart) -> &Term {
        match which {
            TriplePart::Subject => &self.subject,
            TriplePart::Predicate => &self.predicate,
            TriplePart::Object => &self.object,
        }
    }
}

/// An append-only, insertion-ordered list of triples, together with the
/// base URI literal shared by the most recent [`Dataset::load`] (spec §3).
#[derive(Debug, Default)]
pub struct Dataset {
    triples: Vec<Triple>,
    base_uri: Option<Term>,
}

impl Dataset {
    pub fn new() -> Self {
        Dataset {
            triples: Vec::new(),
            base_uri: None,
        }
    }

    pub fn insert(&mut self, triple: Triple) {
        self.triples.push(triple);
    }

    pub fn len(&self) -> usize {
        self.triples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triples.is_empty()
    }

    pub fn base_uri(&self) -> Option<&Term> {
        self.base_uri.as_ref()
    }

    /// A position-based match iterator. Exactly one of `subject`,
    /// `predicate`, `object` is expected to be `None` (the position named by
    /// `want`); the other two, if `Some`, constrain matching triples by
    /// `equals` under `flags` (spec §4.4).
    pub fn match_iter(
        &self,
        subject: Option<Term>,
        predicate: Option<Term>,
        object: Option<Term>,
        want: TriplePart,
        flags: EvalFlags,
    ) -> MatchIterator<'_> {
        MatchIterator {
            dataset: self,
            subject,
            predicate,
            object,
            want,
            flags,
            cursor: 0,
        }
    }

    /// `get-single` (spec §4.4): the first yielded term, or nothing. The
    /// iterator is simply dropped on either path, which is the "released
    /// silently" behaviour spec.md asks for — there is no explicit close
    /// step in this crate's iterator model.
    pub fn get_single(
        &self,
        subject: Option<Term>,
        predicate: Option<Term>,
        object: Option<Term>,
        want: TriplePart,
        flags: EvalFlags,
    ) -> Option<Term> {
        self.match_iter(subject, predicate, object, want, flags).next()
    }

    /// `get-sources-iterator(P, O)` (spec §4.4): yields matching subjects.
    /// Both `predicate` and `object` are required; either missing returns
    /// `None`, distinguishable from an iterator that simply yields nothing.
    pub fn get_sources_iterator(
        &self,
        predicate: Option<Term>,
        object: Option<Term>,
        flags: EvalFlags,
    ) -> Option<MatchIterator<'_>> {
        let (predicate, object) = (predicate?, object?);
        Some(self.match_iter(None, Some(predicate), Some(object), TriplePart::Subject, flags))
    }

    /// `get-targets-iterator(S, P)` (spec §4.4): yields matching objects.
    pub fn get_targets_iterator(
        &self,
        subject: Option<Term>,
        predicate: Option<Term>,
        flags: EvalFlags,
    ) -> Option<MatchIterator<'_>> {
        let (subject, predicate) = (subject?, predicate?);
        Some(self.match_iter(Some(subject), Some(predicate), None, TriplePart::Object, flags))
    }
}

/// Holds a reference to the dataset, the pattern to match, the wanted
/// position, and a forward-only cursor (spec §3 "Match iterator"). Not
/// rewindable: reconstruct via [`Dataset::match_iter`] to restart.
pub struct MatchIterator<'a> {
    dataset: &'a Dataset,
    subject: Option<Term>,
    predicate: Option<Term>,
    object: Option<Term>,
    want: TriplePart,
    flags: EvalFlags,
    cursor: usize,
}

impl<'a> MatchIterator<'a> {
    fn bound(&self, which: TriplePart) -> Option<&Term> {
        match which {
            TriplePart::Subject => self.subject.as_ref(),
            TriplePart::Predicate => self.predicate.as_ref(),
            TriplePart::Object => self.object.as_ref(),
        }
    }

    /// A bound position matches by `equals` under the iterator's flags. An
    /// `equals` type error (e.g. a numeric literal pattern against a plain
    /// string triple part) is treated as "does not match" rather than
    /// propagated — the iterator itself is infallible (spec §4.4 is silent
    /// on this case; see DESIGN.md).
    fn satisfies(&self, triple: &Triple) -> bool {
        for part in [TriplePart::Subject, TriplePart::Predicate, TriplePart::Object] {
            if part == self.want {
                continue;
            }
            if let Some(pattern) = self.bound(part) {
                match term::equals(pattern, triple.part(part), self.flags) {
                    Ok(true) => {}
                    _ => return false,
                }
            }
        }
        true
    }
}

impl<'a> Iterator for MatchIterator<'a> {
    type Item = Term;

    fn next(&mut self) -> Option<Term> {
        while self.cursor < self.dataset.triples.len() {
            let triple = &self.dataset.triples[self.cursor];
            self.cursor += 1;
            if self.satisfies(triple) {
                return Some(triple.part(self.want).clone());
            }
        }
        None
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn dataset_with(triples: Vec<(&str, &str, &str)>) -> Dataset {
        let mut ds = Dataset::new();
        for (s, p, o) in triples {
            ds.insert(Triple::new(Term::uri(s), Term::uri(p), Term::plain_string(o)));
        }
        ds
    }

    #[test]
    fn targets_iterator_yields_in_insertion_order() {
        // spec §8 end-to-end scenario 5.
        let ds = dataset_with(vec![
            ("http://e/a", "http://e/p", "b"),
            ("http://e/a", "http://e/p", "c"),
        ]);
        let got: Vec<String> = ds
            .get_targets_iterator(Some(Term::uri("http://e/a")), Some(Term::uri("http://e/p")), EvalFlags::NONE)
            .unwrap()
            .map(|t| t.lexical_form().unwrap())
            .collect();
        assert_eq!(got, vec!["b", "c"]);
    }

    #[test]
    fn dataset_ordering_is_a_subsequence_of_insertion_order() {
        // spec §8 invariant 6.
        let ds = dataset_with(vec![
            ("http://e/a", "http://e/p", "1"),
            ("http://e/a", "http://e/q", "2"),
            ("http://e/a", "http://e/p", "3"),
        ]);
        let got: Vec<String> = ds
            .match_iter(
                Some(Term::uri("http://e/a")),
                Some(Term::uri("http://e/p")),
                None,
                TriplePart::Object,
                EvalFlags::NONE,
            )
            .map(|t| t.lexical_form().unwrap())
            .collect();
        assert_eq!(got, vec!["1", "3"]);
    }

    #[test]
    fn get_single_returns_first_match_or_none() {
        let ds = dataset_with(vec![("http://e/a", "http://e/p", "1")]);
        let got = ds.get_single(
            Some(Term::uri("http://e/a")),
            Some(Term::uri("http://e/p")),
            None,
            TriplePart::Object,
            EvalFlags::NONE,
        );
        assert_eq!(got.unwrap().lexical_form().unwrap(), "1");

        let none = ds.get_single(
            Some(Term::uri("http://e/zzz")),
            Some(Term::uri("http://e/p")),
            None,
            TriplePart::Object,
            EvalFlags::NONE,
        );
        assert!(none.is_none());
    }

    #[test]
    fn sources_and_targets_iterators_require_both_bound_positions() {
        let ds = dataset_with(vec![("http://e/a", "http://e/p", "1")]);
        assert!(ds.get_sources_iterator(None, Some(Term::plain_string("1")), EvalFlags::NONE).is_none());
        assert!(ds.get_targets_iterator(Some(Term::uri("http://e/a")), None, EvalFlags::NONE).is_none());
    }

    #[test]
    fn match_iterator_is_not_rewindable() {
        let ds = dataset_with(vec![("http://e/a", "http://e/p", "1")]);
        let mut it = ds.match_iter(None, None, None, TriplePart::Subject, EvalFlags::NONE);
        assert!(it.next().is_some());
        assert!(it.next().is_none());
    }
}
