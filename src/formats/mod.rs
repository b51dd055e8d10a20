//! The pluggable result-format registry (spec §4.5): a name/URI/MIME
//! indexed table of factories, each able to write, read, or lazily produce
//! rows for a SPARQL result set. Registration is the only part of result-set
//! I/O this crate implements; no concrete codec ships here (spec §1
//! Non-goals).

use std::io::{Read, Write};
use std::rc::Rc;

use crate::error::FormatError;
use crate::term::Term;
use crate::world::World;

/// An ordered list of SPARQL result variable names.
#[derive(Debug, Clone, Default)]
pub struct Variables(pub Vec<Rc<str>>);

/// One result row: an optional term per variable, positional with
/// [`Variables`].
#[derive(Debug, Clone, Default)]
pub struct Row(pub Vec<Option<Term>>);

/// A minimal in-memory result set: enough structure for a [`Writer`] or
/// [`Reader`] to act on without this crate implementing an actual codec.
#[derive(Debug, Clone, Default)]
pub struct ResultSet {
    pub variables: Variables,
    pub rows: Vec<Row>,
}

/// Capability bits a [`FormatFactory`] advertises (spec §4.5).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Capability(u8);

impl Capability {
    pub const NONE: Capability = Capability(0);
    pub const READER: Capability = Capability(1 << 0);
    pub const WRITER: Capability = Capability(1 << 1);

    pub fn contains(self, other: Capability) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn union(self, other: Capability) -> Capability {
        Capability(self.0 | other.0)
    }
}

impl std::ops::BitOr for Capability {
    type Output = Capability;
    fn bitor(self, rhs: Capability) -> Capability {
        self.union(rhs)
    }
}

pub trait Writer {
    fn write(&self, out: &mut dyn Write, results: &ResultSet, base_uri: Option<&Term>) -> Result<(), FormatError>;
}

pub trait Reader {
    fn read(
        &self,
        world: &World,
        input: &mut dyn Read,
        results: &mut ResultSet,
        base_uri: Option<&Term>,
    ) -> Result<(), FormatError>;
}

/// An alternative to [`Reader`] that yields rows lazily instead of filling a
/// [`ResultSet`] in one call (spec §4.5 "row source").
pub type RowIterator = Box<dyn Iterator<Item = Result<Row, FormatError>>>;
/// Takes ownership of the input stream and a clone of the result set's
/// variables (not a borrow — the returned iterator has no lifetime
/// parameter to tie it to the caller's `ResultSet`).
pub type RowSourceFactory = Rc<dyn Fn(Box<dyn Read>, Variables) -> RowIterator>;

/// `(name, label, uri, mime_type, writer?, reader?, row_source?)` (spec §3
/// "Format factory"). At least one of `writer`/`reader`/`row_source` must be
/// set; [`FormatRegistry::register`] enforces this.
pub struct FormatFactory {
    pub name: Option<Rc<str>>,
    pub label: Rc<str>,
    pub uri: Option<Rc<str>>,
    pub mime_type: Option<Rc<str>>,
    pub writer: Option<Rc<dyn Writer>>,
    pub reader: Option<Rc<dyn Reader>>,
    pub row_source: Option<RowSourceFactory>,
}

impl FormatFactory {
    pub fn capability(&self) -> Capability {
        let mut cap = Capability::NONE;
        if self.writer.is_some() {
            cap = cap | Capability::WRITER;
        }
        if self.reader.is_some() || self.row_source.is_some() {
            cap = cap | Capability::READER;
        }
        cap
    }
}

/// A matched factory, ready to write or read (spec §6 `formatter.write`/
/// `formatter.read`).
pub struct Formatter<'a> {
    factory: &'a FormatFactory,
}

impl<'a> Formatter<'a> {
    pub fn label(&self) -> &str {
        &self.factory.label
    }

    pub fn write(&self, out: &mut dyn Write, results: &ResultSet, base_uri: Option<&Term>) -> Result<(), FormatError> {
        match &self.factory.writer {
            Some(w) => w.write(out, results, base_uri),
            None => Err(FormatError::MissingCapability(
                self.factory.label.to_string(),
            )),
        }
    }

    /// Reads via `reader` if present; otherwise falls back to pulling rows
    /// from `row_source` until exhaustion and appending each to `results`
    /// (spec §4.5 "Read via row source").
    pub fn read(
        &self,
        world: &World,
        input: Box<dyn Read>,
        results: &mut ResultSet,
        base_uri: Option<&Term>,
    ) -> Result<(), FormatError> {
        if let Some(r) = &self.factory.reader {
            let mut input = input;
            return r.read(world, &mut input, results, base_uri);
        }
        match &self.factory.row_source {
            Some(factory) => {
                for row in factory(input, results.variables.clone()) {
                    results.rows.push(row?);
                }
                Ok(())
            }
            None => Err(FormatError::MissingCapability(
                self.factory.label.to_string(),
            )),
        }
    }
}

/// The registry itself: an insertion-ordered list of factories. The first
/// registered factory is the default (spec §4.5 "Registration").
#[derive(Default)]
pub struct FormatRegistry {
    factories: Vec<FormatFactory>,
}

impl FormatRegistry {
    pub fn new() -> Self {
        FormatRegistry {
            factories: Vec::new(),
        }
    }

    /// Additive; preserves insertion order. Rejects a factory with no
    /// capability at all (spec §3 invariant).
    pub fn register(&mut self, factory: FormatFactory) -> Result<(), FormatError> {
        if factory.capability() == Capability::NONE {
            return Err(FormatError::MissingCapability(factory.label.to_string()));
        }
        self.factories.push(factory);
        Ok(())
    }

    /// `name` takes precedence over `uri`, which takes precedence over
    /// `mime_type`; with none of the three provided, the default (first
    /// registered) factory is returned (spec §4.5 "Lookup"). Note: spec.md's
    /// prose names only `name`/`uri` in the no-identifier fallback case,
    /// but the same paragraph's precedence list treats `mime_type` as a
    /// legitimate standalone lookup key — treating "neither provided" as
    /// "none of the three provided" keeps `mime_type`-only lookups usable,
    /// which is the reading this crate follows (see DESIGN.md).
    fn find(
        &self,
        name: Option<&str>,
        uri: Option<&str>,
        mime_type: Option<&str>,
        required: Capability,
    ) -> Option<&FormatFactory> {
        if name.is_none() && uri.is_none() && mime_type.is_none() {
            return self.factories.first().filter(|f| f.capability().contains(required));
        }
        self.factories.iter().find(|f| {
            if !f.capability().contains(required) {
                return false;
            }
            if let Some(n) = name {
                return f.name.as_deref() == Some(n);
            }
            if let Some(u) = uri {
                return f.uri.as_deref() == Some(u);
            }
            if let Some(m) = mime_type {
                return f.mime_type.as_deref() == Some(m);
            }
            false
        })
    }

    /// `true` iff a factory matches the given identifiers and supports
    /// every bit in `required`.
    pub fn check(&self, name: Option<&str>, uri: Option<&str>, mime_type: Option<&str>, required: Capability) -> bool {
        self.find(name, uri, mime_type, required).is_some()
    }

    /// Resolve a [`Formatter`] regardless of capability; callers that care
    /// which capability they need should `check` first.
    pub fn new_formatter(
        &self,
        name: Option<&str>,
        mime_type: Option<&str>,
        uri: Option<&str>,
    ) -> Option<Formatter<'_>> {
        self.find(name, uri, mime_type, Capability::NONE)
            .map(|factory| Formatter { factory })
    }

    /// Visits only factories with a non-empty `name`, in insertion order
    /// (spec §4.5 "Enumeration").
    pub fn enumerate(&self) -> impl Iterator<Item = (&str, &str, Option<&str>, Option<&str>, Capability)> {
        self.factories.iter().filter_map(|f| {
            f.name.as_deref().map(|name| {
                (
                    name,
                    f.label.as_ref(),
                    f.uri.as_deref(),
                    f.mime_type.as_deref(),
                    f.capability(),
                )
            })
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    struct NoopWriter;
    impl Writer for NoopWriter {
        fn write(&self, _out: &mut dyn Write, _results: &ResultSet, _base_uri: Option<&Term>) -> Result<(), FormatError> {
            Ok(())
        }
    }

    fn factory(name: &str, mime_type: &str) -> FormatFactory {
        FormatFactory {
            name: Some(name.into()),
            label: name.into(),
            uri: Some(format!("http://www.w3.org/ns/formats/{}", name).into()),
            mime_type: Some(mime_type.into()),
            writer: Some(Rc::new(NoopWriter)),
            reader: None,
            row_source: None,
        }
    }

    fn sample_registry() -> FormatRegistry {
        let mut reg = FormatRegistry::new();
        reg.register(factory("xml", "application/sparql-results+xml")).unwrap();
        reg.register(factory("json", "application/sparql-results+json")).unwrap();
        reg.register(factory("table", "text/plain")).unwrap();
        reg.register(factory("csv", "text/csv")).unwrap();
        reg.register(factory("tsv", "text/tab-separated-values")).unwrap();
        reg.register(factory("html", "text/html")).unwrap();
        reg.register(factory("turtle", "text/turtle")).unwrap();
        reg
    }

    #[test]
    fn enumerate_lists_every_named_factory() {
        // spec §8 end-to-end scenario 6.
        let reg = sample_registry();
        let names: Vec<&str> = reg.enumerate().map(|(n, ..)| n).collect();
        for expected in ["xml", "json", "table", "csv", "tsv", "html", "turtle"] {
            assert!(names.contains(&expected), "missing {:?} in {:?}", expected, names);
        }
    }

    #[test]
    fn new_formatter_by_mime_type_matches_requested_type() {
        let reg = sample_registry();
        let formatter = reg
            .new_formatter(None, Some("application/sparql-results+json"), None)
            .unwrap();
        assert_eq!(formatter.label(), "json");
    }

    #[test]
    fn name_takes_precedence_over_uri_and_mime_type() {
        let mut reg = FormatRegistry::new();
        let mut a = factory("a", "text/a");
        a.uri = Some("urn:shared".into());
        let mut b = factory("b", "text/b");
        b.uri = Some("urn:shared".into());
        reg.register(a).unwrap();
        reg.register(b).unwrap();

        let by_name = reg.new_formatter(Some("b"), Some("text/a"), Some("urn:shared")).unwrap();
        assert_eq!(by_name.label(), "b");
    }

    #[test]
    fn no_identifier_returns_the_first_registered_default() {
        let reg = sample_registry();
        let formatter = reg.new_formatter(None, None, None).unwrap();
        assert_eq!(formatter.label(), "xml");
    }

    #[test]
    fn register_rejects_a_factory_with_no_capability() {
        let mut reg = FormatRegistry::new();
        let bare = FormatFactory {
            name: Some("nothing".into()),
            label: "nothing".into(),
            uri: None,
            mime_type: None,
            writer: None,
            reader: None,
            row_source: None,
        };
        assert!(reg.register(bare).is_err());
    }

    #[test]
    fn check_respects_required_capability() {
        let reg = sample_registry();
        assert!(reg.check(Some("xml"), None, None, Capability::WRITER));
        assert!(!reg.check(Some("xml"), None, None, Capability::READER));
    }
}
