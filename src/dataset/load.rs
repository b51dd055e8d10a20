//! `Dataset::load` (spec §4.4 "Load"): a small adapter from `rio_api`/
//! `rio_turtle` (and, behind the `rdfxml` feature, `rio_xml`) onto this
//! crate's `Term`/`Triple` types. This is plumbing to populate the dataset
//! from bytes, not a general-purpose RDF parser (spec §1).

use std::io::{BufRead, BufReader, Read};

use rio_api::model::{
    GraphName as RioGraphName, Literal as RioLiteral, NamedOrBlankNode as RioNamedOrBlankNode,
    Term as RioTerm, Triple as RioTriple,
};
use rio_api::parser::{QuadsParser, TriplesParser};
use rio_turtle::{NQuadsParser, NTriplesParser, TriGParser, TurtleError, TurtleParser};
#[cfg(feature = "rdfxml")]
use rio_xml::{RdfXmlError, RdfXmlParser};

use super::{Dataset, Triple};
use crate::error::DatasetError;
use crate::term::Term;
use crate::world::World;

/// The RDF syntaxes this loader recognises (spec §4.4, §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RdfFormat {
    /// Downgrade target for an unrecognised hint; sniffing is parser
    /// territory this core does not own, so `Guess` behaves as N-Triples.
    Guess,
    NTriples,
    Turtle,
    TriG,
    NQuads,
    #[cfg(feature = "rdfxml")]
    RdfXml,
}

impl RdfFormat {
    /// Parse a caller-supplied format-name hint, downgrading an unrecognised
    /// string to [`RdfFormat::Guess`] with a WARN log (spec §4.4).
    pub fn from_hint(hint: &str) -> RdfFormat {
        match hint.to_ascii_lowercase().as_str() {
            "guess" => RdfFormat::Guess,
            "ntriples" | "nt" => RdfFormat::NTriples,
            "turtle" | "ttl" => RdfFormat::Turtle,
            "trig" => RdfFormat::TriG,
            "nquads" | "nq" => RdfFormat::NQuads,
            #[cfg(feature = "rdfxml")]
            "rdfxml" | "xml" => RdfFormat::RdfXml,
            other => {
                log::warn!("unrecognised RDF format hint {:?}, downgrading to guess", other);
                RdfFormat::Guess
            }
        }
    }
}

fn convert_subject(s: RioNamedOrBlankNode<'_>) -> Term {
    match s {
        RioNamedOrBlankNode::NamedNode(n) => Term::uri(n.iri.to_string()),
        RioNamedOrBlankNode::BlankNode(b) => Term::blank(b.id.to_string()),
    }
}

fn convert_graph(g: RioGraphName<'_>) -> Term {
    match g {
        RioGraphName::NamedNode(n) => Term::uri(n.iri.to_string()),
        RioGraphName::BlankNode(b) => Term::blank(b.id.to_string()),
    }
}

fn convert_object(t: RioTerm<'_>) -> Term {
    match t {
        RioTerm::NamedNode(n) => Term::uri(n.iri.to_string()),
        RioTerm::BlankNode(b) => Term::blank(b.id.to_string()),
        RioTerm::Literal(RioLiteral::Simple { value }) => Term::plain_string(value.to_string()),
        RioTerm::Literal(RioLiteral::LanguageTaggedString { value, language }) => {
            Term::lang_string(value.to_string(), language.to_string())
        }
        RioTerm::Literal(RioLiteral::Typed { value, datatype }) => {
            Term::typed_string(value.to_string(), datatype.iri.to_string())
        }
    }
}

fn convert_triple(t: RioTriple<'_>) -> Triple {
    Triple::new(
        convert_subject(t.subject),
        Term::uri(t.predicate.iri.to_string()),
        convert_object(t.object),
    )
}

/// Drive a [`TriplesParser`] to completion, appending each parsed triple to
/// `sink`. Per-triple syntax errors are logged at WARN and that single step
/// is skipped rather than aborting the rest of the load (spec §7 "do not
/// abort the load of subsequent triples").
fn drive_triples<P>(mut parser: P, sink: &mut impl FnMut(Triple)) -> Result<(), DatasetError>
where
    P: TriplesParser,
    P::Error: std::fmt::Display,
{
    while !parser.is_end() {
        let step = parser.parse_step(&mut |t: RioTriple<'_>| -> Result<(), P::Error> {
            sink(convert_triple(t));
            Ok(())
        });
        if let Err(e) = step {
            log::warn!("skipping triple after parse error: {}", e);
        }
    }
    Ok(())
}

fn drive_quads(
    mut parser: impl QuadsParser<Error = TurtleError>,
    sink: &mut impl FnMut(Triple),
) -> Result<(), DatasetError> {
    while !parser.is_end() {
        let step = parser.parse_step(&mut |q: rio_api::model::Quad<'_>| -> Result<(), TurtleError> {
            let subject = convert_subject(q.subject);
            let predicate = Term::uri(q.predicate.iri.to_string());
            let object = convert_object(q.object);
            match q.graph_name {
                Some(g) => sink(Triple::in_graph(subject, predicate, object, convert_graph(g))),
                None => sink(Triple::new(subject, predicate, object)),
            }
            Ok(())
        });
        if let Err(e) = step {
            log::warn!("skipping quad after parse error: {}", e);
        }
    }
    Ok(())
}

impl Dataset {
    /// Parse `read` as `format` (or N-Triples, if `format` is `None` or
    /// `Guess`) and append the resulting triples. Returns the number of
    /// triples appended. The base URI is stored and shared by every triple
    /// from this load (spec §4.4).
    pub fn load(
        &mut self,
        read: impl Read,
        base_uri: Term,
        format: Option<RdfFormat>,
        _world: &World,
    ) -> Result<usize, DatasetError> {
        let base_uri_str = match &base_uri {
            Term::Uri(u) if !u.is_empty() => u.to_string(),
            other => {
                return Err(DatasetError::InvalidBaseUri(format!("{:?}", other)));
            }
        };
        let format = format.unwrap_or(RdfFormat::Guess);
        let before = self.len();
        let reader = BufReader::new(read);
        let mut sink = |t: Triple| self.insert(t);

        match format {
            RdfFormat::Guess | RdfFormat::NTriples => {
                drive_triples(NTriplesParser::new(reader), &mut sink)?
            }
            RdfFormat::Turtle => {
                let parser = TurtleParser::new(reader, &base_uri_str)
                    .map_err(|e| DatasetError::Parse(e.to_string()))?;
                drive_triples(parser, &mut sink)?
            }
            RdfFormat::NQuads => drive_quads(NQuadsParser::new(reader), &mut sink)?,
            RdfFormat::TriG => {
                let parser = TriGParser::new(reader, &base_uri_str)
                    .map_err(|e| DatasetError::Parse(e.to_string()))?;
                drive_quads(parser, &mut sink)?
            }
            #[cfg(feature = "rdfxml")]
            RdfFormat::RdfXml => {
                let parser = RdfXmlParser::new(reader, &base_uri_str);
                drive_rdfxml(parser, &mut sink)?
            }
        }

        self.base_uri = Some(base_uri);
        Ok(self.len() - before)
    }
}

#[cfg(feature = "rdfxml")]
fn drive_rdfxml(
    mut parser: RdfXmlParser<impl BufRead>,
    sink: &mut impl FnMut(Triple),
) -> Result<(), DatasetError> {
    while !parser.is_end() {
        let step = parser.parse_step(&mut |t: RioTriple<'_>| -> Result<(), RdfXmlError> {
            sink(convert_triple(t));
            Ok(())
        });
        if let Err(e) = step {
            log::warn!("skipping triple after RDF/XML parse error: {}", e);
        }
    }
    Ok(())
}
