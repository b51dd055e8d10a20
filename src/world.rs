//! The evaluation `World`: blank-node id generation, the compiled-regex
//! cache, and the comparison flags bitset (spec §4.3, §5).
//!
//! A `World` is cheap to construct and is not `Sync`; distinct worlds are
//! independent and may each be driven from their own thread (spec §5), but
//! a single `World` must not be shared across threads without external
//! synchronisation, matching the non-atomic `Rc` reference counting used
//! throughout the term and expression types.

use std::cell::Cell;
use std::collections::HashMap;
use std::sync::Mutex;

use regex::Regex;

use crate::error::EvalError;

/// Flags recognised by [`crate::expr::eval::evaluate`] (spec §6).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EvalFlags(u8);

impl EvalFlags {
    /// Case-folded string comparison in `compare`/`equals`.
    pub const NOCASE: EvalFlags = EvalFlags(1 << 0);
    /// XQuery-style canonical lexical forms in `as_string`.
    pub const XQUERY: EvalFlags = EvalFlags(1 << 1);
    /// Evaluate within an aggregate row context. Transparent to the
    /// evaluator itself; it is a caller contract (spec §6).
    pub const AGGREGATE: EvalFlags = EvalFlags(1 << 2);

    pub const NONE: EvalFlags = EvalFlags(0);

    pub fn contains(self, other: EvalFlags) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn union(self, other: EvalFlags) -> EvalFlags {
        EvalFlags(self.0 | other.0)
    }
}

impl std::ops::BitOr for EvalFlags {
    type Output = EvalFlags;
    fn bitor(self, rhs: EvalFlags) -> EvalFlags {
        self.union(rhs)
    }
}

/// Evaluation context shared across one query: blank node minting and the
/// compiled-regex cache (spec §4.3 "implementations may cache compiled
/// patterns but must not observe cache state").
pub struct World {
    bnode_prefix: String,
    bnode_counter: Cell<u64>,
    regex_cache: Mutex<HashMap<(String, bool), Regex>>,
}

impl Default for World {
    fn default() -> Self {
        World::new()
    }
}

impl World {
    pub fn new() -> Self {
        World {
            bnode_prefix: "b".to_string(),
            bnode_counter: Cell::new(0),
            regex_cache: Mutex::new(HashMap::new()),
        }
    }

    /// Build a `World` that mints blank node ids under a custom prefix
    /// instead of the default `"b"`.
    pub fn with_bnode_prefix(prefix: impl Into<String>) -> Self {
        World {
            bnode_prefix: prefix.into(),
            bnode_counter: Cell::new(0),
            regex_cache: Mutex::new(HashMap::new()),
        }
    }

    /// Mint a fresh blank node id, deterministic only in the sense that
    /// successive calls never repeat within the lifetime of this world
    /// (spec §4.3 determinism note).
    pub fn fresh_bnode_id(&self) -> String {
        let n = self.bnode_counter.get();
        self.bnode_counter.set(n + 1);
        format!("{}{}", self.bnode_prefix, n)
    }

    /// Compile (or reuse a cached compilation of) `pattern` with the given
    /// case sensitivity. The cache is purely an implementation detail: two
    /// calls with the same inputs always behave identically regardless of
    /// whether the cache was warm.
    pub fn compiled_regex(&self, pattern: &str, case_insensitive: bool) -> Result<Regex, EvalError> {
        let key = (pattern.to_string(), case_insensitive);
        if let Some(re) = self.regex_cache.lock().unwrap().get(&key) {
            return Ok(re.clone());
        }
        let re = regex::RegexBuilder::new(pattern)
            .case_insensitive(case_insensitive)
            .build()
            .map_err(|e| EvalError::RegexError(e.to_string()))?;
        self.regex_cache
            .lock()
            .unwrap()
            .insert(key, re.clone());
        Ok(re)
    }
}
