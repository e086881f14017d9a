//! Pattern matching for authorization policies.
//!
//! Three flavors coexist: `exact` (literal equality), `glob` (shell-style
//! patterns with `:` as the path separator) and `regex` (literal text
//! interleaved with `<…>`-delimited regular-expression segments). Compiled
//! glob and regex matchers are kept in process-wide caches keyed by the
//! pattern string; entries are immutable once inserted and never evicted.
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use dashmap::DashMap;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

mod glob;
mod keto;

pub use glob::Glob;
pub use keto::KetoPattern;

/// Patterns in the glob flavor treat `:` as the path separator; `*` and `?`
/// do not cross it.
pub const GLOB_SEPARATOR: char = ':';

#[derive(Debug, thiserror::Error)]
pub enum MatchError {
    #[error("glob pattern {pattern:?}: {reason}")]
    Glob { pattern: String, reason: String },
    #[error("regex pattern {pattern:?}: {source}")]
    Regex {
        pattern: String,
        source: regex::Error,
    },
    #[error("regex pattern {pattern:?}: unterminated '<' segment")]
    UnterminatedRegex { pattern: String },
}

/// The three match modes. A policy or role lives in exactly one flavor
/// namespace; the flavor string doubles as the leading key-schema component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Flavor {
    Regex,
    Glob,
    Exact,
}

impl Flavor {
    pub const ALL: [Flavor; 3] = [Flavor::Regex, Flavor::Glob, Flavor::Exact];

    pub fn as_str(self) -> &'static str {
        match self {
            Flavor::Regex => "regex",
            Flavor::Glob => "glob",
            Flavor::Exact => "exact",
        }
    }
}

impl fmt::Display for Flavor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Flavor {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "regex" => Ok(Flavor::Regex),
            "glob" => Ok(Flavor::Glob),
            "exact" => Ok(Flavor::Exact),
            _ => Err(()),
        }
    }
}

static GLOB_CACHE: Lazy<DashMap<String, Arc<Glob>>> = Lazy::new(DashMap::new);
static KETO_CACHE: Lazy<DashMap<String, Arc<KetoPattern>>> = Lazy::new(DashMap::new);

fn cached_glob(pattern: &str) -> Result<Arc<Glob>, MatchError> {
    if let Some(compiled) = GLOB_CACHE.get(pattern) {
        return Ok(Arc::clone(&compiled));
    }
    let compiled = Arc::new(Glob::compile(pattern, GLOB_SEPARATOR)?);
    // A concurrent insert of the same pattern is harmless; keep whichever
    // entry landed first.
    Ok(Arc::clone(
        &GLOB_CACHE
            .entry(pattern.to_string())
            .or_insert(compiled),
    ))
}

fn cached_keto(pattern: &str) -> Result<Arc<KetoPattern>, MatchError> {
    if let Some(compiled) = KETO_CACHE.get(pattern) {
        return Ok(Arc::clone(&compiled));
    }
    let compiled = Arc::new(KetoPattern::compile(pattern)?);
    Ok(Arc::clone(
        &KETO_CACHE
            .entry(pattern.to_string())
            .or_insert(compiled),
    ))
}

/// Test a single pattern against `item` under the given flavor.
pub fn matches_one(flavor: Flavor, pattern: &str, item: &str) -> Result<bool, MatchError> {
    match flavor {
        Flavor::Exact => Ok(pattern == item),
        Flavor::Glob => Ok(cached_glob(pattern)?.is_match(item)),
        Flavor::Regex => Ok(cached_keto(pattern)?.is_match(item)),
    }
}

/// True as soon as any pattern matches; compilation errors short-circuit.
pub fn matches_any(flavor: Flavor, patterns: &[String], item: &str) -> Result<bool, MatchError> {
    for pattern in patterns {
        if matches_one(flavor, pattern, item)? {
            return Ok(true);
        }
    }
    Ok(false)
}
