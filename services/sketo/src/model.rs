//! Persisted document types.
//!
//! These serialize verbatim into the store, so their JSON shape is part of
//! the on-disk contract. `conditions` is opaque: stored and returned as-is,
//! never interpreted.
use serde::{Deserialize, Serialize};

pub const EFFECT_ALLOW: &str = "allow";
pub const EFFECT_DENY: &str = "deny";

/// An access-control policy: subjects × resources × actions with an effect.
/// Depending on the flavor the three lists hold literal strings, glob
/// patterns or Keto-regex patterns.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Policy {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub effect: String,
    #[serde(default)]
    pub subjects: Vec<String>,
    #[serde(default)]
    pub resources: Vec<String>,
    #[serde(default)]
    pub actions: Vec<String>,
    #[serde(default)]
    pub conditions: serde_json::Value,
}

/// A named membership set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Role {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub members: Vec<String>,
}
