//! Wire-only request and response shapes. The persisted `Policy` and `Role`
//! documents live in [`crate::model`].
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Body of an `allowed` check. `context` is accepted for wire compatibility
/// and never interpreted.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AllowedInput {
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub resource: String,
    #[serde(default)]
    pub action: String,
    #[serde(default)]
    pub context: serde_json::Value,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AuthorizationResult {
    pub allowed: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct AddMembersRequest {
    #[serde(default)]
    pub members: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ImportSummary {
    pub total_imported: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct NotReadyStatus {
    pub errors: BTreeMap<String, String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct VersionInfo {
    pub version: String,
}

/// Query parameters for policy listings. Numbers arrive as raw strings so
/// parse failures produce the API's own 400 diagnostics.
#[derive(Debug, Default, Deserialize)]
pub struct PolicyListQuery {
    pub offset: Option<String>,
    pub limit: Option<String>,
    pub subject: Option<String>,
    pub resource: Option<String>,
    pub action: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RoleListQuery {
    pub offset: Option<String>,
    pub limit: Option<String>,
    pub member: Option<String>,
}
