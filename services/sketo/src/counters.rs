//! Process-wide metric counters.
//!
//! Six document gauges (policies and roles per flavor) and four lifetime
//! request counters, all exported through the Prometheus recorder installed
//! at startup. The gauges are advisory: incremented and decremented beside
//! each successful mutation, and recomputed from a full document scan at
//! startup and after the store is dropped.
use metrics::{Counter, Gauge, counter, gauge};
use sketo_match::Flavor;

use crate::repo::{RepoResult, Repository};

pub const POLICIES_TOTAL: &str = "sketo_policies_total";
pub const ROLES_TOTAL: &str = "sketo_roles_total";
pub const ALLOW_REQUESTS: &str = "sketo_allow_requests_since_start";
pub const ALLOW_ACCEPTED: &str = "sketo_allow_accepted_since_start";
pub const ALLOW_REFUSED: &str = "sketo_allow_refused_since_start";
pub const ALLOW_FAILURES: &str = "sketo_allow_failures_since_start";

pub fn policy_total(flavor: Flavor) -> Gauge {
    gauge!(POLICIES_TOTAL, "flavor" => flavor.as_str())
}

pub fn role_total(flavor: Flavor) -> Gauge {
    gauge!(ROLES_TOTAL, "flavor" => flavor.as_str())
}

pub fn allow_requests() -> Counter {
    counter!(ALLOW_REQUESTS)
}

pub fn allow_accepted() -> Counter {
    counter!(ALLOW_ACCEPTED)
}

pub fn allow_refused() -> Counter {
    counter!(ALLOW_REFUSED)
}

pub fn allow_failures() -> Counter {
    counter!(ALLOW_FAILURES)
}

/// Recompute the six document gauges by counting primary documents.
pub fn reload(repo: &Repository) -> RepoResult<()> {
    for flavor in Flavor::ALL {
        policy_total(flavor).set(repo.count_policies(flavor)? as f64);
        role_total(flavor).set(repo.count_roles(flavor)? as f64);
    }
    Ok(())
}
