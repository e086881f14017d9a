//! The authorization decision procedure.
//!
//! Evaluation folds matching policies in store key order with
//! deny-over-allow semantics: the first matching `deny` ends the walk with a
//! refusal, otherwise any matching `allow` suffices. A request with an empty
//! subject, resource or action is refused without consulting storage.
use sketo_match::{Flavor, matches_any};
use sketo_store::{MAX_LIST_LIMIT, MAX_LIST_OFFSET};

use crate::model::{EFFECT_ALLOW, EFFECT_DENY, Policy};
use crate::repo::{RepoResult, Repository};

/// Decide whether `(subject, resource, action)` is permitted under the
/// given flavor.
pub fn check(
    repo: &Repository,
    flavor: Flavor,
    subject: &str,
    resource: &str,
    action: &str,
) -> RepoResult<bool> {
    if subject.is_empty() || resource.is_empty() || action.is_empty() {
        return Ok(false);
    }
    match flavor {
        Flavor::Exact => check_exact(repo, flavor, subject, resource, action),
        Flavor::Glob | Flavor::Regex => check_matching(repo, flavor, subject, resource, action),
    }
}

// The index probe: every policy whose literal triples cover the request sits
// under one prefix, so the decision pages through that slice only.
fn check_exact(
    repo: &Repository,
    flavor: Flavor,
    subject: &str,
    resource: &str,
    action: &str,
) -> RepoResult<bool> {
    let mut allowed = false;
    let mut offset = 0i64;
    loop {
        let page =
            repo.policy_index_page(flavor, subject, resource, action, offset, MAX_LIST_LIMIT)?;
        for policy in &page {
            match policy.effect.as_str() {
                EFFECT_DENY => return Ok(false),
                EFFECT_ALLOW => allowed = true,
                _ => {}
            }
        }
        if (page.len() as i64) < MAX_LIST_LIMIT {
            break;
        }
        offset += MAX_LIST_LIMIT;
        if offset > MAX_LIST_OFFSET {
            break;
        }
    }
    Ok(allowed)
}

// Pattern flavors have no index: sweep every document and test all three
// fields through the matchers.
fn check_matching(
    repo: &Repository,
    flavor: Flavor,
    subject: &str,
    resource: &str,
    action: &str,
) -> RepoResult<bool> {
    let mut allowed = false;
    repo.for_each_policy(flavor, |policy: Policy| {
        let include = matches_any(flavor, &policy.subjects, subject)?
            && matches_any(flavor, &policy.resources, resource)?
            && matches_any(flavor, &policy.actions, action)?;
        if include {
            match policy.effect.as_str() {
                EFFECT_DENY => {
                    allowed = false;
                    return Ok(false);
                }
                EFFECT_ALLOW => allowed = true,
                _ => {}
            }
        }
        Ok(true)
    })?;
    Ok(allowed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sketo_store::Store;
    use tempfile::TempDir;

    fn test_repo() -> (TempDir, Repository) {
        let dir = TempDir::new().expect("tempdir");
        let repo = Repository::new(Store::open(dir.path()).expect("open"));
        (dir, repo)
    }

    fn policy(id: &str, effect: &str, subject: &str) -> Policy {
        Policy {
            id: id.to_string(),
            effect: effect.to_string(),
            subjects: vec![subject.to_string()],
            resources: vec!["r1".to_string()],
            actions: vec!["a1".to_string()],
            ..Policy::default()
        }
    }

    #[test]
    fn exact_allow_and_refuse() {
        let (_dir, repo) = test_repo();
        repo.upsert_policy(Flavor::Exact, policy("p1", "allow", "u1"))
            .expect("upsert");
        assert!(check(&repo, Flavor::Exact, "u1", "r1", "a1").expect("check"));
        assert!(!check(&repo, Flavor::Exact, "u2", "r1", "a1").expect("check"));
        assert!(!check(&repo, Flavor::Exact, "u1", "r1", "a2").expect("check"));
    }

    #[test]
    fn deny_overrides_allow() {
        let (_dir, repo) = test_repo();
        repo.upsert_policy(Flavor::Exact, policy("p1", "allow", "u1"))
            .expect("upsert");
        assert!(check(&repo, Flavor::Exact, "u1", "r1", "a1").expect("check"));
        repo.upsert_policy(Flavor::Exact, policy("p2", "deny", "u1"))
            .expect("upsert");
        assert!(!check(&repo, Flavor::Exact, "u1", "r1", "a1").expect("check"));
    }

    #[test]
    fn empty_inputs_refuse_without_storage() {
        let (_dir, repo) = test_repo();
        repo.upsert_policy(Flavor::Exact, policy("p1", "allow", "u1"))
            .expect("upsert");
        assert!(!check(&repo, Flavor::Exact, "", "r1", "a1").expect("check"));
        assert!(!check(&repo, Flavor::Exact, "u1", "", "a1").expect("check"));
        assert!(!check(&repo, Flavor::Exact, "u1", "r1", "").expect("check"));
    }

    #[test]
    fn glob_decision_matches_patterns() {
        let (_dir, repo) = test_repo();
        let mut p = policy("p1", "allow", "users:*:likeus");
        p.resources = vec!["r".to_string()];
        p.actions = vec!["a".to_string()];
        repo.upsert_policy(Flavor::Glob, p).expect("upsert");

        assert!(check(&repo, Flavor::Glob, "users:aydalluiebwj:likeus", "r", "a").expect("check"));
        assert!(!check(&repo, Flavor::Glob, "users:x:--likeus", "r", "a").expect("check"));
    }

    #[test]
    fn regex_decision_matches_patterns() {
        let (_dir, repo) = test_repo();
        let mut p = policy("p1", "allow", "users:<[_-]{2,4}><[0-9A-Za-z]+>:likeus");
        p.resources = vec!["r".to_string()];
        p.actions = vec!["a".to_string()];
        repo.upsert_policy(Flavor::Regex, p).expect("upsert");

        assert!(
            check(
                &repo,
                Flavor::Regex,
                "users:-__-5h4u4d3p3v4c4:likeus",
                "r",
                "a"
            )
            .expect("check")
        );
        assert!(
            !check(&repo, Flavor::Regex, "users:5h4u4d3p3v4c4:likeus", "r", "a").expect("check")
        );
    }

    #[test]
    fn glob_deny_short_circuits() {
        let (_dir, repo) = test_repo();
        let mut allow = policy("p1", "allow", "users:*");
        allow.resources = vec!["r".to_string()];
        allow.actions = vec!["a".to_string()];
        let mut deny = policy("p2", "deny", "users:bob");
        deny.resources = vec!["r".to_string()];
        deny.actions = vec!["a".to_string()];
        repo.upsert_policy(Flavor::Glob, allow).expect("upsert");
        repo.upsert_policy(Flavor::Glob, deny).expect("upsert");

        assert!(check(&repo, Flavor::Glob, "users:alice", "r", "a").expect("check"));
        assert!(!check(&repo, Flavor::Glob, "users:bob", "r", "a").expect("check"));
    }

    #[test]
    fn pattern_errors_surface() {
        let (_dir, repo) = test_repo();
        let mut bad = policy("p1", "allow", "users:[a-a-]:likeus");
        bad.resources = vec!["r".to_string()];
        bad.actions = vec!["a".to_string()];
        repo.upsert_policy(Flavor::Glob, bad).expect("upsert");
        assert!(check(&repo, Flavor::Glob, "users:bob:likeus", "r", "a").is_err());
    }

    #[test]
    fn unknown_effects_are_ignored() {
        let (_dir, repo) = test_repo();
        repo.upsert_policy(Flavor::Exact, policy("p1", "audit", "u1"))
            .expect("upsert");
        assert!(!check(&repo, Flavor::Exact, "u1", "r1", "a1").expect("check"));
    }
}
