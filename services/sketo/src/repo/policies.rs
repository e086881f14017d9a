use bytes::Bytes;
use sketo_match::{Flavor, matches_any};
use uuid::Uuid;

use crate::counters;
use crate::model::Policy;
use crate::repo::{RepoError, RepoResult, Repository, keys};

impl Repository {
    /// Create or replace a policy. A missing id is assigned from a
    /// time-ordered UUID so listings approximate insertion order.
    pub fn upsert_policy(&self, flavor: Flavor, mut policy: Policy) -> RepoResult<Policy> {
        if policy.id.is_empty() {
            policy.id = Uuid::now_v7().to_string();
        }
        let encoded = serde_json::to_vec(&policy)?;
        self.store()
            .set(&keys::policy_doc_key(flavor, &policy.id), encoded)?;
        if flavor == Flavor::Exact {
            self.store().batch_set(index_entries(flavor, &policy))?;
        }
        counters::policy_total(flavor).increment(1.0);
        Ok(policy)
    }

    /// Upsert many policies: documents in one batch, index entries in
    /// another.
    pub fn upsert_policies(
        &self,
        flavor: Flavor,
        mut policies: Vec<Policy>,
    ) -> RepoResult<Vec<Policy>> {
        for policy in &mut policies {
            if policy.id.is_empty() {
                policy.id = Uuid::now_v7().to_string();
            }
        }

        let mut docs = Vec::with_capacity(policies.len());
        for policy in &policies {
            docs.push((
                keys::policy_doc_key(flavor, &policy.id),
                Bytes::from(serde_json::to_vec(policy)?),
            ));
        }
        self.store().batch_set(docs)?;

        if flavor == Flavor::Exact {
            let mut entries = Vec::new();
            for policy in &policies {
                entries.extend(index_entries(flavor, policy));
            }
            self.store().batch_set(entries)?;
        }

        counters::policy_total(flavor).increment(policies.len() as f64);
        Ok(policies)
    }

    pub fn get_policy(&self, flavor: Flavor, id: &str) -> RepoResult<Policy> {
        let value = self.store().get(&keys::policy_doc_key(flavor, id))?;
        Ok(serde_json::from_slice(&value)?)
    }

    /// Delete a policy and, for `exact`, the index set its current document
    /// implies. Idempotent; returns whether the document existed so the
    /// counter decrements at most once.
    pub fn delete_policy(&self, flavor: Flavor, id: &str) -> RepoResult<bool> {
        let doc_key = keys::policy_doc_key(flavor, id);
        let existing = match self.store().get(&doc_key) {
            Ok(value) => Some(serde_json::from_slice::<Policy>(&value)?),
            Err(err) if err.is_not_found() => None,
            Err(err) => return Err(err.into()),
        };

        self.store().delete(&doc_key)?;

        let Some(policy) = existing else {
            return Ok(false);
        };
        if flavor == Flavor::Exact {
            let base = keys::policy_base(flavor);
            let index_keys = keys::policy_index_suffixes(
                &policy.subjects,
                &policy.resources,
                &policy.actions,
                id,
            )
            .into_iter()
            .map(|suffix| format!("{base}{suffix}").into_bytes())
            .collect();
            self.store().batch_delete(index_keys)?;
        }
        counters::policy_total(flavor).decrement(1.0);
        Ok(true)
    }

    /// List policies matching the (possibly empty) subject/resource/action
    /// filter. `exact` answers from the index; `glob`/`regex` sweep every
    /// document and filter through the pattern matchers, where an empty
    /// filter field matches everything.
    pub fn list_policies(
        &self,
        flavor: Flavor,
        subject: &str,
        resource: &str,
        action: &str,
        offset: i64,
        limit: i64,
    ) -> RepoResult<Vec<Policy>> {
        if flavor == Flavor::Exact {
            return self.policy_index_page(flavor, subject, resource, action, offset, limit);
        }

        let mut out = Vec::new();
        self.for_each_policy(flavor, |policy| {
            let include = (subject.is_empty()
                || matches_any(flavor, &policy.subjects, subject)?)
                && (resource.is_empty() || matches_any(flavor, &policy.resources, resource)?)
                && (action.is_empty() || matches_any(flavor, &policy.actions, action)?);
            if include {
                out.push(policy);
            }
            Ok(true)
        })?;
        Ok(out)
    }

    /// One page of the `exact` policy index at the given filter position,
    /// dereferenced to documents.
    pub(crate) fn policy_index_page(
        &self,
        flavor: Flavor,
        subject: &str,
        resource: &str,
        action: &str,
        offset: i64,
        limit: i64,
    ) -> RepoResult<Vec<Policy>> {
        let rows = self.store().list(
            keys::policy_base(flavor).as_bytes(),
            keys::policy_filter(subject, resource, action).as_bytes(),
            offset,
            limit,
        )?;
        let mut policies = Vec::with_capacity(rows.len());
        for (_, value) in rows {
            policies.push(serde_json::from_slice(&value)?);
        }
        Ok(policies)
    }

    /// Visit every policy document of a flavor in key order. The callback
    /// returns `false` to stop.
    pub(crate) fn for_each_policy<F>(&self, flavor: Flavor, mut f: F) -> RepoResult<()>
    where
        F: FnMut(Policy) -> RepoResult<bool>,
    {
        self.store()
            .scan_prefix::<RepoError, _>(keys::policy_doc_prefix(flavor).as_bytes(), |_, value| {
                f(serde_json::from_slice(value)?)
            })
    }
}

fn index_entries(flavor: Flavor, policy: &Policy) -> Vec<(Vec<u8>, Bytes)> {
    let base = keys::policy_base(flavor);
    keys::policy_index_suffixes(
        &policy.subjects,
        &policy.resources,
        &policy.actions,
        &policy.id,
    )
    .into_iter()
    .map(|suffix| (format!("{base}{suffix}").into_bytes(), Bytes::new()))
    .collect()
}
