//! Policy and role repository over the ordered KV store.
//!
//! # Purpose
//! CRUD for the two document types plus maintenance of the secondary index
//! that turns `exact`-flavor authorization queries into one prefix scan.
//!
//! # Index maintenance
//! Upsert writes a fresh document and (for `exact` policies) the complete
//! wildcard-expanded index set, batched. It does not diff against the
//! previous document: changing an existing policy's subject/resource/action
//! lists through upsert leaves the old index entries behind. Delete reads
//! the current document first and removes the index set it implies. The
//! reindex operation rebuilds everything from primary documents.
//!
//! # Concurrency
//! The store serializes writers internally; repository methods are plain
//! blocking calls (KV I/O may touch disk, nothing here awaits). Counters are
//! advisory gauges, adjusted after each successful mutation, and are only
//! exact at startup when recomputed from a full scan.
pub(crate) mod keys;
mod policies;
mod reindex;
mod roles;

use sketo_match::{Flavor, MatchError};
use sketo_store::{Store, StoreError};

pub type RepoResult<T> = Result<T, RepoError>;

#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    #[error("not found")]
    NotFound,
    #[error(transparent)]
    Store(StoreError),
    #[error("invalid stored document: {0}")]
    Codec(#[from] serde_json::Error),
    #[error(transparent)]
    Match(#[from] MatchError),
}

impl From<StoreError> for RepoError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => RepoError::NotFound,
            other => RepoError::Store(other),
        }
    }
}

/// Shared handle over the store; clones are cheap and all observe the same
/// state.
#[derive(Clone)]
pub struct Repository {
    store: Store,
}

impl Repository {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    /// Direct access to the underlying store.
    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Number of primary policy documents in a flavor namespace.
    pub fn count_policies(&self, flavor: Flavor) -> RepoResult<i64> {
        Ok(self
            .store
            .count(keys::policy_doc_prefix(flavor).as_bytes())?)
    }

    /// Number of primary role documents in a flavor namespace.
    pub fn count_roles(&self, flavor: Flavor) -> RepoResult<i64> {
        Ok(self.store.count(keys::role_doc_prefix(flavor).as_bytes())?)
    }

    /// Truncate the entire store; callers must reload counters afterwards.
    pub fn drop_all(&self) -> RepoResult<()> {
        Ok(self.store.drop_all()?)
    }

    /// Cheap storage probe for the readiness endpoint.
    pub fn health_check(&self) -> RepoResult<()> {
        match self.store.get(b"health/probe/") {
            Ok(_) => Ok(()),
            Err(err) if err.is_not_found() => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}
