use bytes::Bytes;
use sketo_match::Flavor;

use crate::model::Policy;
use crate::repo::{RepoResult, Repository, keys};

// Flush threshold for rebuilt index batches.
const REINDEX_BATCH: usize = 10_000;

impl Repository {
    /// Rebuild the `exact` policy index from primary documents: wipe every
    /// key under the index prefix, then re-emit each document's index set
    /// exactly as an upsert would.
    ///
    /// This is the repair path for the orphan entries an index-less upsert
    /// can leave behind. Returns the number of documents reindexed.
    pub fn reindex_exact(&self) -> RepoResult<u64> {
        let flavor = Flavor::Exact;
        self.store()
            .delete_by_prefix(keys::policy_index_prefix(flavor).as_bytes())?;

        // The store's scan holds a read lock, so collect first and write
        // after the sweep completes.
        let base = keys::policy_base(flavor);
        let mut entries: Vec<(Vec<u8>, Bytes)> = Vec::new();
        let mut documents = 0u64;
        self.for_each_policy(flavor, |policy: Policy| {
            for suffix in keys::policy_index_suffixes(
                &policy.subjects,
                &policy.resources,
                &policy.actions,
                &policy.id,
            ) {
                entries.push((format!("{base}{suffix}").into_bytes(), Bytes::new()));
            }
            documents += 1;
            Ok(true)
        })?;

        for chunk in entries.chunks(REINDEX_BATCH) {
            self.store().batch_set(chunk.to_vec())?;
        }
        tracing::info!(documents, entries = entries.len(), "rebuilt exact policy index");
        Ok(documents)
    }
}
