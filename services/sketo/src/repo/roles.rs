use bytes::Bytes;
use sketo_match::Flavor;
use uuid::Uuid;

use crate::counters;
use crate::model::Role;
use crate::repo::{RepoError, RepoResult, Repository, keys};

impl Repository {
    /// Create or replace a role. Members are deduplicated preserving order;
    /// one index entry is written per member plus the always-present
    /// wildcard entry, in every flavor, so "list all roles" is a prefix
    /// scan.
    pub fn upsert_role(&self, flavor: Flavor, mut role: Role) -> RepoResult<Role> {
        if role.id.is_empty() {
            role.id = Uuid::now_v7().to_string();
        }
        role.members = dedupe(role.members);

        let encoded = serde_json::to_vec(&role)?;
        self.store()
            .set(&keys::role_doc_key(flavor, &role.id), encoded)?;

        let base = keys::role_base(flavor);
        let mut entries: Vec<(Vec<u8>, Bytes)> = role
            .members
            .iter()
            .map(|member| {
                (
                    format!("{base}{}", keys::role_index_suffix(member, &role.id)).into_bytes(),
                    Bytes::new(),
                )
            })
            .collect();
        entries.push((
            format!("{base}{}", keys::role_index_suffix("", &role.id)).into_bytes(),
            Bytes::new(),
        ));
        self.store().batch_set(entries)?;

        counters::role_total(flavor).increment(1.0);
        Ok(role)
    }

    pub fn get_role(&self, flavor: Flavor, id: &str) -> RepoResult<Role> {
        let value = self.store().get(&keys::role_doc_key(flavor, id))?;
        Ok(serde_json::from_slice(&value)?)
    }

    /// Delete a role and its member index entries. Idempotent; returns
    /// whether the document existed.
    pub fn delete_role(&self, flavor: Flavor, id: &str) -> RepoResult<bool> {
        let doc_key = keys::role_doc_key(flavor, id);
        let existing = match self.store().get(&doc_key) {
            Ok(value) => Some(serde_json::from_slice::<Role>(&value)?),
            Err(err) if err.is_not_found() => None,
            Err(err) => return Err(err.into()),
        };

        self.store().delete(&doc_key)?;

        let Some(role) = existing else {
            return Ok(false);
        };
        let base = keys::role_base(flavor);
        let mut index_keys: Vec<Vec<u8>> = role
            .members
            .iter()
            .map(|member| format!("{base}{}", keys::role_index_suffix(member, id)).into_bytes())
            .collect();
        index_keys.push(format!("{base}{}", keys::role_index_suffix("", id)).into_bytes());
        self.store().batch_delete(index_keys)?;

        counters::role_total(flavor).decrement(1.0);
        Ok(true)
    }

    /// List roles, optionally filtered to those holding `member`. An empty
    /// member selects the wildcard entries, i.e. every role.
    pub fn list_roles(
        &self,
        flavor: Flavor,
        member: &str,
        offset: i64,
        limit: i64,
    ) -> RepoResult<Vec<Role>> {
        let rows = self.store().list(
            keys::role_base(flavor).as_bytes(),
            keys::role_filter(member).as_bytes(),
            offset,
            limit,
        )?;
        let mut roles = Vec::with_capacity(rows.len());
        for (_, value) in rows {
            roles.push(serde_json::from_slice(&value)?);
        }
        Ok(roles)
    }

    /// Add members to an existing role. Already-present members are
    /// ignored; only the genuinely new index entries are written.
    pub fn add_members(&self, flavor: Flavor, id: &str, members: Vec<String>) -> RepoResult<Role> {
        let mut role = self.get_role(flavor, id)?;

        let mut added = Vec::new();
        for member in dedupe(members) {
            if !role.members.contains(&member) {
                added.push(member);
            }
        }
        if added.is_empty() {
            return Ok(role);
        }
        role.members.extend(added.iter().cloned());

        let encoded = serde_json::to_vec(&role)?;
        self.store().set(&keys::role_doc_key(flavor, id), encoded)?;

        let base = keys::role_base(flavor);
        let entries = added
            .iter()
            .map(|member| {
                (
                    format!("{base}{}", keys::role_index_suffix(member, id)).into_bytes(),
                    Bytes::new(),
                )
            })
            .collect();
        self.store().batch_set(entries)?;
        Ok(role)
    }

    /// Remove one member from an existing role; removing a non-member is a
    /// no-op.
    pub fn remove_member(&self, flavor: Flavor, id: &str, member: &str) -> RepoResult<Role> {
        let mut role = self.get_role(flavor, id)?;

        let Some(position) = role.members.iter().position(|m| m == member) else {
            return Ok(role);
        };
        role.members.remove(position);

        let encoded = serde_json::to_vec(&role)?;
        self.store().set(&keys::role_doc_key(flavor, id), encoded)?;
        self.store().delete(
            format!(
                "{}{}",
                keys::role_base(flavor),
                keys::role_index_suffix(member, id)
            )
            .as_bytes(),
        )?;
        Ok(role)
    }
}

fn dedupe(members: Vec<String>) -> Vec<String> {
    let mut seen = Vec::with_capacity(members.len());
    for member in members {
        if !seen.contains(&member) {
            seen.push(member);
        }
    }
    seen
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

    fn role(id: &str, members: &[&str]) -> Role {
        Role {
            id: id.to_string(),
            description: String::new(),
            members: members.iter().map(|m| m.to_string()).collect(),
        }
    }

    #[test]
    fn upsert_dedupes_members_and_round_trips() {
        let (_dir, repo) = test_repo();
        let stored = repo
            .upsert_role(Flavor::Exact, role("r1", &["a", "b", "a"]))
            .expect("upsert");
        assert_eq!(stored.members, vec!["a", "b"]);
        let fetched = repo.get_role(Flavor::Exact, "r1").expect("get");
        assert_eq!(fetched.members, vec!["a", "b"]);
    }

    #[test]
    fn listing_by_member_uses_the_index() {
        let (_dir, repo) = test_repo();
        repo.upsert_role(Flavor::Glob, role("r1", &["alice", "bob"]))
            .expect("upsert");
        repo.upsert_role(Flavor::Glob, role("r2", &["bob"]))
            .expect("upsert");

        let all = repo.list_roles(Flavor::Glob, "", 0, -1).expect("list");
        assert_eq!(all.len(), 2);

        let bobs = repo.list_roles(Flavor::Glob, "bob", 0, -1).expect("list");
        assert_eq!(bobs.len(), 2);

        let alices = repo.list_roles(Flavor::Glob, "alice", 0, -1).expect("list");
        assert_eq!(alices.len(), 1);
        assert_eq!(alices[0].id, "r1");
    }

    #[test]
    fn add_members_skips_existing_and_extends_index() {
        let (_dir, repo) = test_repo();
        repo.upsert_role(Flavor::Exact, role("r1", &["alice"]))
            .expect("upsert");
        let updated = repo
            .add_members(
                Flavor::Exact,
                "r1",
                vec!["alice".to_string(), "carol".to_string()],
            )
            .expect("add");
        assert_eq!(updated.members, vec!["alice", "carol"]);

        let carols = repo.list_roles(Flavor::Exact, "carol", 0, -1).expect("list");
        assert_eq!(carols.len(), 1);
    }

    #[test]
    fn remove_member_is_a_no_op_for_non_members() {
        let (_dir, repo) = test_repo();
        repo.upsert_role(Flavor::Exact, role("r1", &["alice", "bob"]))
            .expect("upsert");

        let updated = repo
            .remove_member(Flavor::Exact, "r1", "bob")
            .expect("remove");
        assert_eq!(updated.members, vec!["alice"]);
        assert!(
            repo.list_roles(Flavor::Exact, "bob", 0, -1)
                .expect("list")
                .is_empty()
        );

        let unchanged = repo
            .remove_member(Flavor::Exact, "r1", "ghost")
            .expect("remove");
        assert_eq!(unchanged.members, vec!["alice"]);
    }

    #[test]
    fn member_operations_on_missing_roles_are_not_found() {
        let (_dir, repo) = test_repo();
        assert!(matches!(
            repo.add_members(Flavor::Exact, "ghost", vec!["a".to_string()]),
            Err(RepoError::NotFound)
        ));
        assert!(matches!(
            repo.remove_member(Flavor::Exact, "ghost", "a"),
            Err(RepoError::NotFound)
        ));
    }

    #[test]
    fn delete_role_decrements_once_and_clears_index() {
        let (_dir, repo) = test_repo();
        repo.upsert_role(Flavor::Regex, role("r1", &["alice"]))
            .expect("upsert");
        assert_eq!(repo.count_roles(Flavor::Regex).expect("count"), 1);
        assert!(repo.delete_role(Flavor::Regex, "r1").expect("delete"));
        assert!(!repo.delete_role(Flavor::Regex, "r1").expect("redelete"));
        assert_eq!(repo.count_roles(Flavor::Regex).expect("count"), 0);
        assert!(
            repo.list_roles(Flavor::Regex, "", 0, -1)
                .expect("list")
                .is_empty()
        );
    }
}
