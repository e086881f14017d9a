// Key schema. All keys are ASCII strings built by concatenation, with every
// component terminated by '/' so any prefix ends on a component boundary.
//
//   policy document : "<flavor>/po/i/<id>/"
//   policy index    : "<flavor>/po/s/<subject>/r/<resource>/a/<action>/i/<id>/"
//   role document   : "<flavor>/ro/i/<id>/"
//   role index      : "<flavor>/ro/m/<member>/i/<id>/"
//
// The empty string in a subject/resource/action/member position is the
// wildcard. This layout is the on-disk contract; changing it breaks
// existing stores.
use sketo_match::Flavor;

pub(crate) fn doc_suffix(id: &str) -> String {
    format!("i/{id}/")
}

pub(crate) fn policy_base(flavor: Flavor) -> String {
    format!("{flavor}/po/")
}

pub(crate) fn policy_doc_key(flavor: Flavor, id: &str) -> Vec<u8> {
    format!("{}{}", policy_base(flavor), doc_suffix(id)).into_bytes()
}

/// Prefix holding every policy document of a flavor.
pub(crate) fn policy_doc_prefix(flavor: Flavor) -> String {
    format!("{flavor}/po/i/")
}

/// Prefix holding every policy index entry of a flavor.
pub(crate) fn policy_index_prefix(flavor: Flavor) -> String {
    format!("{flavor}/po/s/")
}

/// Index filter for an authorization probe or a filtered listing. Empty
/// fields select the wildcard position.
pub(crate) fn policy_filter(subject: &str, resource: &str, action: &str) -> String {
    format!("s/{subject}/r/{resource}/a/{action}/")
}

pub(crate) fn policy_index_suffix(subject: &str, resource: &str, action: &str, id: &str) -> String {
    format!("s/{subject}/r/{resource}/a/{action}/i/{id}/")
}

/// The full wildcard-expanded index set for one policy: every combination of
/// each field as its literal value or the wildcard. The all-wildcard entry
/// is always present, so "list everything" scans work on empty stores too.
pub(crate) fn policy_index_suffixes(
    subjects: &[String],
    resources: &[String],
    actions: &[String],
    id: &str,
) -> Vec<String> {
    let mut suffixes = Vec::with_capacity(
        (subjects.len() + 1) * (resources.len() + 1) * (actions.len() + 1),
    );
    for subject in subjects {
        for resource in resources {
            for action in actions {
                suffixes.push(policy_index_suffix(subject, resource, action, id));
            }
            suffixes.push(policy_index_suffix(subject, resource, "", id));
        }
        for action in actions {
            suffixes.push(policy_index_suffix(subject, "", action, id));
        }
        suffixes.push(policy_index_suffix(subject, "", "", id));
    }
    for resource in resources {
        for action in actions {
            suffixes.push(policy_index_suffix("", resource, action, id));
        }
        suffixes.push(policy_index_suffix("", resource, "", id));
    }
    for action in actions {
        suffixes.push(policy_index_suffix("", "", action, id));
    }
    suffixes.push(policy_index_suffix("", "", "", id));
    suffixes
}

pub(crate) fn role_base(flavor: Flavor) -> String {
    format!("{flavor}/ro/")
}

pub(crate) fn role_doc_key(flavor: Flavor, id: &str) -> Vec<u8> {
    format!("{}{}", role_base(flavor), doc_suffix(id)).into_bytes()
}

/// Prefix holding every role document of a flavor.
pub(crate) fn role_doc_prefix(flavor: Flavor) -> String {
    format!("{flavor}/ro/i/")
}

pub(crate) fn role_filter(member: &str) -> String {
    format!("m/{member}/")
}

pub(crate) fn role_index_suffix(member: &str, id: &str) -> String {
    format!("m/{member}/i/{id}/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_end_on_component_boundaries() {
        assert_eq!(policy_doc_key(Flavor::Exact, "p1"), b"exact/po/i/p1/".to_vec());
        assert_eq!(
            policy_index_suffix("u1", "r1", "a1", "p1"),
            "s/u1/r/r1/a/a1/i/p1/"
        );
        assert_eq!(role_doc_key(Flavor::Glob, "r1"), b"glob/ro/i/r1/".to_vec());
        assert_eq!(role_index_suffix("m1", "r1"), "m/m1/i/r1/");
    }

    #[test]
    fn index_fan_out_counts_every_wildcard_combination() {
        let subjects = vec!["s1".to_string(), "s2".to_string()];
        let resources = vec!["r1".to_string()];
        let actions = vec!["a1".to_string(), "a2".to_string(), "a3".to_string()];
        let suffixes = policy_index_suffixes(&subjects, &resources, &actions, "id");
        assert_eq!(suffixes.len(), (2 + 1) * (1 + 1) * (3 + 1));
        assert!(suffixes.contains(&"s//r//a//i/id/".to_string()));
        assert!(suffixes.contains(&"s/s2/r/r1/a/a3/i/id/".to_string()));
        assert!(suffixes.contains(&"s/s1/r//a/a2/i/id/".to_string()));
    }

    #[test]
    fn empty_lists_still_emit_the_wildcard_entry() {
        let suffixes = policy_index_suffixes(&[], &[], &[], "id");
        assert_eq!(suffixes, vec!["s//r//a//i/id/".to_string()]);
    }
}
