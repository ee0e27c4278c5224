//! Partition a collection by one field (category, room, department, ...).

use crate::model::artifact::Artifact;
use serde_json::Value;
use std::collections::BTreeMap;

/// Group key used for artifacts where the field is absent or null.
pub const UNGROUPED: &str = "";

/// Groups artifacts by the value of one `data` field.
///
/// Keys are sorted; artifacts keep their input order inside each group.
/// Scalars are keyed by their display form, arrays and objects by their JSON
/// text.
pub fn group_by_field<'a>(
    items: impl IntoIterator<Item = &'a Artifact>,
    field: &str,
) -> BTreeMap<String, Vec<&'a Artifact>> {
    group_by(items, |artifact| group_key(artifact.data.get(field)))
}

/// Groups artifacts by an arbitrary key function.
pub fn group_by<'a, K, F>(
    items: impl IntoIterator<Item = &'a Artifact>,
    mut key: F,
) -> BTreeMap<K, Vec<&'a Artifact>>
where
    K: Ord,
    F: FnMut(&Artifact) -> K,
{
    let mut groups: BTreeMap<K, Vec<&'a Artifact>> = BTreeMap::new();
    for artifact in items {
        groups.entry(key(artifact)).or_default().push(artifact);
    }
    groups
}

fn group_key(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => UNGROUPED.to_string(),
        Some(Value::String(text)) => text.clone(),
        Some(other) => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::{group_by, group_by_field, UNGROUPED};
    use crate::model::artifact::{Artifact, ArtifactDraft, ArtifactId};

    fn chore(id: &str, room: Option<&str>) -> Artifact {
        let mut draft = ArtifactDraft::new(format!("chore {id}"));
        if let Some(room) = room {
            draft = draft.with_field("room", room);
        }
        Artifact::from_draft(ArtifactId::new(id), "Chore", draft)
    }

    #[test]
    fn groups_preserve_insertion_order() {
        let items = vec![
            chore("1", Some("kitchen")),
            chore("2", Some("bath")),
            chore("3", Some("kitchen")),
            chore("4", None),
        ];
        let groups = group_by_field(&items, "room");

        let kitchen: Vec<&str> = groups["kitchen"].iter().map(|a| a.id.as_str()).collect();
        assert_eq!(kitchen, vec!["1", "3"]);
        assert_eq!(groups["bath"].len(), 1);
        assert_eq!(groups[UNGROUPED].len(), 1);
        assert_eq!(groups.len(), 3);
    }

    #[test]
    fn custom_key_groups_by_status() {
        let mut done = chore("1", None);
        done.meta.status = Some("done".to_string());
        let pending = chore("2", None);
        let items = vec![done, pending];

        let groups = group_by(&items, |artifact| artifact.status().unwrap_or("none").to_string());
        assert_eq!(groups["done"].len(), 1);
        assert_eq!(groups["none"].len(), 1);
    }
}
