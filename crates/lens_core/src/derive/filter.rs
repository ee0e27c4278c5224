//! Client-side filtering over a cached collection.
//!
//! # Invariants
//! - Filtering never reorders: matches keep their collection order.
//! - An empty filter matches everything.
//! - Search is case-insensitive and every whitespace-separated token must
//!   appear in the title or in some string data value.

use crate::model::artifact::Artifact;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid ws regex"));

/// Filter options applied by list views.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArtifactFilter {
    pub status: Option<String>,
    pub tag: Option<String>,
    pub search: Option<String>,
    /// `(field, expected)` pairs compared against `data` values.
    pub field_equals: Vec<(String, Value)>,
}

impl ArtifactFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    pub fn search(mut self, query: impl Into<String>) -> Self {
        self.search = Some(query.into());
        self
    }

    pub fn field(mut self, field: impl Into<String>, expected: impl Into<Value>) -> Self {
        self.field_equals.push((field.into(), expected.into()));
        self
    }

    pub fn matches(&self, artifact: &Artifact) -> bool {
        if let Some(status) = &self.status {
            if artifact.status() != Some(status.as_str()) {
                return false;
            }
        }
        if let Some(tag) = &self.tag {
            if !artifact.has_tag(tag) {
                return false;
            }
        }
        for (field, expected) in &self.field_equals {
            if artifact.data.get(field) != Some(expected) {
                return false;
            }
        }
        match self.search.as_deref() {
            Some(query) => matches_search(artifact, query),
            None => true,
        }
    }

    /// Returns matching artifacts in collection order.
    pub fn apply<'a>(&self, items: impl IntoIterator<Item = &'a Artifact>) -> Vec<&'a Artifact> {
        items
            .into_iter()
            .filter(|artifact| self.matches(artifact))
            .collect()
    }
}

fn matches_search(artifact: &Artifact, query: &str) -> bool {
    let tokens: Vec<String> = WHITESPACE_RE
        .split(query.trim())
        .filter(|token| !token.is_empty())
        .map(str::to_lowercase)
        .collect();
    if tokens.is_empty() {
        return true;
    }

    let mut haystack = artifact.title.to_lowercase();
    for value in artifact.data.values() {
        collect_text(value, &mut haystack);
    }

    tokens.iter().all(|token| haystack.contains(token.as_str()))
}

fn collect_text(value: &Value, haystack: &mut String) {
    match value {
        Value::String(text) => {
            haystack.push('\n');
            haystack.push_str(&text.to_lowercase());
        }
        Value::Array(values) => {
            for value in values {
                collect_text(value, haystack);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::ArtifactFilter;
    use crate::model::artifact::{Artifact, ArtifactDraft, ArtifactId};
    use serde_json::json;

    fn items() -> Vec<Artifact> {
        vec![
            Artifact::from_draft(
                ArtifactId::new("1"),
                "Permit",
                ArtifactDraft::new("Garage extension")
                    .with_field("address", "12 Elm Street")
                    .with_field("permitType", "building")
                    .with_status("submitted")
                    .with_tag("priority"),
            ),
            Artifact::from_draft(
                ArtifactId::new("2"),
                "Permit",
                ArtifactDraft::new("Panel upgrade")
                    .with_field("address", "4 Oak Avenue")
                    .with_field("permitType", "electrical")
                    .with_status("approved"),
            ),
        ]
    }

    #[test]
    fn empty_filter_matches_all_in_order() {
        let items = items();
        let ids: Vec<&str> = ArtifactFilter::new()
            .apply(&items)
            .iter()
            .map(|a| a.id.as_str())
            .collect();
        assert_eq!(ids, vec!["1", "2"]);
    }

    #[test]
    fn search_requires_every_token() {
        let items = items();
        assert_eq!(ArtifactFilter::new().search("  ELM   garage ").apply(&items).len(), 1);
        assert_eq!(ArtifactFilter::new().search("elm panel").apply(&items).len(), 0);
    }

    #[test]
    fn status_tag_and_field_filters_combine() {
        let items = items();
        assert_eq!(ArtifactFilter::new().status("approved").apply(&items).len(), 1);
        assert_eq!(ArtifactFilter::new().tag("priority").apply(&items).len(), 1);
        let electrical = ArtifactFilter::new()
            .field("permitType", json!("electrical"))
            .status("submitted");
        assert!(electrical.apply(&items).is_empty());
    }
}
