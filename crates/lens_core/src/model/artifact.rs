//! Artifact envelope model.
//!
//! # Responsibility
//! - Define the one universal record every lens reads and writes.
//! - Provide the partial-merge rules used by `update`.
//!
//! # Invariants
//! - `id` is assigned by the backing store and never changes afterwards.
//! - `artifact_type` is fixed at creation; patches cannot change it.
//! - A patch only touches the fields it names. `data` merges key by key.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Open, domain-specific field bag carried by every artifact.
pub type DataMap = serde_json::Map<String, Value>;

/// Opaque identifier assigned by the backing store.
///
/// Remote stores may hand out numeric ids; those are normalized to their
/// decimal string form so equality stays string-based everywhere.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ArtifactId(String);

impl ArtifactId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Generates a fresh UUID v4 id. Used by stores that assign ids locally.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for ArtifactId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ArtifactId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for ArtifactId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl<'de> Deserialize<'de> for ArtifactId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Text(String),
            Number(serde_json::Number),
        }

        match RawId::deserialize(deserializer)? {
            RawId::Text(text) => Ok(Self(text)),
            RawId::Number(number) => Ok(Self(number.to_string())),
        }
    }
}

/// Envelope metadata: status badge plus free-form labels.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArtifactMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(
        default,
        deserialize_with = "null_as_empty_tags",
        skip_serializing_if = "BTreeSet::is_empty"
    )]
    pub tags: BTreeSet<String>,
    /// Meta keys this client does not interpret, kept for round-trips.
    #[serde(flatten)]
    pub extra: DataMap,
}

fn null_as_empty_tags<'de, D>(deserializer: D) -> Result<BTreeSet<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<BTreeSet<String>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Canonical persisted record shared by every lens page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    pub id: ArtifactId,
    pub title: String,
    /// Serialized as `type` to match the lens-data wire schema.
    #[serde(rename = "type")]
    pub artifact_type: String,
    #[serde(default)]
    pub data: DataMap,
    #[serde(default)]
    pub meta: ArtifactMeta,
    #[serde(default)]
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Artifact {
    /// Materializes a draft into a stored record with store-assigned identity.
    pub fn from_draft(id: ArtifactId, artifact_type: impl Into<String>, draft: ArtifactDraft) -> Self {
        Self {
            id,
            title: draft.title,
            artifact_type: artifact_type.into(),
            data: draft.data,
            meta: draft.meta,
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    pub fn status(&self) -> Option<&str> {
        self.meta.status.as_deref()
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.meta.tags.contains(tag)
    }

    /// Returns a string data field, `None` when absent or not a string.
    pub fn data_str(&self, field: &str) -> Option<&str> {
        self.data.get(field).and_then(Value::as_str)
    }

    /// Returns a numeric data field, `None` when absent or not a number.
    pub fn data_f64(&self, field: &str) -> Option<f64> {
        self.data.get(field).and_then(Value::as_f64)
    }

    /// Absent or non-boolean fields read as `false`.
    pub fn data_bool(&self, field: &str) -> bool {
        self.data
            .get(field)
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    /// Merges a partial update into this record.
    ///
    /// # Invariants
    /// - `id`, `artifact_type` and `created_at` are never touched.
    /// - `data` keys named by the patch are overwritten; other keys survive.
    /// - `meta.status`/`meta.tags` are replaced only when the patch sets them.
    pub fn apply_patch(&mut self, patch: &ArtifactPatch) {
        if let Some(title) = &patch.title {
            self.title = title.clone();
        }
        if let Some(data) = &patch.data {
            for (key, value) in data {
                self.data.insert(key.clone(), value.clone());
            }
        }
        if let Some(meta) = &patch.meta {
            if let Some(status) = &meta.status {
                self.meta.status = Some(status.clone());
            }
            if let Some(tags) = &meta.tags {
                self.meta.tags = tags.clone();
            }
        }
        self.updated_at = Some(Utc::now());
    }

    /// Validates invariants every stored artifact must satisfy.
    pub fn validate(&self) -> Result<(), ArtifactValidationError> {
        validate_title(&self.title)?;
        if self.artifact_type.trim().is_empty() {
            return Err(ArtifactValidationError::EmptyType);
        }
        Ok(())
    }
}

/// Creation payload: `{title, data, meta}` on the wire.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArtifactDraft {
    pub title: String,
    #[serde(default)]
    pub data: DataMap,
    #[serde(default)]
    pub meta: ArtifactMeta,
}

impl ArtifactDraft {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    pub fn with_data(mut self, data: DataMap) -> Self {
        self.data = data;
        self
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    /// Sets the status, trimmed to its wire form.
    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.meta.status = Some(wire_status(status.into()));
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.meta.tags.insert(tag.into());
        self
    }

    pub fn validate(&self) -> Result<(), ArtifactValidationError> {
        validate_title(&self.title)
    }
}

/// Partial update of an artifact's meta fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetaPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<BTreeSet<String>>,
}

/// Partial update payload; unset fields are left alone by the store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArtifactPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<DataMap>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<MetaPatch>,
}

impl ArtifactPatch {
    pub fn title(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Self::default()
        }
    }

    pub fn status(status: impl Into<String>) -> Self {
        Self {
            meta: Some(MetaPatch {
                status: Some(wire_status(status.into())),
                tags: None,
            }),
            ..Self::default()
        }
    }

    pub fn data(data: DataMap) -> Self {
        Self {
            data: Some(data),
            ..Self::default()
        }
    }

    /// Adds one data field to this patch.
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.data
            .get_or_insert_with(DataMap::new)
            .insert(key.into(), value.into());
        self
    }

    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        let meta = self.meta.get_or_insert_with(MetaPatch::default);
        meta.status = Some(wire_status(status.into()));
        self
    }

    pub fn with_tags(mut self, tags: BTreeSet<String>) -> Self {
        self.meta.get_or_insert_with(MetaPatch::default).tags = Some(tags);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.data.is_none() && self.meta.is_none()
    }

    pub fn validate(&self) -> Result<(), ArtifactValidationError> {
        match &self.title {
            Some(title) => validate_title(title),
            None => Ok(()),
        }
    }
}

/// Invariant violations detected before an artifact leaves the client.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ArtifactValidationError {
    #[error("artifact title must not be blank")]
    EmptyTitle,
    #[error("artifact type must not be blank")]
    EmptyType,
    #[error("status `{status}` is not valid for `{artifact_type}`")]
    UnknownStatus {
        artifact_type: String,
        status: String,
    },
}

fn wire_status(status: String) -> String {
    status.trim().to_string()
}

fn validate_title(title: &str) -> Result<(), ArtifactValidationError> {
    if title.trim().is_empty() {
        return Err(ArtifactValidationError::EmptyTitle);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{Artifact, ArtifactDraft, ArtifactId, ArtifactPatch, ArtifactValidationError};
    use serde_json::json;

    fn sample() -> Artifact {
        let draft = ArtifactDraft::new("Deck permit")
            .with_field("valuation", 12000)
            .with_field("applicant", "R. Osei")
            .with_status("submitted");
        Artifact::from_draft(ArtifactId::new("p-1"), "Permit", draft)
    }

    #[test]
    fn status_patch_leaves_data_untouched() {
        let mut artifact = sample();
        let before = artifact.data.clone();

        artifact.apply_patch(&ArtifactPatch::status("approved"));

        assert_eq!(artifact.status(), Some("approved"));
        assert_eq!(artifact.data, before);
        assert_eq!(artifact.title, "Deck permit");
        assert!(artifact.updated_at.is_some());
    }

    #[test]
    fn data_patch_merges_per_key() {
        let mut artifact = sample();
        artifact.apply_patch(&ArtifactPatch::default().with_field("valuation", 15000));

        assert_eq!(artifact.data_f64("valuation"), Some(15000.0));
        assert_eq!(artifact.data_str("applicant"), Some("R. Osei"));
        assert_eq!(artifact.status(), Some("submitted"));
    }

    #[test]
    fn numeric_ids_decode_as_strings() {
        let artifact: Artifact = serde_json::from_value(json!({
            "id": 42,
            "title": "Dishes",
            "type": "Chore",
            "createdAt": "2026-01-02T03:04:05Z"
        }))
        .unwrap();
        assert_eq!(artifact.id.as_str(), "42");
        assert!(artifact.data.is_empty());
        assert!(artifact.meta.tags.is_empty());
    }

    #[test]
    fn null_tags_decode_as_empty() {
        let artifact: Artifact = serde_json::from_value(json!({
            "id": "a",
            "title": "Dishes",
            "type": "Chore",
            "meta": {"status": "pending", "tags": null, "color": "blue"}
        }))
        .unwrap();
        assert!(artifact.meta.tags.is_empty());
        assert_eq!(artifact.meta.extra.get("color"), Some(&json!("blue")));
    }

    #[test]
    fn status_builders_store_the_trimmed_wire_form() {
        let draft = ArtifactDraft::new("Dishes").with_status(" done ");
        assert_eq!(draft.meta.status.as_deref(), Some("done"));

        let patch = ArtifactPatch::status("\tpaid\n");
        let status = patch.meta.as_ref().and_then(|meta| meta.status.as_deref());
        assert_eq!(status, Some("paid"));

        let mut artifact = sample();
        artifact.apply_patch(&patch.with_status(" approved "));
        assert_eq!(artifact.status(), Some("approved"));
    }

    #[test]
    fn blank_title_is_rejected() {
        assert_eq!(
            ArtifactDraft::new("   ").validate(),
            Err(ArtifactValidationError::EmptyTitle)
        );
        assert!(ArtifactPatch::title("").validate().is_err());
        assert!(ArtifactPatch::status("done").validate().is_ok());
    }

    #[test]
    fn patch_serializes_only_named_fields() {
        let patch = ArtifactPatch::status("completed");
        assert_eq!(
            serde_json::to_value(&patch).unwrap(),
            json!({"meta": {"status": "completed"}})
        );
    }
}
