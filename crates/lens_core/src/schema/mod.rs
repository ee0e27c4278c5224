//! Typed lens schemas over the generic artifact envelope.
//!
//! # Responsibility
//! - Bind each `(domain, type)` pair to a strongly-typed `data` struct and a
//!   closed status enumeration.
//! - Decode envelopes into typed views without the generic store knowing
//!   about any field.
//!
//! # Invariants
//! - Every data struct decodes from an empty map (absent fields default).
//! - Numeric fields read numeric strings; unreadable numbers decode as zero.
//! - Reads reject other invalid stored state (non-object `data`, wrong
//!   structural types, unknown status) instead of masking it.

use crate::backend::CollectionKey;
use crate::model::artifact::{Artifact, ArtifactValidationError, DataMap};
use crate::model::status::{LensStatus, StatusSet};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::fmt::Debug;

pub mod goals;
pub mod government;
pub mod household;
pub mod hypothesis;
pub mod import;
mod lenient;
pub mod services;
pub mod sim;
pub mod studio;
pub mod suffering;

/// One artifact type owned by one lens.
pub trait ArtifactKind: Send + Sync + 'static {
    /// Lens namespace, first path segment of the collection URL.
    const DOMAIN: &'static str;
    /// Wire value of `Artifact::artifact_type`.
    const TYPE_NAME: &'static str;

    type Data: Serialize + DeserializeOwned + Default + Clone + Debug + PartialEq + Send + Sync;
    type Status: LensStatus;

    fn key() -> CollectionKey {
        CollectionKey::new(Self::DOMAIN, Self::TYPE_NAME)
    }

    fn statuses() -> StatusSet {
        StatusSet::of::<Self::Status>()
    }
}

/// Decoding failures for typed views.
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("expected artifact type `{expected}`, got `{actual}`")]
    TypeMismatch { expected: String, actual: String },
    #[error("invalid `{artifact_type}` data: {source}")]
    InvalidData {
        artifact_type: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("data for `{0}` did not serialize to an object")]
    NotAnObject(String),
    #[error("status `{status}` is not valid for `{artifact_type}`")]
    UnknownStatus {
        artifact_type: String,
        status: String,
    },
}

/// Typed projection of one artifact.
#[derive(Debug, Clone, PartialEq)]
pub struct TypedArtifact<K: ArtifactKind> {
    pub artifact: Artifact,
    pub data: K::Data,
    pub status: Option<K::Status>,
}

impl<K: ArtifactKind> TypedArtifact<K> {
    pub fn decode(artifact: Artifact) -> Result<Self, SchemaError> {
        if artifact.artifact_type != K::TYPE_NAME {
            return Err(SchemaError::TypeMismatch {
                expected: K::TYPE_NAME.to_string(),
                actual: artifact.artifact_type,
            });
        }
        let data = decode_data::<K>(&artifact.data)?;
        let status = match artifact.status() {
            Some(value) => Some(parse_status::<K>(value)?),
            None => None,
        };
        Ok(Self {
            artifact,
            data,
            status,
        })
    }

    /// Position of the current status on the kind's stepper.
    pub fn step_index(&self) -> Option<usize> {
        self.status.and_then(LensStatus::step_index)
    }
}

pub fn decode_data<K: ArtifactKind>(data: &DataMap) -> Result<K::Data, SchemaError> {
    serde_json::from_value(Value::Object(data.clone())).map_err(|source| {
        SchemaError::InvalidData {
            artifact_type: K::TYPE_NAME.to_string(),
            source,
        }
    })
}

pub fn encode_data<K: ArtifactKind>(data: &K::Data) -> Result<DataMap, SchemaError> {
    let value = serde_json::to_value(data).map_err(|source| SchemaError::InvalidData {
        artifact_type: K::TYPE_NAME.to_string(),
        source,
    })?;
    match value {
        Value::Object(map) => Ok(map),
        _ => Err(SchemaError::NotAnObject(K::TYPE_NAME.to_string())),
    }
}

pub fn parse_status<K: ArtifactKind>(value: &str) -> Result<K::Status, SchemaError> {
    K::Status::parse(value).ok_or_else(|| SchemaError::UnknownStatus {
        artifact_type: K::TYPE_NAME.to_string(),
        status: value.to_string(),
    })
}

/// Catalog entry describing one known kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KindInfo {
    pub domain: &'static str,
    pub type_name: &'static str,
    pub statuses: StatusSet,
}

impl KindInfo {
    fn of<K: ArtifactKind>() -> Self {
        Self {
            domain: K::DOMAIN,
            type_name: K::TYPE_NAME,
            statuses: K::statuses(),
        }
    }

    pub fn key(&self) -> CollectionKey {
        CollectionKey::new(self.domain, self.type_name)
    }
}

/// Every artifact kind known to this crate, grouped by lens.
pub fn catalog() -> Vec<KindInfo> {
    vec![
        KindInfo::of::<goals::Goal>(),
        KindInfo::of::<government::Permit>(),
        KindInfo::of::<government::Violation>(),
        KindInfo::of::<household::Chore>(),
        KindInfo::of::<household::Bill>(),
        KindInfo::of::<hypothesis::Hypothesis>(),
        KindInfo::of::<import::ImportJob>(),
        KindInfo::of::<services::Appointment>(),
        KindInfo::of::<sim::Scenario>(),
        KindInfo::of::<studio::StudioProject>(),
        KindInfo::of::<suffering::Concern>(),
    ]
}

/// Looks up one kind by domain and type name.
pub fn find_kind(domain: &str, type_name: &str) -> Option<KindInfo> {
    catalog()
        .into_iter()
        .find(|info| info.domain == domain && info.type_name == type_name)
}

/// Rejects a status outside the closed set of a known kind.
///
/// Unknown kinds accept any status; their lens owns the vocabulary.
pub fn validate_status(
    key: &CollectionKey,
    status: Option<&str>,
) -> Result<(), ArtifactValidationError> {
    let (Some(status), Some(kind)) = (status, find_kind(key.domain(), key.artifact_type())) else {
        return Ok(());
    };
    if kind.statuses.contains(status) {
        Ok(())
    } else {
        Err(ArtifactValidationError::UnknownStatus {
            artifact_type: kind.type_name.to_string(),
            status: status.to_string(),
        })
    }
}

/// Tagged union over every typed data shape, keyed by artifact type.
#[derive(Debug, Clone, PartialEq)]
pub enum LensData {
    Goal(goals::GoalData),
    Permit(government::PermitData),
    Violation(government::ViolationData),
    Chore(household::ChoreData),
    Bill(household::BillData),
    Hypothesis(hypothesis::HypothesisData),
    ImportJob(import::ImportJobData),
    Appointment(services::AppointmentData),
    Scenario(sim::ScenarioData),
    StudioProject(studio::StudioProjectData),
    Concern(suffering::ConcernData),
    /// Types this crate has no schema for; the raw map is kept as-is.
    Untyped(DataMap),
}

impl LensData {
    /// Decodes `artifact.data` according to `artifact.artifact_type`.
    pub fn decode(artifact: &Artifact) -> Result<Self, SchemaError> {
        let data = &artifact.data;
        let decoded = match artifact.artifact_type.as_str() {
            goals::Goal::TYPE_NAME => Self::Goal(decode_data::<goals::Goal>(data)?),
            government::Permit::TYPE_NAME => {
                Self::Permit(decode_data::<government::Permit>(data)?)
            }
            government::Violation::TYPE_NAME => {
                Self::Violation(decode_data::<government::Violation>(data)?)
            }
            household::Chore::TYPE_NAME => Self::Chore(decode_data::<household::Chore>(data)?),
            household::Bill::TYPE_NAME => Self::Bill(decode_data::<household::Bill>(data)?),
            hypothesis::Hypothesis::TYPE_NAME => {
                Self::Hypothesis(decode_data::<hypothesis::Hypothesis>(data)?)
            }
            import::ImportJob::TYPE_NAME => {
                Self::ImportJob(decode_data::<import::ImportJob>(data)?)
            }
            services::Appointment::TYPE_NAME => {
                Self::Appointment(decode_data::<services::Appointment>(data)?)
            }
            sim::Scenario::TYPE_NAME => Self::Scenario(decode_data::<sim::Scenario>(data)?),
            studio::StudioProject::TYPE_NAME => {
                Self::StudioProject(decode_data::<studio::StudioProject>(data)?)
            }
            suffering::Concern::TYPE_NAME => {
                Self::Concern(decode_data::<suffering::Concern>(data)?)
            }
            _ => Self::Untyped(data.clone()),
        };
        Ok(decoded)
    }
}
