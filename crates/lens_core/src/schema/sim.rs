//! Sim lens: parameterised simulation scenarios.

use crate::model::status::lens_status;
use crate::schema::ArtifactKind;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Scenario;

impl ArtifactKind for Scenario {
    const DOMAIN: &'static str = "sim";
    const TYPE_NAME: &'static str = "Scenario";
    type Data = ScenarioData;
    type Status = ScenarioStatus;
}

lens_status! {
    pub enum ScenarioStatus {
        Draft => "draft",
        Running => "running",
        Complete => "complete",
        Failed => "failed",
    }
    progression: [Draft, Running, Complete]
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ScenarioData {
    pub model: String,
    #[serde(deserialize_with = "crate::schema::lenient::count_u32")]
    pub iterations: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    pub parameters: BTreeMap<String, f64>,
}
