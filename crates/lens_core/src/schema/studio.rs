//! Studio lens: music projects moving through production stages.

use crate::derive::dates::days_until_clamped;
use crate::model::status::{lens_status, LensStatus};
use crate::schema::ArtifactKind;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StudioProject;

impl ArtifactKind for StudioProject {
    const DOMAIN: &'static str = "studio";
    const TYPE_NAME: &'static str = "StudioProject";
    type Data = StudioProjectData;
    type Status = StudioStatus;
}

lens_status! {
    pub enum StudioStatus {
        Idea => "idea",
        Recording => "recording",
        Mixing => "mixing",
        Mastering => "mastering",
        Released => "released",
    }
    progression: [Idea, Recording, Mixing, Mastering, Released]
}

impl StudioStatus {
    /// Stage-based completion in `[0, 100]`.
    pub fn stage_percent(self) -> f64 {
        let last = Self::PROGRESSION.len().saturating_sub(1);
        match self.step_index() {
            Some(index) if last > 0 => crate::derive::progress::percent(index as f64, last as f64),
            _ => 0.0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StudioProjectData {
    pub genre: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bpm: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    pub tracks: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deadline: Option<String>,
}

impl StudioProjectData {
    pub fn days_left(&self, today: NaiveDate) -> Option<i64> {
        self.deadline
            .as_deref()
            .and_then(|date| days_until_clamped(date, today))
    }
}
