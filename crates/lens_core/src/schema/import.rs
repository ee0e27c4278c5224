//! Import lens: ingest jobs and their record counters.

use crate::derive::progress::percent;
use crate::model::status::lens_status;
use crate::schema::ArtifactKind;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportJob;

impl ArtifactKind for ImportJob {
    const DOMAIN: &'static str = "import";
    const TYPE_NAME: &'static str = "ImportJob";
    type Data = ImportJobData;
    type Status = ImportStatus;
}

lens_status! {
    pub enum ImportStatus {
        Queued => "queued",
        Running => "running",
        Completed => "completed",
        Failed => "failed",
    }
    progression: [Queued, Running, Completed]
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ImportJobData {
    pub source: String,
    /// `csv`, `json`, `ics`, ...
    pub format: String,
    #[serde(deserialize_with = "crate::schema::lenient::count_u64")]
    pub records_total: u64,
    #[serde(deserialize_with = "crate::schema::lenient::count_u64")]
    pub records_imported: u64,
    pub errors: Vec<String>,
}

impl ImportJobData {
    pub fn percent_complete(&self) -> f64 {
        percent(self.records_imported as f64, self.records_total as f64)
    }
}
