//! Hypothesis lens: claims scored against collected evidence.

use crate::derive::progress::round_to;
use crate::model::status::lens_status;
use crate::schema::ArtifactKind;
use serde::{Deserialize, Serialize};

/// Support at or above this ratio reads as `supported`.
pub const SUPPORTED_THRESHOLD: f64 = 0.7;
/// Support at or below this ratio reads as `refuted`.
pub const REFUTED_THRESHOLD: f64 = 0.3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hypothesis;

impl ArtifactKind for Hypothesis {
    const DOMAIN: &'static str = "hypothesis";
    const TYPE_NAME: &'static str = "Hypothesis";
    type Data = HypothesisData;
    type Status = HypothesisStatus;
}

lens_status! {
    pub enum HypothesisStatus {
        Proposed => "proposed",
        Testing => "testing",
        Supported => "supported",
        Refuted => "refuted",
        Inconclusive => "inconclusive",
    }
    progression: [Proposed, Testing]
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct HypothesisData {
    pub statement: String,
    pub domain: String,
    /// Prior confidence in `[0, 1]`.
    #[serde(deserialize_with = "crate::schema::lenient::number")]
    pub confidence: f64,
    #[serde(deserialize_with = "crate::schema::lenient::count_u32")]
    pub evidence_for: u32,
    #[serde(deserialize_with = "crate::schema::lenient::count_u32")]
    pub evidence_against: u32,
}

impl HypothesisData {
    /// Widened so counters at `u32::MAX` cannot overflow.
    fn evidence_total(&self) -> u64 {
        u64::from(self.evidence_for) + u64::from(self.evidence_against)
    }

    /// Share of evidence in favour, two decimals; `0.0` without evidence.
    pub fn support(&self) -> f64 {
        let total = self.evidence_total();
        if total == 0 {
            return 0.0;
        }
        round_to(f64::from(self.evidence_for) / total as f64, 2)
    }

    pub fn verdict(&self) -> HypothesisStatus {
        let support = self.support();
        if self.evidence_total() == 0 {
            HypothesisStatus::Inconclusive
        } else if support >= SUPPORTED_THRESHOLD {
            HypothesisStatus::Supported
        } else if support <= REFUTED_THRESHOLD {
            HypothesisStatus::Refuted
        } else {
            HypothesisStatus::Inconclusive
        }
    }
}
