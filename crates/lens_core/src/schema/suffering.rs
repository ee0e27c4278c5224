//! Suffering lens: tracked concerns ranked by weighted impact.

use crate::model::status::lens_status;
use crate::schema::ArtifactKind;
use serde::{Deserialize, Serialize};

pub const MAX_SEVERITY: u8 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Concern;

impl ArtifactKind for Concern {
    const DOMAIN: &'static str = "suffering";
    const TYPE_NAME: &'static str = "Concern";
    type Data = ConcernData;
    type Status = ConcernStatus;
}

lens_status! {
    pub enum ConcernStatus {
        Identified => "identified",
        Assessing => "assessing",
        Intervening => "intervening",
        Alleviated => "alleviated",
    }
    progression: [Identified, Assessing, Intervening, Alleviated]
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ConcernData {
    pub category: String,
    /// `1..=10`; larger is worse. Out-of-range values are clamped on read.
    #[serde(deserialize_with = "crate::schema::lenient::count_u8")]
    pub severity: u8,
    #[serde(deserialize_with = "crate::schema::lenient::count_u64")]
    pub affected_count: u64,
    pub interventions: Vec<String>,
}

impl ConcernData {
    pub fn clamped_severity(&self) -> u8 {
        self.severity.clamp(1, MAX_SEVERITY)
    }

    /// Severity-weighted reach, discounted by 10% per active intervention
    /// down to a floor of half the raw score.
    pub fn impact_score(&self) -> f64 {
        let raw = f64::from(self.clamped_severity()) * self.affected_count as f64;
        let discount = (self.interventions.len() as f64 * 0.1).min(0.5);
        raw * (1.0 - discount)
    }
}

/// Concerns sorted by descending impact; ties keep their input order.
pub fn rank_by_impact(concerns: &[ConcernData]) -> Vec<&ConcernData> {
    let mut ranked: Vec<&ConcernData> = concerns.iter().collect();
    ranked.sort_by(|a, b| b.impact_score().total_cmp(&a.impact_score()));
    ranked
}

#[cfg(test)]
mod tests {
    use super::{rank_by_impact, ConcernData};

    fn concern(category: &str, severity: u8, affected_count: u64, interventions: usize) -> ConcernData {
        ConcernData {
            category: category.to_string(),
            severity,
            affected_count,
            interventions: vec!["x".to_string(); interventions],
        }
    }

    #[test]
    fn impact_is_discounted_by_interventions() {
        assert_eq!(concern("a", 5, 100, 0).impact_score(), 500.0);
        assert!((concern("a", 5, 100, 2).impact_score() - 400.0).abs() < 1e-9);
        assert_eq!(concern("a", 5, 100, 9).impact_score(), 250.0);
        assert_eq!(concern("a", 0, 10, 0).impact_score(), 10.0);
    }

    #[test]
    fn ranking_is_stable_for_ties() {
        let items = vec![concern("low", 1, 1, 0), concern("tie-a", 2, 5, 0), concern("tie-b", 5, 2, 0)];
        let ranked: Vec<&str> = rank_by_impact(&items).iter().map(|c| c.category.as_str()).collect();
        assert_eq!(ranked, vec!["tie-a", "tie-b", "low"]);
    }
}
