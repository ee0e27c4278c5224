//! Government lens: permits and code violations.

use crate::derive::dates::days_until_signed;
use crate::derive::progress::round_to;
use crate::model::status::lens_status;
use crate::schema::ArtifactKind;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

const VALUATION_FEE_RATE: f64 = 0.005;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Permit;

impl ArtifactKind for Permit {
    const DOMAIN: &'static str = "government";
    const TYPE_NAME: &'static str = "Permit";
    type Data = PermitData;
    type Status = PermitStatus;
}

lens_status! {
    pub enum PermitStatus {
        Submitted => "submitted",
        UnderReview => "under_review",
        Inspection => "inspection",
        Approved => "approved",
        Denied => "denied",
        Expired => "expired",
        Revoked => "revoked",
    }
    progression: [Submitted, UnderReview, Inspection, Approved]
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PermitData {
    pub permit_type: String,
    pub applicant: String,
    pub address: String,
    #[serde(deserialize_with = "crate::schema::lenient::number")]
    pub valuation: f64,
    #[serde(deserialize_with = "crate::schema::lenient::number")]
    pub fee: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub submitted_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_date: Option<String>,
}

impl PermitData {
    /// Flat base fee per permit type.
    pub fn base_fee(&self) -> f64 {
        match self.permit_type.trim().to_ascii_lowercase().as_str() {
            "building" => 250.0,
            "electrical" => 120.0,
            "plumbing" => 100.0,
            _ => 75.0,
        }
    }

    /// Base fee plus a valuation surcharge, rounded to cents.
    pub fn calculate_fee(&self) -> f64 {
        let surcharge = self.valuation.max(0.0) * VALUATION_FEE_RATE;
        round_to(self.base_fee() + surcharge, 2)
    }

    /// Days until expiry; negative once expired.
    pub fn days_until_expiry(&self, today: NaiveDate) -> Option<i64> {
        self.expires_date
            .as_deref()
            .and_then(|date| days_until_signed(date, today))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Violation;

impl ArtifactKind for Violation {
    const DOMAIN: &'static str = "government";
    const TYPE_NAME: &'static str = "Violation";
    type Data = ViolationData;
    type Status = ViolationStatus;
}

lens_status! {
    pub enum ViolationStatus {
        Reported => "reported",
        Investigating => "investigating",
        NoticeIssued => "notice_issued",
        Escalated => "escalated",
        Resolved => "resolved",
        Dismissed => "dismissed",
    }
    progression: [Reported, Investigating, NoticeIssued, Resolved]
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ViolationData {
    pub code: String,
    pub address: String,
    pub severity: String,
    #[serde(deserialize_with = "crate::schema::lenient::number")]
    pub fine: f64,
    #[serde(deserialize_with = "crate::schema::lenient::count_u32")]
    pub escalation_level: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
}

impl ViolationData {
    /// Days until the compliance deadline; negative when overdue.
    pub fn days_to_comply(&self, today: NaiveDate) -> Option<i64> {
        self.due_date
            .as_deref()
            .and_then(|date| days_until_signed(date, today))
    }
}

#[cfg(test)]
mod tests {
    use super::{PermitData, ViolationData};
    use chrono::NaiveDate;

    #[test]
    fn fee_combines_base_and_valuation() {
        let permit = PermitData {
            permit_type: "Building".to_string(),
            valuation: 40_000.0,
            ..PermitData::default()
        };
        assert_eq!(permit.calculate_fee(), 450.0);

        let other = PermitData {
            permit_type: "signage".to_string(),
            valuation: 2_000.0,
            ..PermitData::default()
        };
        assert_eq!(other.calculate_fee(), 85.0);
    }

    #[test]
    fn overdue_violation_counts_negative_days() {
        let today = NaiveDate::from_ymd_opt(2026, 2, 10).unwrap();
        let violation = ViolationData {
            due_date: Some("2026-02-07".to_string()),
            ..ViolationData::default()
        };
        assert_eq!(violation.days_to_comply(today), Some(-3));
    }
}
