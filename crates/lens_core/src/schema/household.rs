//! Household lens: chores (points per room) and bills.

use crate::derive::dates::is_overdue;
use crate::model::status::lens_status;
use crate::schema::ArtifactKind;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chore;

impl ArtifactKind for Chore {
    const DOMAIN: &'static str = "household";
    const TYPE_NAME: &'static str = "Chore";
    type Data = ChoreData;
    type Status = ChoreStatus;
}

lens_status! {
    pub enum ChoreStatus {
        Pending => "pending",
        InProgress => "in_progress",
        Done => "done",
        Skipped => "skipped",
    }
    progression: [Pending, InProgress, Done]
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ChoreData {
    pub room: String,
    pub assignee: String,
    #[serde(deserialize_with = "crate::schema::lenient::number")]
    pub points: f64,
    /// `daily`, `weekly`, `monthly` or free text.
    pub frequency: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bill;

impl ArtifactKind for Bill {
    const DOMAIN: &'static str = "household";
    const TYPE_NAME: &'static str = "Bill";
    type Data = BillData;
    type Status = BillStatus;
}

lens_status! {
    pub enum BillStatus {
        Upcoming => "upcoming",
        Due => "due",
        Paid => "paid",
        Overdue => "overdue",
    }
    progression: [Upcoming, Due, Paid]
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BillData {
    pub payee: String,
    #[serde(deserialize_with = "crate::schema::lenient::number")]
    pub amount: f64,
    pub category: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
    pub autopay: bool,
}

impl BillData {
    /// Past its due date and not on autopay.
    pub fn needs_attention(&self, today: NaiveDate) -> bool {
        !self.autopay
            && self
                .due_date
                .as_deref()
                .is_some_and(|date| is_overdue(date, today))
    }
}
