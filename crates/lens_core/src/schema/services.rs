//! Services lens: booked appointments with providers.

use crate::derive::dates::days_until_signed;
use crate::model::status::lens_status;
use crate::schema::ArtifactKind;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Appointment;

impl ArtifactKind for Appointment {
    const DOMAIN: &'static str = "services";
    const TYPE_NAME: &'static str = "Appointment";
    type Data = AppointmentData;
    type Status = AppointmentStatus;
}

lens_status! {
    pub enum AppointmentStatus {
        Booked => "booked",
        Confirmed => "confirmed",
        Completed => "completed",
        Cancelled => "cancelled",
        NoShow => "no_show",
    }
    progression: [Booked, Confirmed, Completed]
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AppointmentData {
    pub provider: String,
    pub service: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    /// Local wall-clock time, `HH:MM`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    #[serde(deserialize_with = "crate::schema::lenient::count_u32")]
    pub duration_minutes: u32,
    #[serde(deserialize_with = "crate::schema::lenient::number")]
    pub price: f64,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub notes: String,
}

impl AppointmentData {
    /// True when the appointment date is today or later.
    pub fn is_upcoming(&self, today: NaiveDate) -> bool {
        self.date
            .as_deref()
            .and_then(|date| days_until_signed(date, today))
            .is_some_and(|days| days >= 0)
    }
}
