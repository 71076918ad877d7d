//! Payload types for the portal REST API.
//!
//! Field names and shapes follow the backend's OpenAPI model; date-times
//! are RFC 3339 strings on the wire.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::http::Params;

// ---------------------------------------------------------------------------
// Appointments
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Scheduled,
    Pending,
    Confirmed,
    Cancelled,
    Completed,
    CheckedIn,
}

impl AppointmentStatus {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Scheduled => "scheduled",
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Cancelled => "cancelled",
            Self::Completed => "completed",
            Self::CheckedIn => "checked_in",
        }
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppointmentCreate {
    pub patient_id: String,
    pub clinician_id: String,
    pub scheduled_at: DateTime<Utc>,
    pub reason: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_minutes: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: String,
    pub patient_id: String,
    pub clinician_id: String,
    pub scheduled_at: DateTime<Utc>,
    pub reason: String,
    pub duration_minutes: u32,
    pub status: AppointmentStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patient_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clinician_name: Option<String>,
}

/// Filter for listing appointments.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AppointmentFilter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patient_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clinician_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<AppointmentStatus>,
}

impl AppointmentFilter {
    pub(crate) fn params(&self) -> Params {
        Params::new()
            .with("patient_id", self.patient_id.as_deref())
            .with("clinician_id", self.clinician_id.as_deref())
            .with("status", self.status.map(|s| s.as_str()))
    }
}

// ---------------------------------------------------------------------------
// Clinicians
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClinicianAddress {
    pub city: String,
    pub state: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Clinician {
    pub id: String,
    pub full_name: String,
    pub specialty: String,
    pub rating: f32,
    pub years_experience: u32,
    pub consultation_fee: f64,
    pub accepting_new_patients: bool,
    pub address: ClinicianAddress,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Slot {
    pub time: DateTime<Utc>,
    pub available: bool,
    pub duration_minutes: u32,
}

/// Filter for the clinician search.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ClinicianSearch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub specialty: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accepting_new: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_rating: Option<f32>,
}

impl ClinicianSearch {
    pub(crate) fn params(&self) -> Params {
        Params::new()
            .with("specialty", self.specialty.as_deref())
            .with("city", self.city.as_deref())
            .with("accepting_new", self.accepting_new)
            .with("min_rating", self.min_rating)
    }
}

/// Window for the availability lookup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AvailabilityWindow {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub days_ahead: Option<u32>,
}

impl AvailabilityWindow {
    pub(crate) fn params(&self) -> Params {
        Params::new()
            .with("start_date", self.start_date)
            .with("days_ahead", self.days_ahead)
    }
}

// ---------------------------------------------------------------------------
// Chat
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub patient_id: String,
    pub message: String,
    pub session_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatResponse {
    pub session_id: String,
    pub reply: String,
    pub total_messages: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatHistoryMessage {
    pub role: ChatRole,
    pub content: String,
}

// ---------------------------------------------------------------------------
// Triage
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriageSessionCreate {
    pub appointment_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chief_complaint: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriageSession {
    pub id: String,
    pub appointment_id: String,
    pub status: String,
    #[serde(default)]
    pub patient_context: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriageQuestion {
    pub id: String,
    pub text: String,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriageAnswers {
    pub answers: BTreeMap<String, String>,
}

/// Acknowledgement body for answer submission.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitAck {
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientInfo {
    pub full_name: String,
    pub age: u32,
    pub gender: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriageData {
    pub id: String,
    pub urgency_score: f32,
    pub red_flags: Vec<String>,
    pub notes: String,
    pub summary: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriageView {
    pub patient_info: PatientInfo,
    pub triage: TriageData,
    pub chat_history: Vec<ChatHistoryMessage>,
}
