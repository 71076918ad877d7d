//! Appointment booking and scheduling.

use std::sync::Arc;

use serde::Serialize;

use crate::error::ApiError;
use crate::http::{HttpClient, Params};
use crate::notify::NotificationHub;
use crate::query::{Mutation, Query, QueryClient, QueryKey};

use super::types::{Appointment, AppointmentCreate, AppointmentFilter, AppointmentStatus};

/// Success wording for an appointment status change.
pub fn status_update_message(status: AppointmentStatus) -> &'static str {
    match status {
        AppointmentStatus::Confirmed => "Appointment confirmed!",
        AppointmentStatus::Cancelled => "Appointment cancelled",
        AppointmentStatus::Completed => "Appointment marked as completed",
        AppointmentStatus::CheckedIn => "Patient checked in",
        AppointmentStatus::Scheduled => "Appointment scheduled",
        AppointmentStatus::Pending => "Appointment pending",
    }
}

/// Input for a status change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusChange {
    pub id: String,
    pub status: AppointmentStatus,
}

#[derive(Serialize)]
struct StatusBody {
    status: AppointmentStatus,
}

/// Appointments endpoint service.
///
/// Writes invalidate every appointment-derived key prefix so patient and
/// clinician views refetch together.
#[derive(Debug, Clone)]
pub struct Appointments {
    http: HttpClient,
    queries: Arc<QueryClient>,
    notifications: NotificationHub,
}

impl Appointments {
    pub(crate) fn new(
        http: HttpClient,
        queries: Arc<QueryClient>,
        notifications: NotificationHub,
    ) -> Self {
        Self {
            http,
            queries,
            notifications,
        }
    }

    /// Books an appointment.
    pub async fn create(&self, input: AppointmentCreate) -> Result<Appointment, ApiError> {
        self.create_mutation().run(input).await
    }

    /// The booking mutation: `POST /appointments/`.
    pub fn create_mutation(&self) -> Mutation<AppointmentCreate, Appointment> {
        let http = self.http.clone();
        Mutation::new(
            self.queries.clone(),
            self.notifications.clone(),
            move |input: AppointmentCreate| {
                let http = http.clone();
                Box::pin(async move { http.post("/appointments/", &input).await })
            },
        )
        .invalidates(QueryKey::new("appointments"))
        .invalidates(QueryKey::new("my-appointments"))
        .invalidates(QueryKey::new("clinician-appointments"))
        .notify_success(|_, _| "Appointment booked successfully!".to_string())
    }

    /// Lists appointments matching `filter`.
    pub async fn list(&self, filter: &AppointmentFilter) -> Result<Vec<Appointment>, ApiError> {
        self.http.get("/appointments/", &filter.params()).await
    }

    /// Cached list read, keyed by the filter.
    pub fn list_query(&self, filter: AppointmentFilter) -> Query<Vec<Appointment>> {
        let http = self.http.clone();
        let key = QueryKey::new("appointments").with_params(&filter);
        Query::new(
            key,
            move || {
                let http = http.clone();
                let filter = filter.clone();
                Box::pin(async move { http.get("/appointments/", &filter.params()).await })
            },
            self.queries.clone(),
        )
    }

    /// A patient's appointments; disabled until the patient id is known.
    pub fn patient_query(&self, patient_id: Option<&str>) -> Query<Vec<Appointment>> {
        let id = patient_id.unwrap_or_default().to_string();
        let filter = AppointmentFilter {
            patient_id: Some(id.clone()),
            ..AppointmentFilter::default()
        };
        let http = self.http.clone();
        Query::new(
            QueryKey::new("my-appointments").push(&id),
            move || {
                let http = http.clone();
                let filter = filter.clone();
                Box::pin(async move { http.get("/appointments/", &filter.params()).await })
            },
            self.queries.clone(),
        )
        .enabled(patient_id.is_some())
    }

    /// A clinician's appointments, optionally narrowed by status.
    pub fn clinician_query(
        &self,
        clinician_id: Option<&str>,
        status: Option<AppointmentStatus>,
    ) -> Query<Vec<Appointment>> {
        let id = clinician_id.unwrap_or_default().to_string();
        let filter = AppointmentFilter {
            clinician_id: Some(id.clone()),
            status,
            ..AppointmentFilter::default()
        };
        let http = self.http.clone();
        let key = QueryKey::new("clinician-appointments")
            .push(&id)
            .push(status.map(|s| s.as_str()).unwrap_or_default());
        Query::new(
            key,
            move || {
                let http = http.clone();
                let filter = filter.clone();
                Box::pin(async move { http.get("/appointments/", &filter.params()).await })
            },
            self.queries.clone(),
        )
        .enabled(clinician_id.is_some())
    }

    /// A clinician's pending booking requests.
    pub async fn pending(&self, clinician_id: &str) -> Result<Vec<Appointment>, ApiError> {
        let params = Params::new().with("clinician_id", Some(clinician_id));
        self.http.get("/appointments/pending", &params).await
    }

    /// Cached pending-requests read; disabled until the clinician id is known.
    pub fn pending_query(&self, clinician_id: Option<&str>) -> Query<Vec<Appointment>> {
        let id = clinician_id.unwrap_or_default().to_string();
        let http = self.http.clone();
        let key = QueryKey::new("appointments").push("pending").push(&id);
        Query::new(
            key,
            move || {
                let http = http.clone();
                let params = Params::new().with("clinician_id", Some(id.clone()));
                Box::pin(async move { http.get("/appointments/pending", &params).await })
            },
            self.queries.clone(),
        )
        .enabled(clinician_id.is_some())
    }

    /// Fetches one appointment.
    pub async fn get(&self, id: &str) -> Result<Appointment, ApiError> {
        self.http
            .get(&format!("/appointments/{id}"), &Params::new())
            .await
    }

    /// Cached single-appointment read.
    pub fn get_query(&self, id: Option<&str>) -> Query<Appointment> {
        let id_string = id.unwrap_or_default().to_string();
        let http = self.http.clone();
        Query::new(
            QueryKey::new("appointments").push(&id_string),
            move || {
                let http = http.clone();
                let path = format!("/appointments/{id_string}");
                Box::pin(async move { http.get(&path, &Params::new()).await })
            },
            self.queries.clone(),
        )
        .enabled(id.is_some())
    }

    /// Changes an appointment's status.
    pub async fn update_status(
        &self,
        id: impl Into<String>,
        status: AppointmentStatus,
    ) -> Result<Appointment, ApiError> {
        self.update_status_mutation()
            .run(StatusChange {
                id: id.into(),
                status,
            })
            .await
    }

    /// The status-change mutation: `PATCH /appointments/{id}`.
    ///
    /// Success wording is status-specific, see [`status_update_message`].
    pub fn update_status_mutation(&self) -> Mutation<StatusChange, Appointment> {
        let http = self.http.clone();
        Mutation::new(
            self.queries.clone(),
            self.notifications.clone(),
            move |change: StatusChange| {
                let http = http.clone();
                Box::pin(async move {
                    let path = format!("/appointments/{}", change.id);
                    let body = StatusBody {
                        status: change.status,
                    };
                    http.patch(&path, &body).await
                })
            },
        )
        .invalidates(QueryKey::new("appointments"))
        .invalidates(QueryKey::new("my-appointments"))
        .invalidates(QueryKey::new("clinician-appointments"))
        .notify_success(|change: &StatusChange, _| status_update_message(change.status).to_string())
    }
}
