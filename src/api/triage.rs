//! Pre-visit triage sessions.

use std::sync::Arc;

use crate::error::ApiError;
use crate::http::{HttpClient, Params};
use crate::notify::NotificationHub;
use crate::query::{Mutation, Query, QueryClient, QueryKey};

use super::types::{SubmitAck, TriageAnswers, TriageQuestion, TriageSession, TriageSessionCreate, TriageView};

/// Input for answer submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerSubmission {
    pub session_id: String,
    pub answers: TriageAnswers,
}

/// Triage endpoint service.
#[derive(Debug, Clone)]
pub struct Triage {
    http: HttpClient,
    queries: Arc<QueryClient>,
    notifications: NotificationHub,
}

impl Triage {
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

    /// Starts a triage session for an appointment.
    pub async fn start(&self, input: TriageSessionCreate) -> Result<TriageSession, ApiError> {
        self.start_mutation().run(input).await
    }

    /// The session-start mutation: `POST /triage-sessions/`.
    pub fn start_mutation(&self) -> Mutation<TriageSessionCreate, TriageSession> {
        let http = self.http.clone();
        Mutation::new(
            self.queries.clone(),
            self.notifications.clone(),
            move |input: TriageSessionCreate| {
                let http = http.clone();
                Box::pin(async move { http.post("/triage-sessions/", &input).await })
            },
        )
        .invalidates(QueryKey::new("triage"))
        .notify_success(|_, _| "Triage session started".to_string())
    }

    /// Fetches the questions for a session.
    pub async fn questions(&self, session_id: &str) -> Result<Vec<TriageQuestion>, ApiError> {
        self.http
            .get(&format!("/triage-sessions/{session_id}/questions"), &Params::new())
            .await
    }

    /// Cached questions read; disabled until the session id is known.
    pub fn questions_query(&self, session_id: Option<&str>) -> Query<Vec<TriageQuestion>> {
        let id = session_id.unwrap_or_default().to_string();
        let http = self.http.clone();
        Query::new(
            QueryKey::new("triage-questions").push(&id),
            move || {
                let http = http.clone();
                let path = format!("/triage-sessions/{id}/questions");
                Box::pin(async move { http.get(&path, &Params::new()).await })
            },
            self.queries.clone(),
        )
        .enabled(session_id.is_some())
    }

    /// Submits answers for a session.
    pub async fn submit_answers(
        &self,
        session_id: impl Into<String>,
        answers: TriageAnswers,
    ) -> Result<SubmitAck, ApiError> {
        self.submit_answers_mutation()
            .run(AnswerSubmission {
                session_id: session_id.into(),
                answers,
            })
            .await
    }

    /// The answer-submission mutation: `POST /triage-sessions/{id}/answers`.
    pub fn submit_answers_mutation(&self) -> Mutation<AnswerSubmission, SubmitAck> {
        let http = self.http.clone();
        Mutation::new(
            self.queries.clone(),
            self.notifications.clone(),
            move |submission: AnswerSubmission| {
                let http = http.clone();
                Box::pin(async move {
                    let path = format!("/triage-sessions/{}/answers", submission.session_id);
                    http.post(&path, &submission.answers).await
                })
            },
        )
        .invalidates(QueryKey::new("triage"))
        .notify_success(|_, _| "Triage answers submitted".to_string())
    }

    /// The clinician-facing triage summary for an appointment.
    pub async fn clinician_view(
        &self,
        appointment_id: &str,
        clinician_id: &str,
    ) -> Result<TriageView, ApiError> {
        let params = Params::new().with("clinician_id", Some(clinician_id));
        self.http
            .get(
                &format!("/triage-sessions/clinician/appointment/{appointment_id}"),
                &params,
            )
            .await
    }

    /// Cached clinician view; disabled until both ids are known.
    pub fn clinician_view_query(
        &self,
        appointment_id: Option<&str>,
        clinician_id: Option<&str>,
    ) -> Query<TriageView> {
        let appointment = appointment_id.unwrap_or_default().to_string();
        let clinician = clinician_id.unwrap_or_default().to_string();
        let http = self.http.clone();
        Query::new(
            QueryKey::new("triage").push(&appointment),
            move || {
                let http = http.clone();
                let path = format!("/triage-sessions/clinician/appointment/{appointment}");
                let params = Params::new().with("clinician_id", Some(clinician.clone()));
                Box::pin(async move { http.get(&path, &params).await })
            },
            self.queries.clone(),
        )
        .enabled(appointment_id.is_some() && clinician_id.is_some())
    }
}
