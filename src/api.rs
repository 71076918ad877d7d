//! Typed endpoint services for the portal REST API.
//!
//! [`PortalClient`] is the composition root: it owns the HTTP client, the
//! query store, and the notification hub, and hands out per-resource
//! services that share all three.
//!
//! # Example
//!
//! ```rust,ignore
//! let portal = PortalClient::from_env()?;
//!
//! let clinicians = portal
//!     .clinicians()
//!     .search(&ClinicianSearch {
//!         specialty: Some("cardiology".to_string()),
//!         ..ClinicianSearch::default()
//!     })
//!     .await?;
//!
//! let booked = portal
//!     .appointments()
//!     .create(AppointmentCreate {
//!         patient_id: "p1".to_string(),
//!         clinician_id: clinicians[0].id.clone(),
//!         scheduled_at: slot.time,
//!         reason: "checkup".to_string(),
//!         duration_minutes: Some(30),
//!     })
//!     .await?;
//! ```

mod appointments;
mod chat;
mod clinicians;
mod triage;
pub mod types;

use std::sync::Arc;

pub use appointments::{status_update_message, Appointments, StatusChange};
pub use chat::{Chat, ChatSession};
pub use clinicians::Clinicians;
pub use triage::{AnswerSubmission, Triage};

use crate::config::{ClientConfig, ConfigError};
use crate::http::HttpClient;
use crate::notify::NotificationHub;
use crate::query::QueryClient;

/// Entry point to the portal API.
#[derive(Debug, Clone)]
pub struct PortalClient {
    http: HttpClient,
    queries: Arc<QueryClient>,
    notifications: NotificationHub,
}

impl PortalClient {
    pub fn new(config: &ClientConfig) -> Result<Self, ConfigError> {
        let notifications = NotificationHub::new();
        let http = HttpClient::new(config, notifications.clone())?;
        let queries = Arc::new(QueryClient::with_config(config.query.clone()));
        Ok(Self {
            http,
            queries,
            notifications,
        })
    }

    /// Builds a client from `SEHATLY_API_URL` (or the development default).
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::new(&ClientConfig::from_env())
    }

    pub fn appointments(&self) -> Appointments {
        Appointments::new(
            self.http.clone(),
            self.queries.clone(),
            self.notifications.clone(),
        )
    }

    pub fn clinicians(&self) -> Clinicians {
        Clinicians::new(self.http.clone(), self.queries.clone())
    }

    pub fn chat(&self) -> Chat {
        Chat::new(
            self.http.clone(),
            self.queries.clone(),
            self.notifications.clone(),
        )
    }

    pub fn triage(&self) -> Triage {
        Triage::new(
            self.http.clone(),
            self.queries.clone(),
            self.notifications.clone(),
        )
    }

    /// The underlying HTTP client.
    pub fn http(&self) -> &HttpClient {
        &self.http
    }

    /// The shared query store.
    pub fn queries(&self) -> &Arc<QueryClient> {
        &self.queries
    }

    /// The notification hub; subscribe here to render toasts.
    pub fn notifications(&self) -> &NotificationHub {
        &self.notifications
    }

    /// Wipes all cached state. Intended for test isolation.
    pub fn reset(&self) {
        self.queries.reset();
    }
}
