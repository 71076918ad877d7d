//! Clinician search and availability.

use std::sync::Arc;

use crate::error::ApiError;
use crate::http::{HttpClient, Params};
use crate::query::{Query, QueryClient, QueryKey};

use super::types::{AvailabilityWindow, Clinician, ClinicianSearch, Slot};

/// Clinicians endpoint service. Read-only.
#[derive(Debug, Clone)]
pub struct Clinicians {
    http: HttpClient,
    queries: Arc<QueryClient>,
}

impl Clinicians {
    pub(crate) fn new(http: HttpClient, queries: Arc<QueryClient>) -> Self {
        Self { http, queries }
    }

    /// Searches clinicians. An empty filter lists everyone.
    pub async fn search(&self, search: &ClinicianSearch) -> Result<Vec<Clinician>, ApiError> {
        self.http.get("/clinicians/search", &search.params()).await
    }

    /// Cached search, keyed by the filter values.
    pub fn search_query(&self, search: ClinicianSearch) -> Query<Vec<Clinician>> {
        let http = self.http.clone();
        let key = QueryKey::new("clinicians").with_params(&search);
        Query::new(
            key,
            move || {
                let http = http.clone();
                let search = search.clone();
                Box::pin(async move { http.get("/clinicians/search", &search.params()).await })
            },
            self.queries.clone(),
        )
    }

    /// Fetches one clinician.
    pub async fn get(&self, id: &str) -> Result<Clinician, ApiError> {
        self.http
            .get(&format!("/clinicians/{id}"), &Params::new())
            .await
    }

    /// Cached single-clinician read; disabled until the id is known.
    pub fn get_query(&self, id: Option<&str>) -> Query<Clinician> {
        let id_string = id.unwrap_or_default().to_string();
        let http = self.http.clone();
        Query::new(
            QueryKey::new("clinicians").push(&id_string),
            move || {
                let http = http.clone();
                let path = format!("/clinicians/{id_string}");
                Box::pin(async move { http.get(&path, &Params::new()).await })
            },
            self.queries.clone(),
        )
        .enabled(id.is_some())
    }

    /// Open slots for a clinician inside the given window.
    pub async fn availability(
        &self,
        id: &str,
        window: &AvailabilityWindow,
    ) -> Result<Vec<Slot>, ApiError> {
        self.http
            .get(&format!("/clinicians/{id}/availability"), &window.params())
            .await
    }

    /// Cached availability read, keyed by clinician and window.
    pub fn availability_query(
        &self,
        id: Option<&str>,
        window: AvailabilityWindow,
    ) -> Query<Vec<Slot>> {
        let id_string = id.unwrap_or_default().to_string();
        let http = self.http.clone();
        let key = QueryKey::new("clinicians")
            .push(&id_string)
            .push("availability")
            .push(
                window
                    .start_date
                    .map(|d| d.to_string())
                    .unwrap_or_default(),
            )
            .push(window.days_ahead.map(|d| d.to_string()).unwrap_or_default());
        Query::new(
            key,
            move || {
                let http = http.clone();
                let path = format!("/clinicians/{id_string}/availability");
                let params = window.params();
                Box::pin(async move { http.get(&path, &params).await })
            },
            self.queries.clone(),
        )
        .enabled(id.is_some())
    }
}
