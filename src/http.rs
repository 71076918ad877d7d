//! HTTP client for the portal REST backend.
//!
//! Translates logical endpoint calls into network requests and typed
//! results, centralizing URL construction, status→message error mapping,
//! and failure notifications. Success notifications are the caller's
//! responsibility; this layer only reports failures, exactly once per
//! failed request.
//!
//! # Example
//!
//! ```rust,ignore
//! let hub = NotificationHub::new();
//! let http = HttpClient::new(&ClientConfig::from_env(), hub)?;
//!
//! let params = Params::new().with("patient_id", Some("p1"));
//! let appointments: Vec<Appointment> = http.get("/appointments/", &params).await?;
//! ```

use reqwest::header::CONTENT_TYPE;
use reqwest::{Method, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::config::{ClientConfig, ConfigError};
use crate::error::{detail_from_body, message_for_status, ApiError, FALLBACK_MESSAGE, NETWORK_MESSAGE};
use crate::notify::NotificationHub;

/// Ordered query parameters.
///
/// Pairs are appended in insertion order. `None` values and empty strings
/// are dropped at construction, so they never appear in a URL; everything
/// else is stringified.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params {
    pairs: Vec<(&'static str, String)>,
}

impl Params {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `key=value` when `value` is present and non-empty.
    pub fn push(&mut self, key: &'static str, value: Option<impl ToString>) {
        if let Some(value) = value {
            let value = value.to_string();
            if !value.is_empty() {
                self.pairs.push((key, value));
            }
        }
    }

    /// Builder form of [`push`](Self::push).
    #[must_use]
    pub fn with(mut self, key: &'static str, value: Option<impl ToString>) -> Self {
        self.push(key, value);
        self
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    #[must_use]
    pub fn pairs(&self) -> &[(&'static str, String)] {
        &self.pairs
    }
}

/// Typed HTTP client with uniform error semantics.
///
/// Cheap to clone; clones share the underlying connection pool and the
/// notification hub.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: reqwest::Client,
    base_url: String,
    notifications: NotificationHub,
}

impl HttpClient {
    pub fn new(config: &ClientConfig, notifications: NotificationHub) -> Result<Self, ConfigError> {
        config.validate()?;
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ConfigError::Http(e.to_string()))?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            notifications,
        })
    }

    /// Joins base URL and path, appending the surviving `params` pairs.
    ///
    /// No `?` is emitted when no pairs survive.
    pub fn build_url(&self, path: &str, params: &Params) -> Result<Url, ApiError> {
        let mut url = Url::parse(&format!("{}{}", self.base_url, path)).map_err(|e| {
            tracing::warn!(path, error = %e, "request URL failed to parse");
            ApiError::Network(NETWORK_MESSAGE.to_string())
        })?;
        if !params.is_empty() {
            let mut query = url.query_pairs_mut();
            for (key, value) in params.pairs() {
                query.append_pair(key, value);
            }
        }
        Ok(url)
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str, params: &Params) -> Result<T, ApiError> {
        self.request(Method::GET, path, params, None).await
    }

    pub async fn post<T, B>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let body = self.encode_body(body)?;
        self.request(Method::POST, path, &Params::new(), Some(body)).await
    }

    pub async fn patch<T, B>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let body = self.encode_body(body)?;
        self.request(Method::PATCH, path, &Params::new(), Some(body)).await
    }

    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.request(Method::DELETE, path, &Params::new(), None).await
    }

    fn encode_body<B: Serialize + ?Sized>(&self, body: &B) -> Result<Value, ApiError> {
        serde_json::to_value(body).map_err(|e| {
            let err = ApiError::Decode(FALLBACK_MESSAGE.to_string());
            tracing::warn!(error = %e, "request body failed to serialize");
            self.notifications.error(err.message());
            err
        })
    }

    /// Dispatches a request and funnels every failure through one
    /// notification.
    async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        params: &Params,
        body: Option<Value>,
    ) -> Result<T, ApiError> {
        match self.dispatch(method.clone(), path, params, body).await {
            Ok(value) => Ok(value),
            Err(err) => {
                tracing::warn!(
                    %method,
                    path,
                    status = err.status(),
                    message = err.message(),
                    "request failed"
                );
                self.notifications.error(err.message());
                Err(err)
            }
        }
    }

    async fn dispatch<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        params: &Params,
        body: Option<Value>,
    ) -> Result<T, ApiError> {
        let url = self.build_url(path, params)?;
        tracing::debug!(%method, %url, "dispatching request");

        let mut request = self
            .client
            .request(method, url)
            .header(CONTENT_TYPE, "application/json");
        if let Some(body) = body {
            request = request.json(&body);
        }
        let response = request.send().await.map_err(|e| {
            tracing::debug!(error = %e, "transport error");
            ApiError::Network(NETWORK_MESSAGE.to_string())
        })?;

        Self::decode_response(response).await
    }

    async fn decode_response<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ApiError> {
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = detail_from_body(&body)
                .unwrap_or_else(|| message_for_status(status.as_u16()).to_string());
            return Err(ApiError::Status {
                status: status.as_u16(),
                message,
            });
        }

        // 204 carries no body; decode the empty object instead.
        if status == StatusCode::NO_CONTENT {
            return empty_object();
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|_| ApiError::Network(NETWORK_MESSAGE.to_string()))?;
        serde_json::from_slice(&bytes).map_err(|e| {
            tracing::warn!(error = %e, "response body did not match expected shape");
            ApiError::Decode(FALLBACK_MESSAGE.to_string())
        })
    }
}

fn empty_object<T: DeserializeOwned>() -> Result<T, ApiError> {
    serde_json::from_value(Value::Object(serde_json::Map::new())).map_err(|e| {
        tracing::warn!(error = %e, "empty response did not match expected shape");
        ApiError::Decode(FALLBACK_MESSAGE.to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    fn client() -> HttpClient {
        let config = ClientConfig::new("http://localhost:8000/");
        HttpClient::new(&config, NotificationHub::new()).expect("config is valid")
    }

    #[test]
    fn test_params_skip_none_and_empty() {
        let params = Params::new()
            .with("specialty", Some("cardiology"))
            .with("city", None::<String>)
            .with("accepting_new", Some(true))
            .with("min_rating", Some(""));

        assert_eq!(
            params.pairs(),
            &[
                ("specialty", "cardiology".to_string()),
                ("accepting_new", "true".to_string()),
            ]
        );
    }

    #[test]
    fn test_params_preserve_insertion_order() {
        let params = Params::new()
            .with("b", Some(2))
            .with("a", Some(1))
            .with("c", Some(3));
        let keys: Vec<_> = params.pairs().iter().map(|(k, _)| *k).collect();
        assert_eq!(keys, vec!["b", "a", "c"]);
    }

    #[test]
    fn test_params_stringify_values() {
        let params = Params::new()
            .with("days_ahead", Some(14))
            .with("min_rating", Some(4.5))
            .with("accepting_new", Some(false));
        assert_eq!(
            params.pairs(),
            &[
                ("days_ahead", "14".to_string()),
                ("min_rating", "4.5".to_string()),
                ("accepting_new", "false".to_string()),
            ]
        );
    }

    #[test]
    fn test_build_url_without_params_has_no_query() {
        let url = client()
            .build_url("/clinicians/search", &Params::new())
            .expect("url parses");
        assert_eq!(url.as_str(), "http://localhost:8000/clinicians/search");
        assert_eq!(url.query(), None);
    }

    #[test]
    fn test_build_url_appends_surviving_pairs() {
        let params = Params::new()
            .with("patient_id", Some("p1"))
            .with("status", None::<String>)
            .with("clinician_id", Some("c1"));
        let url = client()
            .build_url("/appointments/", &params)
            .expect("url parses");
        assert_eq!(
            url.as_str(),
            "http://localhost:8000/appointments/?patient_id=p1&clinician_id=c1"
        );
    }

    #[test]
    fn test_build_url_encodes_values() {
        let params = Params::new().with("specialty", Some("internal medicine"));
        let url = client()
            .build_url("/clinicians/search", &params)
            .expect("url parses");
        assert_eq!(
            url.as_str(),
            "http://localhost:8000/clinicians/search?specialty=internal+medicine"
        );
    }

    #[test]
    fn test_base_url_trailing_slash_is_stripped() {
        let url = client()
            .build_url("/appointments/", &Params::new())
            .expect("url parses");
        assert_eq!(url.as_str(), "http://localhost:8000/appointments/");
    }

    #[test]
    fn test_empty_object_decodes_optional_shape() {
        #[derive(Debug, Deserialize)]
        struct Ack {
            message: Option<String>,
        }

        let ack: Ack = empty_object().expect("all-optional shape decodes");
        assert!(ack.message.is_none());
    }

    #[test]
    fn test_empty_object_rejects_required_fields() {
        #[derive(Debug, Deserialize)]
        struct Strict {
            #[allow(dead_code)]
            id: String,
        }

        let result: Result<Strict, ApiError> = empty_object();
        assert!(matches!(result, Err(ApiError::Decode(_))));
    }
}
