//! AI-assisted chat.
//!
//! The backend threads conversation state by session id; the client keeps
//! the transcript. [`ChatSession`] owns both: it records the outgoing user
//! message, sends it with the current session id, and captures the reply
//! and the session id assigned by the first response.

use std::sync::Arc;

use crate::error::ApiError;
use crate::http::HttpClient;
use crate::notify::NotificationHub;
use crate::query::{Mutation, QueryClient};

use super::types::{ChatHistoryMessage, ChatRequest, ChatResponse, ChatRole};

/// Chat endpoint service.
#[derive(Debug, Clone)]
pub struct Chat {
    http: HttpClient,
    queries: Arc<QueryClient>,
    notifications: NotificationHub,
}

impl Chat {
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

    /// Sends one message: `POST /chat/agent`.
    pub async fn send(&self, request: &ChatRequest) -> Result<ChatResponse, ApiError> {
        self.http.post("/chat/agent", request).await
    }

    /// The send mutation. Chat invalidates nothing and emits no success
    /// notification; the reply itself is the feedback.
    pub fn send_mutation(&self) -> Mutation<ChatRequest, ChatResponse> {
        let http = self.http.clone();
        Mutation::new(
            self.queries.clone(),
            self.notifications.clone(),
            move |request: ChatRequest| {
                let http = http.clone();
                Box::pin(async move { http.post("/chat/agent", &request).await })
            },
        )
    }

    /// Starts a transcript for the given patient.
    #[must_use]
    pub fn session(&self, patient_id: impl Into<String>) -> ChatSession {
        ChatSession {
            chat: self.clone(),
            patient_id: patient_id.into(),
            session_id: None,
            messages: Vec::new(),
        }
    }
}

/// Client-side chat transcript.
#[derive(Debug, Clone)]
pub struct ChatSession {
    chat: Chat,
    patient_id: String,
    session_id: Option<String>,
    messages: Vec<ChatHistoryMessage>,
}

impl ChatSession {
    /// The session id assigned by the backend, once the first reply landed.
    #[must_use]
    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    /// The transcript so far, oldest first.
    #[must_use]
    pub fn messages(&self) -> &[ChatHistoryMessage] {
        &self.messages
    }

    /// Sends a user message and records both sides of the exchange.
    ///
    /// The user message is recorded before the request goes out, so a
    /// failed send leaves it visible for a retry.
    pub async fn send(&mut self, content: impl Into<String>) -> Result<ChatResponse, ApiError> {
        let content = content.into();
        self.messages.push(ChatHistoryMessage {
            role: ChatRole::User,
            content: content.clone(),
        });

        let request = ChatRequest {
            patient_id: self.patient_id.clone(),
            message: content,
            session_id: self.session_id.clone(),
        };
        let response = self.chat.send(&request).await?;

        self.session_id = Some(response.session_id.clone());
        self.messages.push(ChatHistoryMessage {
            role: ChatRole::Assistant,
            content: response.reply.clone(),
        });
        Ok(response)
    }

    /// Drops the session id and transcript.
    pub fn reset(&mut self) {
        self.session_id = None;
        self.messages.clear();
    }
}
