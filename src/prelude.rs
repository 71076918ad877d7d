//! Prelude module for convenient imports.
//!
//! ```
//! use sehatly_client::prelude::*;
//! ```
//!
//! # What's included
//!
//! - [`PortalClient`] - The composition root and per-resource services
//! - [`Query`] / [`QueryClient`] / [`QueryKey`] - Cached reads
//! - [`Mutation`] - Cache-invalidating writes
//! - [`ApiError`] - The normalized error shape
//! - [`ClientConfig`] - Client configuration

pub use crate::api::types::*;
pub use crate::api::{
    status_update_message, AnswerSubmission, Appointments, Chat, ChatSession, Clinicians,
    PortalClient, StatusChange, Triage,
};
pub use crate::config::ClientConfig;
pub use crate::error::ApiError;
pub use crate::http::{HttpClient, Params};
pub use crate::notify::{Notification, NotificationHub, NotificationLevel};
pub use crate::query::{
    Mutation, MutationResult, MutationState, Query, QueryClient, QueryConfig, QueryKey,
    QueryResult, QueryState,
};
