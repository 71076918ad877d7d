//! # sehatly-client: typed API client and query cache for the Sehatly portal
//!
//! This crate is the data layer behind the patient/clinician portal: it
//! talks to the portal's REST backend and keeps every view's reads cached,
//! de-duplicated, and fresh after writes.
//!
//! ## Architecture
//!
//! Two cooperating layers, leaves first:
//!
//! 1. **HTTP client** ([`http`]): builds URLs (omitting absent query
//!    parameters), issues requests, maps HTTP statuses to user-facing
//!    messages, and normalizes every outcome into a typed
//!    [`ApiError`](error::ApiError). Each failed request emits exactly one
//!    notification through the [`notify`] hub.
//! 2. **Query/mutation cache** ([`query`]): a keyed store with one
//!    in-flight fetch per [`QueryKey`](query::QueryKey), prefix-based
//!    invalidation, staleness tracking, and a sequence guard against
//!    out-of-order responses. Mutations invalidate their declared key
//!    prefixes on success and emit semantically specific success
//!    notifications.
//!
//! The [`api`] module binds both into typed per-resource services
//! (appointments, clinicians, chat, triage) behind the
//! [`PortalClient`](api::PortalClient) composition root.
//!
//! ## Example
//!
//! ```rust,ignore
//! use futures::StreamExt;
//! use sehatly_client::prelude::*;
//!
//! let portal = PortalClient::from_env()?;
//!
//! // Subscribe to a cached read; it refetches whenever a booking lands.
//! let pending = portal.appointments().pending_query(Some("c1"));
//! let mut updates = pending.watch();
//! while let Some(result) = updates.next().await {
//!     if let Some(appointments) = result.data() {
//!         render(appointments);
//!     }
//! }
//! ```

pub mod api;
pub mod config;
pub mod error;
pub mod http;
pub mod notify;
pub mod prelude;
pub mod query;
