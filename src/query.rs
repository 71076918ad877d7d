//! Query and mutation caching.
//!
//! This module wraps HTTP calls in a keyed cache with request
//! de-duplication, automatic invalidation on mutation, and derived
//! loading/error state, similar to SWR or TanStack Query.
//!
//! # Features
//!
//! - **Queries**: keyed, cached reads with shared in-flight fetches and
//!   automatic refetching on invalidation
//! - **Mutations**: one-shot writes that invalidate declared key prefixes
//!   and emit success notifications
//! - **Ordering guard**: settles carry a monotonic sequence per store, so
//!   a slow response never overwrites newer data
//!
//! # Key conventions
//!
//! Keys are ordered segment tuples; invalidation matches by prefix. The
//! endpoint services in [`crate::api`] use:
//!
//! | Key | Read |
//! |---|---|
//! | `["appointments", {filter}]` | appointment list |
//! | `["appointments", id]` | one appointment |
//! | `["appointments", "pending", clinician]` | pending requests |
//! | `["my-appointments", patient]` | a patient's appointments |
//! | `["clinician-appointments", clinician, status]` | a clinician's appointments |
//! | `["clinicians", {search}]` | clinician search |
//! | `["clinicians", id]` | one clinician |
//! | `["clinicians", id, "availability", start, days]` | open slots |
//! | `["triage", appointment]` | clinician triage view |
//! | `["triage-questions", session]` | triage questions |
//!
//! Writes invalidate the broadest prefix that covers their dependents,
//! e.g. booking an appointment invalidates `["appointments"]`,
//! `["my-appointments"]`, and `["clinician-appointments"]`.

mod cache;
mod client;
mod config;
mod key;
mod mutation;

pub use client::{FetchFuture, Query, QueryClient, QueryResult, QueryState};
pub use config::QueryConfig;
pub use key::QueryKey;
pub use mutation::{Mutation, MutationResult, MutationState};
