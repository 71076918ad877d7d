//! One-shot write operations.
//!
//! Mutations perform a write (POST, PATCH, DELETE), then keep cached reads
//! fresh: on success the declared query-key prefixes are invalidated so
//! every active subscriber refetches, and an optional success notification
//! is emitted with wording chosen from the mutation's input and output.
//!
//! Unlike queries, mutations are not de-duplicated or cached; each
//! invocation is independent. On failure the error propagates to the
//! caller and nothing is invalidated. The HTTP client already emitted the
//! one failure notification for the request, so this layer stays silent.
//!
//! # Example
//!
//! ```rust,ignore
//! let book = Mutation::new(queries, notifications, move |input: AppointmentCreate| {
//!     let http = http.clone();
//!     Box::pin(async move { http.post("/appointments/", &input).await })
//! })
//! .invalidates(QueryKey::new("appointments"))
//! .notify_success(|_, _| "Appointment booked successfully!".to_string());
//!
//! let appointment = book.run(input).await?;
//! ```

use std::sync::Arc;

use tokio::sync::watch;

use crate::error::ApiError;
use crate::notify::NotificationHub;

use super::client::{FetchFuture, QueryClient};
use super::key::QueryKey;

/// The state of a mutation.
#[derive(Debug, Clone)]
pub enum MutationState<O> {
    /// Mutation has not been started.
    Idle,
    /// Mutation is in progress.
    Pending,
    /// Mutation succeeded with a result.
    Success(O),
    /// Mutation failed.
    Error(ApiError),
}

/// A mutation snapshot for view consumption.
#[derive(Debug, Clone)]
pub struct MutationResult<O> {
    pub state: MutationState<O>,
}

impl<O> MutationResult<O> {
    #[must_use]
    pub const fn idle() -> Self {
        Self {
            state: MutationState::Idle,
        }
    }

    /// Returns the result data if the mutation succeeded.
    pub const fn data(&self) -> Option<&O> {
        match &self.state {
            MutationState::Success(data) => Some(data),
            _ => None,
        }
    }

    /// Returns the error if the mutation failed.
    pub const fn error(&self) -> Option<&ApiError> {
        match &self.state {
            MutationState::Error(error) => Some(error),
            _ => None,
        }
    }

    pub const fn is_idle(&self) -> bool {
        matches!(self.state, MutationState::Idle)
    }

    pub const fn is_pending(&self) -> bool {
        matches!(self.state, MutationState::Pending)
    }

    pub const fn is_success(&self) -> bool {
        matches!(self.state, MutationState::Success(_))
    }

    pub const fn is_error(&self) -> bool {
        matches!(self.state, MutationState::Error(_))
    }
}

type Mutator<I, O> = Arc<dyn Fn(I) -> FetchFuture<O> + Send + Sync>;
type SuccessMessage<I, O> = Arc<dyn Fn(&I, &O) -> String + Send + Sync>;

/// A one-shot write with declared invalidations.
pub struct Mutation<I, O> {
    mutator: Mutator<I, O>,
    invalidates: Vec<QueryKey>,
    success_message: Option<SuccessMessage<I, O>>,
    queries: Arc<QueryClient>,
    notifications: NotificationHub,
    state_tx: watch::Sender<MutationResult<O>>,
}

impl<I, O> Mutation<I, O>
where
    I: Clone + Send + 'static,
    O: Clone + Send + Sync + 'static,
{
    pub fn new<F>(queries: Arc<QueryClient>, notifications: NotificationHub, mutator: F) -> Self
    where
        F: Fn(I) -> FetchFuture<O> + Send + Sync + 'static,
    {
        Self {
            mutator: Arc::new(mutator),
            invalidates: Vec::new(),
            success_message: None,
            queries,
            notifications,
            state_tx: watch::Sender::new(MutationResult::idle()),
        }
    }

    /// Declares a query-key prefix to invalidate on success.
    #[must_use]
    pub fn invalidates(mut self, key: QueryKey) -> Self {
        self.invalidates.push(key);
        self
    }

    /// Sets the success-notification wording, chosen from input and output.
    #[must_use]
    pub fn notify_success<F>(mut self, message: F) -> Self
    where
        F: Fn(&I, &O) -> String + Send + Sync + 'static,
    {
        self.success_message = Some(Arc::new(message));
        self
    }

    /// Current state snapshot.
    #[must_use]
    pub fn state(&self) -> MutationResult<O> {
        self.state_tx.borrow().clone()
    }

    /// Subscribes to state transitions (`Idle → Pending → Success | Error`).
    pub fn subscribe(&self) -> watch::Receiver<MutationResult<O>> {
        self.state_tx.subscribe()
    }

    /// Executes the mutation.
    ///
    /// On success: emits the success notification (when declared), then
    /// invalidates the declared key prefixes. On error: propagates without
    /// invalidating or re-notifying.
    pub async fn run(&self, input: I) -> Result<O, ApiError> {
        self.state_tx.send_replace(MutationResult {
            state: MutationState::Pending,
        });

        match (self.mutator)(input.clone()).await {
            Ok(output) => {
                if let Some(message) = &self.success_message {
                    self.notifications.success(message(&input, &output));
                }
                for key in &self.invalidates {
                    self.queries.invalidate(key);
                }
                self.state_tx.send_replace(MutationResult {
                    state: MutationState::Success(output.clone()),
                });
                Ok(output)
            }
            Err(error) => {
                self.state_tx.send_replace(MutationResult {
                    state: MutationState::Error(error.clone()),
                });
                Err(error)
            }
        }
    }
}
