//! Client state stores
//!
//! Each store owns a snapshot of fetched server data behind a
//! `parking_lot::RwLock`, plus a [`StoreStatus`] with the loading counter
//! and last error. Actions follow one pattern (see [`run_tracked`]):
//!
//! 1. mark the action in flight and clear the previous error
//! 2. await the service call (no lock is held across the await)
//! 3. apply the result, or record the error's display text and return it
//!
//! Stores are cheap handles (`Arc` inside) and can be cloned into tasks.

pub mod analytics;
pub mod auth;
pub mod project;
pub mod template;

pub use analytics::{AnalyticsState, AnalyticsStore, TimeRange};
pub use auth::{AuthPhase, AuthState, AuthStore};
pub use project::{CacheStatus, ProjectState, ProjectStore};
pub use template::{TemplateState, TemplateStore};

use crate::types::{AppError, Result};
use parking_lot::RwLock;
use std::future::Future;
use tracing::{debug, warn};

/// Loading/error bookkeeping shared by all stores.
///
/// `in_flight` counts running actions so that fan-out calls only report
/// idle once every branch has settled.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreStatus {
    in_flight: usize,
    error: Option<String>,
}

impl StoreStatus {
    pub fn loading(&self) -> bool {
        self.in_flight > 0
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    fn begin(&mut self) {
        self.in_flight += 1;
        self.error = None;
    }

    fn finish(&mut self) {
        self.in_flight = self.in_flight.saturating_sub(1);
    }

    pub(crate) fn set_error(&mut self, message: impl Into<String>) {
        self.error = Some(message.into());
    }

    pub(crate) fn clear_error(&mut self) {
        self.error = None;
    }
}

/// Store state that carries a [`StoreStatus`]
pub trait Tracked {
    fn status(&self) -> &StoreStatus;
    fn status_mut(&mut self) -> &mut StoreStatus;
}

/// Something that can be put back into its initial state.
///
/// The unauthorized handler holds these so it can wipe every store without
/// owning the stores themselves.
pub trait Resettable: Send + Sync {
    fn reset(&self);
}

impl<S: Default + Send + Sync> Resettable for RwLock<S> {
    fn reset(&self) {
        *self.write() = S::default();
    }
}

/// Run one store action with loading/error tracking.
///
/// `apply` runs under the write lock only when `work` succeeded; its return
/// value is the action's result.
pub(crate) async fn run_tracked<S, T, R, Fut, A>(
    state: &RwLock<S>,
    action: &'static str,
    work: Fut,
    apply: A,
) -> Result<R>
where
    S: Tracked,
    Fut: Future<Output = Result<T>>,
    A: FnOnce(&mut S, T) -> R,
{
    let mut in_flight = InFlight::begin(state);
    debug!(action, "store action started");

    let outcome = work.await;

    let mut guard = state.write();
    in_flight.armed = false;
    guard.status_mut().finish();
    match outcome {
        Ok(value) => Ok(apply(&mut guard, value)),
        Err(err) => {
            let message = err.user_message();
            warn!(action, "store action failed: {}", message);
            guard.status_mut().set_error(message);
            Err(err)
        }
    }
}

/// Keeps `in_flight` balanced when an action future is dropped before it
/// completes
struct InFlight<'a, S: Tracked> {
    state: &'a RwLock<S>,
    armed: bool,
}

impl<'a, S: Tracked> InFlight<'a, S> {
    fn begin(state: &'a RwLock<S>) -> Self {
        state.write().status_mut().begin();
        Self { state, armed: true }
    }
}

impl<S: Tracked> Drop for InFlight<'_, S> {
    fn drop(&mut self) {
        if self.armed {
            self.state.write().status_mut().finish();
        }
    }
}

/// Fail an action before any network call, recording the message
pub(crate) fn reject_locally<S: Tracked>(state: &RwLock<S>, message: &str) -> AppError {
    debug!("rejected locally: {}", message);
    state.write().status_mut().set_error(message);
    AppError::InvalidInput(message.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default)]
    struct Counter {
        value: u32,
        status: StoreStatus,
    }

    impl Tracked for Counter {
        fn status(&self) -> &StoreStatus {
            &self.status
        }
        fn status_mut(&mut self) -> &mut StoreStatus {
            &mut self.status
        }
    }

    #[tokio::test]
    async fn test_success_clears_error_and_loading() {
        let state = RwLock::new(Counter::default());
        state.write().status.set_error("old failure");

        let result = run_tracked(&state, "bump", async { Ok(5u32) }, |s, v| {
            s.value = v;
            v * 2
        })
        .await;

        assert_eq!(result.unwrap(), 10);
        let s = state.read();
        assert_eq!(s.value, 5);
        assert!(!s.status().loading());
        assert!(s.status().error().is_none());
    }

    #[tokio::test]
    async fn test_failure_records_message() {
        let state = RwLock::new(Counter::default());
        let result: Result<()> = run_tracked(
            &state,
            "bump",
            async {
                Err::<u32, _>(AppError::Api {
                    status: 422,
                    message: "Name is required".to_string(),
                })
            },
            |_, _| (),
        )
        .await;

        assert!(result.is_err());
        let s = state.read();
        assert_eq!(s.value, 0);
        assert!(!s.status().loading());
        assert_eq!(s.status().error(), Some("Name is required"));
    }

    #[tokio::test]
    async fn test_loading_visible_while_in_flight() {
        let state = RwLock::new(Counter::default());
        let (tx, rx) = tokio::sync::oneshot::channel::<u32>();

        let fut = run_tracked(&state, "wait", async { Ok(rx.await.unwrap_or(0)) }, |s, v| {
            s.value = v
        });
        tokio::pin!(fut);

        // Poll once so the action registers as in flight
        assert!(futures::poll!(fut.as_mut()).is_pending());
        assert!(state.read().status().loading());

        tx.send(3).unwrap();
        fut.await.unwrap();
        assert!(!state.read().status().loading());
        assert_eq!(state.read().value, 3);
    }

    #[tokio::test]
    async fn test_dropped_action_settles_loading() {
        let state = RwLock::new(Counter::default());
        {
            let never = futures::future::pending::<Result<u32>>();
            let fut = run_tracked(&state, "abandoned", never, |_, v| v);
            tokio::pin!(fut);
            assert!(futures::poll!(fut.as_mut()).is_pending());
            assert!(state.read().status().loading());
        }
        assert!(!state.read().status().loading());
    }

    #[test]
    fn test_reset_restores_default() {
        let state = RwLock::new(Counter::default());
        state.write().value = 9;
        state.reset();
        assert_eq!(state.read().value, 0);
    }

    #[test]
    fn test_reject_locally() {
        let state = RwLock::new(Counter::default());
        let err = reject_locally(&state, "Email is required");
        assert!(matches!(err, AppError::InvalidInput(_)));
        assert_eq!(state.read().status().error(), Some("Email is required"));
        assert!(!state.read().status().loading());
    }
}
