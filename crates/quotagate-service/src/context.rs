//! Request context carrying the request identity and its finalizer hooks.

use std::fmt;
use std::future::Future;

use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use tracing::{debug, warn};
use uuid::Uuid;

use quotagate_core::error::AppError;

/// Compensation run once the request has completed, given its terminal
/// error if it failed.
pub type FinalizerHook = Box<dyn FnOnce(Option<AppError>) -> BoxFuture<'static, ()> + Send>;

/// Context for one API request.
///
/// Created by the request handler, passed into
/// [`QuotaGate::validate_quotas`](crate::quota::QuotaGate::validate_quotas),
/// and finalized once the API call has completed. Hooks run exactly once:
/// by [`finalize`](Self::finalize), or on drop if the request was abandoned.
pub struct RequestContext {
    /// Request identifier.
    pub request_id: Uuid,
    /// API method being served (e.g. `objectPut`).
    pub api_method: String,
    /// When the request was received.
    pub request_time: DateTime<Utc>,
    hooks: Vec<FinalizerHook>,
}

impl RequestContext {
    /// Creates a new request context.
    pub fn new(api_method: impl Into<String>) -> Self {
        Self {
            request_id: Uuid::now_v7(),
            api_method: api_method.into(),
            request_time: Utc::now(),
            hooks: Vec::new(),
        }
    }

    /// Register a hook to run when the request completes.
    pub fn push_finalizer<F, Fut>(&mut self, hook: F)
    where
        F: FnOnce(Option<AppError>) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.hooks
            .push(Box::new(move |api_error| Box::pin(hook(api_error))));
    }

    /// Number of hooks waiting to run.
    pub fn finalizer_count(&self) -> usize {
        self.hooks.len()
    }

    /// Run every registered hook in registration order.
    ///
    /// Calling this again only runs hooks registered since the last call.
    pub async fn finalize(&mut self, api_error: Option<&AppError>) {
        let hooks = std::mem::take(&mut self.hooks);
        if hooks.is_empty() {
            return;
        }
        debug!(
            request_id = %self.request_id,
            hooks = hooks.len(),
            failed = api_error.is_some(),
            "Running request finalizers"
        );
        for hook in hooks {
            hook(api_error.cloned()).await;
        }
    }
}

impl fmt::Debug for RequestContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestContext")
            .field("request_id", &self.request_id)
            .field("api_method", &self.api_method)
            .field("request_time", &self.request_time)
            .field("hooks", &self.hooks.len())
            .finish()
    }
}

impl Drop for RequestContext {
    fn drop(&mut self) {
        if self.hooks.is_empty() {
            return;
        }
        let hooks = std::mem::take(&mut self.hooks);
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!(
                request_id = %self.request_id,
                hooks = hooks.len(),
                "Request dropped outside a runtime, finalizers not run"
            );
            return;
        };

        warn!(
            request_id = %self.request_id,
            hooks = hooks.len(),
            "Request dropped before completion, running finalizers as failed"
        );
        let aborted = AppError::internal("request aborted");
        runtime.spawn(async move {
            for hook in hooks {
                hook(Some(aborted.clone())).await;
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn recorder() -> Arc<Mutex<Vec<String>>> {
        Arc::new(Mutex::new(Vec::new()))
    }

    fn push_recording(ctx: &mut RequestContext, log: &Arc<Mutex<Vec<String>>>, name: &'static str) {
        let log = log.clone();
        ctx.push_finalizer(move |err| async move {
            let outcome = err.map(|e| e.message).unwrap_or_else(|| "ok".to_string());
            log.lock().unwrap().push(format!("{name}:{outcome}"));
        });
    }

    #[tokio::test]
    async fn test_hooks_run_once_in_order() {
        let log = recorder();
        let mut ctx = RequestContext::new("objectPut");
        push_recording(&mut ctx, &log, "first");
        push_recording(&mut ctx, &log, "second");
        assert_eq!(ctx.finalizer_count(), 2);

        ctx.finalize(None).await;
        ctx.finalize(None).await;

        assert_eq!(*log.lock().unwrap(), vec!["first:ok", "second:ok"]);
        assert_eq!(ctx.finalizer_count(), 0);
    }

    #[tokio::test]
    async fn test_hooks_receive_api_error() {
        let log = recorder();
        let mut ctx = RequestContext::new("objectPut");
        push_recording(&mut ctx, &log, "hook");

        ctx.finalize(Some(&AppError::internal("disk full"))).await;
        assert_eq!(*log.lock().unwrap(), vec!["hook:disk full"]);
    }

    #[tokio::test]
    async fn test_dropped_request_runs_hooks_as_failed() {
        let log = recorder();
        let mut ctx = RequestContext::new("objectPut");
        push_recording(&mut ctx, &log, "hook");
        drop(ctx);

        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        assert_eq!(*log.lock().unwrap(), vec!["hook:request aborted"]);
    }
}
