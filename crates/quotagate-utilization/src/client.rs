//! Utilization service client with availability tracking.
//!
//! The client starts out disabled. A health-check loop flips it on after
//! the first successful check and back off whenever a check fails or the
//! service reports data older than the staleness window. Evaluations read
//! the flag without blocking.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::Utc;
use tokio::task::JoinHandle;
use tokio::time;
use tracing::{debug, info, warn};

use quotagate_core::config::AppConfig;
use quotagate_core::error::AppError;
use quotagate_core::result::AppResult;
use quotagate_core::traits::reporter::MetricsReporter;
use quotagate_core::traits::utilization::{UtilizationBackend, UtilizationServiceClient};
use quotagate_core::types::metric::{MetricsRequestBody, ResourceType, UtilizationMetric};

/// Timing settings of a [`UtilizationClient`].
#[derive(Debug, Clone, Copy)]
pub struct ClientSettings {
    /// Age after which data is no longer trusted.
    pub max_staleness: Duration,
    /// Deadline for one remote call.
    pub request_timeout: Duration,
    /// Interval between health checks.
    pub health_check_interval: Duration,
}

impl ClientSettings {
    /// Derive settings from application configuration.
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            max_staleness: config.quota.max_staleness(),
            request_timeout: config.utilization.request_timeout(),
            health_check_interval: config.utilization.health_check_interval(),
        }
    }
}

/// Client for the utilization service.
///
/// Cheap to clone; all clones share the availability flag and the
/// health-check loop.
#[derive(Debug, Clone)]
pub struct UtilizationClient {
    inner: Arc<ClientState>,
}

#[derive(Debug)]
struct ClientState {
    backend: Arc<dyn UtilizationBackend>,
    reporter: Arc<dyn MetricsReporter>,
    settings: ClientSettings,
    enabled: AtomicBool,
    health_task: Mutex<Option<JoinHandle<()>>>,
}

impl UtilizationClient {
    /// Create a client around `backend`. The client is disabled until a
    /// health check succeeds.
    pub fn new(
        backend: Arc<dyn UtilizationBackend>,
        reporter: Arc<dyn MetricsReporter>,
        settings: ClientSettings,
    ) -> Self {
        Self {
            inner: Arc::new(ClientState {
                backend,
                reporter,
                settings,
                enabled: AtomicBool::new(false),
                health_task: Mutex::new(None),
            }),
        }
    }

    /// The wrapped backend.
    pub fn backend(&self) -> &Arc<dyn UtilizationBackend> {
        &self.inner.backend
    }

    /// Whether a health-check loop is currently running.
    pub fn is_health_check_running(&self) -> bool {
        self.inner
            .health_task()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }
}

impl ClientState {
    fn health_task(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.health_task
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    async fn run_health_check(&self) -> bool {
        let checked = match time::timeout(self.settings.request_timeout, self.backend.health_check())
            .await
        {
            Ok(Ok(status)) if status.is_stale(self.settings.max_staleness, Utc::now()) => Err(
                AppError::service_unavailable("Utilization data is stale, disabling quotas"),
            ),
            Ok(result) => result.map(|_| ()),
            Err(_) => Err(AppError::timeout(format!(
                "Health check did not answer within {:?}",
                self.settings.request_timeout
            ))),
        };

        match checked {
            Ok(()) => {
                if !self.enabled.swap(true, Ordering::SeqCst) {
                    info!(
                        backend = self.backend.backend_type(),
                        "Utilization service is available"
                    );
                }
                self.reporter.set_utilization_service_available(true);
                true
            }
            Err(e) => {
                if self.enabled.swap(false, Ordering::SeqCst) {
                    warn!(
                        backend = self.backend.backend_type(),
                        error = %e,
                        "Utilization service is unavailable, quotas will not be enforced"
                    );
                }
                self.reporter.set_utilization_service_available(false);
                false
            }
        }
    }
}

/// Health-check loop. Holds a weak reference so that dropping every
/// client handle ends the loop.
async fn health_check_loop(state: Weak<ClientState>, interval: Duration) {
    let mut ticker = time::interval(interval);
    ticker.set_missed_tick_behavior(time::MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        let Some(state) = state.upgrade() else {
            break;
        };
        state.run_health_check().await;
    }

    debug!("Utilization health-check loop ended");
}

#[async_trait]
impl UtilizationServiceClient for UtilizationClient {
    fn is_enabled(&self) -> bool {
        self.inner.enabled.load(Ordering::SeqCst)
    }

    fn max_staleness(&self) -> Duration {
        self.inner.settings.max_staleness
    }

    async fn get_utilization_metrics(
        &self,
        resource_type: ResourceType,
        resource_name: &str,
        body: &MetricsRequestBody,
    ) -> AppResult<UtilizationMetric> {
        let state = &self.inner;
        let started = Instant::now();

        let result = match time::timeout(
            state.settings.request_timeout,
            state
                .backend
                .get_latest_metrics(resource_type, resource_name, body),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(AppError::timeout(format!(
                "Utilization metrics for {resource_type} '{resource_name}' did not arrive within {:?}",
                state.settings.request_timeout
            ))),
        };

        let code = match &result {
            Ok(_) => 200,
            Err(e) => e.metric_code(),
        };
        state
            .reporter
            .observe_utilization_retrieval(code, resource_type.as_str(), started.elapsed());

        result
    }

    async fn check_health(&self) -> bool {
        self.inner.run_health_check().await
    }

    fn start(&self) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!("No async runtime available, utilization health checks not started");
            return;
        };

        let mut task = self.inner.health_task();
        if let Some(previous) = task.take() {
            previous.abort();
        }

        let interval = self.inner.settings.health_check_interval;
        *task = Some(runtime.spawn(health_check_loop(Arc::downgrade(&self.inner), interval)));
        info!(?interval, "Utilization health checks started");
    }

    fn stop(&self) {
        if let Some(task) = self.inner.health_task().take() {
            task.abort();
            info!("Utilization health checks stopped");
        }
    }
}

impl Drop for ClientState {
    fn drop(&mut self) {
        if let Some(task) = self.health_task().take() {
            task.abort();
        }
    }
}
