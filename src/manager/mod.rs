//! The initialization coordinator and its public façade.
//!
//! A [`FirebaseManager`] owns the lifecycle [`Status`] of one Firebase session.
//! [`FirebaseManager::init`] runs the startup sequence:
//!
//! 1. ask the [`DependencyChecker`] whether Firebase is usable,
//! 2. enable analytics collection,
//! 3. push in-app remote-config defaults, if any were given,
//!
//! and every step is bounded by a timeout from [`ManagerConfig`]. Failures are
//! logged and absorbed: callers see them only through [`FirebaseManager::status`]
//! or through the defaults handed back by the accessors.
//!
//! # Examples
//!
//! ```rust,no_run
//! # use firebase_manager::{FirebaseManager, Primitive};
//! # use std::collections::HashMap;
//! # async fn run(manager: FirebaseManager) {
//! let mut defaults = HashMap::new();
//! defaults.insert("testBool".to_string(), Primitive::from(false));
//! manager.init(Some(defaults)).await;
//!
//! manager
//!     .fetch_remote_data(|| println!("remote values activated"))
//!     .await;
//! let enabled = manager.get_bool("testBool", false);
//! # }
//! ```

use crate::analytics::models::AnalyticsEvent;
use crate::analytics::AnalyticsSink;
use crate::app::{DependencyChecker, DependencyStatus};
use crate::core::config::ManagerConfig;
use crate::core::status::{Status, StatusCell};
use crate::core::{Error, Primitive};
use crate::remote_config::{FromConfigValue, RemoteConfigStore};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

/// Coordinates Firebase startup and fronts Analytics and Remote Config.
pub struct FirebaseManager {
    dependencies: Arc<dyn DependencyChecker>,
    analytics: Arc<dyn AnalyticsSink>,
    remote_config: Arc<dyn RemoteConfigStore>,
    config: ManagerConfig,
    status: StatusCell,
}

impl FirebaseManager {
    /// Creates a manager over the given collaborators. Nothing is called until
    /// [`FirebaseManager::init`].
    pub fn new(
        dependencies: Arc<dyn DependencyChecker>,
        analytics: Arc<dyn AnalyticsSink>,
        remote_config: Arc<dyn RemoteConfigStore>,
        config: ManagerConfig,
    ) -> Self {
        Self {
            dependencies,
            analytics,
            remote_config,
            config,
            status: StatusCell::new(),
        }
    }

    /// Timeouts and flags this manager was built with.
    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    /// The status of the most recent initialization attempt.
    pub fn status(&self) -> Status {
        self.status.get()
    }

    /// Whether the last attempt reached `Initialized`.
    pub fn is_initialized(&self) -> bool {
        self.status() == Status::Initialized
    }

    /// Returns a receiver that observes every status change.
    pub fn subscribe(&self) -> watch::Receiver<Status> {
        self.status.subscribe()
    }

    /// Waits until no initialization attempt is in flight.
    ///
    /// Returns the settled status, or `None` if `limit` elapsed first.
    pub async fn wait_until_settled(&self, limit: Duration) -> Option<Status> {
        let mut rx = self.subscribe();
        let settled = match timeout(limit, rx.wait_for(|s| !s.is_transient())).await {
            Ok(Ok(status)) => Some(*status),
            _ => None,
        };
        settled
    }

    /// Runs the initialization sequence and returns the status it settles on.
    ///
    /// A call made while another attempt is `Initializing` is dropped and
    /// returns `Initializing` without touching any collaborator.
    ///
    /// A call accepted later (for example while defaults are being pushed)
    /// supersedes this one: from then on this attempt stops writing the status
    /// and returns whatever the newer attempt has reached.
    pub async fn init(&self, defaults: Option<HashMap<String, Primitive>>) -> Status {
        let Some(generation) = self.status.try_begin() else {
            debug!("Firebase initialization already in progress, ignoring request");
            return Status::Initializing;
        };

        if let Err(e) = self.check_dependencies().await {
            error!(error = %e, "Firebase initialization failed");
            return self.advance(generation, Status::InitializeFailed);
        }
        self.advance(generation, Status::DependenciesAvailable);

        self.enable_analytics();

        if let Some(defaults) = defaults.filter(|d| !d.is_empty()) {
            self.push_remote_defaults(generation, &defaults).await;
        }

        self.advance(generation, Status::Initialized)
    }

    /// Moves attempt `generation` to `next`, unless a newer attempt has started.
    ///
    /// Returns the resulting status.
    fn advance(&self, generation: u64, next: Status) -> Status {
        if !self.status.set_if_current(generation, next) && self.status.generation() != generation {
            debug!(
                generation,
                status = %next,
                "Superseded initialization attempt, status left as is"
            );
        }
        self.status()
    }

    async fn check_dependencies(&self) -> Result<(), Error> {
        let limit = self.config.dependency_check_timeout();
        match timeout(limit, self.dependencies.check_dependencies()).await {
            Ok(Ok(DependencyStatus::Available)) => {
                info!(result = %DependencyStatus::Available, "Firebase dependency check");
                Ok(())
            }
            Ok(Ok(other)) => Err(Error::DependencyCheckFailed(other.to_string())),
            Ok(Err(e)) => Err(Error::DependencyCheckFailed(e.to_string())),
            Err(_) => Err(Error::DependencyCheckTimedOut(limit)),
        }
    }

    fn enable_analytics(&self) {
        let enabled = self.config.analytics_collection_enabled;
        info!("Firebase Analytics initializing");
        match self.analytics.set_analytics_collection_enabled(enabled) {
            Ok(()) => info!(collection_enabled = enabled, "Firebase Analytics initialized"),
            Err(e) => {
                let e = Error::AnalyticsEnableFailed(format!("{:#}", e));
                error!(error = %e, "Firebase Analytics initialization failed");
            }
        }
    }

    async fn push_remote_defaults(&self, generation: u64, defaults: &HashMap<String, Primitive>) {
        self.advance(generation, Status::FetchingRemoteDefaults);
        info!(keys = defaults.len(), "Firebase Remote Config initializing");

        let limit = self.config.remote_defaults_timeout();
        match timeout(limit, self.remote_config.set_defaults(defaults)).await {
            Ok(Ok(())) => {
                self.advance(generation, Status::RemoteDefaultsFetched);
                info!("Firebase Remote Config initialized");
            }
            Ok(Err(e)) => {
                let e = Error::RemoteDefaultsSetFailed(format!("{:#}", e));
                error!(error = %e, "Firebase Remote Config initialization failed");
            }
            Err(_) => {
                let e = Error::Timeout {
                    operation: "setting remote defaults",
                    after: limit,
                };
                error!(error = %e, "Firebase Remote Config initialization failed");
            }
        }
    }

    /// Logs an analytics event.
    ///
    /// Names longer than 31 characters keep their first 32 characters, and
    /// names and parameter keys are lower-cased. Boolean parameters are not
    /// supported by analytics and are dropped.
    pub async fn log_event(&self, name: &str, parameters: Option<Vec<(String, Primitive)>>) {
        if !self.is_initialized() {
            warn!(
                event = name,
                status = %self.status(),
                "Firebase not initialized, event not logged"
            );
            return;
        }

        let Some(event) = AnalyticsEvent::new(name, parameters.unwrap_or_default()) else {
            warn!("Analytics event name is empty, event not logged");
            return;
        };

        match self.analytics.log_event(&event.name, &event.parameters).await {
            Ok(()) => debug!(
                event = %event.name,
                parameters = event.parameters.len(),
                "Analytics event logged"
            ),
            Err(e) => error!(event = %event.name, error = %e, "Failed to log analytics event"),
        }
    }

    /// Reads a remote value, falling back to `default` when the manager is not
    /// initialized, the key is unknown, or the stored value does not convert.
    pub fn get_value<T: FromConfigValue>(&self, key: &str, default: T) -> T {
        if !self.is_initialized() {
            warn!(
                key,
                status = %self.status(),
                "Firebase not initialized, using default remote value"
            );
            return default;
        }

        match self.read_value(key) {
            Ok(Some(value)) => value,
            Ok(None) => default,
            Err(e) => {
                warn!(error = %e, "Using default remote value");
                default
            }
        }
    }

    fn read_value<T: FromConfigValue>(&self, key: &str) -> Result<Option<T>, Error> {
        if !self.remote_config.has_key(key) {
            return Ok(None);
        }
        let failed = |reason: String| Error::RemoteValueReadFailed {
            key: key.to_string(),
            reason,
        };
        let value = self
            .remote_config
            .get_value(key)
            .map_err(|e| failed(format!("{:#}", e)))?;
        T::from_config_value(&value)
            .map(Some)
            .map_err(|e| failed(e.to_string()))
    }

    /// Reads a boolean; see [`FirebaseManager::get_value`].
    pub fn get_bool(&self, key: &str, default: bool) -> bool {
        self.get_value(key, default)
    }

    /// Reads a 32-bit integer, truncated from the stored 64-bit value.
    pub fn get_int(&self, key: &str, default: i32) -> i32 {
        self.get_value(key, default)
    }

    /// Reads a 64-bit integer.
    pub fn get_long(&self, key: &str, default: i64) -> i64 {
        self.get_value(key, default)
    }

    /// Reads a float. Invariant `.`-decimal text is tried first, then the
    /// store's own numeric reading.
    pub fn get_float(&self, key: &str, default: f32) -> f32 {
        self.get_value(key, default)
    }

    /// Reads a double with the same fallback as [`FirebaseManager::get_float`].
    pub fn get_double(&self, key: &str, default: f64) -> f64 {
        self.get_value(key, default)
    }

    /// Reads the raw text of a value.
    pub fn get_string(&self, key: &str, default: &str) -> String {
        self.get_value(key, default.to_string())
    }

    /// Fetches and activates remote values using the configured cache expiration.
    ///
    /// See [`FirebaseManager::fetch_remote_data_with_expiration`].
    pub async fn fetch_remote_data<F>(&self, on_complete: F) -> bool
    where
        F: FnOnce(),
    {
        let hours = self.config.default_cache_expiration_hours;
        self.fetch_remote_data_with_expiration(on_complete, hours)
            .await
    }

    /// Fetches remote values no older than `cache_expiration_hours`, activates
    /// them, then calls `on_complete`.
    ///
    /// `on_complete` is not called when the fetch is unsuccessful or activation
    /// fails. Returns whether it was called.
    pub async fn fetch_remote_data_with_expiration<F>(
        &self,
        on_complete: F,
        cache_expiration_hours: u32,
    ) -> bool
    where
        F: FnOnce(),
    {
        if !self.is_initialized() {
            warn!(status = %self.status(), "Firebase not initialized, remote fetch skipped");
            return false;
        }

        let max_age = Duration::from_secs(u64::from(cache_expiration_hours) * 3600);
        let limit = self.config.fetch_timeout();
        match timeout(limit, self.remote_config.fetch(max_age)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => error!(error = %e, "Remote config fetch failed"),
            Err(_) => {
                let e = Error::Timeout {
                    operation: "fetching remote values",
                    after: limit,
                };
                error!(error = %e, "Remote config fetch failed");
                return false;
            }
        }

        let info = self.remote_config.info();
        if !info.succeeded() {
            let e = Error::RemoteFetchUnsuccessful(format!("{:?}", info.last_fetch_status));
            warn!(error = %e, "Remote values not activated");
            return false;
        }

        let limit = self.config.activate_timeout();
        match timeout(limit, self.remote_config.activate()).await {
            Ok(Ok(changed)) => {
                info!(changed, fetched_at = ?info.last_successful_fetch, "Remote config activated");
                on_complete();
                true
            }
            Ok(Err(e)) => {
                error!(error = %e, "Remote config activation failed");
                false
            }
            Err(_) => {
                let e = Error::Timeout {
                    operation: "activating remote values",
                    after: limit,
                };
                error!(error = %e, "Remote config activation failed");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests;
