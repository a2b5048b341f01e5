//! Configuration for the manager and for the bundled HTTP adapters.
//!
//! Both structs deserialize from JSON with every field optional, so a partial
//! file only overrides what it names.
//!
//! ```json
//! {
//!   "dependency_check_timeout_secs": 10,
//!   "remote_defaults_timeout_secs": 10,
//!   "default_cache_expiration_hours": 12
//! }
//! ```

use super::Error;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_CACHE_EXPIRATION_HOURS: u32 = 12;

/// Tuning knobs for [`crate::FirebaseManager`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManagerConfig {
    pub dependency_check_timeout_secs: u64,
    pub remote_defaults_timeout_secs: u64,
    pub fetch_timeout_secs: u64,
    pub activate_timeout_secs: u64,
    pub default_cache_expiration_hours: u32,
    /// Value passed to the analytics sink once dependencies are available.
    pub analytics_collection_enabled: bool,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            dependency_check_timeout_secs: 30,
            remote_defaults_timeout_secs: 30,
            fetch_timeout_secs: 60,
            activate_timeout_secs: 30,
            default_cache_expiration_hours: DEFAULT_CACHE_EXPIRATION_HOURS,
            analytics_collection_enabled: true,
        }
    }
}

impl ManagerConfig {
    pub fn dependency_check_timeout(&self) -> Duration {
        Duration::from_secs(self.dependency_check_timeout_secs)
    }

    pub fn remote_defaults_timeout(&self) -> Duration {
        Duration::from_secs(self.remote_defaults_timeout_secs)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn activate_timeout(&self) -> Duration {
        Duration::from_secs(self.activate_timeout_secs)
    }
}

/// Identifies the Firebase app the HTTP adapters talk to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FirebaseOptions {
    pub project_id: Option<String>,
    /// Google App ID, e.g. `1:1234567890:android:321abc456def7890`.
    pub app_id: Option<String>,
    pub api_key: Option<String>,
    /// Measurement Protocol API secret, required to send analytics over HTTP.
    pub measurement_api_secret: Option<String>,
    /// Identifies this installation to Analytics and Remote Config.
    pub app_instance_id: Option<String>,
}

impl FirebaseOptions {
    /// Returns a required field, or a configuration error naming it.
    pub(crate) fn require<'a>(
        field: &'a Option<String>,
        name: &'static str,
    ) -> Result<&'a str, Error> {
        field
            .as_deref()
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| Error::Config(format!("`{}` is missing", name)))
    }
}

/// Reads a [`ManagerConfig`] from a JSON file.
pub async fn read_manager_config<P: AsRef<Path>>(path: P) -> Result<ManagerConfig, Error> {
    let contents = tokio::fs::read(path).await?;
    Ok(serde_json::from_slice(&contents)?)
}

/// Reads [`FirebaseOptions`] from a JSON file.
pub async fn read_firebase_options<P: AsRef<Path>>(path: P) -> Result<FirebaseOptions, Error> {
    let contents = tokio::fs::read(path).await?;
    Ok(serde_json::from_slice(&contents)?)
}
