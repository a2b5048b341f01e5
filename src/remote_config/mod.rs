//! Firebase Remote Config module.
//!
//! [`RemoteConfigStore`] is the seam to the config store. Values live in three
//! layers: in-app defaults, freshly fetched values, and activated values. A
//! fetch only becomes visible to readers once it is activated.
//!
//! [`LayeredRemoteConfig`] keeps those layers in memory and delegates the
//! network round-trip to a [`FetchSource`]. With the `remote_config` feature
//! the crate ships [`RestFetchSource`], which calls the client-side fetch
//! endpoint.

pub mod models;

#[cfg(feature = "remote_config")]
pub mod rest;

#[cfg(feature = "remote_config")]
pub use rest::RestFetchSource;

use crate::core::{Error, Primitive};
use chrono::Utc;
use models::{ConfigValue, FetchInfo, LastFetchStatus, ValueSource};
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};
use std::time::Duration;
use tracing::debug;

/// The external key/value store behind the manager's typed accessors.
#[async_trait::async_trait]
pub trait RemoteConfigStore: Send + Sync {
    /// Replaces the in-app default layer.
    async fn set_defaults(&self, defaults: &HashMap<String, Primitive>) -> anyhow::Result<()>;

    /// Fetches values unless the last successful fetch is younger than `max_age`.
    async fn fetch(&self, max_age: Duration) -> anyhow::Result<()>;

    /// Makes the fetched values visible. Returns whether anything changed.
    async fn activate(&self) -> anyhow::Result<bool>;

    fn info(&self) -> FetchInfo;

    fn has_key(&self, key: &str) -> bool;

    fn get_value(&self, key: &str) -> anyhow::Result<ConfigValue>;
}

/// Conversion from a stored value into a caller-facing type.
pub trait FromConfigValue: Sized {
    fn from_config_value(value: &ConfigValue) -> Result<Self, Error>;
}

impl FromConfigValue for bool {
    fn from_config_value(value: &ConfigValue) -> Result<Self, Error> {
        value.as_bool()
    }
}

impl FromConfigValue for i64 {
    fn from_config_value(value: &ConfigValue) -> Result<Self, Error> {
        value.as_i64()
    }
}

impl FromConfigValue for i32 {
    fn from_config_value(value: &ConfigValue) -> Result<Self, Error> {
        // Truncates like a C-style cast.
        Ok(value.as_i64()? as i32)
    }
}

impl FromConfigValue for f64 {
    fn from_config_value(value: &ConfigValue) -> Result<Self, Error> {
        match value.raw().parse::<f64>() {
            Ok(parsed) => Ok(parsed),
            Err(_) => value.as_f64(),
        }
    }
}

impl FromConfigValue for f32 {
    fn from_config_value(value: &ConfigValue) -> Result<Self, Error> {
        f64::from_config_value(value).map(|v| v as f32)
    }
}

impl FromConfigValue for String {
    fn from_config_value(value: &ConfigValue) -> Result<Self, Error> {
        Ok(value.as_string())
    }
}

/// Where fetched values come from.
#[async_trait::async_trait]
pub trait FetchSource: Send + Sync {
    /// Returns the fresh entries, or `None` when the template has not changed
    /// since the last fetch.
    async fn fetch_entries(&self) -> anyhow::Result<Option<HashMap<String, String>>>;
}

#[derive(Debug, Default)]
struct Layers {
    defaults: HashMap<String, String>,
    fetched: Option<HashMap<String, String>>,
    activated: HashMap<String, String>,
    info: FetchInfo,
}

/// In-memory layered store backed by a [`FetchSource`].
pub struct LayeredRemoteConfig<S> {
    source: S,
    layers: RwLock<Layers>,
}

impl<S: FetchSource> LayeredRemoteConfig<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            layers: RwLock::new(Layers::default()),
        }
    }

    fn is_cache_fresh(&self, max_age: Duration) -> bool {
        let layers = self.layers.read().unwrap_or_else(PoisonError::into_inner);
        match (layers.info.last_fetch_status, layers.info.last_successful_fetch) {
            (LastFetchStatus::Success, Some(at)) => match chrono::Duration::from_std(max_age) {
                Ok(max_age) => Utc::now() - at < max_age,
                Err(_) => true,
            },
            _ => false,
        }
    }
}

#[async_trait::async_trait]
impl<S: FetchSource> RemoteConfigStore for LayeredRemoteConfig<S> {
    async fn set_defaults(&self, defaults: &HashMap<String, Primitive>) -> anyhow::Result<()> {
        let mut layers = self.layers.write().unwrap_or_else(PoisonError::into_inner);
        layers.defaults = defaults
            .iter()
            .map(|(k, v)| (k.clone(), v.to_string()))
            .collect();
        Ok(())
    }

    async fn fetch(&self, max_age: Duration) -> anyhow::Result<()> {
        if self.is_cache_fresh(max_age) {
            debug!(?max_age, "Remote config cache still fresh, skipping fetch");
            return Ok(());
        }

        let result = self.source.fetch_entries().await;

        let mut layers = self.layers.write().unwrap_or_else(PoisonError::into_inner);
        match result {
            Ok(entries) => {
                if let Some(entries) = entries {
                    layers.fetched = Some(entries);
                }
                layers.info = FetchInfo {
                    last_fetch_status: LastFetchStatus::Success,
                    last_successful_fetch: Some(Utc::now()),
                };
                Ok(())
            }
            Err(e) => {
                layers.info.last_fetch_status = LastFetchStatus::Failure;
                Err(e)
            }
        }
    }

    async fn activate(&self) -> anyhow::Result<bool> {
        let mut layers = self.layers.write().unwrap_or_else(PoisonError::into_inner);
        match layers.fetched.take() {
            Some(fetched) => {
                let changed = fetched != layers.activated;
                layers.activated = fetched;
                Ok(changed)
            }
            None => Ok(false),
        }
    }

    fn info(&self) -> FetchInfo {
        self.layers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .info
    }

    fn has_key(&self, key: &str) -> bool {
        let layers = self.layers.read().unwrap_or_else(PoisonError::into_inner);
        layers.activated.contains_key(key) || layers.defaults.contains_key(key)
    }

    fn get_value(&self, key: &str) -> anyhow::Result<ConfigValue> {
        let layers = self.layers.read().unwrap_or_else(PoisonError::into_inner);
        let value = if let Some(raw) = layers.activated.get(key) {
            ConfigValue::new(raw.as_str(), ValueSource::Remote)
        } else if let Some(raw) = layers.defaults.get(key) {
            ConfigValue::new(raw.as_str(), ValueSource::Default)
        } else {
            ConfigValue::new("", ValueSource::Static)
        };
        Ok(value)
    }
}
