pub mod analytics;
pub mod app;
pub mod core;
pub mod manager;
pub mod remote_config;

pub use crate::core::config::{FirebaseOptions, ManagerConfig};
pub use crate::core::status::Status;
pub use crate::core::{Error, Primitive};
pub use manager::FirebaseManager;

#[cfg(all(feature = "analytics", feature = "remote_config"))]
impl FirebaseManager {
    /// Builds a manager that talks to Firebase over HTTP.
    ///
    /// Dependencies are checked against `options`, analytics go through the
    /// Measurement Protocol, and remote values are fetched from the Remote Config
    /// REST endpoint.
    pub fn from_options(options: FirebaseOptions, config: ManagerConfig) -> Result<Self, Error> {
        use crate::analytics::MeasurementProtocolSink;
        use crate::app::OptionsDependencyChecker;
        use crate::remote_config::{LayeredRemoteConfig, RestFetchSource};
        use std::sync::Arc;

        let analytics = MeasurementProtocolSink::new(&options)?;
        let remote_config = LayeredRemoteConfig::new(RestFetchSource::new(&options)?);

        Ok(Self::new(
            Arc::new(OptionsDependencyChecker::new(options)),
            Arc::new(analytics),
            Arc::new(remote_config),
            config,
        ))
    }
}
