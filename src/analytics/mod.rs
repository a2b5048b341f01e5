//! Firebase Analytics module.
//!
//! [`AnalyticsSink`] is the seam to whatever actually transports events. With
//! the `analytics` feature the crate ships [`MeasurementProtocolSink`], which
//! posts events to the Google Analytics Measurement Protocol.

pub mod models;

#[cfg(feature = "analytics")]
pub mod measurement_protocol;

#[cfg(feature = "analytics")]
pub use measurement_protocol::MeasurementProtocolSink;

use models::Parameter;

/// Receives analytics events.
#[async_trait::async_trait]
pub trait AnalyticsSink: Send + Sync {
    /// Turns collection on or off. Events logged while disabled are discarded.
    fn set_analytics_collection_enabled(&self, enabled: bool) -> anyhow::Result<()>;

    /// Logs an event. `parameters` is empty for a bare event.
    async fn log_event(&self, name: &str, parameters: &[Parameter]) -> anyhow::Result<()>;
}
