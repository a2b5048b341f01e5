use super::models::{CollectEvent, CollectRequest, Parameter};
use super::AnalyticsSink;
use crate::core::config::FirebaseOptions;
use crate::core::Error;
use reqwest::Client;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::policies::ExponentialBackoff;
use reqwest_retry::RetryTransientMiddleware;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;
use url::Url;

const MEASUREMENT_PROTOCOL_API: &str = "https://www.google-analytics.com/mp/collect";

/// Sends events to the Google Analytics Measurement Protocol for Firebase apps.
pub struct MeasurementProtocolSink {
    client: ClientWithMiddleware,
    endpoint: Url,
    app_instance_id: String,
    enabled: AtomicBool,
}

impl MeasurementProtocolSink {
    /// Creates a sink from the app's options.
    ///
    /// Requires `app_id`, `measurement_api_secret` and `app_instance_id`.
    pub fn new(options: &FirebaseOptions) -> Result<Self, Error> {
        let retry_policy = ExponentialBackoff::builder().build_with_max_retries(3);

        let client = ClientBuilder::new(Client::new())
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .build();

        Self::new_with_client(client, MEASUREMENT_PROTOCOL_API, options)
    }

    /// Creates a sink with a custom client and endpoint.
    /// Internal use only, primarily for testing.
    pub(crate) fn new_with_client(
        client: ClientWithMiddleware,
        endpoint: &str,
        options: &FirebaseOptions,
    ) -> Result<Self, Error> {
        let app_id = FirebaseOptions::require(&options.app_id, "app_id")?;
        let api_secret =
            FirebaseOptions::require(&options.measurement_api_secret, "measurement_api_secret")?;
        let app_instance_id =
            FirebaseOptions::require(&options.app_instance_id, "app_instance_id")?.to_string();

        let mut endpoint = Url::parse(endpoint)
            .map_err(|e| Error::Config(format!("invalid analytics endpoint: {}", e)))?;
        endpoint
            .query_pairs_mut()
            .append_pair("firebase_app_id", app_id)
            .append_pair("api_secret", api_secret);

        Ok(Self {
            client,
            endpoint,
            app_instance_id,
            enabled: AtomicBool::new(false),
        })
    }

    pub fn is_collection_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    async fn send(&self, name: &str, parameters: &[Parameter]) -> Result<(), Error> {
        let body = CollectRequest {
            app_instance_id: &self.app_instance_id,
            events: vec![CollectEvent::new(name, parameters)],
        };

        let response = self
            .client
            .post(self.endpoint.clone())
            .json(&body)
            .send()
            .await?;

        if response.status().is_success() {
            Ok(())
        } else {
            let code = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            Err(Error::Api { code, message })
        }
    }
}

#[async_trait::async_trait]
impl AnalyticsSink for MeasurementProtocolSink {
    fn set_analytics_collection_enabled(&self, enabled: bool) -> anyhow::Result<()> {
        self.enabled.store(enabled, Ordering::Release);
        Ok(())
    }

    async fn log_event(&self, name: &str, parameters: &[Parameter]) -> anyhow::Result<()> {
        if !self.is_collection_enabled() {
            debug!(event = name, "Analytics collection disabled, dropping event");
            return Ok(());
        }
        self.send(name, parameters).await?;
        Ok(())
    }
}
