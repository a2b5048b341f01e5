use super::models::{FetchRequest, FetchResponse, FetchState};
use super::FetchSource;
use crate::core::config::FirebaseOptions;
use crate::core::middleware::ApiKeyMiddleware;
use crate::core::Error;
use reqwest::Client;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::policies::ExponentialBackoff;
use reqwest_retry::RetryTransientMiddleware;
use std::collections::HashMap;
use tracing::debug;

const REMOTE_CONFIG_API: &str = "https://firebaseremoteconfig.googleapis.com";

#[derive(Debug, serde::Deserialize)]
struct ApiError {
    code: u16,
    message: String,
}

#[derive(Debug, serde::Deserialize)]
struct ErrorWrapper {
    error: ApiError,
}

/// Fetches the app's Remote Config entries over the client-side REST endpoint.
pub struct RestFetchSource {
    client: ClientWithMiddleware,
    url: String,
    app_id: String,
    app_instance_id: String,
}

impl RestFetchSource {
    /// Creates a fetch source from the app's options.
    ///
    /// Requires `project_id`, `app_id`, `api_key` and `app_instance_id`.
    pub fn new(options: &FirebaseOptions) -> Result<Self, Error> {
        let api_key = FirebaseOptions::require(&options.api_key, "api_key")?;
        let retry_policy = ExponentialBackoff::builder().build_with_max_retries(3);

        let client = ClientBuilder::new(Client::new())
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .with(ApiKeyMiddleware::new(api_key))
            .build();

        Self::new_with_client(client, REMOTE_CONFIG_API, options)
    }

    /// Creates a fetch source with a custom client and base URL.
    /// Internal use only, primarily for testing.
    pub(crate) fn new_with_client(
        client: ClientWithMiddleware,
        base_url: &str,
        options: &FirebaseOptions,
    ) -> Result<Self, Error> {
        let project_id = FirebaseOptions::require(&options.project_id, "project_id")?;
        let app_id = FirebaseOptions::require(&options.app_id, "app_id")?.to_string();
        let app_instance_id =
            FirebaseOptions::require(&options.app_instance_id, "app_instance_id")?.to_string();

        let url = format!(
            "{}/v1/projects/{}/namespaces/firebase:fetch",
            base_url.trim_end_matches('/'),
            project_id
        );

        Ok(Self {
            client,
            url,
            app_id,
            app_instance_id,
        })
    }

    async fn request(&self) -> Result<FetchResponse, Error> {
        let body = FetchRequest {
            app_instance_id: &self.app_instance_id,
            app_id: &self.app_id,
        };

        let response = self.client.post(&self.url).json(&body).send().await?;

        if !response.status().is_success() {
            let code = response.status().as_u16();
            let text = response.text().await.unwrap_or_default();
            let message = match serde_json::from_str::<ErrorWrapper>(&text) {
                Ok(wrapper) => format!("{} (code: {})", wrapper.error.message, wrapper.error.code),
                Err(_) => text,
            };
            return Err(Error::Api { code, message });
        }

        Ok(response.json().await?)
    }
}

#[async_trait::async_trait]
impl FetchSource for RestFetchSource {
    async fn fetch_entries(&self) -> anyhow::Result<Option<HashMap<String, String>>> {
        let response = self.request().await?;
        debug!(state = ?response.state, entries = response.entries.len(), "Remote config fetched");

        match response.state {
            Some(FetchState::NoChange) => Ok(None),
            Some(FetchState::NoTemplate) | Some(FetchState::EmptyConfig) => {
                Ok(Some(HashMap::new()))
            }
            _ => Ok(Some(response.entries)),
        }
    }
}
