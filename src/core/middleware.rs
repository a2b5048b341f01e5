use http::Extensions;
use reqwest::{header, Request, Response};
use reqwest_middleware::{Middleware, Next};

const API_KEY_HEADER: &str = "x-goog-api-key";

/// Attaches the Firebase web API key to every outgoing request.
#[derive(Clone)]
pub struct ApiKeyMiddleware {
    api_key: String,
}

impl ApiKeyMiddleware {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
        }
    }
}

#[async_trait::async_trait]
impl Middleware for ApiKeyMiddleware {
    async fn handle(
        &self,
        mut req: Request,
        extensions: &mut Extensions,
        next: Next<'_>,
    ) -> reqwest_middleware::Result<Response> {
        let value = header::HeaderValue::from_str(&self.api_key).map_err(|e| {
            reqwest_middleware::Error::Middleware(anyhow::anyhow!("Invalid API key header: {}", e))
        })?;

        req.headers_mut().insert(API_KEY_HEADER, value);

        next.run(req, extensions).await
    }
}
