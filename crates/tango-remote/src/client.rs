use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{RequestBuilder, Response};
use serde::de::DeserializeOwned;
use tango_config::backend::BackendConfig;
use tango_core::{Classification, Classifier, EnrichError, ImageSearch};
use tango_types::{ImageRef, TermFields};

use crate::wire::{DetectRequest, DetectResponse, ImageSearchResponse, request_error, status_error};

/// REST backend client implementing both enrichment collaborators
#[derive(Clone)]
pub struct BackendClient {
    config: BackendConfig,
    client: reqwest::Client,
}

impl BackendClient {
    pub fn new(config: BackendConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self { config, client })
    }

    /// Check if the backend answers at all
    pub async fn check_connection(&self) -> Result<()> {
        let response = self
            .authorized(self.client.get(self.config.endpoint("health")))
            .send()
            .await
            .context("Failed to reach backend")?;

        if let Some(err) = status_error(response.status()) {
            anyhow::bail!("Backend health check failed: {err}");
        }
        Ok(())
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        if self.config.api_token.is_empty() {
            request
        } else {
            request.bearer_auth(&self.config.api_token)
        }
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, EnrichError> {
        let response: Response = self.authorized(request).send().await.map_err(request_error)?;

        if let Some(err) = status_error(response.status()) {
            tracing::debug!("[REMOTE] {} -> {err}", response.url());
            return Err(err);
        }

        response.json::<T>().await.map_err(request_error)
    }
}

#[async_trait]
impl Classifier for BackendClient {
    async fn classify(&self, fields: &TermFields) -> Result<Classification, EnrichError> {
        let request = self
            .client
            .post(self.config.endpoint("flashcards/detect"))
            .json(&DetectRequest::from(fields));

        let response: DetectResponse = self.send_json(request).await?;
        Ok(response.into_classification(&fields.head))
    }
}

#[async_trait]
impl ImageSearch for BackendClient {
    async fn search_image(&self, fields: &TermFields) -> Result<ImageRef, EnrichError> {
        let request = self
            .client
            .get(self.config.endpoint("images/search"))
            .query(&[("q", fields.head.as_str())]);

        let response: ImageSearchResponse = self.send_json(request).await?;
        response.into_image(&fields.head)
    }
}

#[cfg(test)]
mod tests {
    use axum::Router;
    use axum::extract::Query;
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::{get, post};
    use axum::Json;
    use serde_json::{Value, json};
    use std::collections::HashMap;
    use tango_types::Category;

    use super::*;

    async fn serve(app: Router) -> BackendConfig {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        BackendConfig {
            enabled: true,
            base_url: format!("http://{addr}/api"),
            api_token: "secret".to_string(),
            timeout_seconds: 5,
        }
    }

    #[tokio::test]
    async fn classifies_through_detect_endpoint() {
        let app = Router::new().route(
            "/api/flashcards/detect",
            post(|headers: HeaderMap, Json(body): Json<Value>| async move {
                let auth = headers
                    .get("authorization")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or_default()
                    .to_string();
                if auth != "Bearer secret" {
                    return (StatusCode::UNAUTHORIZED, Json(json!({})));
                }
                let reading = if body["term"] == "猫" { "ねこ" } else { "" };
                (StatusCode::OK, Json(json!({"category": "vocabulary", "reading": reading})))
            }),
        );
        let client = BackendClient::new(serve(app).await).unwrap();

        let out = client.classify(&TermFields::new("猫")).await.unwrap();
        assert_eq!(out.category, Category::Vocabulary);
        assert_eq!(out.fields.head, "猫");
        assert_eq!(out.fields.reading.as_deref(), Some("ねこ"));
    }

    #[tokio::test]
    async fn maps_error_statuses() {
        let app = Router::new()
            .route(
                "/api/flashcards/detect",
                post(|| async { StatusCode::TOO_MANY_REQUESTS }),
            )
            .route("/api/images/search", get(|| async { StatusCode::FORBIDDEN }));
        let client = BackendClient::new(serve(app).await).unwrap();

        assert_eq!(
            client.classify(&TermFields::new("猫")).await,
            Err(EnrichError::RateLimited)
        );
        assert_eq!(
            client.search_image(&TermFields::new("猫")).await,
            Err(EnrichError::Unauthorized)
        );
    }

    #[tokio::test]
    async fn searches_images_by_head() {
        let app = Router::new().route(
            "/api/images/search",
            get(|Query(query): Query<HashMap<String, String>>| async move {
                let images = match query.get("q").map(String::as_str) {
                    Some("猫") => json!([{"url": "https://img/cat.png"}]),
                    _ => json!([]),
                };
                Json(json!({ "images": images }))
            }),
        );
        let client = BackendClient::new(serve(app).await).unwrap();

        let image = client.search_image(&TermFields::new("猫")).await.unwrap();
        assert_eq!(image.url, "https://img/cat.png");

        assert_eq!(
            client.search_image(&TermFields::new("犬")).await,
            Err(EnrichError::NotFound("犬".to_string()))
        );
    }

    #[tokio::test]
    async fn unreachable_backend_is_a_network_error() {
        let config = BackendConfig {
            base_url: "http://127.0.0.1:9/api".to_string(),
            timeout_seconds: 1,
            ..Default::default()
        };
        let client = BackendClient::new(config).unwrap();

        let err = client.classify(&TermFields::new("猫")).await.unwrap_err();
        assert!(err.is_transient(), "{err:?}");
        assert!(client.check_connection().await.is_err());
    }
}
