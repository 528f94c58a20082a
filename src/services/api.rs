// src/services/api.rs

//! Resource API client.
//!
//! `ResourceApi` is the seam between the fetchers and the network. The
//! production implementation issues bearer-authenticated GET requests with
//! a bounded timeout; tests substitute an in-memory fake.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::ACCEPT;
use serde::de::DeserializeOwned;
use url::Url;

use crate::error::{AppError, Result};
use crate::models::{ApiConfig, Location, Station};
use crate::services::auth::TokenProvider;
use crate::utils::http::{create_async_client, resource_url};

/// Read access to the location and station resources.
#[async_trait]
pub trait ResourceApi: Send + Sync {
    /// All locations, with names in `language`.
    async fn locations(&self, language: &str) -> Result<Vec<Location>>;

    /// Detail of one station, with name and address in `language`.
    async fn station(&self, station_id: i64, language: &str) -> Result<Station>;
}

/// `ResourceApi` over HTTP.
pub struct HttpResourceApi {
    client: Client,
    endpoint: String,
    timeout: Duration,
    auth: Option<TokenProvider>,
}

impl HttpResourceApi {
    /// Build a client from configuration, authenticating when credentials are set.
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let client = create_async_client(config)?;
        Ok(Self::with_client(client, config))
    }

    /// Use an existing HTTP client and its connection pool.
    pub fn with_client(client: Client, config: &ApiConfig) -> Self {
        let auth = config
            .has_credentials()
            .then(|| TokenProvider::new(client.clone(), config));

        if auth.is_none() {
            log::warn!("No client credentials configured, calling the API unauthenticated");
        }

        Self {
            client,
            endpoint: config.endpoint.clone(),
            timeout: config.timeout(),
            auth,
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        log::debug!("GET {}", url);

        let mut request = self
            .client
            .get(url.clone())
            .header(ACCEPT, "application/json")
            .timeout(self.timeout);
        if let Some(auth) = &self.auth {
            request = request.bearer_auth(auth.bearer().await?);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(AppError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| AppError::decode(url.as_str(), e))
    }
}

#[async_trait]
impl ResourceApi for HttpResourceApi {
    async fn locations(&self, language: &str) -> Result<Vec<Location>> {
        let url = resource_url(
            &self.endpoint,
            "resources/locations",
            &[("languageID", language.to_string())],
        )?;
        self.get_json(url).await
    }

    async fn station(&self, station_id: i64, language: &str) -> Result<Station> {
        let url = resource_url(
            &self.endpoint,
            "resources/station",
            &[
                ("languageID", language.to_string()),
                ("stationID", station_id.to_string()),
            ],
        )?;
        self.get_json(url).await
    }
}
