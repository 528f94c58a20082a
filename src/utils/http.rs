// src/utils/http.rs

//! HTTP client utilities.

use crate::error::Result;
use crate::models::ApiConfig;

/// Create the shared asynchronous HTTP client.
///
/// The client holds the connection pool and is cloned into every fetcher.
pub fn create_async_client(config: &ApiConfig) -> Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .user_agent(&config.user_agent)
        .timeout(config.timeout())
        .pool_max_idle_per_host(10)
        .build()?;
    Ok(client)
}

/// Join a resource path onto an API endpoint and append query parameters.
pub fn resource_url(endpoint: &str, resource: &str, params: &[(&str, String)]) -> Result<url::Url> {
    let base = format!("{}/{}", endpoint.trim_end_matches('/'), resource);
    Ok(url::Url::parse_with_params(&base, params)?)
}
