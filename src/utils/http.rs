//! Blocking HTTP client shared by the external service adapters
//!
//! Every call is bounded by the configured timeout and is never retried;
//! failures surface immediately as `DataService` errors.

use reqwest::blocking::Client;
use serde::de::DeserializeOwned;
use std::time::Duration;

use crate::error::{WalletError, WalletResult};

/// Thin wrapper around a pooled `reqwest` client
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    pub fn new(timeout: Duration) -> WalletResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(5)
            .user_agent("hotwallet-core/0.1")
            .build()
            .map_err(|e| WalletError::data_service(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client })
    }

    /// GET a URL and return the status code with the raw body
    pub fn get_raw(&self, url: &str) -> WalletResult<(u16, String)> {
        let response = self.client.get(url).send()?;
        let status = response.status().as_u16();
        let body = response.text()?;
        Ok((status, body))
    }

    /// GET a URL and decode a successful JSON body
    pub fn get_json<T: DeserializeOwned>(&self, url: &str) -> WalletResult<T> {
        let (status, body) = self.get_raw(url)?;
        if !(200..300).contains(&status) {
            return Err(WalletError::data_service(format!("HTTP {} from service", status))
                .with_details(truncate(&body, 200)));
        }
        Ok(serde_json::from_str(&body)?)
    }
}

/// Join a base URL and a path without doubling the separator
pub fn join_url(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}

fn truncate(body: &str, max: usize) -> String {
    body.chars().take(max).collect()
}
