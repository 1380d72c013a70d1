#![doc = "Cloudflare integration: zone lookup and hostname cache purges over the v4 REST API."]
//
//! # Cloudflare client
//!
//! Implements [`CachePurger`] against `https://api.cloudflare.com/client/v4`.
//! Authentication uses the legacy email + global API key header pair. The
//! credentials are an explicit [`CdnCredentials`] value: this module never
//! reads the process environment.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;

use crate::contract::CachePurger;
use crate::error::CdnError;

pub const DEFAULT_API_URL: &str = "https://api.cloudflare.com/client/v4";

/// Email + API key pair used for every Cloudflare request.
#[derive(Clone)]
pub struct CdnCredentials {
    pub email: String,
    pub api_key: String,
}

impl std::fmt::Debug for CdnCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CdnCredentials")
            .field("email", &self.email)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

pub struct CloudflareClient {
    http: reqwest::Client,
    base_url: String,
    credentials: CdnCredentials,
}

impl CloudflareClient {
    pub fn new(credentials: CdnCredentials) -> Self {
        Self::with_base_url(credentials, DEFAULT_API_URL)
    }

    pub fn with_base_url(credentials: CdnCredentials, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        tracing::info!(
            base_url = %base_url,
            email = %credentials.email,
            "Initialized Cloudflare client"
        );
        Self {
            http: reqwest::Client::new(),
            base_url,
            credentials,
        }
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        self.http
            .request(method, format!("{}{}", self.base_url, path))
            .header("X-Auth-Email", &self.credentials.email)
            .header("X-Auth-Key", &self.credentials.api_key)
    }

    async fn send<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, CdnError> {
        let response = request.send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        decode_envelope(status, &body)
    }
}

/// Every v4 response is wrapped in this envelope.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    success: bool,
    #[serde(default)]
    errors: Vec<ApiMessage>,
    result: Option<T>,
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct Zone {
    id: String,
    name: String,
}

/// Decode a v4 response body, turning `success: false` into [`CdnError::Api`].
fn decode_envelope<T: DeserializeOwned>(status: u16, body: &str) -> Result<T, CdnError> {
    let envelope: Envelope<T> = match serde_json::from_str(body) {
        Ok(envelope) => envelope,
        Err(e) if (200..300).contains(&status) => {
            return Err(CdnError::Malformed(e.to_string()));
        }
        Err(_) => {
            return Err(CdnError::Api {
                status,
                message: body.chars().take(200).collect(),
            });
        }
    };

    if !envelope.success || !(200..300).contains(&status) {
        let message = if envelope.errors.is_empty() {
            "request was not successful".to_string()
        } else {
            envelope
                .errors
                .iter()
                .map(|e| format!("[{}] {}", e.code, e.message))
                .collect::<Vec<_>>()
                .join("; ")
        };
        return Err(CdnError::Api { status, message });
    }

    envelope
        .result
        .ok_or_else(|| CdnError::Malformed("response has no `result`".to_string()))
}

#[async_trait]
impl CachePurger for CloudflareClient {
    async fn find_zone_id(&self, zone_name: &str) -> Result<Option<String>, CdnError> {
        tracing::info!(zone = zone_name, "Looking up Cloudflare zone");
        let request = self
            .request(reqwest::Method::GET, "/zones")
            .query(&[("name", zone_name)]);
        let zones: Vec<Zone> = self.send(request).await?;
        let zone_id = zones
            .into_iter()
            .find(|zone| zone.name.eq_ignore_ascii_case(zone_name))
            .map(|zone| zone.id);
        tracing::info!(zone = zone_name, found = zone_id.is_some(), "Zone lookup finished");
        Ok(zone_id)
    }

    async fn purge_hosts(&self, zone_id: &str, hosts: &[String]) -> Result<(), CdnError> {
        tracing::info!(zone_id, ?hosts, "Purging Cloudflare cache");
        let request = self
            .request(reqwest::Method::POST, &format!("/zones/{zone_id}/purge_cache"))
            .json(&json!({ "hosts": hosts }));
        let _: serde_json::Value = self.send(request).await?;
        Ok(())
    }
}
