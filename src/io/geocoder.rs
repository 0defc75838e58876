//! Reverse geocoding - resolves a coordinate to a place name and address
//!
//! The pipeline talks to the resolver through the `PlaceResolver` trait and
//! memoizes results per place key, so the external service sees at most one
//! call per distinct place per run. Resolution failures are the caller's
//! problem to degrade; this module only reports them.

use crate::domain::types::ResolvedPlace;
use crate::infra::config::Config;
use anyhow::{bail, Context};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

/// External place lookup, `resolve(lat, lon) -> (name, address)`
#[async_trait]
pub trait PlaceResolver: Send + Sync {
    async fn resolve(&self, lat: f64, lon: f64) -> anyhow::Result<ResolvedPlace>;
}

/// Nominatim-style reverse geocoding client
pub struct NominatimResolver {
    client: reqwest::Client,
    base_url: String,
    email: String,
}

/// Subset of the reverse-geocoding response we care about
#[derive(Debug, Deserialize)]
struct ReverseResponse {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    display_name: Option<String>,
}

impl NominatimResolver {
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.geocoder_timeout_ms()))
            .user_agent(concat!("staylog/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build geocoder HTTP client")?;

        Ok(Self {
            client,
            base_url: config.geocoder_url().trim_end_matches('/').to_string(),
            email: config.geocoder_email().to_string(),
        })
    }
}

#[async_trait]
impl PlaceResolver for NominatimResolver {
    async fn resolve(&self, lat: f64, lon: f64) -> anyhow::Result<ResolvedPlace> {
        let url = format!("{}/reverse", self.base_url);
        let lat_s = lat.to_string();
        let lon_s = lon.to_string();
        let mut query: Vec<(&str, &str)> =
            vec![("format", "jsonv2"), ("lat", &lat_s), ("lon", &lon_s)];
        if !self.email.is_empty() {
            query.push(("email", &self.email));
        }

        let response = self
            .client
            .get(&url)
            .query(&query)
            .send()
            .await
            .context("reverse geocoding request failed")?;

        let status = response.status();
        if !status.is_success() {
            bail!("reverse geocoding returned status {}", status);
        }

        let body: ReverseResponse =
            response.json().await.context("reverse geocoding response unreadable")?;

        let address = match body.display_name {
            Some(ref d) if !d.trim().is_empty() => d.trim().to_string(),
            _ => bail!("reverse geocoding returned no display name"),
        };
        // Building-level names are often missing; fall back to the leading
        // address component (placeName == address is tolerated upstream)
        let name = body
            .name
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| {
                address.split(',').next().unwrap_or(&address).trim().to_string()
            });

        debug!(lat = %lat, lon = %lon, name = %name, "place_resolved");
        Ok(ResolvedPlace { name, address })
    }
}
