//! Yelp-style business search client.
//!
//! The coordinator never looks inside the results; this client exists so the
//! host can fetch candidates once the lobby's categories are settled.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::Coordinates;

pub const DEFAULT_SEARCH_ENDPOINT: &str = "https://api.yelp.com/v3/businesses/search";

const METERS_PER_MILE: f64 = 1609.34;
/// The search API rejects radii above 40km.
const MAX_RADIUS_METERS: u32 = 40_000;

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("search request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("search response had no businesses array")]
    MalformedResponse,
}

/// The slice of a search hit the rest of the app cares about. Unknown fields
/// in the API response are ignored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Business {
    pub name: String,
    #[serde(default)]
    pub categories: serde_json::Value,
    #[serde(default)]
    pub rating: f64,
    #[serde(default)]
    pub phone: String,
}

#[derive(Clone)]
pub struct SearchClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
}

/// Drive radius in miles to the API's meters, capped at its maximum.
fn radius_meters(miles: f64) -> u32 {
    ((miles * METERS_PER_MILE) as u32).min(MAX_RADIUS_METERS)
}

/// Price range "$".."$$$$" to the API's 1..4 tier.
fn price_tier(range: &str) -> usize {
    range.chars().filter(|c| *c == '$').count().clamp(1, 4)
}

impl SearchClient {
    pub fn new(endpoint: String, api_key: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint,
            api_key,
        }
    }

    /// Query businesses near `coordinates` matching the already-scrubbed
    /// category terms.
    pub async fn search(
        &self,
        coordinates: &Coordinates,
        categories: &[String],
        price_range: &str,
        radius_miles: f64,
        limit: u32,
    ) -> Result<Vec<Business>, SearchError> {
        let term = categories.join("+");

        let response = self
            .http
            .get(&self.endpoint)
            .bearer_auth(&self.api_key)
            .query(&[
                ("term", term),
                ("latitude", coordinates.latitude.to_string()),
                ("longitude", coordinates.longitude.to_string()),
                ("price", price_tier(price_range).to_string()),
                ("radius", radius_meters(radius_miles).to_string()),
                ("limit", limit.to_string()),
                ("offset", "0".to_string()),
            ])
            .send()
            .await?
            .error_for_status()?;

        let body: serde_json::Value = response.json().await?;
        let businesses = body
            .get("businesses")
            .cloned()
            .ok_or(SearchError::MalformedResponse)?;

        serde_json::from_value(businesses).map_err(|_| SearchError::MalformedResponse)
    }
}
