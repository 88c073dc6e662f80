//! Reverse geocoding (address enrichment)
//!
//! Best-effort lookup via the OpenStreetMap Nominatim API. All failures
//! are absorbed: the address is cosmetic audit-record enrichment and must
//! never delay or fail a validation decision.

use crate::types::{Address, GeoPoint};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

const NOMINATIM_URL: &str = "https://nominatim.openstreetmap.org/reverse";
// Nominatim's usage policy requires an identifying User-Agent.
const USER_AGENT: &str = "cpv/0.1.0 (civic photo validator)";

#[derive(Debug, Deserialize)]
struct NominatimResponse {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    address: Option<NominatimAddress>,
}

#[derive(Debug, Default, Deserialize)]
struct NominatimAddress {
    #[serde(default)]
    road: Option<String>,
    #[serde(default)]
    suburb: Option<String>,
    #[serde(default)]
    neighbourhood: Option<String>,
    #[serde(default)]
    city: Option<String>,
    #[serde(default)]
    town: Option<String>,
    #[serde(default)]
    village: Option<String>,
    #[serde(default)]
    county: Option<String>,
    #[serde(default)]
    state: Option<String>,
    #[serde(default)]
    country: Option<String>,
    #[serde(default)]
    postcode: Option<String>,
}

/// Nominatim reverse-geocoding client.
pub struct ReverseGeocoder {
    http_client: reqwest::Client,
}

impl ReverseGeocoder {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()?;
        Ok(Self { http_client })
    }

    /// Best-effort reverse geocode; `None` on any failure.
    pub async fn reverse(&self, point: GeoPoint) -> Option<Address> {
        let result = self
            .http_client
            .get(NOMINATIM_URL)
            .query(&[
                ("lat", point.latitude.to_string()),
                ("lon", point.longitude.to_string()),
                ("format", "json".to_string()),
                ("addressdetails", "1".to_string()),
                ("zoom", "18".to_string()),
            ])
            .send()
            .await;

        let response = match result {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "reverse geocoding request failed");
                return None;
            }
        };

        if !response.status().is_success() {
            warn!(status = %response.status(), "reverse geocoding returned error status");
            return None;
        }

        let body: NominatimResponse = match response.json().await {
            Ok(body) => body,
            Err(e) => {
                warn!(error = %e, "unparseable reverse geocoding response");
                return None;
            }
        };

        if let Some(error) = body.error {
            warn!(error = %error, "reverse geocoding error");
            return None;
        }

        let address = assemble_address(&body);
        if let Some(address) = &address {
            debug!(address = %address.formatted, "reverse geocoded image location");
        }
        address
    }
}

fn assemble_address(body: &NominatimResponse) -> Option<Address> {
    let detail = body.address.as_ref();

    let mut parts: Vec<String> = Vec::new();
    if let Some(detail) = detail {
        if let Some(road) = &detail.road {
            parts.push(road.clone());
        }
        if let Some(area) = detail.suburb.as_ref().or(detail.neighbourhood.as_ref()) {
            parts.push(area.clone());
        }
    }

    let city = detail.and_then(|d| {
        d.city
            .as_ref()
            .or(d.town.as_ref())
            .or(d.village.as_ref())
            .or(d.county.as_ref())
            .cloned()
    });
    if let Some(city) = &city {
        parts.push(city.clone());
    }

    let state = detail.and_then(|d| d.state.clone());
    if let Some(state) = &state {
        parts.push(state.clone());
    }

    let country = detail.and_then(|d| d.country.clone());
    let postcode = detail.and_then(|d| d.postcode.clone());

    let mut formatted = parts.join(", ");
    if let Some(country) = &country {
        if formatted.is_empty() {
            formatted = country.clone();
        } else {
            formatted = format!("{}, {}", formatted, country);
        }
    }
    if let Some(postcode) = &postcode {
        formatted = format!("{} - {}", formatted, postcode);
    }

    if formatted.is_empty() {
        formatted = body.display_name.clone()?;
    }

    Some(Address {
        formatted,
        city,
        state,
        country,
        postcode,
    })
}
