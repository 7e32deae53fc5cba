//! `PlaceDirectory` implementation over the Google Maps web API: free-text
//! place search, forward geocoding, and reverse geocoding to administrative
//! districts. Lookups use a short fixed timeout and are never retried.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::debug;

use crate::config::MapsConfig;
use crate::traits::{District, PlaceDirectory};
use crate::types::LatLng;

const REQUEST_TIMEOUT_SECS: u64 = 5;

pub struct GoogleMapsDirectory {
    client: Client,
    base_url: String,
    api_key: String,
    language: String,
}

impl GoogleMapsDirectory {
    pub fn new(config: &MapsConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .expect("failed to build maps HTTP client");
        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            language: config.language.clone(),
        }
    }

    async fn get_json(&self, path: &str, query: &[(&str, &str)]) -> anyhow::Result<Value> {
        let url = format!("{}{}", self.base_url, path);
        let resp = self.client.get(&url).query(query).send().await?;
        let status = resp.status();
        if !status.is_success() {
            anyhow::bail!("maps API returned {}", status);
        }
        Ok(resp.json().await?)
    }
}

#[async_trait]
impl PlaceDirectory for GoogleMapsDirectory {
    async fn find_place(&self, query: &str) -> anyhow::Result<Option<String>> {
        let body = self
            .get_json(
                "/maps/api/place/findplacefromtext/json",
                &[
                    ("input", query),
                    ("inputtype", "textquery"),
                    ("fields", "name"),
                    ("language", &self.language),
                    ("key", &self.api_key),
                ],
            )
            .await?;
        let name = parse_find_place(&body);
        debug!(query = %query, name = ?name, "place search");
        Ok(name)
    }

    async fn geocode(&self, query: &str) -> anyhow::Result<Option<LatLng>> {
        let body = self
            .get_json(
                "/maps/api/geocode/json",
                &[
                    ("address", query),
                    ("language", &self.language),
                    ("key", &self.api_key),
                ],
            )
            .await?;
        Ok(parse_geocode(&body))
    }

    async fn reverse_district(&self, coords: LatLng) -> anyhow::Result<Option<District>> {
        let latlng = format!("{},{}", coords.lat, coords.lng);
        let body = self
            .get_json(
                "/maps/api/geocode/json",
                &[
                    ("latlng", latlng.as_str()),
                    ("language", &self.language),
                    ("key", &self.api_key),
                ],
            )
            .await?;
        Ok(parse_reverse_district(&body))
    }
}

fn parse_find_place(body: &Value) -> Option<String> {
    body["candidates"][0]["name"].as_str().map(str::to_string)
}

fn parse_geocode(body: &Value) -> Option<LatLng> {
    let location = &body["results"][0]["geometry"]["location"];
    Some(LatLng {
        lat: location["lat"].as_f64()?,
        lng: location["lng"].as_f64()?,
    })
}

/// Walk the address components for administrative levels. Level 1 is the
/// county/city that keys the forecast dataset; levels 2/3 give the finer
/// township used for nowcasts when present.
fn parse_reverse_district(body: &Value) -> Option<District> {
    let results = body["results"].as_array()?;
    let mut county: Option<String> = None;
    let mut township: Option<String> = None;

    for result in results {
        let Some(components) = result["address_components"].as_array() else {
            continue;
        };
        for component in components {
            let Some(types) = component["types"].as_array() else {
                continue;
            };
            let has = |t: &str| types.iter().any(|v| v.as_str() == Some(t));
            let name = component["long_name"].as_str();
            if county.is_none() && has("administrative_area_level_1") {
                county = name.map(str::to_string);
            }
            if township.is_none()
                && (has("administrative_area_level_2") || has("administrative_area_level_3"))
            {
                township = name.map(str::to_string);
            }
        }
        if county.is_some() && township.is_some() {
            break;
        }
    }

    county.map(|county| District { county, township })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn find_place_takes_the_first_candidate() {
        let body = json!({ "candidates": [ { "name": "台北101" }, { "name": "台北101購物中心" } ] });
        assert_eq!(parse_find_place(&body), Some("台北101".to_string()));
        assert_eq!(parse_find_place(&json!({ "candidates": [] })), None);
    }

    #[test]
    fn geocode_extracts_location() {
        let body = json!({
            "results": [
                { "geometry": { "location": { "lat": 25.034, "lng": 121.565 } } }
            ]
        });
        let coords = parse_geocode(&body).unwrap();
        assert_eq!(coords.lat, 25.034);
        assert_eq!(coords.lng, 121.565);
        assert_eq!(parse_geocode(&json!({ "results": [] })), None);
    }

    #[test]
    fn reverse_district_prefers_township_but_keeps_county() {
        let body = json!({
            "results": [
                {
                    "address_components": [
                        { "long_name": "信義區", "types": ["administrative_area_level_3", "political"] },
                        { "long_name": "台北市", "types": ["administrative_area_level_1", "political"] }
                    ]
                }
            ]
        });
        let district = parse_reverse_district(&body).unwrap();
        assert_eq!(district.county, "台北市");
        assert_eq!(district.township.as_deref(), Some("信義區"));
    }

    #[test]
    fn reverse_district_without_township_falls_back_to_county_only() {
        let body = json!({
            "results": [
                {
                    "address_components": [
                        { "long_name": "台北市", "types": ["administrative_area_level_1"] }
                    ]
                }
            ]
        });
        let district = parse_reverse_district(&body).unwrap();
        assert_eq!(district.county, "台北市");
        assert!(district.township.is_none());
    }

    #[test]
    fn reverse_district_empty_results_is_none() {
        assert_eq!(parse_reverse_district(&json!({ "results": [] })), None);
    }
}
