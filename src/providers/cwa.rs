//! `ForecastSource` implementation over the Taiwan open-data weather API.
//!
//! Two datasets are consumed: a county-level next-36h forecast (periods with
//! description, min/max temperature and precipitation probability) and a
//! township-level short-horizon dataset for current temperature and
//! imminent rain chance. Both are keyed by district *name*, which is why
//! callers must canonicalize geocoder names first (see `weather.rs`).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::debug;

use crate::config::WeatherConfig;
use crate::traits::{ForecastSource, Nowcast, PeriodForecast};

const REQUEST_TIMEOUT_SECS: u64 = 5;

/// Labels for the first two forecast periods.
const PERIOD_LABELS: &[&str] = &["今天", "明天"];

pub struct CwaForecastSource {
    client: Client,
    base_url: String,
    api_key: String,
    forecast_dataset: String,
    nowcast_dataset: String,
}

impl CwaForecastSource {
    pub fn new(config: &WeatherConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .expect("failed to build weather HTTP client");
        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            forecast_dataset: config.forecast_dataset.clone(),
            nowcast_dataset: config.nowcast_dataset.clone(),
        }
    }

    async fn get_dataset(&self, dataset: &str, location_name: &str) -> anyhow::Result<Value> {
        let url = format!("{}/v1/rest/datastore/{}", self.base_url, dataset);
        let resp = self
            .client
            .get(&url)
            .query(&[
                ("Authorization", self.api_key.as_str()),
                ("locationName", location_name),
            ])
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            anyhow::bail!("weather API returned {}", status);
        }
        Ok(resp.json().await?)
    }
}

#[async_trait]
impl ForecastSource for CwaForecastSource {
    async fn forecast(&self, county: &str) -> anyhow::Result<Option<Vec<PeriodForecast>>> {
        let body = self.get_dataset(&self.forecast_dataset, county).await?;
        let periods = parse_forecast(&body);
        debug!(county = %county, found = periods.is_some(), "forecast lookup");
        Ok(periods)
    }

    async fn nowcast(&self, township: &str) -> anyhow::Result<Option<Nowcast>> {
        let body = self.get_dataset(&self.nowcast_dataset, township).await?;
        Ok(parse_nowcast(&body))
    }
}

/// Time entries of one named weather element, in dataset order.
fn element_times<'a>(location: &'a Value, name: &str) -> Vec<&'a Value> {
    location["weatherElement"]
        .as_array()
        .into_iter()
        .flatten()
        .find(|e| e["elementName"].as_str() == Some(name))
        .and_then(|e| e["time"].as_array())
        .map(|times| times.iter().collect())
        .unwrap_or_default()
}

fn parameter_name(entry: &Value) -> Option<&str> {
    entry["parameter"]["parameterName"].as_str()
}

/// County forecast layout: `records.location[0].weatherElement[]`, one
/// element per variable (Wx/PoP/MinT/MaxT), each with parallel time
/// entries. An empty `location` array means the dataset has no entry for
/// the queried name.
fn parse_forecast(body: &Value) -> Option<Vec<PeriodForecast>> {
    let location = body["records"]["location"].as_array()?.first()?;
    let wx = element_times(location, "Wx");
    let pop = element_times(location, "PoP");
    let min_t = element_times(location, "MinT");
    let max_t = element_times(location, "MaxT");

    let mut periods = Vec::new();
    for (i, label) in PERIOD_LABELS.iter().enumerate() {
        let Some(entry) = wx.get(i) else { break };
        let Some(description) = parameter_name(entry) else {
            continue;
        };
        periods.push(PeriodForecast {
            label: (*label).to_string(),
            description: description.to_string(),
            min_temp: min_t
                .get(i)
                .and_then(|e| parameter_name(e))
                .and_then(|v| v.trim().parse().ok()),
            max_temp: max_t
                .get(i)
                .and_then(|e| parameter_name(e))
                .and_then(|v| v.trim().parse().ok()),
            rain_chance: pop
                .get(i)
                .and_then(|e| parameter_name(e))
                .and_then(|v| v.trim().parse().ok()),
        });
    }
    (!periods.is_empty()).then_some(periods)
}

/// Township dataset layout: `records.locations[0].location[0]`, elements
/// carrying `time[0].elementValue[0].value`.
fn parse_nowcast(body: &Value) -> Option<Nowcast> {
    let location = body["records"]["locations"][0]["location"].as_array()?.first()?;
    let mut temperature = None;
    let mut rain_chance = None;
    for element in location["weatherElement"].as_array().into_iter().flatten() {
        let name = element["elementName"].as_str().unwrap_or("");
        let value = element["time"][0]["elementValue"][0]["value"].as_str();
        match name {
            "T" => temperature = value.and_then(|v| v.trim().parse().ok()),
            "PoP6h" | "PoP12h" => rain_chance = value.and_then(|v| v.trim().parse().ok()),
            _ => {}
        }
    }
    (temperature.is_some() || rain_chance.is_some()).then_some(Nowcast {
        temperature,
        rain_chance,
    })
}
