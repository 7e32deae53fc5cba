//! Test infrastructure: fake collaborator implementations and a fully
//! wired handler over a temp-file SQLite store.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::commands::Capabilities;
use crate::config::ResolverConfig;
use crate::handler::MessageHandler;
use crate::resolver::PlaceResolver;
use crate::state::SqliteItineraryStore;
use crate::traits::{District, ForecastSource, Nowcast, PeriodForecast, PlaceDirectory};
use crate::types::LatLng;
use crate::weather::WeatherService;

fn coords_key(coords: LatLng) -> String {
    format!("{:.3},{:.3}", coords.lat, coords.lng)
}

/// In-memory `PlaceDirectory`: canned query → (canonical name, coords)
/// entries plus coords → district entries. `failing()` makes every call
/// error, for upstream-outage tests.
#[derive(Clone, Default)]
pub struct FakeDirectory {
    places: HashMap<String, (String, Option<LatLng>)>,
    districts: HashMap<String, District>,
    fail: bool,
}

impl FakeDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_place(mut self, query: &str, canonical: &str, coords: Option<LatLng>) -> Self {
        self.places
            .insert(query.to_string(), (canonical.to_string(), coords));
        self
    }

    pub fn with_district(mut self, coords: LatLng, county: &str, township: Option<&str>) -> Self {
        self.districts.insert(
            coords_key(coords),
            District {
                county: county.to_string(),
                township: township.map(str::to_string),
            },
        );
        self
    }

    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }
}

#[async_trait]
impl PlaceDirectory for FakeDirectory {
    async fn find_place(&self, query: &str) -> anyhow::Result<Option<String>> {
        if self.fail {
            anyhow::bail!("directory offline");
        }
        Ok(self.places.get(query).map(|(name, _)| name.clone()))
    }

    async fn geocode(&self, query: &str) -> anyhow::Result<Option<LatLng>> {
        if self.fail {
            anyhow::bail!("directory offline");
        }
        Ok(self.places.get(query).and_then(|(_, coords)| *coords))
    }

    async fn reverse_district(&self, coords: LatLng) -> anyhow::Result<Option<District>> {
        if self.fail {
            anyhow::bail!("directory offline");
        }
        Ok(self.districts.get(&coords_key(coords)).cloned())
    }
}

/// In-memory `ForecastSource` with canned county and township entries.
#[derive(Clone, Default)]
pub struct FakeForecast {
    counties: HashMap<String, Vec<PeriodForecast>>,
    townships: HashMap<String, Nowcast>,
    fail_forecast: bool,
}

impl FakeForecast {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_county(mut self, county: &str) -> Self {
        self.counties.insert(
            county.to_string(),
            vec![
                PeriodForecast {
                    label: "今天".to_string(),
                    description: "多雲時晴".to_string(),
                    min_temp: Some(24.0),
                    max_temp: Some(31.0),
                    rain_chance: Some(20),
                },
                PeriodForecast {
                    label: "明天".to_string(),
                    description: "午後雷陣雨".to_string(),
                    min_temp: Some(25.0),
                    max_temp: Some(33.0),
                    rain_chance: Some(60),
                },
            ],
        );
        self
    }

    pub fn with_township(mut self, township: &str) -> Self {
        self.townships.insert(
            township.to_string(),
            Nowcast {
                temperature: Some(28.3),
                rain_chance: Some(10),
            },
        );
        self
    }

    pub fn failing_forecast(mut self) -> Self {
        self.fail_forecast = true;
        self
    }
}

#[async_trait]
impl ForecastSource for FakeForecast {
    async fn forecast(&self, county: &str) -> anyhow::Result<Option<Vec<PeriodForecast>>> {
        if self.fail_forecast {
            anyhow::bail!("forecast dataset offline");
        }
        Ok(self.counties.get(county).cloned())
    }

    async fn nowcast(&self, township: &str) -> anyhow::Result<Option<Nowcast>> {
        Ok(self.townships.get(township).cloned())
    }
}

/// A wired handler plus the temp-file guard keeping its database alive.
pub struct TestHarness {
    pub handler: MessageHandler,
    _db: tempfile::NamedTempFile,
}

pub async fn setup_test_handler(directory: FakeDirectory, forecast: FakeForecast) -> TestHarness {
    setup_test_handler_with_caps(directory, forecast, Capabilities::default()).await
}

pub async fn setup_test_handler_with_caps(
    directory: FakeDirectory,
    forecast: FakeForecast,
    caps: Capabilities,
) -> TestHarness {
    let db = tempfile::NamedTempFile::new().unwrap();
    let store = Arc::new(
        SqliteItineraryStore::new(db.path().to_str().unwrap())
            .await
            .unwrap(),
    );
    let directory = Arc::new(directory);
    let resolver_config = ResolverConfig {
        timeout_secs: 1,
        strict_geocode: false,
        batch_add: true,
    };
    let resolver = PlaceResolver::new(directory.clone(), &resolver_config, true);
    let weather = WeatherService::new(directory, Arc::new(forecast));
    let handler = MessageHandler::new(store, resolver, weather, caps);
    TestHarness { handler, _db: db }
}
