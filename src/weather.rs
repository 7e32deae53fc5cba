//! Weather lookup: coordinates → administrative district → forecast and
//! nowcast. Every upstream failure degrades to missing data for that one
//! place; a weather report never aborts as a whole.

use std::sync::Arc;

use tracing::warn;

use crate::traits::{District, ForecastSource, Nowcast, PeriodForecast, PlaceDirectory};
use crate::types::LatLng;

/// Known divergences between the geocoder's administrative naming and the
/// forecast dataset taxonomy. The dataset spells 台 as 臺 and tracks
/// jurisdiction renames the geocoder may lag behind on.
const DISTRICT_ALIASES: &[(&str, &str)] = &[
    ("台北市", "臺北市"),
    ("台中市", "臺中市"),
    ("台南市", "臺南市"),
    ("台東縣", "臺東縣"),
    ("桃園縣", "桃園市"),
    ("員林鎮", "員林市"),
];

/// Map a geocoder district name onto the forecast taxonomy's spelling.
pub fn canonical_district_name(name: &str) -> String {
    for (from, to) in DISTRICT_ALIASES {
        if name == *from {
            return (*to).to_string();
        }
    }
    name.to_string()
}

/// Weather data gathered for one place. `None` fields mean the
/// corresponding lookup had no data or failed.
#[derive(Debug, Clone)]
pub struct PlaceWeather {
    pub name: String,
    pub district: Option<District>,
    pub forecast: Option<Vec<PeriodForecast>>,
    pub nowcast: Option<Nowcast>,
}

impl PlaceWeather {
    fn unavailable(name: &str) -> Self {
        Self {
            name: name.to_string(),
            district: None,
            forecast: None,
            nowcast: None,
        }
    }
}

pub struct WeatherService {
    directory: Arc<dyn PlaceDirectory>,
    source: Arc<dyn ForecastSource>,
}

impl WeatherService {
    pub fn new(directory: Arc<dyn PlaceDirectory>, source: Arc<dyn ForecastSource>) -> Self {
        Self { directory, source }
    }

    /// Ad-hoc report for a free-text location that is not necessarily
    /// stored: geocode the query, then report as usual.
    pub async fn report_for_query(&self, query: &str) -> PlaceWeather {
        let coords = match self.directory.geocode(query).await {
            Ok(coords) => coords,
            Err(e) => {
                warn!(query = %query, error = %e, "geocoding failed");
                None
            }
        };
        self.report_for(query, coords).await
    }

    /// Weather for one place. Never errors: a place without coordinates or
    /// with a failing upstream yields an `unavailable` entry.
    pub async fn report_for(&self, name: &str, coords: Option<LatLng>) -> PlaceWeather {
        let Some(coords) = coords else {
            return PlaceWeather::unavailable(name);
        };

        let district = match self.directory.reverse_district(coords).await {
            Ok(district) => district,
            Err(e) => {
                warn!(place = %name, error = %e, "reverse geocoding failed");
                None
            }
        };
        let Some(district) = district else {
            return PlaceWeather::unavailable(name);
        };

        let district = District {
            county: canonical_district_name(&district.county),
            township: district.township.as_deref().map(canonical_district_name),
        };

        let forecast = match self.source.forecast(&district.county).await {
            Ok(forecast) => forecast,
            Err(e) => {
                warn!(county = %district.county, error = %e, "forecast lookup failed");
                None
            }
        };

        let nowcast = match &district.township {
            Some(township) => match self.source.nowcast(township).await {
                Ok(nowcast) => nowcast,
                Err(e) => {
                    warn!(township = %township, error = %e, "nowcast lookup failed");
                    None
                }
            },
            None => None,
        };

        PlaceWeather {
            name: name.to_string(),
            district: Some(district),
            forecast,
            nowcast,
        }
    }
}
