use std::path::Path;

use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub gateway: GatewayConfig,
    pub maps: MapsConfig,
    #[serde(default)]
    pub weather: WeatherConfig,
    #[serde(default)]
    pub state: StateConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub resolver: ResolverConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct GatewayConfig {
    /// Shared secret used to validate webhook signatures.
    #[serde(default)]
    pub channel_secret: String,
    /// Bearer token for the reply API.
    #[serde(default)]
    pub access_token: String,
    #[serde(default = "default_reply_url")]
    pub reply_url: String,
}

fn default_reply_url() -> String {
    "https://api.line.me/v2/bot/message/reply".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct MapsConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_maps_base_url")]
    pub base_url: String,
    /// Result language. A CJK language here also enables the CJK narrowing
    /// heuristic in the place resolver.
    #[serde(default = "default_language")]
    pub language: String,
}

fn default_maps_base_url() -> String {
    "https://maps.googleapis.com".to_string()
}
fn default_language() -> String {
    "zh-TW".to_string()
}

impl MapsConfig {
    pub fn cjk_locale(&self) -> bool {
        let lang = self.language.to_ascii_lowercase();
        lang.starts_with("zh") || lang.starts_with("ja") || lang.starts_with("ko")
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct WeatherConfig {
    /// Capability flag: some deployments run without the weather command.
    #[serde(default = "default_weather_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_weather_base_url")]
    pub base_url: String,
    /// County-level next-36h forecast dataset.
    #[serde(default = "default_forecast_dataset")]
    pub forecast_dataset: String,
    /// Township-level short-horizon dataset.
    #[serde(default = "default_nowcast_dataset")]
    pub nowcast_dataset: String,
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            enabled: default_weather_enabled(),
            api_key: String::new(),
            base_url: default_weather_base_url(),
            forecast_dataset: default_forecast_dataset(),
            nowcast_dataset: default_nowcast_dataset(),
        }
    }
}

fn default_weather_enabled() -> bool {
    true
}
fn default_weather_base_url() -> String {
    "https://opendata.cwa.gov.tw/api".to_string()
}
fn default_forecast_dataset() -> String {
    "F-C0032-001".to_string()
}
fn default_nowcast_dataset() -> String {
    "F-D0047-089".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct StateConfig {
    #[serde(default = "default_db_path")]
    pub db_path: String,
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
        }
    }
}

fn default_db_path() -> String {
    "tripnote.db".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "0.0.0.0:10000".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct ResolverConfig {
    /// Outbound timeout for link expansion, in seconds. Fail fast, no retry.
    #[serde(default = "default_resolver_timeout_secs")]
    pub timeout_secs: u64,
    /// When true, a place whose cleaned name cannot be geocoded is reported
    /// as a resolution failure instead of being stored without coordinates.
    #[serde(default)]
    pub strict_geocode: bool,
    /// Capability flag: when false, only the first place input of a message
    /// is processed (single-line grammar).
    #[serde(default = "default_batch_add")]
    pub batch_add: bool,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_resolver_timeout_secs(),
            strict_geocode: false,
            batch_add: default_batch_add(),
        }
    }
}

fn default_resolver_timeout_secs() -> u64 {
    5
}
fn default_batch_add() -> bool {
    true
}

impl AppConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let mut config: AppConfig = toml::from_str(&content)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Secrets may come from the environment instead of config.toml, so the
    /// file can be committed without them.
    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("LINE_CHANNEL_SECRET") {
            self.gateway.channel_secret = v;
        }
        if let Ok(v) = std::env::var("LINE_CHANNEL_ACCESS_TOKEN") {
            self.gateway.access_token = v;
        }
        if let Ok(v) = std::env::var("GOOGLE_MAPS_API_KEY") {
            self.maps.api_key = v;
        }
        if let Ok(v) = std::env::var("CWA_API_KEY") {
            self.weather.api_key = v;
        }
        if let Ok(v) = std::env::var("PORT") {
            // Platform-provided port wins over the configured bind address.
            self.server.bind = format!("0.0.0.0:{}", v);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_config_fills_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
            [gateway]
            channel_secret = "s"
            access_token = "t"

            [maps]
            api_key = "k"
            "#,
        )
        .unwrap();

        assert_eq!(config.maps.language, "zh-TW");
        assert!(config.maps.cjk_locale());
        assert!(config.weather.enabled);
        assert_eq!(config.weather.forecast_dataset, "F-C0032-001");
        assert_eq!(config.state.db_path, "tripnote.db");
        assert_eq!(config.server.bind, "0.0.0.0:10000");
        assert_eq!(config.resolver.timeout_secs, 5);
        assert!(!config.resolver.strict_geocode);
        assert!(config.resolver.batch_add);
    }

    #[test]
    fn capability_flags_parse() {
        let config: AppConfig = toml::from_str(
            r#"
            [gateway]
            [maps]
            language = "en"

            [weather]
            enabled = false

            [resolver]
            strict_geocode = true
            batch_add = false
            "#,
        )
        .unwrap();

        assert!(!config.maps.cjk_locale());
        assert!(!config.weather.enabled);
        assert!(config.resolver.strict_geocode);
        assert!(!config.resolver.batch_add);
    }
}
