use std::sync::Arc;

use tracing::info;

use crate::channels::{router, LineGateway, WebhookState};
use crate::commands::Capabilities;
use crate::config::AppConfig;
use crate::handler::MessageHandler;
use crate::providers::{CwaForecastSource, GoogleMapsDirectory};
use crate::resolver::PlaceResolver;
use crate::state::SqliteItineraryStore;
use crate::weather::WeatherService;

/// Wire the constructed-once dependencies and serve the webhook until the
/// process exits.
pub async fn run(config: AppConfig) -> anyhow::Result<()> {
    // 1. Store
    let store = Arc::new(SqliteItineraryStore::new(&config.state.db_path).await?);
    info!("Itinerary store initialized ({})", config.state.db_path);

    // 2. Collaborator clients
    let directory = Arc::new(GoogleMapsDirectory::new(&config.maps));
    let forecast = Arc::new(CwaForecastSource::new(&config.weather));

    // 3. Core services
    let resolver = PlaceResolver::new(
        directory.clone(),
        &config.resolver,
        config.maps.cjk_locale(),
    );
    let weather = WeatherService::new(directory, forecast);
    let caps = Capabilities {
        batch_add: config.resolver.batch_add,
        weather: config.weather.enabled,
    };
    info!(
        batch_add = caps.batch_add,
        weather = caps.weather,
        strict_geocode = config.resolver.strict_geocode,
        "Command grammar configured"
    );
    let handler = Arc::new(MessageHandler::new(store, resolver, weather, caps));

    // 4. Gateway and webhook surface
    let gateway = Arc::new(LineGateway::new(&config.gateway));
    let state = Arc::new(WebhookState {
        handler,
        gateway,
        channel_secret: config.gateway.channel_secret.clone(),
    });
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    info!("Webhook listening on {}", config.server.bind);
    axum::serve(listener, app).await?;
    Ok(())
}
