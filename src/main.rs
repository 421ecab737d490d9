use axum::Router;
use dayplan::config::Config;
use dayplan::constants::DEFAULT_TRIP_STATE_MAX_ENTRIES;
use dayplan::db::{MemoryTripRepository, PgTripRepository, TripRepository};
use dayplan::services::classifier::PoiClassifier;
use dayplan::services::eta_builder::EtaMatrixBuilder;
use dayplan::services::geocoder::MapboxGeocoder;
use dayplan::services::llm::AnthropicClient;
use dayplan::services::planner::ItineraryPlanner;
use dayplan::services::routing::InrixClient;
use dayplan::services::trip_machine::TripStateMachine;
use dayplan::store::MemoryTripStateStore;
use dayplan::AppState;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "dayplan=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env().map_err(|e| format!("Failed to load configuration: {}", e))?;

    tracing::info!("Starting dayplan API server");

    // Saved trips go to Postgres when configured, otherwise stay in process
    let repository: Arc<dyn TripRepository> = if let Some(ref database_url) = config.database_url {
        tracing::info!("Connecting to database...");
        let db_pool = dayplan::db::create_pool(database_url).await?;

        tracing::info!("Running database migrations...");
        sqlx::migrate!("./migrations").run(&db_pool).await?;
        tracing::info!("Database ready");

        Arc::new(PgTripRepository::new(db_pool))
    } else {
        tracing::warn!("DATABASE_URL not set. Saved trips will be kept in memory only.");
        Arc::new(MemoryTripRepository::default())
    };

    let store = Arc::new(MemoryTripStateStore::new(
        config.trip_state_ttl,
        DEFAULT_TRIP_STATE_MAX_ENTRIES,
    ));

    let generator = Arc::new(AnthropicClient::with_config(
        config.anthropic_api_key.clone(),
        config.anthropic_model.clone(),
        config.anthropic_base_url.clone(),
    ));
    let routing = Arc::new(InrixClient::with_base_url(
        config.routing_api_key.clone(),
        config.routing_base_url.clone(),
    ));
    let geocoder = Arc::new(MapboxGeocoder::new(config.mapbox_api_key.clone()));

    let machine = TripStateMachine::new(
        store,
        geocoder,
        PoiClassifier::new(generator, config.classifier.clone()),
        EtaMatrixBuilder::new(routing, config.eta.clone()),
        ItineraryPlanner::new(config.planner.clone()),
        repository.clone(),
    );

    tracing::info!(
        model = %config.anthropic_model,
        repository = repository.backend_name(),
        max_concurrency = config.eta.max_concurrency,
        "Services initialised"
    );

    let state = Arc::new(AppState {
        machine: Arc::new(machine),
    });

    let app = Router::new()
        .nest("/api/v1", dayplan::routes::create_router(state))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http());

    let addr = config.server_address();
    tracing::info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
