use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

mod admin;
mod api;
mod clock;
mod components;
mod config;
mod error;
mod events;
mod state;
mod storage;
mod timer;

use admin::session::SessionStore;
use admin::throttle::ThrottleRegistry;
use api::client::ApiClient;
use clock::{Clock, SystemClock};
use config::Config;
use state::AppState;
use storage::FileStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = Config::from_env()?;

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let client_state = FileStore::load_or_create(&config.state_path)?;
    let api = ApiClient::new(&config.api_base)?;

    let state = Arc::new(AppState {
        api,
        clock: clock.clone(),
        visibility: config.visibility,
        throttles: tokio::sync::Mutex::new(ThrottleRegistry::new(
            config.throttle,
            clock,
            client_state,
        )),
        sessions: tokio::sync::Mutex::new(SessionStore::new(config.session_ttl)),
    });

    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!(
        "Sentinel dashboard listening on {} (backend {})",
        config.bind_addr,
        config.api_base
    );
    axum::serve(listener, app).await?;

    Ok(())
}

fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(admin::routes::root))
        .route(
            "/login",
            get(admin::routes::login_page).post(admin::routes::login_submit),
        )
        .route("/login/events", get(admin::routes::lockout_events))
        .route("/logout", post(admin::routes::logout))
        .route("/dashboard", get(admin::routes::dashboard))
        .route(
            "/devices/{device_id}/components",
            get(components::routes::device_components),
        )
        .route(
            "/devices/{device_id}/components/events",
            get(components::routes::component_events),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
