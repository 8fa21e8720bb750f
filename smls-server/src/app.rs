use crate::config::Config;
use crate::{pages, proxy, security};
use axum::extract::FromRef;
use axum::middleware;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use smls::axum::{CookieManagerLayer, SmlsAxumExt, SmlsState};
use smls::core::http;
use smls::flow::OAuthManager;
use smls::session::SessionStore;
use smls::AuthError;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub smls: SmlsState,
    /// Client used by the image proxy. Separate from the provider client.
    pub proxy_client: reqwest::Client,
}

impl FromRef<AppState> for SmlsState {
    fn from_ref(state: &AppState) -> Self {
        state.smls.clone()
    }
}

impl AppState {
    pub fn new(config: &Config, session_store: Arc<dyn SessionStore>) -> Result<Self, AuthError> {
        let manager = OAuthManager::new(config.oauth_config())?;
        let proxy_client = http::build_client(config.http_timeout())?;
        Ok(Self {
            smls: SmlsState::new(manager, session_store, config.session_config()),
            proxy_client,
        })
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(pages::index))
        .route("/setup", get(pages::setup))
        .route("/save-credentials", post(pages::save_credentials))
        .route("/remove-credential", post(pages::remove_credential))
        .route("/clear-credentials", get(pages::clear_credentials))
        .route("/dashboard", get(pages::dashboard))
        .route("/image-proxy/{*url}", get(proxy::image_proxy))
        .route("/proxy", get(proxy::proxy_query))
        .route("/health", get(health))
        .merge(state.smls.axum_router::<AppState>())
        .layer(CookieManagerLayer::new())
        .layer(middleware::map_response(security::security_headers))
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "service": "smls",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
