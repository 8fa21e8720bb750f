//! # SMLS Axum
//!
//! Axum integration for the SMLS gateway: shared state, the signed-in user
//! extractor, the login / callback / logout handlers, and error responses.

use axum::extract::{FromRef, FromRequestParts};
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
pub use smls_core::{AuthError, CanonicalIdentity, Provider};
pub use smls_flow::{OAuthConfig, OAuthManager};
pub use smls_session::{
    FlashLevel, FlashMessage, MemoryStore, Session, SessionConfig, SessionData, SessionStore,
};
use std::sync::Arc;
pub use tower_cookies::{CookieManagerLayer, Cookies};

pub mod helpers;

pub use helpers::*;

/// Where the handlers send the browser.
pub mod paths {
    /// Landing page; shown after logout and failed logins.
    pub const HOME: &str = "/";
    /// Credential form.
    pub const SETUP: &str = "/setup";
    /// Page of the signed-in user.
    pub const DASHBOARD: &str = "/dashboard";
}

/// State the SMLS handlers need.
#[derive(Clone)]
pub struct SmlsState {
    /// The OAuth core.
    pub manager: Arc<OAuthManager>,
    /// Where sessions live.
    pub session_store: Arc<dyn SessionStore>,
    /// Session cookie settings.
    pub session_config: SessionConfig,
}

impl SmlsState {
    /// Bundle the pieces into a state.
    pub fn new(
        manager: OAuthManager,
        session_store: Arc<dyn SessionStore>,
        session_config: SessionConfig,
    ) -> Self {
        Self {
            manager: Arc::new(manager),
            session_store,
            session_config,
        }
    }
}

/// Errors returned by the SMLS handlers and extractors.
#[derive(Debug, thiserror::Error)]
pub enum SmlsAxumError {
    /// The request needs a signed-in user.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    /// The OAuth core failed.
    #[error(transparent)]
    Auth(#[from] AuthError),
    /// Anything else.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for SmlsAxumError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            SmlsAxumError::Unauthorized(message) => (StatusCode::UNAUTHORIZED, message.clone()),
            SmlsAxumError::Auth(e @ AuthError::UnsupportedProvider(_)) => {
                (StatusCode::NOT_FOUND, e.user_message())
            }
            SmlsAxumError::Auth(e @ (AuthError::Session(_) | AuthError::Http(_))) => {
                log::error!("{e}");
                (StatusCode::INTERNAL_SERVER_ERROR, e.user_message())
            }
            SmlsAxumError::Auth(e) => (StatusCode::BAD_REQUEST, e.user_message()),
            SmlsAxumError::Internal(message) => {
                log::error!("Internal error: {message}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

/// The signed-in user. Rejects with `401 {"error":"Not authenticated"}`.
pub struct CurrentUser(pub CanonicalIdentity);

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
    SmlsState: FromRef<S>,
{
    type Rejection = SmlsAxumError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let smls = SmlsState::from_ref(state);
        let cookies = Cookies::from_request_parts(parts, state)
            .await
            .map_err(|e| SmlsAxumError::Internal(e.1.to_string()))?;

        helpers::get_session(&smls.session_store, &smls.session_config, &cookies)
            .await?
            .and_then(|session| session.data.user)
            .map(CurrentUser)
            .ok_or_else(|| SmlsAxumError::Unauthorized("Not authenticated".to_string()))
    }
}

/// Mounts the SMLS routes on a router.
pub trait SmlsAxumExt {
    /// `/login/{provider}`, `/auth/{provider}/callback`, `/logout` and `/api/user`.
    ///
    /// The router needs a [`CookieManagerLayer`] above it.
    fn axum_router<AppState>(&self) -> axum::Router<AppState>
    where
        AppState: Clone + Send + Sync + 'static,
        SmlsState: FromRef<AppState>;
}

impl SmlsAxumExt for SmlsState {
    fn axum_router<AppState>(&self) -> axum::Router<AppState>
    where
        AppState: Clone + Send + Sync + 'static,
        SmlsState: FromRef<AppState>,
    {
        use axum::routing::get;
        axum::Router::new()
            .route("/login/{provider}", get(helpers::axum_login_handler))
            .route(
                "/auth/{provider}/callback",
                get(helpers::axum_callback_handler),
            )
            .route("/logout", get(helpers::axum_logout_handler))
            .route("/api/user", get(helpers::axum_user_handler))
    }
}
