use crate::{paths, CurrentUser, SmlsAxumError, SmlsState};
use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use smls_core::{CallbackParams, CanonicalIdentity, Provider};
use smls_session::{FlashLevel, Session, SessionConfig, SessionStore};
use std::sync::Arc;
use tower_cookies::{Cookie, Cookies};

/// Maps the session `SameSite` policy onto the cookie crate's type.
pub fn to_cookie_same_site(ss: smls_core::SameSite) -> tower_cookies::cookie::SameSite {
    match ss {
        smls_core::SameSite::Lax => tower_cookies::cookie::SameSite::Lax,
        smls_core::SameSite::Strict => tower_cookies::cookie::SameSite::Strict,
        smls_core::SameSite::None => tower_cookies::cookie::SameSite::None,
    }
}

/// The session cookie carrying `value`, with the configured attributes.
pub fn create_session_cookie(config: &SessionConfig, value: String) -> Cookie<'static> {
    let mut builder = Cookie::build((config.cookie_name.clone(), value))
        .path(config.path.clone())
        .secure(config.secure)
        .http_only(config.http_only)
        .same_site(to_cookie_same_site(config.same_site));

    if let Some(max_age) = config.max_age {
        builder = builder.max_age(tower_cookies::cookie::time::Duration::seconds(
            max_age.num_seconds(),
        ));
    }
    builder.build()
}

/// A `302 Found` redirect.
pub fn found(location: &str) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location.to_string())]).into_response()
}

/// Loads the session named by the session cookie, if it is still valid.
pub async fn get_session(
    store: &Arc<dyn SessionStore>,
    config: &SessionConfig,
    cookies: &Cookies,
) -> Result<Option<Session>, SmlsAxumError> {
    let Some(id) = cookies
        .get(&config.cookie_name)
        .map(|c| c.value().to_string())
    else {
        return Ok(None);
    };
    Ok(store.load_session(&id).await?)
}

/// Loads the current session or starts a new one. New sessions are not
/// saved until [`commit_session`] is called.
pub async fn get_or_create_session(
    store: &Arc<dyn SessionStore>,
    config: &SessionConfig,
    cookies: &Cookies,
) -> Result<Session, SmlsAxumError> {
    Ok(get_session(store, config, cookies)
        .await?
        .unwrap_or_else(|| Session::new(config.session_ttl())))
}

/// Saves the session, extends its lifetime, and (re)sets the cookie.
pub async fn commit_session(
    store: &Arc<dyn SessionStore>,
    config: &SessionConfig,
    cookies: &Cookies,
    session: &mut Session,
) -> Result<(), SmlsAxumError> {
    session.touch(config.session_ttl());
    store.save_session(session).await?;
    cookies.add(create_session_cookie(config, session.id.clone()));
    Ok(())
}

/// Starts a login: builds the authorization URL, stores the pending flow
/// in the session, and redirects to the provider.
pub async fn axum_login_handler(
    State(state): State<SmlsState>,
    Path(provider): Path<String>,
    cookies: Cookies,
) -> Result<Response, SmlsAxumError> {
    let provider: Provider = provider.parse()?;
    let mut session =
        get_or_create_session(&state.session_store, &state.session_config, &cookies).await?;

    let Some(client_id) = session
        .data
        .credentials_for(provider)
        .map(|c| c.client_id.clone())
    else {
        session.data.flash(
            FlashLevel::Error,
            format!(
                "{} OAuth is not configured. Please setup credentials first.",
                provider.display_name()
            ),
        );
        commit_session(&state.session_store, &state.session_config, &cookies, &mut session)
            .await?;
        return Ok(found(paths::SETUP));
    };

    let request = state
        .manager
        .build_authorization_url(provider, &client_id, None);
    session.data.pending = Some(request.pending());
    // The pending flow must be stored before the browser leaves.
    commit_session(&state.session_store, &state.session_config, &cookies, &mut session).await?;

    Ok(found(&request.url))
}

/// Completes a login started by [`axum_login_handler`].
///
/// Failures are reported to the user as a flash message with a safe text.
pub async fn axum_callback_handler(
    State(state): State<SmlsState>,
    Path(provider): Path<String>,
    Query(params): Query<CallbackParams>,
    cookies: Cookies,
) -> Result<Response, SmlsAxumError> {
    let provider: Provider = provider.parse()?;
    let mut session =
        get_or_create_session(&state.session_store, &state.session_config, &cookies).await?;

    // Taken from the store, not from the loaded copy: a concurrent
    // callback for the same session must not see the flow again.
    let pending = state.session_store.take_pending(&session.id).await?;
    session.data.pending = None;

    let Some(credentials) = session.data.credentials_for(provider).cloned() else {
        session.data.flash(
            FlashLevel::Error,
            format!(
                "{} OAuth credentials not found. Please setup credentials first.",
                provider.display_name()
            ),
        );
        commit_session(&state.session_store, &state.session_config, &cookies, &mut session)
            .await?;
        return Ok(found(paths::SETUP));
    };

    let result = state
        .manager
        .complete_authorization(provider, &params, pending.as_ref(), &credentials)
        .await;

    let location = match result {
        Ok(identity) => {
            session.data.flash(
                FlashLevel::Success,
                format!("Successfully logged in with {}!", provider.display_name()),
            );
            session.data.user = Some(identity);
            paths::DASHBOARD
        }
        Err(e) => {
            if e.is_security_relevant() {
                log::warn!("Rejected {provider} callback: {e}");
            } else {
                log::error!("{provider} login failed: {e}");
            }
            session.data.flash(FlashLevel::Error, e.user_message());
            paths::HOME
        }
    };
    commit_session(&state.session_store, &state.session_config, &cookies, &mut session).await?;

    Ok(found(location))
}

/// Signs the user out. Stored credentials survive.
pub async fn axum_logout_handler(
    State(state): State<SmlsState>,
    cookies: Cookies,
) -> Result<Response, SmlsAxumError> {
    if let Some(mut session) =
        get_session(&state.session_store, &state.session_config, &cookies).await?
    {
        session.data.logout();
        session
            .data
            .flash(FlashLevel::Info, "You have been logged out successfully.");
        commit_session(&state.session_store, &state.session_config, &cookies, &mut session)
            .await?;
    }
    Ok(found(paths::HOME))
}

/// The signed-in identity as JSON.
pub async fn axum_user_handler(CurrentUser(identity): CurrentUser) -> Json<CanonicalIdentity> {
    Json(identity)
}
