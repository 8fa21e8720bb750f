//! HTML pages and the credential setup forms.

use axum::extract::State;
use axum::response::{Html, IntoResponse, Response};
use axum::Form;
use serde::Deserialize;
use smls::axum::{
    commit_session, found, get_or_create_session, get_session, paths, Cookies, FlashLevel,
    FlashMessage, Session, SessionData, SmlsAxumError, SmlsState,
};
use smls::{CanonicalIdentity, ClientCredentials, Provider};

const STYLE: &str = "body{font-family:system-ui,sans-serif;max-width:44rem;margin:2rem auto;padding:0 1rem;color:#1f2933}\
.flash{padding:.6rem 1rem;border-radius:6px;margin:.4rem 0}\
.flash.success{background:#e3f9e5}.flash.info{background:#e6f6ff}\
.flash.warning{background:#fffbea}.flash.error{background:#ffe3e3}\
.button{display:inline-block;padding:.5rem 1rem;border-radius:6px;background:#2563eb;color:#fff;text-decoration:none}\
fieldset{margin:1rem 0;border-radius:6px}label{display:block;margin:.4rem 0}\
input[type=text],input[type=password]{width:100%;padding:.4rem}\
.avatar{width:96px;height:96px;border-radius:50%}code{background:#f0f4f8;padding:0 .2rem}";

/// Escapes text for use in HTML content and attribute values.
pub fn escape_html(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}

fn layout(title: &str, flash: &[FlashMessage], body: &str) -> Html<String> {
    let flash: String = flash
        .iter()
        .map(|f| {
            format!(
                r#"<div class="flash {}">{}</div>"#,
                f.level.as_str(),
                escape_html(&f.message)
            )
        })
        .collect();

    Html(format!(
        r#"<!DOCTYPE html>
<html lang="en">
  <head>
    <meta charset="UTF-8" />
    <meta name="viewport" content="width=device-width, initial-scale=1.0" />
    <title>{title} | SMLS</title>
    <style>{STYLE}</style>
  </head>
  <body>
    <h1>{title}</h1>
    {flash}
    {body}
  </body>
</html>"#,
        title = escape_html(title),
    ))
}

/// Drains the flash queue, saving the session only when there was something
/// to show.
async fn take_flash(
    state: &SmlsState,
    cookies: &Cookies,
    session: &mut Session,
) -> Result<Vec<FlashMessage>, SmlsAxumError> {
    let flash = session.data.take_flash();
    if !flash.is_empty() {
        commit_session(&state.session_store, &state.session_config, cookies, session).await?;
    }
    Ok(flash)
}

/// Loads the session, if any, and drains its flash messages.
async fn page_session(
    state: &SmlsState,
    cookies: &Cookies,
) -> Result<(SessionData, Vec<FlashMessage>), SmlsAxumError> {
    match get_session(&state.session_store, &state.session_config, cookies).await? {
        Some(mut session) => {
            let flash = take_flash(state, cookies, &mut session).await?;
            Ok((session.data, flash))
        }
        None => Ok((SessionData::default(), Vec::new())),
    }
}

async fn flash_redirect(
    state: &SmlsState,
    cookies: &Cookies,
    mut session: Session,
    level: FlashLevel,
    message: impl Into<String>,
    location: &str,
) -> Result<Response, SmlsAxumError> {
    session.data.flash(level, message);
    commit_session(&state.session_store, &state.session_config, cookies, &mut session).await?;
    Ok(found(location))
}

/// `GET /`
pub async fn index(
    State(state): State<SmlsState>,
    cookies: Cookies,
) -> Result<Html<String>, SmlsAxumError> {
    let (data, flash) = page_session(&state, &cookies).await?;

    let mut body = String::new();
    if let Some(user) = &data.user {
        body.push_str(&format!(
            r#"<p>Signed in as <strong>{}</strong>. <a href="{}">Dashboard</a> | <a href="/logout">Log out</a></p>"#,
            escape_html(&user.name),
            paths::DASHBOARD
        ));
    }

    body.push_str("<ul>");
    for provider in Provider::ALL {
        if data.credentials_for(provider).is_some() {
            body.push_str(&format!(
                r#"<li><a class="button" href="/login/{}">Login with {}</a></li>"#,
                provider.as_str(),
                provider.display_name()
            ));
        } else {
            body.push_str(&format!(
                "<li>{} is not configured.</li>",
                provider.display_name()
            ));
        }
    }
    body.push_str("</ul>");
    body.push_str(&format!(
        r#"<p><a href="{}">Manage OAuth credentials</a></p>"#,
        paths::SETUP
    ));

    Ok(layout("Social Media Login", &flash, &body))
}

/// `GET /setup`
pub async fn setup(
    State(state): State<SmlsState>,
    cookies: Cookies,
) -> Result<Html<String>, SmlsAxumError> {
    let (data, flash) = page_session(&state, &cookies).await?;
    let oauth = state.manager.config();

    let mut fields = String::new();
    for provider in Provider::ALL {
        let stored = data.credentials_for(provider);
        let name = provider.as_str();
        fields.push_str(&format!(
            r#"<fieldset>
  <legend>{display}</legend>
  <label><input type="checkbox" name="{name}_enabled"{checked} /> Enable {display}</label>
  <label>Client ID <input type="text" name="{name}_client_id" value="{client_id}" autocomplete="off" /></label>
  <label>Client Secret <input type="password" name="{name}_client_secret" autocomplete="off" /></label>
  <p>Redirect URI: <code>{redirect_uri}</code></p>
</fieldset>"#,
            display = provider.display_name(),
            checked = if stored.is_some() { " checked" } else { "" },
            client_id = escape_html(stored.map(|c| c.client_id.as_str()).unwrap_or_default()),
            redirect_uri = escape_html(&oauth.redirect_uri(provider)),
        ));
    }

    let mut configured = String::new();
    for provider in data.configured_providers() {
        configured.push_str(&format!(
            r#"<form method="post" action="/remove-credential">
  <input type="hidden" name="provider" value="{}" />
  {} is configured. <button type="submit">Remove</button>
</form>"#,
            provider.as_str(),
            provider.display_name()
        ));
    }
    if !configured.is_empty() {
        configured.push_str(r#"<p><a href="/clear-credentials">Clear all credentials</a></p>"#);
    }

    let body = format!(
        r#"<form method="post" action="/save-credentials">
{fields}
<button class="button" type="submit">Save credentials</button>
</form>
{configured}
<p><a href="{home}">Back</a></p>"#,
        home = paths::HOME
    );

    Ok(layout("OAuth Setup", &flash, &body))
}

/// Fields of the setup form. Checkboxes are only sent when ticked.
#[derive(Debug, Default, Deserialize)]
pub struct CredentialsForm {
    google_enabled: Option<String>,
    google_client_id: Option<String>,
    google_client_secret: Option<String>,
    linkedin_enabled: Option<String>,
    linkedin_client_id: Option<String>,
    linkedin_client_secret: Option<String>,
}

impl CredentialsForm {
    /// The submitted credentials of `provider`, if it was enabled.
    fn credentials(&self, provider: Provider) -> Option<ClientCredentials> {
        let (enabled, client_id, client_secret) = match provider {
            Provider::Google => (
                &self.google_enabled,
                &self.google_client_id,
                &self.google_client_secret,
            ),
            Provider::LinkedIn => (
                &self.linkedin_enabled,
                &self.linkedin_client_id,
                &self.linkedin_client_secret,
            ),
        };
        (enabled.as_deref() == Some("on")).then(|| {
            ClientCredentials::new(
                client_id.clone().unwrap_or_default(),
                client_secret.clone().unwrap_or_default(),
            )
        })
    }
}

/// `POST /save-credentials`
///
/// Saving is additive: providers left unticked keep what they had. Nothing
/// is stored when any ticked provider fails validation.
pub async fn save_credentials(
    State(state): State<SmlsState>,
    cookies: Cookies,
    Form(form): Form<CredentialsForm>,
) -> Result<Response, SmlsAxumError> {
    let mut session =
        get_or_create_session(&state.session_store, &state.session_config, &cookies).await?;

    let mut submitted = Vec::new();
    for provider in Provider::ALL {
        let Some(credentials) = form.credentials(provider) else {
            continue;
        };
        if let Err(e) = credentials.validate(provider) {
            log::info!("Rejected {provider} credentials: {e}");
            let message = format!(
                "{} credentials error: {}",
                provider.display_name(),
                e.user_message()
            );
            return flash_redirect(
                &state,
                &cookies,
                session,
                FlashLevel::Error,
                message,
                paths::SETUP,
            )
            .await;
        }
        submitted.push((provider, credentials));
    }

    if submitted.is_empty() && session.data.configured_providers().is_empty() {
        return flash_redirect(
            &state,
            &cookies,
            session,
            FlashLevel::Error,
            "Please enable and configure at least one OAuth provider.",
            paths::SETUP,
        )
        .await;
    }

    for (provider, credentials) in submitted {
        session.data.set_credentials(provider, credentials);
        session.data.flash(
            FlashLevel::Success,
            format!(
                "{} OAuth credentials added successfully!",
                provider.display_name()
            ),
        );
        log::info!("Stored {provider} credentials in session");
    }
    commit_session(&state.session_store, &state.session_config, &cookies, &mut session).await?;

    Ok(found(paths::SETUP))
}

#[derive(Debug, Deserialize)]
pub struct RemoveCredentialForm {
    provider: Option<String>,
}

/// `POST /remove-credential`
pub async fn remove_credential(
    State(state): State<SmlsState>,
    cookies: Cookies,
    Form(form): Form<RemoveCredentialForm>,
) -> Result<Response, SmlsAxumError> {
    let mut session =
        get_or_create_session(&state.session_store, &state.session_config, &cookies).await?;

    let Some(name) = form.provider.as_deref().map(str::trim).filter(|p| !p.is_empty()) else {
        return flash_redirect(
            &state,
            &cookies,
            session,
            FlashLevel::Error,
            "No provider specified for removal.",
            paths::SETUP,
        )
        .await;
    };

    let (level, message) = match name.parse::<Provider>() {
        Ok(provider) if session.data.remove_credentials(provider) => (
            FlashLevel::Success,
            format!(
                "{} OAuth credentials removed successfully!",
                provider.display_name()
            ),
        ),
        Ok(provider) => (
            FlashLevel::Warning,
            format!("{} credentials not found.", provider.display_name()),
        ),
        Err(_) => (FlashLevel::Warning, format!("{name} credentials not found.")),
    };
    flash_redirect(&state, &cookies, session, level, message, paths::SETUP).await
}

/// `GET /clear-credentials`: forgets every credential, keeps the user.
pub async fn clear_credentials(
    State(state): State<SmlsState>,
    cookies: Cookies,
) -> Result<Response, SmlsAxumError> {
    let mut session =
        get_or_create_session(&state.session_store, &state.session_config, &cookies).await?;
    session.data.clear_credentials();
    flash_redirect(
        &state,
        &cookies,
        session,
        FlashLevel::Info,
        "OAuth credentials cleared successfully.",
        paths::HOME,
    )
    .await
}

/// `GET /dashboard`
pub async fn dashboard(
    State(state): State<SmlsState>,
    cookies: Cookies,
) -> Result<Response, SmlsAxumError> {
    let mut session =
        get_or_create_session(&state.session_store, &state.session_config, &cookies).await?;

    let Some(user) = session.data.user.clone() else {
        return flash_redirect(
            &state,
            &cookies,
            session,
            FlashLevel::Warning,
            "Please log in to access the dashboard.",
            paths::HOME,
        )
        .await;
    };
    let flash = take_flash(&state, &cookies, &mut session).await?;

    Ok(layout("Dashboard", &flash, &profile(&user)).into_response())
}

fn profile(user: &CanonicalIdentity) -> String {
    let avatar = match &user.picture {
        Some(picture) => format!(
            r#"<img class="avatar" src="/proxy?url={}" alt="Profile picture" />"#,
            urlencoding::encode(picture)
        ),
        None => String::new(),
    };
    let email = match &user.email {
        Some(email) => format!(
            "<p>Email: {}{}</p>",
            escape_html(email),
            if user.email_verified == Some(true) {
                " (verified)"
            } else {
                ""
            }
        ),
        None => String::new(),
    };

    format!(
        r#"{avatar}
<h2>{name}</h2>
{email}
<p>Signed in with {provider}. User ID: <code>{id}</code></p>
<p><a href="/api/user">View as JSON</a> | <a href="/logout">Log out</a></p>"#,
        name = escape_html(&user.name),
        provider = user.provider.display_name(),
        id = escape_html(&user.id),
    )
}
