//! Outbound HTTP calls shared by the provider adapters.
//!
//! Calls are made once, with the client's timeout, and never retried.

use crate::authorization::TokenRequest;
use crate::error::AuthError;
use crate::state::TokenResponse;
use reqwest::header::ACCEPT;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;

/// Timeout applied to every provider call unless configured otherwise.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Builds the HTTP client used for provider calls.
pub fn build_client(timeout: Duration) -> Result<reqwest::Client, AuthError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(concat!("smls/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| AuthError::Http(e.to_string()))
}

/// Status and body of a provider response.
#[derive(Debug, Clone)]
pub struct RawResponse {
    /// HTTP status.
    pub status: StatusCode,
    /// Body as text.
    pub body: String,
}

#[derive(Deserialize)]
struct RawTokenResponse {
    access_token: Option<String>,
    token_type: Option<String>,
    expires_in: Option<u64>,
    refresh_token: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

/// POSTs an authorization-code grant to `token_url` as a urlencoded form.
pub async fn exchange_code(
    client: &reqwest::Client,
    token_url: &str,
    request: &TokenRequest<'_>,
) -> Result<TokenResponse, AuthError> {
    let response = client
        .post(token_url)
        .header(ACCEPT, "application/json")
        .form(&request.form())
        .send()
        .await
        .map_err(|e| AuthError::TokenExchangeFailed(e.to_string()))?;

    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| AuthError::TokenExchangeFailed(e.to_string()))?;
    if !status.is_success() {
        return Err(AuthError::TokenExchangeFailed(format!("{status}: {body}")));
    }

    let raw: RawTokenResponse = serde_json::from_str(&body)
        .map_err(|e| AuthError::TokenExchangeFailed(format!("malformed token response: {e}")))?;
    log::debug!(
        "Token response from {token_url}: access token {}, refresh token {}, expires in {:?}",
        raw.access_token.is_some(),
        raw.refresh_token.is_some(),
        raw.expires_in
    );
    let Some(access_token) = raw.access_token.filter(|t| !t.is_empty()) else {
        // The body of a successful exchange may hold other tokens, so only
        // the error fields are kept for diagnostics.
        let reason = match (raw.error, raw.error_description) {
            (Some(error), Some(description)) => format!("{error}: {description}"),
            (Some(error), None) => error,
            _ => "no access_token in token response".to_string(),
        };
        return Err(AuthError::TokenExchangeFailed(reason));
    };

    Ok(TokenResponse {
        access_token,
        token_type: raw.token_type.unwrap_or_else(|| "Bearer".to_string()),
        expires_in: raw.expires_in,
        refresh_token: raw.refresh_token,
    })
}

/// GETs `url` with a bearer token and any extra headers.
pub async fn bearer_get(
    client: &reqwest::Client,
    url: &str,
    access_token: &str,
    headers: &[(&'static str, &str)],
) -> Result<RawResponse, reqwest::Error> {
    let mut request = client
        .get(url)
        .bearer_auth(access_token)
        .header(ACCEPT, "application/json");
    for (name, value) in headers {
        request = request.header(*name, *value);
    }
    let response = request.send().await?;
    let status = response.status();
    let body = response.text().await?;
    Ok(RawResponse { status, body })
}

/// Fetches and decodes a user-info document.
pub async fn fetch_userinfo<T: DeserializeOwned>(
    client: &reqwest::Client,
    userinfo_url: &str,
    access_token: &str,
) -> Result<T, AuthError> {
    let raw = bearer_get(client, userinfo_url, access_token, &[])
        .await
        .map_err(|e| AuthError::UserInfoFetchFailed(e.to_string()))?;
    if !raw.status.is_success() {
        return Err(AuthError::UserInfoFetchFailed(format!(
            "{}: {}",
            raw.status, raw.body
        )));
    }
    log::debug!("User info from {userinfo_url}: {} bytes", raw.body.len());
    serde_json::from_str(&raw.body)
        .map_err(|e| AuthError::InvalidUserInfo(format!("malformed user info: {e}")))
}
