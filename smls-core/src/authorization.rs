use crate::provider::Provider;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// The first leg of a login: where to send the user, and what to remember.
#[derive(Debug, Clone)]
pub struct AuthorizationRequest {
    /// Provider the user is sent to.
    pub provider: Provider,
    /// Client id embedded in the URL.
    pub client_id: String,
    /// Redirect URI embedded in the URL; the token exchange must reuse it.
    pub redirect_uri: String,
    /// Anti-CSRF state embedded in the URL.
    pub state: String,
    /// PKCE verifier, present when the provider uses PKCE.
    pub code_verifier: Option<String>,
    /// PKCE challenge derived from `code_verifier`.
    pub code_challenge: Option<String>,
    /// The fully formed authorization URL.
    pub url: String,
}

impl AuthorizationRequest {
    /// The part of the request the caller must persist until the callback.
    pub fn pending(&self) -> PendingAuthorization {
        PendingAuthorization {
            provider: self.provider,
            state: self.state.clone(),
            code_verifier: self.code_verifier.clone(),
            redirect_uri: self.redirect_uri.clone(),
            created_at: Utc::now(),
        }
    }
}

/// Flow artifacts persisted between the two legs of a login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingAuthorization {
    /// Provider the flow was started with.
    pub provider: Provider,
    /// The state expected back on the callback.
    pub state: String,
    /// PKCE verifier for the token exchange.
    pub code_verifier: Option<String>,
    /// Redirect URI used in the authorization request.
    pub redirect_uri: String,
    /// When the flow was started.
    pub created_at: DateTime<Utc>,
}

impl PendingAuthorization {
    /// Whether the flow is older than `ttl`.
    pub fn is_expired(&self, ttl: Duration) -> bool {
        Utc::now() - self.created_at > ttl
    }
}

/// Query parameters a provider sends back to the callback route.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallbackParams {
    /// Authorization code.
    pub code: Option<String>,
    /// Returned state.
    pub state: Option<String>,
    /// Error code when authorization was refused.
    pub error: Option<String>,
    /// Optional human readable error detail.
    pub error_description: Option<String>,
}

/// Appends urlencoded `params` to an authorization endpoint.
///
/// Spaces are encoded as `+`, as in `application/x-www-form-urlencoded`.
pub fn encode_authorization_url(endpoint: &str, params: &[(&str, &str)]) -> String {
    let query = url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(params)
        .finish();
    let separator = if endpoint.contains('?') { '&' } else { '?' };
    format!("{endpoint}{separator}{query}")
}

/// Form fields of an authorization-code token request.
#[derive(Clone)]
pub struct TokenRequest<'a> {
    /// The authorization code.
    pub code: &'a str,
    /// Client identifier.
    pub client_id: &'a str,
    /// Client secret.
    pub client_secret: &'a str,
    /// Redirect URI used on the first leg.
    pub redirect_uri: &'a str,
    /// PKCE verifier, when PKCE was used.
    pub code_verifier: Option<&'a str>,
}

impl TokenRequest<'_> {
    /// The urlencoded form body, in a stable order.
    pub fn form(&self) -> Vec<(&'static str, &str)> {
        let mut form = vec![
            ("grant_type", "authorization_code"),
            ("code", self.code),
            ("client_id", self.client_id),
            ("client_secret", self.client_secret),
            ("redirect_uri", self.redirect_uri),
        ];
        if let Some(verifier) = self.code_verifier {
            form.push(("code_verifier", verifier));
        }
        form
    }
}
