//! # SMLS Flow
//!
//! `smls-flow` orchestrates the OAuth2 Authorization Code flow for the
//! supported providers. It is the bridge between the core traits, the
//! provider adapters, and the web layer.
//!
//! ## Key Components
//!
//! - **[`OAuth2Flow`]**: Runs both legs of an Authorization Code login for one provider.
//! - **[`OAuthConfig`]**: Immutable configuration resolved once at startup.
//! - **[`OAuthManager`]**: Holds one flow per [`Provider`] and dispatches on it.

#![warn(missing_docs)]

pub use smls_core::ErasedOAuthFlow;
use smls_core::{
    http, AuthError, AuthorizationRequest, CallbackParams, CanonicalIdentity, ClientCredentials,
    PendingAuthorization, Provider, ProviderEndpoints,
};
use smls_providers_google::GoogleProvider;
use smls_providers_linkedin::LinkedInProvider;
use std::time::Duration;

pub use chrono;

/// OAuth2 Authorization Code flow implementation.
pub mod oauth2;

pub use oauth2::OAuth2Flow;

/// Base URL used when none is configured.
pub const DEFAULT_BASE_URL: &str = "http://localhost:5000";

/// Configuration of the OAuth core.
#[derive(Debug, Clone)]
pub struct OAuthConfig {
    /// Public base URL of the service.
    pub base_url: String,
    /// Base URL to build redirect URIs from when the service is reached
    /// under a different address than `base_url` (e.g. behind a tunnel).
    pub runtime_base_url: Option<String>,
    /// Timeout of every outbound provider call.
    pub http_timeout: Duration,
    /// Whether Google authorization requests carry a PKCE challenge.
    pub google_pkce: bool,
    /// Whether LinkedIn authorization requests carry a PKCE challenge.
    pub linkedin_pkce: bool,
    /// How long a pending authorization stays valid.
    pub flow_ttl: chrono::Duration,
}

impl Default for OAuthConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            runtime_base_url: None,
            http_timeout: http::DEFAULT_TIMEOUT,
            google_pkce: true,
            linkedin_pkce: false,
            flow_ttl: chrono::Duration::minutes(15),
        }
    }
}

impl OAuthConfig {
    /// The base URL redirect URIs are derived from.
    pub fn effective_base_url(&self) -> &str {
        self.runtime_base_url
            .as_deref()
            .filter(|url| !url.trim().is_empty())
            .unwrap_or(&self.base_url)
    }

    /// The default redirect URI of `provider`.
    pub fn redirect_uri(&self, provider: Provider) -> String {
        provider.redirect_uri(self.effective_base_url())
    }
}

/// Entry point of the OAuth core: one flow per provider.
///
/// Immutable after construction; share it behind an `Arc`.
pub struct OAuthManager {
    config: OAuthConfig,
    google: OAuth2Flow<GoogleProvider>,
    linkedin: OAuth2Flow<LinkedInProvider>,
}

impl OAuthManager {
    /// Create a manager talking to the providers' production endpoints.
    pub fn new(config: OAuthConfig) -> Result<Self, AuthError> {
        Self::with_endpoints(
            config,
            Provider::Google.default_endpoints(),
            Provider::LinkedIn.default_endpoints(),
        )
    }

    /// Create a manager with explicit provider endpoints.
    pub fn with_endpoints(
        config: OAuthConfig,
        google: ProviderEndpoints,
        linkedin: ProviderEndpoints,
    ) -> Result<Self, AuthError> {
        let client = http::build_client(config.http_timeout)?;
        let google = GoogleProvider::new(client.clone())
            .with_endpoints(google)
            .with_pkce(config.google_pkce);
        let linkedin = LinkedInProvider::new(client)
            .with_endpoints(linkedin)
            .with_pkce(config.linkedin_pkce);

        Ok(Self {
            config,
            google: OAuth2Flow::new(google),
            linkedin: OAuth2Flow::new(linkedin),
        })
    }

    /// The configuration this manager was built with.
    pub fn config(&self) -> &OAuthConfig {
        &self.config
    }

    /// The flow that handles `provider`.
    pub fn flow(&self, provider: Provider) -> &dyn ErasedOAuthFlow {
        match provider {
            Provider::Google => &self.google,
            Provider::LinkedIn => &self.linkedin,
        }
    }

    /// Builds the authorization URL for `provider`.
    ///
    /// `redirect_uri` defaults to the provider's callback under the
    /// configured base URL. Makes no network call.
    pub fn build_authorization_url(
        &self,
        provider: Provider,
        client_id: &str,
        redirect_uri: Option<&str>,
    ) -> AuthorizationRequest {
        let redirect_uri = redirect_uri
            .map(str::to_string)
            .unwrap_or_else(|| self.config.redirect_uri(provider));
        self.flow(provider).initiate_login(client_id, &redirect_uri)
    }

    /// Validates a callback and completes the login.
    ///
    /// A pending authorization older than the configured flow TTL is
    /// treated as missing.
    pub async fn complete_authorization(
        &self,
        provider: Provider,
        callback: &CallbackParams,
        expected: Option<&PendingAuthorization>,
        credentials: &ClientCredentials,
    ) -> Result<CanonicalIdentity, AuthError> {
        let expected = expected.filter(|pending| {
            let expired = pending.is_expired(self.config.flow_ttl);
            if expired {
                log::warn!("Discarding expired {} authorization", pending.provider);
            }
            !expired
        });
        self.flow(provider)
            .finalize_login(callback, expected, credentials)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use smls_core::pkce::generate_code_challenge;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn credentials() -> ClientCredentials {
        ClientCredentials::new("abc.apps.googleusercontent.com", "google-secret")
    }

    fn mock_manager(server: &MockServer, config: OAuthConfig) -> OAuthManager {
        OAuthManager::with_endpoints(
            config,
            ProviderEndpoints::rebased(&server.uri(), Provider::Google),
            ProviderEndpoints::rebased(&server.uri(), Provider::LinkedIn),
        )
        .unwrap()
    }

    fn query(url: &str) -> Vec<(String, String)> {
        url::Url::parse(url)
            .unwrap()
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect()
    }

    fn param<'a>(pairs: &'a [(String, String)], key: &str) -> Option<&'a str> {
        pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    fn callback(code: Option<&str>, state: &str) -> CallbackParams {
        CallbackParams {
            code: code.map(str::to_string),
            state: Some(state.to_string()),
            ..Default::default()
        }
    }

    async fn mount_unreachable_token(server: &MockServer) {
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(server)
            .await;
    }

    #[test]
    fn google_url_is_well_formed() {
        let manager = OAuthManager::new(OAuthConfig::default()).unwrap();
        let request = manager.build_authorization_url(Provider::Google, "abc", None);

        let url = url::Url::parse(&request.url).unwrap();
        assert_eq!(url.host_str(), Some("accounts.google.com"));
        let pairs = query(&request.url);
        assert_eq!(param(&pairs, "client_id"), Some("abc"));
        assert_eq!(param(&pairs, "code_challenge_method"), Some("S256"));
        assert_eq!(
            param(&pairs, "redirect_uri"),
            Some("http://localhost:5000/auth/google/callback")
        );

        assert_eq!(param(&pairs, "state"), Some(request.state.as_str()));
        assert_eq!(request.state.len(), 43);
        let verifier = request.code_verifier.as_deref().unwrap();
        let challenge = param(&pairs, "code_challenge").unwrap();
        assert_eq!(challenge, generate_code_challenge(verifier));
        assert_eq!(request.code_challenge.as_deref(), Some(challenge));
    }

    #[test]
    fn linkedin_pkce_follows_config() {
        let manager = OAuthManager::new(OAuthConfig::default()).unwrap();
        let request = manager.build_authorization_url(Provider::LinkedIn, "li-client", None);
        assert!(request.code_verifier.is_none());
        assert!(!request.url.contains("code_challenge"));

        let manager = OAuthManager::new(OAuthConfig {
            linkedin_pkce: true,
            ..Default::default()
        })
        .unwrap();
        let request = manager.build_authorization_url(Provider::LinkedIn, "li-client", None);
        assert!(request.code_verifier.is_some());
        assert!(request.url.contains("code_challenge_method=S256"));
    }

    #[test]
    fn each_request_gets_fresh_artifacts() {
        let manager = OAuthManager::new(OAuthConfig::default()).unwrap();
        let first = manager.build_authorization_url(Provider::Google, "abc", None);
        let second = manager.build_authorization_url(Provider::Google, "abc", None);
        assert_ne!(first.state, second.state);
        assert_ne!(first.code_verifier, second.code_verifier);
    }

    #[test]
    fn redirect_uri_prefers_runtime_base_url() {
        let config = OAuthConfig {
            base_url: "https://smls.example.com/".into(),
            ..Default::default()
        };
        assert_eq!(
            config.redirect_uri(Provider::LinkedIn),
            "https://smls.example.com/auth/linkedin/callback"
        );

        let config = OAuthConfig {
            runtime_base_url: Some("https://abc.ngrok.app".into()),
            ..config
        };
        assert_eq!(
            config.redirect_uri(Provider::Google),
            "https://abc.ngrok.app/auth/google/callback"
        );
    }

    #[test]
    fn explicit_redirect_uri_wins() {
        let manager = OAuthManager::new(OAuthConfig::default()).unwrap();
        let request = manager.build_authorization_url(
            Provider::Google,
            "abc",
            Some("https://elsewhere.example.com/cb"),
        );
        assert_eq!(request.redirect_uri, "https://elsewhere.example.com/cb");
        assert_eq!(request.pending().redirect_uri, request.redirect_uri);
    }

    #[tokio::test]
    async fn missing_pending_flow_is_rejected() {
        let server = MockServer::start().await;
        mount_unreachable_token(&server).await;
        let manager = mock_manager(&server, OAuthConfig::default());

        let err = manager
            .complete_authorization(
                Provider::Google,
                &callback(Some("code"), "whatever"),
                None,
                &credentials(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::MissingFlowState));
    }

    #[tokio::test]
    async fn state_mismatch_makes_no_network_call() {
        let server = MockServer::start().await;
        mount_unreachable_token(&server).await;
        let manager = mock_manager(&server, OAuthConfig::default());
        let pending = manager
            .build_authorization_url(Provider::Google, "abc", None)
            .pending();

        let err = manager
            .complete_authorization(
                Provider::Google,
                &callback(Some("code"), "not-the-state"),
                Some(&pending),
                &credentials(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::StateMismatch));
        assert!(err.is_security_relevant());
    }

    #[tokio::test]
    async fn pending_flow_of_other_provider_is_a_mismatch() {
        let server = MockServer::start().await;
        mount_unreachable_token(&server).await;
        let manager = mock_manager(&server, OAuthConfig::default());
        let pending = manager
            .build_authorization_url(Provider::LinkedIn, "li-client", None)
            .pending();

        let err = manager
            .complete_authorization(
                Provider::Google,
                &callback(Some("code"), &pending.state),
                Some(&pending),
                &credentials(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::StateMismatch));
    }

    #[tokio::test]
    async fn empty_code_is_denied_without_network_call() {
        let server = MockServer::start().await;
        mount_unreachable_token(&server).await;
        let manager = mock_manager(&server, OAuthConfig::default());
        let pending = manager
            .build_authorization_url(Provider::Google, "abc", None)
            .pending();

        let err = manager
            .complete_authorization(
                Provider::Google,
                &callback(Some(""), &pending.state),
                Some(&pending),
                &credentials(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::AuthorizationDenied(reason) if reason == "Unknown error"));

        let denied = CallbackParams {
            error: Some("access_denied".into()),
            ..callback(None, &pending.state)
        };
        let err = manager
            .complete_authorization(Provider::Google, &denied, Some(&pending), &credentials())
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::AuthorizationDenied(reason) if reason == "access_denied"));
    }

    #[tokio::test]
    async fn pkce_flow_without_verifier_is_rejected() {
        let server = MockServer::start().await;
        mount_unreachable_token(&server).await;
        let manager = mock_manager(&server, OAuthConfig::default());
        let mut pending = manager
            .build_authorization_url(Provider::Google, "abc", None)
            .pending();
        pending.code_verifier = None;

        let err = manager
            .complete_authorization(
                Provider::Google,
                &callback(Some("code"), &pending.state),
                Some(&pending),
                &credentials(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::MissingFlowState));
    }

    #[tokio::test]
    async fn expired_pending_flow_is_treated_as_missing() {
        let server = MockServer::start().await;
        mount_unreachable_token(&server).await;
        let manager = mock_manager(&server, OAuthConfig::default());
        let mut pending = manager
            .build_authorization_url(Provider::Google, "abc", None)
            .pending();
        pending.created_at = chrono::Utc::now() - chrono::Duration::minutes(20);

        let err = manager
            .complete_authorization(
                Provider::Google,
                &callback(Some("code"), &pending.state),
                Some(&pending),
                &credentials(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::MissingFlowState));
    }

    #[tokio::test]
    async fn google_login_completes() {
        let server = MockServer::start().await;
        let manager = mock_manager(&server, OAuthConfig::default());
        let request = manager.build_authorization_url(Provider::Google, "abc", None);
        let verifier = request.code_verifier.clone().unwrap();

        Mock::given(method("POST"))
            .and(path("/token"))
            .and(body_string_contains("code=the-code"))
            .and(body_string_contains(format!("code_verifier={verifier}")))
            .and(body_string_contains(
                "redirect_uri=http%3A%2F%2Flocalhost%3A5000%2Fauth%2Fgoogle%2Fcallback",
            ))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "ya29.token",
                "token_type": "Bearer",
                "expires_in": 3599
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/userinfo"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "1098",
                "name": "Ada Lovelace",
                "email": "ada@example.com",
                "verified_email": true
            })))
            .expect(1)
            .mount(&server)
            .await;

        let pending = request.pending();
        let identity = manager
            .complete_authorization(
                Provider::Google,
                &callback(Some("the-code"), &pending.state),
                Some(&pending),
                &credentials(),
            )
            .await
            .unwrap();
        assert_eq!(identity.id, "1098");
        assert_eq!(identity.provider, Provider::Google);
        assert_eq!(identity.email.as_deref(), Some("ada@example.com"));
    }

    #[tokio::test]
    async fn linkedin_login_completes_without_verifier() {
        let server = MockServer::start().await;
        let manager = mock_manager(&server, OAuthConfig::default());
        let pending = manager
            .build_authorization_url(Provider::LinkedIn, "li-client", None)
            .pending();

        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "li-token",
                "expires_in": 5184000
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/userinfo"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "sub": "li-1",
                "name": "Jane Doe",
                "picture": "https://media.licdn.com/jane"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let identity = manager
            .complete_authorization(
                Provider::LinkedIn,
                &callback(Some("li-code"), &pending.state),
                Some(&pending),
                &ClientCredentials::new("li-client", "li-secret"),
            )
            .await
            .unwrap();
        assert_eq!(identity.id, "li-1");
        assert_eq!(identity.provider, Provider::LinkedIn);
    }

    #[tokio::test]
    async fn token_rejection_is_reported() {
        let server = MockServer::start().await;
        let manager = mock_manager(&server, OAuthConfig::default());
        let pending = manager
            .build_authorization_url(Provider::Google, "abc", None)
            .pending();

        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(
                ResponseTemplate::new(400).set_body_string("{\"error\":\"invalid_grant\"}"),
            )
            .expect(1)
            .mount(&server)
            .await;

        let err = manager
            .complete_authorization(
                Provider::Google,
                &callback(Some("stale"), &pending.state),
                Some(&pending),
                &credentials(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::TokenExchangeFailed(body) if body.contains("invalid_grant")));
    }
}
