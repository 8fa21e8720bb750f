use async_trait::async_trait;
use serde::Deserialize;
use smls_core::pkce::CODE_CHALLENGE_METHOD;
use smls_core::{
    encode_authorization_url, http, AuthError, CanonicalIdentity, OAuthProvider, Provider,
    ProviderEndpoints, TokenRequest, TokenResponse,
};

/// Google sign-in over OAuth 2.0 with PKCE.
pub struct GoogleProvider {
    http_client: reqwest::Client,
    endpoints: ProviderEndpoints,
    pkce: bool,
}

impl GoogleProvider {
    /// Create a provider using Google's production endpoints.
    pub fn new(http_client: reqwest::Client) -> Self {
        Self {
            http_client,
            endpoints: Provider::Google.default_endpoints(),
            pkce: true,
        }
    }

    /// Override the endpoints, e.g. to target a mock server.
    pub fn with_endpoints(mut self, endpoints: ProviderEndpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    /// Enable or disable PKCE. Enabled by default.
    pub fn with_pkce(mut self, enabled: bool) -> Self {
        self.pkce = enabled;
        self
    }
}

#[derive(Deserialize)]
struct GoogleUserInfo {
    id: Option<String>,
    sub: Option<String>,
    name: Option<String>,
    email: Option<String>,
    verified_email: Option<bool>,
    email_verified: Option<bool>,
    picture: Option<String>,
}

impl GoogleUserInfo {
    fn into_identity(self) -> Result<CanonicalIdentity, AuthError> {
        let id = self
            .id
            .or(self.sub)
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| {
                AuthError::InvalidUserInfo("Google user info carries no id".into())
            })?;

        CanonicalIdentity {
            id,
            name: self.name.unwrap_or_default(),
            email: self.email.filter(|e| !e.is_empty()),
            email_verified: self.verified_email.or(self.email_verified),
            picture: self.picture.filter(|p| !p.is_empty()),
            provider: Provider::Google,
        }
        .validate()
    }
}

#[async_trait]
impl OAuthProvider for GoogleProvider {
    fn provider(&self) -> Provider {
        Provider::Google
    }

    fn uses_pkce(&self) -> bool {
        self.pkce
    }

    fn get_authorization_url(
        &self,
        client_id: &str,
        redirect_uri: &str,
        state: &str,
        code_challenge: Option<&str>,
    ) -> String {
        let mut params = vec![
            ("client_id", client_id),
            ("redirect_uri", redirect_uri),
            ("scope", self.endpoints.scope.as_str()),
            ("response_type", "code"),
            ("state", state),
        ];
        if let Some(challenge) = code_challenge {
            params.push(("code_challenge", challenge));
            params.push(("code_challenge_method", CODE_CHALLENGE_METHOD));
        }
        // Offline access plus forced consent so a refresh token is issued.
        params.push(("access_type", "offline"));
        params.push(("prompt", "consent"));

        encode_authorization_url(&self.endpoints.authorize_url, &params)
    }

    async fn exchange_code(&self, request: &TokenRequest<'_>) -> Result<TokenResponse, AuthError> {
        http::exchange_code(&self.http_client, &self.endpoints.token_url, request).await
    }

    async fn fetch_identity(&self, token: &TokenResponse) -> Result<CanonicalIdentity, AuthError> {
        let user_info: GoogleUserInfo = http::fetch_userinfo(
            &self.http_client,
            &self.endpoints.userinfo_url,
            &token.access_token,
        )
        .await?;
        user_info.into_identity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider_for(server: &MockServer) -> GoogleProvider {
        GoogleProvider::new(reqwest::Client::new())
            .with_endpoints(ProviderEndpoints::rebased(&server.uri(), Provider::Google))
    }

    fn token() -> TokenResponse {
        TokenResponse {
            access_token: "ya29.token".into(),
            token_type: "Bearer".into(),
            expires_in: Some(3599),
            refresh_token: None,
        }
    }

    #[test]
    fn authorization_url_carries_google_parameters() {
        let provider = GoogleProvider::new(reqwest::Client::new());
        let url = provider.get_authorization_url(
            "abc",
            "http://localhost:5000/auth/google/callback",
            "st",
            Some("ch"),
        );
        assert!(url.starts_with("https://accounts.google.com/o/oauth2/v2/auth?"));
        for expected in [
            "client_id=abc",
            "scope=openid+email+profile",
            "response_type=code",
            "state=st",
            "code_challenge=ch",
            "code_challenge_method=S256",
            "access_type=offline",
            "prompt=consent",
            "redirect_uri=http%3A%2F%2Flocalhost%3A5000%2Fauth%2Fgoogle%2Fcallback",
        ] {
            assert!(url.contains(expected), "{expected} missing from {url}");
        }
    }

    #[test]
    fn authorization_url_without_challenge_omits_pkce() {
        let provider = GoogleProvider::new(reqwest::Client::new()).with_pkce(false);
        assert!(!provider.uses_pkce());
        let url = provider.get_authorization_url("abc", "http://h/cb", "st", None);
        assert!(!url.contains("code_challenge"));
    }

    #[tokio::test]
    async fn fetch_identity_passes_fields_through() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/userinfo"))
            .and(header("authorization", "Bearer ya29.token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "1098",
                "name": "Ada Lovelace",
                "email": "ada@example.com",
                "verified_email": true,
                "picture": "https://lh3.googleusercontent.com/a/photo"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let identity = provider_for(&server).fetch_identity(&token()).await.unwrap();
        assert_eq!(identity.id, "1098");
        assert_eq!(identity.name, "Ada Lovelace");
        assert_eq!(identity.email.as_deref(), Some("ada@example.com"));
        assert_eq!(identity.email_verified, Some(true));
        assert_eq!(
            identity.picture.as_deref(),
            Some("https://lh3.googleusercontent.com/a/photo")
        );
        assert_eq!(identity.provider, Provider::Google);
    }

    #[tokio::test]
    async fn fetch_identity_falls_back_to_sub() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/userinfo"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "sub": "oidc-42",
                "name": "Ada"
            })))
            .mount(&server)
            .await;

        let identity = provider_for(&server).fetch_identity(&token()).await.unwrap();
        assert_eq!(identity.id, "oidc-42");
        assert_eq!(identity.email, None);
    }

    #[tokio::test]
    async fn missing_id_is_invalid_user_info() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/userinfo"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "name": "Nobody",
                "email": "nobody@example.com"
            })))
            .mount(&server)
            .await;

        let err = provider_for(&server).fetch_identity(&token()).await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidUserInfo(_)));
    }
}
