use async_trait::async_trait;
use serde::Deserialize;
use smls_core::pkce::CODE_CHALLENGE_METHOD;
use smls_core::{
    encode_authorization_url, http, AuthError, CanonicalIdentity, OAuthProvider, Provider,
    ProviderEndpoints, TokenRequest, TokenResponse,
};

/// Profile-picture lookup against LinkedIn's media projection.
pub mod picture;

/// Name used when the profile carries no usable name.
pub const DEFAULT_DISPLAY_NAME: &str = "LinkedIn User";

/// Sign In with LinkedIn using OpenID Connect.
///
/// PKCE is off by default; enable it with [`LinkedInProvider::with_pkce`]
/// once the LinkedIn app is registered for it.
pub struct LinkedInProvider {
    http_client: reqwest::Client,
    endpoints: ProviderEndpoints,
    pkce: bool,
}

impl LinkedInProvider {
    /// Create a provider using LinkedIn's production endpoints.
    pub fn new(http_client: reqwest::Client) -> Self {
        Self {
            http_client,
            endpoints: Provider::LinkedIn.default_endpoints(),
            pkce: false,
        }
    }

    /// Override the endpoints, e.g. to target a mock server.
    pub fn with_endpoints(mut self, endpoints: ProviderEndpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    /// Enable or disable PKCE.
    pub fn with_pkce(mut self, enabled: bool) -> Self {
        self.pkce = enabled;
        self
    }

    /// Looks up the largest profile picture. Any failure is reported as
    /// [`AuthError::PictureLookupFailed`].
    async fn fetch_picture(&self, access_token: &str) -> Result<Option<String>, AuthError> {
        let Some(picture_url) = self.endpoints.picture_url.as_deref() else {
            return Ok(None);
        };
        let (name, value) = picture::RESTLI_PROTOCOL_HEADER;
        let raw = http::bearer_get(&self.http_client, picture_url, access_token, &[(name, value)])
            .await
            .map_err(|e| AuthError::PictureLookupFailed(e.to_string()))?;
        if !raw.status.is_success() {
            return Err(AuthError::PictureLookupFailed(format!(
                "{}: {}",
                raw.status, raw.body
            )));
        }
        picture::largest_image_url(&raw.body)
            .map_err(|e| AuthError::PictureLookupFailed(format!("malformed response: {e}")))
    }
}

#[derive(Deserialize)]
struct LinkedInUserInfo {
    sub: Option<String>,
    name: Option<String>,
    given_name: Option<String>,
    family_name: Option<String>,
    email: Option<String>,
    email_verified: Option<bool>,
    picture: Option<String>,
}

impl LinkedInUserInfo {
    fn display_name(&self) -> String {
        if let Some(name) = self.name.as_deref().map(str::trim).filter(|n| !n.is_empty()) {
            return name.to_string();
        }
        let joined = format!(
            "{} {}",
            self.given_name.as_deref().unwrap_or_default(),
            self.family_name.as_deref().unwrap_or_default()
        );
        let joined = joined.trim();
        if joined.is_empty() {
            DEFAULT_DISPLAY_NAME.to_string()
        } else {
            joined.to_string()
        }
    }

    fn subject(&self) -> Result<String, AuthError> {
        self.sub
            .as_deref()
            .filter(|sub| !sub.trim().is_empty())
            .map(str::to_string)
            .ok_or_else(|| AuthError::InvalidUserInfo("LinkedIn user info carries no sub".into()))
    }

    fn into_identity(
        self,
        id: String,
        picture: Option<String>,
    ) -> Result<CanonicalIdentity, AuthError> {
        let name = self.display_name();
        CanonicalIdentity {
            id,
            name,
            email: self.email.filter(|e| !e.is_empty()),
            email_verified: self.email_verified,
            picture,
            provider: Provider::LinkedIn,
        }
        .validate()
    }
}

#[async_trait]
impl OAuthProvider for LinkedInProvider {
    fn provider(&self) -> Provider {
        Provider::LinkedIn
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
            ("response_type", "code"),
            ("client_id", client_id),
            ("redirect_uri", redirect_uri),
            ("state", state),
            ("scope", self.endpoints.scope.as_str()),
        ];
        if let Some(challenge) = code_challenge {
            params.push(("code_challenge", challenge));
            params.push(("code_challenge_method", CODE_CHALLENGE_METHOD));
        }

        encode_authorization_url(&self.endpoints.authorize_url, &params)
    }

    async fn exchange_code(&self, request: &TokenRequest<'_>) -> Result<TokenResponse, AuthError> {
        http::exchange_code(&self.http_client, &self.endpoints.token_url, request).await
    }

    async fn fetch_identity(&self, token: &TokenResponse) -> Result<CanonicalIdentity, AuthError> {
        let user_info: LinkedInUserInfo = http::fetch_userinfo(
            &self.http_client,
            &self.endpoints.userinfo_url,
            &token.access_token,
        )
        .await?;
        let id = user_info.subject()?;

        // The picture claim is preferred; the media projection is a fallback
        // and never fails the login.
        let picture = match user_info.picture.clone().filter(|p| !p.is_empty()) {
            Some(picture) => Some(picture),
            None => match self.fetch_picture(&token.access_token).await {
                Ok(picture) => picture,
                Err(e) => {
                    log::warn!("Continuing LinkedIn login without a picture: {e}");
                    None
                }
            },
        };

        user_info.into_identity(id, picture)
    }
}
