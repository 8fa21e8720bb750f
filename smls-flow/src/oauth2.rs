use async_trait::async_trait;
use smls_core::csrf::{generate_state, state_prefix};
use smls_core::pkce::Pkce;
use smls_core::{
    AuthError, AuthorizationRequest, CallbackParams, CanonicalIdentity, ClientCredentials,
    ErasedOAuthFlow, OAuthProvider, PendingAuthorization, Provider, TokenRequest,
};

/// Orchestrates the standard OAuth2 Authorization Code flow.
pub struct OAuth2Flow<P: OAuthProvider> {
    provider: P,
}

#[async_trait]
impl<P: OAuthProvider> ErasedOAuthFlow for OAuth2Flow<P> {
    fn provider(&self) -> Provider {
        self.provider.provider()
    }

    fn initiate_login(&self, client_id: &str, redirect_uri: &str) -> AuthorizationRequest {
        self.initiate_login(client_id, redirect_uri)
    }

    async fn finalize_login(
        &self,
        callback: &CallbackParams,
        expected: Option<&PendingAuthorization>,
        credentials: &ClientCredentials,
    ) -> Result<CanonicalIdentity, AuthError> {
        self.finalize_login(callback, expected, credentials).await
    }
}

impl<P: OAuthProvider> OAuth2Flow<P> {
    /// Create a new `OAuth2Flow` with the given provider.
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    /// Generates the redirect URL together with a fresh state and, when the
    /// provider uses PKCE, a fresh verifier and challenge.
    pub fn initiate_login(&self, client_id: &str, redirect_uri: &str) -> AuthorizationRequest {
        let provider = self.provider.provider();
        let state = generate_state();
        let pkce = self.provider.uses_pkce().then(Pkce::new);
        let url = self.provider.get_authorization_url(
            client_id,
            redirect_uri,
            &state,
            pkce.as_ref().map(|p| p.code_challenge.as_str()),
        );

        log::info!(
            "Starting {} login (state {}..., pkce: {})",
            provider.display_name(),
            state_prefix(&state),
            pkce.is_some()
        );

        let (code_verifier, code_challenge) = match pkce {
            Some(pkce) => (Some(pkce.code_verifier), Some(pkce.code_challenge)),
            None => (None, None),
        };

        AuthorizationRequest {
            provider,
            client_id: client_id.to_string(),
            redirect_uri: redirect_uri.to_string(),
            state,
            code_verifier,
            code_challenge,
            url,
        }
    }

    /// Validates the callback against the pending authorization, exchanges
    /// the code and returns the normalized identity.
    ///
    /// Checks run in a fixed order and the first failing one is returned.
    /// No network call is made before the state and code checks pass.
    pub async fn finalize_login(
        &self,
        callback: &CallbackParams,
        expected: Option<&PendingAuthorization>,
        credentials: &ClientCredentials,
    ) -> Result<CanonicalIdentity, AuthError> {
        let provider = self.provider.provider();

        let Some(expected) = expected else {
            log::warn!("{} callback without a pending authorization", provider);
            return Err(AuthError::MissingFlowState);
        };

        let returned_state = callback.state.as_deref().unwrap_or_default();
        if expected.provider != provider || returned_state != expected.state {
            log::warn!(
                "{} callback state mismatch: expected {}..., got {}...",
                provider,
                state_prefix(&expected.state),
                state_prefix(returned_state)
            );
            return Err(AuthError::StateMismatch);
        }

        let Some(code) = callback.code.as_deref().filter(|c| !c.is_empty()) else {
            let reason = callback
                .error
                .clone()
                .filter(|e| !e.is_empty())
                .unwrap_or_else(|| "Unknown error".to_string());
            log::warn!(
                "{} authorization denied: {} ({})",
                provider,
                reason,
                callback.error_description.as_deref().unwrap_or("no description")
            );
            return Err(AuthError::AuthorizationDenied(reason));
        };

        let code_verifier = expected.code_verifier.as_deref();
        if self.provider.uses_pkce() && code_verifier.is_none() {
            log::warn!("{} callback without the PKCE verifier", provider);
            return Err(AuthError::MissingFlowState);
        }

        let request = TokenRequest {
            code,
            client_id: &credentials.client_id,
            client_secret: &credentials.client_secret,
            redirect_uri: &expected.redirect_uri,
            code_verifier,
        };
        let token = self.provider.exchange_code(&request).await.inspect_err(|e| {
            log::error!("{} token exchange failed: {}", provider, e);
        })?;

        let identity = self
            .provider
            .fetch_identity(&token)
            .await
            .and_then(CanonicalIdentity::validate)
            .inspect_err(|e| {
                log::error!("{} user info retrieval failed: {}", provider, e);
            })?;

        log::info!("{} login completed for user {}", provider, identity.id);
        Ok(identity)
    }
}
