//! # SMLS Core
//!
//! `smls-core` provides the foundational traits and types of the SMLS social login gateway.
//! It defines the provider enum, the canonical identity, the flow artifacts exchanged between
//! the two legs of an Authorization Code login, and the security primitives (state and PKCE)
//! those artifacts are built from.

#![warn(missing_docs)]

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// PKCE (Proof Key for Code Exchange) utilities.
pub mod pkce;

/// Anti-CSRF state tokens.
pub mod csrf;

/// Errors that can occur during the authentication process.
pub mod error;
pub use crate::error::AuthError;

/// The canonical identity and provider tokens.
pub mod state;
pub use crate::state::{CanonicalIdentity, TokenResponse};

/// Supported providers and their endpoints.
pub mod provider;
pub use crate::provider::{Provider, ProviderEndpoints};

/// Artifacts of the two legs of a login.
pub mod authorization;
pub use crate::authorization::{
    encode_authorization_url, AuthorizationRequest, CallbackParams, PendingAuthorization,
    TokenRequest,
};

/// Client credential format rules.
pub mod credentials;
pub use crate::credentials::ClientCredentials;

pub mod http;

/// Controls whether a cookie is sent with cross-site requests.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SameSite {
    /// The cookie is sent with "safe" cross-site requests (e.g., following a link).
    Lax,
    /// The cookie is only sent for same-site requests.
    Strict,
    /// The cookie is sent with all requests, including cross-site. Requires `Secure`.
    None,
}

/// Trait for an OAuth2-compatible provider.
///
/// Providers are stateless with respect to credentials: client id and secret
/// are supplied on every call, because they live in the user's session.
#[async_trait]
pub trait OAuthProvider: Send + Sync {
    /// Which provider this is.
    fn provider(&self) -> Provider;

    /// Whether authorization requests carry a PKCE challenge.
    fn uses_pkce(&self) -> bool;

    /// Helper to get the authorization URL.
    fn get_authorization_url(
        &self,
        client_id: &str,
        redirect_uri: &str,
        state: &str,
        code_challenge: Option<&str>,
    ) -> String;

    /// Exchange an authorization code for tokens.
    async fn exchange_code(&self, request: &TokenRequest<'_>) -> Result<TokenResponse, AuthError>;

    /// Fetch the user profile and normalize it.
    async fn fetch_identity(&self, token: &TokenResponse) -> Result<CanonicalIdentity, AuthError>;
}

/// Orchestrates the Authorization Code flow.
#[async_trait]
pub trait ErasedOAuthFlow: Send + Sync {
    /// Get the provider.
    fn provider(&self) -> Provider;
    /// Generates the redirect URL together with fresh state and PKCE artifacts.
    fn initiate_login(&self, client_id: &str, redirect_uri: &str) -> AuthorizationRequest;
    /// Validates the callback and completes the flow.
    async fn finalize_login(
        &self,
        callback: &CallbackParams,
        expected: Option<&PendingAuthorization>,
        credentials: &ClientCredentials,
    ) -> Result<CanonicalIdentity, AuthError>;
}
