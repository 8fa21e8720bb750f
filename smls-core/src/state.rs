use crate::error::AuthError;
use crate::provider::Provider;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The normalized identity handed back after a successful login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalIdentity {
    /// Provider-scoped subject identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Email address, when the provider released one.
    pub email: Option<String>,
    /// Whether the provider vouches for the email address.
    #[serde(default)]
    pub email_verified: Option<bool>,
    /// Profile picture URL.
    pub picture: Option<String>,
    /// The provider that authenticated the user.
    pub provider: Provider,
}

impl CanonicalIdentity {
    /// Checks the invariants every returned identity must hold.
    pub fn validate(self) -> Result<Self, AuthError> {
        if self.id.trim().is_empty() {
            return Err(AuthError::InvalidUserInfo(format!(
                "{} returned an empty subject identifier",
                self.provider.display_name()
            )));
        }
        Ok(self)
    }
}

/// Tokens returned by a provider's token endpoint.
///
/// Only used to fetch the user profile, then dropped.
#[derive(Clone, PartialEq, Eq)]
pub struct TokenResponse {
    /// Bearer token for the user-info endpoint.
    pub access_token: String,
    /// Token type, normally `Bearer`.
    pub token_type: String,
    /// Lifetime of the access token in seconds.
    pub expires_in: Option<u64>,
    /// Refresh token, if offline access was granted.
    pub refresh_token: Option<String>,
}

impl fmt::Debug for TokenResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenResponse")
            .field("access_token", &"[redacted]")
            .field("token_type", &self.token_type)
            .field("expires_in", &self.expires_in)
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "[redacted]"),
            )
            .finish()
    }
}
