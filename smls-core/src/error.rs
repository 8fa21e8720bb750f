use thiserror::Error;

/// Errors surfaced by the login flow.
///
/// The `Display` output is meant for operator logs and may carry the raw
/// body a provider returned. It never contains client secrets or tokens.
/// Use [`AuthError::user_message`] for anything shown to an end user.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The requested provider is not one of the supported providers.
    #[error("Unsupported OAuth provider: {0}")]
    UnsupportedProvider(String),
    /// No pending authorization was found for the callback.
    #[error("No pending authorization found for this session")]
    MissingFlowState,
    /// The returned state does not belong to the pending authorization.
    #[error("State parameter mismatch, possible CSRF attempt")]
    StateMismatch,
    /// The user declined or the provider reported an authorization error.
    #[error("Authorization denied: {0}")]
    AuthorizationDenied(String),
    /// The token endpoint rejected the code or returned no access token.
    #[error("Token exchange failed: {0}")]
    TokenExchangeFailed(String),
    /// The user-info endpoint could not be queried.
    #[error("User info retrieval failed: {0}")]
    UserInfoFetchFailed(String),
    /// The user-info payload is missing mandatory fields or is malformed.
    #[error("Invalid user information: {0}")]
    InvalidUserInfo(String),
    /// The secondary LinkedIn profile-picture lookup failed. Never fatal.
    #[error("Profile picture lookup failed: {0}")]
    PictureLookupFailed(String),
    /// Client credentials failed format validation.
    #[error("Invalid client credentials: {0}")]
    InvalidCredentials(String),
    /// The HTTP client could not be built.
    #[error("HTTP client error: {0}")]
    Http(String),
    /// The session store failed.
    #[error("Session error: {0}")]
    Session(String),
}

impl AuthError {
    /// A message that is safe to show to an end user.
    pub fn user_message(&self) -> String {
        match self {
            AuthError::UnsupportedProvider(_) => "This login provider is not supported.".into(),
            AuthError::MissingFlowState => "Invalid session. Please try again.".into(),
            AuthError::StateMismatch => "Invalid state parameter. Possible CSRF attack.".into(),
            AuthError::AuthorizationDenied(reason) => format!("Authorization failed: {reason}"),
            AuthError::TokenExchangeFailed(_) => {
                "The login provider rejected the sign-in. Please start the login again.".into()
            }
            AuthError::UserInfoFetchFailed(_) | AuthError::InvalidUserInfo(_) => {
                "Failed to obtain user information. Please start the login again.".into()
            }
            AuthError::PictureLookupFailed(_) => "Profile picture unavailable.".into(),
            AuthError::InvalidCredentials(reason) => reason.clone(),
            AuthError::Http(_) | AuthError::Session(_) => {
                "An internal error occurred. Please try again.".into()
            }
        }
    }

    /// Whether the failure may indicate an attack on the flow.
    pub fn is_security_relevant(&self) -> bool {
        matches!(self, AuthError::StateMismatch)
    }
}
