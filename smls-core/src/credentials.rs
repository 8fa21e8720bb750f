use crate::error::AuthError;
use crate::provider::Provider;
use serde::{Deserialize, Serialize};
use std::fmt;

const GOOGLE_CLIENT_ID_SUFFIX: &str = ".apps.googleusercontent.com";

/// OAuth client credentials for one provider, as registered by the operator.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientCredentials {
    /// The public client identifier.
    pub client_id: String,
    /// The confidential client secret.
    pub client_secret: String,
}

impl ClientCredentials {
    /// Build credentials, trimming surrounding whitespace.
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into().trim().to_string(),
            client_secret: client_secret.into().trim().to_string(),
        }
    }

    /// Validate the credential format for `provider`.
    pub fn validate(&self, provider: Provider) -> Result<(), AuthError> {
        validate_oauth_credentials(provider.as_str(), &self.client_id, &self.client_secret)
    }
}

impl fmt::Debug for ClientCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[redacted]")
            .finish()
    }
}

/// Format rules applied to a provider's credentials.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CredentialRules {
    /// Minimum length of both id and secret, after trimming.
    pub min_len: usize,
    /// Suffix the client id must carry, if any.
    pub client_id_suffix: Option<&'static str>,
    /// Label used in error messages.
    pub label: Option<&'static str>,
}

impl CredentialRules {
    /// Rules for a provider name. Unknown names get the 8 character minimum.
    pub fn for_provider(name: &str) -> Self {
        match name.parse::<Provider>() {
            Ok(Provider::Google) => Self {
                min_len: 10,
                client_id_suffix: Some(GOOGLE_CLIENT_ID_SUFFIX),
                label: None,
            },
            Ok(Provider::LinkedIn) => Self {
                min_len: 8,
                client_id_suffix: None,
                label: Some("LinkedIn"),
            },
            Err(_) => Self {
                min_len: 8,
                client_id_suffix: None,
                label: None,
            },
        }
    }
}

/// Checks that a client id/secret pair looks plausible for `provider`.
///
/// This is a format check only; the provider remains the authority on
/// whether the credentials work.
pub fn validate_oauth_credentials(
    provider: &str,
    client_id: &str,
    client_secret: &str,
) -> Result<(), AuthError> {
    let client_id = client_id.trim();
    let client_secret = client_secret.trim();
    if client_id.is_empty() || client_secret.is_empty() {
        return Err(AuthError::InvalidCredentials(
            "Client ID and Client Secret are required".into(),
        ));
    }

    let rules = CredentialRules::for_provider(provider);
    let prefix = rules.label.map(|l| format!("{l} ")).unwrap_or_default();
    if client_id.chars().count() < rules.min_len {
        return Err(AuthError::InvalidCredentials(format!(
            "{prefix}Client ID appears to be too short"
        )));
    }
    if client_secret.chars().count() < rules.min_len {
        return Err(AuthError::InvalidCredentials(format!(
            "{prefix}Client Secret appears to be too short"
        )));
    }
    if let Some(suffix) = rules.client_id_suffix {
        if !client_id.ends_with(suffix) {
            return Err(AuthError::InvalidCredentials(format!(
                "Google Client ID should end with '{suffix}'"
            )));
        }
    }
    Ok(())
}
