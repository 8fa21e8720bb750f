use crate::error::AuthError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The social login providers this gateway speaks to.
///
/// Dispatch on this enum is exhaustive, so adding a provider is a
/// compile-time change across the workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    /// Google accounts (OpenID Connect over OAuth 2.0).
    Google,
    /// LinkedIn accounts (Sign In with LinkedIn using OpenID Connect).
    LinkedIn,
}

impl Provider {
    /// Every supported provider, in display order.
    pub const ALL: [Provider; 2] = [Provider::Google, Provider::LinkedIn];

    /// The identifier used in routes and session keys.
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Google => "google",
            Provider::LinkedIn => "linkedin",
        }
    }

    /// Human readable name.
    pub fn display_name(&self) -> &'static str {
        match self {
            Provider::Google => "Google",
            Provider::LinkedIn => "LinkedIn",
        }
    }

    /// Path of the callback route for this provider.
    pub fn callback_path(&self) -> String {
        format!("/auth/{}/callback", self.as_str())
    }

    /// The redirect URI registered with the provider, derived from a base URL.
    pub fn redirect_uri(&self, base_url: &str) -> String {
        format!("{}{}", base_url.trim_end_matches('/'), self.callback_path())
    }

    /// Production endpoints of this provider.
    pub fn default_endpoints(&self) -> ProviderEndpoints {
        match self {
            Provider::Google => ProviderEndpoints {
                authorize_url: "https://accounts.google.com/o/oauth2/v2/auth".into(),
                token_url: "https://oauth2.googleapis.com/token".into(),
                userinfo_url: "https://www.googleapis.com/oauth2/v2/userinfo".into(),
                picture_url: None,
                scope: "openid email profile".into(),
            },
            Provider::LinkedIn => ProviderEndpoints {
                authorize_url: "https://www.linkedin.com/oauth/v2/authorization".into(),
                token_url: "https://www.linkedin.com/oauth/v2/accessToken".into(),
                userinfo_url: "https://api.linkedin.com/v2/userinfo".into(),
                picture_url: Some(
                    "https://api.linkedin.com/v2/people/~:(profilePicture(displayImage~:playableStreams))"
                        .into(),
                ),
                scope: "openid profile email".into(),
            },
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "google" => Ok(Provider::Google),
            "linkedin" => Ok(Provider::LinkedIn),
            _ => Err(AuthError::UnsupportedProvider(s.to_string())),
        }
    }
}

/// Endpoint set and scope of one provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderEndpoints {
    /// Where the user is sent to authorize.
    pub authorize_url: String,
    /// Where authorization codes are exchanged for tokens.
    pub token_url: String,
    /// Where the user profile is fetched with the access token.
    pub userinfo_url: String,
    /// Optional secondary endpoint for the profile picture.
    pub picture_url: Option<String>,
    /// Space separated scopes requested at authorization.
    pub scope: String,
}

impl ProviderEndpoints {
    /// Rebase every endpoint onto `base_url`, keeping their paths.
    ///
    /// Mostly useful to point a provider at a local mock server.
    pub fn rebased(base_url: &str, provider: Provider) -> Self {
        let base = base_url.trim_end_matches('/');
        let defaults = provider.default_endpoints();
        Self {
            authorize_url: format!("{base}/authorize"),
            token_url: format!("{base}/token"),
            userinfo_url: format!("{base}/userinfo"),
            picture_url: defaults.picture_url.map(|_| format!("{base}/picture")),
            scope: defaults.scope,
        }
    }
}
