//! # SMLS Session
//!
//! Server-side sessions for the SMLS gateway. A session holds everything the
//! gateway remembers about a browser: the OAuth client credentials the
//! operator entered, the pending authorization between the two legs of a
//! login, the signed-in identity, and one-shot flash messages.

#![warn(missing_docs)]

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
pub use smls_core::SameSite;
use smls_core::{AuthError, CanonicalIdentity, ClientCredentials, PendingAuthorization, Provider};
use std::collections::BTreeMap;

/// In-memory session store.
pub mod memory;
pub use memory::MemoryStore;

/// Lifetime of a session when the configuration does not set one.
pub const DEFAULT_SESSION_TTL_SECS: i64 = 3600;

/// A server-side session, keyed by the id stored in the session cookie.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Session {
    /// Opaque session id.
    pub id: String,
    /// What the gateway remembers for this browser.
    pub data: SessionData,
    /// When the session stops being valid.
    pub expires_at: DateTime<Utc>,
}

impl Session {
    /// A fresh, empty session valid for `ttl`.
    pub fn new(ttl: Duration) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            data: SessionData::default(),
            expires_at: Utc::now() + ttl,
        }
    }

    /// Whether the session is past its expiry.
    pub fn is_expired(&self) -> bool {
        self.expires_at <= Utc::now()
    }

    /// Extends the session so it stays valid for another `ttl`.
    pub fn touch(&mut self, ttl: Duration) {
        self.expires_at = Utc::now() + ttl;
    }
}

/// Severity of a flash message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashLevel {
    /// Something went well.
    Success,
    /// Neutral information.
    Info,
    /// Something the user should look at.
    Warning,
    /// Something failed.
    Error,
}

impl FlashLevel {
    /// Name usable as a CSS class.
    pub fn as_str(&self) -> &'static str {
        match self {
            FlashLevel::Success => "success",
            FlashLevel::Info => "info",
            FlashLevel::Warning => "warning",
            FlashLevel::Error => "error",
        }
    }
}

/// A message shown once on the next rendered page.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlashMessage {
    /// Severity.
    pub level: FlashLevel,
    /// Text shown to the user.
    pub message: String,
}

/// Contents of a session.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SessionData {
    /// OAuth client credentials per provider.
    #[serde(default)]
    pub credentials: BTreeMap<Provider, ClientCredentials>,
    /// The authorization in progress, if any.
    #[serde(default)]
    pub pending: Option<PendingAuthorization>,
    /// The signed-in user.
    #[serde(default)]
    pub user: Option<CanonicalIdentity>,
    /// Messages not yet shown.
    #[serde(default)]
    pub flash: Vec<FlashMessage>,
}

impl SessionData {
    /// Credentials registered for `provider`.
    pub fn credentials_for(&self, provider: Provider) -> Option<&ClientCredentials> {
        self.credentials.get(&provider)
    }

    /// Stores credentials for `provider`, replacing earlier ones.
    pub fn set_credentials(&mut self, provider: Provider, credentials: ClientCredentials) {
        self.credentials.insert(provider, credentials);
    }

    /// Removes the credentials of `provider`. Returns whether any were stored.
    pub fn remove_credentials(&mut self, provider: Provider) -> bool {
        self.credentials.remove(&provider).is_some()
    }

    /// Providers with stored credentials, in display order.
    pub fn configured_providers(&self) -> Vec<Provider> {
        Provider::ALL
            .into_iter()
            .filter(|p| self.credentials.contains_key(p))
            .collect()
    }

    /// Removes and returns the pending authorization.
    ///
    /// A pending authorization can be taken once; a second call returns `None`.
    pub fn take_pending(&mut self) -> Option<PendingAuthorization> {
        self.pending.take()
    }

    /// Signs the user out. Credentials are kept.
    pub fn logout(&mut self) {
        self.user = None;
        self.pending = None;
    }

    /// Forgets every stored credential. The signed-in user stays.
    pub fn clear_credentials(&mut self) {
        self.credentials.clear();
    }

    /// Queues a flash message.
    pub fn flash(&mut self, level: FlashLevel, message: impl Into<String>) {
        self.flash.push(FlashMessage {
            level,
            message: message.into(),
        });
    }

    /// Drains the queued flash messages.
    pub fn take_flash(&mut self) -> Vec<FlashMessage> {
        std::mem::take(&mut self.flash)
    }
}

/// Storage backend for sessions.
#[async_trait]
pub trait SessionStore: Send + Sync + 'static {
    /// Load a session by id. Expired sessions are reported as absent.
    async fn load_session(&self, id: &str) -> Result<Option<Session>, AuthError>;
    /// Insert or replace a session.
    async fn save_session(&self, session: &Session) -> Result<(), AuthError>;
    /// Delete a session. Deleting an unknown id is not an error.
    async fn delete_session(&self, id: &str) -> Result<(), AuthError>;
    /// Removes and returns the pending authorization of a session in one
    /// step. Of several concurrent calls for the same session at most one
    /// gets `Some`.
    async fn take_pending(&self, id: &str) -> Result<Option<PendingAuthorization>, AuthError>;
}

/// Configuration for session cookies.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Name of the session cookie.
    pub cookie_name: String,
    /// Whether the cookie should only be sent over HTTPS.
    pub secure: bool,
    /// Whether the cookie is hidden from scripts.
    pub http_only: bool,
    /// Cross-site policy of the cookie.
    pub same_site: SameSite,
    /// Cookie path.
    pub path: String,
    /// The maximum age of the session.
    pub max_age: Option<Duration>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: "smls_session".to_string(),
            secure: true,
            http_only: true,
            same_site: SameSite::Lax,
            path: "/".to_string(),
            max_age: Some(Duration::seconds(DEFAULT_SESSION_TTL_SECS)),
        }
    }
}

impl SessionConfig {
    /// Lifetime given to new and refreshed sessions.
    pub fn session_ttl(&self) -> Duration {
        self.max_age
            .unwrap_or_else(|| Duration::seconds(DEFAULT_SESSION_TTL_SECS))
    }
}
