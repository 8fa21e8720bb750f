//! # SMLS
//!
//! Social login for Google and LinkedIn over the OAuth 2.0 Authorization Code
//! flow. This crate re-exports the workspace crates behind features:
//!
//! - `flow`: [`flow::OAuthManager`] and the flow orchestration.
//! - `session`: server-side sessions and the in-memory store.
//! - `axum`: handlers, extractors and the router extension for axum.
//! - `google`, `linkedin`: the provider adapters on their own.
//!
//! [`core`] is always available.

pub use smls_core as core;

pub use smls_core::{AuthError, CanonicalIdentity, ClientCredentials, Provider};

#[cfg(feature = "flow")]
pub use smls_flow as flow;

#[cfg(feature = "session")]
pub use smls_session as session;

#[cfg(feature = "axum")]
pub use smls_axum as axum;

#[cfg(feature = "google")]
pub use smls_providers_google as google;

#[cfg(feature = "linkedin")]
pub use smls_providers_linkedin as linkedin;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn providers_parse_through_the_facade() {
        assert_eq!("LinkedIn".parse::<Provider>().unwrap(), Provider::LinkedIn);
        assert!(matches!(
            "github".parse::<Provider>(),
            Err(AuthError::UnsupportedProvider(_))
        ));
    }

    #[cfg(feature = "flow")]
    #[test]
    fn manager_is_reachable_through_the_facade() {
        let manager = flow::OAuthManager::new(flow::OAuthConfig::default()).unwrap();
        let request = manager.build_authorization_url(Provider::Google, "abc", None);
        assert!(request.url.contains("client_id=abc"));
    }
}
