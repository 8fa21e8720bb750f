use clap::Parser;
use dotenvy::dotenv;
use log::LevelFilter;
use smls::flow::{OAuthConfig, DEFAULT_BASE_URL};
use smls::session::SessionConfig;
use std::net::SocketAddr;
use std::time::Duration;

#[derive(Clone, Debug, Parser)]
#[command(author, version, about = "Social login gateway for Google and LinkedIn", long_about = None)]
pub struct Config {
    /// Public base URL of the service. Redirect URIs are derived from it.
    #[arg(long, env, default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    /// Base URL to use for redirect URIs instead of `base_url`, e.g. when the
    /// service is reached through a tunnel.
    #[arg(long, env)]
    pub runtime_base_url: Option<String>,

    /// Address to listen on for incoming connections
    #[arg(long, env, default_value = "0.0.0.0:5000")]
    pub bind_addr: SocketAddr,

    /// Timeout in seconds of every outbound call (providers and image proxy)
    #[arg(long, env, default_value_t = 10)]
    pub http_timeout_secs: u64,

    /// Send a PKCE challenge with LinkedIn authorization requests
    #[arg(long, env)]
    pub linkedin_pkce: bool,

    /// Only send the session cookie over HTTPS
    #[arg(long, env)]
    pub session_cookie_secure: bool,

    /// Session lifetime in seconds
    #[arg(long, env, default_value_t = 3600)]
    pub session_ttl_secs: u32,

    /// How long a started login may take, in seconds
    #[arg(long, env, default_value_t = 900)]
    pub flow_ttl_secs: u32,

    /// Set the log level verbosity threshold (level) to control what gets displayed on console output
    #[arg(long = "log-level", env = "LOG_LEVEL", default_value_t = LevelFilter::Info)]
    pub log_level_filter: LevelFilter,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    pub fn new() -> Self {
        // Load .env file first
        dotenv().ok();
        // Then parse the command line parameters and flags
        Config::parse()
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn oauth_config(&self) -> OAuthConfig {
        OAuthConfig {
            base_url: self.base_url.trim_end_matches('/').to_string(),
            runtime_base_url: self
                .runtime_base_url
                .as_deref()
                .map(|url| url.trim_end_matches('/').to_string()),
            http_timeout: self.http_timeout(),
            linkedin_pkce: self.linkedin_pkce,
            flow_ttl: chrono::Duration::seconds(self.flow_ttl_secs.into()),
            ..OAuthConfig::default()
        }
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            secure: self.session_cookie_secure,
            max_age: Some(chrono::Duration::seconds(self.session_ttl_secs.into())),
            ..SessionConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use smls::Provider;

    #[test]
    fn defaults_match_a_local_deployment() {
        let config = Config::try_parse_from(["smls-server"]).unwrap();
        assert_eq!(config.bind_addr, "0.0.0.0:5000".parse().unwrap());
        assert_eq!(config.http_timeout(), Duration::from_secs(10));
        assert!(!config.linkedin_pkce);
        assert!(!config.session_cookie_secure);

        let oauth = config.oauth_config();
        assert!(oauth.google_pkce);
        assert_eq!(oauth.flow_ttl, chrono::Duration::minutes(15));

        let session = config.session_config();
        assert_eq!(session.session_ttl(), chrono::Duration::hours(1));
        assert_eq!(session.cookie_name, "smls_session");
    }

    #[test]
    fn runtime_base_url_drives_redirect_uris() {
        let config = Config::try_parse_from([
            "smls-server",
            "--base-url",
            "https://smls.example.com/",
            "--runtime-base-url",
            "https://abc123.ngrok.io/",
            "--linkedin-pkce",
            "--session-cookie-secure",
            "--log-level",
            "debug",
        ])
        .unwrap();

        assert_eq!(config.log_level_filter, LevelFilter::Debug);
        assert!(config.session_config().secure);

        let oauth = config.oauth_config();
        assert!(oauth.linkedin_pkce);
        assert_eq!(oauth.base_url, "https://smls.example.com");
        assert_eq!(
            oauth.redirect_uri(Provider::LinkedIn),
            "https://abc123.ngrok.io/auth/linkedin/callback"
        );
    }

    #[test]
    fn rejects_a_malformed_bind_address() {
        assert!(Config::try_parse_from(["smls-server", "--bind-addr", "localhost"]).is_err());
    }
}
