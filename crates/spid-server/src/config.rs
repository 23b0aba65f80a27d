//! Server configuration.
//!
//! Configuration is loaded from environment variables with sensible defaults.

use std::fmt;
use std::path::{Path, PathBuf};

use spid_protocol::{Environment, SecurityLevel};

/// Secret bytes that never show up in `Debug` output.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(Vec<u8>);

impl Secret {
    /// Wraps secret bytes.
    #[must_use]
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// Returns the secret bytes.
    #[must_use]
    pub fn expose(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Secret({} bytes)", self.0.len())
    }
}

/// Minimum length of the carrier secret in production.
pub const MIN_COOKIE_SECRET_LEN: usize = 32;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Server host to bind to.
    pub host: String,

    /// Server port.
    pub port: u16,

    /// Base URL for the server (used in generated URLs).
    pub base_url: String,

    /// Entity ID the service provider issues requests as.
    pub entity_id: String,

    /// Assertion consumer URL sent to test IdPs.
    pub reply_to: String,

    /// Deployment environment.
    pub environment: Environment,

    /// SPID level requested at login.
    pub security_level: SecurityLevel,

    /// Attribute set requested from the IdP.
    pub attribute_consuming_index: u32,

    /// Name of the correlation cookie.
    pub cookie_name: String,

    /// HMAC key for the correlation cookie.
    pub cookie_secret: Secret,

    /// Correlation cookie lifetime in minutes.
    pub cookie_ttl_minutes: i64,

    /// Whether the correlation cookie requires HTTPS.
    pub cookie_secure: bool,

    /// PEM certificate registered with the federation.
    pub certificate_path: PathBuf,

    /// PEM private key matching the certificate.
    pub private_key_path: PathBuf,

    /// JSON list of identity providers.
    pub idp_registry_path: PathBuf,

    /// Log level.
    pub log_level: String,
}

/// Longest accepted correlation cookie lifetime in minutes.
pub const MAX_COOKIE_TTL_MINUTES: i64 = 24 * 60;

impl ServerConfig {
    /// Loads configuration from environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        // Load .env file if it exists
        let _ = dotenvy::dotenv();

        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Loads configuration from a variable lookup.
    ///
    /// `var` returns the value of the named variable, or `None` when unset.
    pub fn from_lookup(var: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let host = var("SPID_HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let port = var("SPID_PORT")
            .and_then(|p| p.parse().ok())
            .unwrap_or(8080);

        let base_url = var("SPID_BASE_URL").unwrap_or_else(|| format!("http://{}:{}", host, port));
        let base_url = base_url.trim_end_matches('/').to_string();

        let entity_id = var("SPID_ENTITY_ID").unwrap_or_else(|| base_url.clone());
        let reply_to = var("SPID_DOMAIN_VALUE").unwrap_or_else(|| format!("{base_url}/spid/acs"));

        let environment = match var("SPID_ENVIRONMENT") {
            Some(value) => value
                .parse()
                .map_err(|e: String| anyhow::anyhow!("SPID_ENVIRONMENT: {e}"))?,
            None => Environment::Prod,
        };

        let security_level = match var("SPID_SECURITY_LEVEL") {
            Some(value) => value
                .trim()
                .parse()
                .ok()
                .and_then(SecurityLevel::from_number)
                .ok_or_else(|| {
                    anyhow::anyhow!("SPID_SECURITY_LEVEL must be 1, 2 or 3, got '{value}'")
                })?,
            None => SecurityLevel::L1,
        };

        let attribute_consuming_index = var("SPID_ATTRIBUTE_CONSUMING_INDEX")
            .and_then(|v| v.parse().ok())
            .unwrap_or(0);

        let cookie_name = var("SPID_COOKIE").unwrap_or_else(|| "SPID_COOKIE".to_string());

        let cookie_secret = match var("SPID_COOKIE_SECRET") {
            Some(secret)
                if environment == Environment::Prod && secret.len() < MIN_COOKIE_SECRET_LEN =>
            {
                anyhow::bail!("SPID_COOKIE_SECRET must be at least {MIN_COOKIE_SECRET_LEN} bytes");
            }
            Some(secret) if !secret.is_empty() => Secret::new(secret),
            _ if environment == Environment::Dev => {
                tracing::warn!(
                    "SPID_COOKIE_SECRET not set; using a random secret, \
                     carriers will not survive a restart"
                );
                Secret::new(spid_crypto::random_bytes(MIN_COOKIE_SECRET_LEN))
            }
            _ => anyhow::bail!("SPID_COOKIE_SECRET environment variable is required"),
        };

        let cookie_ttl_minutes = var("SPID_COOKIE_TTL_MINUTES")
            .and_then(|v| v.parse().ok())
            .filter(|minutes: &i64| (1..=MAX_COOKIE_TTL_MINUTES).contains(minutes))
            .unwrap_or(spid_handshake::CorrelationStore::DEFAULT_TTL_MINUTES);

        let cookie_secure = var("SPID_COOKIE_SECURE")
            .map(|v| v.to_lowercase() != "false" && v != "0")
            .unwrap_or(true);

        let required_path = |name: &str| {
            var(name)
                .map(PathBuf::from)
                .ok_or_else(|| anyhow::anyhow!("{name} environment variable is required"))
        };
        let certificate_path = required_path("SPID_CERTIFICATE_PATH")?;
        let private_key_path = required_path("SPID_PRIVATE_KEY_PATH")?;
        let idp_registry_path = required_path("SPID_IDP_REGISTRY")?;

        let log_level = var("RUST_LOG").unwrap_or_else(|| "info".to_string());

        Ok(Self {
            host,
            port,
            base_url,
            entity_id,
            reply_to,
            environment,
            security_level,
            attribute_consuming_index,
            cookie_name,
            cookie_secret,
            cookie_ttl_minutes,
            cookie_secure,
            certificate_path,
            private_key_path,
            idp_registry_path,
            log_level,
        })
    }

    /// Creates a configuration for testing.
    ///
    /// Credential and registry files are expected in `dir` as `sp.crt`,
    /// `sp.key` and `idps.json`.
    #[must_use]
    pub fn for_testing(dir: &Path) -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 0, // Random port
            base_url: "http://localhost:8080".to_string(),
            entity_id: "https://sp.example.it".to_string(),
            reply_to: "https://sp.example.it/spid/acs".to_string(),
            environment: Environment::Dev,
            security_level: SecurityLevel::L2,
            attribute_consuming_index: 0,
            cookie_name: "SPID_COOKIE".to_string(),
            cookie_secret: Secret::new(b"test-cookie-secret-with-32-bytes!".to_vec()),
            cookie_ttl_minutes: spid_handshake::CorrelationStore::DEFAULT_TTL_MINUTES,
            cookie_secure: false,
            certificate_path: dir.join("sp.crt"),
            private_key_path: dir.join("sp.key"),
            idp_registry_path: dir.join("idps.json"),
            log_level: "debug".to_string(),
        }
    }

    /// Returns the correlation cookie lifetime.
    #[must_use]
    pub fn cookie_ttl(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.cookie_ttl_minutes)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    const PATHS: [(&str, &str); 3] = [
        ("SPID_CERTIFICATE_PATH", "/etc/spid/sp.crt"),
        ("SPID_PRIVATE_KEY_PATH", "/etc/spid/sp.key"),
        ("SPID_IDP_REGISTRY", "/etc/spid/idps.json"),
    ];

    fn load(vars: &[(&str, &str)]) -> anyhow::Result<ServerConfig> {
        let vars: HashMap<String, String> =
            vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        ServerConfig::from_lookup(|name| vars.get(name).cloned())
    }

    fn with_paths<'a>(extra: &[(&'a str, &'a str)]) -> Vec<(&'a str, &'a str)> {
        PATHS.iter().chain(extra).copied().collect()
    }

    #[test]
    fn defaults_with_required_values() {
        let secret = "0123456789abcdef0123456789abcdef";
        let config = load(&with_paths(&[("SPID_COOKIE_SECRET", secret)])).unwrap();

        assert_eq!(config.environment, Environment::Prod);
        assert_eq!(config.security_level, SecurityLevel::L1);
        assert_eq!(config.base_url, "http://0.0.0.0:8080");
        assert_eq!(config.entity_id, config.base_url);
        assert_eq!(config.reply_to, "http://0.0.0.0:8080/spid/acs");
        assert_eq!(config.cookie_name, "SPID_COOKIE");
        assert_eq!(config.cookie_secret.expose(), secret.as_bytes());
        assert!(config.cookie_secure);
        assert_eq!(config.private_key_path, PathBuf::from("/etc/spid/sp.key"));
    }

    #[test]
    fn production_requires_a_long_secret() {
        let err = load(&with_paths(&[])).unwrap_err();
        assert!(err.to_string().contains("SPID_COOKIE_SECRET"));

        let err = load(&with_paths(&[("SPID_COOKIE_SECRET", "short")])).unwrap_err();
        assert!(err.to_string().contains("at least 32 bytes"), "{err}");

        let secret = "x".repeat(MIN_COOKIE_SECRET_LEN);
        let config = load(&with_paths(&[("SPID_COOKIE_SECRET", secret.as_str())])).unwrap();
        assert_eq!(config.cookie_secret.expose().len(), MIN_COOKIE_SECRET_LEN);
    }

    #[test]
    fn development_generates_a_random_secret() {
        let vars = with_paths(&[("SPID_ENVIRONMENT", "dev")]);
        let first = load(&vars).unwrap();
        let second = load(&vars).unwrap();

        assert_eq!(first.environment, Environment::Dev);
        assert_eq!(first.cookie_secret.expose().len(), MIN_COOKIE_SECRET_LEN);
        assert_ne!(first.cookie_secret, second.cookie_secret);

        let short = load(&with_paths(&[
            ("SPID_ENVIRONMENT", "dev"),
            ("SPID_COOKIE_SECRET", "short"),
        ]))
        .unwrap();
        assert_eq!(short.cookie_secret.expose(), b"short");
    }

    #[test]
    fn paths_are_required() {
        for missing in PATHS.map(|(name, _)| name) {
            let vars: Vec<_> = with_paths(&[("SPID_ENVIRONMENT", "dev")])
                .into_iter()
                .filter(|(name, _)| *name != missing)
                .collect();
            let err = load(&vars).unwrap_err();
            assert!(err.to_string().contains(missing), "{err}");
        }
    }

    #[test]
    fn security_level_must_be_known() {
        for bad in ["0", "4", "L2", ""] {
            let vars = with_paths(&[("SPID_ENVIRONMENT", "dev"), ("SPID_SECURITY_LEVEL", bad)]);
            let err = load(&vars).unwrap_err();
            assert!(err.to_string().contains("SPID_SECURITY_LEVEL"), "{bad}: {err}");
        }

        let vars = with_paths(&[("SPID_ENVIRONMENT", "dev"), ("SPID_SECURITY_LEVEL", " 3 ")]);
        assert_eq!(load(&vars).unwrap().security_level, SecurityLevel::L3);
    }

    #[test]
    fn unknown_environment_is_rejected() {
        let err = load(&with_paths(&[("SPID_ENVIRONMENT", "staging")])).unwrap_err();
        assert!(err.to_string().contains("SPID_ENVIRONMENT"));
    }

    #[test]
    fn out_of_range_ttl_falls_back_to_default() {
        let huge = i64::MAX.to_string();
        for ttl in ["0", "-5", "abc", "1441", huge.as_str()] {
            let vars = with_paths(&[("SPID_ENVIRONMENT", "dev"), ("SPID_COOKIE_TTL_MINUTES", ttl)]);
            let config = load(&vars).unwrap();
            assert_eq!(config.cookie_ttl(), chrono::Duration::minutes(20), "{ttl}");
        }
    }

    #[test]
    fn secret_is_not_printed() {
        let config = ServerConfig::for_testing(Path::new("/tmp"));
        let debug = format!("{config:?}");
        assert!(debug.contains("Secret(33 bytes)"));
        assert!(!debug.contains("test-cookie-secret"));
    }

    #[test]
    fn testing_config_paths() {
        let config = ServerConfig::for_testing(Path::new("/srv/spid"));
        assert_eq!(config.certificate_path, PathBuf::from("/srv/spid/sp.crt"));
        assert_eq!(config.idp_registry_path, PathBuf::from("/srv/spid/idps.json"));
        assert_eq!(config.cookie_ttl(), chrono::Duration::minutes(20));
    }
}
