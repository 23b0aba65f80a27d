//! Identity provider directory.
//!
//! Maps the short names users pick on the login page (for example
//! `"TestIdP"`) to the metadata needed to address that provider.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use chrono::Duration;
use serde::Deserialize;
use spid_protocol::SamlBinding;
use thiserror::Error;
use url::Url;

/// Largest accepted `issue_instant_skew_secs`.
pub const MAX_ISSUE_INSTANT_SKEW_SECS: i64 = 3600;

/// Metadata of a single SPID identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct IdentityProvider {
    /// Short name used to select the provider.
    pub name: String,

    /// SAML entity ID of the provider.
    pub entity_id: String,

    /// Single sign-on endpoint.
    pub authn_endpoint: String,

    /// Single logout endpoint.
    pub logout_endpoint: String,

    /// Seconds subtracted from `IssueInstant` for providers whose clocks run
    /// behind ours.
    #[serde(default)]
    pub issue_instant_skew_secs: i64,

    /// Binding the provider accepts requests on.
    #[serde(default = "default_binding", deserialize_with = "deserialize_binding")]
    pub binding: SamlBinding,
}

impl IdentityProvider {
    /// Creates a provider with no clock skew on the POST binding.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        entity_id: impl Into<String>,
        authn_endpoint: impl Into<String>,
        logout_endpoint: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            entity_id: entity_id.into(),
            authn_endpoint: authn_endpoint.into(),
            logout_endpoint: logout_endpoint.into(),
            issue_instant_skew_secs: 0,
            binding: SamlBinding::HttpPost,
        }
    }

    /// Sets the issue instant skew.
    #[must_use]
    pub const fn with_issue_instant_skew(mut self, secs: i64) -> Self {
        self.issue_instant_skew_secs = secs;
        self
    }

    /// Returns the issue instant skew as a duration.
    ///
    /// Values outside `0..=MAX_ISSUE_INSTANT_SKEW_SECS` are clamped.
    #[must_use]
    pub fn issue_instant_skew(&self) -> Duration {
        Duration::seconds(self.issue_instant_skew_secs.clamp(0, MAX_ISSUE_INSTANT_SKEW_SECS))
    }

    fn validate(&self) -> Result<(), DirectoryError> {
        let invalid = |reason: &str| DirectoryError::Invalid {
            name: self.name.clone(),
            reason: reason.to_string(),
        };

        if self.name.trim().is_empty() {
            return Err(invalid("name must not be blank"));
        }
        if self.entity_id.trim().is_empty() {
            return Err(invalid("entity_id must not be blank"));
        }
        check_endpoint(&self.authn_endpoint)
            .map_err(|e| invalid(&format!("authn_endpoint {e}")))?;
        check_endpoint(&self.logout_endpoint)
            .map_err(|e| invalid(&format!("logout_endpoint {e}")))?;
        if !(0..=MAX_ISSUE_INSTANT_SKEW_SECS).contains(&self.issue_instant_skew_secs) {
            return Err(invalid(&format!(
                "issue_instant_skew_secs must be between 0 and {MAX_ISSUE_INSTANT_SKEW_SECS}"
            )));
        }
        if self.binding != SamlBinding::HttpPost {
            return Err(invalid("only the HTTP-POST binding is supported"));
        }
        Ok(())
    }
}

fn default_binding() -> SamlBinding {
    SamlBinding::HttpPost
}

fn deserialize_binding<'de, D>(deserializer: D) -> Result<SamlBinding, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = String::deserialize(deserializer)?;
    match value.as_str() {
        "post" | "POST" => Ok(SamlBinding::HttpPost),
        "redirect" | "REDIRECT" => Ok(SamlBinding::HttpRedirect),
        uri => SamlBinding::from_uri(uri)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown binding '{uri}'"))),
    }
}

fn check_endpoint(value: &str) -> Result<(), String> {
    let url = Url::parse(value).map_err(|e| format!("is not a valid URL: {e}"))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(format!("must use http or https, not {}", url.scheme()));
    }
    if url.host_str().is_none_or(str::is_empty) {
        return Err("has no host".to_string());
    }
    Ok(())
}

/// Errors raised by an identity provider directory.
#[derive(Debug, Error)]
pub enum DirectoryError {
    /// No provider is registered under the name.
    #[error("identity provider not found: {0}")]
    NotFound(String),

    /// The registry could not be read.
    #[error("failed to load identity provider registry: {0}")]
    Load(String),

    /// A registry entry is malformed.
    #[error("invalid identity provider '{name}': {reason}")]
    Invalid {
        /// Name of the offending entry.
        name: String,
        /// What is wrong with it.
        reason: String,
    },
}

/// Lookup of identity providers by short name.
pub trait IdentityProviderDirectory: Send + Sync + 'static {
    /// Resolves a provider by its short name.
    ///
    /// Names are matched exactly.
    fn resolve(&self, name: &str) -> Result<Arc<IdentityProvider>, DirectoryError>;
}

/// Directory backed by a fixed set of providers.
#[derive(Debug, Clone, Default)]
pub struct StaticDirectory {
    providers: HashMap<String, Arc<IdentityProvider>>,
}

impl StaticDirectory {
    /// Builds a directory from provider entries.
    ///
    /// # Errors
    ///
    /// Returns [`DirectoryError::Invalid`] for a malformed entry or a
    /// duplicate name.
    pub fn new(
        providers: impl IntoIterator<Item = IdentityProvider>,
    ) -> Result<Self, DirectoryError> {
        let mut map = HashMap::new();
        for provider in providers {
            provider.validate()?;
            let name = provider.name.clone();
            if map.insert(name.clone(), Arc::new(provider)).is_some() {
                return Err(DirectoryError::Invalid {
                    name,
                    reason: "duplicate name".to_string(),
                });
            }
        }
        Ok(Self { providers: map })
    }

    /// Parses a JSON array of provider entries.
    pub fn from_json(json: &str) -> Result<Self, DirectoryError> {
        let entries: Vec<IdentityProvider> =
            serde_json::from_str(json).map_err(|e| DirectoryError::Load(e.to_string()))?;
        Self::new(entries)
    }

    /// Loads a JSON registry file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, DirectoryError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| DirectoryError::Load(format!("{}: {e}", path.display())))?;
        let directory = Self::from_json(&json)?;
        tracing::info!(
            path = %path.display(),
            providers = directory.len(),
            "loaded identity provider registry"
        );
        Ok(directory)
    }

    /// Returns the number of registered providers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    /// Returns true if no provider is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Returns the registered names in sorted order.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.providers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl IdentityProviderDirectory for StaticDirectory {
    fn resolve(&self, name: &str) -> Result<Arc<IdentityProvider>, DirectoryError> {
        self.providers
            .get(name)
            .cloned()
            .ok_or_else(|| DirectoryError::NotFound(name.to_string()))
    }
}
