//! # Secret References
//!
//! Parses the `secret` field of a `KeycloakClient`.
//!
//! Accepted forms:
//! - `""` - no secret, Keycloak generates one
//! - `$name:key` - key `key` of Secret `name`
//! - `$name` or `name` - key `clientSecret` of Secret `name`

use crate::constants::DEFAULT_CLIENT_SECRET_KEY;
use crate::controller::reconciler::validation::ValidationError;
use regex::Regex;
use std::sync::LazyLock;

/// DNS-1123 subdomain, the format of Kubernetes Secret names
static SECRET_NAME: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"^[a-z0-9]([-a-z0-9]*[a-z0-9])?(\.[a-z0-9]([-a-z0-9]*[a-z0-9])?)*$").ok()
});

/// Secret data keys: alphanumerics, `-`, `_` and `.`
static SECRET_KEY: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^[-._a-zA-Z0-9]+$").ok());

/// Location of the client secret in a Kubernetes Secret
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretReference {
    pub name: String,
    pub key: String,
}

impl SecretReference {
    /// Parse a reference; an empty string means no reference
    ///
    /// # Errors
    /// Returns `InvalidSecretReference` when the name or key is malformed.
    pub fn parse(reference: &str) -> Result<Option<Self>, ValidationError> {
        let reference = reference.trim();
        if reference.is_empty() {
            return Ok(None);
        }

        let body = reference.strip_prefix('$').unwrap_or(reference);
        let (name, key) = match body.split_once(':') {
            Some((name, key)) => (name, key),
            None => (body, DEFAULT_CLIENT_SECRET_KEY),
        };

        let invalid = |why: &str| ValidationError::InvalidSecretReference {
            reference: reference.to_string(),
            reason: why.to_string(),
        };
        if name.is_empty() || name.len() > 253 || !matches(&SECRET_NAME, name) {
            return Err(invalid("secret name must be a DNS-1123 subdomain"));
        }
        if key.is_empty() || key.len() > 253 || !matches(&SECRET_KEY, key) {
            return Err(invalid(
                "secret key must contain only alphanumeric characters, '-', '_' or '.'",
            ));
        }

        Ok(Some(Self {
            name: name.to_string(),
            key: key.to_string(),
        }))
    }
}

fn matches(pattern: &LazyLock<Option<Regex>>, value: &str) -> bool {
    pattern.as_ref().is_some_and(|regex| regex.is_match(value))
}
