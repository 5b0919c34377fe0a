//! Detection of secret-bearing setting names.

use regex::Regex;

/// Name patterns for settings whose values must never be shown.
const SECRET_KEY_PATTERNS: &[&str] = &[
    r"(?i)(^|_)(PASSWORD|PASSWD|PWD)$",
    r"(?i)(^|_)(SECRET|SECRET_KEY)$",
    r"(?i)(^|_)(TOKEN|API_?KEY)$",
    r"(?i)(^|_)PRIVATE_KEY$",
    r"(?i)(^|_)DATABASE_URL$",
];

/// Matches setting names (env keys, config fields) that carry secrets.
///
/// ```
/// use provisor::secrets::SecretKeys;
///
/// let keys = SecretKeys::new();
/// assert!(keys.is_secret("DB_PASSWORD"));
/// assert!(keys.is_secret("jwt_secret"));
/// assert!(!keys.is_secret("GATEWAY_PORT"));
/// ```
#[derive(Debug, Clone)]
pub struct SecretKeys {
    patterns: Vec<Regex>,
}

impl SecretKeys {
    pub fn new() -> Self {
        Self {
            patterns: SECRET_KEY_PATTERNS
                .iter()
                .filter_map(|p| Regex::new(p).ok())
                .collect(),
        }
    }

    pub fn is_secret(&self, name: &str) -> bool {
        self.patterns.iter().any(|p| p.is_match(name))
    }

    /// Values of the pairs whose key is secret.
    pub fn secret_values<'a, I>(&self, pairs: I) -> Vec<String>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        pairs
            .into_iter()
            .filter(|(k, v)| !v.is_empty() && self.is_secret(k))
            .map(|(_, v)| v.to_string())
            .collect()
    }
}

impl Default for SecretKeys {
    fn default() -> Self {
        Self::new()
    }
}
