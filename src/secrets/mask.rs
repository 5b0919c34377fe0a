//! Output masking for secret values.

/// Replaces registered secret values in text.
///
/// Longer secrets are replaced first, so a secret that contains another
/// is never partially revealed.
///
/// # Example
///
/// ```
/// use provisor::secrets::OutputMasker;
///
/// let mut masker = OutputMasker::new();
/// masker.add_secret("hunter22");
///
/// let output = masker.mask("ALTER USER app WITH PASSWORD 'hunter22'");
/// assert_eq!(output, "ALTER USER app WITH PASSWORD '[REDACTED]'");
/// ```
#[derive(Debug, Clone)]
pub struct OutputMasker {
    secrets: Vec<String>,
    mask: String,
}

impl OutputMasker {
    /// Create a masker using `[REDACTED]`.
    pub fn new() -> Self {
        Self::with_mask("[REDACTED]")
    }

    /// Create a masker with a custom mask string.
    pub fn with_mask(mask: impl Into<String>) -> Self {
        Self {
            secrets: Vec::new(),
            mask: mask.into(),
        }
    }

    /// Register a secret value. Empty strings and repeats are ignored.
    pub fn add_secret(&mut self, value: impl Into<String>) {
        let value = value.into();
        if value.is_empty() || self.secrets.contains(&value) {
            return;
        }
        let at = self
            .secrets
            .iter()
            .position(|s| s.len() < value.len())
            .unwrap_or(self.secrets.len());
        self.secrets.insert(at, value);
    }

    /// Register multiple secret values.
    pub fn add_secrets(&mut self, values: impl IntoIterator<Item = impl Into<String>>) {
        for value in values {
            self.add_secret(value);
        }
    }

    /// Mask any secret values in `input`.
    pub fn mask(&self, input: &str) -> String {
        let mut result = input.to_string();
        for secret in &self.secrets {
            if result.contains(secret.as_str()) {
                result = result.replace(secret.as_str(), &self.mask);
            }
        }
        result
    }

    /// Get the number of registered secrets.
    pub fn secret_count(&self) -> usize {
        self.secrets.len()
    }
}

impl Default for OutputMasker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn masks_multiple_secrets() {
        let mut masker = OutputMasker::new();
        masker.add_secret("secret1");
        masker.add_secret("secret2");

        assert_eq!(
            masker.mask("Values: secret1 and secret2"),
            "Values: [REDACTED] and [REDACTED]"
        );
    }

    #[test]
    fn ignores_empty_and_repeated_secrets() {
        let mut masker = OutputMasker::new();
        masker.add_secrets(["", "pw", "pw"]);
        assert_eq!(masker.secret_count(), 1);
    }

    #[test]
    fn longer_secret_wins_over_contained_one() {
        let mut masker = OutputMasker::with_mask("***");
        masker.add_secret("pass");
        masker.add_secret("password123");

        assert_eq!(masker.mask("pw=password123"), "pw=***");
    }

    #[test]
    fn leaves_clean_text_alone() {
        let mut masker = OutputMasker::new();
        masker.add_secret("abc");
        assert_eq!(masker.mask("nothing here"), "nothing here");
    }
}
