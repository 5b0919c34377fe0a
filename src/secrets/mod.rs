//! Secret handling.
//!
//! - [`OutputMasker`] - scrubs known secret values from recorded output
//! - [`SecretKeys`] - recognizes setting names that carry secrets

pub mod keys;
pub mod mask;

pub use keys::SecretKeys;
pub use mask::OutputMasker;
