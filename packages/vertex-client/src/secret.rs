//! OAuth access tokens for Vertex AI requests.

use secrecy::{ExposeSecret, SecretBox};
use std::fmt;

/// Bearer token for Vertex AI. Formats as `Bearer ***` so it stays out of
/// request logs and error chains; only [`SecretString::expose`] yields the
/// raw value.
pub struct SecretString(SecretBox<str>);

impl SecretString {
    pub fn new(token: impl Into<String>) -> Self {
        Self(SecretBox::from(token.into().into_boxed_str()))
    }

    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }

    /// `gcloud` prints an empty line when no account is logged in.
    pub fn is_empty(&self) -> bool {
        self.expose().trim().is_empty()
    }
}

impl Clone for SecretString {
    fn clone(&self) -> Self {
        Self::new(self.expose())
    }
}

impl fmt::Debug for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Bearer ***")
    }
}

impl fmt::Display for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}
