//! Stored credentials that pass through a cipher.
//!
//! Connection settings and service credentials are persisted encoded and
//! decoded on use. Decoding is forgiving: a value that does not decode is
//! assumed to be stored in plain text and is used as-is.

use std::collections::BTreeMap;

use tracing::{debug, warn};

use crate::cipher::CipherBackend;

/// A password/token pair kept in encoded form at rest.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct SecureCredentials {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub password: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub token: String,
}

impl SecureCredentials {
    /// Apply `f` to each non-empty field.
    ///
    /// A field whose transform fails keeps its current value; the failure is
    /// logged and the other field is still updated.
    pub fn update<F, E>(&mut self, mut f: F)
    where
        F: FnMut(&str) -> Result<String, E>,
        E: std::fmt::Display,
    {
        for (name, field) in [("password", &mut self.password), ("token", &mut self.token)] {
            if field.is_empty() {
                continue;
            }
            match f(field) {
                Ok(value) => *field = value,
                Err(e) => warn!(field = name, error = %e, "failed to update secure credential"),
            }
        }
    }

    /// Encode both fields with `cipher`.
    pub fn encode_with(&mut self, cipher: &mut dyn CipherBackend) {
        self.update(|v| cipher.encode_value(v));
    }

    /// Decode both fields with `cipher`.
    pub fn decode_with(&mut self, cipher: &mut dyn CipherBackend) {
        self.update(|v| cipher.decode_value(v));
    }
}

/// Decode `stored`, falling back to the stored text if it does not decode.
pub fn decode_or_literal(cipher: &mut dyn CipherBackend, stored: &str) -> String {
    match cipher.decode_value(stored) {
        Ok(decoded) => decoded,
        Err(e) => {
            warn!(error = %e, "failed to decode stored secret, using literal value");
            stored.to_owned()
        }
    }
}

/// Decode every value of `secrets`. Values that do not decode are kept.
pub fn decode_secret_map(
    cipher: &mut dyn CipherBackend,
    secrets: &BTreeMap<String, String>,
) -> BTreeMap<String, String> {
    secrets
        .iter()
        .map(|(key, value)| {
            let decoded = cipher.decode_value(value).unwrap_or_else(|e| {
                debug!(key = %key, error = %e, "secret value did not decode, keeping it");
                value.clone()
            });
            (key.clone(), decoded)
        })
        .collect()
}
