//! Credential resolution for purpose-scoped connections
//!
//! Each purpose carries one encoded credential blob: base64 of
//! `user:password`. The user part doubles as the database identity
//! (`db_id`) recorded in audit entries.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;

use crate::config::EngineConfig;
use crate::error::{Error, Result};
use crate::types::Purpose;

/// A resolved user/password pair
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    /// Database user
    pub user: String,
    /// Database password
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("user", &self.user)
            .field("password", &"***")
            .finish()
    }
}

/// Resolve the credentials configured for a purpose
///
/// Fails with a configuration error when the blob is absent or malformed.
/// No side effects.
pub fn resolve(config: &EngineConfig, purpose: Purpose) -> Result<Credentials> {
    let blob = config.credentials.get(&purpose).ok_or_else(|| {
        Error::config(format!(
            "missing credential entry for purpose '{}'",
            purpose
        ))
    })?;
    decode_blob(blob)
}

/// Decode a base64 `user:password` blob
pub fn decode_blob(blob: &str) -> Result<Credentials> {
    let raw = BASE64
        .decode(blob.trim())
        .map_err(|e| Error::config(format!("credential blob is not valid base64: {}", e)))?;

    let decoded = String::from_utf8(raw)
        .map_err(|_| Error::config("credential blob is not valid UTF-8"))?;

    // Split on the first colon only: passwords may contain colons.
    let (user, password) = decoded
        .split_once(':')
        .ok_or_else(|| Error::config("credential blob must decode to 'user:password'"))?;

    Ok(Credentials {
        user: user.to_string(),
        password: password.to_string(),
    })
}

/// Encode a user/password pair into the blob format operators store
pub fn encode_credentials(user: &str, password: &str) -> String {
    BASE64.encode(format!("{}:{}", user, password))
}
