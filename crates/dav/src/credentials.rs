//! Connection credentials and password obfuscation
//!
//! Saved connections keep the password XOR-masked with the file's uuid and
//! base64-encoded, so it does not show up in plain text in a settings export.
//! Anyone holding the record and the uuid can reverse it: this is
//! obfuscation, not encryption.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use http::HeaderValue;
use secrecy::{ExposeSecret, SecretString};

use kdbx_dav_protocol::StoredCredentials;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CredentialError {
    #[error("file id is empty")]
    EmptyFileId,
    #[error("stored password is not valid base64: {0}")]
    InvalidEncoding(String),
    #[error("stored password does not decode to UTF-8 with this file id")]
    InvalidUtf8,
}

/// User and password for HTTP Basic authentication
#[derive(Debug, Clone)]
pub struct Credentials {
    user: String,
    /// Zeroed on drop
    password: SecretString,
}

impl Credentials {
    pub fn new(user: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            password: SecretString::new(password.into()),
        }
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub const fn password(&self) -> &SecretString {
        &self.password
    }

    /// `Authorization: Basic ...` value, or `None` without a user name
    pub fn authorization(&self) -> Option<HeaderValue> {
        if self.user.is_empty() {
            return None;
        }
        let token = STANDARD.encode(format!(
            "{}:{}",
            self.user,
            self.password.expose_secret()
        ));
        let mut value = HeaderValue::from_str(&format!("Basic {token}")).ok()?;
        value.set_sensitive(true);
        Some(value)
    }
}

/// Connection settings collected by the open dialog
#[derive(Debug, Clone, Default)]
pub struct ConnectionConfig {
    pub path: String,
    pub user: Option<String>,
    pub password: Option<SecretString>,
}

impl ConnectionConfig {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    /// Credentials to send, if a user is configured
    pub fn credentials(&self) -> Option<Credentials> {
        let user = self.user.as_deref().filter(|u| !u.is_empty())?;
        let password = self
            .password
            .as_ref()
            .map(|p| p.expose_secret().clone())
            .unwrap_or_default();
        Some(Credentials::new(user, password))
    }

    /// Record to persist for this connection
    ///
    /// A new password is obfuscated with `file_id`. Without one, the
    /// previously stored `encpass` is kept as is.
    pub fn to_stored(
        &self,
        file_id: &str,
        previous: Option<&StoredCredentials>,
    ) -> Result<StoredCredentials, CredentialError> {
        let encpass = match &self.password {
            Some(password) => Some(obfuscate(password.expose_secret(), file_id)?),
            None => previous.and_then(|p| p.encpass.clone()),
        };
        Ok(StoredCredentials {
            user: self.user.clone(),
            encpass,
        })
    }

    /// Rebuild live settings from a persisted record
    pub fn from_stored(
        path: impl Into<String>,
        stored: &StoredCredentials,
        file_id: &str,
    ) -> Result<Self, CredentialError> {
        let password = stored
            .encpass
            .as_deref()
            .map(|encpass| deobfuscate(encpass, file_id).map(SecretString::new))
            .transpose()?;
        Ok(Self {
            path: path.into(),
            user: stored.user.clone(),
            password,
        })
    }
}

fn mask(data: &[u8], key: &[u8]) -> Vec<u8> {
    data.iter()
        .zip(key.iter().cycle())
        .map(|(byte, k)| byte ^ k)
        .collect()
}

/// XOR `password` with `file_id` (cycled) and base64 the result
pub fn obfuscate(password: &str, file_id: &str) -> Result<String, CredentialError> {
    if file_id.is_empty() {
        return Err(CredentialError::EmptyFileId);
    }
    Ok(STANDARD.encode(mask(password.as_bytes(), file_id.as_bytes())))
}

/// Exact inverse of [`obfuscate`]
pub fn deobfuscate(encpass: &str, file_id: &str) -> Result<String, CredentialError> {
    if file_id.is_empty() {
        return Err(CredentialError::EmptyFileId);
    }
    let masked = STANDARD
        .decode(encpass)
        .map_err(|e| CredentialError::InvalidEncoding(e.to_string()))?;
    String::from_utf8(mask(&masked, file_id.as_bytes())).map_err(|_| CredentialError::InvalidUtf8)
}
