//! API key resolution.
//!
//! A key typed in by the user wins over the build-time default. The default
//! comes from `APP_GEMINI_API_KEY` at compile time, or from the `api_key`
//! setting in `config.toml`. Blank strings count as absent.
//!
//! Keys are plain strings. The user key is persisted unencrypted in the
//! [local store](crate::store); file permissions are the only protection.

use crate::generation::GenerationError;
use std::fmt;

/// Key baked in at compile time, if any.
pub const BUILD_DEFAULT_KEY: Option<&str> = option_env!("APP_GEMINI_API_KEY");

/// A resolved API key. `Debug` never prints the secret.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(****)")
    }
}

/// Where a resolved key came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeySource {
    User,
    Default,
}

/// Candidate keys, in precedence order.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub user_key: Option<String>,
    pub default_key: Option<String>,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("user_key", &self.user_key.as_ref().map(|_| "****"))
            .field("default_key", &self.default_key.as_ref().map(|_| "****"))
            .finish()
    }
}

fn non_blank(key: Option<&str>) -> Option<&str> {
    key.map(str::trim).filter(|k| !k.is_empty())
}

impl Credentials {
    pub fn new(user_key: Option<String>, default_key: Option<String>) -> Self {
        Self {
            user_key,
            default_key,
        }
    }

    /// Pick the effective key, or fail with `MissingCredentials`.
    pub fn resolve(&self) -> Result<ApiKey, GenerationError> {
        self.resolve_with_source().map(|(key, _)| key)
    }

    pub fn resolve_with_source(&self) -> Result<(ApiKey, KeySource), GenerationError> {
        if let Some(key) = non_blank(self.user_key.as_deref()) {
            return Ok((ApiKey(key.to_string()), KeySource::User));
        }
        if let Some(key) = non_blank(self.default_key.as_deref()) {
            return Ok((ApiKey(key.to_string()), KeySource::Default));
        }
        Err(GenerationError::MissingCredentials)
    }
}

/// Default key: the compile-time value, else the configured one.
pub fn default_key(configured: Option<&str>) -> Option<String> {
    non_blank(BUILD_DEFAULT_KEY)
        .or(non_blank(configured))
        .map(str::to_string)
}
