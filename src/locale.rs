//! Interface language.
//!
//! The chosen code is persisted in the [local store](crate::store) under
//! [`LANG_KEY`]. It selects the language of the instruction sent to the
//! model. UI string translation is not handled here.

use crate::store::LocalStore;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Store key holding the language code.
pub const LANG_KEY: &str = "lang";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unsupported language '{0}' (expected one of: zh-cn, en, fr, ja)")]
pub struct UnknownLocale(pub String);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Locale {
    #[default]
    #[serde(rename = "zh-cn")]
    ZhCn,
    #[serde(rename = "en")]
    En,
    #[serde(rename = "fr")]
    Fr,
    #[serde(rename = "ja")]
    Ja,
}

impl Locale {
    pub const ALL: [Locale; 4] = [Locale::ZhCn, Locale::En, Locale::Fr, Locale::Ja];

    pub fn code(self) -> &'static str {
        match self {
            Self::ZhCn => "zh-cn",
            Self::En => "en",
            Self::Fr => "fr",
            Self::Ja => "ja",
        }
    }
}

/// The persisted language, or the default when unset or unrecognized.
pub fn stored_locale(store: &LocalStore) -> Locale {
    store
        .get(LANG_KEY)
        .and_then(|code| code.parse().ok())
        .unwrap_or_default()
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Locale {
    type Err = UnknownLocale;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "zh-cn" | "zh" => Ok(Self::ZhCn),
            "en" => Ok(Self::En),
            "fr" => Ok(Self::Fr),
            "ja" => Ok(Self::Ja),
            _ => Err(UnknownLocale(s.to_string())),
        }
    }
}
