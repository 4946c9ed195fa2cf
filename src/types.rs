//! Shared types passed between pipeline stages.
//!
//! Intake produces an [`EncodedImage`], generation consumes it together with a
//! [`ColorChoice`] and yields a [`GenerationResult`], and export turns that
//! result into an [`EncodedFile`] at one of the fixed [`PrintSize`] presets.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DataUrlError {
    #[error("not a data URL")]
    MissingScheme,
    #[error("data URL is not base64 encoded")]
    NotBase64,
    #[error("data URL payload is not valid base64: {0}")]
    Payload(String),
}

/// Image bytes plus the MIME type they were declared with.
///
/// Immutable once created. The self-describing text form is a data URL
/// (`data:<mime>;base64,<payload>`), see [`EncodedImage::to_data_url`].
#[derive(Clone, PartialEq, Eq)]
pub struct EncodedImage {
    mime_type: String,
    bytes: Vec<u8>,
}

impl EncodedImage {
    pub fn new(mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            mime_type: mime_type.into(),
            bytes,
        }
    }

    /// Build from a raw base64 payload, as carried by the generation API.
    pub fn from_base64(mime_type: impl Into<String>, payload: &str) -> Result<Self, DataUrlError> {
        let bytes = BASE64
            .decode(payload.trim())
            .map_err(|e| DataUrlError::Payload(e.to_string()))?;
        Ok(Self::new(mime_type, bytes))
    }

    /// Parse a `data:<mime>;base64,<payload>` string.
    pub fn from_data_url(url: &str) -> Result<Self, DataUrlError> {
        let rest = url.strip_prefix("data:").ok_or(DataUrlError::MissingScheme)?;
        let (header, payload) = rest.split_once(',').ok_or(DataUrlError::MissingScheme)?;
        let mime_type = header.strip_suffix(";base64").ok_or(DataUrlError::NotBase64)?;
        Self::from_base64(mime_type, payload)
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// The payload alone, without the `data:` prefix.
    pub fn base64_payload(&self) -> String {
        BASE64.encode(&self.bytes)
    }

    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.base64_payload())
    }
}

// Bytes are elided; a portrait is megabytes of noise in a debug dump.
impl fmt::Debug for EncodedImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncodedImage")
            .field("mime_type", &self.mime_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// An image produced by the generation service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationResult(EncodedImage);

impl GenerationResult {
    pub fn new(image: EncodedImage) -> Self {
        Self(image)
    }

    pub fn image(&self) -> &EncodedImage {
        &self.0
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown {kind} '{value}' (expected one of: {expected})")]
pub struct ParseChoiceError {
    kind: &'static str,
    value: String,
    expected: &'static str,
}

/// Selectable background colors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorChoice {
    Red,
    Blue,
}

impl ColorChoice {
    pub const ALL: [ColorChoice; 2] = [ColorChoice::Red, ColorChoice::Blue];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Red => "red",
            Self::Blue => "blue",
        }
    }
}

impl fmt::Display for ColorChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ColorChoice {
    type Err = ParseChoiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "red" => Ok(Self::Red),
            "blue" => Ok(Self::Blue),
            _ => Err(ParseChoiceError {
                kind: "color",
                value: s.to_string(),
                expected: "red, blue",
            }),
        }
    }
}

/// Print photo presets. Dimensions are fixed at build time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PrintSize {
    /// 1-inch ID photo, 295×413 px.
    OneInch,
    /// 2-inch ID photo, 413×626 px.
    TwoInch,
}

impl PrintSize {
    pub const ALL: [PrintSize; 2] = [PrintSize::OneInch, PrintSize::TwoInch];

    pub const fn width(self) -> u32 {
        match self {
            Self::OneInch => 295,
            Self::TwoInch => 413,
        }
    }

    pub const fn height(self) -> u32 {
        match self {
            Self::OneInch => 413,
            Self::TwoInch => 626,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::OneInch => "1-inch",
            Self::TwoInch => "2-inch",
        }
    }
}

impl fmt::Display for PrintSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}×{}px)", self.label(), self.width(), self.height())
    }
}

impl FromStr for PrintSize {
    type Err = ParseChoiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "1" | "1inch" | "1-inch" => Ok(Self::OneInch),
            "2" | "2inch" | "2-inch" => Ok(Self::TwoInch),
            _ => Err(ParseChoiceError {
                kind: "print size",
                value: s.to_string(),
                expected: "1, 2",
            }),
        }
    }
}

/// A finished artifact ready to be handed to the user.
#[derive(Clone, PartialEq, Eq)]
pub struct EncodedFile {
    pub file_name: String,
    pub mime_type: &'static str,
    pub bytes: Vec<u8>,
}

impl fmt::Debug for EncodedFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncodedFile")
            .field("file_name", &self.file_name)
            .field("mime_type", &self.mime_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}
