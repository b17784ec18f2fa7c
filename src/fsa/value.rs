//! Value payload codecs.
//!
//! A store records how its payloads were encoded (`ValueKind`) in the header.
//! Decoding is a pluggable capability: `Dictionary` picks the default decoder
//! for the store's kind, and callers may swap in any `ValueDecoder`.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::Serialize;

use super::builder::BuildError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum ValueKind {
    /// No payload; only the key and its score are stored.
    KeyOnly = 0,
    /// UTF-8 text.
    String = 1,
    /// Unsigned 64-bit integer, little-endian.
    Int = 2,
    /// Compact JSON text.
    Json = 3,
    /// Opaque bytes, rendered as lowercase hex.
    Raw = 4,
}

impl ValueKind {
    pub fn from_u8(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(Self::KeyOnly),
            1 => Some(Self::String),
            2 => Some(Self::Int),
            3 => Some(Self::Json),
            4 => Some(Self::Raw),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::KeyOnly => "key_only",
            Self::String => "string",
            Self::Int => "int",
            Self::Json => "json",
            Self::Raw => "raw",
        }
    }

    /// Default decoder for payloads of this kind.
    pub fn decoder(self) -> Arc<dyn ValueDecoder> {
        match self {
            Self::KeyOnly => Arc::new(KeyOnlyDecoder),
            Self::String => Arc::new(StringDecoder),
            Self::Int => Arc::new(IntDecoder),
            Self::Json => Arc::new(JsonDecoder),
            Self::Raw => Arc::new(HexDecoder),
        }
    }

    /// Encode a textual value (as found in a TSV source file) for this kind.
    pub fn encode_text(self, text: &str) -> Result<Vec<u8>, BuildError> {
        match self {
            Self::KeyOnly => Ok(Vec::new()),
            Self::String | Self::Raw => Ok(text.as_bytes().to_vec()),
            Self::Int => {
                let n: u64 = text
                    .trim()
                    .parse()
                    .map_err(|e| BuildError::InvalidValue(format!("'{text}': {e}")))?;
                Ok(encode_int(n).to_vec())
            }
            Self::Json => {
                let v: serde_json::Value = serde_json::from_str(text)
                    .map_err(|e| BuildError::InvalidValue(format!("'{text}': {e}")))?;
                Ok(v.to_string().into_bytes())
            }
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ValueKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "key_only" | "none" => Ok(Self::KeyOnly),
            "string" => Ok(Self::String),
            "int" => Ok(Self::Int),
            "json" => Ok(Self::Json),
            "raw" => Ok(Self::Raw),
            other => Err(format!(
                "unknown value kind '{other}' (expected key_only, string, int, json or raw)"
            )),
        }
    }
}

pub fn encode_int(n: u64) -> [u8; 8] {
    n.to_le_bytes()
}

/// Turns a stored payload into the string exposed by `Match::value_as_string`.
///
/// Decoders never fail: malformed payloads decode to a best-effort string.
pub trait ValueDecoder: Send + Sync {
    fn decode(&self, raw: &[u8]) -> String;
}

impl<F> ValueDecoder for F
where
    F: Fn(&[u8]) -> String + Send + Sync,
{
    fn decode(&self, raw: &[u8]) -> String {
        self(raw)
    }
}

pub struct KeyOnlyDecoder;

impl ValueDecoder for KeyOnlyDecoder {
    fn decode(&self, _raw: &[u8]) -> String {
        String::new()
    }
}

pub struct StringDecoder;

impl ValueDecoder for StringDecoder {
    fn decode(&self, raw: &[u8]) -> String {
        String::from_utf8_lossy(raw).into_owned()
    }
}

pub struct IntDecoder;

impl ValueDecoder for IntDecoder {
    fn decode(&self, raw: &[u8]) -> String {
        match <[u8; 8]>::try_from(raw) {
            Ok(bytes) => u64::from_le_bytes(bytes).to_string(),
            Err(_) => String::new(),
        }
    }
}

pub struct JsonDecoder;

impl ValueDecoder for JsonDecoder {
    fn decode(&self, raw: &[u8]) -> String {
        // Payloads are normalized at build time; re-serializing is only
        // needed when a foreign builder wrote non-compact JSON.
        match serde_json::from_slice::<serde_json::Value>(raw) {
            Ok(v) => v.to_string(),
            Err(_) => String::from_utf8_lossy(raw).into_owned(),
        }
    }
}

pub struct HexDecoder;

impl ValueDecoder for HexDecoder {
    fn decode(&self, raw: &[u8]) -> String {
        use fmt::Write;
        let mut out = String::with_capacity(raw.len() * 2);
        for b in raw {
            let _ = write!(out, "{b:02x}");
        }
        out
    }
}
