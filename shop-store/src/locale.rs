//! Supported storefront locales.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Locales the storefront serves. Every indexed document and every
/// conversation is pinned to exactly one of these.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    /// Arabic.
    Ar,
    /// English.
    En,
}

impl Locale {
    /// Short code used in wire payloads and storage keys.
    pub fn as_str(self) -> &'static str {
        match self {
            Locale::Ar => "ar",
            Locale::En => "en",
        }
    }

    /// All supported locales, in indexing order.
    pub fn all() -> [Locale; 2] {
        [Locale::Ar, Locale::En]
    }

    /// Parses a short code; `None` for anything unsupported.
    pub fn parse(s: &str) -> Option<Locale> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ar" => Some(Locale::Ar),
            "en" => Some(Locale::En),
            _ => None,
        }
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
