//! Cache key definitions
//!
//! One key addresses one cached resolution result. Keys are always qualified
//! by language, so a response for an old language lands in its own slot and
//! can never overwrite the slot of the active one.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Which endpoint a cached result came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    Content,
    Dropdown,
}

impl ContentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Content => "content",
            Self::Dropdown => "dropdown",
        }
    }
}

/// Cache key for a screen bundle or a single dropdown field
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey {
    /// Screen grouping key (e.g. `mortgage_step3`)
    pub screen_location: String,
    /// Short language code (`en`, `he`, `ru`)
    pub language: String,
    pub kind: ContentKind,
    /// Remote field key for dropdown entries, None for whole-screen bundles
    pub field_name: Option<String>,
}

impl CacheKey {
    /// Key for the whole-screen content bundle
    pub fn content(screen_location: &str, language: &str) -> Self {
        Self {
            screen_location: screen_location.to_string(),
            language: language.to_string(),
            kind: ContentKind::Content,
            field_name: None,
        }
    }

    /// Key for the whole-screen dropdown fetch
    pub fn dropdown_screen(screen_location: &str, language: &str) -> Self {
        Self {
            screen_location: screen_location.to_string(),
            language: language.to_string(),
            kind: ContentKind::Dropdown,
            field_name: None,
        }
    }

    /// Key for one dropdown field of a screen
    pub fn dropdown_field(screen_location: &str, language: &str, field_name: &str) -> Self {
        Self {
            screen_location: screen_location.to_string(),
            language: language.to_string(),
            kind: ContentKind::Dropdown,
            field_name: Some(field_name.to_string()),
        }
    }

    /// The screen-level key this key belongs to
    pub fn screen_key(&self) -> Self {
        Self {
            field_name: None,
            ..self.clone()
        }
    }

    /// Same key, other language
    pub fn with_language(&self, language: &str) -> Self {
        Self {
            language: language.to_string(),
            ..self.clone()
        }
    }

    /// Convert to storage key string
    /// Format: kind:screen:language or kind:screen:language:field
    pub fn to_storage_key(&self) -> String {
        match &self.field_name {
            Some(field) => format!(
                "{}:{}:{}:{}",
                self.kind.as_str(),
                self.screen_location,
                self.language,
                field
            ),
            None => format!(
                "{}:{}:{}",
                self.kind.as_str(),
                self.screen_location,
                self.language
            ),
        }
    }

    /// Prefix matching every key of one screen in one language
    pub fn invalidation_pattern(kind: ContentKind, screen_location: &str, language: &str) -> String {
        format!("{}:{}:{}", kind.as_str(), screen_location, language)
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_storage_key())
    }
}
