//! Static translation resources
//!
//! The locally bundled strings that back tiers 2 and 3 of content
//! resolution. Resources use the i18next layout
//! (`<dir>/<lang>/translation.json`, or `<dir>/<lang>.json`); nested objects
//! are flattened into dotted keys.
//!
//! Content not yet moved to the remote service lives under
//! `__MIGRATED_<key>` in the same files.

use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info};

use crate::language::SUPPORTED_LANGUAGES;
use crate::types::{ContentError, Result};

pub const MIGRATED_PREFIX: &str = "__MIGRATED_";

#[derive(Debug, Clone, Default)]
pub struct StaticTranslations {
    resources: HashMap<String, HashMap<String, String>>,
    fallback_language: Option<String>,
}

impl StaticTranslations {
    /// Empty resources; every lookup misses
    pub fn new(fallback_language: Option<&str>) -> Self {
        Self {
            resources: HashMap::new(),
            fallback_language: fallback_language.map(str::to_string),
        }
    }

    /// Load every supported language found under `dir`. Missing languages
    /// are skipped; unreadable or invalid files are errors.
    pub fn load_dir(dir: &Path, fallback_language: Option<&str>) -> Result<Self> {
        let mut translations = Self::new(fallback_language);

        for language in SUPPORTED_LANGUAGES {
            let candidates = [
                dir.join(language).join("translation.json"),
                dir.join(format!("{language}.json")),
            ];
            let Some(path) = candidates.iter().find(|p| p.is_file()) else {
                debug!(language = language, dir = %dir.display(), "No translation file");
                continue;
            };

            let raw = std::fs::read_to_string(path).map_err(|e| {
                ContentError::Config(format!("Cannot read {}: {}", path.display(), e))
            })?;
            let value: Value = serde_json::from_str(&raw).map_err(|e| {
                ContentError::Config(format!("Invalid translation file {}: {}", path.display(), e))
            })?;

            let mut flat = HashMap::new();
            flatten("", &value, &mut flat);
            info!(language = language, keys = flat.len(), path = %path.display(), "Loaded translations");
            translations.resources.insert(language.to_string(), flat);
        }

        Ok(translations)
    }

    /// Build from in-memory maps
    pub fn from_maps<L, K, V>(
        fallback_language: Option<&str>,
        maps: impl IntoIterator<Item = (L, Vec<(K, V)>)>,
    ) -> Self
    where
        L: Into<String>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut translations = Self::new(fallback_language);
        for (language, entries) in maps {
            let language = language.into();
            for (key, value) in entries {
                translations.insert(&language, key, value);
            }
        }
        translations
    }

    pub fn insert(&mut self, language: &str, key: impl Into<String>, value: impl Into<String>) {
        self.resources
            .entry(language.to_string())
            .or_default()
            .insert(key.into(), value.into());
    }

    pub fn fallback_language(&self) -> Option<&str> {
        self.fallback_language.as_deref()
    }

    pub fn languages(&self) -> Vec<&str> {
        let mut languages: Vec<&str> = self.resources.keys().map(String::as_str).collect();
        languages.sort_unstable();
        languages
    }

    pub fn len(&self, language: &str) -> usize {
        self.resources.get(language).map_or(0, HashMap::len)
    }

    pub fn is_empty(&self) -> bool {
        self.resources.values().all(HashMap::is_empty)
    }

    /// Exact lookup in one language. Empty values and values equal to the
    /// key itself are misses.
    pub fn translate(&self, language: &str, key: &str) -> Option<&str> {
        self.resources
            .get(language)?
            .get(key)
            .map(String::as_str)
            .filter(|value| !value.is_empty() && *value != key)
    }

    /// `__MIGRATED_<key>` in the active language only
    pub fn migrated(&self, language: &str, key: &str) -> Option<&str> {
        self.translate(language, &format!("{MIGRATED_PREFIX}{key}"))
            .filter(|value| *value != key)
    }

    /// Active language first, then the fallback language
    pub fn lookup(&self, language: &str, key: &str) -> Option<&str> {
        self.translate(language, key).or_else(|| {
            self.fallback_language
                .as_deref()
                .filter(|fallback| *fallback != language)
                .and_then(|fallback| self.translate(fallback, key))
        })
    }
}

fn flatten(prefix: &str, value: &Value, out: &mut HashMap<String, String>) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                let path = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{prefix}.{key}")
                };
                flatten(&path, child, out);
            }
        }
        Value::String(text) => {
            out.insert(prefix.to_string(), text.clone());
        }
        Value::Number(_) | Value::Bool(_) => {
            out.insert(prefix.to_string(), value.to_string());
        }
        // arrays and nulls are not translatable strings
        Value::Array(_) | Value::Null => {}
    }
}
