//! Wire formats of the content and dropdown endpoints
//!
//! Both endpoints have drifted over time. Everything is normalised here, at
//! the client boundary, so resolvers only ever see one canonical shape:
//!
//! - content: `key -> string`
//! - dropdowns: `field_key -> DropdownEntry { options, label, placeholder }`

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::cache::DropdownOption;
use crate::types::{ContentError, Result};

const SUCCESS: &str = "success";
const PLACEHOLDER_SUFFIX: &str = "_ph";
const LABEL_SUFFIX: &str = "_label";

// =============================================================================
// Content
// =============================================================================

/// `GET /api/content/{screen}/{lang}`
#[derive(Debug, Clone, Deserialize)]
pub struct ContentResponse {
    pub status: String,
    #[serde(default)]
    pub screen_location: Option<String>,
    #[serde(default)]
    pub language_code: Option<String>,
    #[serde(default)]
    pub content: Option<HashMap<String, ContentValue>>,
}

/// A content entry is either a bare string or a content-item record.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ContentValue {
    Text(String),
    Item { value: String },
}

impl ContentValue {
    pub fn into_text(self) -> String {
        match self {
            Self::Text(text) => text,
            Self::Item { value } => value,
        }
    }
}

/// Canonical content payload: every entry under its full key and, for
/// dotted keys, under the last segment unless that segment has its own entry.
pub type ContentPayload = HashMap<String, String>;

impl ContentResponse {
    pub fn into_payload(self) -> Result<ContentPayload> {
        if self.status != SUCCESS {
            return Err(ContentError::Api(self.status));
        }
        let content = self
            .content
            .ok_or_else(|| ContentError::MalformedResponse("missing `content` object".into()))?;

        // Sorted so that short-key collisions resolve the same way every time
        let sorted: BTreeMap<String, String> = content
            .into_iter()
            .map(|(key, value)| (key, value.into_text()))
            .collect();

        let mut payload: ContentPayload = sorted.clone().into_iter().collect();
        for (key, value) in sorted {
            if let Some((_, short)) = key.rsplit_once('.') {
                if !short.is_empty() {
                    payload.entry(short.to_string()).or_insert(value);
                }
            }
        }
        Ok(payload)
    }
}

// =============================================================================
// Dropdowns
// =============================================================================

/// `GET /api/dropdowns/{screen}/{lang}`
#[derive(Debug, Clone, Deserialize)]
pub struct DropdownResponse {
    pub status: String,
    #[serde(default)]
    pub dropdowns: Option<DropdownsField>,
    #[serde(default)]
    pub options: HashMap<String, Vec<DropdownOption>>,
    #[serde(default)]
    pub placeholders: HashMap<String, String>,
    #[serde(default)]
    pub labels: HashMap<String, String>,
}

/// `dropdowns` is either the per-field map or the older descriptor list
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum DropdownsField {
    Map(HashMap<String, DropdownEntry>),
    List(Vec<DropdownDescriptor>),
}

#[derive(Debug, Clone, Deserialize)]
pub struct DropdownDescriptor {
    pub key: String,
    #[serde(default)]
    pub label: Option<String>,
}

/// Canonical per-field dropdown data
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DropdownEntry {
    #[serde(default)]
    pub options: Vec<DropdownOption>,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub placeholder: Option<String>,
}

pub type DropdownPayload = HashMap<String, DropdownEntry>;

fn non_empty(value: Option<&String>) -> Option<String> {
    value.filter(|v| !v.is_empty()).cloned()
}

impl DropdownResponse {
    pub fn into_payload(self) -> Result<DropdownPayload> {
        if self.status != SUCCESS {
            return Err(ContentError::Api(self.status));
        }

        let mut payload = DropdownPayload::new();
        let mut descriptor_labels = HashMap::new();

        match self.dropdowns {
            Some(DropdownsField::Map(map)) => payload.extend(map),
            Some(DropdownsField::List(list)) => {
                for descriptor in list {
                    descriptor_labels.insert(descriptor.key, descriptor.label);
                }
            }
            None => {}
        }

        // Field keys named anywhere in the flat maps
        let mut keys: BTreeSet<String> = self.options.keys().cloned().collect();
        keys.extend(descriptor_labels.keys().cloned());
        keys.extend(self.labels.keys().map(|k| {
            k.strip_suffix(LABEL_SUFFIX).unwrap_or(k).to_string()
        }));
        keys.extend(self.placeholders.keys().map(|k| {
            k.strip_suffix(PLACEHOLDER_SUFFIX).unwrap_or(k).to_string()
        }));

        for key in keys {
            let entry = payload.entry(key.clone()).or_default();
            if entry.options.is_empty() {
                if let Some(options) = self.options.get(&key) {
                    entry.options = options.clone();
                }
            }
            if entry.label.is_none() {
                entry.label = non_empty(self.labels.get(&format!("{key}{LABEL_SUFFIX}")))
                    .or_else(|| non_empty(self.labels.get(&key)))
                    .or_else(|| descriptor_labels.get(&key).cloned().flatten());
            }
            if entry.placeholder.is_none() {
                entry.placeholder = non_empty(self.placeholders.get(&format!("{key}{PLACEHOLDER_SUFFIX}")))
                    .or_else(|| non_empty(self.placeholders.get(&key)));
            }
        }

        Ok(payload)
    }
}
