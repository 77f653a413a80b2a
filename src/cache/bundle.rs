//! Cached bundle types
//!
//! Bundles are owned by a [`BundleStore`](super::store::BundleStore) and only
//! change when a fetch settles. Readers get `Arc` snapshots.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Lifecycle of a cached bundle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BundleStatus {
    #[default]
    Idle,
    Loading,
    Ready,
    Error,
}

/// Translated strings for one screen in one language
#[derive(Debug, Clone, Serialize)]
pub struct ContentBundle {
    pub screen_location: String,
    pub language: String,
    pub entries: HashMap<String, String>,
    pub fetched_at: DateTime<Utc>,
    pub status: BundleStatus,
    pub error: Option<String>,
}

impl ContentBundle {
    pub fn ready(screen_location: &str, language: &str, entries: HashMap<String, String>) -> Self {
        Self {
            screen_location: screen_location.to_string(),
            language: language.to_string(),
            entries,
            fetched_at: Utc::now(),
            status: BundleStatus::Ready,
            error: None,
        }
    }

    pub fn failed(screen_location: &str, language: &str, error: String) -> Self {
        Self {
            screen_location: screen_location.to_string(),
            language: language.to_string(),
            entries: HashMap::new(),
            fetched_at: Utc::now(),
            status: BundleStatus::Error,
            error: Some(error),
        }
    }

    /// Non-empty entry for `key`
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .get(key)
            .map(String::as_str)
            .filter(|value| !value.is_empty())
    }
}

/// One selectable option of a dropdown
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DropdownOption {
    pub value: String,
    pub label: String,
}

impl DropdownOption {
    pub fn new(value: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
        }
    }
}

/// Option list plus label/placeholder metadata for one field of one screen
#[derive(Debug, Clone, Serialize)]
pub struct DropdownBundle {
    pub screen_location: String,
    /// Remote field key this bundle was stored under
    pub field_name: String,
    pub language: String,
    /// Unfiltered canonical option list
    pub options: Vec<DropdownOption>,
    pub label: Option<String>,
    pub placeholder: Option<String>,
    pub fetched_at: DateTime<Utc>,
    pub status: BundleStatus,
    pub error: Option<String>,
}

impl DropdownBundle {
    pub fn ready(
        screen_location: &str,
        field_name: &str,
        language: &str,
        options: Vec<DropdownOption>,
        label: Option<String>,
        placeholder: Option<String>,
    ) -> Self {
        Self {
            screen_location: screen_location.to_string(),
            field_name: field_name.to_string(),
            language: language.to_string(),
            options,
            label,
            placeholder,
            fetched_at: Utc::now(),
            status: BundleStatus::Ready,
            error: None,
        }
    }

    pub fn failed(screen_location: &str, field_name: &str, language: &str, error: String) -> Self {
        Self {
            screen_location: screen_location.to_string(),
            field_name: field_name.to_string(),
            language: language.to_string(),
            options: Vec::new(),
            label: None,
            placeholder: None,
            fetched_at: Utc::now(),
            status: BundleStatus::Error,
            error: Some(error),
        }
    }
}

/// Something with a settle timestamp and status, for TTL checks
pub trait Timestamped {
    fn fetched_at(&self) -> DateTime<Utc>;
    fn status(&self) -> BundleStatus;
}

impl Timestamped for ContentBundle {
    fn fetched_at(&self) -> DateTime<Utc> {
        self.fetched_at
    }

    fn status(&self) -> BundleStatus {
        self.status
    }
}

impl Timestamped for DropdownBundle {
    fn fetched_at(&self) -> DateTime<Utc> {
        self.fetched_at
    }

    fn status(&self) -> BundleStatus {
        self.status
    }
}
