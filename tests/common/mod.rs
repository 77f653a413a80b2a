//! Shared fixtures for integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::watch;

use bankim_content::cache::DropdownOption;
use bankim_content::fetch::{ContentApi, ContentPayload, DropdownEntry, DropdownPayload};
use bankim_content::translations::StaticTranslations;
use bankim_content::{ContentError, EngineConfig, FormContentEngine, Result};

/// Holds fetches for one language until opened
pub struct Gate(watch::Sender<bool>);

impl Gate {
    pub fn open(&self) {
        self.0.send_replace(true);
    }
}

type Slot = (String, String);

/// Scripted [`ContentApi`] with call counters, gates and failure injection
#[derive(Default)]
pub struct MockContentApi {
    content: Mutex<HashMap<Slot, ContentPayload>>,
    dropdowns: Mutex<HashMap<Slot, DropdownPayload>>,
    gates: Mutex<HashMap<String, Arc<Gate>>>,
    failure: Mutex<Option<ContentError>>,
    content_calls: AtomicUsize,
    dropdown_calls: AtomicUsize,
}

impl MockContentApi {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_content(&self, screen: &str, language: &str, entries: &[(&str, &str)]) {
        let payload = entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        self.content
            .lock()
            .unwrap()
            .insert((screen.to_string(), language.to_string()), payload);
    }

    pub fn with_dropdown(
        &self,
        screen: &str,
        language: &str,
        field_key: &str,
        options: &[(&str, &str)],
        label: Option<&str>,
        placeholder: Option<&str>,
    ) {
        let entry = DropdownEntry {
            options: options
                .iter()
                .map(|(value, label)| DropdownOption::new(*value, *label))
                .collect(),
            label: label.map(str::to_string),
            placeholder: placeholder.map(str::to_string),
        };
        self.dropdowns
            .lock()
            .unwrap()
            .entry((screen.to_string(), language.to_string()))
            .or_default()
            .insert(field_key.to_string(), entry);
    }

    /// Every fetch in `language` waits until the returned gate opens
    pub fn hold(&self, language: &str) -> Arc<Gate> {
        let (tx, _) = watch::channel(false);
        let gate = Arc::new(Gate(tx));
        self.gates
            .lock()
            .unwrap()
            .insert(language.to_string(), Arc::clone(&gate));
        gate
    }

    /// Fail every fetch with `error` (None restores normal behaviour)
    pub fn fail_with(&self, error: Option<ContentError>) {
        *self.failure.lock().unwrap() = error;
    }

    pub fn content_calls(&self) -> usize {
        self.content_calls.load(Ordering::SeqCst)
    }

    pub fn dropdown_calls(&self) -> usize {
        self.dropdown_calls.load(Ordering::SeqCst)
    }

    async fn wait_gate(&self, language: &str) {
        let gate = self.gates.lock().unwrap().get(language).cloned();
        if let Some(gate) = gate {
            let mut rx = gate.0.subscribe();
            let _ = rx.wait_for(|open| *open).await;
        }
    }

    fn failure(&self) -> Option<ContentError> {
        self.failure.lock().unwrap().clone()
    }
}

#[async_trait]
impl ContentApi for MockContentApi {
    async fn fetch_content(&self, screen_location: &str, language: &str) -> Result<ContentPayload> {
        self.content_calls.fetch_add(1, Ordering::SeqCst);
        self.wait_gate(language).await;
        if let Some(error) = self.failure() {
            return Err(error);
        }
        self.content
            .lock()
            .unwrap()
            .get(&(screen_location.to_string(), language.to_string()))
            .cloned()
            .ok_or(ContentError::Http { status: 404 })
    }

    async fn fetch_dropdowns(&self, screen_location: &str, language: &str) -> Result<DropdownPayload> {
        self.dropdown_calls.fetch_add(1, Ordering::SeqCst);
        self.wait_gate(language).await;
        if let Some(error) = self.failure() {
            return Err(error);
        }
        self.dropdowns
            .lock()
            .unwrap()
            .get(&(screen_location.to_string(), language.to_string()))
            .cloned()
            .ok_or(ContentError::Http { status: 404 })
    }
}

pub fn config(language: &str) -> EngineConfig {
    EngineConfig {
        default_language: language.to_string(),
        ..EngineConfig::default()
    }
}

/// Engine over `api` starting in `language`, without static translations
pub fn engine(api: &Arc<MockContentApi>, language: &str) -> FormContentEngine {
    engine_with(api, language, StaticTranslations::new(Some("en")))
}

pub fn engine_with(
    api: &Arc<MockContentApi>,
    language: &str,
    translations: StaticTranslations,
) -> FormContentEngine {
    FormContentEngine::with_api(config(language), api.clone(), translations).unwrap()
}

/// Yield until `condition` holds
pub async fn until(mut condition: impl FnMut() -> bool) {
    while !condition() {
        tokio::task::yield_now().await;
    }
}
