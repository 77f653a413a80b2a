//! Engine wiring
//!
//! [`FormContentEngine`] owns one language coordinator and the two services
//! sharing it. It is constructed explicitly and handed to the UI layer; there
//! is no process-global cache.

use futures::future::join_all;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};

use crate::cache::ServiceStats;
use crate::config::EngineConfig;
use crate::content::ContentService;
use crate::dropdown::{DropdownData, DropdownMode, DropdownService, FieldKeyTable};
use crate::fetch::{ContentApi, HttpContentApi};
use crate::language::{is_supported, Consumer, LanguageCoordinator, LanguagePhase, LanguageToken};
use crate::translations::StaticTranslations;
use crate::types::{ContentError, Result};

#[derive(Debug, Clone, Serialize)]
pub struct EngineStats {
    pub language: String,
    pub token: LanguageToken,
    pub phase: LanguagePhase,
    pub active_consumers: usize,
    pub content: ServiceStats,
    pub dropdowns: ServiceStats,
}

/// Outcome of [`FormContentEngine::preload`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PreloadReport {
    pub screens: usize,
    pub content_ready: usize,
    pub dropdowns_ready: usize,
}

pub struct FormContentEngine {
    config: EngineConfig,
    coordinator: Arc<LanguageCoordinator>,
    content: ContentService,
    dropdowns: DropdownService,
}

impl FormContentEngine {
    /// Build the engine against the HTTP content service
    pub fn init(config: EngineConfig) -> Result<Self> {
        let api = HttpContentApi::new(&config.api_base_url, config.request_timeout)?;
        let translations = match &config.translations_dir {
            Some(dir) => StaticTranslations::load_dir(dir, config.fallback_language.as_deref())?,
            None => StaticTranslations::new(config.fallback_language.as_deref()),
        };
        info!(
            api = api.base_url(),
            language = %config.default_language,
            timeout_ms = config.request_timeout.as_millis() as u64,
            "Content engine initialised"
        );
        Self::with_api(config, Arc::new(api), translations)
    }

    /// Build the engine against any [`ContentApi`]
    pub fn with_api(
        config: EngineConfig,
        api: Arc<dyn ContentApi>,
        translations: StaticTranslations,
    ) -> Result<Self> {
        if !is_supported(&config.default_language) {
            return Err(ContentError::Config(format!(
                "Unsupported language: {}",
                config.default_language
            )));
        }

        let table = FieldKeyTable::built_in();
        table.validate()?;

        let coordinator = Arc::new(LanguageCoordinator::new(&config.default_language));
        let content = ContentService::new(
            Arc::clone(&api),
            Arc::clone(&coordinator),
            Arc::new(translations),
            config.key_aliases.clone(),
            config.key_prefixes.clone(),
            config.request_timeout,
        );
        let dropdowns = DropdownService::new(
            api,
            Arc::clone(&coordinator),
            table,
            config.dropdown_ttl,
            config.request_timeout,
        );

        Ok(Self {
            config,
            coordinator,
            content,
            dropdowns,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn coordinator(&self) -> &Arc<LanguageCoordinator> {
        &self.coordinator
    }

    pub fn content(&self) -> &ContentService {
        &self.content
    }

    pub fn dropdowns(&self) -> &DropdownService {
        &self.dropdowns
    }

    pub fn language(&self) -> String {
        self.coordinator.language()
    }

    /// Register a screen or field component
    pub fn mount(&self) -> Consumer {
        self.coordinator.mount()
    }

    /// Switch the active language. In-flight fetches for the old language
    /// still complete into their own cache slots.
    pub fn change_language(&self, language: &str) -> Result<LanguageToken> {
        if !is_supported(language) {
            return Err(ContentError::Config(format!("Unsupported language: {}", language)));
        }

        let token = self.coordinator.change_language(language);
        let orphaned = self
            .content
            .pending_requests()
            .into_iter()
            .chain(self.dropdowns.pending_requests())
            .filter(|pending| pending.token != token);
        for pending in orphaned {
            debug!(
                key = %pending.key,
                token = %pending.token,
                age_ms = pending.age_ms as u64,
                "In-flight fetch from previous language will be cached, not applied"
            );
        }
        Ok(token)
    }

    /// Resolve one key, fetching the screen if needed
    pub async fn get_content(&self, screen_location: &str, key: &str, fallback: Option<&str>) -> String {
        self.content.load(screen_location).await.get_content(key, fallback)
    }

    pub async fn get_dropdown_data(
        &self,
        screen_location: &str,
        logical_field: &str,
        mode: DropdownMode,
    ) -> DropdownData {
        self.dropdowns
            .get_dropdown_data(screen_location, logical_field, mode)
            .await
    }

    /// Fetch content and dropdowns of several screens concurrently
    pub async fn preload(&self, screens: &[&str]) -> PreloadReport {
        let (content_ready, dropdowns) = futures::join!(
            self.content.preload(screens),
            join_all(screens.iter().map(|screen| self.dropdowns.screen_dropdowns(screen)))
        );
        PreloadReport {
            screens: screens.len(),
            content_ready,
            dropdowns_ready: dropdowns.iter().filter(|d| d.error.is_none()).count(),
        }
    }

    /// Drop every cached bundle. Fetches in flight complete but are discarded.
    pub fn reset(&self) {
        self.content.clear();
        self.dropdowns.clear();
        info!(language = %self.language(), "Content engine reset");
    }

    pub fn stats(&self) -> EngineStats {
        let snapshot = self.coordinator.snapshot();
        EngineStats {
            language: snapshot.language,
            token: snapshot.token,
            phase: snapshot.phase,
            active_consumers: self.coordinator.active_consumers(),
            content: self.content.stats(),
            dropdowns: self.dropdowns.stats(),
        }
    }
}
