//! Screen content service
//!
//! Resolves human-readable strings for a screen. One fetch per
//! `(screen, language)` populates a [`ContentBundle`]; every lookup after
//! that is a map read. Lookups never fail: when the bundle is missing or
//! errored, the [`fallback`] chain supplies the best available string.

pub mod aliases;
pub mod fallback;

use futures::future::join_all;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::cache::{BundleStatus, BundleStore, CacheKey, ContentBundle, ContentKind, ServiceStats};
use crate::fetch::{ContentApi, FetchDeduplicator, PendingRequest};
use crate::language::{Delivery, LanguageCoordinator, LanguageToken, RequestContext};
use crate::translations::StaticTranslations;

pub use aliases::KeyAliases;
pub use fallback::{FallbackTier, Resolved, DEFAULT_KEY_PREFIXES};
use fallback::FallbackChain;

/// Loading/error state of one screen in the active language
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScreenState {
    pub status: BundleStatus,
    pub loading: bool,
    pub error: Option<String>,
}

/// Content of one screen in one language, as handed to a consumer
#[derive(Clone)]
pub struct ContentView {
    pub screen_location: String,
    pub language: String,
    bundle: Option<Arc<ContentBundle>>,
    loading: bool,
    chain: Arc<FallbackChain>,
}

impl ContentView {
    /// Resolve `key` through the fallback chain
    pub fn get_content(&self, key: &str, fallback: Option<&str>) -> String {
        self.resolve(key, fallback).value
    }

    pub fn resolve(&self, key: &str, fallback: Option<&str>) -> Resolved {
        self.chain.resolve(
            &self.screen_location,
            &self.language,
            self.bundle.as_deref(),
            key,
            fallback,
        )
    }

    pub fn status(&self) -> BundleStatus {
        match (&self.bundle, self.loading) {
            (Some(bundle), _) => bundle.status,
            (None, true) => BundleStatus::Loading,
            (None, false) => BundleStatus::Idle,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.status() == BundleStatus::Ready
    }

    pub fn loading(&self) -> bool {
        self.loading
    }

    pub fn error(&self) -> Option<&str> {
        self.bundle.as_ref().and_then(|b| b.error.as_deref())
    }

    pub fn bundle(&self) -> Option<&ContentBundle> {
        self.bundle.as_deref()
    }

    pub fn state(&self) -> ScreenState {
        ScreenState {
            status: self.status(),
            loading: self.loading,
            error: self.error().map(str::to_string),
        }
    }
}

impl std::fmt::Debug for ContentView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentView")
            .field("screen_location", &self.screen_location)
            .field("language", &self.language)
            .field("status", &self.status())
            .field("entries", &self.bundle.as_ref().map_or(0, |b| b.entries.len()))
            .finish()
    }
}

pub struct ContentService {
    api: Arc<dyn ContentApi>,
    store: Arc<BundleStore<ContentBundle>>,
    dedup: FetchDeduplicator<ContentBundle>,
    coordinator: Arc<LanguageCoordinator>,
    chain: Arc<FallbackChain>,
    stale_deliveries: AtomicU64,
}

impl ContentService {
    pub fn new(
        api: Arc<dyn ContentApi>,
        coordinator: Arc<LanguageCoordinator>,
        translations: Arc<StaticTranslations>,
        key_aliases: KeyAliases,
        key_prefixes: Vec<String>,
        fetch_timeout: Duration,
    ) -> Self {
        Self {
            api,
            store: Arc::new(BundleStore::new()),
            dedup: FetchDeduplicator::new(fetch_timeout),
            coordinator,
            chain: Arc::new(FallbackChain::new(translations, key_aliases, key_prefixes)),
            stale_deliveries: AtomicU64::new(0),
        }
    }

    // =========================================================================
    // Loading
    // =========================================================================

    /// Load a screen in the active language, fetching on first use
    pub async fn load(&self, screen_location: &str) -> ContentView {
        let ctx = self.coordinator.detached_context();
        self.load_language(screen_location, &ctx.language, ctx.token).await
    }

    /// Load on behalf of a mounted consumer. The result is always cached,
    /// but only applied when the consumer is still mounted and `ctx` carries
    /// the current language token.
    pub async fn load_for(&self, ctx: &RequestContext, screen_location: &str) -> Delivery<ContentView> {
        let view = self.load_language(screen_location, &ctx.language, ctx.token).await;
        let delivery = self.coordinator.deliver(ctx, view);
        if matches!(delivery, Delivery::Stale { .. }) {
            self.stale_deliveries.fetch_add(1, Ordering::Relaxed);
        }
        delivery
    }

    /// Load a screen in an explicit language
    pub async fn load_language(
        &self,
        screen_location: &str,
        language: &str,
        token: LanguageToken,
    ) -> ContentView {
        let bundle = self.bundle(screen_location, language, token).await;
        self.view_of(screen_location, language, Some(bundle), false)
    }

    /// Load several screens concurrently; returns how many are ready
    pub async fn preload(&self, screens: &[&str]) -> usize {
        let views = join_all(screens.iter().map(|screen| self.load(screen))).await;
        views.iter().filter(|view| view.is_ready()).count()
    }

    async fn bundle(&self, screen_location: &str, language: &str, token: LanguageToken) -> Arc<ContentBundle> {
        let key = CacheKey::content(screen_location, language);
        if let Some(bundle) = self.store.get_ready(&key) {
            return bundle;
        }

        let api = Arc::clone(&self.api);
        let store = Arc::clone(&self.store);
        let generation = store.generation();
        let settle_key = key.clone();
        let lookup_key = key.clone();
        let (screen, lang) = (screen_location.to_string(), language.to_string());
        let (settle_screen, settle_lang) = (screen.clone(), lang.clone());

        let result = self
            .dedup
            .fetch_once(
                key,
                token,
                || self.store.peek_ready(&lookup_key),
                move || async move {
                    api.fetch_content(&screen, &lang).await.map(|entries| {
                        debug!(screen_location = %screen, language = %lang, entries = entries.len(), "Content fetched");
                        ContentBundle::ready(&screen, &lang, entries)
                    })
                },
                move |result| {
                    let bundle = match result {
                        Ok(bundle) => Arc::clone(bundle),
                        Err(e) => Arc::new(ContentBundle::failed(&settle_screen, &settle_lang, e.to_string())),
                    };
                    store.insert_if_generation(generation, settle_key, bundle);
                },
            )
            .await;

        match result {
            Ok(bundle) => bundle,
            Err(e) => Arc::new(ContentBundle::failed(screen_location, language, e.to_string())),
        }
    }

    // =========================================================================
    // Cache-only reads
    // =========================================================================

    /// Resolve `key` for a screen in the active language without fetching.
    /// Never uses a bundle of another language.
    pub fn get_content(&self, screen_location: &str, key: &str, fallback: Option<&str>) -> String {
        self.view(screen_location).get_content(key, fallback)
    }

    /// Cached view of a screen in the active language
    pub fn view(&self, screen_location: &str) -> ContentView {
        let language = self.coordinator.language();
        let key = CacheKey::content(screen_location, &language);
        let bundle = self.store.peek(&key);
        let loading = bundle.is_none() && self.dedup.is_pending(&key);
        self.view_of(screen_location, &language, bundle, loading)
    }

    pub fn screen_state(&self, screen_location: &str) -> ScreenState {
        self.view(screen_location).state()
    }

    fn view_of(
        &self,
        screen_location: &str,
        language: &str,
        bundle: Option<Arc<ContentBundle>>,
        loading: bool,
    ) -> ContentView {
        ContentView {
            screen_location: screen_location.to_string(),
            language: language.to_string(),
            bundle,
            loading,
            chain: Arc::clone(&self.chain),
        }
    }

    // =========================================================================
    // Maintenance
    // =========================================================================

    /// Forget a screen in the active language so the next load refetches
    pub fn invalidate_screen(&self, screen_location: &str) -> usize {
        let language = self.coordinator.language();
        self.store.invalidate_screen(ContentKind::Content, screen_location, &language)
    }

    /// Drop every bundle. Fetches still in flight complete but are not cached.
    pub fn clear(&self) {
        self.store.clear();
        self.chain.clear();
        self.dedup.reset_stats();
        self.stale_deliveries.store(0, Ordering::Relaxed);
    }

    pub fn pending_requests(&self) -> Vec<PendingRequest> {
        self.dedup.pending()
    }

    pub fn cached_bundles(&self) -> usize {
        self.store.len()
    }

    pub fn stats(&self) -> ServiceStats {
        ServiceStats {
            cache: self.store.stats(),
            dedup: self.dedup.stats(),
            stale_deliveries: self.stale_deliveries.load(Ordering::Relaxed),
            pending: self.dedup.pending_count(),
        }
    }
}
