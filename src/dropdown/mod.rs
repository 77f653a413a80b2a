//! Dropdown resolution
//!
//! - **field_map**: logical field → remote field key, per screen
//! - **defaults**: built-in English option lists
//! - **filter**: view-side option filtering
//!
//! One fetch per `(screen, language)` returns every dropdown of the screen.
//! Its settle step splits the payload into one [`DropdownBundle`] per remote
//! field key plus a screen-level record listing the fields. Every caller gets
//! the same [`DropdownData`] shape whatever the mode, and always a usable
//! option list: remote options when present, built-in defaults otherwise.

pub mod defaults;
pub mod field_map;
pub mod filter;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::cache::{
    BundleStatus, BundleStore, CacheKey, ContentKind, DropdownBundle, DropdownOption, ServiceStats,
    Timestamped,
};
use crate::fetch::{ContentApi, DropdownEntry, DropdownPayload, FetchDeduplicator, PendingRequest};
use crate::language::{Delivery, LanguageCoordinator, LanguageToken, RequestContext};
use crate::types::ContentError;

pub use field_map::FieldKeyTable;
pub use filter::{OptionFilter, NO_ADDITIONAL_INCOME_VALUES};

// =============================================================================
// Public shapes
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DropdownMode {
    /// Options, label and placeholder
    #[default]
    Full,
    /// Options only; label and placeholder are always `None`
    Options,
}

impl FromStr for DropdownMode {
    type Err = ContentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "full" => Ok(Self::Full),
            "options" => Ok(Self::Options),
            other => Err(ContentError::Config(format!("Unknown dropdown mode: {other}"))),
        }
    }
}

impl fmt::Display for DropdownMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Full => write!(f, "full"),
            Self::Options => write!(f, "options"),
        }
    }
}

/// Where the options of a [`DropdownData`] came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OptionSource {
    Remote,
    Defaults,
    #[default]
    None,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct DropdownData {
    pub options: Vec<DropdownOption>,
    pub label: Option<String>,
    pub placeholder: Option<String>,
    pub loading: bool,
    pub error: Option<String>,
    pub source: OptionSource,
}

impl DropdownData {
    fn loading() -> Self {
        Self {
            loading: true,
            ..Self::default()
        }
    }

    fn with_mode(mut self, mode: DropdownMode) -> Self {
        if mode == DropdownMode::Options {
            self.label = None;
            self.placeholder = None;
        }
        self
    }

    /// Copy with `filter` applied to the options
    pub fn filtered(&self, filter: &OptionFilter) -> Self {
        Self {
            options: filter.apply(&self.options),
            ..self.clone()
        }
    }
}

/// Every field of one screen, keyed by remote field key
#[derive(Debug, Clone, Serialize)]
pub struct ScreenDropdowns {
    pub screen_location: String,
    pub language: String,
    pub fields: BTreeMap<String, DropdownData>,
    pub error: Option<String>,
}

// =============================================================================
// Screen-level record
// =============================================================================

/// Outcome of the last fetch of a screen's dropdowns
#[derive(Debug, Clone)]
struct ScreenFetch {
    fields: Vec<String>,
    fetched_at: DateTime<Utc>,
    status: BundleStatus,
    error: Option<String>,
}

impl ScreenFetch {
    fn ready(payload: &DropdownPayload) -> Self {
        let mut fields: Vec<String> = payload.keys().cloned().collect();
        fields.sort_unstable();
        Self {
            fields,
            fetched_at: Utc::now(),
            status: BundleStatus::Ready,
            error: None,
        }
    }

    fn failed(error: String) -> Self {
        Self {
            fields: Vec::new(),
            fetched_at: Utc::now(),
            status: BundleStatus::Error,
            error: Some(error),
        }
    }
}

impl Timestamped for ScreenFetch {
    fn fetched_at(&self) -> DateTime<Utc> {
        self.fetched_at
    }

    fn status(&self) -> BundleStatus {
        self.status
    }
}

fn entry_of(bundle: &DropdownBundle) -> DropdownEntry {
    DropdownEntry {
        options: bundle.options.clone(),
        label: bundle.label.clone(),
        placeholder: bundle.placeholder.clone(),
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

/// Combine the candidates of one logical field. Options, label and
/// placeholder are each taken from the first candidate that has them.
fn assemble(
    logical_field: &str,
    candidates: &[String],
    error: Option<String>,
    lookup: impl Fn(&str) -> Option<DropdownEntry>,
) -> DropdownData {
    let mut options: Option<Vec<DropdownOption>> = None;
    let mut label = None;
    let mut placeholder = None;

    for key in candidates {
        let Some(entry) = lookup(key) else {
            continue;
        };
        if options.is_none() && !entry.options.is_empty() {
            options = Some(entry.options);
        }
        if label.is_none() {
            label = non_empty(entry.label);
        }
        if placeholder.is_none() {
            placeholder = non_empty(entry.placeholder);
        }
    }

    match (options, defaults::default_field(logical_field)) {
        (Some(options), _) => DropdownData {
            options,
            label,
            placeholder,
            loading: false,
            error,
            source: OptionSource::Remote,
        },
        (None, Some(fallback)) => DropdownData {
            options: fallback.options(),
            label: label.or_else(|| Some(fallback.label.to_string())),
            placeholder: placeholder.or_else(|| Some(fallback.placeholder.to_string())),
            loading: false,
            error,
            source: OptionSource::Defaults,
        },
        (None, None) => DropdownData {
            options: Vec::new(),
            label,
            placeholder,
            loading: false,
            error,
            source: OptionSource::None,
        },
    }
}

fn data_of(entry: DropdownEntry) -> DropdownData {
    let source = if entry.options.is_empty() {
        OptionSource::None
    } else {
        OptionSource::Remote
    };
    DropdownData {
        options: entry.options,
        label: non_empty(entry.label),
        placeholder: non_empty(entry.placeholder),
        loading: false,
        error: None,
        source,
    }
}

// =============================================================================
// Service
// =============================================================================

pub struct DropdownService {
    api: Arc<dyn ContentApi>,
    screens: Arc<BundleStore<ScreenFetch>>,
    fields: Arc<BundleStore<DropdownBundle>>,
    dedup: FetchDeduplicator<DropdownPayload>,
    table: Arc<FieldKeyTable>,
    coordinator: Arc<LanguageCoordinator>,
    stale_deliveries: AtomicU64,
}

/// Result of making sure a screen's dropdowns were fetched
enum Fetched {
    /// Served from the per-field cache
    Cached,
    /// Fresh payload from this fetch
    Payload(Arc<DropdownPayload>),
    Failed(String),
}

impl DropdownService {
    /// `ttl` of `None` keeps screens for the session
    pub fn new(
        api: Arc<dyn ContentApi>,
        coordinator: Arc<LanguageCoordinator>,
        table: FieldKeyTable,
        ttl: Option<Duration>,
        fetch_timeout: Duration,
    ) -> Self {
        Self {
            api,
            screens: Arc::new(BundleStore::with_ttl(ttl)),
            fields: Arc::new(BundleStore::new()),
            dedup: FetchDeduplicator::new(fetch_timeout),
            table: Arc::new(table),
            coordinator,
            stale_deliveries: AtomicU64::new(0),
        }
    }

    pub fn field_table(&self) -> &FieldKeyTable {
        &self.table
    }

    pub fn resolve_field_key(&self, screen_location: &str, logical_field: &str) -> String {
        self.table.resolve_field_key(screen_location, logical_field)
    }

    /// Dropdown data for a logical field in the active language
    pub async fn get_dropdown_data(
        &self,
        screen_location: &str,
        logical_field: &str,
        mode: DropdownMode,
    ) -> DropdownData {
        let ctx = self.coordinator.detached_context();
        self.fetch_data(screen_location, logical_field, mode, &ctx.language, ctx.token)
            .await
    }

    /// Same as [`get_dropdown_data`](Self::get_dropdown_data) on behalf of a
    /// mounted consumer
    pub async fn get_dropdown_data_for(
        &self,
        ctx: &RequestContext,
        screen_location: &str,
        logical_field: &str,
        mode: DropdownMode,
    ) -> Delivery<DropdownData> {
        let data = self
            .fetch_data(screen_location, logical_field, mode, &ctx.language, ctx.token)
            .await;
        let delivery = self.coordinator.deliver(ctx, data);
        if matches!(delivery, Delivery::Stale { .. }) {
            self.stale_deliveries.fetch_add(1, Ordering::Relaxed);
        }
        delivery
    }

    /// Dropdown data with `filter` applied. The cached list is unaffected.
    pub async fn get_filtered(
        &self,
        screen_location: &str,
        logical_field: &str,
        mode: DropdownMode,
        filter: &OptionFilter,
    ) -> DropdownData {
        self.get_dropdown_data(screen_location, logical_field, mode)
            .await
            .filtered(filter)
    }

    /// Every dropdown field of a screen in the active language
    pub async fn screen_dropdowns(&self, screen_location: &str) -> ScreenDropdowns {
        let ctx = self.coordinator.detached_context();
        let language = ctx.language;

        let mut result = ScreenDropdowns {
            screen_location: screen_location.to_string(),
            language: language.clone(),
            fields: BTreeMap::new(),
            error: None,
        };

        match self.ensure_screen(screen_location, &language, ctx.token).await {
            Fetched::Payload(payload) => {
                for (key, entry) in payload.iter() {
                    result.fields.insert(key.clone(), data_of(entry.clone()));
                }
            }
            Fetched::Cached => {
                let key = CacheKey::dropdown_screen(screen_location, &language);
                let names = self.screens.peek(&key).map(|s| s.fields.clone()).unwrap_or_default();
                for name in names {
                    if let Some(entry) = self.cached_entry(screen_location, &language, &name) {
                        result.fields.insert(name, data_of(entry));
                    }
                }
            }
            Fetched::Failed(error) => result.error = Some(error),
        }
        result
    }

    async fn fetch_data(
        &self,
        screen_location: &str,
        logical_field: &str,
        mode: DropdownMode,
        language: &str,
        token: LanguageToken,
    ) -> DropdownData {
        let candidates = self.table.candidates(screen_location, logical_field);
        let data = match self.ensure_screen(screen_location, language, token).await {
            Fetched::Payload(payload) => assemble(logical_field, &candidates, None, |key| {
                payload.get(key).cloned()
            }),
            Fetched::Cached => assemble(logical_field, &candidates, None, |key| {
                self.cached_entry(screen_location, language, key)
            }),
            Fetched::Failed(error) => assemble(logical_field, &candidates, Some(error), |_| None),
        };
        data.with_mode(mode)
    }

    fn cached_entry(&self, screen_location: &str, language: &str, field_key: &str) -> Option<DropdownEntry> {
        self.fields
            .peek(&CacheKey::dropdown_field(screen_location, language, field_key))
            .map(|bundle| entry_of(&bundle))
    }

    /// Rebuild a screen's payload from the per-field cache, if it settled
    fn cached_payload(&self, screen_location: &str, language: &str) -> Option<Arc<DropdownPayload>> {
        let record = self
            .screens
            .peek_ready(&CacheKey::dropdown_screen(screen_location, language))?;
        let payload = record
            .fields
            .iter()
            .filter_map(|name| {
                self.cached_entry(screen_location, language, name)
                    .map(|entry| (name.clone(), entry))
            })
            .collect();
        Some(Arc::new(payload))
    }

    async fn ensure_screen(&self, screen_location: &str, language: &str, token: LanguageToken) -> Fetched {
        let key = CacheKey::dropdown_screen(screen_location, language);
        if self.screens.get_ready(&key).is_some() {
            return Fetched::Cached;
        }

        let api = Arc::clone(&self.api);
        let screens = Arc::clone(&self.screens);
        let fields = Arc::clone(&self.fields);
        let generation = screens.generation();
        let (screen, lang) = (screen_location.to_string(), language.to_string());
        let (settle_screen, settle_lang) = (screen.clone(), lang.clone());

        let result = self
            .dedup
            .fetch_once(
                key.clone(),
                token,
                || self.cached_payload(screen_location, language),
                move || async move { api.fetch_dropdowns(&screen, &lang).await },
                move |result| {
                    let record = match result {
                        Ok(payload) => {
                            if screens.generation() == generation {
                                fields.invalidate_screen(ContentKind::Dropdown, &settle_screen, &settle_lang);
                                for (field_key, entry) in payload.iter() {
                                    fields.insert(
                                        CacheKey::dropdown_field(&settle_screen, &settle_lang, field_key),
                                        DropdownBundle::ready(
                                            &settle_screen,
                                            field_key,
                                            &settle_lang,
                                            entry.options.clone(),
                                            entry.label.clone(),
                                            entry.placeholder.clone(),
                                        ),
                                    );
                                }
                            }
                            debug!(
                                screen_location = %settle_screen,
                                language = %settle_lang,
                                fields = payload.len(),
                                "Dropdowns fetched"
                            );
                            ScreenFetch::ready(payload)
                        }
                        Err(e) => ScreenFetch::failed(e.to_string()),
                    };
                    screens.insert_if_generation(generation, key, record);
                },
            )
            .await;

        match result {
            Ok(payload) => Fetched::Payload(payload),
            Err(e) => Fetched::Failed(e.to_string()),
        }
    }

    /// Cached data in the active language without fetching. `loading` is
    /// set while the screen has never settled in this language.
    pub fn cached(&self, screen_location: &str, logical_field: &str, mode: DropdownMode) -> DropdownData {
        let language = self.coordinator.language();
        let key = CacheKey::dropdown_screen(screen_location, &language);
        let Some(record) = self.screens.peek(&key) else {
            return DropdownData::loading();
        };

        let candidates = self.table.candidates(screen_location, logical_field);
        let data = match record.status {
            BundleStatus::Ready => assemble(logical_field, &candidates, None, |field_key| {
                self.cached_entry(screen_location, &language, field_key)
            }),
            _ => assemble(logical_field, &candidates, record.error.clone(), |_| None),
        };
        data.with_mode(mode)
    }

    // =========================================================================
    // Maintenance
    // =========================================================================

    /// Forget a screen in the active language so the next request refetches
    pub fn invalidate_screen(&self, screen_location: &str) -> usize {
        let language = self.coordinator.language();
        self.screens
            .invalidate_screen(ContentKind::Dropdown, screen_location, &language);
        self.fields
            .invalidate_screen(ContentKind::Dropdown, screen_location, &language)
    }

    pub fn clear(&self) {
        self.screens.clear();
        self.fields.clear();
        self.dedup.reset_stats();
        self.stale_deliveries.store(0, Ordering::Relaxed);
    }

    pub fn is_pending(&self, screen_location: &str) -> bool {
        let language = self.coordinator.language();
        self.dedup
            .is_pending(&CacheKey::dropdown_screen(screen_location, &language))
    }

    pub fn pending_requests(&self) -> Vec<PendingRequest> {
        self.dedup.pending()
    }

    /// Number of cached per-field bundles
    pub fn cached_fields(&self) -> usize {
        self.fields.len()
    }

    pub fn stats(&self) -> ServiceStats {
        ServiceStats {
            cache: self.screens.stats(),
            dedup: self.dedup.stats(),
            stale_deliveries: self.stale_deliveries.load(Ordering::Relaxed),
            pending: self.dedup.pending_count(),
        }
    }
}
