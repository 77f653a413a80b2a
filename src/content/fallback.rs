//! Content fallback chain
//!
//! ```text
//! 1. Remote    bundle entry: exact key, short key, aliases, prefixes
//! 2. Migrated  static `__MIGRATED_<key>`, active language only
//! 3. Static    static `<key>`, active language then fallback language
//! 4. Literal   caller-supplied fallback
//! 5. Key       the key itself
//! ```
//!
//! The first non-empty value that is not identical to the key wins.

use dashmap::DashSet;
use serde::Serialize;
use std::sync::Arc;
use tracing::warn;

use super::aliases::KeyAliases;
use crate::cache::ContentBundle;
use crate::translations::StaticTranslations;

/// Prefixes tried within the remote tier
pub const DEFAULT_KEY_PREFIXES: [&str; 9] = [
    "app.home.service.",
    "app.home.button.",
    "app.home.header.",
    "app.home.text.",
    "app.home.navigation.",
    "app.mortgage.step.",
    "app.mortgage.form.",
    "app.mortgage.header.",
    "app.mortgage.error.",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackTier {
    Remote,
    Migrated,
    Static,
    Literal,
    Key,
}

/// A resolved string and the tier that produced it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Resolved {
    pub value: String,
    pub tier: FallbackTier,
}

impl Resolved {
    fn new(value: &str, tier: FallbackTier) -> Self {
        Self {
            value: value.to_string(),
            tier,
        }
    }
}

#[derive(Debug)]
pub(crate) struct FallbackChain {
    translations: Arc<StaticTranslations>,
    key_aliases: KeyAliases,
    key_prefixes: Vec<String>,
    /// `screen:language:key` already reported as missing
    warned: DashSet<String>,
}

impl FallbackChain {
    pub(crate) fn new(
        translations: Arc<StaticTranslations>,
        key_aliases: KeyAliases,
        key_prefixes: Vec<String>,
    ) -> Self {
        Self {
            translations,
            key_aliases,
            key_prefixes,
            warned: DashSet::new(),
        }
    }

    pub(crate) fn resolve(
        &self,
        screen_location: &str,
        language: &str,
        bundle: Option<&ContentBundle>,
        key: &str,
        fallback: Option<&str>,
    ) -> Resolved {
        if let Some(value) = bundle.and_then(|b| self.remote(b, key)) {
            return Resolved::new(value, FallbackTier::Remote);
        }
        if let Some(value) = self.translations.migrated(language, key) {
            return Resolved::new(value, FallbackTier::Migrated);
        }
        if let Some(value) = self.translations.lookup(language, key) {
            return Resolved::new(value, FallbackTier::Static);
        }

        self.warn_missing(screen_location, language, key);
        match fallback.filter(|f| !f.is_empty()) {
            Some(literal) => Resolved::new(literal, FallbackTier::Literal),
            None => Resolved::new(key, FallbackTier::Key),
        }
    }

    fn remote<'a>(&self, bundle: &'a ContentBundle, key: &str) -> Option<&'a str> {
        let usable = |value: &&str| *value != key;

        if let Some(value) = bundle.get(key).filter(usable) {
            return Some(value);
        }
        if let Some((_, short)) = key.rsplit_once('.') {
            if let Some(value) = bundle.get(short).filter(usable) {
                return Some(value);
            }
        }
        if let Some(value) = self
            .key_aliases
            .get(key)
            .iter()
            .find_map(|alias| bundle.get(alias).filter(usable))
        {
            return Some(value);
        }
        self.key_prefixes
            .iter()
            .find_map(|prefix| bundle.get(&format!("{prefix}{key}")).filter(usable))
    }

    fn warn_missing(&self, screen_location: &str, language: &str, key: &str) {
        if self.warned.insert(format!("{screen_location}:{language}:{key}")) {
            warn!(
                screen_location = screen_location,
                language = language,
                key = key,
                "Content key missing from every source"
            );
        }
    }

    pub(crate) fn warned_count(&self) -> usize {
        self.warned.len()
    }

    pub(crate) fn clear(&self) {
        self.warned.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn chain() -> FallbackChain {
        let translations = StaticTranslations::from_maps(
            Some("en"),
            vec![
                ("en", vec![("sidebar_company", "Company"), ("mortgage_title", "Mortgage")]),
                ("he", vec![("__MIGRATED_mortgage_title", "משכנתא (ישן)")]),
            ],
        );
        FallbackChain::new(
            Arc::new(translations),
            KeyAliases::built_in(),
            DEFAULT_KEY_PREFIXES.iter().map(|p| p.to_string()).collect(),
        )
    }

    fn bundle(entries: &[(&str, &str)]) -> ContentBundle {
        let entries: HashMap<String, String> = entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ContentBundle::ready("home_page", "he", entries)
    }

    #[test]
    fn test_tier_order() {
        let chain = chain();
        let remote = bundle(&[("mortgage_title", "משכנתא")]);

        let r = chain.resolve("home_page", "he", Some(&remote), "mortgage_title", Some("x"));
        assert_eq!(r.tier, FallbackTier::Remote);

        let r = chain.resolve("home_page", "he", None, "mortgage_title", Some("x"));
        assert_eq!(r, Resolved::new("משכנתא (ישן)", FallbackTier::Migrated));

        let r = chain.resolve("home_page", "he", None, "sidebar_company", Some("x"));
        assert_eq!(r, Resolved::new("Company", FallbackTier::Static));

        let r = chain.resolve("home_page", "he", None, "nowhere", Some("Literal"));
        assert_eq!(r, Resolved::new("Literal", FallbackTier::Literal));

        let r = chain.resolve("home_page", "he", None, "nowhere", None);
        assert_eq!(r, Resolved::new("nowhere", FallbackTier::Key));
    }

    #[test]
    fn test_empty_literal_falls_to_key() {
        let r = chain().resolve("home_page", "en", None, "nowhere", Some(""));
        assert_eq!(r.tier, FallbackTier::Key);
    }

    #[test]
    fn test_remote_value_equal_to_key_is_miss() {
        let remote = bundle(&[("sidebar_company", "sidebar_company")]);
        let r = chain().resolve("home_page", "he", Some(&remote), "sidebar_company", None);
        assert_eq!(r.tier, FallbackTier::Static);
    }

    #[test]
    fn test_prefixed_remote_key() {
        let remote = bundle(&[("app.home.service.calculate_mortgage", "Calculate Mortgage")]);
        let r = chain().resolve("home_page", "en", Some(&remote), "calculate_mortgage", None);
        assert_eq!(r, Resolved::new("Calculate Mortgage", FallbackTier::Remote));
    }

    #[test]
    fn test_legacy_keys_reach_structured_entries() {
        let remote = bundle(&[
            ("app.mortgage.step2.education", "Education"),
            ("app.mortgage.step2.education_option_3", "Bachelor's degree"),
            ("app.home.navigation.about", "About"),
            ("app.mortgage.step.mobile_step_1", "Calculator"),
            ("mobile_step_1_fixed", "Mortgage calculator"),
        ]);
        let chain = chain();

        let r = chain.resolve("mortgage_step2", "en", Some(&remote), "calculate_mortgage_education", None);
        assert_eq!(r, Resolved::new("Education", FallbackTier::Remote));
        let r = chain.resolve(
            "mortgage_step2",
            "en",
            Some(&remote),
            "calculate_mortgage_education_option_3",
            None,
        );
        assert_eq!(r.value, "Bachelor's degree");
        let r = chain.resolve("home_page", "en", Some(&remote), "about", None);
        assert_eq!(r, Resolved::new("About", FallbackTier::Remote));

        // aliases are tried in order
        let r = chain.resolve("mortgage_step1", "en", Some(&remote), "mobile_step_1", None);
        assert_eq!(r.value, "Mortgage calculator");
        assert_eq!(chain.warned_count(), 0);
    }

    #[test]
    fn test_alias_tried_before_prefixes() {
        let remote = bundle(&[
            ("app.home.service.calculate_mortgage", "Calculate Mortgage"),
            ("app.home.text.calculate_mortgage_v2", "Calculate your mortgage"),
        ]);
        let mut aliases = KeyAliases::new();
        aliases.insert("calculate_mortgage", ["app.home.text.calculate_mortgage_v2"]);
        let prefixes: Vec<String> = DEFAULT_KEY_PREFIXES.iter().map(|p| p.to_string()).collect();

        let aliased = FallbackChain::new(Arc::new(StaticTranslations::default()), aliases, prefixes.clone());
        let r = aliased.resolve("home_page", "en", Some(&remote), "calculate_mortgage", None);
        assert_eq!(r.value, "Calculate your mortgage");

        // without aliases only the prefix match remains
        let plain = FallbackChain::new(Arc::new(StaticTranslations::default()), KeyAliases::new(), prefixes);
        let r = plain.resolve("home_page", "en", Some(&remote), "calculate_mortgage", None);
        assert_eq!(r.value, "Calculate Mortgage");
        let r = plain.resolve("home_page", "en", Some(&remote), "calculate_mortgage_education", None);
        assert_eq!(r.tier, FallbackTier::Key);
    }

    #[test]
    fn test_dotted_key_uses_short_form() {
        let remote = bundle(&[("show_offers", "Show offers")]);
        let r = chain().resolve("home_page", "en", Some(&remote), "app.home.button.show_offers", None);
        assert_eq!(r.value, "Show offers");
    }

    #[test]
    fn test_missing_key_warned_once() {
        let chain = chain();
        chain.resolve("home_page", "en", None, "nowhere", None);
        chain.resolve("home_page", "en", None, "nowhere", Some("x"));
        chain.resolve("home_page", "ru", None, "nowhere", None);
        assert_eq!(chain.warned_count(), 2);
    }
}
