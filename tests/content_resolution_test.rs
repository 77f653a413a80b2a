//! Content resolution through the engine: fallback chain, caching, dedup

mod common;

use std::sync::Arc;

use bankim_content::cache::BundleStatus;
use bankim_content::content::FallbackTier;
use bankim_content::translations::StaticTranslations;
use bankim_content::ContentError;
use common::{engine, engine_with, until, MockContentApi};

fn translations() -> StaticTranslations {
    StaticTranslations::from_maps(
        Some("en"),
        vec![
            (
                "en",
                vec![
                    ("calculate_mortgage_title", "Calculate mortgage"),
                    ("sidebar_company", "Company"),
                ],
            ),
            ("he", vec![("__MIGRATED_sidebar_company", "חברה")]),
        ],
    )
}

#[tokio::test]
async fn test_fallback_literal_then_key_without_any_source() {
    let api = MockContentApi::new();
    let engine = engine(&api, "en");

    // screen unknown to the service: every tier misses
    let view = engine.content().load("mortgage_stepX").await;
    assert_eq!(view.status(), BundleStatus::Error);
    assert_eq!(view.get_content("title", Some("Fallback title")), "Fallback title");
    assert_eq!(view.get_content("title", None), "title");
    assert_eq!(engine.get_content("mortgage_stepX", "title", None).await, "title");
}

#[tokio::test]
async fn test_remote_migrated_static_order() {
    let api = MockContentApi::new();
    api.with_content("mortgage_step1", "he", &[("mortgage_step1_title", "חישוב משכנתא")]);
    let engine = engine_with(&api, "he", translations());

    let view = engine.content().load("mortgage_step1").await;
    assert!(view.is_ready());

    let remote = view.resolve("mortgage_step1_title", None);
    assert_eq!(remote.tier, FallbackTier::Remote);
    assert_eq!(remote.value, "חישוב משכנתא");

    let migrated = view.resolve("sidebar_company", None);
    assert_eq!(migrated.tier, FallbackTier::Migrated);
    assert_eq!(migrated.value, "חברה");

    // not in Hebrew resources: English static text
    let fallback_language = view.resolve("calculate_mortgage_title", Some("literal"));
    assert_eq!(fallback_language.tier, FallbackTier::Static);
    assert_eq!(fallback_language.value, "Calculate mortgage");
}

#[tokio::test]
async fn test_repeated_loads_fetch_once() {
    let api = MockContentApi::new();
    api.with_content("mortgage_step1", "en", &[("title", "Mortgage")]);
    let engine = engine(&api, "en");

    for _ in 0..3 {
        assert_eq!(engine.get_content("mortgage_step1", "title", None).await, "Mortgage");
    }
    assert_eq!(api.content_calls(), 1);
    assert_eq!(engine.content().stats().cache.hits, 2);
}

#[tokio::test]
async fn test_concurrent_loads_share_one_fetch() {
    let api = MockContentApi::new();
    api.with_content("mortgage_step2", "en", &[("title", "Personal details")]);
    let gate = api.hold("en");
    let engine = Arc::new(engine(&api, "en"));

    let mut handles = Vec::new();
    for _ in 0..8 {
        let engine = Arc::clone(&engine);
        handles.push(tokio::spawn(async move {
            engine.content().load("mortgage_step2").await.get_content("title", None)
        }));
    }

    until(|| engine.content().stats().dedup.joins == 7).await;
    assert_eq!(engine.content().screen_state("mortgage_step2").status, BundleStatus::Loading);
    gate.open();

    for handle in handles {
        assert_eq!(handle.await.unwrap(), "Personal details");
    }
    assert_eq!(api.content_calls(), 1);
}

#[tokio::test]
async fn test_failure_keeps_form_usable_and_retries() {
    let api = MockContentApi::new();
    api.with_content("mortgage_step1", "he", &[("title", "משכנתא")]);
    api.fail_with(Some(ContentError::Network("connection refused".into())));
    let engine = engine_with(&api, "he", translations());

    let view = engine.content().load("mortgage_step1").await;
    let state = view.state();
    assert_eq!(state.status, BundleStatus::Error);
    assert!(!state.loading);
    assert!(state.error.unwrap().contains("connection refused"));
    assert_eq!(view.get_content("calculate_mortgage_title", None), "Calculate mortgage");

    api.fail_with(None);
    let view = engine.content().load("mortgage_step1").await;
    assert!(view.is_ready());
    assert_eq!(view.get_content("title", None), "משכנתא");
    assert_eq!(api.content_calls(), 2);
}

#[tokio::test]
async fn test_malformed_response_is_recovered_locally() {
    let api = MockContentApi::new();
    api.fail_with(Some(ContentError::MalformedResponse("expected value at line 1".into())));
    let engine = engine(&api, "en");

    let view = engine.content().load("home_page").await;
    assert!(view.error().unwrap().starts_with("Malformed response"));
    assert_eq!(view.get_content("show_offers", Some("Show offers")), "Show offers");
}

#[tokio::test]
async fn test_sync_get_content_reads_cache_only() {
    let api = MockContentApi::new();
    api.with_content("home_page", "en", &[("app.home.service.calculate_mortgage", "Calculate Mortgage")]);
    let engine = engine(&api, "en");

    assert_eq!(
        engine.content().get_content("home_page", "calculate_mortgage", Some("…")),
        "…"
    );
    assert_eq!(api.content_calls(), 0);

    engine.content().load("home_page").await;
    assert_eq!(
        engine.content().get_content("home_page", "calculate_mortgage", None),
        "Calculate Mortgage"
    );
}

#[tokio::test]
async fn test_invalidate_screen_refetches() {
    let api = MockContentApi::new();
    api.with_content("mortgage_step1", "en", &[("title", "v1")]);
    let engine = engine(&api, "en");

    engine.content().load("mortgage_step1").await;
    api.with_content("mortgage_step1", "en", &[("title", "v2")]);
    assert_eq!(engine.content().invalidate_screen("mortgage_step1"), 1);

    assert_eq!(engine.get_content("mortgage_step1", "title", None).await, "v2");
    assert_eq!(api.content_calls(), 2);
}

#[tokio::test]
async fn test_legacy_keys_resolve_through_structured_remote_keys() {
    let api = MockContentApi::new();
    api.with_content(
        "mortgage_step2",
        "en",
        &[
            ("app.mortgage.step2.education", "Education"),
            ("app.mortgage.step2.family_status_option_2", "Married"),
            ("app.home.navigation.about", "About"),
        ],
    );
    let engine = engine(&api, "en");

    let view = engine.content().load("mortgage_step2").await;
    let education = view.resolve("calculate_mortgage_education", None);
    assert_eq!(education.tier, FallbackTier::Remote);
    assert_eq!(education.value, "Education");
    assert_eq!(view.get_content("calculate_mortgage_family_status_option_2", None), "Married");
    assert_eq!(view.resolve("about", None).tier, FallbackTier::Remote);
    assert_eq!(view.get_content("about", None), "About");
    assert_eq!(api.content_calls(), 1);
}
