//! Language changes while fetches are in flight

mod common;

use std::sync::Arc;

use bankim_content::dropdown::{DropdownMode, OptionSource};
use bankim_content::language::{Delivery, LanguagePhase};
use common::{engine, until, MockContentApi};

fn bilingual_api() -> Arc<MockContentApi> {
    let api = MockContentApi::new();
    api.with_content("mortgage_step1", "en", &[("title", "Calculate mortgage")]);
    api.with_content("mortgage_step1", "he", &[("title", "חישוב משכנתא")]);
    api
}

#[tokio::test]
async fn test_old_language_response_never_reaches_new_slot() {
    let api = bilingual_api();
    let english = api.hold("en");
    let engine = Arc::new(engine(&api, "en"));
    let consumer = engine.mount();

    let ctx = consumer.context();
    let pending = {
        let engine = Arc::clone(&engine);
        tokio::spawn(async move { engine.content().load_for(&ctx, "mortgage_step1").await })
    };
    until(|| api.content_calls() == 1).await;

    engine.change_language("he").unwrap();
    assert_eq!(engine.coordinator().phase(), LanguagePhase::Switching);

    let hebrew = engine.content().load_for(&consumer.context(), "mortgage_step1").await;
    let hebrew = hebrew.applied().unwrap();
    assert_eq!(hebrew.language, "he");
    assert_eq!(hebrew.get_content("title", None), "חישוב משכנתא");
    assert_eq!(engine.coordinator().phase(), LanguagePhase::Stable);

    english.open();
    match pending.await.unwrap() {
        Delivery::Stale { token, current } => assert!(token < current),
        other => panic!("expected stale delivery, got {:?}", other),
    }

    // the late English result landed in its own slot
    assert_eq!(engine.content().get_content("mortgage_step1", "title", None), "חישוב משכנתא");
    assert_eq!(engine.content().stats().stale_deliveries, 1);
    let english_view = engine
        .content()
        .load_language("mortgage_step1", "en", engine.coordinator().token())
        .await;
    assert_eq!(english_view.get_content("title", None), "Calculate mortgage");
    assert_eq!(api.content_calls(), 2);
}

#[tokio::test]
async fn test_old_language_dropdown_never_reaches_new_slot() {
    let api = bilingual_api();
    api.with_dropdown(
        "mortgage_step3",
        "en",
        "mortgage_step3_main_source",
        &[("employee", "Employee"), ("selfemployed", "Self-employed")],
        Some("Main source of income"),
        None,
    );
    api.with_dropdown(
        "mortgage_step3",
        "he",
        "mortgage_step3_main_source",
        &[("employee", "שכיר"), ("selfemployed", "עצמאי")],
        Some("מקור הכנסה עיקרי"),
        None,
    );
    let english = api.hold("en");
    let engine = Arc::new(engine(&api, "en"));
    let consumer = engine.mount();

    let ctx = consumer.context();
    let pending = {
        let engine = Arc::clone(&engine);
        tokio::spawn(async move {
            engine
                .dropdowns()
                .get_dropdown_data_for(&ctx, "mortgage_step3", "main_source", DropdownMode::Full)
                .await
        })
    };
    until(|| api.dropdown_calls() == 1).await;

    engine.change_language("he").unwrap();
    let hebrew = engine
        .dropdowns()
        .get_dropdown_data_for(&consumer.context(), "mortgage_step3", "main_source", DropdownMode::Full)
        .await
        .applied()
        .unwrap();
    assert_eq!(hebrew.source, OptionSource::Remote);
    assert_eq!(hebrew.label.as_deref(), Some("מקור הכנסה עיקרי"));
    assert_eq!(hebrew.options[0].label, "שכיר");
    assert_eq!(engine.coordinator().phase(), LanguagePhase::Stable);

    english.open();
    match pending.await.unwrap() {
        Delivery::Stale { token, current } => assert!(token < current),
        other => panic!("expected stale delivery, got {:?}", other),
    }
    assert_eq!(engine.dropdowns().stats().stale_deliveries, 1);

    // the Hebrew per-field bundle still holds only Hebrew options
    let cached = engine
        .dropdowns()
        .cached("mortgage_step3", "main_source", DropdownMode::Full);
    let labels: Vec<&str> = cached.options.iter().map(|o| o.label.as_str()).collect();
    assert_eq!(labels, vec!["שכיר", "עצמאי"]);
    assert_eq!(cached.label.as_deref(), Some("מקור הכנסה עיקרי"));
    assert_eq!(engine.dropdowns().cached_fields(), 2);

    // the late English result landed in its own slot
    engine.change_language("en").unwrap();
    let english_data = engine
        .dropdowns()
        .cached("mortgage_step3", "main_source", DropdownMode::Full);
    assert_eq!(english_data.options[0].label, "Employee");
    assert_eq!(api.dropdown_calls(), 2);
}

#[tokio::test]
async fn test_cached_other_language_is_never_shown() {
    let api = bilingual_api();
    let engine = engine(&api, "en");

    engine.content().load("mortgage_step1").await;
    engine.change_language("he").unwrap();

    // English is cached but Hebrew is not loaded yet
    let view = engine.content().view("mortgage_step1");
    assert!(view.bundle().is_none());
    assert_eq!(view.get_content("title", Some("")), "title");
}

#[tokio::test]
async fn test_unmounted_consumer_result_is_cached_not_applied() {
    let api = bilingual_api();
    let gate = api.hold("en");
    let engine = Arc::new(engine(&api, "en"));

    let consumer = engine.mount();
    let ctx = consumer.context();
    let task = {
        let engine = Arc::clone(&engine);
        tokio::spawn(async move { engine.content().load_for(&ctx, "mortgage_step1").await })
    };
    until(|| api.content_calls() == 1).await;

    consumer.unmount();
    gate.open();

    assert!(matches!(task.await.unwrap(), Delivery::Cancelled));
    // a remount reuses the cached bundle
    let remounted = engine.mount();
    let view = engine
        .content()
        .load_for(&remounted.context(), "mortgage_step1")
        .await
        .applied()
        .unwrap();
    assert_eq!(view.get_content("title", None), "Calculate mortgage");
    assert_eq!(api.content_calls(), 1);
}

#[tokio::test]
async fn test_switch_settles_when_every_consumer_refetched() {
    let api = bilingual_api();
    api.with_dropdown(
        "mortgage_step1",
        "he",
        "mortgage_step1_type",
        &[("apartment", "דירה")],
        Some("סוג הנכס"),
        None,
    );
    let engine = engine(&api, "en");
    let screen = engine.mount();
    let field = engine.mount();

    let token = engine.change_language("he").unwrap();
    assert_eq!(engine.coordinator().awaiting_consumers(), 2);

    let content = engine.content().load_for(&screen.context(), "mortgage_step1").await;
    assert!(content.is_applied());
    assert_eq!(engine.coordinator().phase(), LanguagePhase::Switching);

    let dropdown = engine
        .dropdowns()
        .get_dropdown_data_for(&field.context(), "mortgage_step1", "type", DropdownMode::Full)
        .await
        .applied()
        .unwrap();
    assert_eq!(dropdown.options[0].label, "דירה");
    assert_eq!(engine.coordinator().phase(), LanguagePhase::Stable);

    // same language again: no new token
    assert_eq!(engine.change_language("he").unwrap(), token);
}

#[tokio::test]
async fn test_language_watch_sees_phases() {
    let api = bilingual_api();
    let engine = engine(&api, "en");
    let consumer = engine.mount();
    let mut rx = engine.coordinator().subscribe();

    engine.change_language("ru").unwrap();
    rx.changed().await.unwrap();
    assert_eq!(rx.borrow_and_update().phase, LanguagePhase::Switching);

    drop(consumer);
    rx.changed().await.unwrap();
    let snapshot = rx.borrow_and_update().clone();
    assert_eq!(snapshot.language, "ru");
    assert_eq!(snapshot.phase, LanguagePhase::Stable);
}
