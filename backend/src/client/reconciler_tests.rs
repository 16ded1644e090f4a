//! Tests for merging and promoting cached materials.

use std::sync::{Arc, Mutex};

use mockable::Clock as _;
use rstest::rstest;
use rstest_bdd_macros::{given, then, when};

use super::*;
use crate::client::cache::MockLocalMaterialCache;
use crate::domain::ports::MockMaterialCommand;
use crate::domain::test_fixtures::{durable_material, fixed_clock, identity_with};
use crate::domain::{CourseAction, ErrorCode, FileUpload, Forbidden, Role};

fn cached(name: &str) -> CachedMaterial {
    CachedMaterial::new(name, b"draft".to_vec(), fixed_clock().utc()).expect("valid name")
}

type SharedCache = Arc<Mutex<Vec<CachedMaterial>>>;

/// Cache double backed by a shared vector, for flows that load and save
/// more than once.
fn shared_cache(initial: Vec<CachedMaterial>) -> (MockLocalMaterialCache, SharedCache) {
    let state = Arc::new(Mutex::new(initial));
    let mut cache = MockLocalMaterialCache::new();
    let loaded = Arc::clone(&state);
    cache
        .expect_load()
        .returning(move |_| Ok(loaded.lock().expect("cache lock").clone()));
    let saved = Arc::clone(&state);
    cache.expect_save().returning(move |_, materials| {
        *saved.lock().expect("cache lock") = materials.to_vec();
        Ok(())
    });
    (cache, state)
}

#[given("a course with two durable materials and one cached file")]
fn durable_and_cached() -> (Vec<MaterialRef>, Vec<CachedMaterial>) {
    (
        vec![durable_material("intro.pdf", 7), durable_material("slides.pptx", 7)],
        vec![cached("draft.docx")],
    )
}

#[given("a cached file that is also stored durably")]
fn duplicated_file() -> (Vec<MaterialRef>, Vec<CachedMaterial>) {
    (vec![durable_material("notes.pdf", 7)], vec![cached("notes.pdf")])
}

#[when("the lists are merged")]
fn the_lists_are_merged(input: (Vec<MaterialRef>, Vec<CachedMaterial>)) -> Vec<MaterialView> {
    let (durable, cached) = input;
    merge(&durable, &cached)
}

#[then("durable entries come first and cached entries follow")]
fn durable_entries_come_first(views: Vec<MaterialView>) {
    let names: Vec<&str> = views.iter().map(|view| view.name.as_str()).collect();
    assert_eq!(names, ["intro.pdf", "slides.pptx", "draft.docx"]);
    assert!(views[..2].iter().all(|view| view.id.is_some() && view.source.is_durable()));
    assert_eq!(views[2].id, None);
    assert_eq!(
        views[2].source,
        MaterialSource::Cached {
            key: "draft.docx".into()
        }
    );
    assert_eq!(views[2].content_type, ContentType::Document);
}

#[then("both copies are listed")]
fn both_copies_are_listed(views: Vec<MaterialView>) {
    assert_eq!(views.len(), 2);
    assert!(views.iter().all(|view| view.name == "notes.pdf"));
    assert!(views[0].source.is_durable());
    assert!(!views[1].source.is_durable());
}

#[rstest]
fn merge_keeps_durable_entries_ahead_of_cached_ones() {
    let input = durable_and_cached();
    let views = the_lists_are_merged(input);
    durable_entries_come_first(views);
}

#[rstest]
fn merge_does_not_deduplicate() {
    let input = duplicated_file();
    let views = the_lists_are_merged(input);
    both_copies_are_listed(views);
}

#[test]
fn merged_views_serialise_in_camel_case() {
    let views = merge(&[], &[cached("draft.docx")]);
    let json = serde_json::to_value(&views).expect("serialise");
    assert_eq!(json[0]["sizeBytes"], 5);
    assert_eq!(json[0]["source"]["kind"], "cached");
    assert!(json[0]["id"].is_null());
}

#[tokio::test]
async fn staging_replaces_an_entry_with_the_same_name() {
    let (cache, state) = shared_cache(vec![cached("a.pdf"), cached("b.pdf")]);
    let reconciler = CacheReconciler::new(Arc::new(cache));
    let replacement =
        CachedMaterial::new("a.pdf", b"newer".to_vec(), fixed_clock().utc()).expect("valid");

    reconciler
        .stage(CourseId::new(100), replacement.clone())
        .await
        .expect("staged");
    reconciler
        .stage(CourseId::new(100), cached("c.pdf"))
        .await
        .expect("staged");

    let stored = state.lock().expect("cache lock").clone();
    let names: Vec<&str> = stored.iter().map(CachedMaterial::name).collect();
    assert_eq!(names, ["a.pdf", "b.pdf", "c.pdf"]);
    assert_eq!(stored[0], replacement);
}

#[tokio::test]
async fn discarding_an_unknown_name_skips_the_write() {
    let mut cache = MockLocalMaterialCache::new();
    cache
        .expect_load()
        .times(1)
        .returning(|_| Ok(vec![cached("a.pdf")]));
    cache.expect_save().never();
    let reconciler = CacheReconciler::new(Arc::new(cache));

    let remaining = reconciler
        .discard(CourseId::new(100), "missing.pdf")
        .await
        .expect("discard succeeds");
    assert_eq!(remaining.len(), 1);
}

#[tokio::test]
async fn promote_appends_every_cached_entry_and_clears_them() {
    let (cache, state) = shared_cache(vec![cached("a.pdf"), cached("b.png")]);
    let reconciler = CacheReconciler::new(Arc::new(cache));
    let owner = identity_with(7, Role::Instructor);
    let mut command = MockMaterialCommand::new();
    command
        .expect_append()
        .withf(|identity, course_id, files| {
            let names: Vec<&str> = files.iter().map(FileUpload::name).collect();
            identity.id.get() == 7 && course_id.get() == 100 && names == ["a.pdf", "b.png"]
        })
        .times(1)
        .returning(|_, _, _| {
            Ok(vec![
                durable_material("a.pdf", 7),
                durable_material("b.png", 7),
            ])
        });

    let promotion = reconciler
        .promote(&owner, CourseId::new(100), &command)
        .await
        .expect("promotion succeeds");

    assert_eq!(promotion.promoted, ["a.pdf", "b.png"]);
    assert_eq!(promotion.materials.as_ref().map(Vec::len), Some(2));
    assert!(promotion.cache_cleared);
    assert!(state.lock().expect("cache lock").is_empty());
}

#[tokio::test]
async fn promote_with_an_empty_cache_sends_nothing() {
    let mut cache = MockLocalMaterialCache::new();
    cache.expect_load().returning(|_| Ok(Vec::new()));
    cache.expect_save().never();
    let mut command = MockMaterialCommand::new();
    command.expect_append().never();
    let reconciler = CacheReconciler::new(Arc::new(cache));

    let promotion = reconciler
        .promote(&identity_with(7, Role::Instructor), CourseId::new(100), &command)
        .await
        .expect("nothing to promote");
    assert_eq!(promotion.materials, None);
    assert!(promotion.promoted.is_empty());
}

#[tokio::test]
async fn failed_append_leaves_the_cache_untouched() {
    let mut cache = MockLocalMaterialCache::new();
    cache
        .expect_load()
        .times(1)
        .returning(|_| Ok(vec![cached("a.pdf")]));
    cache.expect_save().never();
    let mut command = MockMaterialCommand::new();
    command.expect_append().returning(|_, _, _| {
        Err(MaterialError::Forbidden(Forbidden {
            action: CourseAction::AddMaterial,
        }))
    });
    let reconciler = CacheReconciler::new(Arc::new(cache));

    let err = reconciler
        .promote(&identity_with(8, Role::Student), CourseId::new(100), &command)
        .await
        .expect_err("append refused");
    assert!(matches!(err, PromoteError::Material(MaterialError::Forbidden(_))));
    assert_eq!(Error::from(err).code(), ErrorCode::Forbidden);
}

#[tokio::test]
async fn cache_write_failure_after_append_is_reported_not_raised() {
    let mut cache = MockLocalMaterialCache::new();
    cache.expect_load().returning(|_| Ok(vec![cached("a.pdf")]));
    cache
        .expect_save()
        .times(1)
        .returning(|_, _| Err(CacheError::io("disk full")));
    let mut command = MockMaterialCommand::new();
    command
        .expect_append()
        .times(1)
        .returning(|_, _, _| Ok(vec![durable_material("a.pdf", 7)]));
    let reconciler = CacheReconciler::new(Arc::new(cache));

    let promotion = reconciler
        .promote(&identity_with(7, Role::Instructor), CourseId::new(100), &command)
        .await
        .expect("append succeeded");
    assert!(!promotion.cache_cleared);
    assert_eq!(promotion.promoted, ["a.pdf"]);
}
