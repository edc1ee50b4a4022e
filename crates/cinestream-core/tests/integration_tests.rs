//! Integration tests for CineStream Core

use cinestream_core::{
    catalog::default_records,
    testing::FakeEngineFactory,
    AppConfig, BindingMode, CatalogConfig, ContentCatalog, EngineEvent, Error, HeadlessSurface,
    LevelSelection, MediaEvent, MediaInfo, MediaSurface, MockCatalog, PlaybackController, PlaybackObserver,
    PlayerConfig, Quality, QualityPolicy, Recovery, Rendition, HLS_MIME_TYPE,
};
use std::cell::RefCell;
use std::rc::Rc;

const URL_A: &str = "https://cdn.example.com/a/master.m3u8";
const URL_B: &str = "https://cdn.example.com/b/master.m3u8";
const MP4_URL: &str = "https://cdn.example.com/c/trailer.mp4";

fn levels(heights: &[u32]) -> Vec<Rendition> {
    heights
        .iter()
        .map(|h| Rendition::new(*h, *h as u64 * 4_000))
        .collect()
}

fn catalog() -> MockCatalog {
    MockCatalog::new(&CatalogConfig { latency_ms: 0 })
}

/// Collects every value a callback receives
fn recorder<T>() -> (Rc<RefCell<Vec<T>>>, Rc<RefCell<Vec<T>>>) {
    let values = Rc::new(RefCell::new(Vec::new()));
    (values.clone(), values)
}

// =============================================================================
// Catalog Tests
// =============================================================================

#[tokio::test]
async fn test_fetch_by_id_present_and_missing() {
    let catalog = catalog();
    let record = catalog.fetch_by_id(3).await.unwrap();
    assert_eq!(record.title, "007: Road to a Million");

    let err = catalog.fetch_by_id(404).await.unwrap_err();
    assert!(matches!(err, Error::NotFound { id: 404 }));
    assert_eq!(err.recovery(), Recovery::GoHome);
}

#[tokio::test]
async fn test_search_title_or_description() {
    let catalog = catalog();
    assert_eq!(catalog.search("").await.unwrap().len(), default_records().len());

    // "Reality" only appears in a description
    let hits = catalog.search("REALITY").await.unwrap();
    assert_eq!(hits.iter().map(|r| r.id).collect::<Vec<_>>(), vec![1]);

    let hits = catalog.search("aus vs").await.unwrap();
    assert_eq!(hits.iter().map(|r| r.id).collect::<Vec<_>>(), vec![2]);
}

#[tokio::test]
async fn test_failing_catalog_offers_retry() {
    let catalog = MockCatalog::failing("backend offline", &CatalogConfig { latency_ms: 0 });
    let err = catalog.search("x").await.unwrap_err();
    assert_eq!(err.recovery(), Recovery::Retry);
}

#[test]
fn test_record_json_shape() {
    let json = serde_json::to_value(&default_records()[1]).unwrap();
    assert_eq!(json["type"], "sports");
    assert_eq!(json["thumbnailUrl"].as_str().map(|s| s.ends_with(".jpg")), Some(true));
    assert_eq!(json["isPremium"], false);
}

// =============================================================================
// Quality Negotiation Tests
// =============================================================================

#[test]
fn test_ladder_published_after_manifest() {
    let (factory, probe) = FakeEngineFactory::new();
    let (ladders, sink) = recorder();
    let mut player = PlaybackController::new(HeadlessSurface::new(), factory, PlayerConfig::default())
        .with_observer(PlaybackObserver::new().on_quality_levels(move |q| sink.borrow_mut().push(q.to_vec())));

    player.mount(URL_A).unwrap();
    probe.emit(EngineEvent::ManifestParsed { levels: levels(&[360, 480, 720, 1080, 2160]) });
    player.pump();

    let expected = vec![
        Quality::Auto,
        Quality::Height(1080),
        Quality::Height(720),
        Quality::Height(480),
        Quality::Height(360),
    ];
    assert_eq!(player.state().available_qualities, expected);
    assert_eq!(*ladders.borrow(), vec![expected]);
}

#[test]
fn test_verbatim_policy_keeps_unrecognized_heights() {
    let (factory, probe) = FakeEngineFactory::new();
    let config = PlayerConfig {
        quality_policy: QualityPolicy::Verbatim,
        ..Default::default()
    };
    let mut player = PlaybackController::new(HeadlessSurface::new(), factory, config);

    player.mount(URL_A).unwrap();
    probe.emit(EngineEvent::ManifestParsed { levels: levels(&[2160, 1080, 540]) });
    player.pump();

    assert_eq!(
        player.state().available_qualities,
        vec![
            Quality::Auto,
            Quality::Height(2160),
            Quality::Height(1080),
            Quality::Height(540),
        ]
    );
    assert!(player.set_desired_quality(Quality::Height(2160)).unwrap());
}

#[test]
fn test_requesting_active_quality_is_idempotent() {
    let (factory, probe) = FakeEngineFactory::new();
    let mut player = PlaybackController::new(HeadlessSurface::new(), factory, PlayerConfig::default());

    player.mount(URL_A).unwrap();
    probe.emit(EngineEvent::ManifestParsed { levels: levels(&[720, 480]) });
    player.pump();

    // Already automatic
    assert!(!player.set_desired_quality(Quality::Auto).unwrap());
    assert!(player.set_desired_quality(Quality::Height(480)).unwrap());
    assert!(!player.set_desired_quality(Quality::Height(480)).unwrap());
    player.pump();

    assert_eq!(probe.stats().level_requests, vec![LevelSelection::Index(1)]);
    assert_eq!(player.state().active_quality, Quality::Height(480));
}

#[test]
fn test_engine_driven_switch_publishes_label() {
    let (factory, probe) = FakeEngineFactory::new();
    let (active, sink) = recorder();
    let mut player = PlaybackController::new(HeadlessSurface::new(), factory, PlayerConfig::default())
        .with_observer(PlaybackObserver::new().on_active_quality(move |q| sink.borrow_mut().push(q)));

    player.mount(URL_A).unwrap();
    probe.emit(EngineEvent::ManifestParsed { levels: levels(&[720, 2160]) });
    probe.emit(EngineEvent::LevelSwitched { level: 1, auto: false });
    probe.emit(EngineEvent::LevelSwitched { level: 0, auto: true });
    player.pump();

    // Not offered in the ladder, but reported as-is
    assert_eq!(*active.borrow(), vec![Quality::Height(2160), Quality::Auto]);
}

// =============================================================================
// Lifecycle Tests
// =============================================================================

#[test]
fn test_url_change_replaces_engine() {
    let (factory, probe) = FakeEngineFactory::new();
    let (active, sink) = recorder();
    let mut player = PlaybackController::new(HeadlessSurface::new(), factory, PlayerConfig::default())
        .with_observer(PlaybackObserver::new().on_active_quality(move |q| sink.borrow_mut().push(q)));

    player.mount(URL_A).unwrap();
    probe.emit(EngineEvent::ManifestParsed { levels: levels(&[720, 480]) });
    player.pump();
    assert_eq!(
        player.state().available_qualities,
        vec![Quality::Auto, Quality::Height(720), Quality::Height(480)]
    );

    assert!(player.set_desired_quality(Quality::Height(720)).unwrap());
    player.pump();
    assert_eq!(player.state().active_quality, Quality::Height(720));

    player.set_url(URL_B).unwrap();
    let stats = probe.stats();
    assert_eq!(stats.created, 2);
    assert_eq!(stats.destroyed, 1);
    assert_eq!(stats.detached, 1);
    assert_eq!(stats.loaded, vec![URL_A.to_string(), URL_B.to_string()]);
    assert_eq!(player.url(), Some(URL_B));

    // Stream state resets with the new binding
    assert_eq!(player.state().available_qualities, vec![Quality::Auto]);
    assert_eq!(*active.borrow(), vec![Quality::Height(720), Quality::Auto]);
}

#[test]
fn test_url_change_resets_media_position() {
    let (factory, _probe) = FakeEngineFactory::new();
    let mut player = PlaybackController::new(HeadlessSurface::new(), factory, PlayerConfig::default());

    player.mount(URL_A).unwrap();
    player.surface_mut().load_media_info(&MediaInfo { duration: Some(100.0), is_live: false });
    player.set_playing(true).unwrap();
    player.surface_mut().advance(50.0);
    player.pump();
    assert_eq!(player.state().position, 50.0);
    assert_eq!(player.state().duration, Some(100.0));

    player.set_url(URL_B).unwrap();
    assert_eq!(player.surface().duration(), None);

    player.surface_mut().advance(1.0);
    player.pump();
    assert_eq!(player.state().position, 1.0);
    assert_eq!(player.state().duration, None);
    assert!(player.state().playing);
}

#[test]
fn test_same_url_keeps_engine() {
    let (factory, probe) = FakeEngineFactory::new();
    let mut player = PlaybackController::new(HeadlessSurface::new(), factory, PlayerConfig::default());

    player.mount(URL_A).unwrap();
    player.set_url(URL_A).unwrap();
    assert_eq!(probe.stats().created, 1);
}

#[test]
fn test_unmount_releases_everything() {
    let (factory, probe) = FakeEngineFactory::new();
    let mut player = PlaybackController::new(HeadlessSurface::new(), factory, PlayerConfig::default());

    player.mount(URL_A).unwrap();
    assert!(player.surface().listener_count() > 0);

    player.unmount();
    assert_eq!(player.surface().listener_count(), 0);
    assert_eq!(probe.stats().live(), 0);
    assert_eq!(probe.stats().detached, 1);

    // Second unmount and drop are no-ops
    player.unmount();
    drop(player);
    assert_eq!(probe.stats().destroyed, 1);
}

#[test]
fn test_drop_releases_engine() {
    let (factory, probe) = FakeEngineFactory::new();
    {
        let mut player = PlaybackController::new(HeadlessSurface::new(), factory, PlayerConfig::default());
        player.mount(URL_A).unwrap();
        assert_eq!(probe.stats().live(), 1);
    }
    assert_eq!(probe.stats().live(), 0);
}

#[test]
fn test_events_of_released_engine_are_dropped() {
    let (factory, probe) = FakeEngineFactory::new();
    let mut player = PlaybackController::new(HeadlessSurface::new(), factory, PlayerConfig::default());

    player.mount(URL_A).unwrap();
    probe.emit(EngineEvent::ManifestParsed { levels: levels(&[720]) });
    player.set_url(URL_B).unwrap();
    player.pump();

    assert_eq!(player.state().available_qualities, vec![Quality::Auto]);
}

// =============================================================================
// Fallback Tests
// =============================================================================

#[test]
fn test_native_fallback() {
    let (factory, probe) = FakeEngineFactory::unsupported();
    let surface = HeadlessSurface::new().with_native_type(HLS_MIME_TYPE);
    let mut player = PlaybackController::new(surface, factory, PlayerConfig::default());

    assert_eq!(player.mount(URL_A).unwrap(), BindingMode::Native);
    assert_eq!(player.surface().source(), Some(URL_A));
    assert_eq!(probe.stats().created, 0);

    // No quality introspection or switching natively
    assert!(!player.set_desired_quality(Quality::Height(720)).unwrap());
    assert_eq!(player.state().available_qualities, vec![Quality::Auto]);

    player.unmount();
    assert_eq!(player.surface().source(), None);
}

#[test]
fn test_inert_binding_reports_unsupported() {
    let (factory, _probe) = FakeEngineFactory::unsupported();
    let (errors, sink) = recorder();
    let mut player = PlaybackController::new(HeadlessSurface::new(), factory, PlayerConfig::default())
        .with_observer(PlaybackObserver::new().on_error(move |e| sink.borrow_mut().push(e.error_code())));

    let err = player.mount(URL_A).unwrap_err();
    assert!(matches!(err, Error::StreamUnsupported { .. }));
    assert_eq!(err.recovery(), Recovery::DegradedNotice);
    assert_eq!(player.binding_mode(), Some(BindingMode::Inert));
    assert_eq!(*errors.borrow(), vec!["STREAM_UNSUPPORTED"]);
    assert!(player.is_mounted());
}

#[test]
fn test_inert_binding_does_not_play() {
    let (factory, _probe) = FakeEngineFactory::unsupported();
    let surface = HeadlessSurface::new().with_native_type("video/mp4");
    let mut player = PlaybackController::new(surface, factory, PlayerConfig::default());

    assert!(player.mount(URL_A).is_err());
    let err = player.set_playing(true).unwrap_err();
    assert!(matches!(err, Error::StreamUnsupported { ref url } if url == URL_A));

    player.surface_mut().advance(3.0);
    player.pump();
    assert!(!player.surface().is_playing());
    assert!(!player.state().playing);
    assert_eq!(player.state().position, 0.0);

    // The intent is kept for a stream that can play
    assert_eq!(player.set_url(MP4_URL).unwrap(), BindingMode::Native);
    player.pump();
    assert!(player.surface().is_playing());
    assert!(player.state().playing);
}

#[test]
fn test_engine_load_failure_reports_manifest_error() {
    let (factory, probe) = FakeEngineFactory::failing_load();
    let mut player = PlaybackController::new(HeadlessSurface::new(), factory, PlayerConfig::default());

    let err = player.mount(URL_A).unwrap_err();
    assert!(matches!(err, Error::ManifestLoadFailed { ref url, .. } if url == URL_A));
    assert_eq!(probe.stats().live(), 0);
}

// =============================================================================
// Intent Tests
// =============================================================================

#[test]
fn test_play_toggle_round_trip() {
    let (factory, _probe) = FakeEngineFactory::new();
    let (states, sink) = recorder();
    let mut player = PlaybackController::new(HeadlessSurface::new(), factory, PlayerConfig::default())
        .with_observer(PlaybackObserver::new().on_play_state(move |p| sink.borrow_mut().push(p)));

    player.mount(URL_A).unwrap();
    assert!(!player.state().playing);

    player.set_playing(true).unwrap();
    player.pump();
    assert!(player.state().playing);

    player.set_playing(false).unwrap();
    player.pump();
    assert!(!player.state().playing);
    assert_eq!(*states.borrow(), vec![true, false]);
}

#[test]
fn test_rejected_play_stays_paused() {
    let (factory, _probe) = FakeEngineFactory::new();
    let (errors, sink) = recorder();
    let surface = HeadlessSurface::new().with_autoplay(false);
    let mut player = PlaybackController::new(surface, factory, PlayerConfig::default())
        .with_observer(PlaybackObserver::new().on_error(move |e| sink.borrow_mut().push(e.error_code())));

    player.mount(URL_A).unwrap();
    let err = player.set_playing(true).unwrap_err();
    player.pump();

    assert!(matches!(err, Error::PlaybackRejected(_)));
    assert_eq!(err.recovery(), Recovery::Silent);
    assert!(!player.state().playing);

    // Asynchronous refusal from the surface takes the same path
    player.handle_media_event(MediaEvent::PlayRejected { reason: "NotAllowedError".into() });
    assert!(!player.state().playing);
    assert_eq!(*errors.borrow(), vec!["PLAYBACK_REJECTED", "PLAYBACK_REJECTED"]);
}

#[test]
fn test_mute_and_fullscreen_sync() {
    let (factory, _probe) = FakeEngineFactory::new();
    let (fullscreen, sink) = recorder();
    let mut player = PlaybackController::new(HeadlessSurface::new(), factory, PlayerConfig::default())
        .with_observer(PlaybackObserver::new().on_fullscreen_change(move |f| sink.borrow_mut().push(f)));

    player.mount(URL_A).unwrap();
    player.set_muted(true);
    player.set_fullscreen(true).unwrap();
    player.pump();
    assert!(player.state().muted);
    assert!(player.state().fullscreen);

    // Surface-initiated changes flow back into the published state
    player.surface_mut().set_muted(false);
    player.surface_mut().exit_fullscreen().unwrap();
    player.pump();
    assert!(!player.state().muted);
    assert_eq!(*fullscreen.borrow(), vec![true, false]);
}

#[test]
fn test_playing_intent_survives_url_change() {
    let (factory, _probe) = FakeEngineFactory::new();
    let mut player = PlaybackController::new(HeadlessSurface::new(), factory, PlayerConfig::default());

    player.mount(URL_A).unwrap();
    player.set_playing(true).unwrap();
    player.set_url(URL_B).unwrap();
    player.pump();
    assert!(player.surface().is_playing());
    assert!(player.state().playing);
}

// =============================================================================
// Config Tests
// =============================================================================

#[test]
fn test_app_config_from_json() {
    let config = AppConfig::from_json(r#"{ "catalog": { "latency_ms": 0 } }"#).unwrap();
    assert_eq!(config.catalog.latency_ms, 0);
    assert_eq!(config.player, PlayerConfig::default());

    assert!(AppConfig::from_json(r#"{ "player": { "engine": { "requestTimeoutMs": 0 } } }"#).is_err());
}
