//! Basic playback example
//!
//! Drives a playback controller over a headless surface with a scripted
//! engine, printing every notification the host would receive.
//!
//! Run with: cargo run -p cinestream-core --example basic_playback

use cinestream_core::{
    testing::FakeEngineFactory, EngineEvent, HeadlessSurface, PlaybackController, PlaybackObserver,
    PlayerConfig, Quality, Rendition,
};

fn main() {
    println!("CineStream Core - Basic Playback Example");
    println!("=========================================\n");

    let config = PlayerConfig::vod();
    println!("Configuration:");
    println!("  - Low latency: {}", config.engine.low_latency_mode);
    println!("  - Back buffer: {:.0}s", config.engine.back_buffer_length);
    println!("  - Quality policy: {:?}\n", config.quality_policy);

    let observer = PlaybackObserver::new()
        .on_play_state(|playing| println!("  [play state] {}", if playing { "playing" } else { "paused" }))
        .on_time_update(|t| println!("  [time] {:.1}s", t))
        .on_quality_levels(|levels| {
            let names: Vec<String> = levels.iter().map(Quality::display_name).collect();
            println!("  [qualities] {}", names.join(", "));
        })
        .on_active_quality(|q| println!("  [active] {}", q.display_name()))
        .on_error(|e| println!("  [error] {}", e));

    let (factory, probe) = FakeEngineFactory::new();
    let mut player = PlaybackController::new(HeadlessSurface::new(), factory, config).with_observer(observer);

    println!("Mounting stream:");
    let url = "https://test-streams.mux.dev/x36xhzz/x36xhzz.m3u8";
    match player.mount(url) {
        Ok(mode) => println!("  - Bound as {:?}", mode),
        Err(e) => println!("  - Failed: {}", e),
    }

    // The engine reports its manifest
    probe.emit(EngineEvent::ManifestParsed {
        levels: vec![
            Rendition::new(360, 800_000),
            Rendition::new(720, 2_800_000),
            Rendition::new(1080, 5_000_000),
        ],
    });
    player.pump();

    println!("\nPlaying:");
    let _ = player.set_playing(true);
    for _ in 0..3 {
        player.surface_mut().advance(1.0);
        player.pump();
    }

    println!("\nSwitching to HD:");
    let _ = player.set_desired_quality(Quality::Height(720));
    player.pump();

    println!("\nPausing and unmounting:");
    let _ = player.set_playing(false);
    player.pump();
    player.unmount();

    let stats = probe.stats();
    println!("  - Engines created: {}, destroyed: {}", stats.created, stats.destroyed);
    println!("\nExample complete!");
}
