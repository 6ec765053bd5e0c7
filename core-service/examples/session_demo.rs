//! # Session Walkthrough
//!
//! Boots the service on the desktop bridges with a small in-memory library,
//! connects a car head unit and drives a few transport commands while
//! printing the published state.
//!
//! Run with: `cargo run --example session_demo --package core-service`

use anyhow::Context;
use bridge_desktop::{FocusArbiter, SqliteMediaIndex, TracingForegroundService};
use bridge_traits::playback::AudioSource;
use bridge_traits::logging::LogLevel;
use bridge_traits::IndexedSong;
use core_runtime::logging::{init_logging, LogFormat, LoggingConfig};
use core_service::{ClientIdentity, CoreConfig, CoreEvent, CoreService, MediaId, SearchHints};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

fn track(id: i64, title: &str, album: (i64, &str), number: u32) -> IndexedSong {
    IndexedSong {
        id,
        title: title.to_string(),
        artist: "Thelonious Monk".to_string(),
        artist_id: 5,
        album: album.1.to_string(),
        album_id: album.0,
        track_number: Some(number),
        duration_ms: 320_000,
        source: AudioSource::RemoteStream {
            url: format!("https://media.example.com/monk/{}.mp3", id),
            headers: HashMap::new(),
        },
        artwork: None,
    }
}

#[core_async::main]
async fn main() -> anyhow::Result<()> {
    init_logging(
        LoggingConfig::default()
            .with_format(LogFormat::Compact)
            .with_level(LogLevel::Info),
    )?;

    let index = SqliteMediaIndex::in_memory().await?;
    let brilliant_corners = (50, "Brilliant Corners");
    let monks_music = (51, "Monk's Music");
    for song in [
        track(500, "Brilliant Corners", brilliant_corners, 1),
        track(501, "Ba-lue Bolivar Ba-lues-are", brilliant_corners, 2),
        track(502, "Pannonica", brilliant_corners, 3),
        track(510, "Well, You Needn't", monks_music, 1),
        track(511, "Crepuscule with Nellie", monks_music, 2),
    ] {
        index.upsert_song(&song).await?;
    }

    let arbiter = FocusArbiter::new();
    let foreground = TracingForegroundService::new();
    let config = CoreConfig::builder()
        .media_index(Arc::new(index))
        .focus_manager(Arc::new(arbiter.client()))
        .foreground_service(Arc::new(foreground.clone()))
        .permission_probe(Arc::new(bridge_desktop::DirectoryPermissionProbe::new(
            std::env::temp_dir(),
        )))
        .allow_client("com.example.car")
        .build()
        .context("building core config")?;

    let service = CoreService::bootstrap(config).await?;
    let mut events = service.subscribe_events();
    let car = service.connect(ClientIdentity::new("com.example.car", 2001));

    println!("\n=== Browse ===");
    for album in car.get_children(MediaId::ALBUMS)? {
        println!("{:<12} {} ({})", album.id, album.title, album.subtitle.unwrap_or_default());
        for song in car.get_children(&album.id)? {
            println!("    {:<10} {}", song.id, song.title);
        }
    }

    println!("\n=== Transport ===");
    car.play_from_id("song_501").await?;
    print_state(&car)?;
    car.skip_to_next().await?;
    car.seek_to(60_000).await?;
    print_state(&car)?;

    let args = BTreeMap::from([("media_id".to_string(), "song_511".to_string())]);
    car.custom_action("enqueue_next", &args).await?;
    println!("queue: {:?}", queued(&car)?);

    println!("\n=== Focus interruption ===");
    arbiter.interrupt(false);
    core_async::sleep(core_async::Duration::from_millis(50)).await;
    print_state(&car)?;
    println!("foreground: {}", foreground.is_foreground());

    car.play_from_search("crepuscule", SearchHints::default()).await?;
    print_state(&car)?;

    let rogue = service.connect(ClientIdentity::new("com.example.unknown", 4242));
    println!("\nrogue root: {:?}", rogue.root_id());

    service.shutdown().await?;

    println!("\n=== Events ===");
    while let Ok(event) = events.try_recv() {
        if !matches!(event, CoreEvent::Playback(_)) {
            println!("{}", event.description());
        }
    }

    Ok(())
}

fn print_state(car: &core_service::Connection) -> anyhow::Result<()> {
    let state = car.playback_state()?;
    let title = car
        .now_playing()?
        .map(|meta| meta.title)
        .unwrap_or_else(|| "-".to_string());
    println!(
        "{:<8} {:>7} ms  {}",
        state.status, state.position_ms, title
    );
    Ok(())
}

fn queued(car: &core_service::Connection) -> anyhow::Result<Vec<String>> {
    Ok(car
        .queue()?
        .entries
        .into_iter()
        .map(|entry| entry.title)
        .collect())
}
