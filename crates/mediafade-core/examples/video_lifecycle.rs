//! Video lifecycle example
//!
//! Drives a VideoPlayer through a typical session against a simulated
//! element: slow poster, first canplay, pause/resume, unmount.
//!
//! Run with: RUST_LOG=mediafade_core=debug cargo run -p mediafade-core --example video_lifecycle

use anyhow::Result;
use mediafade_core::{
    MediaElement, MediaEvent, MediaEventHandlers, ProbeScript, SimulatedProbe, VideoOptions,
    VideoPlayer, VideoView,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing_subscriber::EnvFilter;

/// Stand-in for a browser video element
struct ConsoleVideo;

impl MediaElement for ConsoleVideo {
    fn play(&self) -> mediafade_core::Result<()> {
        println!("  <video> play()");
        Ok(())
    }

    fn pause(&self) -> mediafade_core::Result<()> {
        println!("  <video> pause()");
        Ok(())
    }

    fn set_volume(&self, volume: f64) -> mediafade_core::Result<()> {
        println!("  <video> volume = {}", volume);
        Ok(())
    }
}

fn print_view(label: &str, view: &VideoView) {
    println!(
        "{:<22} mounted={:<5} active={:<5} showing={:<5} phase={:<11} poster={} ({})",
        label,
        view.mount_video,
        view.active,
        view.playback.is_showing_video,
        view.playback.phase().to_string(),
        if view.poster.render_image { "rendered" } else { "pending" },
        if view.poster.fading { "fade" } else { "instant" },
    );
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();
    mediafade_core::init();

    println!("mediafade Core - Video Lifecycle Example");
    println!("========================================\n");

    let probe = Arc::new(
        SimulatedProbe::new(Duration::from_millis(80))
            .script("poster.jpg", ProbeScript::LoadAfter(Duration::from_millis(600))),
    );

    let options = VideoOptions::default()
        .with_source("intro.mp4")
        .with_poster("poster.jpg")
        .with_attribute("playsinline", "true");
    let handlers = MediaEventHandlers::new()
        .on_ended(|event| println!("  caller handler saw '{}'", event));

    let mut player = VideoPlayer::new(options, probe)?.with_handlers(handlers);
    player.attach_video(Arc::new(ConsoleVideo))?;
    print_view("created", &player.view());

    // The browser fires play optimistically, then canplay once frames decode
    player.handle_event(MediaEvent::Play);
    print_view("play (not ready)", &player.view());

    sleep(Duration::from_millis(400)).await;
    print_view("poster past threshold", &player.view());

    player.handle_event(MediaEvent::CanPlay);
    print_view("canplay", &player.view());

    sleep(Duration::from_millis(300)).await;
    print_view("poster loaded", &player.view());

    player.set_pause(true);
    player.handle_event(MediaEvent::Pause);
    print_view("paused", &player.view());

    player.set_pause(false);
    player.handle_event(MediaEvent::Play);
    print_view("resumed", &player.view());

    player.set_muted(true);

    player.set_mount(false);
    player.handle_event(MediaEvent::Pause);
    print_view("unmounting", &player.view());

    sleep(player.exit_transition()).await;
    sleep(Duration::from_millis(10)).await;
    print_view("unmounted", &player.view());

    player.set_mount(true);
    player.attach_video(Arc::new(ConsoleVideo))?;
    player.handle_event(MediaEvent::CanPlay);
    player.handle_event(MediaEvent::Play);
    player.handle_event(MediaEvent::Ended);
    print_view("ended", &player.view());

    Ok(())
}
