use vidctl::app::{ControlsView, PlayerController, SurfaceEvent};
use vidctl::cli::Args;
use vidctl::config::Settings;
use vidctl::core::lifecycle::{LifecycleEvent, LifecycleHub};
use vidctl::core::state::{BufferingState, PlaybackState};
use vidctl::engine::sim::{SimEngine, SimMedia, SimThumbnailer};
use vidctl::engine::MetadataKey;
use vidctl::paths::{self, PathConfig};
use vidctl::widgets::PanGesture;

use anyhow::{Context, Result};
use clap::Parser;
use log::{debug, info, warn};
use serde::Serialize;
use std::time::{Duration, Instant};

/// Printed to stdout when the session ends
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SessionSummary {
    locator: String,
    playback_state: PlaybackState,
    buffering_state: BufferingState,
    position: Option<f64>,
    duration: Option<f64>,
    value: f32,
    available_value: f32,
    ready_for_display: bool,
    controls: ControlsView,
}

type Controller = PlayerController<SimEngine, SimThumbnailer>;

fn init_logging(args: &Args, path_config: &PathConfig) -> Result<()> {
    // 0 (default) = warn, 1 (-v) = info, 2 (-vv) = debug, 3+ (-vvv) = trace
    let log_level = match args.verbosity {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    if let Some(log_path_opt) = &args.log_file {
        let log_path = log_path_opt
            .clone()
            .unwrap_or_else(|| paths::data_file(paths::LOG_FILE, path_config));
        let file = std::fs::File::create(&log_path)
            .with_context(|| format!("Failed to create log file: {}", log_path.display()))?;

        env_logger::Builder::new()
            .filter_level(log_level)
            .format_timestamp_millis()
            .target(env_logger::Target::Pipe(Box::new(file)))
            .init();

        info!("Logging to file: {} (level: {:?})", log_path.display(), log_level);
    } else {
        // Console logging (respects RUST_LOG if set)
        let default_level = match args.verbosity {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        };
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
            .format_timestamp_millis()
            .init();
    }
    Ok(())
}

fn sim_media(args: &Args) -> SimMedia {
    if args.fail_load {
        SimMedia::broken(MetadataKey::Duration, "simulated load failure")
    } else if args.unplayable {
        SimMedia::unplayable(args.duration)
    } else {
        SimMedia::playable(args.duration)
    }
}

/// One full drag from the left edge to `fraction` of the track.
fn scrub(controller: &mut Controller, fraction: f32, now: Instant) {
    let controls = controller.settings();
    let x = (controls.track_width - controls.thumb_width) * fraction.clamp(0.0, 1.0);
    info!("Scrubbing to {:.3}", fraction);
    controller.pan(PanGesture::Began { x: 0.0 }, now);
    controller.pan(PanGesture::Changed { x }, now);
    controller.pan(PanGesture::Ended { x }, now);
}

fn main() -> Result<()> {
    let args = Args::parse();

    let path_config = PathConfig::from_env_and_cli(args.config_dir.clone());
    if let Err(e) = paths::ensure_dirs(&path_config) {
        eprintln!("Warning: Failed to create application directories: {}", e);
    }
    init_logging(&args, &path_config)?;

    let settings_path = paths::config_file(paths::SETTINGS_FILE, &path_config);
    let mut settings = Settings::load_or_default(&settings_path)?;
    if args.loop_playback {
        settings.player.playback_loops = true;
    }
    settings.validate().context("Invalid settings")?;

    let mut engine = SimEngine::automatic();
    engine.register(&args.locator, sim_media(&args));

    let hub = LifecycleHub::new();
    let mut controller: Controller =
        PlayerController::new(engine, SimThumbnailer::automatic(), &settings, &hub).context("Invalid settings")?;
    let surface = controller.surface_sink();

    // Virtual clock: session time maps onto `start + t`
    let start = Instant::now();
    let step = Duration::from_millis(args.step_ms.max(1));
    let total = Duration::from_secs_f64(args.run_secs.max(0.0));

    controller.load(args.locator.as_str().into());
    controller.pump(start);

    let background_at = args.background_at.map(|t| Duration::from_secs_f64(t.max(0.0)));
    let foreground_at = background_at.map(|t| t + Duration::from_secs(1));
    let scrub_at = Duration::from_secs_f64(args.scrub_at.max(0.0));

    let mut elapsed = Duration::ZERO;
    let mut scrubbed = false;
    let mut backgrounded = false;
    let mut foregrounded = false;
    let mut surface_ready = false;

    while elapsed < total {
        elapsed += step;
        let now = start + elapsed;
        controller.player_mut().engine_mut().advance(step);

        if !surface_ready && controller.player().current_position().is_some() {
            surface.send(SurfaceEvent::ReadyForDisplay);
            surface_ready = true;
        }
        if let Some(fraction) = args.scrub_to
            && !scrubbed
            && elapsed >= scrub_at
        {
            controller.pump(now);
            scrub(&mut controller, fraction, now);
            scrubbed = true;
        }
        if background_at.is_some_and(|t| !backgrounded && elapsed >= t) {
            info!("App going to background");
            hub.post(LifecycleEvent::WillResignActive);
            hub.post(LifecycleEvent::DidEnterBackground);
            backgrounded = true;
        }
        if foreground_at.is_some_and(|t| !foregrounded && elapsed >= t) {
            info!("App returning to foreground");
            hub.post(LifecycleEvent::WillEnterForeground);
            hub.post(LifecycleEvent::DidBecomeActive);
            foregrounded = true;
        }

        controller.pump(now);
        debug!(
            "t={:.2}s state={} position={:?}",
            elapsed.as_secs_f64(),
            controller.player().playback_state(),
            controller.player().current_position()
        );
    }

    let player = controller.player();
    if player.playback_state() == PlaybackState::Failed {
        warn!("Session ended in failed state");
    }
    let summary = SessionSummary {
        locator: args.locator.clone(),
        playback_state: player.playback_state(),
        buffering_state: player.buffering_state(),
        position: player.current_position(),
        duration: player.duration(),
        value: controller.slider().value(),
        available_value: controller.slider().available_value(),
        ready_for_display: controller.is_ready_for_display(),
        controls: controller.view().clone(),
    };
    println!("{}", serde_json::to_string_pretty(&summary)?);

    controller.teardown();
    Ok(())
}
