//! rf-audio-sim - run a scripted audio manager session on simulated backends
//!
//! Usage:
//!   rf-audio-sim                          - built-in configuration
//!   rf-audio-sim --config mixers.json     - custom configuration
//!   rf-audio-sim --ticks 1200 --tick-ms 8 - longer run, finer steps

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::Parser;

use rf_audio_manager::{
    AudioManagerConfig, ClipId, FadeCurve, FadeRequest, ManualClock, Placement, Position,
    SimAudioBackend, SimMixer, SoundConfig, SourceSettings, create_audio_manager, units,
};

const DEFAULT_CONFIG: &str = r#"{
    "mixers": [
        {
            "name": "Master Mixer",
            "id": "master",
            "groups": [
                { "id": "Music", "bus": "Master/Music" },
                { "id": "Sfx", "bus": "Master/Sfx" }
            ],
            "parameters": [
                { "id": "MusicVolume", "key": "music_volume" },
                { "id": "SfxVolume", "key": "sfx_volume" }
            ]
        }
    ],
    "music_group": "Music",
    "pool": { "initial_count": 4, "growable": false }
}"#;

const INTRO: ClipId = ClipId(1);
const THEME: ClipId = ClipId(2);
const CLICK: ClipId = ClipId(10);

#[derive(Parser, Debug)]
#[command(name = "rf-audio-sim", author, version, about = "Simulated audio manager session", long_about = None)]
struct Cli {
    /// JSON configuration (built-in default when omitted)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Number of ticks to run
    #[arg(short, long, default_value_t = 600)]
    ticks: u32,

    /// Tick length in milliseconds
    #[arg(long, default_value_t = 16)]
    tick_ms: u64,

    /// Fire a one-shot every N ticks
    #[arg(long, default_value_t = 20)]
    sound_every: u32,

    /// Group one-shots are routed to
    #[arg(long, default_value = "Sfx")]
    sound_group: String,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    if cli.tick_ms == 0 {
        bail!("--tick-ms must be greater than zero");
    }

    let config = load_config(cli.config.as_ref())?;
    log::info!("Starting rf-audio-sim ({} ticks of {} ms)", cli.ticks, cli.tick_ms);

    // Every configured parameter starts at unity gain (0 dB)
    let mut mixer = SimMixer::new();
    for m in &config.mixers {
        for p in &m.parameters {
            mixer.insert(m.id.as_str(), &p.key, 0.0);
        }
    }

    let backend = SimAudioBackend::new()
        .with_clip(INTRO, 2.0)
        .with_clip(THEME, 4.0)
        .with_clip(CLICK, 0.3);
    let clock = ManualClock::new();

    let (handle, mut manager) = create_audio_manager(&config, backend, mixer, clock.clone())
        .context("failed to create audio manager")?;

    // Intro once, then loop the theme from the end callback
    let music_ends = Arc::new(AtomicUsize::new(0));
    {
        let queue = handle.clone();
        let music_ends = Arc::clone(&music_ends);
        handle.play_music_then(INTRO, move || {
            music_ends.fetch_add(1, Ordering::Relaxed);
            log::info!("Intro finished, looping theme");
            if let Err(e) = queue.play_music(THEME, true) {
                log::warn!("Could not queue theme: {}", e);
            }
        })?;
    }

    // Duck every exposed parameter to -12 dB
    let fades_done = Arc::new(AtomicUsize::new(0));
    let ids: Vec<_> = manager.registry().parameter_ids().cloned().collect();
    for id in ids {
        let done = Arc::clone(&fades_done);
        handle.start_fade(
            FadeRequest::new(id, -12.0)
                .with_duration(Duration::from_secs(2))
                .with_delay(Duration::from_millis(500))
                .with_easing(FadeCurve::SCurve)
                .on_complete(move || {
                    done.fetch_add(1, Ordering::Relaxed);
                }),
        )?;
    }

    let click = SoundConfig::new(CLICK, cli.sound_group.as_str())
        .with_source(SourceSettings::default().with_volume(units::db_to_linear(-6.0)));
    let tick = Duration::from_millis(cli.tick_ms);
    let tick_secs = tick.as_secs_f32();

    let mut commands = 0;
    let mut rejected = 0;
    let mut released = 0;
    let mut peak_voices = 0;

    for n in 0..cli.ticks {
        if cli.sound_every > 0 && n % cli.sound_every == 0 {
            let x = (n as f32 * 0.1).sin() * 5.0;
            handle.play_sound(click.clone(), Placement::At(Position::new(x, 0.0, 2.0)))?;
        }

        clock.advance(tick);
        manager.backend_mut().advance(tick_secs);
        let report = manager.tick();

        commands += report.commands;
        rejected += report.rejected;
        released += report.voices_released;
        peak_voices = peak_voices.max(handle.voices_in_use());

        if report.music_ended {
            log::debug!("Music end at {:?}", report.now);
        }
    }

    log::info!(
        "Finished after {:?}: {} commands ({} rejected), {} one-shots released, peak {} voices",
        manager.now(),
        commands,
        rejected,
        released,
        peak_voices
    );
    log::info!(
        "Fades completed: {}, music ends: {}, music playing: {}",
        fades_done.load(Ordering::Relaxed),
        music_ends.load(Ordering::Relaxed),
        handle.is_music_playing()
    );

    for id in manager.registry().parameter_ids() {
        match manager.get_parameter(id) {
            Ok(value) => log::info!("  {} = {:.2} dB", id, value),
            Err(e) => log::warn!("  {}: {}", id, e),
        }
    }

    Ok(())
}

fn load_config(path: Option<&PathBuf>) -> Result<AudioManagerConfig> {
    let json = match path {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?,
        None => DEFAULT_CONFIG.to_string(),
    };
    AudioManagerConfig::from_json(&json).context("invalid audio manager configuration")
}
