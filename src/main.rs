// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

use anyhow::{Context, Result};
use loopsync::audio::output::{default_device_name, list_devices, supported_sample_rates};
use loopsync::audio::{AudioDecoder, WavDecoder};
use loopsync::analysis::estimate_bpm;
use loopsync::config::{ConfigEvent, ConfigWatcher, LooperConfig};
use loopsync::{AudioConfig, AudioEngine, LoadOutcome, Session, SessionConfig};
use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

fn print_usage() {
    println!("LOOPSYNC - Multitrack Tempo-Synchronized Looper");
    println!();
    println!("Usage: loopsync [OPTIONS]");
    println!();
    println!("Options:");
    println!("  --list-devices              List available audio output devices");
    println!("  --analyze <FILE>...         Print detected tempo for each file");
    println!("  --play <FILE>...            Play WAV files, or one .yaml/.toml session file");
    println!("      --tempo <BPM>           Set the master tempo after loading");
    println!("      --metronome             Start with the metronome on");
    println!("      --auto-sync             Set the master tempo to the mean of all clips");
    println!("      --seconds <N>           Stop after N seconds (default: run until Ctrl+C)");
    println!("      --watch                 Re-apply session file edits while playing");
    println!("      --record <FILE>         Record the mix to a WAV file");
    println!("  --verbose                   Debug logging (overridden by RUST_LOG)");
    println!("  --help                      Show this help message");
}

/// Options for `--play`
#[derive(Debug, Default)]
struct PlayOptions {
    inputs: Vec<PathBuf>,
    tempo: Option<f64>,
    metronome: bool,
    auto_sync: bool,
    seconds: Option<f64>,
    watch: bool,
    record: Option<PathBuf>,
}

fn parse_play_options(args: &[String]) -> Result<PlayOptions> {
    let mut options = PlayOptions::default();
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--tempo" => {
                let value = args.get(i + 1).context("--tempo requires a BPM value")?;
                options.tempo = Some(
                    value
                        .parse()
                        .map_err(|_| anyhow::anyhow!("Invalid tempo: {}", value))?,
                );
                i += 1;
            }
            "--seconds" => {
                let value = args.get(i + 1).context("--seconds requires a number")?;
                options.seconds = Some(
                    value
                        .parse()
                        .map_err(|_| anyhow::anyhow!("Invalid duration: {}", value))?,
                );
                i += 1;
            }
            "--record" => {
                let value = args.get(i + 1).context("--record requires an output file")?;
                options.record = Some(PathBuf::from(value));
                i += 1;
            }
            "--metronome" => options.metronome = true,
            "--auto-sync" => options.auto_sync = true,
            "--watch" => options.watch = true,
            other if other.starts_with("--") => anyhow::bail!("Unknown option: {}", other),
            other => options.inputs.push(PathBuf::from(other)),
        }
        i += 1;
    }
    if options.inputs.is_empty() {
        anyhow::bail!("--play requires at least one file");
    }
    Ok(options)
}

fn is_session_file(path: &Path) -> bool {
    path.extension()
        .map_or(false, |ext| ext == "yaml" || ext == "yml" || ext == "toml")
}

fn print_devices() {
    let default = default_device_name();
    println!("Audio output devices:");
    for (i, name) in list_devices().iter().enumerate() {
        let marker = if default.as_deref() == Some(name.as_str()) {
            " (default)"
        } else {
            ""
        };
        println!("  {}: {}{}", i, name, marker);
    }
    let rates = supported_sample_rates();
    if !rates.is_empty() {
        println!("Default device sample rates: {:?}", rates);
    }
}

fn analyze_files(files: &[String]) -> Result<()> {
    if files.is_empty() {
        anyhow::bail!("--analyze requires at least one file");
    }
    let decoder = WavDecoder::new();
    for file in files {
        let decoded = match decoder.decode(Path::new(file)) {
            Ok(decoded) => decoded,
            Err(e) => {
                eprintln!("{}: {}", file, e);
                continue;
            }
        };
        let estimate = estimate_bpm(&decoded.buffer, decoded.sample_rate);
        let duration = decoded.buffer.num_frames() as f64 / decoded.sample_rate as f64;
        println!(
            "{}: {:.1} BPM ({}), {:.2}s, {} ch @ {} Hz",
            decoded.name,
            estimate.bpm,
            estimate.source,
            duration,
            decoded.buffer.num_channels(),
            decoded.sample_rate
        );
    }
    Ok(())
}

/// Build the session and load every input. Returns the session file, if any.
fn build_session(options: &PlayOptions) -> Result<(Arc<Session>, AudioConfig, Option<PathBuf>)> {
    if options.inputs.len() == 1 && is_session_file(&options.inputs[0]) {
        let path = &options.inputs[0];
        let config = LooperConfig::load(path)?;
        for problem in config.validate() {
            tracing::warn!(%problem, "session file");
        }
        let session = Arc::new(Session::new(config.session_config()));
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        for (i, result) in config.load_into(&session, base).into_iter().enumerate() {
            match result {
                Ok(outcome) => report_load(i, &outcome),
                Err(e) => eprintln!("Track {}: {}", i + 1, e),
            }
        }
        return Ok((session, config.audio, Some(path.clone())));
    }

    let audio = AudioConfig::default();
    let config = SessionConfig {
        sample_rate: audio.sample_rate,
        channels: audio.channels as usize,
        track_count: options.inputs.len().max(loopsync::session::DEFAULT_TRACK_COUNT),
        ..SessionConfig::default()
    };
    let session = Arc::new(Session::new(config));
    for (i, path) in options.inputs.iter().enumerate() {
        match session.load_file(i, path) {
            Ok(outcome) => report_load(i, &outcome),
            Err(e) => eprintln!("Track {}: {}", i + 1, e),
        }
    }
    Ok((session, audio, None))
}

fn report_load(index: usize, outcome: &LoadOutcome) {
    match outcome {
        LoadOutcome::SessionDefining { bpm } => {
            println!("Track {}: {:.1} BPM, sets the master tempo", index + 1, bpm)
        }
        LoadOutcome::Ordinary { bpm, stretch_ratio } => println!(
            "Track {}: {:.1} BPM, stretch ratio {:.3}",
            index + 1,
            bpm,
            stretch_ratio
        ),
    }
}

fn play(options: PlayOptions) -> Result<()> {
    let (session, audio, session_file) = build_session(&options)?;
    if session.loaded_count() == 0 {
        anyhow::bail!("No clips loaded");
    }

    if options.auto_sync {
        if let Some(bpm) = session.auto_sync_tracks() {
            println!("Auto-sync: master tempo {:.1} BPM", bpm);
        }
    }
    if let Some(tempo) = options.tempo {
        if !session.set_tempo(tempo) {
            eprintln!("Ignoring invalid tempo {}", tempo);
        }
    }
    if options.metronome {
        session.set_metronome(true);
    }

    let watcher = match (&session_file, options.watch) {
        (Some(path), true) => Some(ConfigWatcher::new(path, None)?),
        (None, true) => {
            eprintln!("--watch needs a session file; ignoring");
            None
        }
        _ => None,
    };

    let mut engine = AudioEngine::with_config(Arc::clone(&session), audio);
    engine
        .start()
        .map_err(|e| anyhow::anyhow!("Failed to start audio: {}", e))?;

    if options.record.is_some() {
        session.record();
    }
    session.play();
    println!(
        "Playing {} track(s) at {:.1} BPM (press Ctrl+C to stop)...",
        session.loaded_count(),
        session.master_tempo()
    );

    let start_time = Instant::now();
    let mut last_report = Instant::now();
    loop {
        if let Some(limit) = options.seconds {
            if start_time.elapsed().as_secs_f64() >= limit {
                break;
            }
        }

        if let Some(watcher) = &watcher {
            for event in watcher.recv_all() {
                match event {
                    ConfigEvent::Reloaded(config) => {
                        config.apply_settings(&session);
                        println!("Session reloaded: {:.1} BPM", session.master_tempo());
                    }
                    ConfigEvent::Error(e) => eprintln!("{}", e),
                    _ => {}
                }
            }
        }

        if last_report.elapsed() >= Duration::from_secs(1) {
            last_report = Instant::now();
            tracing::debug!(
                position = session.play_position(),
                tempo = session.master_tempo(),
                "playing"
            );
        }

        thread::sleep(Duration::from_millis(50));
    }

    session.stop();
    if let Some(path) = &options.record {
        if let Some(take) = session.record() {
            take.write_wav(path)?;
            println!("Recorded {:.2}s to {}", take.duration(), path.display());
        }
    }
    engine.stop();
    println!("Playback complete!");
    Ok(())
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();
    init_logging(args.iter().any(|a| a == "--verbose"));

    let args: Vec<String> = args.into_iter().skip(1).filter(|a| a != "--verbose").collect();

    let Some((command, rest)) = args.split_first() else {
        println!("LOOPSYNC - Multitrack Tempo-Synchronized Looper");
        println!("Run with --help for usage information");
        return Ok(());
    };

    match command.as_str() {
        "--list-devices" => {
            print_devices();
        }
        "--analyze" => {
            analyze_files(rest)?;
        }
        "--play" => {
            let options = match parse_play_options(rest) {
                Ok(options) => options,
                Err(e) => {
                    eprintln!("Error: {}", e);
                    print_usage();
                    std::process::exit(1);
                }
            };
            play(options)?;
        }
        "--help" | "-h" => {
            print_usage();
        }
        _ => {
            eprintln!("Unknown option: {}", command);
            print_usage();
            std::process::exit(1);
        }
    }

    Ok(())
}
