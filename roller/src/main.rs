mod console;
mod dice;
mod frame;
mod sampler;
mod seed;

use std::path::PathBuf;

use console::Command;
use frame::HttpFrameSource;
use sampler::SamplerSettings;
use seed::{FrameSeed, HttpSeedClient};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info, warn};
use webcam_dice_common::config::Config;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("config.toml"));

    let config = match Config::load(&config_path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config from {}: {e}", config_path.display());
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.logging.level.parse().unwrap_or_default()),
        )
        .with_writer(std::io::stderr)
        .init();

    info!(
        camera = config.camera.url,
        seed_source = config.seed.source,
        seed_url = config.seed.url,
        threshold = config.sampler.threshold,
        min_interval_ms = config.sampler.min_interval_ms,
        tick_interval_ms = config.sampler.tick_interval_ms,
        "starting webcam dice roller"
    );

    let frames = match HttpFrameSource::new(&config.camera.url) {
        Ok(f) => f,
        Err(e) => {
            error!(error = %e, "failed to create camera client");
            std::process::exit(1);
        }
    };
    let settings = SamplerSettings::from(&config.sampler);
    let tick = config.sampler.tick_interval();

    let handle = match config.seed.source.as_str() {
        "http" => match HttpSeedClient::new(&config.seed.url) {
            Ok(seeds) => sampler::spawn(frames, seeds, settings, tick),
            Err(e) => {
                error!(error = %e, "failed to create seed client");
                std::process::exit(1);
            }
        },
        "frame" => match FrameSeed::new(&config.camera.url) {
            Ok(seeds) => sampler::spawn(frames, seeds, settings, tick),
            Err(e) => {
                error!(error = %e, "failed to create frame seed source");
                std::process::exit(1);
            }
        },
        other => {
            error!(source = other, "unknown seed source, expected 'http' or 'frame'");
            std::process::exit(1);
        }
    };

    println!("{}", console::help_text());
    run_console(&handle).await;
    handle.shutdown().await;
}

/// Read commands from stdin until `quit`, EOF or ctrl-c.
async fn run_console(handle: &sampler::SamplerHandle) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut seed_updates = handle.subscribe();
    let mut sampler_alive = true;

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let line = match line {
                    Ok(Some(line)) => line,
                    Ok(None) => break,
                    Err(e) => {
                        error!(error = %e, "failed to read stdin");
                        break;
                    }
                };
                if line.trim().is_empty() {
                    continue;
                }
                match line.parse::<Command>() {
                    Ok(command) => {
                        println!("{}", console::execute(command, handle));
                        if command == Command::Quit {
                            break;
                        }
                    }
                    Err(e) => {
                        warn!(error = %e, "invalid input");
                        println!("{e}");
                    }
                }
            }
            changed = seed_updates.changed(), if sampler_alive => {
                if changed.is_err() {
                    warn!("sampler exited, seed will no longer update");
                    sampler_alive = false;
                    continue;
                }
                println!("current seed: {}", seed_updates.borrow_and_update().seed);
            }
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted");
                break;
            }
        }
    }
}
