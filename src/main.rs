use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

use voxline::hotword::EnergyEngineFactory;
use voxline::session::{Handshake, WsTransport, NOTICE_QUEUE_DEPTH};
use voxline::{
    AudioCapture, Config, Error, Pipeline, RecognitionSession, StockPluginFactory,
};

/// Capture chunks in flight between the audio callback and the pipeline
const CHUNK_QUEUE_DEPTH: usize = 32;

/// Voxline - realtime streaming voice recognition pipeline
#[derive(Parser)]
#[command(name = "voxline", version, about)]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, env = "VOXLINE_CONFIG", default_value = "config/voxline.toml")]
    config: PathBuf,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Start recording immediately instead of waiting for the start command
    #[arg(long)]
    auto_start: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 => "info,voxline=info",
        1 => "info,voxline=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e}");
            ExitCode::FAILURE
        }
    }
}

#[allow(clippy::future_not_send)]
async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = Config::load(&cli.config)?;
    tracing::debug!(?config, "loaded configuration");

    let handshake = Handshake::from_config(&config)?;
    let (notice_tx, mut notice_rx) = mpsc::channel(NOTICE_QUEUE_DEPTH);
    let (session_handle, session_task) = RecognitionSession::spawn(
        config.server.url(),
        handshake,
        config.session,
        Arc::new(WsTransport),
        notice_tx,
    );

    let mut pipeline = Pipeline::new(&config, session_handle);
    let engines = EnergyEngineFactory::new(config.audio.frame_length);
    let plugins = StockPluginFactory::from_config(&config);
    pipeline.initialize(&engines, &plugins, &config.plugins).await?;

    let (chunk_tx, mut chunk_rx) = mpsc::channel(CHUNK_QUEUE_DEPTH);
    let mut capture = AudioCapture::new(config.audio.sample_rate)?;
    capture.start(chunk_tx)?;

    if cli.auto_start {
        pipeline.start_recording();
    }

    println!("Commands: start | stop | reload [plugin] | results | exit");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            chunk = chunk_rx.recv() => {
                let Some(chunk) = chunk else {
                    tracing::warn!("capture channel closed");
                    break;
                };
                pipeline.process_chunk(&chunk).await?;
            }
            notice = notice_rx.recv() => {
                let Some(notice) = notice else {
                    tracing::warn!("session actor gone");
                    break;
                };
                if let Err(e) = pipeline.handle_notice(notice).await {
                    if matches!(e, Error::SessionFailed { .. }) {
                        tracing::error!("{e}");
                        break;
                    }
                    return Err(e.into());
                }
            }
            line = lines.next_line() => {
                let Ok(Some(line)) = line else { break };
                if !handle_command(&mut pipeline, &plugins, &config, line.trim()).await {
                    break;
                }
            }
        }
    }

    capture.stop();
    pipeline.shutdown().await;
    session_task.await?;

    Ok(())
}

/// Execute one interactive command; returns `false` on exit
async fn handle_command(
    pipeline: &mut Pipeline,
    plugins: &StockPluginFactory,
    config: &Config,
    line: &str,
) -> bool {
    let mut parts = line.split_whitespace();
    match parts.next() {
        Some("start") => pipeline.start_recording(),
        Some("stop") => pipeline.stop_recording(),
        Some("reload") => {
            if let Some(identity) = parts.next() {
                match pipeline.reload_plugin(plugins, identity).await {
                    Ok(()) => println!("Reloaded plugin: {identity}"),
                    Err(e) => println!("Reload failed: {e}"),
                }
            } else {
                pipeline.reload_all(plugins, &config.plugins).await;
                println!("Reloaded all plugins");
            }
        }
        Some("results") => {
            let results = pipeline.results();
            if results.is_empty() {
                println!("No recognition results yet");
            }
            for (i, event) in results.iter().enumerate() {
                println!("[{i}] ({}) {}", event.mode, event.text);
            }
        }
        Some("exit" | "quit") => return false,
        Some(other) => println!("Unknown command: {other}"),
        None => {}
    }
    true
}
