//! gigbook-player - drive the playback engine from the command line
//!
//! Loads a JSON library (songs, setlists, rehearsal sessions), wires it
//! into the engine with the simulated audio backend, and plays a setlist,
//! a single song, or a rehearsal session in real time while logging every
//! player event.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use gigbook_common::human_time::format_position;
use gigbook_common::{PlayerEvent, SessionId, SetlistId, SongId};
use gigbook_player::backend::SimulatedBackend;
use gigbook_player::catalog::Library;
use gigbook_player::config::Config;
use gigbook_player::PlaybackEngine;
use tokio::signal;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

/// Command-line arguments for gigbook-player
#[derive(Parser, Debug)]
#[command(name = "gigbook-player")]
#[command(about = "Play songs, setlists and rehearsal sessions from a gigbook library")]
#[command(version)]
struct Args {
    /// Library file (JSON with songs, setlists and sessions)
    #[arg(short, long, env = "GIGBOOK_LIBRARY")]
    library: PathBuf,

    /// Config file (overrides GIGBOOK_CONFIG and the per-user config)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Playback rate (0.5 - 2.0)
    #[arg(long)]
    rate: Option<f32>,

    /// Volume (0.0 - 1.0)
    #[arg(long)]
    volume: Option<f32>,

    /// Skip local file checks (library references need not exist on disk)
    #[arg(long)]
    skip_preflight: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Play a setlist
    Setlist {
        id: Uuid,
        /// Index to start from
        #[arg(long, default_value_t = 0)]
        from: usize,
    },
    /// Play one song
    Song { id: Uuid },
    /// Run a rehearsal session
    Session { id: Uuid },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = Config::load(args.config.as_deref()).context("Failed to load config")?;

    // RUST_LOG wins over the configured level
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.logging.level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting gigbook-player with library {}", args.library.display());

    let library = Library::from_json_file(&args.library)
        .with_context(|| format!("Failed to read library {}", args.library.display()))?;

    // Simulated media lasts as long as the catalog says the song does
    let backend = Arc::new(SimulatedBackend::new());
    for song in &library.songs {
        if let Some(reference) = &song.audio_reference {
            backend.register(reference.as_str(), Duration::from_secs_f64(song.duration_seconds.max(0.0)));
        }
    }

    let (catalog, scheduler) = library.into_collaborators().await;
    let mut playback_config = config.playback.clone();
    if args.skip_preflight {
        playback_config.preflight_local_files = false;
    }

    let engine = PlaybackEngine::new(backend, Arc::new(catalog), Arc::new(scheduler), playback_config)
        .context("Failed to initialize playback engine")?;
    let mut events = engine.subscribe();

    if let Some(rate) = args.rate {
        engine.set_rate(rate).await?;
    }
    if let Some(volume) = args.volume {
        engine.set_volume(volume).await?;
    }

    let session = match args.command {
        Command::Setlist { id, from } => {
            engine.play_setlist(SetlistId::from(id), from).await?;
            None
        }
        Command::Song { id } => {
            engine.play_song(SongId::from(id), true).await?;
            None
        }
        Command::Session { id } => {
            let id = SessionId::from(id);
            engine.start_session(id).await?;
            Some(id)
        }
    };

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);
    let mut last_position = 0.0;

    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            event = events.recv() => match event {
                Ok(event) => {
                    if log_event(&event, &mut last_position) {
                        if let Some(id) = session {
                            engine.complete_session(id).await?;
                        }
                        break;
                    }
                }
                Err(RecvError::Lagged(n)) => warn!("Missed {} events", n),
                Err(RecvError::Closed) => break,
            },
        }
    }

    engine.shutdown().await;
    info!("Playback finished");
    Ok(())
}

/// Log one event; returns true once there is nothing left to play
fn log_event(event: &PlayerEvent, last_position: &mut f64) -> bool {
    match event {
        PlayerEvent::PlaybackStateChanged { state, .. } => {
            debug!(
                "{} {} rate {:.2} volume {:.2}{}",
                if state.is_playing { "▶" } else { "⏸" },
                format_position(state.current_time_seconds, state.duration_seconds),
                state.playback_rate,
                state.volume,
                if state.is_muted { " (muted)" } else { "" }
            );
            // A standalone song rewinds and stops when it ends
            let rewound = *last_position > 0.0 && !state.is_playing && state.current_time_seconds == 0.0;
            *last_position = state.current_time_seconds;
            rewound
        }
        PlayerEvent::TrackChanged { song_id, context, .. } => {
            info!("Track changed: {:?} ({:?})", song_id, context);
            false
        }
        PlayerEvent::PlaybackFailed { kind, message, .. } => {
            error!("Playback failed ({}): {}", kind, message);
            false
        }
        PlayerEvent::ListFinished { context, .. } => {
            info!("List finished at index {}", context.index());
            true
        }
        PlayerEvent::SessionStarted {
            session_id,
            song_count,
            ..
        } => {
            info!("Session {} started with {} songs", session_id, song_count);
            false
        }
        PlayerEvent::SessionEnded {
            session_id,
            completed,
            ..
        } => {
            info!("Session {} ended (completed: {})", session_id, completed);
            false
        }
    }
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
