// Headless player: loads a file, plays it for a while, reports resume positions
use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;
use tokio::time::Instant;

use slothplayer_lib::audio::MediaSource;
use slothplayer_lib::db::Playback;
use slothplayer_lib::settings::default_app_dir;
use slothplayer_lib::AppState;

#[derive(Parser)]
#[command(name = "slothplayer", version, about = "Play local media and remember where you left off")]
struct Cli {
    /// Data directory (settings, resume positions, bundled media)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Play a local file
    Play {
        path: PathBuf,
        /// How long to play before pausing
        #[arg(long, default_value_t = 5)]
        seconds: u64,
        /// Start here instead of the saved position
        #[arg(long)]
        from: Option<f64>,
    },
    /// Play a bundled resource from the media directory
    Bundled {
        name: String,
        #[arg(long)]
        ext: Option<String>,
        #[arg(long, default_value_t = 5)]
        seconds: u64,
    },
    /// List saved resume positions
    List,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let app_dir = match cli.data_dir {
        Some(dir) => dir,
        None => default_app_dir().ok_or_else(|| anyhow!("No data directory on this platform"))?,
    };
    let state = AppState::bootstrap(app_dir)?;

    match cli.command {
        Command::Play {
            path,
            seconds,
            from,
        } => play(&state, MediaSource::Locator(path), seconds, from).await?,
        Command::Bundled { name, ext, seconds } => {
            play(&state, MediaSource::Bundled { name, ext }, seconds, None).await?
        }
        Command::List => {}
    }

    print_playbacks(&state.store.playbacks());
    Ok(())
}

async fn play(state: &AppState, source: MediaSource, seconds: u64, from: Option<f64>) -> Result<()> {
    {
        let mut controller = state.controller.lock();
        let filename = controller
            .load_media(&source)
            .with_context(|| format!("Failed to load {}", source))?;

        match from {
            Some(position) => {
                controller.seek(position, &filename)?;
            }
            None if state.settings.resume_on_load => {
                controller.resume_saved()?;
            }
            None => {}
        }
        controller.pump();
        controller.play()?;
    }

    let tick = Duration::from_millis(state.settings.position_tick_ms.max(10));
    let mut ticker = tokio::time::interval(tick);
    let deadline = Instant::now() + Duration::from_secs(seconds);
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    while Instant::now() < deadline {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = &mut ctrl_c => {
                log::info!("Interrupted");
                break;
            }
        }

        let mut controller = state.controller.lock();
        controller.pump();
        if let Some(info) = controller.refresh_if_loaded()? {
            log::info!("{} {:.1}/{:.1}s", info.title, info.elapsed, info.duration);
        }
    }

    state.controller.lock().pause()?;
    Ok(())
}

fn print_playbacks(playbacks: &[Playback]) {
    if playbacks.is_empty() {
        println!("No saved positions");
        return;
    }
    for playback in playbacks {
        println!(
            "{:>10.1}s / {:>10.1}s  {}",
            playback.position, playback.duration, playback.filename
        );
    }
}
