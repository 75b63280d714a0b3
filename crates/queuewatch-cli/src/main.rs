use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use queuewatch_core::Visibility;
use queuewatch_engine::{
    config_path, sounds, Config, DesktopSurface, FilePreferenceStore, HttpSource,
    MemoryPreferenceStore, Monitor, MonitorHandle, PreferenceStore, QueueSource,
};

mod control;

use control::{parse_control, Control, HELP};

#[derive(Parser)]
#[command(name = "queuewatch", version, about = "Watch a ticket queue and alert on new items")]
struct Cli {
    /// Config file. Defaults to ./queuewatch.toml
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Write a default config file
    Init {
        /// Queue view endpoint, e.g. https://example.zendesk.com/api/v2/views/123/tickets.json
        #[arg(long)]
        url: String,
        /// Overwrite an existing config
        #[arg(long)]
        force: bool,
    },

    /// Monitor the queue until ctrl-c or `quit`
    Run {
        /// Override the configured source URL
        #[arg(long)]
        url: Option<String>,
    },

    /// Fetch the queue once and print the item ids
    Check {
        #[arg(long)]
        url: Option<String>,
    },

    /// List the available alert sounds
    Sounds {
        /// Play this sound through the configured player
        #[arg(long)]
        play: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let path = match cli.config {
        Some(p) => p,
        None => config_path(&std::env::current_dir()?),
    };

    match cli.cmd {
        Command::Init { url, force } => {
            if path.exists() && !force {
                bail!("{} already exists (use --force to overwrite)", path.display());
            }
            Config::default_for_url(&url).save_to(&path)?;
            println!("Wrote {}", path.display());
        }
        Command::Run { url } => {
            let cfg = load_config(&path, url)?;
            run(cfg).await?;
        }
        Command::Check { url } => {
            let cfg = load_config(&path, url)?;
            let source = HttpSource::new(&cfg.source, cfg.engine.fetch_timeout())?;
            let snapshot = source
                .fetch()
                .await
                .with_context(|| format!("fetch {}", cfg.source.url))?;
            println!("{} item(s)", snapshot.len());
            for id in snapshot.iter() {
                println!("#{id}");
            }
        }
        Command::Sounds { play } => {
            let alerts = Config::load_from(&path)
                .map(|c| c.alerts)
                .unwrap_or_default();
            if let Some(key) = play {
                let Some(sound) = sounds::find(&key) else {
                    bail!("unknown alert sound {key:?}");
                };
                let player = alerts.player.clone();
                let surface = DesktopSurface::new(alerts, &MemoryPreferenceStore::default());
                surface.play_sound(sound)?;
                println!("Playing {} via {player}", sound.name);
                return Ok(());
            }
            let base = alerts.sound_base_url;
            for sound in sounds::SOUNDS {
                let marker = if sound.key == sounds::DEFAULT_SOUND { " (default)" } else { "" };
                println!("{:<14} {}{}  {}", sound.key, sound.name, marker, sound.url(&base));
            }
        }
    }

    Ok(())
}

/// Load the config file; with `--url` a missing file falls back to defaults.
fn load_config(path: &std::path::Path, url: Option<String>) -> Result<Config> {
    let mut cfg = match url.as_deref() {
        Some(url) if !path.exists() => Config::default_for_url(url),
        _ => Config::load_from(path)?,
    };
    if let Some(url) = url {
        cfg.source.url = url;
    }
    cfg.validate()?;
    Ok(cfg)
}

async fn run(cfg: Config) -> Result<()> {
    let store = FilePreferenceStore::new(cfg.preferences_path());
    info!(path = %store.path().display(), "using preferences file");
    let prefs: Arc<dyn PreferenceStore> = Arc::new(store);
    let source = Arc::new(HttpSource::new(&cfg.source, cfg.engine.fetch_timeout())?);
    let surface = Arc::new(DesktopSurface::new(cfg.alerts.clone(), prefs.as_ref()));
    let mut monitor = Monitor::new(cfg.engine.clone(), source, surface.clone(), prefs)?;
    let handle = monitor.start()?;
    info!(url = %cfg.source.url, "monitoring queue; {HELP}");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    loop {
        tokio::select! {
            res = tokio::signal::ctrl_c() => {
                res.context("listen for ctrl-c")?;
                info!("ctrl-c received");
                break;
            }
            line = lines.next_line(), if stdin_open => {
                let Some(line) = line.context("read stdin")? else {
                    stdin_open = false;
                    continue;
                };
                match parse_control(&line) {
                    Ok(Some(Control::Quit)) => break,
                    Ok(Some(control)) => {
                        if let Err(e) = apply(&handle, &surface, control).await {
                            warn!("{e:#}");
                        }
                    }
                    Ok(None) => {}
                    Err(e) => warn!("{e}"),
                }
            }
        }
    }

    monitor.stop().await;
    Ok(())
}

async fn apply(
    handle: &MonitorHandle,
    surface: &DesktopSurface,
    control: Control,
) -> Result<()> {
    match control {
        Control::Foreground => handle.set_visibility(Visibility::Foreground)?,
        Control::Background => handle.set_visibility(Visibility::Background)?,
        Control::Mute => handle.set_muted(true)?,
        Control::Unmute => handle.set_muted(false)?,
        Control::Busy => handle.set_external_suppression(true)?,
        Control::Free => handle.set_external_suppression(false)?,
        Control::Sound(key) => {
            let sound = handle.select_sound(&key)?;
            println!("alert sound: {}", sound.name);
        }
        Control::Test => {
            let sound = surface.selected_sound();
            surface.play_sound(sound)?;
            println!("test alert: {}", sound.name);
        }
        Control::Status => {
            let status = handle.status().await?;
            println!("{}", serde_json::to_string_pretty(&status)?);
        }
        Control::Quit => {}
    }
    Ok(())
}
