use clap::{Parser, Subcommand};
use color_eyre::Result;
use std::path::PathBuf;
use std::sync::Arc;

use fieldsync::probe::NetworkProbe;
use fieldsync::sync::triggers;
use fieldsync::{logging, Config, EntityType, SyncEngine};

#[derive(Parser, Debug)]
#[command(name = "fieldsync")]
#[command(about = "Inspect and maintain the offline cache and action queue")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/fieldsync/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Directory for log files (default: $XDG_DATA_HOME/fieldsync/logs)
  #[arg(long)]
  log_dir: Option<PathBuf>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Show connectivity, pending actions, last sync and cache freshness
  Status,
  /// Send queued actions to the server
  Drain,
  /// Refresh the dashboard read models
  Refresh {
    /// Attempt the network even if the probe reports offline
    #[arg(long)]
    force: bool,
  },
  /// Discard every pending action without sending it
  Discard,
  /// Keep draining on the configured interval and on reconnect until Ctrl-C
  Watch,
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();

  let log_dir = match args.log_dir {
    Some(dir) => dir,
    None => logging::default_log_dir()?,
  };
  let _log_guard = logging::init(&log_dir)?;

  let config = Config::load(args.config.as_deref())?;
  let (engine, probe) = SyncEngine::open(&config)?;

  match args.command {
    Command::Status => {
      let online = probe.is_online().await;
      println!("network:      {}", if online { "online" } else { "offline" });
      println!(
        "last sync:    {}",
        engine
          .last_sync()
          .map(|t| t.to_rfc3339())
          .unwrap_or_else(|| "never".to_string())
      );

      let pending = engine.pending_actions()?;
      println!("pending:      {}", pending.len());
      for action in &pending {
        println!(
          "  {}  {:<17} {}  {}",
          action.enqueued_at.to_rfc3339(),
          action.kind.to_string(),
          action.target_id,
          action.notes.as_deref().unwrap_or("")
        );
      }

      for entity in EntityType::ALL {
        let cached = engine
          .cached_at(entity)
          .map(|t| format!("cached {}", t.to_rfc3339()))
          .unwrap_or_else(|| "no valid entry".to_string());
        println!("{:<14}{}", format!("{}:", entity.name()), cached);
      }
    }
    Command::Drain => {
      let report = engine.drain_queue().await;
      println!("sent {}, failed {}", report.success, report.failed);
    }
    Command::Refresh { force } => {
      let dashboard = engine.refresh_dashboard(force).await;
      let notifications = engine.notifications(force).await;
      println!(
        "kpis: {:?}, urgent conflicts: {} ({:?}), active tours: {} ({:?}), notifications: {} ({:?})",
        dashboard.kpis.source,
        dashboard.urgent_conflicts.data.len(),
        dashboard.urgent_conflicts.source,
        dashboard.active_tours.data.len(),
        dashboard.active_tours.source,
        notifications.data.len(),
        notifications.source,
      );
    }
    Command::Discard => {
      let count = engine.pending_count()?;
      engine.discard_pending()?;
      println!("discarded {} pending action(s)", count);
    }
    Command::Watch => {
      let engine = Arc::new(engine);
      let running = triggers::spawn_from_config(engine, &config, probe.subscribe());
      println!(
        "draining every {}s and on reconnect, Ctrl-C to stop",
        config.sync.drain_interval_secs
      );

      tokio::signal::ctrl_c().await?;
      running.abort();
    }
  }

  Ok(())
}
