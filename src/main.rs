//! SERPENT: live roulette feed monitor with pattern-trend signals.
//!
//! Entry point. Loads configuration, initialises structured logging,
//! wires the feed client and notifier, and runs one polling loop per
//! configured table until Ctrl+C. `serpent replay <spins.json>` runs
//! the same strategy over recorded spins instead.

use anyhow::{Context, Result};
use secrecy::SecretString;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{error, info, warn};

use serpent::alerts::telegram::TelegramNotifier;
use serpent::alerts::{LogNotifier, Notifier};
use serpent::backtest::{self, replay::Replayer};
use serpent::config::AppConfig;
use serpent::dashboard::{self, routes::DashboardState};
use serpent::engine::clock::{Clock, SystemClock};
use serpent::engine::monitor::TableMonitor;
use serpent::engine::spawn_monitors;
use serpent::feed::playtech::PlaytechFeed;
use serpent::feed::FeedClient;

const BANNER: &str = r#"
 ____  _____ ____  ____  _____ _   _ _____
/ ___|| ____|  _ \|  _ \| ____| \ | |_   _|
\___ \|  _| | |_) | |_) |  _| |  \| | | |
 ___) | |___|  _ <|  __/| |___| |\  | | |
|____/|_____|_| \_\_|   |_____|_| \_| |_|

  Live roulette feed monitor
  v0.1.0
"#;

const CONFIG_PATH: &str = "config.toml";

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    let cfg = AppConfig::load(CONFIG_PATH)?;

    init_logging();

    let args: Vec<String> = std::env::args().skip(1).collect();
    match args.first().map(String::as_str) {
        Some("replay") => {
            let path = args.get(1).context("usage: serpent replay <spins.json>")?;
            return run_replay(&cfg, path);
        }
        Some(other) => anyhow::bail!("unknown command: {other}"),
        None => {}
    }

    println!("{BANNER}");
    info!(
        tables = ?cfg.monitor.tables,
        pattern = %cfg.pattern.name,
        min_history = cfg.monitor.min_history,
        poll_interval_secs = cfg.monitor.poll_interval_secs,
        "SERPENT starting up"
    );

    // -- Initialise components -------------------------------------------

    let feed: Arc<dyn FeedClient> =
        Arc::new(PlaytechFeed::new(cfg.monitor.feed_url.clone(), cfg.request_timeout())?);
    let notifier = build_notifier(&cfg)?;
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let pattern = cfg.pattern_set()?;

    let monitors: Vec<TableMonitor> = cfg
        .monitor
        .tables
        .iter()
        .map(|table| {
            TableMonitor::new(
                table.clone(),
                feed.clone(),
                notifier.clone(),
                clock.clone(),
                pattern.clone(),
                cfg.trend_config(),
                cfg.monitor_settings(),
            )
        })
        .collect();

    if cfg.dashboard.enabled {
        let receivers: BTreeMap<String, _> = monitors
            .iter()
            .map(|m| (m.table().to_string(), m.subscribe()))
            .collect();
        dashboard::spawn_dashboard(Arc::new(DashboardState::new(receivers)), cfg.dashboard.port);
    }

    // -- Main loop -------------------------------------------------------

    let handles = spawn_monitors(monitors);
    let aborts: Vec<_> = handles.iter().map(|h| h.abort_handle()).collect();

    info!("Monitors running. Press Ctrl+C to stop.");

    tokio::select! {
        results = futures::future::join_all(handles) => {
            for result in results {
                if let Err(e) = result {
                    error!(error = %e, "Monitor task ended unexpectedly");
                }
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received.");
        }
    }

    for abort in aborts {
        abort.abort();
    }
    info!("SERPENT shut down cleanly.");

    Ok(())
}

/// Telegram when both credentials resolve, otherwise log-only.
fn build_notifier(cfg: &AppConfig) -> Result<Arc<dyn Notifier>> {
    let resolve = |env: &Option<String>| {
        env.as_deref()
            .and_then(|name| AppConfig::resolve_env(name).ok())
            .filter(|value| !value.is_empty())
    };

    match (
        resolve(&cfg.alerts.telegram_bot_token_env),
        resolve(&cfg.alerts.telegram_chat_id_env),
    ) {
        (Some(token), Some(chat_id)) => {
            info!("Telegram notifications enabled");
            let notifier = TelegramNotifier::new(
                SecretString::new(token),
                chat_id,
                cfg.alerts.telegram_api_base.clone(),
                cfg.alerts.table_link.clone(),
            )?;
            Ok(Arc::new(notifier))
        }
        _ => {
            warn!("No Telegram credentials configured, notifications go to the log only");
            Ok(Arc::new(LogNotifier))
        }
    }
}

/// Replay recorded spins through the strategy and print a JSON summary.
fn run_replay(cfg: &AppConfig, path: &str) -> Result<()> {
    let spins = backtest::load_spins(path)?;
    let replayer = Replayer::new(
        cfg.pattern_set()?,
        cfg.trend_config(),
        cfg.monitor.history_capacity,
        cfg.monitor.min_history,
    );

    info!(path, spins = spins.len(), "Replaying recorded spins");
    let report = replayer.run(&spins);
    for (index, transition) in &report.transitions {
        info!(spin = index, ?transition, "Replay transition");
    }

    println!("{}", serde_json::to_string_pretty(&report.summary())?);
    Ok(())
}

/// Initialise the `tracing` subscriber.
fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("serpent=info"));

    let json_logging = std::env::var("SERPENT_LOG_JSON").is_ok();

    if json_logging {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_thread_ids(true)
            .init();
    } else {
        fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    }
}
