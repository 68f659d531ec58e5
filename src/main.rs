use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use niward::config::Config;
use niward::monitor::Monitor;
use niward::platform::WebhookPlatform;
use niward::presentation::TemplatePresenter;
use niward::probe::{FallbackResolver, FallbackSource, NoFallback, ProbeClient};
use niward::stats::StatsStore;
use niward::storage::{JsonFileStore, Registrations};
use niward::utils::format_duration;

#[derive(Parser)]
#[command(
    name = "niward",
    version,
    about = "Game server status monitor with live status messages and transition alerts",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to a TOML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log format (text, json); overrides the config file
    #[arg(long, global = true)]
    log_format: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the reconciliation loop until interrupted
    Run,

    /// Reconcile one owner's endpoint now
    Check {
        /// Owner id of the registration
        owner: String,
    },

    /// Print uptime statistics
    Stats {
        /// Only show this owner's endpoint
        owner: Option<String>,

        /// Print as JSON
        #[arg(long, default_value = "false")]
        json: bool,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => {
            let mut config = Config::from_file(path)?;
            config.apply_env();
            config
        }
        None => Config::from_env()?,
    };
    if let Some(format) = &cli.log_format {
        config.logging.format = format.clone();
    }
    config.validate().context("Invalid configuration")?;

    setup_tracing(&config.logging.level, &config.logging.format, cli.verbose)?;

    tracing::info!("niward starting");

    match cli.command {
        Commands::Run => run(&config).await?,
        Commands::Check { owner } => check(&config, &owner).await?,
        Commands::Stats { owner, json } => stats(&config, owner.as_deref(), json)?,
    }

    Ok(())
}

fn setup_tracing(level: &str, format: &str, verbose: bool) -> Result<()> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            tracing_subscriber::EnvFilter::new("niward=debug,info")
        } else {
            tracing_subscriber::EnvFilter::new(format!("niward={level},warn"))
        }
    });

    match format {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .try_init()?;
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .try_init()?;
        }
    }

    Ok(())
}

fn build_monitor(config: &Config) -> Result<Monitor> {
    // No native query backend ships with the binary; the aggregator answers.
    let probe = ProbeClient::without_backend(config.probe_timeout());

    let fallback: Arc<dyn FallbackSource> = if config.fallback.enabled {
        Arc::new(
            FallbackResolver::with_base_url(&config.fallback.base_url, config.fallback_timeout())
                .context("Failed to create fallback resolver")?,
        )
    } else {
        tracing::warn!("Fallback resolver disabled; every endpoint will read as offline");
        Arc::new(NoFallback)
    };

    let platform =
        Arc::new(WebhookPlatform::new(config.webhook()).context("Failed to create webhook client")?);
    let presenter = Arc::new(TemplatePresenter::new().context("Failed to compile templates")?);

    let monitor = Monitor::new(
        probe,
        fallback,
        platform,
        presenter,
        JsonFileStore::new(&config.storage.registrations_path),
        JsonFileStore::new(&config.storage.statistics_path),
    )
    .with_interval(config.tick_interval())
    .with_endpoint_delay(config.endpoint_delay())
    .with_cache_ttl(config.cache_ttl())
    .with_alert_channel(config.platform.alert_channel.clone());

    Ok(monitor)
}

async fn run(config: &Config) -> Result<()> {
    let monitor = build_monitor(config)?;
    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);

    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                tracing::info!("Interrupt received");
                let _ = shutdown_tx.send(true);
            }
            Err(e) => tracing::error!(error = %e, "Failed to listen for interrupt"),
        }
    });

    monitor.run(shutdown_rx).await;
    Ok(())
}

async fn check(config: &Config, owner: &str) -> Result<()> {
    let monitor = build_monitor(config)?;

    match monitor.reconcile_owner(owner).await? {
        Some(report) => {
            println!("{} → {}", report.key, report.state.label());
            if let Some((from, to)) = report.transition {
                println!("  changed: {} → {}", from.label(), to.label());
            }
            println!("  message: {:?}", report.message);
        }
        None => println!("Owner {owner} has no status channel configured"),
    }

    Ok(())
}

fn stats(config: &Config, owner: Option<&str>, json: bool) -> Result<()> {
    let registrations: Registrations =
        JsonFileStore::new(&config.storage.registrations_path).load_or_default();
    let store: StatsStore = JsonFileStore::new(&config.storage.statistics_path).load_or_default();
    let now = chrono::Utc::now();

    let keys: Vec<_> = match owner {
        Some(owner) => {
            let registration = registrations
                .get(owner)
                .with_context(|| format!("No endpoint registered for owner {owner}"))?;
            vec![registration.key()]
        }
        None => store.keys().cloned().collect(),
    };

    let summaries: Vec<_> = keys
        .iter()
        .filter_map(|key| store.summary(key, now))
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&summaries)?);
        return Ok(());
    }

    if summaries.is_empty() {
        println!("No statistics recorded yet");
    }

    for s in &summaries {
        println!("{}", s.key);
        println!("  checks:          {}", s.total_checks);
        println!("  uptime:          {:.1}%", s.uptime_percent);
        println!("  average players: {:.1}", s.average_players);
        println!("  peak players:    {}", s.max_players_seen);
        if let Some(secs) = s.current_session_secs {
            println!(
                "  current session: {}",
                format_duration(chrono::Duration::seconds(secs))
            );
        }
        println!(
            "  longest uptime:  {}",
            format_duration(chrono::Duration::seconds(s.longest_uptime_secs))
        );
        for t in &s.recent_transitions {
            println!(
                "    {} {} → {}",
                t.at.format("%Y-%m-%d %H:%M:%S"),
                t.from.label(),
                t.to.label()
            );
        }
    }

    Ok(())
}
