//! NomadPost - travel persona blog daemon
//!
//! CLI entry point for running cycles and inspecting the journey.

use std::fs;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;
use std::sync::Arc;

use chrono::Local;
use clap::Parser;
use colored::Colorize;
use eyre::{Context, Result, bail};
use tracing::{debug, info, warn};

use nomadpost::cli::{Cli, Command, SettingsCommand, get_log_path};
use nomadpost::config::{Config, validate_setting};
use nomadpost::cycle::{DecisionInput, build_runner, decide};
use nomadpost::daemon::Daemon;
use nomadpost::state::StateManager;
use placestore::{PoiKind, StoreLock};

fn setup_logging(cli_log_level: Option<&str>, config_log_level: Option<&str>) -> Result<()> {
    // Note: Can't log params here since logging isn't initialized yet
    let log_path = get_log_path();
    if let Some(log_dir) = log_path.parent() {
        fs::create_dir_all(log_dir).context("Failed to create log directory")?;
    }

    // Determine log level with priority: CLI --log-level > config file > default (INFO)
    let level = match cli_log_level.or(config_log_level) {
        Some(s) => match s.to_uppercase().as_str() {
            "TRACE" => tracing::Level::TRACE,
            "DEBUG" => tracing::Level::DEBUG,
            "INFO" => tracing::Level::INFO,
            "WARN" | "WARNING" => tracing::Level::WARN,
            "ERROR" => tracing::Level::ERROR,
            _ => {
                eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", s);
                tracing::Level::INFO
            }
        },
        None => tracing::Level::INFO,
    };

    let log_file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .context("Failed to open log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (level: {:?})", level);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load log level from config file early (before full config load)
    let config_log_level = Config::load_log_level(cli.config.as_ref());

    // Setup logging with priority: CLI > config > INFO default
    setup_logging(cli.log_level.as_deref(), config_log_level.as_deref()).context("Failed to setup logging")?;

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    info!(
        provider = %config.llm.provider,
        publisher = ?config.publisher.kind,
        store = %config.storage.placestore_dir,
        "NomadPost loaded config"
    );

    debug!(command = ?cli.command, "main: dispatching command");
    match cli.command {
        Command::Run => cmd_run(config).await,
        Command::Cycle { date } => cmd_cycle(config, date).await,
        Command::Status => cmd_status(&config).await,
        Command::Journey => cmd_journey(&config).await,
        Command::Posts { limit } => cmd_posts(&config, limit).await,
        Command::Settings { command } => cmd_settings(&config, command).await,
        Command::Logs { follow, lines } => cmd_logs(follow, lines),
    }
}

fn store_dir(config: &Config) -> PathBuf {
    PathBuf::from(&config.storage.placestore_dir)
}

fn open_state(config: &Config) -> Result<StateManager> {
    StateManager::spawn(store_dir(config)).context("Failed to open place store")
}

/// Run cycles on schedule until SIGINT/SIGTERM
async fn cmd_run(config: Config) -> Result<()> {
    debug!("cmd_run: called");
    config.validate()?;
    let lock = StoreLock::acquire(store_dir(&config))?;
    let state = open_state(&config)?;
    let runner = build_runner(Arc::new(config), state)?;
    let daemon = Daemon::new(runner, lock);

    let (shutdown_tx, shutdown_rx) = tokio::sync::mpsc::channel::<()>(1);
    tokio::spawn(async move {
        wait_for_signal().await;
        let _ = shutdown_tx.send(()).await;
    });

    println!("NomadPost running. Press Ctrl+C to stop.");
    daemon.run(shutdown_rx).await?;
    println!("NomadPost stopped.");
    Ok(())
}

async fn wait_for_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        match (signal(SignalKind::interrupt()), signal(SignalKind::terminate())) {
            (Ok(mut sigint), Ok(mut sigterm)) => {
                tokio::select! {
                    _ = sigint.recv() => warn!("SIGINT received"),
                    _ = sigterm.recv() => warn!("SIGTERM received"),
                }
                return;
            }
            _ => warn!("Failed to install signal handlers, falling back to ctrl_c"),
        }
    }

    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "ctrl_c handler failed");
    }
}

/// Run exactly one cycle
async fn cmd_cycle(config: Config, date: Option<chrono::NaiveDate>) -> Result<()> {
    debug!(?date, "cmd_cycle: called");
    config.validate()?;
    let _lock = StoreLock::acquire(store_dir(&config))?;
    let state = open_state(&config)?;
    let runner = build_runner(Arc::new(config), state.clone())?;

    let date = date.unwrap_or_else(|| Local::now().date_naive());
    let result = runner.run(date).await;
    let _ = state.shutdown().await;

    let outcome = result.context("Cycle failed")?;
    if outcome.started_journey {
        println!("{} {}", "Journey started in".green(), outcome.location.name.bold());
    }
    println!(
        "{} {} post for {}, {} (day {})",
        "Published".green().bold(),
        outcome.kind,
        outcome.location.name.bold(),
        outcome.location.country,
        outcome.location.current_day
    );
    println!("  {}", outcome.post.title);
    println!("  {}", outcome.post.url.dimmed());
    Ok(())
}

/// Show where the persona is and whether the next cycle moves
async fn cmd_status(config: &Config) -> Result<()> {
    debug!("cmd_status: called");
    let state = open_state(config)?;
    let settings = state.list_settings().await?;
    let tunables = config.tunables(&settings)?;

    let Some(location) = state.current_location().await? else {
        println!("{}", "No journey yet. Run `np cycle` to start one.".yellow());
        return Ok(());
    };

    let attractions = state.count_available(location.id, PoiKind::Attraction).await?;
    let restaurants = state.count_available(location.id, PoiKind::Restaurant).await?;
    let decision = decide(DecisionInput::for_location(
        &location,
        tunables.min_days,
        tunables.max_days,
        attractions,
    ));

    println!("{} {}, {}", "Current:".bold(), location.name.bold(), location.country);
    if !location.region.is_empty() {
        println!("  Region:       {}", location.region);
    }
    println!("  Arrived:      {}", location.planned_arrival);
    println!(
        "  Day:          {} of {} planned (max {})",
        location.current_day, location.planned_duration, tunables.max_days
    );
    println!("  Available:    {} attractions, {} restaurants", attractions, restaurants);
    println!(
        "  Locale:       {} / {} / {}",
        location.locale.timezone, location.locale.currency, location.locale.language
    );
    match decision {
        nomadpost::Decision::Stay => println!("  Next cycle:   {}", "stay".green()),
        nomadpost::Decision::Move(reasons) => {
            let reasons: Vec<&str> = reasons.iter().map(|r| r.as_str()).collect();
            println!("  Next cycle:   {} ({})", "move".yellow(), reasons.join(", "));
        }
    }
    println!("  Schedule:     {}", tunables.schedule);
    let _ = state.shutdown().await;
    Ok(())
}

/// Print the itinerary with the leg into each stop
async fn cmd_journey(config: &Config) -> Result<()> {
    debug!("cmd_journey: called");
    let state = open_state(config)?;
    let locations = state.list_locations().await?;
    let legs = state.list_legs().await?;

    if locations.is_empty() {
        println!("{}", "No journey yet.".yellow());
        return Ok(());
    }

    for location in &locations {
        if let Some(leg) = legs.iter().find(|l| l.to_location_id == location.id) {
            println!(
                "     {} {} km by {}, {}h{:02}m, €{:.2}",
                "↓".dimmed(),
                leg.distance_km,
                leg.mode,
                leg.duration_minutes / 60,
                leg.duration_minutes % 60,
                leg.price_eur
            );
        }
        let marker = if location.is_current { "▶".green().bold() } else { " ".normal() };
        let days = if location.is_current {
            format!("day {} of {}", location.current_day, location.planned_duration)
        } else {
            format!("{} days", location.current_day.saturating_sub(1))
        };
        println!(
            "{} {:>3}. {}, {} ({}, from {})",
            marker,
            location.order_in_journey,
            location.name.bold(),
            location.country,
            days,
            location.planned_arrival
        );
    }
    let _ = state.shutdown().await;
    Ok(())
}

/// Print the publication log
async fn cmd_posts(config: &Config, limit: usize) -> Result<()> {
    debug!(limit, "cmd_posts: called");
    let state = open_state(config)?;
    let posts = state.list_posts(limit).await?;
    if posts.is_empty() {
        println!("{}", "No posts published yet.".yellow());
    }
    for post in posts {
        println!(
            "{} {:<6} {}\n           {}",
            post.post_date,
            post.kind.to_string().cyan(),
            post.title.bold(),
            post.url.dimmed()
        );
    }
    let _ = state.shutdown().await;
    Ok(())
}

async fn cmd_settings(config: &Config, command: SettingsCommand) -> Result<()> {
    debug!(?command, "cmd_settings: called");
    let state = open_state(config)?;
    match command {
        SettingsCommand::List => {
            let settings = state.list_settings().await?;
            if settings.is_empty() {
                println!("No settings stored; config values apply.");
            }
            for setting in settings {
                println!("{} = {}", setting.key.bold(), setting.value);
            }
        }
        SettingsCommand::Get { key } => match state.get_setting(&key).await? {
            Some(value) => println!("{}", value),
            None => bail!("Setting '{}' is not stored", key),
        },
        SettingsCommand::Set { key, value } => {
            validate_setting(&key, &value)?;
            let mut settings = state.list_settings().await?;
            settings.retain(|s| s.key != key);
            settings.push(placestore::Setting {
                key: key.clone(),
                value: value.clone(),
                updated_at: 0,
            });
            config
                .tunables(&settings)
                .context(format!("Refusing to store {}={}", key, value))?;
            state.set_setting(&key, value.trim()).await?;
            println!("{} {} = {}", "Stored".green(), key.bold(), value.trim());
        }
        SettingsCommand::Unset { key } => {
            if state.delete_setting(&key).await? {
                println!("{} {}", "Removed".green(), key.bold());
            } else {
                println!("Setting '{}' was not stored", key);
            }
        }
    }
    let _ = state.shutdown().await;
    Ok(())
}

/// Show logs
fn cmd_logs(follow: bool, lines: usize) -> Result<()> {
    debug!(follow, lines, "cmd_logs: called");
    let log_path = get_log_path();

    if !log_path.exists() {
        debug!(?log_path, "cmd_logs: log file does not exist");
        println!("No log file found at: {}", log_path.display());
        return Ok(());
    }

    if follow {
        debug!(?log_path, "cmd_logs: following log file");
        println!("Following log file: {} (Ctrl+C to stop)", log_path.display());
        println!();

        // Use tail -f for following
        let mut child = std::process::Command::new("tail")
            .args(["-f", "-n", &lines.to_string()])
            .arg(&log_path)
            .spawn()
            .context("Failed to run tail -f")?;

        child.wait()?;
    } else {
        debug!(?log_path, lines, "cmd_logs: reading last N lines");
        let file = fs::File::open(&log_path).context("Failed to open log file")?;
        let reader = BufReader::new(file);
        let all_lines: Vec<String> = reader.lines().map_while(Result::ok).collect();

        let start = all_lines.len().saturating_sub(lines);
        for line in &all_lines[start..] {
            println!("{}", line);
        }
    }

    Ok(())
}
