use std::io::{BufRead, Write as _};
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand, ValueEnum};
use kubescout::config::{Config, ConfigOverrides};
use kubescout::dashboard::client::ReleasesClient;
use kubescout::dashboard::watch::{run_watch, DashboardCommand};
use kubescout::dashboard::{rows_for, DashboardState};
use kubescout::model::ComparisonResult;
use kubescout::output::csv::releases_to_csv;
use kubescout::output::json::render_json;
use kubescout::output::table::{render_dashboard, render_releases_table, render_summary};
use kubescout::ranking::{rank_by_state, SortDirection, SortKey, SortState};
use kubescout::scout::{DriftSummary, Scout};
use kubescout::server::{run_server, RequestLogPolicy};
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
    Csv,
}

#[derive(Debug, Parser)]
#[command(
    name = "kubescout",
    about = "Compare deployed Helm releases with their latest upstream charts"
)]
struct Cli {
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Table, global = true)]
    output: OutputFormat,
    /// status, release or namespace. Omit to keep listing order.
    #[arg(short, long, global = true)]
    sort: Option<SortKey>,
    #[arg(long, requires = "sort", global = true)]
    desc: bool,
    /// Read releases from a JSON file instead of running helm.
    #[arg(long = "releases-file", global = true)]
    releases_file: Option<PathBuf>,
    #[arg(long = "kube-context", global = true)]
    kube_context: Option<String>,
    #[arg(long = "log-level", global = true)]
    log_level: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Check every release once and print the result.
    Scan,
    /// Serve the releases API.
    Serve {
        #[arg(long)]
        host: Option<String>,
        #[arg(long)]
        port: Option<u16>,
    },
    /// Poll a running API and redraw the dashboard.
    Watch {
        #[arg(long)]
        api: Option<String>,
        #[arg(long)]
        interval_secs: Option<u64>,
        #[arg(long, default_value_t = 0)]
        iterations: u32,
    },
    Config {
        #[arg(long)]
        init: bool,
        #[arg(long)]
        show: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(Config::default_path);
    let mut config = Config::load(Some(&config_path))?;
    let mut overrides = ConfigOverrides {
        kube_context: cli.kube_context.clone(),
        log_level: cli.log_level.clone(),
        ..ConfigOverrides::default()
    };
    match &cli.command {
        Commands::Serve { host, port } => {
            overrides.host = host.clone();
            overrides.port = *port;
        }
        Commands::Watch { api, interval_secs, .. } => {
            overrides.api_base = api.clone();
            overrides.refresh_interval_secs = *interval_secs;
        }
        _ => {}
    }
    let level = resolve_log_level(&config, cli.log_level.as_deref());
    config.apply_overrides(overrides);
    init_tracing(&level);

    let sort = cli.sort.map(|key| {
        let direction = if cli.desc {
            SortDirection::Desc
        } else {
            SortDirection::Asc
        };
        SortState::new(key, direction)
    });

    match &cli.command {
        Commands::Config { init, show } => {
            if *init {
                Config::write_template(&config_path)?;
                println!("Wrote config template to {}", config_path.display());
            }
            if *show || !*init {
                println!("{}", render_json(&config)?);
            }
        }
        Commands::Scan => {
            let scout = Scout::from_config(&config, cli.releases_file.clone())?;
            info!("scanning {}", scout.describe());
            let results = scout.check_all().await?;
            print_results(&rank_by_state(&results, sort), sort, cli.output)?;
        }
        Commands::Serve { .. } => {
            let scout = Scout::from_config(&config, cli.releases_file.clone())?;
            run_server(
                scout,
                config.bind_address()?,
                RequestLogPolicy::from_level(&level),
            )
            .await?;
        }
        Commands::Watch { iterations, .. } => {
            let client = ReleasesClient::new(
                &config.dashboard.api_base,
                Duration::from_secs(config.upstream.timeout_secs.max(1)),
            )
            .map_err(|e| anyhow!("failed to build API client: {e}"))?;
            let interval = Duration::from_secs(config.dashboard.refresh_interval_secs.max(1));
            info!("watching {} every {}s", client.url(), interval.as_secs());
            let mut state = DashboardState::new(sort);
            run_watch(
                &client,
                &mut state,
                interval,
                *iterations,
                spawn_command_reader(),
                |state| {
                    println!("\x1B[2J\x1B[H{}", render_dashboard(state));
                    std::io::stdout().flush().ok();
                },
            )
            .await;
        }
    }

    Ok(())
}

/// `--log-level`, then `LOG_LEVEL`, then the config file. `RUST_LOG`
/// still wins inside `init_tracing`.
fn resolve_log_level(config: &Config, cli_level: Option<&str>) -> String {
    cli_level
        .map(str::to_string)
        .or_else(|| std::env::var("LOG_LEVEL").ok())
        .filter(|level| !level.trim().is_empty())
        .unwrap_or_else(|| config.logging.level.clone())
        .trim()
        .to_ascii_lowercase()
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Reads commands on a plain thread so a pending stdin read never holds
/// up runtime shutdown.
fn spawn_command_reader() -> mpsc::Receiver<DashboardCommand> {
    let (tx, rx) = mpsc::channel(8);
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else {
                break;
            };
            match line.parse::<DashboardCommand>() {
                Ok(command) => {
                    if tx.blocking_send(command).is_err() {
                        break;
                    }
                }
                Err(e) => warn!("ignoring input: {e}"),
            }
        }
    });
    rx
}

fn print_results(
    results: &[ComparisonResult],
    sort: Option<SortState>,
    format: OutputFormat,
) -> Result<()> {
    match format {
        OutputFormat::Table => {
            // Already ranked; rows keep this order.
            println!("{}", render_releases_table(&rows_for(results, None), sort));
            println!("{}", render_summary(&DriftSummary::from_results(results)));
        }
        OutputFormat::Json => println!("{}", render_json(results)?),
        OutputFormat::Csv => print!("{}", releases_to_csv(results)?),
    }
    Ok(())
}
