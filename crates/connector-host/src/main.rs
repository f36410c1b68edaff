//! BitKip connector - native messaging host for the BitKip browser extension.
//!
//! Launched by the browser with stdin/stdout connected to the extension.
//! Can also be run by hand to inspect or change the stored settings.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use connector_core::{ConfigCache, Connector, KeyValueStore, Namespace};
use connector_host::{NativeHost, Session};
use connector_storage::Database;
use directories::ProjectDirs;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// BitKip connector - hands browser downloads to the BitKip app
#[derive(Parser, Debug)]
#[command(name = "bitkip-connector", version, about, args_conflicts_with_subcommands = true)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// Settings database (default: user data directory)
    #[arg(long, global = true)]
    db_path: Option<PathBuf>,

    /// Host name of the BitKip app
    #[arg(long)]
    companion_host: Option<String>,

    /// Enable debug logging (also logs to stderr)
    #[arg(long, global = true)]
    debug: bool,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Passed by Chrome on Windows.
    #[arg(long, hide = true)]
    parent_window: Option<String>,

    /// Extension origin or manifest path appended by the browser.
    #[arg(hide = true)]
    browser_args: Vec<String>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Inspect or change the stored settings
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Print the effective settings and every stored entry
    Show,

    /// Store the BitKip app port
    SetPort {
        #[arg(value_parser = clap::value_parser!(u16).range(1..))]
        port: u16,
    },

    /// Turn download interception on or off
    SetEnabled {
        #[arg(action = clap::ArgAction::Set)]
        enabled: bool,
    },
}

/// Get the logs directory path.
fn logs_dir() -> Option<PathBuf> {
    ProjectDirs::from("com", "bitkip", "connector").map(|dirs| dirs.data_dir().join("logs"))
}

/// Initialize logging with file rotation. stdout is reserved for frames.
fn init_logging(args: &Args) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let log_level = if args.debug { "debug" } else { &args.log_level };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "bitkip_connector={0},connector_host={0},connector_core={0},connector_storage={0},warn",
            log_level
        ))
    });

    if let Some(log_dir) = logs_dir() {
        if std::fs::create_dir_all(&log_dir).is_ok() {
            let file_appender = RollingFileAppender::builder()
                .rotation(Rotation::DAILY)
                .max_log_files(5)
                .filename_prefix("connector")
                .filename_suffix("log")
                .build(&log_dir)
                .ok();

            if let Some(appender) = file_appender {
                let (non_blocking, guard) = tracing_appender::non_blocking(appender);

                if args.debug {
                    tracing_subscriber::registry()
                        .with(env_filter)
                        .with(fmt::layer().with_writer(std::io::stderr))
                        .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
                        .init();
                } else {
                    tracing_subscriber::registry()
                        .with(env_filter)
                        .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
                        .init();
                }

                tracing::info!("Logging to {:?}", log_dir);
                return Some(guard);
            }
        }
    }

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    tracing::warn!("File logging unavailable, using stderr only");
    None
}

fn open_database(args: &Args) -> anyhow::Result<Database> {
    let db = match &args.db_path {
        Some(path) => Database::with_path(path),
        None => Database::new(),
    };
    db.map_err(|e| anyhow::anyhow!("Database error: {}", e))
}

/// Renders every stored entry as `namespace.key = value (updated ...)`.
fn stored_entries(db: &Database) -> anyhow::Result<Vec<String>> {
    let mut lines = Vec::new();
    for namespace in [Namespace::Sync, Namespace::Local] {
        for entry in db.entries(namespace)? {
            lines.push(format!(
                "{}.{} = {} (updated {})",
                entry.namespace, entry.key, entry.value, entry.updated_at
            ));
        }
    }
    Ok(lines)
}

/// Handles the `config` subcommand. Output goes to stdout; the browser is not
/// attached in this mode.
async fn run_config(action: &ConfigAction, db: &Database) -> anyhow::Result<()> {
    let config = ConfigCache::hydrate(Arc::new(db.clone())).await?;

    match action {
        ConfigAction::Show => {
            for line in stored_entries(db)? {
                println!("{}", line);
            }
        }
        ConfigAction::SetPort { port } => {
            config.set_port(*port).await?;
            config.refresh_port().await?;
        }
        ConfigAction::SetEnabled { enabled } => {
            config.set_enabled(*enabled).await?;
            config.refresh_enabled().await?;
        }
    }

    println!("port: {}", config.port());
    println!("enabled: {}", config.enabled());
    Ok(())
}

/// Serves the browser on stdin/stdout until it disconnects.
async fn run_host(args: &Args, store: Arc<dyn KeyValueStore>) -> anyhow::Result<()> {
    let (host, commands) = NativeHost::new();
    let host = Arc::new(host);

    let mut builder = Connector::builder(store, host.clone());
    if let Some(companion_host) = &args.companion_host {
        builder = builder.companion_host(companion_host.clone());
    }
    let connector = builder.build().await?;

    tracing::info!(
        "Connector ready (port={}, enabled={})",
        connector.config().port(),
        connector.config().enabled()
    );

    Session::new(connector, host)
        .run(tokio::io::stdin(), tokio::io::stdout(), commands)
        .await?;
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Keep the guard alive for the duration of the program
    let _log_guard = init_logging(&args);

    tracing::info!("Starting BitKip connector...");
    tracing::debug!("Args: {:?}", args);

    let db = open_database(&args)?;

    match &args.command {
        Some(Command::Config { action }) => run_config(action, &db).await?,
        None => run_host(&args, Arc::new(db)).await?,
    }

    tracing::info!("BitKip connector shutting down");
    Ok(())
}
