//! fkinstall CLI
//!
//! Search, install, remove, and update packages through pacman or yay

use anyhow::Result;
use clap::{Parser, Subcommand};
use fkinstall::{
    AuditConfig, Backend, ChannelDispatcher, ConfigLoadOptions, ConfigLoader, DispatchEvent,
    ExecutionResult, FkConfig, Operation, OperationError, OperationKind, PackageManager,
    TerminalPrompt,
};
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing_subscriber::EnvFilter;

/// Package operations for pacman and yay
#[derive(Parser)]
#[command(name = "fkinstall")]
#[command(version)]
#[command(about = "Package operations for pacman and yay", long_about = None)]
struct Cli {
    /// Configuration directory (default: ~/.config/fkinstall)
    #[arg(long, global = true, value_name = "DIR")]
    config_dir: Option<PathBuf>,

    /// Backend used when --alternate is not given (pacman or yay)
    #[arg(long, global = true, value_parser = parse_backend)]
    backend: Option<Backend>,

    /// Audit log file (default: ~/.local/share/fkinstall.log)
    #[arg(long, global = true, value_name = "PATH")]
    audit_log: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Search the package index
    Search {
        query: String,

        /// Use the alternate backend (yay)
        #[arg(short, long)]
        alternate: bool,
    },

    /// Install a package
    Install {
        package: String,

        /// Use the alternate backend (yay)
        #[arg(short, long)]
        alternate: bool,
    },

    /// Remove a package with its dependents
    Remove { package: String },

    /// Update the whole system
    Update {
        /// Use the alternate backend (yay)
        #[arg(short, long)]
        alternate: bool,
    },

    /// Show the most recent audit log entries
    Log {
        /// Number of entries to show
        #[arg(short = 'n', long, default_value = "20")]
        lines: usize,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    match run().await {
        Ok(exit_code) => process::exit(exit_code),
        Err(e) => {
            eprintln!("\n❌ Error");
            eprintln!("{}", e);
            process::exit(1);
        }
    }
}

async fn run() -> Result<i32> {
    let cli = Cli::parse();

    let config = ConfigLoader::load(ConfigLoadOptions {
        config_dir: cli.config_dir,
        cli_args: cli_overrides(cli.backend, cli.audit_log),
        env: std::env::vars().collect(),
    })
    .await?;

    match cli.command {
        Commands::Search { query, alternate } => {
            search_command(&config, &query, pick_backend(&config, alternate)).await
        }
        Commands::Install { package, alternate } => {
            let backend = pick_backend(&config, alternate);
            operation_command(&config, Operation::install(package, backend)).await
        }
        Commands::Remove { package } => {
            operation_command(&config, Operation::remove(package)).await
        }
        Commands::Update { alternate } => {
            let backend = pick_backend(&config, alternate);
            operation_command(&config, Operation::update(backend)).await
        }
        Commands::Log { lines } => log_command(&config, lines).await,
    }
}

fn parse_backend(value: &str) -> Result<Backend, String> {
    Backend::parse(value).ok_or_else(|| format!("unknown backend '{}' (use pacman or yay)", value))
}

/// Configuration layer built from command-line flags, if any were given
fn cli_overrides(backend: Option<Backend>, audit_log: Option<PathBuf>) -> Option<FkConfig> {
    if backend.is_none() && audit_log.is_none() {
        return None;
    }

    Some(FkConfig {
        default_backend: backend,
        audit: audit_log.map(|path| AuditConfig { path: Some(path) }),
        ..Default::default()
    })
}

fn pick_backend(config: &FkConfig, alternate: bool) -> Backend {
    if alternate {
        Backend::Alternate
    } else {
        config.default_backend()
    }
}

fn build_manager(config: &FkConfig) -> (PackageManager, UnboundedReceiver<DispatchEvent>) {
    let (dispatcher, events) = ChannelDispatcher::new();
    let manager = PackageManager::new(
        config,
        Arc::new(TerminalPrompt::default()),
        Arc::new(dispatcher),
    );
    (manager, events)
}

async fn search_command(config: &FkConfig, query: &str, backend: Backend) -> Result<i32> {
    let (manager, _events) = build_manager(config);

    match manager.search(query, backend).await {
        Ok(names) if names.is_empty() => {
            println!("🔍 No packages found for '{}'", query.trim());
            Ok(0)
        }
        Ok(names) => {
            println!("🔍 {} package(s) found:\n", names.len());
            for name in names {
                println!("  {}", name);
            }
            Ok(0)
        }
        Err(e) => Ok(report_error(&e)),
    }
}

async fn operation_command(config: &FkConfig, operation: Operation) -> Result<i32> {
    let (manager, mut events) = build_manager(config);

    let handle = match manager.submit(operation.clone()).await {
        Ok(handle) => handle,
        Err(e) => return Ok(report_error(&e)),
    };

    while let Some(event) = events.recv().await {
        match event {
            DispatchEvent::Progress(true) => println!("⏳ Running {}...", operation),
            DispatchEvent::Progress(false) => break,
            DispatchEvent::Completed { .. } => {}
        }
    }

    let result = handle.wait().await;
    match &result {
        ExecutionResult::Success { .. } => {
            println!("✅ {}", confirmation(&operation));
            Ok(0)
        }
        ExecutionResult::Failure { .. } => {
            eprintln!("❌ {} failed", operation);
            eprintln!("{}", result.text().trim_end());
            Ok(1)
        }
    }
}

async fn log_command(config: &FkConfig, lines: usize) -> Result<i32> {
    let logger = fkinstall::AuditLogger::from_config(config);
    let entries = logger.tail(lines).await?;

    if entries.is_empty() {
        println!("📜 No audit entries in {}", logger.path().display());
        return Ok(0);
    }

    println!("📜 {}\n", logger.path().display());
    for entry in entries {
        println!("{}", entry);
    }
    Ok(0)
}

fn confirmation(operation: &Operation) -> String {
    let target = operation.target().unwrap_or_default();
    match operation.kind() {
        OperationKind::Install => format!("Package installed: {}", target),
        OperationKind::Remove => format!("Package removed: {}", target),
        OperationKind::Update => "System updated".to_string(),
        OperationKind::Search => "Search completed".to_string(),
    }
}

/// Print an error with its suggested actions; declined prompts stay silent
fn report_error(error: &OperationError) -> i32 {
    if error.is_user_visible() {
        eprintln!("❌ {}", error);
        for action in error.suggested_actions() {
            eprintln!("   💡 {}", action);
        }
    }
    1
}
