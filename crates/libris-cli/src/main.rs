//! Libris CLI - library circulation client
//!
//! Manage the catalog, borrowers and loans of a library REST API from the
//! terminal, import CSV inventories and export circulation reports.

mod commands;
mod output;

use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};
use libris_core::AppConfig;

#[derive(Parser)]
#[command(name = "libris")]
#[command(author, version, about = "Library circulation CLI", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format: table (default) or json
    #[arg(long, global = true, default_value = "table")]
    format: output::OutputFormat,

    /// Suppress progress messages
    #[arg(long, short, global = true)]
    quiet: bool,

    /// More log output (-v info, -vv debug); RUST_LOG takes precedence
    #[arg(long, short, global = true, action = ArgAction::Count)]
    verbose: u8,

    /// Library API base URL (or set LIBRIS_API_URL)
    #[arg(long, env = "LIBRIS_API_URL", global = true)]
    api_url: Option<String>,

    /// API bearer token (or set LIBRIS_TOKEN)
    #[arg(long, env = "LIBRIS_TOKEN", global = true, hide_env_values = true)]
    token: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage the book catalog
    Books {
        #[command(subcommand)]
        action: commands::books::BooksAction,
    },

    /// Manage students
    Students {
        #[command(subcommand)]
        action: commands::students::StudentsAction,
    },

    /// Manage staff borrowers
    Staff {
        #[command(subcommand)]
        action: commands::staff::StaffAction,
    },

    /// Borrow, return, renew and pay fines
    Borrow {
        #[command(subcommand)]
        action: commands::borrow::BorrowAction,
    },

    /// Circulation reports
    Report {
        #[command(subcommand)]
        action: commands::report::ReportAction,
    },

    /// Dashboard statistics
    Dashboard(commands::dashboard::DashboardArgs),

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },

    /// Recent actions taken from this machine
    Activity {
        #[command(subcommand)]
        action: commands::activity::ActivityAction,
    },

    /// Check for and apply updates
    Update {
        #[command(subcommand)]
        action: commands::update::UpdateAction,
    },
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    // Config commands read the file themselves so a broken file can be repaired
    if let Commands::Config { action } = cli.command {
        return commands::config::execute(action, cli.format, cli.quiet);
    }

    let config = AppConfig::load()?.with_overrides(cli.api_url, cli.token);

    let ctx = commands::Context {
        config,
        format: cli.format,
        quiet: cli.quiet,
    };

    match cli.command {
        Commands::Books { action } => commands::books::execute(&ctx, action).await,
        Commands::Students { action } => commands::students::execute(&ctx, action).await,
        Commands::Staff { action } => commands::staff::execute(&ctx, action).await,
        Commands::Borrow { action } => commands::borrow::execute(&ctx, action).await,
        Commands::Report { action } => commands::report::execute(&ctx, action).await,
        Commands::Dashboard(args) => commands::dashboard::execute(&ctx, args).await,
        Commands::Config { action } => commands::config::execute(action, ctx.format, ctx.quiet),
        Commands::Activity { action } => commands::activity::execute(&ctx, action).await,
        Commands::Update { action } => commands::update::execute(&ctx, action).await,
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli).await {
        output::print_error(&format!("Error: {:#}", e));
        std::process::exit(1);
    }
}
