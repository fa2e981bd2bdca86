//! Flowlens CLI - Command-line interface for Flowlens
//!
//! Explore the lineage of pipeline files recorded in a metadata document:
//! print neighborhoods, inspect files, or serve a live session to a
//! renderer.

use clap::{Args, Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod commands;
mod config;

#[derive(Parser)]
#[command(name = "flowlens")]
#[command(author = "Flowlens Contributors")]
#[command(version)]
#[command(about = "Explore file lineage in pipeline metadata", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Neighborhood selection shared by `view` and `export`.
#[derive(Args, Debug, Clone, Default)]
pub struct ViewArgs {
    /// Metadata document (path or http(s) URL)
    #[arg(short, long)]
    pub document: Option<String>,

    /// File id to center on (defaults to the first file)
    #[arg(short, long)]
    pub node: Option<String>,

    /// Maximum traversal depth in each direction
    #[arg(long)]
    pub depth: Option<usize>,

    /// Step whose files are left out of the neighborhood
    #[arg(long)]
    pub exclude_step: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
    Dot,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize Flowlens in a directory
    Init {
        /// Path to initialize (defaults to current directory)
        #[arg(default_value = ".")]
        path: PathBuf,
    },

    /// Show document statistics
    Info {
        /// Metadata document (path or http(s) URL)
        #[arg(short, long)]
        document: Option<String>,
    },

    /// Print the neighborhood of a file
    View {
        #[command(flatten)]
        args: ViewArgs,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Show the details of a file
    Details {
        /// File id
        id: String,

        /// Metadata document (path or http(s) URL)
        #[arg(short, long)]
        document: Option<String>,

        /// Print the HTML fragment instead of text
        #[arg(long, conflicts_with = "json")]
        html: bool,

        /// Output as JSON instead of formatted text
        #[arg(long)]
        json: bool,
    },

    /// List every file needed to produce a file
    Lineage {
        /// File id
        id: String,

        /// Metadata document (path or http(s) URL)
        #[arg(short, long)]
        document: Option<String>,
    },

    /// Export a view and its details to JSON
    Export {
        #[command(flatten)]
        args: ViewArgs,

        /// Output file
        #[arg(short, long, default_value = "flowlens-view.json")]
        output: PathBuf,
    },

    /// Start the session server
    Serve {
        /// Metadata document (path or http(s) URL)
        #[arg(short, long)]
        document: Option<String>,

        /// Port to listen on
        #[arg(short, long)]
        port: Option<u16>,

        /// Headless mode: bind to 0.0.0.0 for remote access (WSL/Docker/Server)
        #[arg(long)]
        headless: bool,

        /// Refresh when the document file changes
        #[arg(short, long)]
        watch: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Set up logging
    let level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .with(filter)
        .init();

    let result = match cli.command {
        Commands::Init { path } => commands::init(&path),
        Commands::Info { document } => commands::info(document).await,
        Commands::View { args, format } => commands::view(args, format).await,
        Commands::Details {
            id,
            document,
            html,
            json,
        } => commands::details(&id, document, html, json).await,
        Commands::Lineage { id, document } => commands::lineage(&id, document).await,
        Commands::Export { args, output } => commands::export(args, &output).await,
        Commands::Serve {
            document,
            port,
            headless,
            watch,
        } => commands::serve(document, port, headless, watch).await,
    };

    if let Err(e) = result {
        eprintln!("{} {}", "error:".red().bold(), e);
        std::process::exit(1);
    }
}
