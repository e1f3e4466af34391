mod cmd_format;
mod cmd_overlay;
mod cmd_unused;
mod config;
mod io;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "oaformat")]
#[command(about = "Filter, overlay, sort, and re-case OpenAPI documents")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Pretty-print JSON output
    #[arg(long, global = true)]
    pretty: bool,

    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the filter, overlay, sort, and casing pipeline
    Format(cmd_format::FormatArgs),
    /// Apply an overlay document
    Overlay {
        /// Input document (use - for stdin)
        input: String,

        /// Overlay document with update/remove actions
        #[arg(long)]
        overlay_file: PathBuf,

        /// Write the result here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Print applied and unused actions to stderr
        #[arg(long)]
        report: bool,
    },
    /// Report components that nothing references
    Unused {
        /// Input document (use - for stdin)
        input: String,

        /// Component categories to check (default: all)
        #[arg(long, value_delimiter = ',')]
        categories: Vec<String>,
    },
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Format(args) => cmd_format::run(args, cli.pretty),
        Commands::Overlay {
            input,
            overlay_file,
            output,
            report,
        } => cmd_overlay::run(input, overlay_file, output, report, cli.pretty),
        Commands::Unused { input, categories } => {
            cmd_unused::run(input, categories, cli.pretty)
        }
    }
}
