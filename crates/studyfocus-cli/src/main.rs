//! studyfocus CLI: per-student study recommendation reports.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "studyfocus", version, about = "Study recommendations from test responses")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate score reports for one test
    Report {
        /// Response export CSV
        #[arg(long)]
        responses: PathBuf,

        /// Test the recommendations are based on
        #[arg(long)]
        test_id: String,

        /// Earlier test whose focus concepts are tracked over time
        #[arg(long)]
        last_test_id: Option<String>,

        /// Only report on this student id
        #[arg(long)]
        student: Option<u32>,

        /// Output directory (overrides config)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Output format: html, json, all
        #[arg(long, default_value = "html")]
        format: String,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Print concept weights
    Weights {
        /// Response export CSV
        #[arg(long)]
        responses: PathBuf,

        /// Restrict to one subject
        #[arg(long)]
        subject: Option<String>,

        /// Write an SVG chart of the heaviest concepts to this path
        #[arg(long, requires = "subject")]
        chart: Option<PathBuf>,

        /// Concepts shown in the chart
        #[arg(long, default_value = "10")]
        top: usize,

        /// Output format: text, json
        #[arg(long, default_value = "text")]
        format: String,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Print class averages, pass rates, and most-missed concepts
    Class {
        /// Response export CSV
        #[arg(long)]
        responses: PathBuf,

        /// Restrict to one test
        #[arg(long)]
        test_id: Option<String>,

        /// Restrict to one subject
        #[arg(long)]
        subject: Option<String>,

        /// Most-missed rows shown
        #[arg(long, default_value = "10")]
        top: usize,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Load a response export and report data quality
    Validate {
        /// Response export CSV
        #[arg(long)]
        responses: PathBuf,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Create a starter config
    Init,
}

fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("studyfocus=info")),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Report {
            responses,
            test_id,
            last_test_id,
            student,
            output,
            format,
            config,
        } => commands::report::execute(
            responses,
            test_id,
            last_test_id,
            student,
            output,
            format,
            config,
        ),
        Commands::Weights {
            responses,
            subject,
            chart,
            top,
            format,
            config,
        } => commands::weights::execute(responses, subject, chart, top, format, config),
        Commands::Class {
            responses,
            test_id,
            subject,
            top,
            config,
        } => commands::class::execute(responses, test_id, subject, top, config),
        Commands::Validate { responses, config } => commands::validate::execute(responses, config),
        Commands::Init => commands::init::execute(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
