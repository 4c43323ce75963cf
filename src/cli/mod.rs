//! CLI module for CaseLink.

pub mod commands;
mod output;
pub mod preflight;

pub use output::Output;

use clap::{Parser, Subcommand};

/// CaseLink - Video incident reports and investigative Q&A
///
/// Turns crime-scene footage into written incident reports and answers follow-up
/// questions grounded in every report generated so far.
#[derive(Parser, Debug)]
#[command(name = "caselink")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true, env = "CASELINK_CONFIG")]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Analyze a video, print the incident report and add it to the index
    Report {
        /// Path to the video file (mp4, avi, mov, mkv, webm)
        video: String,

        /// PDF output file (defaults to report.output_file from config)
        #[arg(short, long)]
        output: Option<String>,

        /// Skip writing the PDF
        #[arg(long)]
        no_pdf: bool,
    },

    /// Ask a single question about the indexed reports
    Ask {
        /// The question to ask
        question: String,

        /// Chat model to use for the answer
        #[arg(short, long)]
        model: Option<String>,

        /// Number of report passages to retrieve
        #[arg(short = 'k', long)]
        top_k: Option<usize>,
    },

    /// Start an interactive investigation chat
    Chat {
        /// Chat model to use
        #[arg(short, long)]
        model: Option<String>,
    },

    /// Search indexed reports without generating an answer
    Search {
        /// Search query
        query: String,

        /// Maximum number of results
        #[arg(short, long, default_value = "5")]
        limit: usize,
    },

    /// List indexed report passages
    List,

    /// Check API keys, directories and the index
    Doctor,

    /// Start HTTP API server for integration with other systems
    Serve {
        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Port to bind to
        #[arg(short, long, default_value = "3000")]
        port: u16,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Write the current configuration to the config file
    Init,

    /// Open configuration file in editor
    Edit,

    /// Show configuration file path
    Path,
}
