//! Command-line interface definition.

use std::path::PathBuf;

use clap::Parser;

/// agendafetch - Conference agendas as structured data
#[derive(Debug, Parser)]
#[command(name = "agendafetch")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Agenda URLs or bare conference ids
    #[arg(value_name = "AGENDA", required_unless_present_any = ["category", "input"])]
    pub agendas: Vec<String>,

    /// Path to configuration file
    #[arg(long, short, env = "AGENDAFETCH_CONFIG")]
    pub config: Option<PathBuf>,

    /// Two-line file holding the API key and the secret key
    #[arg(long, env = "AGENDAFETCH_KEY_FILE")]
    pub key_file: Option<PathBuf>,

    /// Enable debug output
    #[arg(long, short = 'v')]
    pub debug: bool,

    // --- Output flags ---
    /// Dump the raw markup export instead of the normalized agenda
    #[arg(long, group = "raw")]
    pub xml: bool,

    /// Dump the raw JSON export instead of the normalized agenda
    #[arg(long, group = "raw")]
    pub json: bool,

    // --- Category listing ---
    /// List the conferences of a category URL
    #[arg(long, conflicts_with_all = ["agendas", "input"])]
    pub category: Option<String>,

    /// Days back to include in a category listing
    #[arg(long, default_value = "0", requires = "category", allow_negative_numbers = true)]
    pub days: i64,

    // --- Offline input ---
    /// Normalize a saved markup or JSON export instead of fetching
    #[arg(long, conflicts_with_all = ["agendas", "xml", "json"])]
    pub input: Option<PathBuf>,

    /// Host recorded on agendas read with --input
    #[arg(long, default_value = agendafetch_core::DEFAULT_SITE, requires = "input")]
    pub site: String,

    // --- Connection flags ---
    /// User agent sent with every request
    #[arg(long)]
    pub user_agent: Option<String>,

    /// Request timeout in seconds
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Skip TLS certificate verification
    #[arg(long)]
    pub insecure: bool,
}

/// What to print for each fetched agenda.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Normalized,
    RawMarkup,
    RawJson,
}

impl Cli {
    pub fn output_mode(&self) -> OutputMode {
        if self.xml {
            OutputMode::RawMarkup
        } else if self.json {
            OutputMode::RawJson
        } else {
            OutputMode::Normalized
        }
    }
}
