//! Slidecast CLI: turn a slide deck into a narrated video.
//!
//! Usage:
//!   slidecast convert <FILE>     Convert a .pptx/.ppt/.pdf into an MP4
//!   slidecast segment <FILE>     Show how narration text would be split
//!   slidecast probe <AUDIO>      Print the duration of an audio file
//!   slidecast config             Print the effective configuration
//!   slidecast check              Check external tools

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "slidecast",
    about = "Convert slide decks into narrated videos",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert a document into a narrated MP4
    Convert {
        /// Source document (.pptx, .ppt or .pdf)
        file: PathBuf,

        /// Where to copy the finished video
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Voice identifier passed to the speech backend
        #[arg(long)]
        voice: Option<String>,

        /// Concurrent slide workers
        #[arg(long)]
        workers: Option<usize>,

        /// Status poll interval (milliseconds)
        #[arg(long, default_value = "500")]
        poll_ms: u64,
    },

    /// Split a text file the way narration would be split
    Segment {
        /// UTF-8 text file
        file: PathBuf,

        /// Maximum segment length in characters
        #[arg(long)]
        max_len: Option<usize>,
    },

    /// Measure the duration of an audio file
    Probe {
        /// Audio file
        audio: PathBuf,
    },

    /// Print the effective configuration as JSON
    Config,

    /// Check that required external tools are installed
    Check,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = slidecast_common::AppConfig::load();
    if cli.verbose {
        config.logging.level = "debug".to_string();
    }
    slidecast_common::logging::init_logging(&config.logging);

    match cli.command {
        Commands::Convert {
            file,
            output,
            voice,
            workers,
            poll_ms,
        } => commands::convert::run(config, file, output, voice, workers, poll_ms).await,
        Commands::Segment { file, max_len } => {
            let max_len = max_len.unwrap_or(config.timeline.max_segment_chars);
            commands::segment::run(file, max_len)
        }
        Commands::Probe { audio } => commands::probe::run(audio),
        Commands::Config => {
            println!("# {}", slidecast_common::config::config_file_path().display());
            println!("{}", serde_json::to_string_pretty(&config)?);
            Ok(())
        }
        Commands::Check => commands::check::run(),
    }
}
