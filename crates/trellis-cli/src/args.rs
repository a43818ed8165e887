//! Command-line argument definitions for the Trellis CLI.
//!
//! [`Args`] is parsed with [`clap`]. Arguments select the recorded stream to
//! replay, the output path, how the stream is chunked, the configuration file
//! and logging verbosity.

use clap::Parser;

/// Command-line arguments for the Trellis stream replay tool
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to a recorded tag stream
    #[arg(help = "Path to the input stream file")]
    pub input: String,

    /// Path to the output SVG file
    #[arg(short, long, default_value = "out.svg")]
    pub output: String,

    /// Replay the input in chunks of this many bytes
    #[arg(long, default_value_t = 64)]
    pub chunk_size: usize,

    /// Path to configuration file (TOML)
    #[arg(short, long)]
    pub config: Option<String>,

    /// Exit with an error if the stream produced error diagnostics
    #[arg(long)]
    pub strict: bool,

    /// Log level (off, error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    pub log_level: String,
}
