use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "devstream")]
#[command(author, version, about = "Device stream locations and frame extraction")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP server
    Start {
        /// Host to bind to (overrides config)
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on (overrides config)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Print the stream locations of a device
    Resolve {
        /// Device ID (UUID)
        device: String,

        /// Only print this kind of location
        #[arg(long, value_enum)]
        kind: Option<KindArg>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Extract frames from a device's live stream, skipping the registry check
    Frames {
        /// Device ID (UUID)
        device: String,

        /// Number of frames to extract
        #[arg(allow_negative_numbers = true)]
        count: i64,
    },

    /// Check that required external tools are available
    CheckTools,

    /// Validate configuration file
    Validate {
        /// Config file to validate (uses default search paths if not specified)
        config: Option<PathBuf>,
    },

    /// Display version information
    Version,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum KindArg {
    Dash,
    Hls,
    Rtmp,
}

impl From<KindArg> for ds_core::StreamKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Dash => Self::Dash,
            KindArg::Hls => Self::Hls,
            KindArg::Rtmp => Self::Rtmp,
        }
    }
}
