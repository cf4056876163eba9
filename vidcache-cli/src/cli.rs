use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "vidcache")]
#[command(about = "Cache a playlist of videos locally and play it back in order")]
#[command(version)]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,

    /// Data directory holding the cache, manifest and fast store
    #[arg(long, global = true, env = "VIDCACHE_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// External player program used for playback
    #[arg(long, global = true, env = "VIDCACHE_PLAYER", default_value = "mpv")]
    pub player: String,

    /// Extra argument passed to the player (repeatable)
    #[arg(long = "player-arg", global = true, allow_hyphen_values = true)]
    pub player_args: Vec<String>,

    /// Minimum log level (trace, debug, info, warn, error)
    #[arg(long, global = true, env = "VIDCACHE_LOG_LEVEL", default_value = "warn")]
    pub log_level: String,

    /// Log output format
    #[arg(long, global = true, env = "VIDCACHE_LOG_FORMAT", value_enum, default_value_t = LogOutput::Compact)]
    pub log_format: LogOutput,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Load a playlist (JSON array of URLs or one URL per line)
    Load {
        /// Playlist file, or `-` for stdin
        input: PathBuf,
    },

    /// Download every playlist entry into the cache
    Cache,

    /// Show the cache status of every playlist entry
    Status {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Play the playlist from the first cached entry
    Play {
        /// Jump to this entry once playback has started
        #[arg(long)]
        from: Option<usize>,
    },

    /// Delete every cached file, record and the manifest
    Clear,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum LogOutput {
    Pretty,
    Json,
    Compact,
}
