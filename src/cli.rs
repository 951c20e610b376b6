use clap::Parser;
use std::path::PathBuf;

use crate::workflows::report::SortMode;

#[derive(Parser, Debug)]
#[command(name = "epi")]
#[command(about = "Find missing TV episodes by comparing a media folder against TVDB")]
pub struct Cli {
    /// Directory to scan, laid out as Show Name/Season ##/files [default: current directory]
    #[arg(long)]
    pub dir: Option<PathBuf>,

    /// Minimum file size in bytes to include in the scan
    #[arg(long = "min", default_value_t = 3_000_000)]
    pub min_size: u64,

    /// Catalog language [default: en]
    #[arg(short = 'l', long)]
    pub language: Option<String>,

    /// Include season zero (specials, etc)
    #[arg(short = 's', long)]
    pub season_zero: bool,

    /// Include episode zero (specials, etc)
    #[arg(short = 'e', long)]
    pub episode_zero: bool,

    /// Include episodes with a TBA (to be announced) air date
    #[arg(short = 't', long)]
    pub tba: bool,

    /// Comma separated list of show titles to ignore
    #[arg(short = 'i', long, default_value = "")]
    pub ignore: String,

    /// Days into the future to include in the report, negative for no limit
    #[arg(short = 'f', long, default_value_t = 365, allow_negative_numbers = true)]
    pub future: i64,

    /// Days into the past to include in the report, negative for no limit
    #[arg(short = 'p', long, default_value_t = -1, allow_negative_numbers = true)]
    pub past: i64,

    /// Report ordering
    #[arg(long, value_enum, default_value_t = SortMode::None)]
    pub sort: SortMode,

    /// Show debug output
    #[arg(short = 'd', long)]
    pub debug: bool,

    /// TVDB mirror to use instead of asking the mirror list
    #[arg(long)]
    pub mirror: Option<String>,

    /// Directory holding cached catalog responses
    #[arg(long)]
    pub cache_dir: Option<PathBuf>,

    /// Skip the banner
    #[arg(long)]
    pub no_logo: bool,
}
