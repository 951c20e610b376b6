use anyhow::bail;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::cli::Cli;
use crate::domain::normalize::IgnoreList;
use crate::workflows::reconciler::ScanConfig;
use crate::workflows::report::ReportConfig;

const DEFAULT_LANGUAGE: &str = "en";

#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    tvdb_api_key: Option<String>,
    mirror: Option<String>,
    cache_dir: Option<PathBuf>,
    language: Option<String>,
}

/// Values merged from the command line, the environment and `config.toml`.
#[derive(Debug, Clone)]
pub struct Settings {
    pub api_key: String,
    pub mirror: Option<String>,
    pub cache_dir: PathBuf,
    pub language: String,
}

pub fn load_settings(cli: &Cli) -> Result<Settings> {
    let file = read_config_file(&get_config_path())?;
    merge(cli, env::var("TVDB_API_KEY").ok(), file)
}

fn read_config_file(path: &Path) -> Result<ConfigFile> {
    if !path.exists() {
        return Ok(ConfigFile::default());
    }
    let content = fs::read_to_string(path)?;
    toml::from_str(&content).with_context(|| format!("Invalid config file {}", path.display()))
}

fn merge(cli: &Cli, env_key: Option<String>, file: ConfigFile) -> Result<Settings> {
    let Some(api_key) = env_key.or(file.tvdb_api_key) else {
        bail!(
            "TVDB API key not found. Set TVDB_API_KEY environment variable or create config file at {} with tvdb_api_key = \"your-key\"",
            get_config_path().display()
        )
    };

    Ok(Settings {
        api_key,
        mirror: cli.mirror.clone().or(file.mirror),
        cache_dir: cli
            .cache_dir
            .clone()
            .or(file.cache_dir)
            .unwrap_or_else(|| get_config_dir_path().join("cache")),
        language: cli
            .language
            .clone()
            .or(file.language)
            .unwrap_or_else(|| DEFAULT_LANGUAGE.to_string()),
    })
}

pub fn scan_config(cli: &Cli, settings: &Settings) -> Result<ScanConfig> {
    let root = match &cli.dir {
        Some(dir) => dir.clone(),
        None => env::current_dir()?,
    };

    Ok(ScanConfig {
        root,
        min_size: cli.min_size,
        language: settings.language.clone(),
        ignore: IgnoreList::new(&cli.ignore),
    })
}

pub fn report_config(cli: &Cli) -> ReportConfig {
    ReportConfig {
        include_season_zero: cli.season_zero,
        include_episode_zero: cli.episode_zero,
        include_tba: cli.tba,
        past_days: day_limit(cli.past),
        future_days: day_limit(cli.future),
        sort: cli.sort,
    }
}

fn day_limit(days: i64) -> Option<i64> {
    (days >= 0).then_some(days)
}

fn get_config_dir_path() -> PathBuf {
    xdir::config()
        .map(|path| path.join("epi"))
        // If the standard path could not be found (e.g.`$HOME` is not set),
        // default to the current directory.
        .unwrap_or_default()
}

fn get_config_path() -> PathBuf {
    get_config_dir_path().join("config.toml")
}
