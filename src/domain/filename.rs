//! Pulls show, season and episode numbers out of names like
//! `Show Name - S01E02E03 - Title.mkv`.

use std::sync::LazyLock;

use regex::Regex;

use super::models::ParsedFilename;

static SHOW_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9'.&() ]*").unwrap());
static SEASON_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)S(\d{2})").unwrap());
static EPISODE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)E(\d{2})").unwrap());

pub fn parse(filename: &str) -> ParsedFilename {
    let show_name = SHOW_NAME_RE
        .find(filename)
        .map(|m| m.as_str().trim().to_string())
        .unwrap_or_default();

    let season = SEASON_RE
        .captures(filename)
        .and_then(|caps| caps[1].parse::<u32>().ok());

    let episodes = EPISODE_RE
        .captures_iter(filename)
        .filter_map(|caps| caps[1].parse::<u32>().ok())
        .collect();

    ParsedFilename {
        show_name,
        season: season.unwrap_or(0),
        has_season_marker: season.is_some(),
        episodes,
    }
}
