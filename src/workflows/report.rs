use std::io::{self, Write};

use chrono::{DateTime, NaiveDate, Utc};
use clap::ValueEnum;

use crate::domain::models::CatalogEpisode;

pub const SEPARATOR: &str = "__________________________________";

const AIR_DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum SortMode {
    /// Catalog order
    #[default]
    None,
    /// Oldest to newest
    AirDate,
    /// Newest to oldest
    AirDateDesc,
}

#[derive(Debug, Clone, Default)]
pub struct ReportConfig {
    pub include_season_zero: bool,
    pub include_episode_zero: bool,
    pub include_tba: bool,
    /// Days into the past to report; `None` is unlimited.
    pub past_days: Option<i64>,
    /// Days into the future to report; `None` is unlimited.
    pub future_days: Option<i64>,
    pub sort: SortMode,
}

/// Missing episodes that pass every filter, in the requested order.
pub fn select<'a>(
    episodes: &'a [CatalogEpisode],
    config: &ReportConfig,
    now: DateTime<Utc>,
) -> Vec<&'a CatalogEpisode> {
    let mut selected: Vec<_> = episodes
        .iter()
        .filter(|e| !e.have)
        .filter(|e| e.season != 0 || config.include_season_zero)
        .filter(|e| e.episode != 0 || config.include_episode_zero)
        .filter(|e| !e.is_tba() || config.include_tba)
        .filter(|e| within_window(e, config, now))
        .collect();

    // TBA compares as a plain string, after any numeric date
    match config.sort {
        SortMode::None => {}
        SortMode::AirDate => selected.sort_by(|a, b| a.air_date.cmp(&b.air_date)),
        SortMode::AirDateDesc => selected.sort_by(|a, b| b.air_date.cmp(&a.air_date)),
    }
    selected
}

fn within_window(episode: &CatalogEpisode, config: &ReportConfig, now: DateTime<Utc>) -> bool {
    let Some(days) = days_since(&episode.air_date, now) else {
        return true;
    };

    if config.past_days.is_some_and(|limit| days > limit) {
        return false;
    }
    if config.future_days.is_some_and(|limit| -days > limit) {
        return false;
    }
    true
}

/// Whole days from the air date to `now`, rounded half up. Negative for
/// future dates, `None` when the date does not parse.
fn days_since(air_date: &str, now: DateTime<Utc>) -> Option<i64> {
    let aired = NaiveDate::parse_from_str(air_date, AIR_DATE_FORMAT)
        .ok()?
        .and_hms_opt(0, 0, 0)?
        .and_utc();
    let hours = (now - aired).num_seconds() as f64 / 3600.0;
    Some((hours / 24.0 + 0.5).floor() as i64)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Summary {
    pub total: usize,
    pub have: usize,
    pub missing: usize,
}

pub fn summarize(episodes: &[CatalogEpisode]) -> Summary {
    let have = episodes.iter().filter(|e| e.have).count();
    Summary {
        total: episodes.len(),
        have,
        missing: episodes.len() - have,
    }
}

pub fn write_report(
    out: &mut impl Write,
    episodes: &[CatalogEpisode],
    selected: &[&CatalogEpisode],
) -> io::Result<()> {
    if episodes.is_empty() {
        writeln!(out, "No episodes found.")?;
        return Ok(());
    }

    let summary = summarize(episodes);
    writeln!(out, "Total Episodes: {}", summary.total)?;
    writeln!(out, "Episodes in Library: {}", summary.have)?;
    writeln!(out, "Missing Episodes: {}", summary.missing)?;
    writeln!(out, "{SEPARATOR}")?;

    for episode in selected {
        writeln!(
            out,
            "{} - S{:02}E{:02} - {} -- {} @ {}",
            episode.show_name,
            episode.season,
            episode.episode,
            episode.title,
            episode.air_date,
            episode.air_time
        )?;
    }
    Ok(())
}
