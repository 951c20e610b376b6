use std::fmt;
use std::path::PathBuf;

use super::normalize::NormalizedKey;

/// Identifier the catalog assigns to a show.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CatalogId(pub String);

impl fmt::Display for CatalogId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One entry of a listed directory. `name` is a lossy rendering for
/// parsing and logs; `path` is the exact path to descend into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    pub path: PathBuf,
    pub name: String,
    pub is_dir: bool,
    pub size_bytes: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedFilename {
    pub show_name: String,
    pub season: u32,
    /// Whether an `S##` marker was present. A missing marker still yields season 0.
    pub has_season_marker: bool,
    pub episodes: Vec<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EpisodeKey {
    pub show: NormalizedKey,
    pub season: u32,
    pub episode: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEpisode {
    pub show_name: String,
    pub normalized_show_name: NormalizedKey,
    pub title: String,
    pub season: u32,
    pub episode: u32,
    /// `YYYY-MM-DD`, or `"TBA"` when the catalog has no date.
    pub air_date: String,
    pub air_time: String,
    pub have: bool,
}

pub const TBA: &str = "TBA";

impl CatalogEpisode {
    pub fn key(&self) -> EpisodeKey {
        EpisodeKey {
            show: self.normalized_show_name.clone(),
            season: self.season,
            episode: self.episode,
        }
    }

    pub fn is_tba(&self) -> bool {
        self.air_date == TBA
    }
}
