use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::domain::filename;
use crate::domain::models::{CatalogEpisode, EpisodeKey, FileEntry};
use crate::domain::normalize::{normalize, IgnoreList, NormalizedKey};
use crate::infra::catalog::{Catalog, CatalogError};
use crate::infra::lister::FileLister;

#[derive(Debug, Clone)]
pub struct ScanConfig {
    pub root: PathBuf,
    pub min_size: u64,
    pub language: String,
    pub ignore: IgnoreList,
}

/// Catalog episodes loaded during a scan, in catalog order.
#[derive(Debug, Default)]
pub struct EpisodeSet {
    episodes: Vec<CatalogEpisode>,
    index: HashMap<EpisodeKey, usize>,
}

impl EpisodeSet {
    /// Adds an episode; a second entry with the same key replaces the first
    /// in place. Returns `true` when that happened.
    fn insert(&mut self, episode: CatalogEpisode) -> bool {
        let key = episode.key();
        match self.index.get(&key) {
            Some(&position) => {
                self.episodes[position] = episode;
                true
            }
            None => {
                self.index.insert(key, self.episodes.len());
                self.episodes.push(episode);
                false
            }
        }
    }

    fn mark_have(&mut self, key: &EpisodeKey) -> bool {
        match self.index.get(key) {
            Some(&position) => {
                self.episodes[position].have = true;
                true
            }
            None => false,
        }
    }

    pub fn as_slice(&self) -> &[CatalogEpisode] {
        &self.episodes
    }

    pub fn len(&self) -> usize {
        self.episodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.episodes.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ShowState {
    Loaded,
    Unavailable,
}

/// Walks `Show/Season ##/file` and marks catalog episodes found on disk.
pub struct Reconciler<'a, L, C> {
    config: &'a ScanConfig,
    lister: &'a L,
    catalog: &'a C,
    episodes: EpisodeSet,
    shows: HashMap<NormalizedKey, ShowState>,
}

impl<'a, L: FileLister, C: Catalog> Reconciler<'a, L, C> {
    pub fn new(config: &'a ScanConfig, lister: &'a L, catalog: &'a C) -> Self {
        Self {
            config,
            lister,
            catalog,
            episodes: EpisodeSet::default(),
            shows: HashMap::new(),
        }
    }

    pub fn run(mut self) -> EpisodeSet {
        let root = self.config.root.clone();
        let Some(show_dirs) = self.list(&root) else {
            return self.episodes;
        };

        for entry in &show_dirs {
            self.scan_show(entry);
        }

        if self.episodes.is_empty() {
            info!(root = %root.display(), "No catalog episodes loaded");
        }

        info!(
            shows = self.shows.len(),
            episodes = self.episodes.len(),
            "Scan complete"
        );
        self.episodes
    }

    pub fn mark_have(&mut self, key: &EpisodeKey) -> bool {
        self.episodes.mark_have(key)
    }

    fn list(&self, dir: &Path) -> Option<Vec<FileEntry>> {
        match self.lister.list_entries(dir) {
            Ok(entries) => Some(entries),
            Err(e) => {
                warn!(dir = %dir.display(), error = %e, "Unable to read directory");
                None
            }
        }
    }

    fn scan_show(&mut self, entry: &FileEntry) {
        if !entry.is_dir {
            debug!(name = %entry.name, "Not a show folder");
            return;
        }
        if self.config.ignore.contains(&normalize(&entry.name)) {
            debug!(show = %entry.name, "Ignoring");
            return;
        }

        debug!(show = %entry.name, "Scanning show");
        let Some(seasons) = self.list(&entry.path) else {
            return;
        };

        for season in seasons
            .iter()
            .filter(|s| s.is_dir && is_season_folder(&s.name))
        {
            debug!(season = %season.name, "Scanning season");
            self.scan_season(&season.path);
        }
    }

    fn scan_season(&mut self, season_dir: &Path) {
        let Some(files) = self.list(season_dir) else {
            return;
        };

        for file in files.iter().filter(|f| !f.is_dir) {
            if file.size_bytes < self.config.min_size {
                debug!(file = %file.name, size = file.size_bytes, "Below minimum size");
                continue;
            }
            self.scan_file(&file.name);
        }
    }

    fn scan_file(&mut self, file_name: &str) {
        let parsed = filename::parse(file_name);
        let show = normalize(&parsed.show_name);

        if show.is_empty() {
            debug!(file = file_name, "No show name found");
            return;
        }
        if self.config.ignore.contains(&show) {
            debug!(show = %parsed.show_name, "Ignoring");
            return;
        }
        if !self.ensure_show(&parsed.show_name, &show, file_name) {
            return;
        }

        if !parsed.has_season_marker {
            debug!(file = file_name, "No season marker, matching against season 0");
        }
        if parsed.episodes.is_empty() {
            debug!(file = file_name, "No episode marker");
        }

        for &episode in &parsed.episodes {
            let key = EpisodeKey {
                show: show.clone(),
                season: parsed.season,
                episode,
            };
            if self.mark_have(&key) {
                debug!(%show, season = key.season, episode, "Marked");
            } else {
                debug!(%show, season = key.season, episode, "No catalog entry");
            }
        }
    }

    /// Loads a show's catalog the first time it is seen. Returns whether
    /// its episodes are available.
    fn ensure_show(&mut self, show_name: &str, show: &NormalizedKey, file_name: &str) -> bool {
        match self.shows.get(show) {
            Some(ShowState::Loaded) => return true,
            Some(ShowState::Unavailable) => {
                debug!(file = file_name, show = show_name, "Show not in catalog, skipping");
                return false;
            }
            None => {}
        }

        let state = match self.load_show(show_name) {
            Ok(true) => ShowState::Loaded,
            Ok(false) => {
                warn!(show = show_name, file = file_name, "Unable to find show in catalog");
                ShowState::Unavailable
            }
            Err(e) => {
                warn!(show = show_name, file = file_name, error = %e, "Unable to load show from catalog");
                if let CatalogError::Parse(parse) = &e {
                    debug!(document = %parse.document, "Rejected catalog document");
                }
                ShowState::Unavailable
            }
        };
        self.shows.insert(show.clone(), state);
        state == ShowState::Loaded
    }

    fn load_show(&mut self, show_name: &str) -> Result<bool, CatalogError> {
        let language = &self.config.language;
        let Some(series_id) = self.catalog.resolve_show_id(show_name, language)? else {
            return Ok(false);
        };
        debug!(show = show_name, %series_id, "Resolved series");

        let episodes = self.catalog.fetch_episodes(show_name, &series_id, language)?;
        for episode in episodes {
            let (season, number) = (episode.season, episode.episode);
            if self.episodes.insert(episode) {
                debug!(
                    show = show_name,
                    season,
                    episode = number,
                    "Duplicate catalog entry, keeping the last one"
                );
            }
        }
        Ok(true)
    }
}

fn is_season_folder(name: &str) -> bool {
    name.get(..6)
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case("season"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::catalog::testing::{listing, FakeService, MemoryCache};
    use crate::infra::catalog::CatalogClient;
    use crate::infra::lister::FsLister;
    use std::fs::{self, File};
    use tempfile::TempDir;

    const MIN_SIZE: u64 = 3_000_000;

    fn add_file(root: &Path, relative: &str, size: u64) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        File::create(&path).unwrap().set_len(size).unwrap();
    }

    fn config(root: &Path, ignore: &str) -> ScanConfig {
        ScanConfig {
            root: root.to_path_buf(),
            min_size: MIN_SIZE,
            language: "en".to_string(),
            ignore: IgnoreList::new(ignore),
        }
    }

    fn show_a_service() -> FakeService {
        FakeService::default().with_show(
            "Show A",
            "100",
            &listing(
                "8:00 PM",
                &[(1, 1, "Pilot", "2020-01-01"), (1, 2, "Second", "2020-01-08")],
            ),
        )
    }

    fn scan(root: &Path, ignore: &str, service: FakeService) -> (EpisodeSet, FakeService) {
        let config = config(root, ignore);
        let catalog = CatalogClient::new(service, MemoryCache::default());
        let episodes = Reconciler::new(&config, &FsLister, &catalog).run();
        (episodes, catalog.into_service())
    }

    fn have(episodes: &EpisodeSet) -> Vec<(u32, u32)> {
        episodes
            .as_slice()
            .iter()
            .filter(|e| e.have)
            .map(|e| (e.season, e.episode))
            .collect()
    }

    #[test]
    fn test_reports_only_missing_episode() {
        let temp_dir = TempDir::new().unwrap();
        add_file(temp_dir.path(), "Show A/Season 01/Show A - S01E01 - Pilot.mkv", 4_000_000);

        let (episodes, _) = scan(temp_dir.path(), "", show_a_service());

        assert_eq!(episodes.len(), 2);
        assert_eq!(have(&episodes), vec![(1, 1)]);
        let missing: Vec<_> = episodes.as_slice().iter().filter(|e| !e.have).collect();
        assert_eq!(missing.len(), 1);
        assert_eq!((missing[0].season, missing[0].episode), (1, 2));
    }

    #[test]
    fn test_ignored_show_makes_no_catalog_calls() {
        let temp_dir = TempDir::new().unwrap();
        add_file(temp_dir.path(), "Show A/Season 01/Show A - S01E01 - Pilot.mkv", 4_000_000);

        let (episodes, service) = scan(temp_dir.path(), "show a", show_a_service());

        assert!(episodes.is_empty());
        assert_eq!(service.calls(), 0);
    }

    #[test]
    fn test_show_resolved_once_per_run() {
        let temp_dir = TempDir::new().unwrap();
        add_file(temp_dir.path(), "Show A/Season 01/Show A - S01E01 - Pilot.mkv", 4_000_000);
        add_file(temp_dir.path(), "Show A/Season 01/show a - S01E02 - Second.mkv", 4_000_000);

        let (episodes, service) = scan(temp_dir.path(), "", show_a_service());

        assert_eq!(have(&episodes), vec![(1, 1), (1, 2)]);
        assert_eq!(service.search_calls.get(), 1);
        assert_eq!(service.listing_calls.get(), 1);
    }

    #[test]
    fn test_multi_episode_file_marks_each_episode() {
        let temp_dir = TempDir::new().unwrap();
        add_file(temp_dir.path(), "Show A/Season 1/Show A - S01E01E02.mkv", 4_000_000);

        let (episodes, _) = scan(temp_dir.path(), "", show_a_service());

        assert_eq!(have(&episodes), vec![(1, 1), (1, 2)]);
    }

    #[test]
    fn test_unknown_show_does_not_stop_scan() {
        let temp_dir = TempDir::new().unwrap();
        add_file(temp_dir.path(), "Mystery/Season 01/Mystery - S01E01.mkv", 4_000_000);
        add_file(temp_dir.path(), "Mystery/Season 01/Mystery - S01E02.mkv", 4_000_000);
        add_file(temp_dir.path(), "Show A/Season 01/Show A - S01E02 - Second.mkv", 4_000_000);

        let (episodes, service) = scan(temp_dir.path(), "", show_a_service());

        assert_eq!(have(&episodes), vec![(1, 2)]);
        // the failed lookup is not retried for the second Mystery file
        assert_eq!(service.search_calls.get(), 2);
    }

    #[test]
    fn test_broken_listing_skips_only_that_show() {
        let temp_dir = TempDir::new().unwrap();
        add_file(temp_dir.path(), "Broken/Season 01/Broken - S01E01.mkv", 4_000_000);
        add_file(temp_dir.path(), "Show A/Season 01/Show A - S01E01.mkv", 4_000_000);

        let service = show_a_service().with_show(
            "Broken",
            "7",
            "<Data><Episode><EpisodeNumber>1</EpisodeNumber></Episode></Data>",
        );
        let (episodes, _) = scan(temp_dir.path(), "", service);

        assert_eq!(episodes.len(), 2);
        assert_eq!(have(&episodes), vec![(1, 1)]);
    }

    #[test]
    fn test_skips_small_files_and_non_season_folders() {
        let temp_dir = TempDir::new().unwrap();
        add_file(temp_dir.path(), "Show A/Season 01/Show A - S01E01.mkv", 1_000);
        add_file(temp_dir.path(), "Show A/Extras/Show A - S01E02.mkv", 4_000_000);
        add_file(temp_dir.path(), "Show A/Season 01/Show A - S01E02.nfo", MIN_SIZE - 1);
        add_file(temp_dir.path(), "notes.txt", 4_000_000);

        let (episodes, service) = scan(temp_dir.path(), "", show_a_service());

        assert!(episodes.is_empty());
        assert_eq!(service.calls(), 0);
    }

    #[test]
    fn test_file_of_exactly_min_size_is_scanned() {
        let temp_dir = TempDir::new().unwrap();
        add_file(temp_dir.path(), "Show A/Season 01/Show A - S01E01.mkv", MIN_SIZE);
        add_file(temp_dir.path(), "Show A/Season 01/Show A - S01E02.mkv", MIN_SIZE - 1);

        let (episodes, _) = scan(temp_dir.path(), "", show_a_service());

        assert_eq!(have(&episodes), vec![(1, 1)]);
    }

    #[test]
    fn test_error_page_leaves_show_unavailable() {
        let temp_dir = TempDir::new().unwrap();
        add_file(temp_dir.path(), "Gone/Season 01/Gone - S01E01.mkv", 4_000_000);
        add_file(temp_dir.path(), "Gone/Season 01/Gone - S01E02.mkv", 4_000_000);
        add_file(temp_dir.path(), "Proxy/Season 01/Proxy - S01E01.mkv", 4_000_000);
        add_file(temp_dir.path(), "Show A/Season 01/Show A - S01E01.mkv", 4_000_000);

        let mut service = show_a_service().with_show("Gone", "5", "<Error>Series Not Found</Error>");
        service.searches.insert(
            "Proxy".to_string(),
            "<html><head><title>502 Bad Gateway</title></head><body>nginx</body></html>".to_string(),
        );
        let (episodes, service) = scan(temp_dir.path(), "", service);

        assert_eq!(episodes.len(), 2);
        assert!(episodes
            .as_slice()
            .iter()
            .all(|e| e.normalized_show_name == normalize("Show A")));
        assert_eq!(have(&episodes), vec![(1, 1)]);
        // Gone is looked up once and then remembered as unavailable
        assert_eq!(service.search_calls.get(), 3);
        assert_eq!(service.listing_calls.get(), 2);
    }

    #[cfg(unix)]
    #[test]
    fn test_non_utf8_show_folder_is_scanned() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let temp_dir = TempDir::new().unwrap();
        let show_dir = temp_dir.path().join(OsStr::from_bytes(b"Show A \xff"));
        add_file(&show_dir, "Season 01/Show A - S01E01.mkv", 4_000_000);

        let (episodes, _) = scan(temp_dir.path(), "", show_a_service());

        assert_eq!(have(&episodes), vec![(1, 1)]);
    }

    #[test]
    fn test_season_folder_prefix_is_case_insensitive() {
        let temp_dir = TempDir::new().unwrap();
        add_file(temp_dir.path(), "Show A/SEASON 01/Show A - S01E02.mkv", 4_000_000);

        let (episodes, _) = scan(temp_dir.path(), "", show_a_service());

        assert_eq!(have(&episodes), vec![(1, 2)]);
    }

    #[test]
    fn test_file_without_episode_marker_marks_nothing() {
        let temp_dir = TempDir::new().unwrap();
        add_file(temp_dir.path(), "Show A/Season 01/Show A - S01 - Special.mkv", 4_000_000);

        let (episodes, _) = scan(temp_dir.path(), "", show_a_service());

        assert_eq!(episodes.len(), 2);
        assert!(have(&episodes).is_empty());
    }

    #[test]
    fn test_ignore_list_applies_to_parsed_show_name() {
        let temp_dir = TempDir::new().unwrap();
        add_file(temp_dir.path(), "Library/Season 01/Show A - S01E01.mkv", 4_000_000);

        let (episodes, service) = scan(temp_dir.path(), "Show A", show_a_service());

        assert!(episodes.is_empty());
        assert_eq!(service.calls(), 0);
    }

    #[test]
    fn test_missing_root_yields_empty_set() {
        let temp_dir = TempDir::new().unwrap();
        let (episodes, service) = scan(&temp_dir.path().join("missing"), "", show_a_service());

        assert!(episodes.is_empty());
        assert_eq!(service.calls(), 0);
    }

    #[test]
    fn test_duplicate_catalog_key_keeps_last() {
        let temp_dir = TempDir::new().unwrap();
        add_file(temp_dir.path(), "Dupes/Season 01/Dupes - S01E01.mkv", 4_000_000);

        let service = FakeService::default().with_show(
            "Dupes",
            "9",
            &listing("", &[(1, 1, "Old", "2020-01-01"), (1, 1, "New", "2020-01-02")]),
        );
        let (episodes, _) = scan(temp_dir.path(), "", service);

        assert_eq!(episodes.len(), 1);
        assert_eq!(episodes.as_slice()[0].title, "New");
        assert!(episodes.as_slice()[0].have);
    }

    #[test]
    fn test_mark_have_unknown_key() {
        let config = config(Path::new("."), "");
        let catalog = CatalogClient::new(FakeService::default(), MemoryCache::default());
        let mut reconciler = Reconciler::new(&config, &FsLister, &catalog);

        let key = EpisodeKey {
            show: normalize("Show A"),
            season: 1,
            episode: 1,
        };
        assert!(!reconciler.mark_have(&key));

        reconciler.episodes.insert(CatalogEpisode {
            show_name: "Show A".into(),
            normalized_show_name: normalize("Show A"),
            title: "Pilot".into(),
            season: 1,
            episode: 1,
            air_date: "2020-01-01".into(),
            air_time: String::new(),
            have: false,
        });
        assert!(reconciler.mark_have(&key));
        assert!(reconciler.episodes.as_slice()[0].have);
    }
}
