use anyhow::{bail, Context, Result};
use quick_xml::events::Event;
use quick_xml::Reader;
use serde::Deserialize;
use tracing::debug;

use crate::domain::models::{CatalogEpisode, CatalogId, TBA};
use crate::domain::normalize::normalize;

pub const TVDB_API_BASE: &str = "http://thetvdb.com";

/// Remote catalog endpoints. Implementations return the raw response body.
pub trait CatalogService {
    fn search_series(&self, show_name: &str, language: &str) -> Result<Vec<u8>>;
    fn series_episodes(&self, series_id: &CatalogId, language: &str) -> Result<Vec<u8>>;
}

#[derive(Debug, Clone)]
pub struct TvdbClient {
    api_key: String,
    mirror: String,
    http: reqwest::blocking::Client,
}

impl TvdbClient {
    pub fn new(api_key: String, mirror: &str) -> Self {
        Self {
            api_key,
            mirror: mirror.trim_end_matches('/').to_string(),
            http: reqwest::blocking::Client::new(),
        }
    }

    /// Ask `base` which mirror serves series data and build a client for it.
    pub fn discover(api_key: String, base: &str) -> Result<Self> {
        let http = reqwest::blocking::Client::new();
        let url = format!("{}/api/{}/mirrors.xml", base.trim_end_matches('/'), api_key);
        let body = get_bytes(&http, &url, &[]).context("Failed to fetch TVDB mirror list")?;
        let mirror = decode_mirror(&body)?;
        debug!(%mirror, "Using TVDB mirror");

        Ok(Self {
            api_key,
            mirror: mirror.trim_end_matches('/').to_string(),
            http,
        })
    }

    pub fn mirror(&self) -> &str {
        &self.mirror
    }
}

impl CatalogService for TvdbClient {
    fn search_series(&self, show_name: &str, language: &str) -> Result<Vec<u8>> {
        let url = format!("{}/api/GetSeries.php", self.mirror);
        get_bytes(
            &self.http,
            &url,
            &[("seriesname", show_name), ("language", language)],
        )
    }

    fn series_episodes(&self, series_id: &CatalogId, language: &str) -> Result<Vec<u8>> {
        let url = format!(
            "{}/api/{}/series/{}/all/{}.xml",
            self.mirror, self.api_key, series_id, language
        );
        get_bytes(&self.http, &url, &[])
    }
}

fn get_bytes(
    http: &reqwest::blocking::Client,
    url: &str,
    query: &[(&str, &str)],
) -> Result<Vec<u8>> {
    debug!(url, "Requesting from TVDB");
    let response = http.get(url).query(query).send()?;

    if !response.status().is_success() {
        bail!("TVDB request failed: HTTP {}", response.status());
    }

    let body = response.bytes()?;
    if body.is_empty() {
        bail!("TVDB returned an empty response");
    }
    Ok(body.to_vec())
}

/// A catalog document that could not be turned into typed data.
#[derive(Debug, thiserror::Error)]
#[error("malformed catalog response at `{field}`: {reason}")]
pub struct CatalogParseError {
    pub field: String,
    pub reason: String,
    pub document: String,
}

impl CatalogParseError {
    fn new(field: &str, reason: impl Into<String>, document: &str) -> Self {
        Self {
            field: field.to_string(),
            reason: reason.into(),
            document: document.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct MirrorsDocument {
    #[serde(rename = "Mirror", default)]
    mirrors: Vec<MirrorRecord>,
}

#[derive(Debug, Deserialize)]
struct MirrorRecord {
    mirrorpath: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchDocument {
    #[serde(rename = "Series", default)]
    series: Vec<SearchRecord>,
}

#[derive(Debug, Deserialize)]
struct SearchRecord {
    seriesid: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SeriesDocument {
    #[serde(rename = "Series")]
    series: Option<SeriesRecord>,
    #[serde(rename = "Episode", default)]
    episodes: Vec<EpisodeRecord>,
}

#[derive(Debug, Deserialize)]
struct SeriesRecord {
    #[serde(rename = "Airs_Time")]
    airs_time: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EpisodeRecord {
    #[serde(rename = "SeasonNumber")]
    season_number: Option<String>,
    #[serde(rename = "EpisodeNumber")]
    episode_number: Option<String>,
    #[serde(rename = "EpisodeName")]
    episode_name: Option<String>,
    #[serde(rename = "FirstAired")]
    first_aired: Option<String>,
}

/// Name of the first element in `document`, skipping the declaration,
/// doctype, comments and whitespace.
fn root_element(document: &str) -> Option<String> {
    let mut reader = Reader::from_str(document);
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                return Some(String::from_utf8_lossy(e.name().as_ref()).into_owned())
            }
            Ok(Event::Eof) | Err(_) => return None,
            Ok(_) => {}
        }
    }
}

fn expect_root(document: &str, root: &str) -> Result<(), CatalogParseError> {
    match root_element(document) {
        Some(name) if name == root => Ok(()),
        Some(name) => Err(CatalogParseError::new(
            root,
            format!("unexpected root element <{name}>"),
            document,
        )),
        None => Err(CatalogParseError::new(root, "no root element", document)),
    }
}

/// Rejects a response whose first element is not `<root>`.
pub fn check_root(bytes: &[u8], root: &str) -> Result<(), CatalogParseError> {
    expect_root(&String::from_utf8_lossy(bytes), root)
}

fn decode<'a, T: Deserialize<'a>>(document: &'a str, root: &str) -> Result<T, CatalogParseError> {
    // the deserializer accepts any root name
    expect_root(document, root)?;
    quick_xml::de::from_str(document)
        .map_err(|e| CatalogParseError::new(root, e.to_string(), document))
}

/// Drop zero-width and other non-printable characters, then trim.
fn clean_text(raw: Option<&str>) -> String {
    raw.unwrap_or_default()
        .chars()
        .filter(|c| {
            !c.is_control() && !matches!(*c, '\u{200b}'..='\u{200f}' | '\u{2060}' | '\u{feff}')
        })
        .collect::<String>()
        .trim()
        .to_string()
}

fn or_tba(text: String) -> String {
    if text.is_empty() {
        TBA.to_string()
    } else {
        text
    }
}

fn required_number(
    raw: Option<&str>,
    field: &str,
    document: &str,
) -> Result<u32, CatalogParseError> {
    let text = clean_text(raw);
    if text.is_empty() {
        return Err(CatalogParseError::new(field, "missing value", document));
    }
    text.parse()
        .map_err(|_| CatalogParseError::new(field, format!("not a number: {text:?}"), document))
}

pub fn decode_mirror(bytes: &[u8]) -> Result<String, CatalogParseError> {
    let document = String::from_utf8_lossy(bytes);
    let parsed: MirrorsDocument = decode(&document, "Mirrors")?;
    parsed
        .mirrors
        .iter()
        .map(|m| clean_text(m.mirrorpath.as_deref()))
        .find(|path| !path.is_empty())
        .ok_or_else(|| CatalogParseError::new("Mirrors/Mirror/mirrorpath", "no mirror listed", &document))
}

/// First series identifier in a search response, if any.
pub fn decode_series_id(bytes: &[u8]) -> Result<Option<CatalogId>, CatalogParseError> {
    let document = String::from_utf8_lossy(bytes);
    let parsed: SearchDocument = decode(&document, "Data")?;
    Ok(parsed
        .series
        .iter()
        .map(|s| clean_text(s.seriesid.as_deref()))
        .find(|id| !id.is_empty())
        .map(CatalogId))
}

/// Every episode of a full series listing, tagged with `show_name`.
pub fn decode_episodes(
    bytes: &[u8],
    show_name: &str,
) -> Result<Vec<CatalogEpisode>, CatalogParseError> {
    let document = String::from_utf8_lossy(bytes);
    let parsed: SeriesDocument = decode(&document, "Data")?;

    let air_time = clean_text(
        parsed
            .series
            .as_ref()
            .and_then(|s| s.airs_time.as_deref()),
    );
    if air_time.is_empty() {
        debug!(show_name, "AirTime not defined");
    }

    let normalized = normalize(show_name);
    parsed
        .episodes
        .iter()
        .map(|record| -> Result<CatalogEpisode, CatalogParseError> {
            Ok(CatalogEpisode {
                show_name: show_name.to_string(),
                normalized_show_name: normalized.clone(),
                title: or_tba(clean_text(record.episode_name.as_deref())),
                season: required_number(
                    record.season_number.as_deref(),
                    "Episode/SeasonNumber",
                    &document,
                )?,
                episode: required_number(
                    record.episode_number.as_deref(),
                    "Episode/EpisodeNumber",
                    &document,
                )?,
                air_date: or_tba(clean_text(record.first_aired.as_deref())),
                air_time: air_time.clone(),
                have: false,
            })
        })
        .collect()
}
