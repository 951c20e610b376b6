use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;

use sha2::{Digest, Sha256};
use tempfile::NamedTempFile;

use crate::domain::models::CatalogId;
use crate::domain::normalize::NormalizedKey;

/// Identifies one cached catalog response.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub language: String,
    pub show: NormalizedKey,
    pub catalog_id: Option<CatalogId>,
}

impl CacheKey {
    pub fn search(language: &str, show: &NormalizedKey) -> Self {
        Self {
            language: language.to_string(),
            show: show.clone(),
            catalog_id: None,
        }
    }

    pub fn episodes(language: &str, show: &NormalizedKey, catalog_id: &CatalogId) -> Self {
        Self {
            language: language.to_string(),
            show: show.clone(),
            catalog_id: Some(catalog_id.clone()),
        }
    }

    /// Readable prefix plus a digest of the full key, so sanitizing the
    /// prefix can never make two keys share a file.
    pub fn file_name(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.language.as_bytes());
        hasher.update([0u8]);
        hasher.update(self.show.as_str().as_bytes());
        if let Some(id) = &self.catalog_id {
            hasher.update([0u8]);
            hasher.update(id.0.as_bytes());
        }
        let digest = hex::encode(hasher.finalize());

        let mut prefix = format!("{}_{}", sanitize(&self.language), sanitize(self.show.as_str()));
        if let Some(id) = &self.catalog_id {
            prefix.push('_');
            prefix.push_str(&sanitize(&id.0));
        }

        format!("{prefix}-{}.xml", &digest[..16])
    }
}

fn sanitize(part: &str) -> String {
    part.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect()
}

/// Raw catalog responses, kept forever once written.
pub trait CacheStore {
    fn get(&self, key: &CacheKey) -> io::Result<Option<Vec<u8>>>;
    fn put(&self, key: &CacheKey, bytes: &[u8]) -> io::Result<()>;
}

#[derive(Debug, Clone)]
pub struct FsCache {
    root: PathBuf,
}

impl FsCache {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    fn path_for(&self, key: &CacheKey) -> PathBuf {
        self.root.join(key.file_name())
    }
}

impl CacheStore for FsCache {
    fn get(&self, key: &CacheKey) -> io::Result<Option<Vec<u8>>> {
        match fs::read(self.path_for(key)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn put(&self, key: &CacheKey, bytes: &[u8]) -> io::Result<()> {
        // Create cache directory if it doesn't exist
        fs::create_dir_all(&self.root)?;

        // Write beside the target and rename so readers never see a partial entry
        let mut tmp = NamedTempFile::new_in(&self.root)?;
        tmp.write_all(bytes)?;
        tmp.as_file().sync_all()?;
        tmp.persist(self.path_for(key)).map_err(|e| e.error)?;
        Ok(())
    }
}
