use std::fs;
use std::io;
use std::path::Path;

use crate::domain::models::FileEntry;

pub trait FileLister {
    /// Entries directly under `path`, sorted by name.
    fn list_entries(&self, path: &Path) -> io::Result<Vec<FileEntry>>;
}

/// Lists the local file system.
#[derive(Debug, Default, Clone, Copy)]
pub struct FsLister;

impl FileLister for FsLister {
    fn list_entries(&self, path: &Path) -> io::Result<Vec<FileEntry>> {
        let mut entries = Vec::new();

        for entry in fs::read_dir(path)? {
            let entry = entry?;
            let metadata = entry.metadata()?;
            entries.push(FileEntry {
                path: entry.path(),
                name: entry.file_name().to_string_lossy().into_owned(),
                is_dir: metadata.is_dir(),
                size_bytes: if metadata.is_dir() { 0 } else { metadata.len() },
            });
        }

        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }
}
