use std::path::PathBuf;

use crate::filename::deduplicated_name;
use crate::persist::{ensure_media_dir, write_new_file, PersistError};

pub const DEFAULT_UPLOAD_DIR: &str = "articles";
pub const DEFAULT_MEDIA_URL: &str = "/media/";

/// Where downloaded images land on disk and how they are addressed publicly.
#[derive(Debug, Clone)]
pub struct MediaStorage {
    root: PathBuf,
    upload_dir: String,
    base_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    pub name: String,
    /// Relative to the media root, always `/`-separated.
    pub relative_path: String,
    pub url: String,
    pub absolute_path: PathBuf,
}

impl MediaStorage {
    pub fn new(root: impl Into<PathBuf>, upload_dir: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            upload_dir: upload_dir.into().trim_matches('/').to_string(),
            base_url: base_url.into(),
        }
    }

    pub fn upload_path(&self) -> PathBuf {
        let mut path = self.root.clone();
        for segment in self.upload_dir.split('/').filter(|s| !s.is_empty()) {
            path.push(segment);
        }
        path
    }

    /// Store `bytes` under `name`; a name already on disk gets a content-hash
    /// suffix. Existing files are never overwritten.
    pub fn save(&self, name: &str, bytes: &[u8]) -> Result<StoredFile, PersistError> {
        let dir = self.upload_path();
        ensure_media_dir(&dir)?;

        let (filename, absolute_path) = match write_new_file(&dir, name, bytes)? {
            Some(path) => (name.to_string(), path),
            None => {
                let renamed = deduplicated_name(name, bytes);
                // Taken as well: same name, same content hash, already on disk.
                let path = write_new_file(&dir, &renamed, bytes)?
                    .unwrap_or_else(|| dir.join(&renamed));
                (renamed, path)
            }
        };

        let relative_path = if self.upload_dir.is_empty() {
            filename.clone()
        } else {
            format!("{}/{}", self.upload_dir, filename)
        };

        Ok(StoredFile {
            url: self.public_url(&relative_path),
            name: filename,
            relative_path,
            absolute_path,
        })
    }

    pub fn public_url(&self, relative_path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), relative_path)
    }
}
