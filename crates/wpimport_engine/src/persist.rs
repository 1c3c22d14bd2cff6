use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("media directory {path:?} is not usable: {source}")]
    MediaDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("{0:?} exists and is not a directory")]
    NotADirectory(PathBuf),
    #[error("failed to write {path:?}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Create `dir` (and its parents) unless it already exists as a directory.
pub fn ensure_media_dir(dir: &Path) -> Result<(), PersistError> {
    match fs::metadata(dir) {
        Ok(meta) if meta.is_dir() => Ok(()),
        Ok(_) => Err(PersistError::NotADirectory(dir.to_path_buf())),
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            fs::create_dir_all(dir).map_err(|source| PersistError::MediaDir {
                path: dir.to_path_buf(),
                source,
            })
        }
        Err(source) => Err(PersistError::MediaDir {
            path: dir.to_path_buf(),
            source,
        }),
    }
}

/// Write `bytes` to `dir/name` through a temp file in `dir`.
///
/// The final link never replaces an existing file: `Ok(None)` means `name`
/// was already taken and nothing was written.
pub fn write_new_file(dir: &Path, name: &str, bytes: &[u8]) -> Result<Option<PathBuf>, PersistError> {
    let target = dir.join(name);
    let write_error = |source: io::Error| PersistError::Write {
        path: target.clone(),
        source,
    };

    let mut tmp = NamedTempFile::new_in(dir).map_err(write_error)?;
    tmp.write_all(bytes).map_err(write_error)?;
    tmp.as_file().sync_all().map_err(write_error)?;

    match tmp.persist_noclobber(&target) {
        Ok(_) => Ok(Some(dir.join(name))),
        Err(err) if err.error.kind() == io::ErrorKind::AlreadyExists => Ok(None),
        Err(err) => Err(write_error(err.error)),
    }
}
