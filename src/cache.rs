//! Two-tier on-disk artifact cache
//!
//! One directory of downloaded archives (`<download_dir>/<key>.zip`) and
//! one of extracted trees (`<extract_dir>/<key>/`). Presence of a target is
//! the skip signal; there is no metadata tier. Writes go through a
//! temporary sibling path and are renamed into place, so an interrupted
//! run never leaves a partial artifact at a canonical path.

use std::fs::{self, File};
use std::io;
use std::path::PathBuf;
use thiserror::Error;
use tracing::{debug, trace};
use zip::ZipArchive;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("archive entry '{0}' escapes the extraction directory")]
    UnsafeEntryPath(String),

    #[error("invalid archive: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Filesystem cache keyed by artifact key
pub struct ArtifactCache {
    download_dir: PathBuf,
    extract_dir: PathBuf,
}

impl ArtifactCache {
    pub fn new(download_dir: impl Into<PathBuf>, extract_dir: impl Into<PathBuf>) -> Self {
        Self {
            download_dir: download_dir.into(),
            extract_dir: extract_dir.into(),
        }
    }

    /// Canonical path of the archive for a key
    pub fn archive_path(&self, key: &str) -> PathBuf {
        self.download_dir.join(format!("{}.zip", key))
    }

    /// Canonical path of the extracted tree for a key
    pub fn extract_path(&self, key: &str) -> PathBuf {
        self.extract_dir.join(key)
    }

    /// True iff the archive is already downloaded
    pub fn has_archive(&self, key: &str) -> bool {
        self.archive_path(key).is_file()
    }

    /// True iff the extracted tree already exists
    pub fn has_extracted(&self, key: &str) -> bool {
        self.extract_path(key).is_dir()
    }

    /// Persist archive bytes at the canonical path
    ///
    /// Written to a temporary sibling first and renamed into place, so the
    /// canonical path never holds a truncated download.
    pub fn write_archive(&self, key: &str, bytes: &[u8]) -> Result<PathBuf, CacheError> {
        fs::create_dir_all(&self.download_dir)?;

        let path = self.archive_path(key);
        let tmp = self.download_dir.join(format!(".{}.zip.tmp", key));
        trace!("Writing {} bytes to {:?}", bytes.len(), tmp);

        if let Err(e) = fs::write(&tmp, bytes) {
            let _ = fs::remove_file(&tmp);
            return Err(e.into());
        }
        fs::rename(&tmp, &path)?;

        debug!("Wrote archive {:?}", path);
        Ok(path)
    }

    /// Expand the cached archive into the extraction target directory
    ///
    /// Entries whose paths would land outside the target directory reject
    /// the whole archive. Extraction happens in a temporary directory that
    /// is renamed into place on success.
    pub fn extract_archive(&self, key: &str) -> Result<PathBuf, CacheError> {
        let archive_path = self.archive_path(key);
        let target = self.extract_path(key);
        let tmp = self.extract_dir.join(format!(".{}.tmp", key));

        let file = File::open(&archive_path)?;
        let mut archive = ZipArchive::new(file)?;

        // Clean up any previous failed extraction
        if tmp.exists() {
            fs::remove_dir_all(&tmp)?;
        }
        fs::create_dir_all(&tmp)?;

        let extract_result = (|| -> Result<(), CacheError> {
            for i in 0..archive.len() {
                let mut entry = archive.by_index(i)?;

                let relative = entry
                    .enclosed_name()
                    .ok_or_else(|| CacheError::UnsafeEntryPath(entry.name().to_string()))?;
                let outpath = tmp.join(relative);

                if entry.is_dir() {
                    fs::create_dir_all(&outpath)?;
                } else {
                    if let Some(parent) = outpath.parent() {
                        fs::create_dir_all(parent)?;
                    }
                    let mut out = File::create(&outpath)?;
                    io::copy(&mut entry, &mut out)?;

                    #[cfg(unix)]
                    if let Some(mode) = entry.unix_mode() {
                        use std::os::unix::fs::PermissionsExt;
                        fs::set_permissions(&outpath, fs::Permissions::from_mode(mode))?;
                    }
                }
            }
            Ok(())
        })();

        // On failure, leave no partial tree behind
        if let Err(e) = extract_result {
            let _ = fs::remove_dir_all(&tmp);
            return Err(e);
        }

        if target.exists() {
            fs::remove_dir_all(&target)?;
        }
        fs::rename(&tmp, &target)?;

        debug!("Extracted archive into {:?}", target);
        Ok(target)
    }
}
