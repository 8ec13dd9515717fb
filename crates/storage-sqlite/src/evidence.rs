//! Filesystem-backed evidence store.
//!
//! Evidence bytes live on disk under a configured root directory; the
//! database only holds path references. Stored names are generated, so
//! uploads can never collide or traverse outside the root.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use log::debug;
use uuid::Uuid;

use accord_core::checkins::{EvidenceStoreTrait, StoredEvidence};
use accord_core::errors::Error;
use accord_core::Result;

pub struct FsEvidenceStore {
    root: PathBuf,
}

impl FsEvidenceStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        FsEvidenceStore { root: root.into() }
    }

    fn generated_name(file_name: &str) -> String {
        match file_name.rsplit_once('.') {
            Some((_, ext)) => format!("{}.{}", Uuid::new_v4(), ext.to_ascii_lowercase()),
            None => Uuid::new_v4().to_string(),
        }
    }
}

impl EvidenceStoreTrait for FsEvidenceStore {
    fn store(&self, file_name: &str, bytes: &[u8]) -> Result<StoredEvidence> {
        fs::create_dir_all(&self.root)
            .map_err(|e| Error::Evidence(format!("failed to create evidence dir: {e}")))?;

        let target = self.root.join(Self::generated_name(file_name));
        fs::write(&target, bytes)
            .map_err(|e| Error::Evidence(format!("failed to write {}: {e}", target.display())))?;

        debug!("Stored evidence file {} ({} bytes)", target.display(), bytes.len());
        Ok(StoredEvidence {
            path: target.to_string_lossy().to_string(),
            size_bytes: bytes.len() as i64,
        })
    }

    fn delete(&self, path: &str) -> Result<()> {
        // Only paths under the configured root are deletable.
        if !Path::new(path).starts_with(&self.root) {
            return Err(Error::Evidence(format!(
                "refusing to delete path outside evidence root: {path}"
            )));
        }
        match fs::remove_file(path) {
            Ok(()) => Ok(()),
            // Compensating deletes may retry; a missing file is already done.
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::Evidence(format!("failed to delete {path}: {e}"))),
        }
    }
}
