use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use report_core::EncodedArtifact;
use tempfile::NamedTempFile;
use tracing::debug;

/// Hands a finished artifact to the user.
pub trait DownloadSink {
    /// Deliver one artifact, returning where it ended up when that is known.
    fn deliver(&self, artifact: &EncodedArtifact) -> Result<Option<String>>;
}

/// Writes artifacts into a directory.
///
/// Each file is first written to a temporary file next to its destination and
/// renamed into place only once complete, so a failed write leaves nothing
/// behind.
#[derive(Debug, Clone)]
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl DownloadSink for DirectorySink {
    fn deliver(&self, artifact: &EncodedArtifact) -> Result<Option<String>> {
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create output directory: {}", self.dir.display()))?;

        let target = self.dir.join(&artifact.filename);
        let mut tmp = NamedTempFile::new_in(&self.dir)
            .with_context(|| format!("Failed to create temp file in {}", self.dir.display()))?;
        tmp.write_all(&artifact.bytes)
            .with_context(|| format!("Failed to write {}", artifact.filename))?;
        tmp.as_file()
            .sync_all()
            .with_context(|| format!("Failed to flush {}", artifact.filename))?;
        // Dropping the PersistError removes the temp file right away.
        tmp.persist(&target)
            .map_err(|e| e.error)
            .with_context(|| format!("Failed to save {}", target.display()))?;

        debug!(
            "Wrote {} ({} bytes) to {}",
            artifact.filename,
            artifact.bytes.len(),
            target.display()
        );
        Ok(Some(target.display().to_string()))
    }
}
