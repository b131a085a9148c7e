//! Probe-owned scratch space.
//!
//! Probes that need a file on disk (write, read back, delete) take a
//! [`ScratchSpace`] inside their own body. The directory is unique per probe
//! and removed when the value drops, so cleanup happens on success, on an
//! early `?` return, and while unwinding from a panic the harness catches.

use anyhow::{Context, Result, bail};
use std::path::{Component, Path, PathBuf};
use tempfile::TempDir;

#[derive(Debug)]
pub struct ScratchSpace {
    dir: TempDir,
}

impl ScratchSpace {
    /// Create a fresh directory whose name starts with a sanitized `label`.
    pub fn new(label: &str) -> Result<Self> {
        let prefix = format!("capprobe-{}-", sanitize_label(label));
        let dir = tempfile::Builder::new()
            .prefix(&prefix)
            .tempdir()
            .with_context(|| format!("creating scratch space for {label}"))?;
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Path of `name` inside the scratch directory.
    ///
    /// Only plain file names are accepted so a probe cannot reach outside the
    /// directory it is going to lose on drop.
    pub fn file(&self, name: &str) -> Result<PathBuf> {
        let mut components = Path::new(name).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(_)), None) => Ok(self.dir.path().join(name)),
            _ => bail!("scratch file name must be a single path component, got {name:?}"),
        }
    }

    /// Remove the directory now and surface any error instead of ignoring it.
    pub fn close(self) -> Result<()> {
        let path = self.dir.path().to_path_buf();
        self.dir
            .close()
            .with_context(|| format!("removing scratch space {}", path.display()))
    }
}

fn sanitize_label(label: &str) -> String {
    let cleaned: String = label
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .take(32)
        .collect();
    if cleaned.is_empty() {
        "probe".to_string()
    } else {
        cleaned
    }
}
