//! Per-run working directory management.
//!
//! Each run gets a timestamped directory under the results root holding
//! the transient per-slide images, audio and video. Intermediates are
//! registered as they are produced and removed once superseded; cleanup
//! on failure paths is best-effort. Two concurrent runs must use
//! distinct results roots; run isolation is the caller's responsibility.

use std::path::{Path, PathBuf};

use chrono::Local;
use log::{debug, warn};

use crate::error::Result;

/// Working directory of one lecture run.
pub struct RunWorkspace {
    dir: PathBuf,
    intermediates: Vec<PathBuf>,
    scratch_dirs: Vec<PathBuf>,
}

impl RunWorkspace {
    /// Create `<results_root>/lecture_<timestamp>/`.
    pub fn create(results_root: &Path) -> Result<Self> {
        let name = format!("lecture_{}", Local::now().format("%Y%m%d_%H%M%S"));
        let dir = results_root.join(name);
        std::fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            intermediates: Vec::new(),
            scratch_dirs: Vec::new(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path inside the run directory.
    pub fn path(&self, file_name: &str) -> PathBuf {
        self.dir.join(file_name)
    }

    /// Register a transient file for end-of-run cleanup.
    pub fn track(&mut self, path: &Path) {
        self.intermediates.push(path.to_path_buf());
    }

    /// Register a generator-reported scratch directory for cleanup.
    pub fn track_scratch_dirs(&mut self, dirs: &[PathBuf]) {
        self.scratch_dirs.extend_from_slice(dirs);
    }

    /// Remove one intermediate file right away (it has been superseded).
    pub fn remove_now(&mut self, path: &Path) {
        if path.exists() {
            if let Err(e) = std::fs::remove_file(path) {
                warn!("could not remove intermediate {}: {e}", path.display());
                return;
            }
            debug!("removed intermediate {}", path.display());
        }
        self.intermediates.retain(|p| p != path);
    }

    /// Best-effort removal of everything still registered.
    pub fn cleanup(&mut self) {
        for path in self.intermediates.drain(..) {
            if path.exists() {
                if let Err(e) = std::fs::remove_file(&path) {
                    warn!("could not remove intermediate {}: {e}", path.display());
                }
            }
        }
        for dir in self.scratch_dirs.drain(..) {
            if dir.exists() {
                if let Err(e) = std::fs::remove_dir_all(&dir) {
                    warn!("could not remove scratch dir {}: {e}", dir.display());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_workspace_lifecycle() {
        let root = tempfile::tempdir().unwrap();
        let mut ws = RunWorkspace::create(root.path()).unwrap();
        assert!(ws.dir().exists());
        assert!(ws
            .dir()
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("lecture_"));

        let audio = ws.path("narration_01.wav");
        std::fs::write(&audio, b"wav").unwrap();
        ws.track(&audio);

        let image = ws.path("slide_01.png");
        std::fs::write(&image, b"png").unwrap();
        ws.track(&image);
        ws.remove_now(&image);
        assert!(!image.exists());

        let scratch = root.path().join("model_scratch");
        std::fs::create_dir_all(&scratch).unwrap();
        ws.track_scratch_dirs(&[scratch.clone()]);

        ws.cleanup();
        assert!(!audio.exists());
        assert!(!scratch.exists());
        // The run directory itself stays; it holds the final output.
        assert!(ws.dir().exists());
    }
}
