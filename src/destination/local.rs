use std::fs;
use std::path::{Path, PathBuf};

use super::Destination;
use crate::error::Result;

/// Run-scoped directory on the local filesystem.
pub struct LocalFolder {
    dir: PathBuf,
}

impl LocalFolder {
    pub fn new(base: &Path, run_folder: &str) -> Self {
        LocalFolder {
            dir: base.join(run_folder),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl Destination for LocalFolder {
    fn store(&mut self, file_name: &str, content: &[u8]) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(file_name);
        fs::write(&path, content)?;
        tracing::debug!("Saved {} ({} bytes)", path.display(), content.len());
        Ok(())
    }

    fn describe(&self) -> String {
        self.dir.display().to_string()
    }
}
