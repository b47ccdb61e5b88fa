//! Write-then-rename output files

use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use super::SinkError;

/// An output written to a sibling `.tmp` file and renamed over the target on
/// commit. Readers never observe a partially written file.
pub(crate) struct AtomicFile {
    path: PathBuf,
    tmp: PathBuf,
    committed: bool,
}

impl AtomicFile {
    pub(crate) fn create(path: &Path) -> Result<Self, SinkError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| SinkError::io(parent, e))?;
        }
        let mut tmp = path.as_os_str().to_owned();
        tmp.push(".tmp");
        Ok(Self {
            path: path.to_path_buf(),
            tmp: PathBuf::from(tmp),
            committed: false,
        })
    }

    pub(crate) fn tmp_path(&self) -> &Path {
        &self.tmp
    }

    pub(crate) fn writer(&self) -> Result<BufWriter<File>, SinkError> {
        let file = File::create(&self.tmp).map_err(|e| SinkError::io(&self.tmp, e))?;
        Ok(BufWriter::new(file))
    }

    pub(crate) fn commit(mut self) -> Result<(), SinkError> {
        fs::rename(&self.tmp, &self.path).map_err(|e| SinkError::io(&self.path, e))?;
        self.committed = true;
        Ok(())
    }
}

impl Drop for AtomicFile {
    fn drop(&mut self) {
        if !self.committed {
            let _ = fs::remove_file(&self.tmp);
        }
    }
}
