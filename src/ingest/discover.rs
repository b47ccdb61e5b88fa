//! Source file discovery

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use super::error::IngestError;

/// A discovered source file
#[derive(Debug, Clone)]
pub struct DiscoveredFile {
    /// Path to the file
    pub path: PathBuf,
    /// File size in bytes
    pub size: u64,
    /// Content hash (if computed)
    pub content_hash: Option<String>,
}

impl DiscoveredFile {
    pub fn new(path: PathBuf, size: u64) -> Self {
        Self {
            path,
            size,
            content_hash: None,
        }
    }

    /// File name recorded as provenance on every row
    pub fn origin_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }

    /// Compute and cache the content hash
    pub fn compute_hash(&mut self) -> Result<&str, IngestError> {
        let hash = match self.content_hash.take() {
            Some(hash) => hash,
            None => {
                let content = fs::read(&self.path)?;
                format!("{:x}", Sha256::digest(&content))
            }
        };
        Ok(self.content_hash.insert(hash))
    }
}

/// Discover files matching one pattern in a local directory, sorted by path
pub fn discover_local_files(
    base_path: &Path,
    pattern: &str,
) -> Result<Vec<DiscoveredFile>, IngestError> {
    let mut files = Vec::new();

    let full_pattern = if Path::new(pattern).is_absolute() {
        pattern.to_string()
    } else {
        let base = glob::Pattern::escape(&base_path.to_string_lossy());
        format!("{base}/{pattern}")
    };

    let entries = glob::glob(&full_pattern)
        .map_err(|e| IngestError::InvalidPattern(format!("{}: {}", pattern, e)))?;

    for entry in entries {
        let path = entry.map_err(|e| IngestError::SourceNotAccessible {
            path: e.path().to_path_buf(),
            reason: e.error().to_string(),
        })?;
        if path.is_file() {
            let metadata = fs::metadata(&path)?;
            files.push(DiscoveredFile::new(path, metadata.len()));
        }
    }

    files.sort_by(|a, b| a.path.cmp(&b.path));

    Ok(files)
}

/// Discover source files for every pattern.
///
/// Patterns are applied in order; files within a pattern are sorted by path, and a
/// file matched by more than one pattern is kept at its first position.
pub fn discover_sources(
    source_dir: &Path,
    patterns: &[String],
) -> Result<Vec<DiscoveredFile>, IngestError> {
    if !source_dir.is_dir() {
        return Err(IngestError::SourceNotAccessible {
            path: source_dir.to_path_buf(),
            reason: "not a directory".to_string(),
        });
    }

    let mut seen = HashSet::new();
    let mut files = Vec::new();
    for pattern in patterns {
        for file in discover_local_files(source_dir, pattern)? {
            if seen.insert(file.path.clone()) {
                files.push(file);
            }
        }
    }

    Ok(files)
}

/// SHA-256 over the names and content hashes of all files, in read order.
///
/// Two runs over the same drop directory contents produce the same digest.
pub fn source_digest(files: &mut [DiscoveredFile]) -> Result<String, IngestError> {
    let mut hasher = Sha256::new();
    for file in files.iter_mut() {
        let name = file.origin_name();
        hasher.update(name.as_bytes());
        hasher.update([0]);
        hasher.update(file.compute_hash()?.as_bytes());
        hasher.update([b'\n']);
    }
    Ok(format!("{:x}", hasher.finalize()))
}
