//! Content identity: canonical path, size, format and SHA-256 fingerprint.
//!
//! Everything here is a pure function of the file system state at call time.

use crate::error::IdentityError;
use lineage_store::{Metadata, NewDataset};
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

pub const DEFAULT_HASH_CHUNK_SIZE: usize = 4096;

/// Identity of one file at the moment it was observed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileIdentity {
    pub canonical_path: PathBuf,
    pub file_name: String,
    pub size: u64,
    pub format: Option<String>,

    /// Lowercase hex SHA-256 of the full contents
    pub fingerprint: String,
}

impl FileIdentity {
    #[must_use]
    pub fn filepath(&self) -> String {
        self.canonical_path.to_string_lossy().into_owned()
    }

    #[must_use]
    pub fn into_new_dataset(self, metadata: Option<Metadata>) -> NewDataset {
        NewDataset::new(self.filepath(), self.fingerprint, self.size)
            .with_format(self.format)
            .with_metadata(metadata)
    }
}

pub fn identify(path: impl AsRef<Path>) -> Result<FileIdentity, IdentityError> {
    let canonical = canonical_path(path)?;
    identify_canonical(&canonical, DEFAULT_HASH_CHUNK_SIZE)
}

/// Identify a path that is already canonical.
pub(crate) fn identify_canonical(
    canonical: &Path,
    chunk_size: usize,
) -> Result<FileIdentity, IdentityError> {
    let meta =
        std::fs::metadata(canonical).map_err(|err| IdentityError::from_io(canonical, err))?;
    if !meta.is_file() {
        return Err(IdentityError::NotAFile(canonical.to_path_buf()));
    }

    let fingerprint = fingerprint_file(canonical, chunk_size)?;
    let file_name = canonical
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();

    Ok(FileIdentity {
        canonical_path: canonical.to_path_buf(),
        file_name,
        size: meta.len(),
        format: file_format(canonical),
        fingerprint,
    })
}

/// Absolute path with symlinks resolved; `NotFound` when missing.
pub fn canonical_path(path: impl AsRef<Path>) -> Result<PathBuf, IdentityError> {
    let path = path.as_ref();
    std::fs::canonicalize(path).map_err(|err| IdentityError::from_io(path, err))
}

/// Stream the file through SHA-256 in `chunk_size` pieces.
pub fn fingerprint_file(path: &Path, chunk_size: usize) -> Result<String, IdentityError> {
    let file = File::open(path).map_err(|err| IdentityError::from_io(path, err))?;
    fingerprint_reader(file, chunk_size).map_err(|source| IdentityError::Io {
        path: path.to_path_buf(),
        source,
    })
}

pub fn fingerprint_reader<R: Read>(mut reader: R, chunk_size: usize) -> io::Result<String> {
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; chunk_size.max(1)];
    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(err),
        };
        hasher.update(&buf[..n]);
    }
    Ok(format!("{:x}", hasher.finalize()))
}

/// Lower-cased extension without the dot.
#[must_use]
pub fn file_format(path: &Path) -> Option<String> {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .filter(|ext| !ext.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn fingerprint_matches_known_digest() {
        let digest = fingerprint_reader(&b"Hello, World!"[..], 4).unwrap();
        assert_eq!(
            digest,
            "dffd6021bb2bd5b0af676290809ec3a53191dd81c7f70a4b28688a362182986f"
        );
    }

    #[test]
    fn chunk_size_does_not_change_the_digest() {
        let data = vec![7u8; 10_000];
        let small = fingerprint_reader(&data[..], 3).unwrap();
        let large = fingerprint_reader(&data[..], 8192).unwrap();
        assert_eq!(small, large);
    }

    #[test]
    fn identify_reports_size_and_lowercased_format() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("Report.CSV");
        fs::write(&path, "a,b\n1,2\n").unwrap();

        let id = identify(&path).unwrap();
        assert_eq!(id.size, 8);
        assert_eq!(id.format.as_deref(), Some("csv"));
        assert_eq!(id.file_name, "Report.CSV");
        assert!(id.canonical_path.is_absolute());
        assert_eq!(id.fingerprint.len(), 64);
    }

    #[test]
    fn no_extension_means_no_format() {
        assert_eq!(file_format(Path::new("/data/Makefile")), None);
        assert_eq!(file_format(Path::new("/data/archive.tar.GZ")).as_deref(), Some("gz"));
    }

    #[test]
    fn missing_file_is_not_found() {
        let tmp = TempDir::new().unwrap();
        let err = identify(tmp.path().join("nope.csv")).unwrap_err();
        assert!(matches!(err, IdentityError::NotFound(_)), "got {err}");
    }

    #[test]
    fn directory_is_not_a_file() {
        let tmp = TempDir::new().unwrap();
        let err = identify(tmp.path()).unwrap_err();
        assert!(matches!(err, IdentityError::NotAFile(_)), "got {err}");
    }
}
