use crate::error::{IdentityError, Result};
use crate::identity::fingerprint_file;
use lineage_store::{Dataset, ProvenanceStore};
use serde::Serialize;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum VerificationStatus {
    Verified,
    Modified { current_hash: String },
    Missing,
    Unreadable { error: String },
}

impl VerificationStatus {
    #[must_use]
    pub const fn is_verified(&self) -> bool {
        matches!(self, Self::Verified)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DatasetVerification {
    pub dataset_id: String,
    pub filepath: String,
    pub recorded_hash: String,
    #[serde(flatten)]
    pub status: VerificationStatus,
}

/// Re-hash the file behind a dataset record and compare fingerprints.
pub fn verify_dataset(dataset: &Dataset, chunk_size: usize) -> DatasetVerification {
    let status = match fingerprint_file(Path::new(&dataset.filepath), chunk_size) {
        Ok(hash) if hash == dataset.hash => VerificationStatus::Verified,
        Ok(hash) => VerificationStatus::Modified { current_hash: hash },
        Err(IdentityError::NotFound(_)) => VerificationStatus::Missing,
        Err(err) => VerificationStatus::Unreadable {
            error: err.to_string(),
        },
    };

    DatasetVerification {
        dataset_id: dataset.id.clone(),
        filepath: dataset.filepath.clone(),
        recorded_hash: dataset.hash.clone(),
        status,
    }
}

/// Verify every dataset in the store, newest first.
pub fn verify_store(
    store: &ProvenanceStore,
    chunk_size: usize,
) -> Result<Vec<DatasetVerification>> {
    let results: Vec<_> = store
        .all_datasets()?
        .iter()
        .map(|dataset| verify_dataset(dataset, chunk_size))
        .collect();

    let failed = results.iter().filter(|r| !r.status.is_verified()).count();
    if failed > 0 {
        log::warn!("{failed} of {} dataset(s) failed verification", results.len());
    } else {
        log::info!("All {} dataset(s) verified", results.len());
    }
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::fs;
    use tempfile::TempDir;

    fn dataset(path: &Path, hash: &str) -> Dataset {
        Dataset {
            id: "ds".to_string(),
            filepath: path.to_string_lossy().into_owned(),
            hash: hash.to_string(),
            size: 0,
            format: None,
            created_at: Utc::now(),
            metadata: None,
        }
    }

    #[test]
    fn matching_hash_is_verified() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("hello.txt");
        fs::write(&path, "Hello, World!").unwrap();

        let ds = dataset(
            &path,
            "dffd6021bb2bd5b0af676290809ec3a53191dd81c7f70a4b28688a362182986f",
        );
        assert_eq!(verify_dataset(&ds, 4096).status, VerificationStatus::Verified);
    }

    #[test]
    fn changed_and_missing_files_are_reported() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("data.csv");
        fs::write(&path, "x").unwrap();

        let ds = dataset(&path, "0000");
        assert!(matches!(
            verify_dataset(&ds, 7).status,
            VerificationStatus::Modified { .. }
        ));

        fs::remove_file(&path).unwrap();
        assert_eq!(verify_dataset(&ds, 4096).status, VerificationStatus::Missing);
    }

    #[test]
    fn status_serializes_with_a_tag() {
        let json = serde_json::to_value(VerificationStatus::Missing).unwrap();
        assert_eq!(json["status"], "missing");
    }
}
