// Generation manifest: describes and checksums the three artifacts of one build
use chrono::{DateTime, Utc};
use foodvec_core::{Error, IndexBundle, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

pub const MANIFEST_FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactChecksums {
    pub question_map: String,
    pub food_id_map: String,
    pub index: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub format_version: u32,
    pub generation: String,
    pub created_at: DateTime<Utc>,
    pub dimension: usize,
    pub rows: usize,
    pub checksums: ArtifactChecksums,
}

impl Manifest {
    pub fn new(
        generation: String,
        bundle: &IndexBundle,
        question_map: &[u8],
        food_id_map: &[u8],
        index: &[u8],
    ) -> Self {
        Self {
            format_version: MANIFEST_FORMAT_VERSION,
            generation,
            created_at: Utc::now(),
            dimension: bundle.dim(),
            rows: bundle.len(),
            checksums: ArtifactChecksums {
                question_map: sha256_hex(question_map),
                food_id_map: sha256_hex(food_id_map),
                index: sha256_hex(index),
            },
        }
    }

    pub fn to_json(&self) -> Result<Vec<u8>> {
        serde_json::to_vec_pretty(self).map_err(|e| Error::Serialization(e.to_string()))
    }

    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        let manifest: Manifest = serde_json::from_slice(bytes)
            .map_err(|e| Error::ArtifactLoad(format!("manifest is corrupt: {}", e)))?;
        if manifest.format_version != MANIFEST_FORMAT_VERSION {
            return Err(Error::ArtifactLoad(format!(
                "unsupported manifest format version {}",
                manifest.format_version
            )));
        }
        Ok(manifest)
    }

    /// Check an artifact's bytes against the recorded checksum
    pub fn verify(expected: &str, artifact: &str, bytes: &[u8]) -> Result<()> {
        let actual = sha256_hex(bytes);
        if actual != expected {
            return Err(Error::ArtifactLoad(format!(
                "{} checksum mismatch: manifest has {}, file has {}",
                artifact, expected, actual
            )));
        }
        Ok(())
    }

    /// Check the decoded bundle has the shape the manifest recorded
    pub fn check_bundle(&self, bundle: &IndexBundle) -> Result<()> {
        if bundle.dim() != self.dimension || bundle.len() != self.rows {
            return Err(Error::ArtifactLoad(format!(
                "manifest records {} rows x {} dims, artifacts hold {} x {}",
                self.rows,
                self.dimension,
                bundle.len(),
                bundle.dim()
            )));
        }
        Ok(())
    }
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256_hex() {
        assert_eq!(
            sha256_hex(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_verify_mismatch() {
        let sum = sha256_hex(b"abc");
        assert!(Manifest::verify(&sum, "index", b"abc").is_ok());
        assert!(matches!(
            Manifest::verify(&sum, "index", b"abd"),
            Err(Error::ArtifactLoad(_))
        ));
    }

    #[test]
    fn test_from_json_rejects_garbage() {
        assert!(matches!(Manifest::from_json(b"{"), Err(Error::ArtifactLoad(_))));
    }
}
