use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::schema::EntityType;

/// Version of the canonical entity model written into every manifest
pub const CANONICAL_MODEL_VERSION: &str = "1.0.0";

/// Prefix of every hash in the manifest
pub const HASH_PREFIX: &str = "sha256:";

/// `sha256:<hex>` of a byte slice
pub fn sha256_hex(bytes: &[u8]) -> String {
    format!("{}{:x}", HASH_PREFIX, Sha256::digest(bytes))
}

/// Digest over the sorted `name:hash` lines of a bundle
pub fn bundle_digest(artifact_hashes: &BTreeMap<String, String>) -> String {
    let mut hasher = Sha256::new();
    for (name, hash) in artifact_hashes {
        hasher.update(name.as_bytes());
        hasher.update(b":");
        hasher.update(hash.as_bytes());
        hasher.update(b"\n");
    }
    format!("{}{:x}", HASH_PREFIX, hasher.finalize())
}

/// Values injected into the manifest by the caller.
///
/// These are the only manifest fields that may differ between two exports of
/// the same input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestMeta {
    /// Export timestamp
    pub generated_at: DateTime<Utc>,
    /// Operator identity, if known
    pub operator: Option<String>,
}

impl ManifestMeta {
    /// Metadata with an explicit timestamp
    pub fn new(generated_at: DateTime<Utc>) -> Self {
        Self {
            generated_at,
            operator: None,
        }
    }

    /// Metadata stamped with the current time
    pub fn now() -> Self {
        Self::new(Utc::now())
    }

    /// Set the operator (builder pattern)
    pub fn with_operator(mut self, operator: impl Into<String>) -> Self {
        self.operator = Some(operator.into());
        self
    }
}

/// `manifest.json` of an export bundle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportManifest {
    /// Template reference (`id@version`)
    pub schema_version: String,
    /// Ruleset version applied
    pub ruleset_version: String,
    /// Canonical model version
    pub canonical_model_version: String,
    /// Export timestamp
    pub generated_at: DateTime<Utc>,
    /// Operator identity
    pub operator: Option<String>,
    /// Data rows in the source table
    pub total_rows: usize,
    /// Blocker count (always zero in an exported bundle)
    pub blockers: usize,
    /// Warning count
    pub warnings: usize,
    /// Info count
    pub info: usize,
    /// Entities per type defined by the template
    pub entity_counts: BTreeMap<EntityType, usize>,
    /// Artifact name → `sha256:<hex>`
    pub artifact_hashes: BTreeMap<String, String>,
    /// Digest over [`artifact_hashes`](Self::artifact_hashes)
    pub bundle_digest: String,
}

impl ExportManifest {
    /// Recompute the digest from the listed hashes and compare
    pub fn digest_matches(&self) -> bool {
        bundle_digest(&self.artifact_hashes) == self.bundle_digest
    }
}
