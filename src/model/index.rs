//! The package index (`index.json`, §6) and its version records.

use serde::{Deserialize, Serialize};

use super::{RiskLevel, Tier};

/// Top-level index document: `{"packages": [...]}`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PackageIndex {
    pub packages: Vec<IndexPackage>,
}

/// One package entry: a stable id plus an ordered list of version records.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexPackage {
    pub id: String,
    pub versions: Vec<VersionRecord>,
}

/// A single published version of a package (§3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionRecord {
    pub version: String,
    pub sha256: String,
    pub manifest_url: String,
    pub bundle_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature_key_id: Option<String>,
    pub risk_level: RiskLevel,
    pub tier_required: Tier,
}

impl PackageIndex {
    /// Finds a package entry by id.
    pub fn find(&self, id: &str) -> Option<&IndexPackage> {
        self.packages.iter().find(|p| p.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_a_minimal_index_document() {
        let raw = format!(
            r#"{{
                "packages": [
                    {{
                        "id": "conn.github",
                        "versions": [
                            {{
                                "version": "1.0.0",
                                "sha256": "{}",
                                "manifest_url": "conn.github/1.0.0/manifest.json",
                                "bundle_url": "conn.github/1.0.0/bundle.tgz",
                                "risk_level": "low",
                                "tier_required": "none"
                            }}
                        ]
                    }}
                ]
            }}"#,
            "a".repeat(64)
        );

        let index: PackageIndex = serde_json::from_str(&raw).unwrap();
        assert_eq!(index.packages.len(), 1);
        assert_eq!(index.find("conn.github").unwrap().versions[0].version, "1.0.0");
        assert!(index.find("missing").is_none());
    }
}
