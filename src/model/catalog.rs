//! Marketplace item projection (§3) — the data shape the catalog adapter
//! (`crate::catalog`) derives from index packages. Kept separate from the
//! adapter so the pure data model has no filter/sort/cache logic attached.

use serde::{Deserialize, Serialize};

use super::{Kind, RiskLevel, Tier};
use super::intent::Publisher;

/// A browsable catalog entry, derived read-only from an `IndexPackage` (§4.5).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketplaceItem {
    pub kind: Kind,
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub publisher: Publisher,
    /// Descending by the resolver's version ordering.
    pub versions: Vec<String>,
    pub latest_version: String,
    pub risk_level: RiskLevel,
    pub tier_required: Tier,
    #[serde(default)]
    pub required_capabilities: Vec<String>,
    #[serde(default)]
    pub side_effect_types: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub categories: Vec<String>,
}

/// A filtered, sorted, paginated slice returned by `ListMarketplaceCatalog`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogPage {
    pub items: Vec<MarketplaceItem>,
    pub total: usize,
    pub page: usize,
    pub page_size: usize,
    /// Set when the page was served from a stale cache after a transport
    /// error (§4.5, §9 open question ii).
    #[serde(default)]
    pub stale: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_page_defaults_stale_to_false_on_deserialize() {
        let json = r#"{"items":[],"total":0,"page":1,"page_size":25}"#;
        let page: CatalogPage = serde_json::from_str(json).unwrap();
        assert!(!page.stale);
    }
}
