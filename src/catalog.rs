//! Catalog adapter (C5, §4.5).
//!
//! Derives browsable `MarketplaceItem`s from a raw package index, then
//! applies filter/sort/pagination. A single-entry TTL cache keyed by
//! source wraps the whole pipeline and serves stale data on a transport
//! error rather than failing outright.

use std::time::{Duration, Instant};

use crate::error::Result;
use crate::fetcher::{self, ConditionalHeaders, FetchOutcome};
use crate::model::catalog::{CatalogPage, MarketplaceItem};
use crate::model::index::{IndexPackage, PackageIndex};
use crate::model::intent::Publisher;
use crate::model::{RiskLevel, Tier};
use crate::version::{compare, ParsedVersion};

/// Catalog size cap; excess items are truncated (§4.5).
pub const MAX_CATALOG_ITEMS: usize = 5000;

const DEFAULT_PAGE_SIZE: usize = 25;
const MAX_PAGE_SIZE: usize = 100;

#[derive(Debug, Clone, Default)]
pub struct CatalogFilter {
    pub q: Option<String>,
    pub kind: Option<String>,
    pub risk: Option<String>,
    pub tier: Option<String>,
    pub publisher: Option<String>,
    pub verified: Option<bool>,
    pub capability: Option<String>,
    pub tag: Option<String>,
    pub sort: SortMode,
    pub page: usize,
    pub page_size: usize,
}

impl CatalogFilter {
    pub fn new() -> Self {
        Self {
            sort: SortMode::NameAsc,
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortMode {
    #[default]
    NameAsc,
    NameDesc,
    RiskDesc,
}

/// Derives one `MarketplaceItem` from an index package (§4.5 derivation rules).
pub fn derive_item(pkg: &IndexPackage) -> Option<MarketplaceItem> {
    let latest = latest_version(pkg)?;

    let kind = if pkg.id.starts_with("policy.") {
        crate::model::Kind::Policy
    } else if pkg.id.starts_with("template.") {
        crate::model::Kind::Template
    } else {
        crate::model::Kind::Connector
    };

    let segments: Vec<&str> = pkg.id.split('.').collect();
    let name = capitalize(segments.last().copied().unwrap_or(&pkg.id));
    let publisher_name = if segments.len() > 1 {
        capitalize(segments[1])
    } else {
        "Reach".to_string()
    };

    let key_id = latest.signature_key_id.clone().unwrap_or_default();
    let mut versions: Vec<(ParsedVersion, String)> = pkg
        .versions
        .iter()
        .filter_map(|v| ParsedVersion::parse(&v.version).ok().map(|p| (p, v.version.clone())))
        .collect();
    versions.sort_by(|a, b| compare(&b.0, &a.0));

    Some(MarketplaceItem {
        kind,
        id: pkg.id.clone(),
        name,
        description: String::new(),
        publisher: Publisher {
            name: publisher_name,
            verified: !key_id.is_empty(),
            key_id,
        },
        versions: versions.into_iter().map(|(_, raw)| raw).collect(),
        latest_version: latest.version.clone(),
        risk_level: latest.risk_level,
        tier_required: latest.tier_required,
        required_capabilities: Vec::new(),
        side_effect_types: Vec::new(),
        tags: Vec::new(),
        categories: Vec::new(),
    })
}

fn latest_version(pkg: &IndexPackage) -> Option<&crate::model::index::VersionRecord> {
    pkg.versions
        .iter()
        .filter_map(|v| ParsedVersion::parse(&v.version).ok().map(|p| (p, v)))
        .max_by(|a, b| compare(&a.0, &b.0))
        .map(|(_, v)| v)
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

/// Builds the full item list from an index, capping at `MAX_CATALOG_ITEMS`.
pub fn items_from_index(index: &PackageIndex) -> Vec<MarketplaceItem> {
    let mut items: Vec<_> = index.packages.iter().filter_map(derive_item).collect();
    if items.len() > MAX_CATALOG_ITEMS {
        let dropped = items.len() - MAX_CATALOG_ITEMS;
        tracing::warn!(dropped, cap = MAX_CATALOG_ITEMS, "truncating catalog to size cap");
        items.truncate(MAX_CATALOG_ITEMS);
    }
    items
}

/// Applies filter/sort/pagination to a pre-derived item list (§4.5).
pub fn paginate(items: &[MarketplaceItem], filter: &CatalogFilter) -> CatalogPage {
    let mut filtered: Vec<&MarketplaceItem> = items
        .iter()
        .filter(|item| matches_filter(item, filter))
        .collect();

    match filter.sort {
        SortMode::NameAsc => filtered.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase())),
        SortMode::NameDesc => filtered.sort_by(|a, b| b.name.to_lowercase().cmp(&a.name.to_lowercase())),
        SortMode::RiskDesc => filtered.sort_by(|a, b| b.risk_level.rank().cmp(&a.risk_level.rank())),
    }

    let total = filtered.len();
    let page = filter.page.max(1);
    let page_size = filter.page_size.clamp(1, MAX_PAGE_SIZE);
    let start = (page - 1) * page_size;
    let page_items: Vec<MarketplaceItem> = filtered
        .into_iter()
        .skip(start)
        .take(page_size)
        .cloned()
        .collect();

    CatalogPage {
        items: page_items,
        total,
        page,
        page_size,
        stale: false,
    }
}

fn matches_filter(item: &MarketplaceItem, filter: &CatalogFilter) -> bool {
    if let Some(q) = &filter.q {
        let q = q.to_lowercase();
        let haystack = format!("{} {} {}", item.name, item.description, item.id).to_lowercase();
        if !haystack.contains(&q) {
            return false;
        }
    }
    if let Some(kind) = &filter.kind {
        if item.kind.to_string().to_lowercase() != kind.to_lowercase() {
            return false;
        }
    }
    if let Some(risk) = &filter.risk {
        if item.risk_level.to_string().to_lowercase() != risk.to_lowercase() {
            return false;
        }
    }
    if let Some(tier) = &filter.tier {
        if item.tier_required.to_string().to_lowercase() != tier.to_lowercase() {
            return false;
        }
    }
    if let Some(publisher) = &filter.publisher {
        if item.publisher.name.to_lowercase() != publisher.to_lowercase() {
            return false;
        }
    }
    if let Some(verified) = filter.verified {
        if item.publisher.verified != verified {
            return false;
        }
    }
    if let Some(capability) = &filter.capability {
        if !item.required_capabilities.iter().any(|c| c == capability) {
            return false;
        }
    }
    if let Some(tag) = &filter.tag {
        if !item.tags.iter().any(|t| t == tag) {
            return false;
        }
    }
    true
}

/// Single-entry cache keyed by source (local path or remote URL), holding
/// the last-derived items plus conditional-GET revalidators (§4.5).
pub struct CatalogCache {
    source: String,
    items: Vec<MarketplaceItem>,
    etag: Option<String>,
    last_modified: Option<String>,
    fetched_at: Option<Instant>,
    ttl: Duration,
}

impl CatalogCache {
    pub fn empty(ttl: Duration) -> Self {
        Self {
            source: String::new(),
            items: Vec::new(),
            etag: None,
            last_modified: None,
            fetched_at: None,
            ttl,
        }
    }

    fn is_fresh(&self, source: &str) -> bool {
        self.source == source
            && self
                .fetched_at
                .is_some_and(|at| at.elapsed() < self.ttl)
    }

    fn store(&mut self, source: &str, items: Vec<MarketplaceItem>, etag: Option<String>, last_modified: Option<String>) {
        self.source = source.to_string();
        self.items = items;
        self.etag = etag;
        self.last_modified = last_modified;
        self.fetched_at = Some(Instant::now());
    }

    /// Refreshes from a local index file, skipping the network path entirely.
    pub fn refresh_local(&mut self, source: &str, index: &PackageIndex) -> &[MarketplaceItem] {
        if !self.is_fresh(source) {
            let items = items_from_index(index);
            self.store(source, items, None, None);
        }
        &self.items
    }

    /// Refreshes from a remote URL, honoring the TTL and serving stale
    /// data on a transport error rather than propagating it, as long as
    /// there's something cached to fall back to (§4.5).
    pub async fn refresh_remote(
        &mut self,
        client: &reqwest::Client,
        url: &str,
    ) -> Result<(&[MarketplaceItem], bool)> {
        if self.is_fresh(url) {
            return Ok((&self.items, false));
        }

        let conditional = ConditionalHeaders {
            if_none_match: self.etag.clone(),
            if_modified_since: self.last_modified.clone(),
        };

        match fetcher::fetch_remote(client, url, crate::fetcher::MAX_MANIFEST_BYTES * 8, Some(&conditional)).await {
            Ok(FetchOutcome::NotModified) => {
                self.fetched_at = Some(Instant::now());
                Ok((&self.items, false))
            }
            Ok(FetchOutcome::Fresh { bytes, etag, last_modified }) => {
                let index: PackageIndex = serde_json::from_slice(&bytes)?;
                let items = items_from_index(&index);
                self.store(url, items, etag, last_modified);
                Ok((&self.items, false))
            }
            Err(e) => {
                if self.source == url && !self.items.is_empty() {
                    tracing::warn!(url, error = %e, "serving stale catalog after transport error");
                    Ok((&self.items, true))
                } else {
                    Err(e)
                }
            }
        }
    }
}
