//! Version resolver (C1, §4.1).
//!
//! `semver` handles parsing `(major, minor, patch)` and the pre-release
//! string; the range grammar itself (`""`, `">=X.Y.Z"`, `"<X.Y.Z"`,
//! `"=X.Y.Z"`) is bespoke — the spec's constraint language is narrower
//! than anything `semver::VersionReq` expresses, and deliberately so
//! (§9: ordering must stay total even for non-standard pre-release
//! suffixes, which `semver`'s own `Ord` impl does not guarantee across
//! all inputs we need to accept).

use semver::Version;
use std::cmp::Ordering;

use crate::error::{RegistryError, Result};
use crate::model::index::{IndexPackage, VersionRecord};

/// A parsed constraint from the grammar in §4.1.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Constraint {
    Any,
    Exact(ParsedVersion),
    AtLeast(ParsedVersion),
    LessThan(ParsedVersion),
}

/// `(major, minor, patch, pre)` — parsed once so comparisons don't re-parse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedVersion {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
    pub pre: String,
    pub raw: String,
}

impl ParsedVersion {
    pub fn parse(raw: &str) -> Result<Self> {
        let v = Version::parse(raw)
            .map_err(|e| RegistryError::InvalidManifest(format!("invalid version {raw}: {e}")))?;
        Ok(Self {
            major: v.major,
            minor: v.minor,
            patch: v.patch,
            pre: v.pre.to_string(),
            raw: raw.to_string(),
        })
    }
}

/// Ordering used for both constraint comparisons and `latest_version`
/// selection (§4.1, §4.5): numeric `(major, minor, patch)`, then
/// lexicographic string comparison on the pre-release suffix. An absent
/// pre-release (`""`) sorts after any non-empty suffix, matching normal
/// semver precedence (1.0.0 > 1.0.0-rc1).
pub fn compare(a: &ParsedVersion, b: &ParsedVersion) -> Ordering {
    (a.major, a.minor, a.patch)
        .cmp(&(b.major, b.minor, b.patch))
        .then_with(|| match (a.pre.is_empty(), b.pre.is_empty()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Greater,
            (false, true) => Ordering::Less,
            (false, false) => a.pre.cmp(&b.pre),
        })
}

impl Constraint {
    /// Parses the grammar described in §4.1. Empty string means "any".
    pub fn parse(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        if raw.is_empty() || raw == ">=0.0.0" {
            return Ok(Constraint::Any);
        }
        if let Some(rest) = raw.strip_prefix(">=") {
            return Ok(Constraint::AtLeast(ParsedVersion::parse(rest.trim())?));
        }
        if let Some(rest) = raw.strip_prefix('=') {
            return Ok(Constraint::Exact(ParsedVersion::parse(rest.trim())?));
        }
        if let Some(rest) = raw.strip_prefix('<') {
            return Ok(Constraint::LessThan(ParsedVersion::parse(rest.trim())?));
        }
        Err(RegistryError::InvalidManifest(format!(
            "unsupported version constraint: {raw}"
        )))
    }

    fn satisfies(&self, candidate: &ParsedVersion) -> bool {
        match self {
            Constraint::Any => true,
            Constraint::Exact(v) => compare(candidate, v) == Ordering::Equal,
            Constraint::AtLeast(v) => compare(candidate, v) != Ordering::Less,
            Constraint::LessThan(v) => compare(candidate, v) == Ordering::Less,
        }
    }
}

/// Resolves `constraint` against `pkg`'s version list, returning the
/// highest-satisfying record. Ties (equal version, distinct index
/// position) are broken by order of appearance (§4.1).
pub fn resolve<'a>(pkg: &'a IndexPackage, constraint: &str) -> Result<&'a VersionRecord> {
    let constraint = Constraint::parse(constraint)?;
    let mut best: Option<(ParsedVersion, &VersionRecord)> = None;

    for record in &pkg.versions {
        let parsed = match ParsedVersion::parse(&record.version) {
            Ok(p) => p,
            Err(_) => continue,
        };
        if !constraint.satisfies(&parsed) {
            continue;
        }
        let better = match &best {
            None => true,
            Some((current, _)) => compare(&parsed, current) == Ordering::Greater,
        };
        if better {
            best = Some((parsed, record));
        }
    }

    best.map(|(_, record)| record).ok_or_else(|| RegistryError::VersionNotFound {
        id: pkg.id.clone(),
        constraint: constraint_display(&constraint),
    })
}

fn constraint_display(c: &Constraint) -> String {
    match c {
        Constraint::Any => ">=0.0.0".to_string(),
        Constraint::Exact(v) => format!("={}", v.raw),
        Constraint::AtLeast(v) => format!(">={}", v.raw),
        Constraint::LessThan(v) => format!("<{}", v.raw),
    }
}
