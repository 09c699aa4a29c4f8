//! Machine image resolution with a bounded in-process cache.
//!
//! A short query such as `canonical:ubuntu:jammy` is turned into a catalog
//! lookup (owner account, name pattern, architecture, virtualization and
//! root-device store). Results are sorted newest first and memoized per
//! canonical query string.

pub mod cache;

use crate::mapping::{MappingError, MappingResult};
use anyhow::Result;
use cache::BoundedCache;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tracing::debug;

const ARCHITECTURES: &[&str] = &["x86_64", "arm64", "i386"];
const VIRTUALIZATIONS: &[&str] = &["hvm", "paravirtual"];
const STORES: &[&str] = &["ebs", "instance-store"];

/// Known image publishers: (platform, owner account id, default distribution)
const PLATFORMS: &[(&str, &str, &str)] = &[
    ("canonical", "099720109477", "ubuntu"),
    ("redhat", "309956199498", "rhel"),
    ("debian", "136693071363", "debian"),
    ("amazonlinux", "137112412989", "amzn2"),
    ("suse", "013907871322", "suse-sles"),
    ("windows", "801119661308", "windows"),
];

/// Structured image query
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ImageQuery {
    pub platform: String,
    pub distribution: String,
    pub variant: Option<String>,
    pub architecture: String,
    pub virtualization: String,
    pub store: String,
}

impl ImageQuery {
    pub fn owner_id(&self) -> &'static str {
        PLATFORMS
            .iter()
            .find(|(name, _, _)| *name == self.platform)
            .map(|(_, owner, _)| *owner)
            .unwrap_or_default()
    }

    /// Image name pattern understood by the catalog
    pub fn name_pattern(&self) -> String {
        let variant = self.variant.as_deref().unwrap_or("*");
        match self.platform.as_str() {
            "canonical" => format!("{}/images/*{}-{}-*", self.distribution, self.distribution, variant),
            _ => format!("{}-{}*", self.distribution, variant),
        }
    }

    pub fn filter(&self) -> CatalogFilter {
        CatalogFilter {
            owner_id: self.owner_id().to_string(),
            name_pattern: self.name_pattern(),
            architecture: self.architecture.clone(),
            virtualization: self.virtualization.clone(),
            store: self.store.clone(),
        }
    }
}

impl FromStr for ImageQuery {
    type Err = MappingError;

    /// Parse `platform[:distribution[:variant]][:arch][:virtualization][:store]`.
    /// Architecture, virtualization and store are recognised by value and may
    /// appear in any position after the platform.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut tokens = s.split(':').map(str::trim).filter(|t| !t.is_empty());

        let platform = tokens
            .next()
            .map(str::to_ascii_lowercase)
            .ok_or_else(|| MappingError::Resolve("empty image query".to_string()))?;
        let default_distribution = PLATFORMS
            .iter()
            .find(|(name, _, _)| *name == platform)
            .map(|(_, _, distribution)| *distribution)
            .ok_or_else(|| {
                let known: Vec<&str> = PLATFORMS.iter().map(|(name, _, _)| *name).collect();
                MappingError::Resolve(format!(
                    "unknown platform '{}' (known: {})",
                    platform,
                    known.join(", ")
                ))
            })?;

        let mut query = ImageQuery {
            distribution: default_distribution.to_string(),
            platform,
            variant: None,
            architecture: ARCHITECTURES[0].to_string(),
            virtualization: VIRTUALIZATIONS[0].to_string(),
            store: STORES[0].to_string(),
        };

        let mut positional = Vec::new();
        for token in tokens {
            let lower = token.to_ascii_lowercase();
            if ARCHITECTURES.contains(&lower.as_str()) {
                query.architecture = lower;
            } else if VIRTUALIZATIONS.contains(&lower.as_str()) {
                query.virtualization = lower;
            } else if STORES.contains(&lower.as_str()) {
                query.store = lower;
            } else {
                positional.push(token.to_string());
            }
        }

        let mut positional = positional.into_iter();
        if let Some(distribution) = positional.next() {
            query.distribution = distribution;
        }
        query.variant = positional.next();
        if let Some(extra) = positional.next() {
            return Err(MappingError::Resolve(format!(
                "unexpected token '{}' in image query '{}'",
                extra, s
            )));
        }

        Ok(query)
    }
}

impl fmt::Display for ImageQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.platform, self.distribution)?;
        if let Some(variant) = &self.variant {
            write!(f, ":{}", variant)?;
        }
        write!(
            f,
            ":{}:{}:{}",
            self.architecture, self.virtualization, self.store
        )
    }
}

/// Provider-side lookup parameters derived from an [`ImageQuery`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogFilter {
    pub owner_id: String,
    pub name_pattern: String,
    pub architecture: String,
    pub virtualization: String,
    pub store: String,
}

/// One machine image as listed by the provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ImageRecord {
    pub id: String,
    pub name: String,
    pub owner_id: String,
    pub architecture: String,
    pub virtualization: String,
    pub store: String,
    pub created_at: DateTime<Utc>,
}

impl ImageRecord {
    fn matches(&self, filter: &CatalogFilter) -> bool {
        self.architecture.eq_ignore_ascii_case(&filter.architecture)
            && self.virtualization.eq_ignore_ascii_case(&filter.virtualization)
            && self.store.eq_ignore_ascii_case(&filter.store)
    }
}

/// Source of image listings (the provider API in production)
pub trait ImageCatalog: Send + Sync {
    fn fetch(&self, filter: &CatalogFilter) -> Result<Vec<ImageRecord>>;
}

/// Memoizing image resolver.
///
/// The cache lock is held across the whole get-or-fetch sequence, so
/// concurrent resolutions of the same query fetch only once.
pub struct Resolver {
    catalog: Arc<dyn ImageCatalog>,
    cache: Mutex<BoundedCache<Vec<ImageRecord>>>,
}

impl Resolver {
    pub fn new(catalog: Arc<dyn ImageCatalog>, capacity: usize, ttl: Option<Duration>) -> Self {
        Self {
            catalog,
            cache: Mutex::new(BoundedCache::new(capacity, ttl)),
        }
    }

    /// Resolve `query`, returning the matching images (newest first) and
    /// whether they came from the cache
    pub fn resolve(&self, query: &ImageQuery) -> MappingResult<(Vec<ImageRecord>, bool)> {
        let key = query.to_string();
        let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(records) = cache.get(&key) {
            debug!(query = %key, "image query served from cache");
            return Ok((records, true));
        }

        let filter = query.filter();
        let mut records: Vec<ImageRecord> = self
            .catalog
            .fetch(&filter)
            .map_err(|e| MappingError::Resolve(format!("{}: {:#}", key, e)))?
            .into_iter()
            .filter(|record| record.matches(&filter))
            .collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        debug!(query = %key, found = records.len(), "image query fetched");
        cache.insert(key, records.clone());
        Ok((records, false))
    }
}
