//! # Catalog Synchronization
//!
//! Merges staged uploads into the in-memory view of the device's catalogs so
//! the host's display matches device reality without a full re-scan.
//!
//! Sync is best-effort by contract: the transfer itself already succeeded,
//! and a display-refresh problem must never turn it into a reported failure.
//! Every path in here either works or logs and returns.

use core_metadata::DeviceMetadata;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info};

/// One book as the device catalog sees it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    /// Device-relative logical path.
    pub lpath: String,
    pub title: String,
    pub authors: Vec<String>,
    pub uuid: String,
    pub extension: String,
    pub size: u64,
    /// Whether the entry is known to the host library. Must be set on every
    /// merged entry — display layers read it unconditionally on freshly
    /// added rows.
    pub in_library: bool,
}

impl CatalogEntry {
    fn from_upload(lpath: &str, metadata: &DeviceMetadata) -> Self {
        Self {
            lpath: lpath.to_string(),
            title: metadata.title.clone(),
            authors: metadata.authors.clone(),
            uuid: metadata.uuid.clone(),
            extension: metadata.extension.clone(),
            size: metadata.size,
            in_library: true,
        }
    }
}

/// The three parallel catalogs mirroring the device's storage partitions.
///
/// Uploads land in main storage; the slot lists mirror removable partitions
/// for the display layer. Mutated only after a batch fully returns, never
/// concurrently with an in-flight transfer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BookLists {
    pub main: Vec<CatalogEntry>,
    pub slot_a: Vec<CatalogEntry>,
    pub slot_b: Vec<CatalogEntry>,
}

/// Best-effort merge of staged uploads into the device book lists.
pub struct CatalogSyncer;

impl CatalogSyncer {
    /// Merges `(lpath, metadata)` pairs from a completed batch into the main
    /// catalog.
    ///
    /// A `None` booklist means the device connection is gone; the merge
    /// silently becomes a no-op. Entries with an lpath already present
    /// replace the stale entry instead of appending a duplicate.
    pub async fn merge_uploads(
        booklists: Option<&RwLock<BookLists>>,
        staged: &[(String, DeviceMetadata)],
    ) {
        let Some(booklists) = booklists else {
            debug!("book lists unavailable, skipping catalog sync");
            return;
        };
        if staged.is_empty() {
            return;
        }

        let mut lists = booklists.write().await;
        for (lpath, metadata) in staged {
            let entry = CatalogEntry::from_upload(lpath, metadata);
            match lists.main.iter_mut().find(|e| &e.lpath == lpath) {
                Some(existing) => *existing = entry,
                None => lists.main.push(entry),
            }
        }

        info!(merged = staged.len(), "catalog sync complete");
    }
}
