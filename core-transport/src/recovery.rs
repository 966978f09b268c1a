//! Catalog cache recovery.
//!
//! Two independent paths out of a corrupted catalog cache:
//!
//! - **Local purge**: delete every host-side copy of the catalog cache file
//!   under a fixed set of candidate directories, forcing the host to rebuild
//!   its view of the device on the next connection.
//! - **Remote reset**: overwrite the device-side catalog file with an empty
//!   list, then delete it. The ordinary driver API cannot target the catalog
//!   file, so this path deliberately abuses the normal transfer opcode: it
//!   fabricates a one-file `SEND_BOOK` exchange whose target lpath IS the
//!   catalog filename.
//!
//! The remote exchange is protocol-version-fragile: it depends on the
//! device's current acknowledgement semantics (`wants_send_ok`), and any
//! change to them invalidates it. When the device acknowledges with a
//! corrected lpath, that path is trusted without re-verification and the
//! follow-up delete targets it.

use std::path::PathBuf;
use std::sync::Arc;

use core_runtime::events::{CoreEvent, EventBus, RecoveryEvent};
use tracing::{debug, info};

use crate::client::TransportClient;
use crate::error::{Result, TransportError};
use crate::protocol::{LOCAL_CATALOG_CACHE, REMOTE_CATALOG_CANDIDATES};

/// Result of a local cache purge. File-not-found is neither a deletion nor a
/// failure; purging a tree that contains no catalog cache reports both lists
/// empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PurgeReport {
    /// Cache files that were deleted.
    pub deleted: Vec<PathBuf>,
    /// Cache files that could not be deleted, with the reason.
    pub failed: Vec<(PathBuf, String)>,
}

/// Recovery operations over one device session.
pub struct CacheRecovery {
    client: Arc<TransportClient>,
    event_bus: Arc<EventBus>,
}

impl CacheRecovery {
    pub fn new(client: Arc<TransportClient>, event_bus: Arc<EventBus>) -> Self {
        Self { client, event_bus }
    }

    /// Deletes every host-side catalog cache copy under the candidate
    /// directories.
    ///
    /// Directories that cannot be read are skipped; a file that disappears
    /// between scan and delete is not an error. After the purge a best-effort
    /// message asks the device to rebuild its wireless catalog.
    pub async fn purge_local_cache(&self, candidate_dirs: &[PathBuf]) -> PurgeReport {
        let mut report = PurgeReport::default();

        for dir in candidate_dirs {
            let mut stack = vec![dir.clone()];
            while let Some(current) = stack.pop() {
                let mut entries = match tokio::fs::read_dir(&current).await {
                    Ok(entries) => entries,
                    Err(e) => {
                        debug!(dir = %current.display(), error = %e, "skipping unreadable directory");
                        continue;
                    }
                };

                while let Ok(Some(entry)) = entries.next_entry().await {
                    let path = entry.path();
                    let Ok(file_type) = entry.file_type().await else {
                        continue;
                    };

                    if file_type.is_dir() {
                        stack.push(path);
                    } else if entry.file_name() == LOCAL_CATALOG_CACHE {
                        match tokio::fs::remove_file(&path).await {
                            Ok(()) => report.deleted.push(path),
                            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                            Err(e) => report.failed.push((path, e.to_string())),
                        }
                    }
                }
            }
        }

        info!(
            deleted = report.deleted.len(),
            failed = report.failed.len(),
            "local catalog cache purge finished"
        );

        self.event_bus
            .emit(CoreEvent::Recovery(RecoveryEvent::LocalCachePurged {
                deleted: report.deleted.len() as u64,
                failed: report.failed.len() as u64,
            }))
            .ok();

        // Best-effort nudge on the device display; purging locally is only
        // half of the recovery.
        let _ = self
            .client
            .driver()
            .show_message("Host catalog cache cleared. Run the wireless catalog reset to rebuild.")
            .await;

        report
    }

    /// Finds the catalog file on the device by probing the candidate names.
    pub async fn locate_remote_catalog(&self) -> Option<String> {
        for candidate in REMOTE_CATALOG_CANDIDATES {
            if self.client.fetch_exists(candidate).await {
                return Some(candidate.to_string());
            }
        }
        None
    }

    /// Overwrites the device catalog with an empty list, then deletes it.
    ///
    /// Returns the lpath that was reset (the device-corrected path when the
    /// acknowledgement supplied one). Fatal when the device answers the
    /// crafted exchange with an explicit error opcode; that error carries the
    /// device's own message and nothing is streamed after it.
    pub async fn reset_remote_catalog(&self) -> Result<String> {
        let lpath = self
            .locate_remote_catalog()
            .await
            .ok_or(TransportError::CatalogNotFound)?;

        let cleaned = self.client.reset_catalog_record(&lpath).await?;
        self.client.delete(&cleaned).await?;

        info!(lpath = %cleaned, "remote catalog reset complete");
        self.event_bus
            .emit(CoreEvent::Recovery(RecoveryEvent::RemoteCatalogReset {
                lpath: cleaned.clone(),
            }))
            .ok();

        Ok(cleaned)
    }
}
