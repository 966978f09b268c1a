//! # Device Metadata Sanitizing
//!
//! Produces the device-facing projection of a source book record.
//!
//! ## Overview
//!
//! The wire protocol serializes one metadata record per transferred file, and
//! the device folds that record into its own catalog. Two classes of source
//! data corrupt that catalog and must never reach the wire:
//!
//! - binary payloads (cover images, thumbnails), which break the catalog's
//!   JSON serialization or land as garbage bytes;
//! - per-format metadata blocks for formats *other than* the one being sent,
//!   which make the device record a format it never received.
//!
//! [`sanitize_for_device`] is a pure transform with no error path: missing
//! source fields degrade to defaults instead of failing, and a record without
//! a unique identifier gets a freshly generated one, since the device cannot
//! distinguish re-sends of the same logical book without it.

use bridge_traits::library::{BookRecord, FormatBlock};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Fallback for missing titles and author lists.
const UNKNOWN: &str = "Unknown";

/// Device-facing projection of a book record.
///
/// Owned by a transfer task once attached; never mutated after creation.
/// Builders that need to add a late-computed content hash use
/// [`with_content_hash`](Self::with_content_hash), which returns a new value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceMetadata {
    pub title: String,
    pub authors: Vec<String>,
    /// Always non-empty; generated when the source record has none.
    pub uuid: String,
    /// Lower-case extension of the format actually being sent.
    pub extension: String,
    /// Size in bytes of the file being sent.
    pub size: u64,
    /// Content digest of the file, when computed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_hash: Option<String>,
    /// Device-side collection names.
    #[serde(default)]
    pub collections: Vec<String>,
    /// Device-relative target path; set only by the recovery exchange.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lpath: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<DateTime<Utc>>,
    /// The one per-format block matching the format being sent, if the
    /// source record had it. Blocks for other formats are dropped.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format_metadata: Option<FormatBlock>,
    /// Free-form marker; used by the catalog reset exchange.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comments: Option<String>,
}

impl DeviceMetadata {
    /// Returns a copy with the content hash attached.
    pub fn with_content_hash(mut self, hash: impl Into<String>) -> Self {
        self.content_hash = Some(hash.into());
        self
    }

    /// Returns a copy targeting a specific device path.
    pub fn with_lpath(mut self, lpath: impl Into<String>) -> Self {
        self.lpath = Some(lpath.into());
        self
    }
}

/// Builds the device-safe copy of a source record for one outgoing file.
///
/// Unconditionally sets the extension (lower-cased) and size; sets the hash
/// only when provided; retains only the per-format block matching `format`;
/// never copies binary payloads. Missing titles and author lists degrade to
/// `"Unknown"`.
pub fn sanitize_for_device(
    record: &BookRecord,
    format: &str,
    size: u64,
    content_hash: Option<String>,
) -> DeviceMetadata {
    let format_upper = format.trim().to_uppercase();

    let title = if record.title.trim().is_empty() {
        UNKNOWN.to_string()
    } else {
        record.title.clone()
    };

    let authors = if record.authors.is_empty() {
        vec![UNKNOWN.to_string()]
    } else {
        record.authors.clone()
    };

    let uuid = record
        .uuid
        .clone()
        .filter(|u| !u.trim().is_empty())
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    DeviceMetadata {
        title,
        authors,
        uuid,
        extension: format_upper.to_lowercase(),
        size,
        content_hash,
        collections: record.device_collections.clone(),
        lpath: None,
        last_modified: record.last_modified,
        format_metadata: record.format_metadata.get(&format_upper).cloned(),
        comments: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use std::collections::HashMap;

    fn record_with_formats(formats: &[(&str, u64)]) -> BookRecord {
        let mut format_metadata = HashMap::new();
        for (code, size) in formats {
            format_metadata.insert(
                code.to_string(),
                FormatBlock {
                    size: *size,
                    modified_at: None,
                },
            );
        }
        BookRecord {
            title: "The Left Hand of Darkness".to_string(),
            authors: vec!["Ursula K. Le Guin".to_string()],
            uuid: Some("11111111-2222-3333-4444-555555555555".to_string()),
            format_metadata,
            ..Default::default()
        }
    }

    #[test]
    fn test_extension_and_size_always_set() {
        let record = record_with_formats(&[]);
        let meta = sanitize_for_device(&record, "EPUB", 4096, None);

        assert_eq!(meta.extension, "epub");
        assert_eq!(meta.size, 4096);
    }

    #[test]
    fn test_hash_only_when_provided() {
        let record = record_with_formats(&[]);

        let without = sanitize_for_device(&record, "EPUB", 10, None);
        assert!(without.content_hash.is_none());

        let with = sanitize_for_device(&record, "EPUB", 10, Some("abc123".to_string()));
        assert_eq!(with.content_hash.as_deref(), Some("abc123"));
    }

    #[test]
    fn test_uuid_generated_when_missing() {
        let mut record = record_with_formats(&[]);
        record.uuid = None;

        let meta = sanitize_for_device(&record, "EPUB", 10, None);
        assert!(!meta.uuid.is_empty());

        record.uuid = Some("  ".to_string());
        let meta = sanitize_for_device(&record, "EPUB", 10, None);
        assert!(!meta.uuid.trim().is_empty());
        assert_ne!(meta.uuid, "  ");
    }

    #[test]
    fn test_uuid_preserved_when_present() {
        let record = record_with_formats(&[]);
        let meta = sanitize_for_device(&record, "EPUB", 10, None);
        assert_eq!(meta.uuid, "11111111-2222-3333-4444-555555555555");
    }

    #[test]
    fn test_cross_format_blocks_dropped() {
        let record = record_with_formats(&[("EPUB", 4096), ("MOBI", 8192)]);

        let meta = sanitize_for_device(&record, "EPUB", 4096, None);
        assert_eq!(
            meta.format_metadata,
            Some(FormatBlock {
                size: 4096,
                modified_at: None
            })
        );

        let meta = sanitize_for_device(&record, "PDF", 100, None);
        assert!(meta.format_metadata.is_none());
    }

    #[test]
    fn test_binary_payloads_never_serialized() {
        let mut record = record_with_formats(&[("EPUB", 4096)]);
        record.cover = Some(Bytes::from_static(&[0xff, 0xd8, 0xff]));
        record.thumbnail = Some(Bytes::from_static(&[0x89, 0x50, 0x4e]));

        let meta = sanitize_for_device(&record, "EPUB", 4096, None);
        let json = serde_json::to_string(&meta).unwrap();
        assert!(!json.contains("cover"));
        assert!(!json.contains("thumbnail"));
    }

    #[test]
    fn test_missing_fields_degrade_to_defaults() {
        let record = BookRecord::default();
        let meta = sanitize_for_device(&record, "epub", 0, None);

        assert_eq!(meta.title, "Unknown");
        assert_eq!(meta.authors, vec!["Unknown".to_string()]);
        assert_eq!(meta.extension, "epub");
        assert!(!meta.uuid.is_empty());
    }

    #[test]
    fn test_collections_carried_over() {
        let mut record = record_with_formats(&[]);
        record.device_collections = vec!["SF".to_string(), "To Read".to_string()];

        let meta = sanitize_for_device(&record, "EPUB", 10, None);
        assert_eq!(meta.collections, vec!["SF", "To Read"]);
    }

    #[test]
    fn test_with_content_hash_returns_new_value() {
        let record = record_with_formats(&[]);
        let meta = sanitize_for_device(&record, "EPUB", 10, None);

        let hashed = meta.clone().with_content_hash("deadbeef");
        assert!(meta.content_hash.is_none());
        assert_eq!(hashed.content_hash.as_deref(), Some("deadbeef"));
    }
}
