//! Library Database Abstractions
//!
//! Boundary to the host's library database: format lookup, source metadata
//! records, and stored file paths. The transfer core never touches the
//! library storage directly.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

use crate::error::Result;

/// Identifier of a book in the host library.
pub type BookId = u64;

/// Per-format metadata block attached to a source record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormatBlock {
    /// Stored size of this format's file in bytes.
    pub size: u64,
    /// When this format's file was last modified, if known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified_at: Option<DateTime<Utc>>,
}

/// A source metadata record for one book.
///
/// Fixed shape with optional fields modeled explicitly — there is no
/// "attribute may or may not exist" ambiguity. Binary payloads (cover,
/// thumbnail) live here and only here; the device-facing projection never
/// carries them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BookRecord {
    pub title: String,
    pub authors: Vec<String>,
    pub series: Option<String>,
    pub series_index: Option<f64>,
    /// Globally unique identifier; absent on records that predate the field.
    pub uuid: Option<String>,
    pub tags: Vec<String>,
    /// Device-side collection names this book belongs to.
    pub device_collections: Vec<String>,
    /// Full-size cover image, when present.
    pub cover: Option<Bytes>,
    /// Pre-rendered cover thumbnail, when present.
    pub thumbnail: Option<Bytes>,
    /// Per-format metadata blocks keyed by upper-case format code.
    pub format_metadata: HashMap<String, FormatBlock>,
    pub last_modified: Option<DateTime<Utc>>,
}

/// Read access to the host library database.
#[async_trait]
pub trait LibraryStore: Send + Sync {
    /// Formats available for a book, as upper-case codes.
    async fn formats(&self, book_id: BookId) -> Result<Vec<String>>;

    /// The full source metadata record for a book.
    async fn record(&self, book_id: BookId) -> Result<BookRecord>;

    /// Absolute path of the stored file for one format of a book.
    async fn format_path(&self, book_id: BookId, format: &str) -> Result<PathBuf>;
}
