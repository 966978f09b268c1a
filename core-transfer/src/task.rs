//! # Transfer Task Building
//!
//! Resolves each requested book into a self-contained transfer task: which
//! format file to send, under what device filename, with what sanitized
//! metadata. Books that cannot be resolved are skipped with a reason and
//! never abort the rest of the batch.
//!
//! Integrity-hash computation is deliberately deferred to the transfer
//! phase so hashing large files never blocks the initiating thread; the
//! builder only flags whether a task wants it.

use std::path::PathBuf;
use std::sync::Arc;

use bridge_traits::library::{BookId, BookRecord, LibraryStore};
use core_metadata::{sanitize_for_device, DeviceMetadata};
use core_runtime::TransferConfig;
use tracing::debug;

/// Characters never allowed in a device filename.
const INVALID_FILENAME_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Hard cap on a filename stem.
const MAX_FILENAME_LEN: usize = 100;

/// Fallback for empty name components and unrenderable templates.
const UNKNOWN: &str = "Unknown";

/// One file to transfer. Immutable once enqueued; consumed exactly once by
/// the batch coordinator.
#[derive(Debug, Clone)]
pub struct TransferTask {
    pub book_id: BookId,
    /// Absolute path of the source file in the host library.
    pub path: PathBuf,
    /// Destination filename on the device, including any configured
    /// subdirectory.
    pub filename: String,
    /// Display title for progress and reports.
    pub title: String,
    /// Source file size in bytes at build time.
    pub size: u64,
    /// Upper-case format code being sent.
    pub format: String,
    /// Sanitized device-facing metadata.
    pub metadata: DeviceMetadata,
    /// Whether to compute an integrity hash before the send.
    pub verify_hash: bool,
}

/// A book that could not be turned into a task, with the reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedBook {
    pub book_id: BookId,
    pub title: String,
    pub reason: String,
}

/// Builds transfer tasks from library book identifiers.
pub struct TaskBuilder {
    library: Arc<dyn LibraryStore>,
    config: TransferConfig,
}

impl TaskBuilder {
    pub fn new(library: Arc<dyn LibraryStore>, config: TransferConfig) -> Self {
        Self { library, config }
    }

    /// Resolves each book into a task, or a skip reason when it cannot be
    /// sent. Selection failures never abort the batch.
    pub async fn build(
        &self,
        book_ids: &[BookId],
        requested_format: Option<&str>,
    ) -> (Vec<TransferTask>, Vec<SkippedBook>) {
        let mut tasks = Vec::with_capacity(book_ids.len());
        let mut skipped = Vec::new();

        for &book_id in book_ids {
            match self.build_one(book_id, requested_format).await {
                Ok(task) => tasks.push(task),
                Err(skip) => {
                    debug!(book_id, reason = %skip.reason, "skipping book");
                    skipped.push(skip);
                }
            }
        }

        (tasks, skipped)
    }

    async fn build_one(
        &self,
        book_id: BookId,
        requested_format: Option<&str>,
    ) -> std::result::Result<TransferTask, SkippedBook> {
        let skip = |title: &str, reason: String| SkippedBook {
            book_id,
            title: title.to_string(),
            reason,
        };

        let record = match self.library.record(book_id).await {
            Ok(record) => record,
            Err(e) => {
                return Err(skip(
                    &format!("book {}", book_id),
                    format!("library lookup failed: {}", e),
                ))
            }
        };
        let title = if record.title.is_empty() {
            format!("book {}", book_id)
        } else {
            record.title.clone()
        };

        let formats = match self.library.formats(book_id).await {
            Ok(formats) => formats
                .into_iter()
                .map(|f| f.to_uppercase())
                .collect::<Vec<_>>(),
            Err(e) => return Err(skip(&title, format!("library lookup failed: {}", e))),
        };

        if formats.is_empty() {
            return Err(skip(&title, "no available formats".to_string()));
        }

        let format = match self.select_format(&formats, requested_format) {
            Some(format) => format,
            None => {
                let reason = match requested_format {
                    Some(f) => format!("no {} format", f.to_uppercase()),
                    None => "no matching format".to_string(),
                };
                return Err(skip(&title, reason));
            }
        };

        let path = match self.library.format_path(book_id, &format).await {
            Ok(path) => path,
            Err(e) => return Err(skip(&title, format!("file lookup failed: {}", e))),
        };

        let size = match tokio::fs::metadata(&path).await {
            Ok(meta) => meta.len(),
            Err(_) => return Err(skip(&title, "file missing on disk".to_string())),
        };

        let filename = self.build_filename(&record, &format);
        let metadata = sanitize_for_device(&record, &format, size, None);

        Ok(TransferTask {
            book_id,
            path,
            filename,
            title,
            size,
            format,
            metadata,
            verify_hash: self.config.verify_hash,
        })
    }

    /// Format selection, in order: explicit request if the book has it, then
    /// the configured preference list, then any available format.
    fn select_format(&self, available: &[String], requested: Option<&str>) -> Option<String> {
        if let Some(requested) = requested {
            let requested = requested.to_uppercase();
            return available.contains(&requested).then_some(requested);
        }

        for preferred in &self.config.preferred_formats {
            if available.contains(preferred) {
                return Some(preferred.clone());
            }
        }

        available.first().cloned()
    }

    /// Renders the filename template, falling back to `"author - title"` on
    /// unresolvable placeholders, and prefixes the configured device
    /// subdirectory.
    fn build_filename(&self, record: &BookRecord, format: &str) -> String {
        let author = safe_component(record.authors.first().map(String::as_str).unwrap_or(""));
        let title = safe_component(&record.title);
        let series = safe_component(record.series.as_deref().unwrap_or(""));
        let series_index = record
            .series_index
            .map(|i| (i as i64).to_string())
            .unwrap_or_default();

        let vars = [
            ("author", author.as_str()),
            ("title", title.as_str()),
            ("series", series.as_str()),
            ("series_index", series_index.as_str()),
        ];

        let stem = render_template(&self.config.filename_template, &vars)
            .unwrap_or_else(|| format!("{} - {}", author, title));
        let stem = cap_component(&stem);

        let base = format!("{}.{}", stem, format.to_lowercase());
        match self.config.device_subdir.as_deref() {
            Some(subdir) if !subdir.is_empty() => {
                format!("{}/{}", subdir.trim_matches('/'), base)
            }
            _ => base,
        }
    }
}

/// Substitutes `{placeholder}` tokens; `None` when the template references an
/// unknown placeholder or is malformed.
fn render_template(template: &str, vars: &[(&str, &str)]) -> Option<String> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        let end = after.find('}')?;
        let key = &after[..end];
        let value = vars.iter().find(|(k, _)| *k == key)?.1;
        out.push_str(value);
        rest = &after[end + 1..];
    }

    out.push_str(rest);
    Some(out)
}

/// Replaces filesystem-unsafe characters, trims surrounding dots and spaces,
/// and caps the length. Never returns an empty string.
fn safe_component(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| {
            if INVALID_FILENAME_CHARS.contains(&c) {
                '_'
            } else {
                c
            }
        })
        .collect();

    cap_component(cleaned.trim_matches(|c| c == '.' || c == ' '))
}

fn cap_component(name: &str) -> String {
    let capped: String = name.chars().take(MAX_FILENAME_LEN).collect();
    let capped = capped.trim_matches(|c| c == '.' || c == ' ');
    if capped.is_empty() {
        UNKNOWN.to_string()
    } else {
        capped.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_traits::error::{BridgeError, Result as BridgeResult};
    use std::collections::HashMap;
    use std::io::Write;
    use std::path::Path;

    /// In-memory library with real files on disk for the size round trip.
    struct FakeLibrary {
        records: HashMap<BookId, BookRecord>,
        files: HashMap<(BookId, String), PathBuf>,
    }

    #[async_trait]
    impl LibraryStore for FakeLibrary {
        async fn formats(&self, book_id: BookId) -> BridgeResult<Vec<String>> {
            Ok(self
                .files
                .keys()
                .filter(|(id, _)| *id == book_id)
                .map(|(_, f)| f.clone())
                .collect())
        }

        async fn record(&self, book_id: BookId) -> BridgeResult<BookRecord> {
            self.records
                .get(&book_id)
                .cloned()
                .ok_or_else(|| BridgeError::OperationFailed(format!("no record {}", book_id)))
        }

        async fn format_path(&self, book_id: BookId, format: &str) -> BridgeResult<PathBuf> {
            self.files
                .get(&(book_id, format.to_string()))
                .cloned()
                .ok_or_else(|| BridgeError::OperationFailed(format!("no file for {}", format)))
        }
    }

    fn record(title: &str, author: &str) -> BookRecord {
        BookRecord {
            title: title.to_string(),
            authors: vec![author.to_string()],
            ..Default::default()
        }
    }

    fn library_with_file(
        dir: &Path,
        book_id: BookId,
        rec: BookRecord,
        format: &str,
        content: &[u8],
    ) -> FakeLibrary {
        let path = dir.join(format!("{}.{}", book_id, format.to_lowercase()));
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(content).unwrap();

        let mut records = HashMap::new();
        records.insert(book_id, rec);
        let mut files = HashMap::new();
        files.insert((book_id, format.to_string()), path);

        FakeLibrary { records, files }
    }

    fn builder(library: FakeLibrary, config: TransferConfig) -> TaskBuilder {
        TaskBuilder::new(Arc::new(library), config)
    }

    #[test]
    fn test_safe_component_replaces_unsafe_chars() {
        let cleaned = safe_component("a<b>c:d\"e/f\\g|h?i*j");
        for c in INVALID_FILENAME_CHARS {
            assert!(!cleaned.contains(*c), "found {:?}", c);
        }
        assert_eq!(cleaned, "a_b_c_d_e_f_g_h_i_j");
    }

    #[test]
    fn test_safe_component_trims_and_caps() {
        assert_eq!(safe_component("  name.. "), "name");
        assert_eq!(safe_component(""), "Unknown");
        assert_eq!(safe_component(" .. "), "Unknown");

        let long = "x".repeat(250);
        assert_eq!(safe_component(&long).chars().count(), MAX_FILENAME_LEN);
    }

    #[test]
    fn test_render_template_known_placeholders() {
        let vars = [("author", "Le Guin"), ("title", "Earthsea")];
        assert_eq!(
            render_template("{author} - {title}", &vars).as_deref(),
            Some("Le Guin - Earthsea")
        );
    }

    #[test]
    fn test_render_template_unknown_placeholder_fails() {
        let vars = [("author", "Le Guin"), ("title", "Earthsea")];
        assert!(render_template("{isbn} - {title}", &vars).is_none());
        assert!(render_template("{unclosed", &vars).is_none());
    }

    #[tokio::test]
    async fn test_format_selection_prefers_configured_order() {
        let config = TransferConfig::builder()
            .preferred_formats(["AZW3", "EPUB", "PDF"])
            .build()
            .unwrap();
        let library = FakeLibrary {
            records: HashMap::new(),
            files: HashMap::new(),
        };
        let builder = builder(library, config);

        let available = vec!["EPUB".to_string(), "MOBI".to_string()];
        assert_eq!(
            builder.select_format(&available, None).as_deref(),
            Some("EPUB")
        );
    }

    #[tokio::test]
    async fn test_format_selection_explicit_request() {
        let config = TransferConfig::default();
        let library = FakeLibrary {
            records: HashMap::new(),
            files: HashMap::new(),
        };
        let builder = builder(library, config);

        let available = vec!["EPUB".to_string(), "MOBI".to_string()];
        assert_eq!(
            builder.select_format(&available, Some("mobi")).as_deref(),
            Some("MOBI")
        );
        assert!(builder.select_format(&available, Some("PDF")).is_none());
    }

    #[tokio::test]
    async fn test_format_selection_falls_back_to_any() {
        let config = TransferConfig::builder()
            .preferred_formats(["AZW3"])
            .build()
            .unwrap();
        let library = FakeLibrary {
            records: HashMap::new(),
            files: HashMap::new(),
        };
        let builder = builder(library, config);

        let available = vec!["CBZ".to_string()];
        assert_eq!(
            builder.select_format(&available, None).as_deref(),
            Some("CBZ")
        );
    }

    #[tokio::test]
    async fn test_task_size_matches_file() {
        let dir = tempfile::tempdir().unwrap();
        let content = b"not really an epub but the right size";
        let library = library_with_file(
            dir.path(),
            7,
            record("Earthsea", "Le Guin"),
            "EPUB",
            content,
        );
        let builder = builder(library, TransferConfig::default());

        let (tasks, skipped) = builder.build(&[7], None).await;
        assert!(skipped.is_empty());
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].size, content.len() as u64);
        assert_eq!(tasks[0].metadata.size, content.len() as u64);
        assert_eq!(tasks[0].format, "EPUB");
        assert_eq!(tasks[0].filename, "Le Guin - Earthsea.epub");
    }

    #[tokio::test]
    async fn test_book_without_formats_is_skipped() {
        let mut records = HashMap::new();
        records.insert(3, record("Formatless", "Nobody"));
        let library = FakeLibrary {
            records,
            files: HashMap::new(),
        };
        let builder = builder(library, TransferConfig::default());

        let (tasks, skipped) = builder.build(&[3], None).await;
        assert!(tasks.is_empty());
        assert_eq!(skipped.len(), 1);
        assert_eq!(skipped[0].reason, "no available formats");
    }

    #[tokio::test]
    async fn test_missing_file_is_skipped_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let mut library = library_with_file(
            dir.path(),
            1,
            record("Present", "Author"),
            "EPUB",
            b"data",
        );
        // Second book points at a file that does not exist.
        library.records.insert(2, record("Absent", "Author"));
        library
            .files
            .insert((2, "EPUB".to_string()), dir.path().join("missing.epub"));

        let builder = builder(library, TransferConfig::default());
        let (tasks, skipped) = builder.build(&[1, 2], None).await;

        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].title, "Present");
        assert_eq!(skipped.len(), 1);
        assert_eq!(skipped[0].reason, "file missing on disk");
    }

    #[tokio::test]
    async fn test_requested_format_absent_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let library =
            library_with_file(dir.path(), 1, record("Book", "Author"), "EPUB", b"data");
        let builder = builder(library, TransferConfig::default());

        let (tasks, skipped) = builder.build(&[1], Some("PDF")).await;
        assert!(tasks.is_empty());
        assert_eq!(skipped[0].reason, "no PDF format");
    }

    #[tokio::test]
    async fn test_bad_template_falls_back_to_author_title() {
        let dir = tempfile::tempdir().unwrap();
        let library =
            library_with_file(dir.path(), 1, record("Book", "Author"), "EPUB", b"data");
        let config = TransferConfig::builder()
            .filename_template("{isbn}-{title}")
            .build()
            .unwrap();
        let builder = builder(library, config);

        let (tasks, _) = builder.build(&[1], None).await;
        assert_eq!(tasks[0].filename, "Author - Book.epub");
    }

    #[tokio::test]
    async fn test_device_subdir_prefixes_filename() {
        let dir = tempfile::tempdir().unwrap();
        let library =
            library_with_file(dir.path(), 1, record("Book", "Author"), "EPUB", b"data");
        let config = TransferConfig::builder()
            .device_subdir("inbox/")
            .build()
            .unwrap();
        let builder = builder(library, config);

        let (tasks, _) = builder.build(&[1], None).await;
        assert_eq!(tasks[0].filename, "inbox/Author - Book.epub");
    }

    #[tokio::test]
    async fn test_unsafe_title_sanitized_in_filename() {
        let dir = tempfile::tempdir().unwrap();
        let library = library_with_file(
            dir.path(),
            1,
            record("What? Is: This*", "A/B\\C"),
            "EPUB",
            b"data",
        );
        let builder = builder(library, TransferConfig::default());

        let (tasks, _) = builder.build(&[1], None).await;
        assert_eq!(tasks[0].filename, "A_B_C - What_ Is_ This_.epub");
    }
}
