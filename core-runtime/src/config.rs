//! # Transfer Configuration
//!
//! Configuration for transfer operations, passed explicitly into the
//! components that need it. There is no ambient settings store: the host
//! reads its persisted preferences, builds a `TransferConfig`, and hands it
//! to the task builder and batch coordinator at call time.
//!
//! ## Usage
//!
//! ```rust
//! use core_runtime::config::TransferConfig;
//!
//! let config = TransferConfig::builder()
//!     .preferred_formats(["EPUB", "PDF"])
//!     .timeout_secs(180)
//!     .verify_hash(true)
//!     .build()
//!     .expect("valid config");
//!
//! assert_eq!(config.preferred_formats, vec!["EPUB", "PDF"]);
//! ```

use crate::error::{Error, Result};

/// Default per-book transfer timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;
/// Minimum accepted per-book timeout.
pub const MIN_TIMEOUT_SECS: u64 = 30;
/// Maximum accepted per-book timeout.
pub const MAX_TIMEOUT_SECS: u64 = 600;

/// Default filename template; placeholders are resolved by the task builder.
pub const DEFAULT_FILENAME_TEMPLATE: &str = "{author} - {title}";

fn default_preferred_formats() -> Vec<String> {
    ["EPUB", "AZW3", "MOBI", "PDF", "CBZ", "CBR"]
        .into_iter()
        .map(str::to_string)
        .collect()
}

/// Configuration for one transfer operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferConfig {
    /// Ordered format preference; first available format wins when no
    /// explicit format is requested. Upper-case codes.
    pub preferred_formats: Vec<String>,

    /// Optional subdirectory on the device to place files under.
    pub device_subdir: Option<String>,

    /// Filename template with `{author}`, `{title}`, `{series}` and
    /// `{series_index}` placeholders.
    pub filename_template: String,

    /// Per-book transfer timeout in seconds.
    pub timeout_secs: u64,

    /// Whether to compute a content hash before each send.
    pub verify_hash: bool,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            preferred_formats: default_preferred_formats(),
            device_subdir: None,
            filename_template: DEFAULT_FILENAME_TEMPLATE.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            verify_hash: true,
        }
    }
}

impl TransferConfig {
    /// Creates a new builder.
    pub fn builder() -> TransferConfigBuilder {
        TransferConfigBuilder::default()
    }

    /// Validates the configuration.
    ///
    /// Checks that at least one preferred format is configured, that the
    /// filename template is non-empty, and that the timeout lies within the
    /// accepted range.
    pub fn validate(&self) -> Result<()> {
        if self.preferred_formats.is_empty() {
            return Err(Error::Config(
                "At least one preferred format is required".to_string(),
            ));
        }

        if self.filename_template.trim().is_empty() {
            return Err(Error::Config(
                "Filename template cannot be empty".to_string(),
            ));
        }

        if !(MIN_TIMEOUT_SECS..=MAX_TIMEOUT_SECS).contains(&self.timeout_secs) {
            return Err(Error::Config(format!(
                "Timeout must be between {} and {} seconds, got {}",
                MIN_TIMEOUT_SECS, MAX_TIMEOUT_SECS, self.timeout_secs
            )));
        }

        Ok(())
    }
}

/// Builder for [`TransferConfig`].
#[derive(Default)]
pub struct TransferConfigBuilder {
    preferred_formats: Option<Vec<String>>,
    device_subdir: Option<String>,
    filename_template: Option<String>,
    timeout_secs: Option<u64>,
    verify_hash: Option<bool>,
}

impl TransferConfigBuilder {
    /// Sets the ordered format preference list. Codes are normalized to
    /// upper case.
    pub fn preferred_formats<I, S>(mut self, formats: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.preferred_formats = Some(
            formats
                .into_iter()
                .map(|f| f.into().trim().to_uppercase())
                .filter(|f| !f.is_empty())
                .collect(),
        );
        self
    }

    /// Sets the device subdirectory.
    pub fn device_subdir(mut self, subdir: impl Into<String>) -> Self {
        let subdir = subdir.into();
        self.device_subdir = if subdir.trim().is_empty() {
            None
        } else {
            Some(subdir.trim().to_string())
        };
        self
    }

    /// Sets the filename template.
    pub fn filename_template(mut self, template: impl Into<String>) -> Self {
        self.filename_template = Some(template.into());
        self
    }

    /// Sets the per-book timeout in seconds.
    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }

    /// Enables or disables content-hash verification.
    pub fn verify_hash(mut self, enabled: bool) -> Self {
        self.verify_hash = Some(enabled);
        self
    }

    /// Builds and validates the final configuration.
    pub fn build(self) -> Result<TransferConfig> {
        let config = TransferConfig {
            preferred_formats: self
                .preferred_formats
                .unwrap_or_else(default_preferred_formats),
            device_subdir: self.device_subdir,
            filename_template: self
                .filename_template
                .filter(|t| !t.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_FILENAME_TEMPLATE.to_string()),
            timeout_secs: self.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS),
            verify_hash: self.verify_hash.unwrap_or(true),
        };

        config.validate()?;
        Ok(config)
    }
}
