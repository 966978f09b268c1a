//! Wire payloads for the device protocol.
//!
//! Everything here mirrors the device's opcode/field contract exactly; field
//! names are part of the wire format and must not be renamed. Only the
//! catalog recovery path constructs these payloads directly; normal
//! transfers go through the driver's upload primitive.

use chrono::Utc;
use core_metadata::DeviceMetadata;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::error::Result;

/// Opcode initiating a single-file transfer.
pub const OP_SEND_BOOK: &str = "SEND_BOOK";
/// Response opcode signalling a device-side failure; carries a `message`.
pub const OP_ERROR: &str = "ERROR";

/// Empty catalog document streamed during a remote reset.
pub const EMPTY_CATALOG: &[u8] = b"[]";

/// Candidate catalog filenames on the device, probed in order.
pub const REMOTE_CATALOG_CANDIDATES: [&str; 2] = [".metadata.shelfwire", "metadata.shelfwire"];

/// Catalog cache filename on the host side.
pub const LOCAL_CATALOG_CACHE: &str = ".metadata.shelfwire";

/// Builds the `SEND_BOOK` field map for one file.
///
/// The field set is reproduced bit-for-field from the device contract:
/// `lpath`, `length`, `metadata`, `thisBook`, `totalBooks`,
/// `willStreamBooks`, `willStreamBinary`, `wantsSendOkToSendbook`,
/// `canSupportLpathChanges`.
pub fn send_book_fields(
    lpath: &str,
    length: usize,
    metadata: &DeviceMetadata,
    wants_send_ok: bool,
) -> Result<Value> {
    Ok(json!({
        "lpath": lpath,
        "length": length,
        "metadata": serde_json::to_value(metadata)?,
        "thisBook": 0,
        "totalBooks": 1,
        "willStreamBooks": true,
        "willStreamBinary": true,
        "wantsSendOkToSendbook": wants_send_ok,
        "canSupportLpathChanges": true,
    }))
}

/// Minimal metadata record for the catalog reset exchange.
///
/// The device folds this record into the catalog being overwritten; it is
/// discarded with the catalog on the follow-up delete.
pub fn catalog_reset_metadata(lpath: &str, payload_len: usize) -> DeviceMetadata {
    let extension = lpath.rsplit('.').next().unwrap_or_default().to_string();
    DeviceMetadata {
        title: "Catalog Reset".to_string(),
        authors: vec!["Shelfwire".to_string()],
        uuid: Uuid::new_v4().to_string(),
        extension,
        size: payload_len as u64,
        content_hash: None,
        collections: Vec::new(),
        lpath: Some(lpath.to_string()),
        last_modified: Some(Utc::now()),
        format_metadata: None,
        comments: Some("shelfwire-catalog-reset".to_string()),
    }
}
