use bridge_traits::BridgeError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Device driver error: {0}")]
    Driver(#[from] BridgeError),

    #[error("Transfer timed out after {0} seconds")]
    Timeout(u64),

    #[error("Device is not ready: {0}")]
    NotReady(String),

    #[error("Metadata serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("No catalog file found on device")]
    CatalogNotFound,

    #[error("Catalog reset rejected by device: {message}")]
    RecoveryRejected { message: String },
}

pub type Result<T> = std::result::Result<T, TransportError>;
