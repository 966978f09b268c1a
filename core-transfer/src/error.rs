use bridge_traits::BridgeError;
use core_transport::TransportError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TransferError {
    #[error("A transfer batch is already running for this device")]
    BatchInProgress,

    #[error("Batch {batch_id} not found")]
    BatchNotFound { batch_id: String },

    #[error("No transfer tasks to run")]
    EmptyBatch,

    #[error("Transfer worker terminated without reporting")]
    WorkerLost,

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Configuration error: {0}")]
    Config(#[from] core_runtime::Error),

    #[error("Library error: {0}")]
    Library(#[from] BridgeError),
}

pub type Result<T> = std::result::Result<T, TransferError>;
