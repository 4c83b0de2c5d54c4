use crate::{mail::MailError, upload::UploadError};
use engine::error::EngineError;
use store::error::StoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TaskError {
    #[error("Store operation failed: {0}")]
    Store(#[from] StoreError),

    #[error("Chunk loop failed: {0}")]
    Engine(#[from] EngineError),

    #[error("Upload failed: {0}")]
    Upload(#[from] UploadError),

    #[error("Notification failed: {0}")]
    Mail(#[from] MailError),
}
