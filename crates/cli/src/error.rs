use store::error::StoreError;
use tasks::{error::TaskError, settings::SettingsError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("Failed to read the payload file: {0}")]
    PayloadFileRead(#[from] std::io::Error),

    #[error("Failed to deserialize the job payload as JSON: {0}")]
    PayloadDeserialize(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Settings(#[from] SettingsError),

    #[error("Failed to connect to the database: {0}")]
    Store(#[from] StoreError),

    #[error("Job failed: {0}")]
    Task(#[from] TaskError),

    #[error("Provide exactly one of --payload or --payload-json")]
    PayloadSource,
}
