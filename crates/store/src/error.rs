use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Invalid connection url: {0}")]
    InvalidUrl(String),

    #[error("TLS setup failed: {0}")]
    Tls(#[from] native_tls::Error),

    #[error("Database error: {0}")]
    Db(#[from] tokio_postgres::Error),

    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Malformed row: {0}")]
    Decode(String),
}
