use std::env;
use thiserror::Error;

const DEFAULT_CHUNK_SIZE: u64 = 1000;

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {key}: '{value}'")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub database_url: String,
    /// Reader-preferring connection for chunk fetches; defaults to the
    /// primary when unset.
    pub database_reader_url: String,
    pub export_chunk_size: u64,
    pub second_pass_chunk_size: u64,
    pub export_dir: String,
    pub export_base_url: Option<String>,
    pub email_webhook_url: Option<String>,
    pub base_url: String,
}

impl Settings {
    pub fn from_env() -> Result<Self, SettingsError> {
        let database_url =
            env::var("DATABASE_URL").map_err(|_| SettingsError::Missing("DATABASE_URL"))?;
        let database_reader_url =
            env::var("DATABASE_READER_URL").unwrap_or_else(|_| database_url.clone());

        Ok(Settings {
            database_url,
            database_reader_url,
            export_chunk_size: chunk_size_var("EXPORT_CHUNK_SIZE")?,
            second_pass_chunk_size: chunk_size_var("SECOND_PASS_CHUNK_SIZE")?,
            export_dir: env::var("EXPORT_DIR").unwrap_or_else(|_| "./exports".to_string()),
            export_base_url: env::var("EXPORT_BASE_URL").ok(),
            email_webhook_url: env::var("EMAIL_WEBHOOK_URL").ok(),
            base_url: env::var("BASE_URL").unwrap_or_else(|_| "http://localhost:3000".to_string()),
        })
    }
}

fn chunk_size_var(key: &'static str) -> Result<u64, SettingsError> {
    match env::var(key) {
        Err(_) => Ok(DEFAULT_CHUNK_SIZE),
        Ok(raw) => raw
            .parse::<u64>()
            .ok()
            .filter(|size| *size > 0)
            .ok_or(SettingsError::Invalid { key, value: raw }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_size_rejects_zero_and_garbage() {
        // SAFETY: single-threaded test process mutation of the environment.
        unsafe {
            env::set_var("TEST_CHUNK_SIZE_A", "0");
        }
        assert!(matches!(
            chunk_size_var("TEST_CHUNK_SIZE_A"),
            Err(SettingsError::Invalid { .. })
        ));
        unsafe {
            env::set_var("TEST_CHUNK_SIZE_A", "250");
        }
        assert_eq!(chunk_size_var("TEST_CHUNK_SIZE_A").unwrap(), 250);
        unsafe {
            env::remove_var("TEST_CHUNK_SIZE_A");
        }
        assert_eq!(chunk_size_var("TEST_CHUNK_SIZE_A").unwrap(), 1000);
    }
}
