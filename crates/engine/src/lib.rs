pub mod chunk;
pub mod error;
pub mod progress;
