pub mod chunk;
pub mod export;
pub mod jobs;
pub mod records;
