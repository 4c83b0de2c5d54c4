pub mod context;
pub mod error;
pub mod export;
pub mod mail;
pub mod second_pass;
pub mod settings;
pub mod templates;
pub mod upload;
