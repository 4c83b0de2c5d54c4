#![allow(dead_code)]

pub mod export;
pub mod utils;
