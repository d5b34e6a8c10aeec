pub mod clear;
pub mod config;
pub mod export;
pub mod import;
pub mod inspect;
pub mod utils;
