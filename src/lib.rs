pub mod api;
pub mod config;
pub mod error;
pub mod ingest;
pub mod llm;
pub mod questions;
pub mod session;
pub mod types;
