//! Route modules for the ingest server

pub mod health;
pub mod host;
pub mod upload;
