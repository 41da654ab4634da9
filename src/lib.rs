//! Pocket Analyst — plain-language questions over a local SQLite file.
//!
//! A local model plans the SQL; this crate validates, sandboxes, and
//! executes it, then feeds results back until the model answers. No data
//! leaves the machine.

pub mod agent;
pub mod config;
pub mod db;
pub mod error;
pub mod runtime;
pub mod tools;
pub mod types;
