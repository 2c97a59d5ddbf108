//! Phone Number Enrichment Batch Library
//!
//! This library enriches a list of phone numbers with two external lookups
//! (Person identity and TCPA do-not-call status), merges the results per
//! number and writes a timestamped report, persisting unprocessed numbers
//! back to the input list so an interrupted run can resume.
//!
//! # Modules
//!
//! - `cli`: Command-line arguments.
//! - `config`: Configuration management.
//! - `enrichment`: Retry wrapper, per-number merge and lookup stats.
//! - `errors`: Error handling types.
//! - `models`: Records, result table, work queue and API payloads.
//! - `pipeline`: Loader/Backup, enrichment loop and finalizer.
//! - `services`: Person and TCPA API clients.
//! - `signal`: Shutdown signal handling.
//! - `storage`: Input backup/loading, report and resume file output.
//! - `token`: Per-request client token generation.

pub mod cli;
pub mod config;
pub mod enrichment;
pub mod errors;
pub mod models;
pub mod pipeline;
pub mod services;
pub mod signal;
pub mod storage;
pub mod token;
