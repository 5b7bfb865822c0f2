//! AWS-oriented adapters and handlers for note-to-speech conversion.
//!
//! This crate owns runtime integration details (Lambda handlers, S3 and Polly
//! adapters, environment configuration) and exposes a single runtime module
//! boundary for the contract, trigger, and storage key primitives.

pub mod adapters;
pub mod config;
pub mod handlers;
pub mod runtime;
pub mod telemetry;
