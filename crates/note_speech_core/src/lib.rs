//! Shared note-to-speech domain primitives.
//!
//! This crate owns the deterministic parts of the conversion pipeline: trigger
//! decoding, scope and key derivation, and the result contracts. It
//! intentionally excludes AWS SDK and Lambda runtime concerns.

pub mod contract;
pub mod storage_keys;
pub mod trigger;
