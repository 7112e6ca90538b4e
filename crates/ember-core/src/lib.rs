//! Ember Core - Foundational types for the Ember generation service
//!
//! This crate provides the types that the other Ember crates depend on:
//! - `ContentHash` - SHA-256 based content hashing for generated artifacts
//! - Error types and Result alias

mod error;
mod hash;

pub use error::{EmberError, Result};
pub use hash::ContentHash;
