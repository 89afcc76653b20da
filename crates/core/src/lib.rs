//! Core types and shared functionality for canned.
//!
//! This crate provides:
//! - Query string normalization into lookup keys
//! - File-backed response storage (content store, index, replay snapshot)
//! - Unified error types
//! - Configuration structures

pub mod config;
pub mod error;
pub mod key;
pub mod store;

pub use config::{AppConfig, ConfigError};
pub use error::Error;
pub use key::{QueryKey, normalize};
pub use store::{ContentStore, Index, ReplaySnapshot, ResponsesDir, StorageName};
