//! Client code for canned.
//!
//! This crate provides the live-backend fetch pipeline used by capture mode,
//! and the `Upstream` seam the resolver fetches through.

pub mod fetch;

pub use fetch::{FetchClient, FetchConfig, Upstream};
