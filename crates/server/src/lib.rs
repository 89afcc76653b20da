//! The canned server: replay recorded responses or capture live ones.

pub mod http;
pub mod logging;
pub mod resolver;

pub use resolver::{Mode, Recorder, Resolution, Resolver};
