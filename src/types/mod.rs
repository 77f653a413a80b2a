//! Shared types for the content engine

pub mod error;

pub use error::{ContentError, Result};
