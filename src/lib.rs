//! Bankim Content - localized form content and dropdown resolution
//!
//! Decides, for every rendered form field, which label, placeholder and
//! option list to show, and allocates ids for user-added repeatable entries.
//!
//! ## Components
//!
//! - **Cache**: language-qualified keys and the bundle stores
//! - **Fetch**: content service client and single-flight deduplication
//! - **Language**: request tokens, consumer lifecycle, stale-result handling
//! - **Content**: per-screen strings through a five-tier fallback chain
//! - **Dropdown**: per-field option lists with screen-dependent field keys
//! - **Collection**: id allocation for obligations, incomes and co-borrowers
//! - **Engine**: explicit wiring with `init()` / `reset()`

pub mod cache;
pub mod collection;
pub mod config;
pub mod content;
pub mod dropdown;
pub mod engine;
pub mod fetch;
pub mod language;
pub mod logging;
pub mod translations;
pub mod types;

pub use config::{Args, EngineConfig};
pub use engine::FormContentEngine;
pub use types::{ContentError, Result};
