//! Remote fetching
//!
//! - **wire**: endpoint payloads and their normalisation
//! - **client**: the `ContentApi` seam and its reqwest implementation
//! - **dedup**: single-flight coalescing with a bounded timeout

pub mod client;
pub mod dedup;
pub mod wire;

pub use client::{ContentApi, HttpContentApi};
pub use dedup::{DedupStats, FetchDeduplicator, PendingRequest, Shared, DEFAULT_FETCH_TIMEOUT};
pub use wire::{ContentPayload, DropdownEntry, DropdownPayload};
