//! Bundle caching for the content and dropdown resolvers
//!
//! - **keys**: language-qualified cache keys
//! - **bundle**: the cached value types
//! - **store**: the concurrent map that owns them

pub mod bundle;
pub mod keys;
pub mod store;

pub use bundle::{BundleStatus, ContentBundle, DropdownBundle, DropdownOption, Timestamped};
pub use keys::{CacheKey, ContentKind};
pub use store::{BundleStore, CacheStats, CacheStatsSnapshot, ServiceStats};
