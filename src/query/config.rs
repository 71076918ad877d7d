use std::time::Duration;

/// Configuration for query caching behavior.
///
/// These are explicit, documented defaults rather than inherited framework
/// behavior: cached data is immediately stale (emit-then-revalidate) and
/// unobserved entries are garbage collected after five minutes.
#[derive(Debug, Clone)]
pub struct QueryConfig {
    /// How long data is considered fresh before becoming stale.
    ///
    /// Fresh data is served from cache without a refetch. Stale data is
    /// still served, but a background refetch is triggered.
    pub stale_time: Duration,

    /// How long an entry with no subscribers is retained before eviction.
    pub cache_time: Duration,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            stale_time: Duration::from_secs(0),      // immediately stale
            cache_time: Duration::from_secs(5 * 60), // 5 minutes
        }
    }
}

impl QueryConfig {
    /// Creates a new query configuration with the given stale and cache times.
    #[must_use]
    pub const fn new(stale_time: Duration, cache_time: Duration) -> Self {
        Self {
            stale_time,
            cache_time,
        }
    }
}
