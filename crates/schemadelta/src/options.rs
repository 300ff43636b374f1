//! Connection and concurrency settings for an [`Instance`](crate::Instance).

use std::time::Duration;

/// Default number of concurrent queries in a fan-out.
pub const DEFAULT_CONCURRENCY: usize = 10;

/// Default number of connections per pool.
pub const DEFAULT_POOL_SIZE: u32 = 10;

/// Settings for an instance handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceOptions {
    /// Maximum connections in each pool.
    pub max_connections_per_pool: u32,
    /// Maximum number of queries a fan-out runs at once.
    pub concurrency: usize,
    /// Limit for a single round trip.
    pub query_timeout: Duration,
    /// Limit for obtaining a pooled connection.
    pub acquire_timeout: Duration,
}

impl Default for InstanceOptions {
    fn default() -> Self {
        Self {
            max_connections_per_pool: DEFAULT_POOL_SIZE,
            concurrency: DEFAULT_CONCURRENCY,
            query_timeout: Duration::from_secs(30),
            acquire_timeout: Duration::from_secs(10),
        }
    }
}

impl InstanceOptions {
    /// Creates the default options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the pool size.
    #[must_use]
    pub fn max_connections_per_pool(mut self, max: u32) -> Self {
        self.max_connections_per_pool = max.max(1);
        self
    }

    /// Sets the fan-out width. Zero is treated as one.
    #[must_use]
    pub fn concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Sets the per-query timeout.
    #[must_use]
    pub fn query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout = timeout;
        self
    }

    /// Sets the connection acquire timeout.
    #[must_use]
    pub fn acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = timeout;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let opts = InstanceOptions::new();
        assert_eq!(opts.concurrency, 10);
        assert_eq!(opts.max_connections_per_pool, 10);
    }

    #[test]
    fn test_builder_clamps_zero() {
        let opts = InstanceOptions::new()
            .concurrency(0)
            .max_connections_per_pool(0)
            .query_timeout(Duration::from_millis(250));
        assert_eq!(opts.concurrency, 1);
        assert_eq!(opts.max_connections_per_pool, 1);
        assert_eq!(opts.query_timeout, Duration::from_millis(250));
    }
}
