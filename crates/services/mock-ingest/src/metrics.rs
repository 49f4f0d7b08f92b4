//! Metrics collection for the mock ingest server

use std::sync::atomic::{AtomicU64, Ordering};

/// Server metrics collector
#[derive(Default)]
pub struct Metrics {
    /// WHIP resources created since startup
    resources_created: AtomicU64,

    /// WHIP resources deleted by clients
    resources_deleted: AtomicU64,

    /// WHIP resources reclaimed after the idle timeout
    resources_reclaimed: AtomicU64,

    /// Current live WHIP resources
    active_resources: AtomicU64,

    /// Tokens issued by any token endpoint
    tokens_issued: AtomicU64,

    /// Requests refused for missing or invalid credentials
    auth_failures: AtomicU64,

    vod_sessions_created: AtomicU64,
    vod_sessions_finalized: AtomicU64,
    vod_chunks_received: AtomicU64,
    vod_bytes_received: AtomicU64,

    /// Startup timestamp (unix seconds)
    startup_time: AtomicU64,
}

impl Metrics {
    /// Create a new metrics collector
    pub fn new() -> Self {
        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();

        Self {
            startup_time: AtomicU64::new(now),
            ..Default::default()
        }
    }

    pub fn resource_created(&self) {
        self.resources_created.fetch_add(1, Ordering::Relaxed);
        self.active_resources.fetch_add(1, Ordering::Relaxed);
    }

    pub fn resource_deleted(&self) {
        self.resources_deleted.fetch_add(1, Ordering::Relaxed);
        self.active_resources.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn resource_reclaimed(&self) {
        self.resources_reclaimed.fetch_add(1, Ordering::Relaxed);
        self.active_resources.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn token_issued(&self) {
        self.tokens_issued.fetch_add(1, Ordering::Relaxed);
    }

    pub fn auth_failed(&self) {
        self.auth_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn vod_session_created(&self) {
        self.vod_sessions_created.fetch_add(1, Ordering::Relaxed);
    }

    pub fn vod_session_finalized(&self) {
        self.vod_sessions_finalized.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a received VOD chunk and its size
    pub fn vod_chunk_received(&self, bytes: u64) {
        self.vod_chunks_received.fetch_add(1, Ordering::Relaxed);
        self.vod_bytes_received.fetch_add(bytes, Ordering::Relaxed);
    }

    /// Get current metrics snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();

        let uptime_secs = now.saturating_sub(self.startup_time.load(Ordering::Relaxed));

        MetricsSnapshot {
            resources_created: self.resources_created.load(Ordering::Relaxed),
            resources_deleted: self.resources_deleted.load(Ordering::Relaxed),
            resources_reclaimed: self.resources_reclaimed.load(Ordering::Relaxed),
            active_resources: self.active_resources.load(Ordering::Relaxed),
            tokens_issued: self.tokens_issued.load(Ordering::Relaxed),
            auth_failures: self.auth_failures.load(Ordering::Relaxed),
            vod_sessions_created: self.vod_sessions_created.load(Ordering::Relaxed),
            vod_sessions_finalized: self.vod_sessions_finalized.load(Ordering::Relaxed),
            vod_chunks_received: self.vod_chunks_received.load(Ordering::Relaxed),
            vod_bytes_received: self.vod_bytes_received.load(Ordering::Relaxed),
            uptime_secs,
        }
    }
}

/// Snapshot of current metrics
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct MetricsSnapshot {
    pub resources_created: u64,
    pub resources_deleted: u64,
    pub resources_reclaimed: u64,
    pub active_resources: u64,
    pub tokens_issued: u64,
    pub auth_failures: u64,
    pub vod_sessions_created: u64,
    pub vod_sessions_finalized: u64,
    pub vod_chunks_received: u64,
    pub vod_bytes_received: u64,
    /// Seconds since startup
    pub uptime_secs: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resource_counters() {
        let metrics = Metrics::new();
        metrics.resource_created();
        metrics.resource_created();
        metrics.resource_deleted();
        metrics.resource_reclaimed();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.resources_created, 2);
        assert_eq!(snapshot.resources_deleted, 1);
        assert_eq!(snapshot.resources_reclaimed, 1);
        assert_eq!(snapshot.active_resources, 0);
    }

    #[test]
    fn test_vod_counters() {
        let metrics = Metrics::new();
        metrics.vod_chunk_received(1024);
        metrics.vod_chunk_received(512);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.vod_chunks_received, 2);
        assert_eq!(snapshot.vod_bytes_received, 1536);
    }
}
