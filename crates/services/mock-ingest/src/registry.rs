//! Live WHIP resources
//!
//! Every accepted offer creates a resource addressed by `Location`. Clients
//! are expected to DELETE it; resources that outlive the idle timeout are
//! reclaimed by [`ResourceRegistry::run_cleanup_loop`].

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::config::LimitsConfig;
use crate::metrics::Metrics;

/// One published stream as seen by the server
#[derive(Debug, Clone, Serialize)]
pub struct WhipResource {
    pub id: String,
    /// Token subject, when the request carried a valid token
    pub subject: Option<String>,
    pub room: Option<String>,
    pub offer_bytes: usize,
    pub created_at: DateTime<Utc>,
}

impl WhipResource {
    /// Path returned in `Location`
    pub fn location(&self) -> String {
        format!("/whip/publish/{}", self.id)
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Maximum resources reached: {0}")]
    LimitReached(usize),
}

/// In-memory store of WHIP resources
pub struct ResourceRegistry {
    resources: RwLock<HashMap<String, WhipResource>>,
    max_resources: usize,
    idle_timeout: Duration,
    metrics: Arc<Metrics>,
}

impl ResourceRegistry {
    pub fn new(limits: &LimitsConfig, metrics: Arc<Metrics>) -> Self {
        let idle_timeout = i64::try_from(limits.resource_idle_timeout_seconds)
            .ok()
            .and_then(Duration::try_seconds)
            .unwrap_or(Duration::MAX);

        Self {
            resources: RwLock::new(HashMap::new()),
            max_resources: limits.max_resources,
            idle_timeout,
            metrics,
        }
    }

    /// Register a resource for an accepted offer
    pub fn create(
        &self,
        subject: Option<String>,
        room: Option<String>,
        offer_bytes: usize,
    ) -> Result<WhipResource, RegistryError> {
        let mut resources = self.resources.write();
        if resources.len() >= self.max_resources {
            return Err(RegistryError::LimitReached(self.max_resources));
        }

        let simple = Uuid::new_v4().simple().to_string();
        let resource = WhipResource {
            id: simple[..12].to_string(),
            subject,
            room,
            offer_bytes,
            created_at: Utc::now(),
        };
        resources.insert(resource.id.clone(), resource.clone());
        drop(resources);

        self.metrics.resource_created();
        tracing::info!(resource_id = %resource.id, subject = ?resource.subject, "WHIP resource created");
        Ok(resource)
    }

    /// Remove a resource on client DELETE
    pub fn remove(&self, id: &str) -> Option<WhipResource> {
        let removed = self.resources.write().remove(id);
        if removed.is_some() {
            self.metrics.resource_deleted();
            tracing::info!(resource_id = %id, "WHIP resource deleted");
        }
        removed
    }

    pub fn get(&self, id: &str) -> Option<WhipResource> {
        self.resources.read().get(id).cloned()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.resources.read().contains_key(id)
    }

    pub fn active_count(&self) -> usize {
        self.resources.read().len()
    }

    /// Reclaim resources older than the idle timeout, returning their ids
    pub fn cleanup_expired_at(&self, now: DateTime<Utc>) -> Vec<String> {
        let mut resources = self.resources.write();
        let expired: Vec<String> = resources
            .values()
            .filter(|r| now - r.created_at >= self.idle_timeout)
            .map(|r| r.id.clone())
            .collect();

        for id in &expired {
            resources.remove(id);
        }
        drop(resources);

        for id in &expired {
            self.metrics.resource_reclaimed();
            tracing::info!(
                resource_id = %id,
                idle_timeout_secs = self.idle_timeout.num_seconds(),
                "Reclaimed WHIP resource that was never deleted"
            );
        }
        expired
    }

    pub fn cleanup_expired(&self) -> Vec<String> {
        self.cleanup_expired_at(Utc::now())
    }

    /// Run periodic reclamation until shutdown
    pub async fn run_cleanup_loop(
        self: Arc<Self>,
        interval_secs: u64,
        mut shutdown_rx: broadcast::Receiver<()>,
    ) {
        tracing::info!("Resource cleanup task started (interval: {}s)", interval_secs);

        loop {
            tokio::select! {
                _ = tokio::time::sleep(tokio::time::Duration::from_secs(interval_secs)) => {
                    self.cleanup_expired();
                }
                _ = shutdown_rx.recv() => {
                    tracing::info!("Resource cleanup task shutting down");
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry(max_resources: usize, idle_secs: u64) -> ResourceRegistry {
        let limits = LimitsConfig {
            max_resources,
            resource_idle_timeout_seconds: idle_secs,
            ..LimitsConfig::default()
        };
        ResourceRegistry::new(&limits, Arc::new(Metrics::new()))
    }

    #[test]
    fn test_create_and_remove() {
        let registry = registry(10, 60);
        let resource = registry.create(Some("streamer-1".into()), None, 42).unwrap();

        assert!(registry.contains(&resource.id));
        assert_eq!(resource.location(), format!("/whip/publish/{}", resource.id));
        assert_eq!(registry.active_count(), 1);

        assert!(registry.remove(&resource.id).is_some());
        assert!(registry.remove(&resource.id).is_none());
        assert_eq!(registry.active_count(), 0);
    }

    #[test]
    fn test_limit_enforced() {
        let registry = registry(1, 60);
        registry.create(None, None, 1).unwrap();
        assert_eq!(
            registry.create(None, None, 1).unwrap_err(),
            RegistryError::LimitReached(1)
        );
    }

    #[test]
    fn test_cleanup_reclaims_idle_resources() {
        let registry = registry(10, 60);
        let resource = registry.create(None, None, 1).unwrap();

        assert!(registry.cleanup_expired_at(Utc::now()).is_empty());

        let later = resource.created_at + Duration::seconds(60);
        assert_eq!(registry.cleanup_expired_at(later), vec![resource.id.clone()]);
        assert!(!registry.contains(&resource.id));
    }

    #[tokio::test]
    async fn test_cleanup_loop_stops_on_shutdown() {
        let registry = Arc::new(registry(10, 60));
        let (tx, rx) = broadcast::channel(1);

        let handle = tokio::spawn(registry.clone().run_cleanup_loop(3600, rx));
        tx.send(()).unwrap();
        handle.await.unwrap();
    }
}
