//! VOD upload sessions
//!
//! Chunks are counted and measured but not stored.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize)]
pub struct ChunkInfo {
    pub filename: Option<String>,
    pub size: usize,
    pub received_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct VodSession {
    pub id: String,
    pub metadata: serde_json::Value,
    pub chunks: Vec<ChunkInfo>,
    pub finalized: bool,
    pub created_at: DateTime<Utc>,
}

impl VodSession {
    pub fn upload_url(&self) -> String {
        format!("/vod/upload/{}", self.id)
    }

    pub fn total_bytes(&self) -> usize {
        self.chunks.iter().map(|c| c.size).sum()
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum VodError {
    #[error("VOD session not found: {0}")]
    NotFound(String),

    #[error("VOD session already finalized: {0}")]
    Finalized(String),
}

#[derive(Default)]
pub struct VodStore {
    sessions: RwLock<HashMap<String, VodSession>>,
}

impl VodStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&self, metadata: serde_json::Value) -> VodSession {
        let simple = Uuid::new_v4().simple().to_string();
        let session = VodSession {
            id: simple[..12].to_string(),
            metadata,
            chunks: Vec::new(),
            finalized: false,
            created_at: Utc::now(),
        };
        self.sessions
            .write()
            .insert(session.id.clone(), session.clone());

        tracing::info!(vod_session_id = %session.id, "VOD session created");
        session
    }

    /// Record a chunk, returning the session's chunk count
    pub fn add_chunk(
        &self,
        id: &str,
        filename: Option<String>,
        size: usize,
    ) -> Result<usize, VodError> {
        let mut sessions = self.sessions.write();
        let session = sessions
            .get_mut(id)
            .ok_or_else(|| VodError::NotFound(id.to_string()))?;
        if session.finalized {
            return Err(VodError::Finalized(id.to_string()));
        }

        session.chunks.push(ChunkInfo {
            filename,
            size,
            received_at: Utc::now(),
        });
        tracing::debug!(vod_session_id = %id, size, chunks = session.chunks.len(), "VOD chunk received");
        Ok(session.chunks.len())
    }

    /// Mark the session finalized, returning its chunk count
    ///
    /// Finalizing twice returns the same count.
    pub fn finalize(&self, id: &str) -> Result<usize, VodError> {
        let mut sessions = self.sessions.write();
        let session = sessions
            .get_mut(id)
            .ok_or_else(|| VodError::NotFound(id.to_string()))?;

        if !session.finalized {
            session.finalized = true;
            tracing::info!(
                vod_session_id = %id,
                chunks = session.chunks.len(),
                total_bytes = session.total_bytes(),
                "VOD session finalized"
            );
        }
        Ok(session.chunks.len())
    }

    pub fn get(&self, id: &str) -> Option<VodSession> {
        self.sessions.read().get(id).cloned()
    }
}
