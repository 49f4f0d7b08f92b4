//! Mock Substream ingest server
//!
//! Stands in for the media backend during demos and tests. WHIP offers are
//! echoed back as answers; no media is negotiated or received.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │                     substream-mock-ingest                     │
//! ├───────────────────────────────────────────────────────────────┤
//! │  ┌──────────────────┐                                         │
//! │  │  HTTP API (axum) │ ← POST/DELETE /whip/publish             │
//! │  │                  │ ← GET/POST /token, GET /pc/token        │
//! │  │                  │ ← POST /vod/...                         │
//! │  └───┬─────────┬────┘                                         │
//! │      │         │                                              │
//! │      ▼         ▼                                              │
//! │  ┌─────────┐ ┌──────────────┐   ┌───────────────────────────┐ │
//! │  │ Token   │ │  Resource    │◀──│  Cleanup loop             │ │
//! │  │ issuer  │ │  registry    │   │  (idle-timeout reclaim)   │ │
//! │  └─────────┘ └──────────────┘   └───────────────────────────┘ │
//! └───────────────────────────────────────────────────────────────┘
//! ```

pub mod api;
pub mod config;
pub mod metrics;
pub mod registry;
pub mod vod;

pub use api::{build_router, AppState};
pub use config::{Config, ConfigError};
