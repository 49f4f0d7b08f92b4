//! Media capture capability
//!
//! The capture/encoder pipeline lives outside this crate (a native WebRTC
//! stack, a game engine, an OS screen recorder). The session manager only
//! needs two things from it: a place to send advisory quality changes and a
//! signal that the published tracks can be released. Implementations are
//! attached to each [`PublishSession`](crate::PublishSession).

use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::error::{Result, WhipError};

/// Target encoder settings for a live session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityProfile {
    pub bitrate_kbps: u32,
    pub width: u32,
    pub height: u32,
    pub fps: u32,
}

impl QualityProfile {
    pub fn new(bitrate_kbps: u32, width: u32, height: u32, fps: u32) -> Self {
        Self {
            bitrate_kbps,
            width,
            height,
            fps,
        }
    }

    /// Reject zero dimensions, rates or bitrates
    pub fn validate(&self) -> Result<()> {
        if self.bitrate_kbps == 0 || self.width == 0 || self.height == 0 || self.fps == 0 {
            return Err(WhipError::InvalidInput(format!(
                "quality profile values must be non-zero: {:?}",
                self
            )));
        }
        Ok(())
    }

    /// Bitrate as applied to RTP sender encodings
    pub fn max_bitrate_bps(&self) -> u64 {
        u64::from(self.bitrate_kbps) * 1000
    }
}

/// Capture/encoder layer driven by the session manager
pub trait MediaCapture: Send + Sync {
    /// Short identifier used in logs
    fn name(&self) -> &'static str;

    /// Apply an advisory quality change
    fn apply_quality(&self, profile: &QualityProfile) -> Result<()>;

    /// Stop and dispose published tracks
    fn release(&self);
}

/// Capture layer that does nothing
///
/// Used when the caller drives its media pipeline itself.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopCapture;

impl MediaCapture for NoopCapture {
    fn name(&self) -> &'static str {
        "noop"
    }

    fn apply_quality(&self, _profile: &QualityProfile) -> Result<()> {
        Ok(())
    }

    fn release(&self) {}
}

/// In-process capture that records what it was asked to do
///
/// Stands in for real capture in editor/simulator runs and tests.
#[derive(Debug)]
pub struct SimulatedCapture {
    max_width: u32,
    max_height: u32,
    applied: Mutex<Vec<QualityProfile>>,
    released: AtomicBool,
}

impl SimulatedCapture {
    /// Simulated source with the given native resolution
    pub fn new(max_width: u32, max_height: u32) -> Self {
        Self {
            max_width,
            max_height,
            applied: Mutex::new(Vec::new()),
            released: AtomicBool::new(false),
        }
    }

    /// Profiles applied so far, oldest first
    pub fn applied(&self) -> Vec<QualityProfile> {
        self.applied.lock().clone()
    }

    pub fn is_released(&self) -> bool {
        self.released.load(Ordering::SeqCst)
    }
}

impl Default for SimulatedCapture {
    fn default() -> Self {
        Self::new(1920, 1080)
    }
}

impl MediaCapture for SimulatedCapture {
    fn name(&self) -> &'static str {
        "simulated"
    }

    fn apply_quality(&self, profile: &QualityProfile) -> Result<()> {
        if profile.width > self.max_width || profile.height > self.max_height {
            return Err(WhipError::Capture(format!(
                "{}x{} exceeds source resolution {}x{}",
                profile.width, profile.height, self.max_width, self.max_height
            )));
        }
        self.applied.lock().push(*profile);
        Ok(())
    }

    fn release(&self) {
        self.released.store(true, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_validation() {
        assert!(QualityProfile::new(2500, 1280, 720, 30).validate().is_ok());
        assert!(QualityProfile::new(0, 1280, 720, 30).validate().is_err());
        assert!(QualityProfile::new(2500, 1280, 720, 0).validate().is_err());
        assert_eq!(QualityProfile::new(2500, 1280, 720, 30).max_bitrate_bps(), 2_500_000);
    }

    #[test]
    fn test_simulated_capture_records_and_limits() {
        let capture = SimulatedCapture::new(1280, 720);

        capture
            .apply_quality(&QualityProfile::new(1500, 960, 540, 30))
            .unwrap();
        let err = capture
            .apply_quality(&QualityProfile::new(6000, 1920, 1080, 60))
            .unwrap_err();

        assert!(matches!(err, WhipError::Capture(_)));
        assert_eq!(capture.applied().len(), 1);
        assert!(!capture.is_released());

        capture.release();
        assert!(capture.is_released());
    }
}
