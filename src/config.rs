//! # Flow Configuration Module
//!
//! This module defines configuration structures for the flow engine,
//! including the idle-flow expiry timeout and the prompt cleanup policy.

use std::time::Duration;

use crate::transport::TransportError;

// Constants for flow configuration
pub const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 30 * 60; // Abandoned flows expire after 30 minutes
pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 60;

/// Policy for errors raised while deleting an answered step's prompt message.
///
/// Prompt cleanup is cosmetic: the selection is already recorded by the time
/// the prompt is deleted, so a failed delete must not fail the step. Which
/// failures are tolerated is a named choice rather than a blanket catch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CleanupPolicy {
    /// Tolerate every transport error during cleanup
    IgnoreAll,
    /// Tolerate only "message already gone"; surface everything else
    IgnoreMissingOnly,
}

impl CleanupPolicy {
    /// Whether a cleanup error is swallowed under this policy
    pub fn tolerates(&self, err: &TransportError) -> bool {
        match self {
            CleanupPolicy::IgnoreAll => true,
            CleanupPolicy::IgnoreMissingOnly => matches!(err, TransportError::NotFound),
        }
    }
}

/// Configuration structure for the flow engine
#[derive(Debug, Clone)]
pub struct FlowConfig {
    /// Seconds of inactivity after which a flow is evicted
    pub idle_timeout_secs: u64,
    /// Interval between idle sweeps, for callers that run one
    pub sweep_interval_secs: u64,
    /// Cleanup error policy for answered prompts
    pub cleanup: CleanupPolicy,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            idle_timeout_secs: DEFAULT_IDLE_TIMEOUT_SECS,
            sweep_interval_secs: DEFAULT_SWEEP_INTERVAL_SECS,
            cleanup: CleanupPolicy::IgnoreAll,
        }
    }
}

impl FlowConfig {
    /// Idle timeout as a `Duration`
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    /// Sweep interval as a `Duration`
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}
