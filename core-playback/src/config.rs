//! Configuration types for the playback pipeline: PCM ring and chunk queue
//! sizing, HTTP source connection limits, and CRC validation policy.

use serde::{Deserialize, Serialize};
use std::time::Duration;

// ============================================================================
// PCM ring / chunk queue / HTTP source / CRC policy configuration
// ============================================================================

/// Sizing for the pipeline's bounded PCM ring.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PcmRingConfig {
    /// High-water mark in samples (interleaved, i.e. frames × channels) at
    /// which the decoder worker stops producing. Default: one second at
    /// 44.1 kHz stereo.
    #[serde(default = "default_ring_high_water_samples")]
    pub high_water_samples: usize,
}

impl Default for PcmRingConfig {
    fn default() -> Self {
        Self {
            high_water_samples: default_ring_high_water_samples(),
        }
    }
}

impl PcmRingConfig {
    /// A high-water mark sized for one second at the given rate/channels.
    pub fn for_stream(sample_rate: u32, channels: u16) -> Self {
        Self {
            high_water_samples: sample_rate as usize * channels as usize,
        }
    }
}

fn default_ring_high_water_samples() -> usize {
    44_100 * 2
}

/// Sizing for the bounded compressed-chunk queue between demux and decode.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ChunkQueueConfig {
    #[serde(default = "default_chunk_queue_max_count")]
    pub max_count: usize,
    #[serde(default = "default_chunk_queue_max_bytes")]
    pub max_bytes: usize,
}

impl Default for ChunkQueueConfig {
    fn default() -> Self {
        Self {
            max_count: default_chunk_queue_max_count(),
            max_bytes: default_chunk_queue_max_bytes(),
        }
    }
}

fn default_chunk_queue_max_count() -> usize {
    8
}

fn default_chunk_queue_max_bytes() -> usize {
    256 * 1024
}

/// HTTP `IoSource` connection and window-cache sizing,
/// carrying the original implementation's connection-pool limits verbatim
/// (see `examples/original_source/include/io/http/HTTPClient.h`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpSourceConfig {
    /// Rolling read-ahead window size, resized under memory pressure.
    #[serde(default = "default_http_window_bytes")]
    pub window_bytes: usize,
    /// Cap on whole-resource buffering when the server refuses ranges.
    #[serde(default = "default_http_max_full_buffer_bytes")]
    pub max_full_buffer_bytes: u64,
    /// Idle timeout before a pooled connection is closed.
    #[serde(default = "default_http_idle_timeout")]
    pub idle_timeout: Duration,
    /// Requests served before a pooled connection is recycled.
    #[serde(default = "default_http_requests_per_connection")]
    pub requests_per_connection: u32,
}

impl Default for HttpSourceConfig {
    fn default() -> Self {
        Self {
            window_bytes: default_http_window_bytes(),
            max_full_buffer_bytes: default_http_max_full_buffer_bytes(),
            idle_timeout: default_http_idle_timeout(),
            requests_per_connection: default_http_requests_per_connection(),
        }
    }
}

fn default_http_window_bytes() -> usize {
    64 * 1024
}

fn default_http_max_full_buffer_bytes() -> u64 {
    32 * 1024 * 1024
}

fn default_http_idle_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_http_requests_per_connection() -> u32 {
    100
}

/// CRC-16 validation policy for FLAC frame footers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CrcPolicy {
    /// Log and continue on mismatch.
    Permissive,
    /// Reject the frame on mismatch.
    Strict,
    /// Skip CRC computation entirely.
    Disabled,
}

impl Default for CrcPolicy {
    fn default() -> Self {
        CrcPolicy::Strict
    }
}

/// Tracks consecutive CRC failures and auto-relaxes `Strict` to
/// `Permissive` past a threshold, so a corrupt stream can't burn CPU
/// rejecting every frame forever.
#[derive(Debug, Clone, Copy)]
pub struct CrcPolicyState {
    pub policy: CrcPolicy,
    pub consecutive_failures: u32,
    pub auto_disable_threshold: u32,
}

impl CrcPolicyState {
    pub fn new(policy: CrcPolicy) -> Self {
        Self {
            policy,
            consecutive_failures: 0,
            auto_disable_threshold: 10,
        }
    }

    /// Returns the policy that should actually govern the current frame,
    /// accounting for the auto-disable threshold.
    pub fn effective_policy(&self) -> CrcPolicy {
        if self.policy == CrcPolicy::Strict && self.consecutive_failures >= self.auto_disable_threshold {
            CrcPolicy::Permissive
        } else {
            self.policy
        }
    }

    pub fn record_failure(&mut self) {
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
    }

    pub fn record_success(&mut self) {
        self.consecutive_failures = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pcm_ring_config_for_stream() {
        let cfg = PcmRingConfig::for_stream(48000, 2);
        assert_eq!(cfg.high_water_samples, 96000);
    }

    #[test]
    fn chunk_queue_defaults_match_spec() {
        let cfg = ChunkQueueConfig::default();
        assert_eq!(cfg.max_count, 8);
        assert_eq!(cfg.max_bytes, 256 * 1024);
    }

    #[test]
    fn crc_policy_auto_disables_after_threshold() {
        let mut state = CrcPolicyState::new(CrcPolicy::Strict);
        assert_eq!(state.effective_policy(), CrcPolicy::Strict);
        for _ in 0..10 {
            state.record_failure();
        }
        assert_eq!(state.effective_policy(), CrcPolicy::Permissive);
        state.record_success();
        assert_eq!(state.effective_policy(), CrcPolicy::Strict);
    }
}
