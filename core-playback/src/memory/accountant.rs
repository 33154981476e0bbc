//! Tracks allocations across the engine's buffer pools and derives a
//! pressure level from process RSS relative to total RAM, so pools can
//! shrink before the OS starts reclaiming pages for us.
//!
//! Unlike `CodecRegistry`/`MediaFactory`, this isn't wired up as a lazy
//! global: callers construct one explicitly (usually once, near startup)
//! and share it via `Arc`, so tests can swap in an accountant primed with
//! a fake RAM figure instead of reading the real machine's memory.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use sysinfo::System;
use tracing::debug;

/// Usage thresholds from spec: below 70% is normal, 70-85% is high, above
/// that is critical.
const HIGH_WATERMARK: f64 = 0.70;
const CRITICAL_WATERMARK: f64 = 0.85;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum PressureLevel {
    Normal,
    High,
    Critical,
}

impl PressureLevel {
    fn from_ratio(ratio: f64) -> Self {
        if ratio >= CRITICAL_WATERMARK {
            PressureLevel::Critical
        } else if ratio >= HIGH_WATERMARK {
            PressureLevel::High
        } else {
            PressureLevel::Normal
        }
    }
}

struct Sampler {
    system: System,
    /// Overrides `system`'s readings; set by tests to avoid depending on
    /// the real host's memory figures.
    fixed_total_bytes: Option<u64>,
    fixed_used_bytes: Option<u64>,
}

impl Sampler {
    fn real() -> Self {
        let mut system = System::new();
        system.refresh_memory();
        Self { system, fixed_total_bytes: None, fixed_used_bytes: None }
    }

    fn fixed(total_bytes: u64, used_bytes: u64) -> Self {
        Self { system: System::new(), fixed_total_bytes: Some(total_bytes), fixed_used_bytes: Some(used_bytes) }
    }

    fn total_bytes(&self) -> u64 {
        self.fixed_total_bytes.unwrap_or_else(|| self.system.total_memory())
    }

    fn used_bytes(&mut self) -> u64 {
        if let Some(used) = self.fixed_used_bytes {
            return used;
        }
        self.system.refresh_memory();
        self.system.used_memory()
    }
}

/// Central accountant for tagged buffer allocations plus system memory
/// pressure. Pools ask it for a recommended size before growing and check
/// `pressure()` to decide whether to shrink.
pub struct MemoryAccountant {
    sampler: Mutex<Sampler>,
    usage_by_tag: Mutex<HashMap<String, u64>>,
}

impl MemoryAccountant {
    /// Reads the real host's memory via `sysinfo`.
    pub fn new() -> Arc<Self> {
        Arc::new(Self { sampler: Mutex::new(Sampler::real()), usage_by_tag: Mutex::new(HashMap::new()) })
    }

    /// Built-for-test constructor: memory usage is whatever the caller
    /// says it is, not the host's.
    pub fn with_fixed_memory(total_bytes: u64, used_bytes: u64) -> Arc<Self> {
        Arc::new(Self { sampler: Mutex::new(Sampler::fixed(total_bytes, used_bytes)), usage_by_tag: Mutex::new(HashMap::new()) })
    }

    /// Records that `component` now holds `bytes` (replacing any prior
    /// figure for that tag, not adding to it — pools report their total
    /// footprint each time, not deltas).
    pub fn record(&self, component: &str, bytes: u64) {
        self.usage_by_tag.lock().insert(component.to_string(), bytes);
    }

    pub fn forget(&self, component: &str) {
        self.usage_by_tag.lock().remove(component);
    }

    /// Sum of everything every component has reported holding.
    pub fn tracked_bytes(&self) -> u64 {
        self.usage_by_tag.lock().values().sum()
    }

    pub fn usage_by_tag(&self) -> HashMap<String, u64> {
        self.usage_by_tag.lock().clone()
    }

    fn usage_ratio(&self) -> f64 {
        let mut sampler = self.sampler.lock();
        let total = sampler.total_bytes();
        if total == 0 {
            return 0.0;
        }
        sampler.used_bytes() as f64 / total as f64
    }

    pub fn pressure(&self) -> PressureLevel {
        let ratio = self.usage_ratio();
        let level = PressureLevel::from_ratio(ratio);
        debug!(target: "memory::accountant", ?level, ratio, "sampled memory pressure");
        level
    }

    /// Recommended buffer size for a pool requesting `requested_bytes`,
    /// scaled down under pressure. Never returns 0 so a pool always has
    /// room to make forward progress.
    pub fn recommended_bytes(&self, requested_bytes: u64) -> u64 {
        let scaled = match self.pressure() {
            PressureLevel::Normal => requested_bytes,
            PressureLevel::High => requested_bytes / 2,
            PressureLevel::Critical => requested_bytes / 4,
        };
        scaled.max(1)
    }

    /// Recommended maximum depth for a pool that currently wants
    /// `requested_depth` free slots.
    pub fn recommended_depth(&self, requested_depth: usize) -> usize {
        let scaled = match self.pressure() {
            PressureLevel::Normal => requested_depth,
            PressureLevel::High => requested_depth / 2,
            PressureLevel::Critical => requested_depth / 4,
        };
        scaled.max(1)
    }

    /// Whether speculative/read-ahead caching should be disabled outright.
    pub fn should_disable_speculative_caching(&self) -> bool {
        self.pressure() == PressureLevel::Critical
    }
}

impl Default for MemoryAccountant {
    fn default() -> Self {
        Self { sampler: Mutex::new(Sampler::real()), usage_by_tag: Mutex::new(HashMap::new()) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pressure_thresholds_match_spec_bands() {
        let normal = MemoryAccountant::with_fixed_memory(1_000, 690);
        assert_eq!(normal.pressure(), PressureLevel::Normal);

        let high = MemoryAccountant::with_fixed_memory(1_000, 700);
        assert_eq!(high.pressure(), PressureLevel::High);

        let critical = MemoryAccountant::with_fixed_memory(1_000, 850);
        assert_eq!(critical.pressure(), PressureLevel::Critical);
    }

    #[test]
    fn recommended_bytes_shrinks_under_pressure() {
        let accountant = MemoryAccountant::with_fixed_memory(1_000, 900);
        assert_eq!(accountant.recommended_bytes(1_000), 250);
    }

    #[test]
    fn recommended_bytes_never_reaches_zero() {
        let accountant = MemoryAccountant::with_fixed_memory(1_000, 900);
        assert_eq!(accountant.recommended_bytes(1), 1);
    }

    #[test]
    fn tracked_bytes_sums_recorded_components() {
        let accountant = MemoryAccountant::with_fixed_memory(1_000, 100);
        accountant.record("pcm_ring", 4_096);
        accountant.record("http_window", 65_536);
        assert_eq!(accountant.tracked_bytes(), 69_632);
        accountant.forget("pcm_ring");
        assert_eq!(accountant.tracked_bytes(), 65_536);
    }

    #[test]
    fn critical_pressure_disables_speculative_caching() {
        let accountant = MemoryAccountant::with_fixed_memory(1_000, 900);
        assert!(accountant.should_disable_speculative_caching());
        let normal = MemoryAccountant::with_fixed_memory(1_000, 100);
        assert!(!normal.should_disable_speculative_caching());
    }
}
