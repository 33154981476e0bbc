//! Bounded interleaved `i16` PCM ring buffer shared between the decoder
//! worker (producer) and the audio consumer callback.
//!
//! Unlike an overwrite-on-full ring, which drops the oldest samples once
//! full, this ring blocks the producer at a high-water mark
//! and blocks the consumer when empty, via a single [`Condvar`] pair. That
//! matches the pipeline's decoder-worker contract: a track's decode thread
//! must not race ahead of playback and should instead sleep until the
//! consumer drains enough of the buffer.

use std::collections::VecDeque;
use std::time::Duration;

use parking_lot::{Condvar, Mutex};

use crate::config::PcmRingConfig;

struct RingState {
    samples: VecDeque<i16>,
    /// Monotonic count of samples ever pushed, so the pipeline can report
    /// a stable playback position even as old samples are popped off.
    total_pushed: u64,
    /// Set once the decoder has no more frames for the current track.
    /// The consumer treats "empty and eof" as end-of-stream rather than
    /// underrun.
    eof: bool,
}

/// A bounded, blocking PCM ring. One [`PcmRing`] backs exactly one track's
/// worth of decoded audio; switching tracks replaces it.
pub struct PcmRing {
    state: Mutex<RingState>,
    not_full: Condvar,
    not_empty: Condvar,
    high_water_samples: usize,
}

impl PcmRing {
    pub fn new(config: PcmRingConfig) -> Self {
        Self {
            state: Mutex::new(RingState {
                samples: VecDeque::new(),
                total_pushed: 0,
                eof: false,
            }),
            not_full: Condvar::new(),
            not_empty: Condvar::new(),
            high_water_samples: config.high_water_samples,
        }
    }

    pub fn for_stream(sample_rate: u32, channels: u16) -> Self {
        Self::new(PcmRingConfig::for_stream(sample_rate, channels))
    }

    /// True once the ring holds at least the high-water mark of samples.
    /// The decoder worker's wait predicate uses this to stop producing.
    pub fn is_above_high_water(&self) -> bool {
        self.state.lock().samples.len() >= self.high_water_samples
    }

    pub fn fill_level(&self) -> usize {
        self.state.lock().samples.len()
    }

    pub fn high_water_samples(&self) -> usize {
        self.high_water_samples
    }

    /// Blocks while the ring is at or above the high-water mark. `active`
    /// is polled on every wake so a pipeline shutdown unblocks a producer
    /// that would otherwise wait forever.
    pub fn wait_until_not_full(&self, active: &std::sync::atomic::AtomicBool) {
        let mut guard = self.state.lock();
        while guard.samples.len() >= self.high_water_samples && active.load(std::sync::atomic::Ordering::Acquire) {
            self.not_full.wait_for(&mut guard, Duration::from_millis(200));
        }
    }

    /// Appends decoded samples, waking any consumer blocked on empty.
    pub fn push(&self, samples: &[i16]) {
        let mut guard = self.state.lock();
        guard.samples.extend(samples.iter().copied());
        guard.total_pushed += samples.len() as u64;
        drop(guard);
        self.not_empty.notify_all();
    }

    /// Marks end-of-stream: once drained, the consumer should treat this
    /// ring as finished rather than underrunning.
    pub fn mark_eof(&self) {
        let mut guard = self.state.lock();
        guard.eof = true;
        drop(guard);
        self.not_empty.notify_all();
    }

    pub fn is_eof(&self) -> bool {
        self.state.lock().eof
    }

    /// Fills `out` from the ring, waiting up to `timeout` for samples to
    /// become available. Returns the number of samples actually written;
    /// the caller is responsible for zero-filling the remainder on
    /// underrun, per the consumer callback contract.
    pub fn read_timeout(&self, out: &mut [i16], timeout: Duration) -> usize {
        let mut guard = self.state.lock();
        if guard.samples.is_empty() && !guard.eof {
            let result = self.not_empty.wait_for(&mut guard, timeout);
            if result.timed_out() && guard.samples.is_empty() {
                return 0;
            }
        }
        let mut written = 0;
        while written < out.len() {
            match guard.samples.pop_front() {
                Some(sample) => {
                    out[written] = sample;
                    written += 1;
                }
                None => break,
            }
        }
        drop(guard);
        if written > 0 {
            self.not_full.notify_all();
        }
        written
    }

    pub fn total_pushed(&self) -> u64 {
        self.state.lock().total_pushed
    }

    pub fn clear(&self) {
        let mut guard = self.state.lock();
        guard.samples.clear();
        guard.eof = false;
        guard.total_pushed = 0;
        drop(guard);
        self.not_full.notify_all();
    }
}
