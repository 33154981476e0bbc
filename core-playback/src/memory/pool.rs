//! Bounded pool of reusable `Vec<u8>` scratch buffers (I/O read buffers,
//! codec work buffers), sized by asking a [`MemoryAccountant`] how much
//! room it currently has rather than by a fixed constant.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use super::accountant::MemoryAccountant;
use crate::error::{PlaybackError, Result};

/// One component's bounded buffer pool. Checked out buffers aren't
/// tracked individually; the pool reports its resting footprint
/// (`depth * buffer_bytes`) to the accountant after every checkin so
/// pressure readings stay current without per-checkout bookkeeping.
pub struct BufferPool {
    tag: String,
    accountant: Arc<MemoryAccountant>,
    free: Mutex<Vec<Vec<u8>>>,
    requested_buffer_bytes: usize,
    requested_depth: usize,
}

impl BufferPool {
    pub fn new(tag: impl Into<String>, accountant: Arc<MemoryAccountant>, buffer_bytes: usize, depth: usize) -> Self {
        let pool = Self {
            tag: tag.into(),
            accountant,
            free: Mutex::new(Vec::new()),
            requested_buffer_bytes: buffer_bytes,
            requested_depth: depth,
        };
        pool.report_usage();
        pool
    }

    /// Current recommended buffer size, shrinking under memory pressure.
    pub fn buffer_bytes(&self) -> usize {
        self.accountant.recommended_bytes(self.requested_buffer_bytes as u64) as usize
    }

    /// Current recommended pool depth, shrinking under memory pressure.
    pub fn max_depth(&self) -> usize {
        self.accountant.recommended_depth(self.requested_depth)
    }

    /// Takes a buffer from the free list, or allocates a new one sized to
    /// the current pressure-adjusted recommendation.
    pub fn checkout(&self) -> Vec<u8> {
        let mut free = self.free.lock();
        let target_len = self.buffer_bytes();
        match free.pop() {
            Some(mut buf) => {
                buf.clear();
                buf.resize(target_len, 0);
                buf
            }
            None => vec![0u8; target_len],
        }
    }

    /// Checks out a buffer of at least `min_bytes`, a hard floor below
    /// which the caller's work (a codec frame, a decode window) can't
    /// proceed at all. Tries the current pressure-adjusted recommendation
    /// first; if pressure has shrunk it below `min_bytes`, re-reports
    /// usage and retries once in case a concurrent checkin freed room.
    /// Fails with `PlaybackError::Memory` rather than handing back an
    /// undersized buffer.
    pub fn checkout_at_least(&self, min_bytes: usize) -> Result<Vec<u8>> {
        if self.buffer_bytes() >= min_bytes {
            return Ok(self.checkout());
        }
        self.report_usage();
        if self.buffer_bytes() >= min_bytes {
            return Ok(self.checkout());
        }
        Err(PlaybackError::Memory(format!(
            "pool '{}' can offer at most {} bytes, need {min_bytes}",
            self.tag,
            self.buffer_bytes()
        )))
    }

    /// Returns a buffer to the pool, unless the pool is already at (or
    /// above, after a pressure drop) its current recommended depth, or
    /// caching is disabled outright under critical pressure — in either
    /// case the buffer is simply dropped.
    pub fn checkin(&self, buf: Vec<u8>) {
        if self.accountant.should_disable_speculative_caching() {
            self.report_usage();
            return;
        }
        let mut free = self.free.lock();
        if free.len() < self.max_depth() {
            free.push(buf);
        }
        drop(free);
        self.report_usage();
    }

    /// Drops cached buffers down to `max_depth()`, called by the pressure
    /// monitor when a tighter band is entered.
    pub fn shrink_to_fit(&self) {
        let mut free = self.free.lock();
        let cap = self.max_depth();
        if free.len() > cap {
            debug!(target: "memory::pool", tag = %self.tag, from = free.len(), to = cap, "shrinking buffer pool under pressure");
            free.truncate(cap);
        }
        drop(free);
        self.report_usage();
    }

    pub fn len(&self) -> usize {
        self.free.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn report_usage(&self) {
        let bytes = (self.free.lock().len() * self.buffer_bytes()) as u64;
        self.accountant.record(&self.tag, bytes);
    }
}

impl Drop for BufferPool {
    fn drop(&mut self) {
        self.accountant.forget(&self.tag);
    }
}
