//! Bounded queue of compressed (pre-decode) chunks between the demux
//! thread and the decoder worker, capped by both count and total bytes so
//! a burst of large chunks can't balloon memory even while under the
//! count limit.

use std::collections::VecDeque;
use std::time::Duration;

use parking_lot::{Condvar, Mutex};

use crate::config::ChunkQueueConfig;

struct QueueState {
    chunks: VecDeque<Vec<u8>>,
    bytes: usize,
    eof: bool,
}

pub struct ChunkQueue {
    state: Mutex<QueueState>,
    not_full: Condvar,
    not_empty: Condvar,
    config: ChunkQueueConfig,
}

impl ChunkQueue {
    pub fn new(config: ChunkQueueConfig) -> Self {
        Self {
            state: Mutex::new(QueueState {
                chunks: VecDeque::new(),
                bytes: 0,
                eof: false,
            }),
            not_full: Condvar::new(),
            not_empty: Condvar::new(),
            config,
        }
    }

    fn is_full(state: &QueueState, config: &ChunkQueueConfig) -> bool {
        state.chunks.len() >= config.max_count || state.bytes >= config.max_bytes
    }

    /// Blocks while the queue is full, then appends `chunk`. `active` is
    /// polled each wake so shutdown unblocks a stuck demux thread.
    pub fn push(&self, chunk: Vec<u8>, active: &std::sync::atomic::AtomicBool) {
        let mut guard = self.state.lock();
        while Self::is_full(&guard, &self.config) && active.load(std::sync::atomic::Ordering::Acquire) {
            self.not_full.wait_for(&mut guard, Duration::from_millis(200));
        }
        guard.bytes += chunk.len();
        guard.chunks.push_back(chunk);
        drop(guard);
        self.not_empty.notify_all();
    }

    pub fn mark_eof(&self) {
        let mut guard = self.state.lock();
        guard.eof = true;
        drop(guard);
        self.not_empty.notify_all();
    }

    pub fn is_eof_and_empty(&self) -> bool {
        let guard = self.state.lock();
        guard.eof && guard.chunks.is_empty()
    }

    /// Pops the next chunk, waiting up to `timeout`. Returns `None` on
    /// timeout or if the queue is drained and at EOF.
    pub fn pop_timeout(&self, timeout: Duration) -> Option<Vec<u8>> {
        let mut guard = self.state.lock();
        if guard.chunks.is_empty() && !guard.eof {
            self.not_empty.wait_for(&mut guard, timeout);
        }
        let popped = guard.chunks.pop_front();
        if let Some(ref chunk) = popped {
            guard.bytes = guard.bytes.saturating_sub(chunk.len());
        }
        drop(guard);
        if popped.is_some() {
            self.not_full.notify_all();
        }
        popped
    }

    pub fn len(&self) -> usize {
        self.state.lock().chunks.len()
    }

    /// True if the queue has room for another chunk without blocking.
    pub fn has_room(&self) -> bool {
        !Self::is_full(&self.state.lock(), &self.config)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn byte_len(&self) -> usize {
        self.state.lock().bytes
    }

    pub fn clear(&self) {
        let mut guard = self.state.lock();
        guard.chunks.clear();
        guard.bytes = 0;
        guard.eof = false;
        drop(guard);
        self.not_full.notify_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicBool;
    use std::sync::Arc;

    fn small_queue() -> ChunkQueue {
        ChunkQueue::new(ChunkQueueConfig { max_count: 2, max_bytes: 1024 })
    }

    #[test]
    fn push_then_pop_round_trips() {
        let q = small_queue();
        let active = AtomicBool::new(true);
        q.push(vec![1, 2, 3], &active);
        let popped = q.pop_timeout(Duration::from_millis(50)).unwrap();
        assert_eq!(popped, vec![1, 2, 3]);
    }

    #[test]
    fn pop_on_empty_non_eof_times_out() {
        let q = small_queue();
        assert!(q.pop_timeout(Duration::from_millis(20)).is_none());
    }

    #[test]
    fn eof_and_empty_reports_done() {
        let q = small_queue();
        assert!(!q.is_eof_and_empty());
        q.mark_eof();
        assert!(q.is_eof_and_empty());
    }

    #[test]
    fn byte_cap_blocks_even_under_count_cap() {
        let q = Arc::new(ChunkQueue::new(ChunkQueueConfig { max_count: 100, max_bytes: 4 }));
        let active = Arc::new(AtomicBool::new(true));
        q.push(vec![0; 4], &active);

        let blocked_q = q.clone();
        let blocked_active = active.clone();
        let handle = std::thread::spawn(move || {
            blocked_q.push(vec![0; 1], &blocked_active);
        });

        std::thread::sleep(Duration::from_millis(30));
        assert_eq!(q.len(), 1);
        q.pop_timeout(Duration::from_millis(50));
        handle.join().unwrap();
    }

    #[test]
    fn clear_resets_state() {
        let q = small_queue();
        let active = AtomicBool::new(true);
        q.push(vec![1], &active);
        q.mark_eof();
        q.clear();
        assert_eq!(q.len(), 0);
        assert!(!q.is_eof_and_empty());
    }
}
