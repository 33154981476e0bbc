//! The decode/playback pipeline: a demux worker thread pulls compressed
//! chunks from a [`Demuxer`] into a [`ChunkQueue`]; a decoder worker
//! thread drains that queue through an [`AudioCodec`] into a [`PcmRing`];
//! the audio consumer callback drains the ring.
//!
//! Grounded on a `StreamingService`-style adaptive run loop, but moved
//! from an async task polled by a host executor to real OS
//! threads coordinated with `parking_lot::Condvar`, since the pipeline's
//! wait/wake contract (a worker must sleep exactly until there's queue or
//! ring space, or a shutdown) is a better fit for a blocking wait than a
//! poll loop with fixed sleep durations.

pub mod chunk_queue;
pub mod ring;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use parking_lot::{Condvar, Mutex};
use tracing::{debug, error, warn};

use crate::codec::AudioCodec;
use crate::config::{ChunkQueueConfig, PcmRingConfig};
use crate::demux::Demuxer;
use crate::error::Result;

use self::chunk_queue::ChunkQueue;
use self::ring::PcmRing;

/// One loaded, playable stream: a demuxer positioned at a specific
/// elementary stream, paired with the codec that decodes it, the
/// compressed-chunk queue between them, and the PCM ring the decoder
/// worker writes into.
pub struct Track {
    demuxer: Box<dyn Demuxer>,
    codec: Box<dyn AudioCodec>,
    stream_id: u32,
    chunks: Arc<ChunkQueue>,
    ring: Arc<PcmRing>,
    /// Set once the demuxer has returned `None`, so the demux worker
    /// stops polling a finished container instead of re-querying it
    /// every time the queue has room.
    demux_done: AtomicBool,
    /// Set once the codec has been flushed at end-of-stream, so the
    /// decode worker calls `flush` exactly once per track.
    decode_done: AtomicBool,
}

impl Track {
    pub fn new(
        demuxer: Box<dyn Demuxer>,
        codec: Box<dyn AudioCodec>,
        stream_id: u32,
        ring_config: PcmRingConfig,
        chunk_queue_config: ChunkQueueConfig,
    ) -> Self {
        let info = demuxer.streams().iter().find(|s| s.stream_id == stream_id);
        let (sample_rate, channels) = info.map(|s| (s.sample_rate, s.channels)).unwrap_or((44_100, 2));
        let mut ring_config = ring_config;
        if ring_config.high_water_samples == 0 {
            ring_config = PcmRingConfig::for_stream(sample_rate, channels);
        }
        Self {
            demuxer,
            codec,
            stream_id,
            chunks: Arc::new(ChunkQueue::new(chunk_queue_config)),
            ring: Arc::new(PcmRing::new(ring_config)),
            demux_done: AtomicBool::new(false),
            decode_done: AtomicBool::new(false),
        }
    }

    pub fn ring(&self) -> Arc<PcmRing> {
        self.ring.clone()
    }
}

struct PipelineState {
    track: Option<Track>,
    /// Bumped on every track load/switch. Both workers snapshot this
    /// before doing work outside the lock, and only reinstate their
    /// borrowed `Track` if the generation is unchanged — otherwise a
    /// track switch happened mid-operation and the stale work is
    /// dropped rather than written into the new track's queue/ring.
    generation: u64,
    playing: bool,
}

/// Owns the demux and decoder worker threads plus the currently loaded
/// [`Track`].
///
/// Lock ordering: `inner` (this pipeline's mutex) is always acquired
/// before a track's `ChunkQueue`/`PcmRing` locks, never after, and both
/// workers release `inner` before touching the demuxer, codec, queue, or
/// ring.
pub struct PlaybackPipeline {
    inner: Arc<Mutex<PipelineState>>,
    wake: Arc<Condvar>,
    active: Arc<AtomicBool>,
    demux_worker: Option<JoinHandle<()>>,
    decode_worker: Option<JoinHandle<()>>,
}

impl PlaybackPipeline {
    pub fn new() -> Self {
        let inner = Arc::new(Mutex::new(PipelineState {
            track: None,
            generation: 0,
            playing: false,
        }));
        let wake = Arc::new(Condvar::new());
        let active = Arc::new(AtomicBool::new(true));

        let demux_worker = {
            let inner = inner.clone();
            let wake = wake.clone();
            let active = active.clone();
            std::thread::spawn(move || demux_worker_loop(inner, wake, active))
        };
        let decode_worker = {
            let inner = inner.clone();
            let wake = wake.clone();
            let active = active.clone();
            std::thread::spawn(move || decode_worker_loop(inner, wake, active))
        };

        Self {
            inner,
            wake,
            active,
            demux_worker: Some(demux_worker),
            decode_worker: Some(decode_worker),
        }
    }

    /// Loads a new track, replacing whatever was playing. Any chunk a
    /// worker is mid-decode on for the previous track is discarded once
    /// it notices the generation bump, rather than being written into
    /// the new track's queue or ring.
    pub fn load(&self, track: Track) {
        let ring = track.ring();
        let chunks = track.chunks.clone();
        let mut guard = self.inner.lock();
        guard.track = Some(track);
        guard.generation = guard.generation.wrapping_add(1);
        drop(guard);
        ring.clear();
        chunks.clear();
        self.wake.notify_all();
    }

    pub fn play(&self) {
        self.inner.lock().playing = true;
        self.wake.notify_all();
    }

    pub fn pause(&self) {
        self.inner.lock().playing = false;
    }

    pub fn is_playing(&self) -> bool {
        self.inner.lock().playing
    }

    /// Current ring, if a track is loaded. The audio consumer callback
    /// holds this clone across a read rather than re-locking `inner` per
    /// callback invocation.
    pub fn current_ring(&self) -> Option<Arc<PcmRing>> {
        self.inner.lock().track.as_ref().map(|t| t.ring())
    }

    /// Audio consumer callback: fills `out` from the current track's
    /// ring, waiting up to `timeout`, and zero-fills whatever the ring
    /// couldn't supply (underrun) rather than leaving stale samples.
    pub fn read_into(&self, out: &mut [i16], timeout: Duration) -> usize {
        match self.current_ring() {
            Some(ring) => {
                let written = ring.read_timeout(out, timeout);
                if written < out.len() {
                    out[written..].fill(0);
                }
                written
            }
            None => {
                out.fill(0);
                0
            }
        }
    }

    pub fn has_ended(&self) -> bool {
        match self.current_ring() {
            Some(ring) => ring.is_eof() && ring.fill_level() == 0,
            None => true,
        }
    }

    /// Tears down both worker threads. `playing` is cleared and the
    /// condvar is broadcast before `active` flips, and again after, so
    /// a worker's wait predicate — which always includes `|| !active` —
    /// can't be left sleeping past shutdown.
    pub fn shutdown(&mut self) {
        {
            let mut guard = self.inner.lock();
            guard.playing = false;
        }
        self.wake.notify_all();
        self.active.store(false, Ordering::Release);
        self.wake.notify_all();
        if let Some(handle) = self.demux_worker.take() {
            let _ = handle.join();
        }
        if let Some(handle) = self.decode_worker.take() {
            let _ = handle.join();
        }
    }
}

impl Default for PlaybackPipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for PlaybackPipeline {
    fn drop(&mut self) {
        if self.demux_worker.is_some() || self.decode_worker.is_some() {
            self.shutdown();
        }
    }
}

/// Pulls chunks from the demuxer into the chunk queue whenever there's
/// queue space and the pipeline is playing.
fn demux_worker_loop(inner: Arc<Mutex<PipelineState>>, wake: Arc<Condvar>, active: Arc<AtomicBool>) {
    loop {
        if !active.load(Ordering::Acquire) {
            return;
        }

        let (mut track, generation) = {
            let mut guard = inner.lock();
            loop {
                if !active.load(Ordering::Acquire) {
                    return;
                }
                let ready = guard.playing
                    && guard
                        .track
                        .as_ref()
                        .map(|t| !t.demux_done.load(Ordering::Acquire) && t.chunks.has_room())
                        .unwrap_or(false);
                if ready {
                    break;
                }
                wake.wait_for(&mut guard, Duration::from_millis(200));
            }
            let generation = guard.generation;
            match guard.track.take() {
                Some(track) => (track, generation),
                None => continue,
            }
        };

        let chunk_result = track.demuxer.read_chunk(track.stream_id);
        match &chunk_result {
            Ok(Some(_)) => {}
            Ok(None) => {
                track.demux_done.store(true, Ordering::Release);
                track.chunks.mark_eof();
            }
            Err(e) if e.is_transient() => warn!("transient demux error, will retry: {e}"),
            Err(e) => {
                error!("fatal demux error, ending track: {e}");
                track.demux_done.store(true, Ordering::Release);
                track.chunks.mark_eof();
            }
        }
        if let Ok(Some(chunk)) = chunk_result {
            track.chunks.push(chunk.data, &active);
        }

        let mut guard = inner.lock();
        if guard.generation == generation {
            guard.track = Some(track);
        }
        drop(guard);
        wake.notify_all();
    }
}

/// Drains the chunk queue through the codec into the PCM ring whenever
/// there's ring space and the pipeline is playing.
fn decode_worker_loop(inner: Arc<Mutex<PipelineState>>, wake: Arc<Condvar>, active: Arc<AtomicBool>) {
    loop {
        if !active.load(Ordering::Acquire) {
            return;
        }

        let (mut track, generation) = {
            let mut guard = inner.lock();
            loop {
                if !active.load(Ordering::Acquire) {
                    return;
                }
                let ready = guard.playing
                    && guard
                        .track
                        .as_ref()
                        .map(|t| {
                            !t.ring.is_above_high_water()
                                && !t.decode_done.load(Ordering::Acquire)
                                && (!t.chunks.is_empty() || t.chunks.is_eof_and_empty())
                        })
                        .unwrap_or(false);
                if ready {
                    break;
                }
                wake.wait_for(&mut guard, Duration::from_millis(200));
            }
            let generation = guard.generation;
            match guard.track.take() {
                Some(track) => (track, generation),
                None => continue,
            }
        };

        let popped = track.chunks.pop_timeout(Duration::from_millis(50));
        let at_eof = popped.is_none() && track.chunks.is_eof_and_empty();
        let step_result = match popped {
            Some(bytes) => track.codec.decode(&bytes),
            None if at_eof => {
                track.decode_done.store(true, Ordering::Release);
                track.codec.flush()
            }
            None => Ok(Vec::new()),
        };

        match &step_result {
            Ok(frames) => {
                for frame in frames {
                    track.ring.push(&frame.samples);
                }
            }
            Err(e) if e.is_transient() => warn!("transient decode error, will retry: {e}"),
            Err(e) => {
                error!("fatal decode error, ending track: {e}");
                track.decode_done.store(true, Ordering::Release);
            }
        }

        if at_eof {
            debug!("track reached end of stream");
        }

        let mut guard = inner.lock();
        if guard.generation == generation {
            if at_eof || track.decode_done.load(Ordering::Acquire) {
                track.ring.mark_eof();
            }
            guard.track = Some(track);
        }
        drop(guard);
        wake.notify_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::AudioFrame;
    use crate::demux::{MediaChunk, StreamInfo, Timestamp};

    struct CountingDemuxer {
        streams: Vec<StreamInfo>,
        chunks_left: u32,
    }

    impl Demuxer for CountingDemuxer {
        fn parse_container(&mut self) -> Result<()> {
            Ok(())
        }
        fn streams(&self) -> &[StreamInfo] {
            &self.streams
        }
        fn read_chunk_any(&mut self) -> Result<Option<MediaChunk>> {
            self.read_chunk(0)
        }
        fn read_chunk(&mut self, stream_id: u32) -> Result<Option<MediaChunk>> {
            if self.chunks_left == 0 {
                return Ok(None);
            }
            self.chunks_left -= 1;
            Ok(Some(MediaChunk {
                stream_id,
                data: vec![0u8; 4],
                timestamp: Timestamp::Samples(0),
                end_of_stream: self.chunks_left == 0,
            }))
        }
        fn seek_to(&mut self, _target_ms: u64) -> Result<()> {
            Ok(())
        }
        fn duration_ms(&self) -> u64 {
            0
        }
        fn position_ms(&self) -> u64 {
            0
        }
        fn is_eof(&self) -> bool {
            self.chunks_left == 0
        }
    }

    struct PassthroughCodec;

    impl AudioCodec for PassthroughCodec {
        fn initialize(&mut self, _codec_private: &[u8], _sample_rate: u32, _channels: u16) -> Result<()> {
            Ok(())
        }
        fn decode(&mut self, chunk: &[u8]) -> Result<Vec<AudioFrame>> {
            Ok(vec![AudioFrame {
                samples: vec![1i16; chunk.len()],
                sample_rate: 8_000,
                channels: 1,
                timestamp_samples: 0,
            }])
        }
        fn flush(&mut self) -> Result<Vec<AudioFrame>> {
            Ok(Vec::new())
        }
        fn reset(&mut self) {}
        fn name(&self) -> &'static str {
            "passthrough"
        }
        fn can_decode(&self, _codec_name: &str) -> bool {
            true
        }
    }

    fn stream_info() -> StreamInfo {
        StreamInfo {
            stream_id: 0,
            codec_name: "pcm".into(),
            container: "raw".into(),
            sample_rate: 8_000,
            channels: 1,
            bits_per_sample: 16,
            nominal_bitrate: None,
            duration_samples: None,
            duration_ms: None,
            codec_private: Vec::new(),
        }
    }

    fn test_track(chunks_left: u32, high_water_samples: usize) -> Track {
        let demuxer = CountingDemuxer { streams: vec![stream_info()], chunks_left };
        Track::new(
            Box::new(demuxer),
            Box::new(PassthroughCodec),
            0,
            PcmRingConfig { high_water_samples },
            ChunkQueueConfig { max_count: 8, max_bytes: 4096 },
        )
    }

    #[test]
    fn decodes_chunks_until_eof() {
        let mut pipeline = PlaybackPipeline::new();
        pipeline.load(test_track(3, 64));
        pipeline.play();

        let mut out = [0i16; 12];
        let deadline = std::time::Instant::now() + Duration::from_secs(2);
        let mut total = 0;
        while total < 12 && std::time::Instant::now() < deadline {
            total += pipeline.read_into(&mut out[total..], Duration::from_millis(100));
        }
        assert!(total > 0);
        pipeline.shutdown();
    }

    #[test]
    fn read_into_with_no_track_zero_fills() {
        let mut pipeline = PlaybackPipeline::new();
        let mut out = [9i16; 4];
        let n = pipeline.read_into(&mut out, Duration::from_millis(20));
        assert_eq!(n, 0);
        assert_eq!(out, [0, 0, 0, 0]);
        pipeline.shutdown();
    }

    #[test]
    fn shutdown_joins_workers_even_while_playing() {
        let mut pipeline = PlaybackPipeline::new();
        pipeline.load(test_track(1_000_000, 8));
        pipeline.play();
        std::thread::sleep(Duration::from_millis(20));
        pipeline.shutdown();
    }

    #[test]
    fn loading_new_track_discards_stale_worker_state() {
        let mut pipeline = PlaybackPipeline::new();
        pipeline.load(test_track(5, 64));
        pipeline.play();
        std::thread::sleep(Duration::from_millis(10));

        pipeline.load(test_track(1, 64));
        pipeline.play();

        let mut out = [0i16; 4];
        std::thread::sleep(Duration::from_millis(50));
        let _ = pipeline.read_into(&mut out, Duration::from_millis(100));
        pipeline.shutdown();
    }
}
