//! Container demuxers and the [`Demuxer`] trait.

pub mod aiff;
pub mod flac_native;
pub mod iso;
pub mod ogg;
pub mod raw;
pub mod riff;

use crate::error::Result;

/// A timestamp in a packet stream: either known or not-yet-determined.
/// Ogg pages can carry an unknown granule (`-1` in the wire format) for
/// continuation pages; this is that value, not a sentinel `u64::MAX`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timestamp {
    Samples(u64),
    Unknown,
}

/// Descriptor for one elementary stream inside a container.
#[derive(Debug, Clone)]
pub struct StreamInfo {
    pub stream_id: u32,
    /// Codec family tag: `"pcm"`, `"flac"`, `"vorbis"`, `"opus"`, `"speex"`,
    /// `"mulaw"`, `"alaw"`, etc.
    pub codec_name: String,
    /// Container tag: `"ogg"`, `"iso-mp4"`, `"riff"`, `"aiff"`, `"flac-native"`, `"raw"`.
    pub container: String,
    pub sample_rate: u32,
    pub channels: u16,
    pub bits_per_sample: u16,
    pub nominal_bitrate: Option<u32>,
    pub duration_samples: Option<u64>,
    pub duration_ms: Option<u64>,
    /// Codec-private configuration bytes: Opus ID header, FLAC STREAMINFO,
    /// Vorbis's three setup packets concatenated with length prefixes, etc.
    pub codec_private: Vec<u8>,
}

impl StreamInfo {
    /// Panics only on genuine programmer error (constructing an invariant
    /// violation directly) — callers parsing untrusted bytes should reject
    /// before calling this, not rely on it to validate for them.
    pub fn assert_invariants(&self) {
        assert!(self.sample_rate >= 1, "sample_rate must be >= 1");
        assert!(self.channels >= 1, "channels must be >= 1");
    }
}

/// A contiguous run of compressed bytes for one stream.
#[derive(Debug, Clone)]
pub struct MediaChunk {
    pub stream_id: u32,
    pub data: Vec<u8>,
    pub timestamp: Timestamp,
    pub end_of_stream: bool,
}

/// Parses a container, enumerates its elementary streams, and yields
/// compressed chunks in decode order.
///
/// `parse_container` must be called exactly once before any other method.
/// Implementations must leave the underlying `IoSource` position unchanged
/// relative to where it started, on a successful parse.
pub trait Demuxer: Send {
    fn parse_container(&mut self) -> Result<()>;

    fn streams(&self) -> &[StreamInfo];

    /// Next packet in decode order, regardless of stream. `None` at EOF.
    fn read_chunk_any(&mut self) -> Result<Option<MediaChunk>>;

    /// Next packet belonging to `stream_id`, skipping others. `None` at EOF.
    fn read_chunk(&mut self, stream_id: u32) -> Result<Option<MediaChunk>>;

    /// Seeks so that the next `read_chunk` returns a packet at or before
    /// `target_ms`. The codec may need to discard samples to reach the
    /// exact target.
    fn seek_to(&mut self, target_ms: u64) -> Result<()>;

    /// Stream duration in milliseconds, or 0 if not yet known (may be
    /// computed lazily without blocking the caller).
    fn duration_ms(&self) -> u64;

    /// Timestamp, in milliseconds, of the last chunk returned.
    fn position_ms(&self) -> u64;

    fn is_eof(&self) -> bool;
}
