//! Error types for demuxing, decoding, and playback.

use thiserror::Error;

/// Errors that can occur anywhere in the media engine.
#[derive(Error, Debug)]
pub enum PlaybackError {
    // ========================================================================
    // I/O
    // ========================================================================
    /// Underlying I/O failure (file, network, or memory-mapped source).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The source does not yet hold enough bytes to complete the current
    /// parse. Not a failure: callers read more and retry.
    #[error("need {needed} more byte(s), have {available}")]
    NeedMore { needed: usize, available: usize },

    // ========================================================================
    // Format / Codec
    // ========================================================================
    /// Bitstream violates the container or codec's structural invariants.
    #[error("malformed {0}")]
    Format(String),

    /// Well-formed data that this build does not know how to demux or decode.
    #[error("unsupported: {0}")]
    Unsupported(String),

    /// A checksum embedded in the stream did not match the computed value.
    #[error("CRC mismatch in {context}: stored {stored:#x}, computed {computed:#x}")]
    CrcMismatch {
        context: &'static str,
        stored: u32,
        computed: u32,
    },

    /// Stream or chunk ended before a structurally required field was read.
    #[error("truncated {0}")]
    Truncated(String),

    /// An arithmetic quantity (sample count, box size, buffer index) would
    /// overflow its target type.
    #[error("overflow computing {0}")]
    Overflow(String),

    // ========================================================================
    // Resource limits
    // ========================================================================
    /// A bounded buffer or pool could not satisfy an allocation under its cap.
    #[error("memory limit exceeded: {0}")]
    Memory(String),

    // ========================================================================
    // Source
    // ========================================================================
    /// Audio source could not be opened.
    #[error("failed to open audio source: {0}")]
    SourceError(String),

    /// Audio source became unavailable mid-stream (network drop, file deleted).
    #[error("audio source unavailable: {0}")]
    SourceUnavailable(String),

    // ========================================================================
    // Streaming / pipeline
    // ========================================================================
    /// PCM ring ran dry while the consumer was still pulling.
    #[error("buffer underrun")]
    BufferUnderrun,

    // ========================================================================
    // Playback control
    // ========================================================================
    /// Seeking is not supported for this source/track combination.
    #[error("seeking not supported")]
    SeekNotSupported,

    /// Requested seek target lies outside the track's duration.
    #[error("seek position out of bounds: {0:?}")]
    SeekOutOfBounds(std::time::Duration),

    /// Catch-all for conditions that should not occur in normal operation.
    #[error("internal error: {0}")]
    Internal(String),
}

impl PlaybackError {
    /// `true` if a retry without changing inputs is reasonable.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            PlaybackError::BufferUnderrun
                | PlaybackError::SourceUnavailable(_)
                | PlaybackError::NeedMore { .. }
        )
    }

    /// `true` if this error originates from network I/O.
    pub fn is_network_error(&self) -> bool {
        matches!(self, PlaybackError::SourceUnavailable(_))
    }

    /// `true` if this error is a container/codec format problem rather than
    /// an I/O or resource problem.
    pub fn is_format_error(&self) -> bool {
        matches!(
            self,
            PlaybackError::Format(_)
                | PlaybackError::Unsupported(_)
                | PlaybackError::CrcMismatch { .. }
        )
    }
}

/// Result type used throughout the media engine.
pub type Result<T> = std::result::Result<T, PlaybackError>;
