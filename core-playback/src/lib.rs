//! # Core Playback
//!
//! Container demuxing, audio decoding, and a producer/consumer playback
//! pipeline for the music platform.
//!
//! ## Overview
//!
//! - **Demuxers**: Ogg, ISO-BMFF/MP4 (including fragments), RIFF/WAVE,
//!   AIFF/AIFF-C, native FLAC, and extension-driven raw PCM.
//! - **Codecs**: FLAC (full subframe/residual/predictor decode), PCM and its
//!   companding variants (A-law, mu-law), and thin Vorbis/Opus/Speex header
//!   drivers.
//! - **Pipeline**: a demux worker and a decode worker cooperating through a
//!   bounded chunk queue and a bounded PCM ring, consumed by an audio
//!   callback thread.
//! - **Memory**: a central accountant tracking tagged allocations and
//!   deriving a pressure level that feeds back into buffer pool sizing.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   MediaChunk   ┌───────────────┐   AudioFrame   ┌────────────┐
//! │ demux worker │ ─────────────> │ decode worker │ ─────────────> │  PcmRing   │
//! │  (Demuxer)   │   ChunkQueue   │  (AudioCodec) │                └─────┬──────┘
//! └──────────────┘                └───────────────┘                      │ i16 samples
//!                                                                         ▼
//!                                                                 audio callback
//! ```
//!
//! ## Features
//!
//! - `http-streaming` (default): networked `IoSource` backed by an
//!   `HttpClient` implementation, with range-request window caching.

pub mod bitreader;
pub mod chained_stream;
pub mod codec;
pub mod config;
pub mod crc;
pub mod demux;
pub mod error;
pub mod factory;
pub mod io;
pub mod memory;
pub mod pipeline;
pub mod tags;

pub use chained_stream::{ChainLink, ChainedStream};
pub use codec::{AudioCodec, AudioFrame};
pub use demux::{Demuxer, MediaChunk, StreamInfo, Timestamp};
pub use error::{PlaybackError, Result};
pub use factory::{MediaFactory, OpenedMedia};
pub use memory::{BufferPool, MemoryAccountant, PressureLevel};
pub use pipeline::{PlaybackPipeline, Track};
