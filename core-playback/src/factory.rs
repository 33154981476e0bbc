//! Opens a URI into a parsed [`Demuxer`] plus codec instances, by
//! dispatching on the URI scheme for the backing [`IoSource`] and running
//! layered content detection (MIME hint, then extension, then magic
//! bytes, then a structural probe) to pick the container.
//!
//! Grounded on the teacher's format-detection helpers (`decoder`'s
//! `FormatDetector`), generalized from a single-format Symphonia probe
//! into the registry-and-confidence-score scheme this pipeline needs.

use std::sync::OnceLock;

use tracing::debug;

#[cfg(feature = "http-streaming")]
use std::sync::Arc;

#[cfg(feature = "http-streaming")]
use bridge_traits::http::HttpClient;

use crate::codec::flac::FlacCodec;
use crate::codec::opus::OpusCodec;
use crate::codec::pcm::PcmCodec;
use crate::codec::speex::SpeexCodec;
use crate::codec::vorbis::VorbisCodec;
use crate::codec::AudioCodec;
use crate::config::HttpSourceConfig;
use crate::demux::aiff::AiffDemuxer;
use crate::demux::flac_native::FlacNativeDemuxer;
use crate::demux::iso::IsoDemuxer;
use crate::demux::ogg::OggDemuxer;
use crate::demux::raw::{RawDemuxer, RawFormatHint};
use crate::demux::riff::RiffDemuxer;
use crate::demux::{Demuxer, StreamInfo};
use crate::error::{PlaybackError, Result};
use crate::io::file::FileSource;
#[cfg(feature = "http-streaming")]
use crate::io::http::HttpSource;
use crate::io::IoSource;

const PROBE_WINDOW: usize = 64 * 1024;

/// One candidate container identification, with a confidence score so
/// the factory can pick deterministically among several that all match
/// (e.g. an `.ogg` extension on a file that also happens to start with a
/// RIFF-like byte run).
#[derive(Debug, Clone, Copy)]
struct Detection {
    container: &'static str,
    confidence: f32,
}

/// Maps a codec name (from a parsed [`StreamInfo`]) to a fresh,
/// uninitialized codec instance. Built once and reused — the table
/// itself holds only function pointers, so lookup never takes a lock.
struct CodecRegistry {
    entries: Vec<(&'static str, fn() -> Box<dyn AudioCodec>)>,
}

impl CodecRegistry {
    fn global() -> &'static CodecRegistry {
        static REGISTRY: OnceLock<CodecRegistry> = OnceLock::new();
        REGISTRY.get_or_init(|| CodecRegistry {
            entries: vec![
                ("flac", || Box::new(FlacCodec::default())),
                ("vorbis", || Box::new(VorbisCodec::default())),
                ("opus", || Box::new(OpusCodec::default())),
                ("speex", || Box::new(SpeexCodec::default())),
                ("pcm", || Box::new(PcmCodec::default())),
                ("alaw", || Box::new(PcmCodec::default())),
                ("mulaw", || Box::new(PcmCodec::default())),
            ],
        })
    }

    fn resolve(codec_name: &str) -> Result<Box<dyn AudioCodec>> {
        Self::global()
            .entries
            .iter()
            .find(|(name, _)| *name == codec_name)
            .map(|(_, ctor)| ctor())
            .ok_or_else(|| PlaybackError::Unsupported(format!("no codec registered for '{codec_name}'")))
    }
}

/// Builds a [`Demuxer`] for a detected container tag. Each container
/// needs a different construction argument (raw needs a format hint),
/// so this is a match rather than a uniform function-pointer table —
/// the container-to-constructor mapping it embodies is otherwise exactly
/// the registry the codec side uses.
fn build_demuxer(container: &str, io: Box<dyn IoSource>, raw_hint: Option<RawFormatHint>) -> Result<Box<dyn Demuxer>> {
    match container {
        "ogg" => Ok(Box::new(OggDemuxer::new(io))),
        "iso-mp4" => Ok(Box::new(IsoDemuxer::new(io))),
        "riff" => Ok(Box::new(RiffDemuxer::new(io))),
        "aiff" => Ok(Box::new(AiffDemuxer::new(io))),
        "flac-native" => Ok(Box::new(FlacNativeDemuxer::new(io))),
        "raw" => {
            let hint = raw_hint.unwrap_or(RawFormatHint {
                codec_name: "pcm",
                sample_rate: 44_100,
                channels: 2,
                bits_per_sample: 16,
            });
            Ok(Box::new(RawDemuxer::new(io, hint)))
        }
        other => Err(PlaybackError::Unsupported(format!("no demuxer registered for container '{other}'"))),
    }
}

fn detect_by_mime(mime: &str) -> Option<Detection> {
    let container = match mime.split(';').next()?.trim() {
        "audio/ogg" | "application/ogg" => "ogg",
        "audio/mp4" | "audio/m4a" | "audio/x-m4a" => "iso-mp4",
        "audio/wav" | "audio/x-wav" | "audio/wave" => "riff",
        "audio/aiff" | "audio/x-aiff" => "aiff",
        "audio/flac" | "audio/x-flac" => "flac-native",
        "audio/basic" => "raw",
        _ => return None,
    };
    Some(Detection { container, confidence: 0.95 })
}

fn detect_by_extension(path: &str) -> Option<Detection> {
    let ext = path.rsplit('.').next()?.to_ascii_lowercase();
    let container = match ext.as_str() {
        "ogg" | "oga" | "opus" | "spx" => "ogg",
        "m4a" | "mp4" | "m4b" => "iso-mp4",
        "wav" | "wave" => "riff",
        "aiff" | "aif" => "aiff",
        "flac" => "flac-native",
        "pcm" | "raw" | "alaw" | "al" | "ulaw" | "ul" | "mulaw" => "raw",
        _ => return None,
    };
    Some(Detection { container, confidence: 0.6 })
}

/// Inspects the first bytes of the resource for a container magic
/// number. This is the most reliable signal when available, since it
/// can't be spoofed by a misleading extension or a proxy's generic
/// `Content-Type`.
fn detect_by_magic(bytes: &[u8]) -> Option<Detection> {
    if bytes.len() >= 4 && &bytes[0..4] == b"OggS" {
        return Some(Detection { container: "ogg", confidence: 0.99 });
    }
    if bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WAVE" {
        return Some(Detection { container: "riff", confidence: 0.99 });
    }
    if bytes.len() >= 12 && &bytes[0..4] == b"FORM" && &bytes[8..12] == b"AIFF" {
        return Some(Detection { container: "aiff", confidence: 0.99 });
    }
    if bytes.len() >= 4 && &bytes[0..4] == b"fLaC" {
        return Some(Detection { container: "flac-native", confidence: 0.99 });
    }
    if bytes.len() >= 8 && &bytes[4..8] == b"ftyp" {
        return Some(Detection { container: "iso-mp4", confidence: 0.97 });
    }
    None
}

/// Opens media from a URI, detects its container, parses it, and hands
/// back an [`OpenedMedia`] the caller can pull [`StreamInfo`]s and
/// matching codecs from.
///
/// Owns nothing beyond construction parameters: each [`open`](Self::open)
/// call produces a fresh `IoSource` and `Demuxer`, whose lifetimes are
/// then owned by the caller (typically handed straight to a
/// `pipeline::Track`).
pub struct MediaFactory {
    #[cfg(feature = "http-streaming")]
    http_client: Option<Arc<dyn HttpClient>>,
    http_config: HttpSourceConfig,
}

impl MediaFactory {
    pub fn new() -> Self {
        Self {
            #[cfg(feature = "http-streaming")]
            http_client: None,
            http_config: HttpSourceConfig::default(),
        }
    }

    #[cfg(feature = "http-streaming")]
    pub fn with_http_client(client: Arc<dyn HttpClient>) -> Self {
        Self {
            http_client: Some(client),
            http_config: HttpSourceConfig::default(),
        }
    }

    fn open_source(&self, uri: &str) -> Result<Box<dyn IoSource>> {
        if let Some(_url) = uri.strip_prefix("http://").or_else(|| uri.strip_prefix("https://")) {
            #[cfg(feature = "http-streaming")]
            {
                let client = self
                    .http_client
                    .clone()
                    .ok_or_else(|| PlaybackError::Internal("MediaFactory has no HTTP client configured".into()))?;
                return Ok(Box::new(HttpSource::open(client, uri.to_string(), self.http_config.clone())?));
            }
            #[cfg(not(feature = "http-streaming"))]
            {
                return Err(PlaybackError::Unsupported("http-streaming feature not enabled".into()));
            }
        }
        let path = uri.strip_prefix("file://").unwrap_or(uri);
        Ok(Box::new(FileSource::open(path)?))
    }

    /// Runs the layered detection and returns the winning container tag.
    /// `mime` is an optional server-provided `Content-Type`; `uri` gives
    /// the extension fallback; `probe` is the first bytes of the source.
    fn detect_container(&self, uri: &str, mime: Option<&str>, probe: &[u8]) -> Result<&'static str> {
        let mut candidates: Vec<Detection> = Vec::new();
        if let Some(m) = mime.and_then(detect_by_mime) {
            candidates.push(m);
        }
        if let Some(m) = detect_by_magic(probe) {
            candidates.push(m);
        }
        if let Some(e) = detect_by_extension(uri) {
            candidates.push(e);
        }

        candidates
            .into_iter()
            .max_by(|a, b| a.confidence.partial_cmp(&b.confidence).unwrap())
            .map(|d| d.container)
            .or_else(|| {
                // Headerless audio (raw PCM/A-law/mu-law) has no magic
                // number at all; an extension hint is its only signal.
                detect_by_extension(uri).map(|d| d.container)
            })
            .ok_or_else(|| PlaybackError::Format(format!("could not detect container format for '{uri}'")))
    }

    /// Opens and parses `uri`, with an optional server-provided MIME type
    /// (HTTP callers should pass the response's `Content-Type`; local
    /// file callers pass `None`).
    pub fn open(&self, uri: &str, mime: Option<&str>) -> Result<OpenedMedia> {
        let mut io = self.open_source(uri)?;

        let mut probe = vec![0u8; PROBE_WINDOW];
        let read = io.read(&mut probe)?;
        probe.truncate(read);
        io.seek(0, crate::io::Whence::Start)?;

        let container = self.detect_container(uri, mime, &probe)?;
        debug!(container, uri, "detected container");

        let raw_hint = if container == "raw" {
            let ext = uri.rsplit('.').next().unwrap_or("");
            RawFormatHint::from_extension(ext)
        } else {
            None
        };

        let mut demuxer = build_demuxer(container, io, raw_hint)?;
        demuxer.parse_container()?;

        Ok(OpenedMedia { demuxer })
    }
}

impl Default for MediaFactory {
    fn default() -> Self {
        Self::new()
    }
}

/// A parsed container ready to hand streams off to codecs. Owns the
/// `Demuxer` (and transitively its `IoSource`) for the lifetime of
/// playback.
pub struct OpenedMedia {
    demuxer: Box<dyn Demuxer>,
}

impl OpenedMedia {
    pub fn streams(&self) -> &[StreamInfo] {
        self.demuxer.streams()
    }

    /// Builds and initializes the codec matching `stream_id`'s
    /// `codec_name`, per the registry resolved by [`CodecRegistry`].
    pub fn build_codec(&self, stream_id: u32) -> Result<Box<dyn AudioCodec>> {
        let info = self
            .streams()
            .iter()
            .find(|s| s.stream_id == stream_id)
            .ok_or_else(|| PlaybackError::Format(format!("no stream with id {stream_id}")))?;
        let mut codec = CodecRegistry::resolve(&info.codec_name)?;
        codec.initialize(&info.codec_private, info.sample_rate, info.channels)?;
        Ok(codec)
    }

    /// The first stream's id, for the common case of single-stream
    /// containers (everything but multi-track ISO-MP4).
    pub fn default_stream_id(&self) -> Option<u32> {
        self.streams().first().map(|s| s.stream_id)
    }

    pub fn into_demuxer(self) -> Box<dyn Demuxer> {
        self.demuxer
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_ogg_by_magic_over_misleading_extension() {
        let factory = MediaFactory::new();
        let bytes = b"OggS\x00\x02\x00\x00\x00\x00\x00\x00\x00\x00";
        let container = factory.detect_container("track.wav", None, bytes).unwrap();
        assert_eq!(container, "ogg");
    }

    #[test]
    fn falls_back_to_extension_for_headerless_raw() {
        let factory = MediaFactory::new();
        let container = factory.detect_container("track.alaw", None, &[]).unwrap();
        assert_eq!(container, "raw");
    }

    #[test]
    fn detects_riff_wave_by_magic() {
        let factory = MediaFactory::new();
        let mut bytes = vec![0u8; 12];
        bytes[0..4].copy_from_slice(b"RIFF");
        bytes[8..12].copy_from_slice(b"WAVE");
        let container = factory.detect_container("unnamed", None, &bytes).unwrap();
        assert_eq!(container, "riff");
    }

    #[test]
    fn detects_iso_mp4_ftyp_box() {
        let factory = MediaFactory::new();
        let mut bytes = vec![0u8; 12];
        bytes[4..8].copy_from_slice(b"ftyp");
        let container = factory.detect_container("unnamed", None, &bytes).unwrap();
        assert_eq!(container, "iso-mp4");
    }

    #[test]
    fn mime_hint_wins_over_extension() {
        let factory = MediaFactory::new();
        let container = factory.detect_container("track.wav", Some("audio/ogg"), &[]).unwrap();
        assert_eq!(container, "ogg");
    }

    #[test]
    fn unrecognized_uri_is_an_error() {
        let factory = MediaFactory::new();
        assert!(factory.detect_container("track.xyz", None, &[]).is_err());
    }

    #[test]
    fn codec_registry_resolves_known_names() {
        assert!(CodecRegistry::resolve("flac").is_ok());
        assert!(CodecRegistry::resolve("vorbis").is_ok());
        assert!(CodecRegistry::resolve("nonexistent").is_err());
    }
}
