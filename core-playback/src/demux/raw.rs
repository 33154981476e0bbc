//! Headerless raw audio: extension/hint-driven PCM, A-law, or mu-law with
//! a synthetic duration computed from the source's known byte length.

use crate::error::{PlaybackError, Result};
use crate::io::{IoSource, SourceSize, Whence};

use super::{Demuxer, MediaChunk, StreamInfo, Timestamp};

const READ_BLOCK: usize = 32 * 1024;

#[derive(Debug, Clone, Copy)]
pub struct RawFormatHint {
    pub codec_name: &'static str,
    pub sample_rate: u32,
    pub channels: u16,
    pub bits_per_sample: u16,
}

impl RawFormatHint {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "alaw" | "al" => Some(Self { codec_name: "alaw", sample_rate: 8000, channels: 1, bits_per_sample: 8 }),
            "ulaw" | "ul" | "mulaw" => Some(Self { codec_name: "mulaw", sample_rate: 8000, channels: 1, bits_per_sample: 8 }),
            "pcm" | "raw" => Some(Self { codec_name: "pcm", sample_rate: 44100, channels: 2, bits_per_sample: 16 }),
            _ => None,
        }
    }
}

pub struct RawDemuxer {
    io: Box<dyn IoSource>,
    hint: RawFormatHint,
    stream: Option<StreamInfo>,
    position: u64,
    eof: bool,
}

impl RawDemuxer {
    pub fn new(io: Box<dyn IoSource>, hint: RawFormatHint) -> Self {
        Self {
            io,
            hint,
            stream: None,
            position: 0,
            eof: false,
        }
    }
}

impl Demuxer for RawDemuxer {
    fn parse_container(&mut self) -> Result<()> {
        let total_bytes = match self.io.size() {
            SourceSize::Known(n) => Some(n),
            SourceSize::Unknown => None,
        };
        let bytes_per_sample = (self.hint.bits_per_sample / 8).max(1) as u64;
        let frame_bytes = bytes_per_sample * self.hint.channels.max(1) as u64;
        let duration_samples = total_bytes.map(|n| n / frame_bytes.max(1));
        let duration_ms = duration_samples.map(|s| s.saturating_mul(1000) / self.hint.sample_rate.max(1) as u64);

        self.stream = Some(StreamInfo {
            stream_id: 0,
            codec_name: self.hint.codec_name.to_string(),
            container: "raw".to_string(),
            sample_rate: self.hint.sample_rate,
            channels: self.hint.channels,
            bits_per_sample: self.hint.bits_per_sample,
            nominal_bitrate: None,
            duration_samples,
            duration_ms,
            codec_private: Vec::new(),
        });
        Ok(())
    }

    fn streams(&self) -> &[StreamInfo] {
        std::slice::from_ref(self.stream.as_ref().expect("parse_container must run first"))
    }

    fn read_chunk_any(&mut self) -> Result<Option<MediaChunk>> {
        self.read_chunk(0)
    }

    fn read_chunk(&mut self, stream_id: u32) -> Result<Option<MediaChunk>> {
        if stream_id != 0 || self.eof {
            return Ok(None);
        }
        let mut buf = vec![0u8; READ_BLOCK];
        let n = self.io.read(&mut buf)?;
        if n == 0 {
            self.eof = true;
            return Ok(None);
        }
        buf.truncate(n);
        self.position += n as u64;
        let bytes_per_sample = (self.hint.bits_per_sample / 8).max(1) as u64;
        let frame_bytes = bytes_per_sample * self.hint.channels.max(1) as u64;
        let sample_pos = self.position / frame_bytes.max(1);

        Ok(Some(MediaChunk {
            stream_id: 0,
            data: buf,
            timestamp: Timestamp::Samples(sample_pos),
            end_of_stream: false,
        }))
    }

    fn seek_to(&mut self, target_ms: u64) -> Result<()> {
        let bytes_per_sample = (self.hint.bits_per_sample / 8).max(1) as u64;
        let frame_bytes = bytes_per_sample * self.hint.channels.max(1) as u64;
        let target_sample = target_ms.saturating_mul(self.hint.sample_rate.max(1) as u64) / 1000;
        let target_offset = target_sample.saturating_mul(frame_bytes);
        let aligned = target_offset - (target_offset % frame_bytes.max(1));
        self.io
            .seek(aligned as i64, Whence::Start)
            .map_err(|_| PlaybackError::SeekOutOfBounds(std::time::Duration::from_millis(target_ms)))?;
        self.position = aligned;
        self.eof = false;
        Ok(())
    }

    fn duration_ms(&self) -> u64 {
        self.stream.as_ref().and_then(|s| s.duration_ms).unwrap_or(0)
    }

    fn position_ms(&self) -> u64 {
        let bytes_per_sample = (self.hint.bits_per_sample / 8).max(1) as u64;
        let frame_bytes = bytes_per_sample * self.hint.channels.max(1) as u64;
        let sample_pos = self.position / frame_bytes.max(1);
        sample_pos.saturating_mul(1000) / self.hint.sample_rate.max(1) as u64
    }

    fn is_eof(&self) -> bool {
        self.eof
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::file::FileSource;

    fn write_temp(data: &[u8], name: &str) -> std::path::PathBuf {
        let mut path = std::env::temp_dir();
        path.push(name);
        std::fs::write(&path, data).unwrap();
        path
    }

    #[test]
    fn extension_hint_for_alaw() {
        let hint = RawFormatHint::from_extension("alaw").unwrap();
        assert_eq!(hint.codec_name, "alaw");
        assert_eq!(hint.sample_rate, 8000);
    }

    #[test]
    fn unknown_extension_returns_none() {
        assert!(RawFormatHint::from_extension("mp3").is_none());
    }

    #[test]
    fn computes_synthetic_duration_from_file_size() {
        let data = vec![0u8; 8000]; // 1 second of 8kHz mono 8-bit
        let path = write_temp(&data, "raw-test-1.alaw");
        let hint = RawFormatHint::from_extension("alaw").unwrap();
        let mut demux = RawDemuxer::new(Box::new(FileSource::open(&path).unwrap()), hint);
        demux.parse_container().unwrap();
        assert_eq!(demux.duration_ms(), 1000);
        std::fs::remove_file(path).ok();
    }
}
