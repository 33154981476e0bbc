//! RIFF/WAVE container demuxer: `fmt `, `data`, and `LIST/INFO` chunks.

use crate::error::{PlaybackError, Result};
use crate::io::{IoSource, Whence};

use super::{Demuxer, MediaChunk, StreamInfo, Timestamp};

const READ_BLOCK: usize = 32 * 1024;

struct FmtChunk {
    format_tag: u16,
    channels: u16,
    sample_rate: u32,
    bits_per_sample: u16,
}

pub struct RiffDemuxer {
    io: Box<dyn IoSource>,
    stream: Option<StreamInfo>,
    data_start: u64,
    data_len: u64,
    position: u64,
    eof: bool,
}

impl RiffDemuxer {
    pub fn new(io: Box<dyn IoSource>) -> Self {
        Self {
            io,
            stream: None,
            data_start: 0,
            data_len: 0,
            position: 0,
            eof: false,
        }
    }

    fn codec_name(fmt: &FmtChunk) -> &'static str {
        match fmt.format_tag {
            1 => "pcm",
            6 => "alaw",
            7 => "mulaw",
            _ => "pcm",
        }
    }
}

impl Demuxer for RiffDemuxer {
    fn parse_container(&mut self) -> Result<()> {
        let mut riff_header = [0u8; 12];
        self.io.read_exact(&mut riff_header)?;
        if &riff_header[0..4] != b"RIFF" || &riff_header[8..12] != b"WAVE" {
            return Err(PlaybackError::Format("not a RIFF/WAVE file".into()));
        }

        let mut fmt: Option<FmtChunk> = None;
        loop {
            let mut chunk_header = [0u8; 8];
            let n = self.io.read(&mut chunk_header)?;
            if n == 0 {
                break;
            }
            if n < 8 {
                return Err(PlaybackError::Truncated("RIFF chunk header".into()));
            }
            let chunk_id = &chunk_header[0..4];
            let chunk_size = u32::from_le_bytes(chunk_header[4..8].try_into().unwrap()) as u64;

            if chunk_id == b"fmt " {
                let mut body = vec![0u8; chunk_size as usize];
                self.io.read_exact(&mut body)?;
                if body.len() < 16 {
                    return Err(PlaybackError::Truncated("fmt chunk".into()));
                }
                fmt = Some(FmtChunk {
                    format_tag: u16::from_le_bytes(body[0..2].try_into().unwrap()),
                    channels: u16::from_le_bytes(body[2..4].try_into().unwrap()),
                    sample_rate: u32::from_le_bytes(body[4..8].try_into().unwrap()),
                    bits_per_sample: u16::from_le_bytes(body[14..16].try_into().unwrap()),
                });
            } else if chunk_id == b"data" {
                let fmt = fmt.as_ref().ok_or_else(|| PlaybackError::Format("data chunk before fmt chunk".into()))?;
                self.data_start = self.io.tell()?;
                self.data_len = chunk_size;
                let bytes_per_sample = (fmt.bits_per_sample / 8).max(1) as u32;
                let frame_bytes = bytes_per_sample * fmt.channels.max(1) as u32;
                let duration_samples = chunk_size / frame_bytes.max(1) as u64;
                let duration_ms = duration_samples.saturating_mul(1000) / fmt.sample_rate.max(1) as u64;

                self.stream = Some(StreamInfo {
                    stream_id: 0,
                    codec_name: Self::codec_name(fmt).to_string(),
                    container: "riff".to_string(),
                    sample_rate: fmt.sample_rate,
                    channels: fmt.channels,
                    bits_per_sample: fmt.bits_per_sample,
                    nominal_bitrate: None,
                    duration_samples: Some(duration_samples),
                    duration_ms: Some(duration_ms),
                    codec_private: Vec::new(),
                });
                // Position just past the data chunk so subsequent chunks
                // (e.g. a trailing LIST/INFO) can still be walked later if
                // needed; for now we stop here since audio data is found.
                self.io.seek((self.data_start + chunk_size) as i64, Whence::Start)?;
                break;
            } else {
                // LIST/INFO and anything else: skip over, honoring the
                // RIFF padding byte for odd-sized chunks.
                let skip = chunk_size + (chunk_size & 1);
                self.io.seek(skip as i64, Whence::Current)?;
            }
        }

        if self.stream.is_none() {
            return Err(PlaybackError::Format("no data chunk found".into()));
        }
        self.io.seek(self.data_start as i64, Whence::Start)?;
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
        let remaining = self.data_len.saturating_sub(self.position);
        if remaining == 0 {
            self.eof = true;
            return Ok(None);
        }
        let want = remaining.min(READ_BLOCK as u64) as usize;
        let mut buf = vec![0u8; want];
        let n = self.io.read(&mut buf)?;
        if n == 0 {
            self.eof = true;
            return Ok(None);
        }
        buf.truncate(n);
        self.position += n as u64;
        let end_of_stream = self.position >= self.data_len;
        let stream = self.stream.as_ref().unwrap();
        let bytes_per_sample = (stream.bits_per_sample / 8).max(1) as u64;
        let frame_bytes = bytes_per_sample * stream.channels.max(1) as u64;
        let sample_pos = self.position / frame_bytes.max(1);

        Ok(Some(MediaChunk {
            stream_id: 0,
            data: buf,
            timestamp: Timestamp::Samples(sample_pos),
            end_of_stream,
        }))
    }

    fn seek_to(&mut self, target_ms: u64) -> Result<()> {
        let stream = self.stream.as_ref().ok_or(PlaybackError::SeekNotSupported)?;
        let bytes_per_sample = (stream.bits_per_sample / 8).max(1) as u64;
        let frame_bytes = bytes_per_sample * stream.channels.max(1) as u64;
        let target_sample = target_ms.saturating_mul(stream.sample_rate.max(1) as u64) / 1000;
        let target_offset = target_sample.saturating_mul(frame_bytes).min(self.data_len);
        // Align down to a whole frame boundary.
        let aligned = target_offset - (target_offset % frame_bytes.max(1));
        self.io.seek((self.data_start + aligned) as i64, Whence::Start)?;
        self.position = aligned;
        self.eof = false;
        Ok(())
    }

    fn duration_ms(&self) -> u64 {
        self.stream.as_ref().and_then(|s| s.duration_ms).unwrap_or(0)
    }

    fn position_ms(&self) -> u64 {
        let stream = match &self.stream {
            Some(s) => s,
            None => return 0,
        };
        let bytes_per_sample = (stream.bits_per_sample / 8).max(1) as u64;
        let frame_bytes = bytes_per_sample * stream.channels.max(1) as u64;
        let sample_pos = self.position / frame_bytes.max(1);
        sample_pos.saturating_mul(1000) / stream.sample_rate.max(1) as u64
    }

    fn is_eof(&self) -> bool {
        self.eof
    }
}
