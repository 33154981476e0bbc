//! AIFF/AIFF-C container demuxer: big-endian mirror of [`super::riff`],
//! with `COMM`/`SSND` in place of `fmt `/`data` and an 80-bit IEEE 754
//! extended-precision sample rate field.

use crate::error::{PlaybackError, Result};
use crate::io::{IoSource, Whence};

use super::{Demuxer, MediaChunk, StreamInfo, Timestamp};

const READ_BLOCK: usize = 32 * 1024;

/// Decodes the 80-bit IEEE 754 extended-precision float AIFF uses for its
/// sample rate field. Values outside what a sane sample rate could be
/// collapse to 0 rather than panicking on an out-of-range shift.
fn extended_to_u32(bytes: &[u8; 10]) -> u32 {
    let sign = bytes[0] & 0x80 != 0;
    let exponent = (((bytes[0] as u16 & 0x7F) << 8) | bytes[1] as u16) as i32 - 16383;
    let mantissa = u64::from_be_bytes(bytes[2..10].try_into().unwrap());
    if sign || !(0..=63).contains(&exponent) {
        return 0;
    }
    let shift = 63 - exponent;
    if shift >= 64 {
        0
    } else {
        (mantissa >> shift) as u32
    }
}

struct CommChunk {
    channels: u16,
    sample_frames: u32,
    sample_size: u16,
    sample_rate: u32,
}

pub struct AiffDemuxer {
    io: Box<dyn IoSource>,
    stream: Option<StreamInfo>,
    data_start: u64,
    data_len: u64,
    position: u64,
    eof: bool,
}

impl AiffDemuxer {
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
}

impl Demuxer for AiffDemuxer {
    fn parse_container(&mut self) -> Result<()> {
        let mut form_header = [0u8; 12];
        self.io.read_exact(&mut form_header)?;
        if &form_header[0..4] != b"FORM" || !(&form_header[8..12] == b"AIFF" || &form_header[8..12] == b"AIFC") {
            return Err(PlaybackError::Format("not an AIFF/AIFF-C file".into()));
        }

        let mut comm: Option<CommChunk> = None;
        loop {
            let mut chunk_header = [0u8; 8];
            let n = self.io.read(&mut chunk_header)?;
            if n == 0 {
                break;
            }
            if n < 8 {
                return Err(PlaybackError::Truncated("AIFF chunk header".into()));
            }
            let chunk_id = &chunk_header[0..4];
            let chunk_size = u32::from_be_bytes(chunk_header[4..8].try_into().unwrap()) as u64;

            if chunk_id == b"COMM" {
                let mut body = vec![0u8; chunk_size as usize];
                self.io.read_exact(&mut body)?;
                if body.len() < 18 {
                    return Err(PlaybackError::Truncated("COMM chunk".into()));
                }
                let rate_bytes: [u8; 10] = body[8..18].try_into().unwrap();
                comm = Some(CommChunk {
                    channels: u16::from_be_bytes(body[0..2].try_into().unwrap()),
                    sample_frames: u32::from_be_bytes(body[2..6].try_into().unwrap()),
                    sample_size: u16::from_be_bytes(body[6..8].try_into().unwrap()),
                    sample_rate: extended_to_u32(&rate_bytes),
                });
            } else if chunk_id == b"SSND" {
                let comm = comm.as_ref().ok_or_else(|| PlaybackError::Format("SSND before COMM".into()))?;
                let mut offset_size = [0u8; 8];
                self.io.read_exact(&mut offset_size)?;
                let offset = u32::from_be_bytes(offset_size[0..4].try_into().unwrap()) as u64;
                self.io.seek(offset as i64, Whence::Current)?;
                self.data_start = self.io.tell()?;
                self.data_len = chunk_size.saturating_sub(8).saturating_sub(offset);

                let duration_ms = (comm.sample_frames as u64).saturating_mul(1000) / comm.sample_rate.max(1) as u64;
                self.stream = Some(StreamInfo {
                    stream_id: 0,
                    codec_name: "pcm".to_string(),
                    container: "aiff".to_string(),
                    sample_rate: comm.sample_rate,
                    channels: comm.channels,
                    bits_per_sample: comm.sample_size,
                    nominal_bitrate: None,
                    duration_samples: Some(comm.sample_frames as u64),
                    duration_ms: Some(duration_ms),
                    codec_private: Vec::new(),
                });
                self.io.seek((self.data_start + self.data_len) as i64, Whence::Start)?;
                break;
            } else {
                let skip = chunk_size + (chunk_size & 1);
                self.io.seek(skip as i64, Whence::Current)?;
            }
        }

        if self.stream.is_none() {
            return Err(PlaybackError::Format("no SSND chunk found".into()));
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::file::FileSource;

    fn rate_to_extended(rate: u32) -> [u8; 10] {
        // Minimal encoder for the common sample-rate values this test uses.
        let mut bytes = [0u8; 10];
        if rate == 0 {
            return bytes;
        }
        let exponent = 31 - rate.leading_zeros();
        let mantissa = (rate as u64) << (63 - exponent);
        let biased = exponent as u16 + 16383;
        bytes[0] = (biased >> 8) as u8;
        bytes[1] = (biased & 0xFF) as u8;
        bytes[2..10].copy_from_slice(&mantissa.to_be_bytes());
        bytes
    }

    fn build_aiff(sample_rate: u32, channels: u16, sample_size: u16, samples: &[u8]) -> Vec<u8> {
        let frame_bytes = (sample_size / 8).max(1) as usize * channels as usize;
        let sample_frames = (samples.len() / frame_bytes.max(1)) as u32;

        let mut comm = Vec::new();
        comm.extend_from_slice(&channels.to_be_bytes());
        comm.extend_from_slice(&sample_frames.to_be_bytes());
        comm.extend_from_slice(&sample_size.to_be_bytes());
        comm.extend_from_slice(&rate_to_extended(sample_rate));

        let mut ssnd = Vec::new();
        ssnd.extend_from_slice(&0u32.to_be_bytes()); // offset
        ssnd.extend_from_slice(&0u32.to_be_bytes()); // block size
        ssnd.extend_from_slice(samples);

        let mut data = Vec::new();
        data.extend_from_slice(b"FORM");
        let form_size = 4 + (8 + comm.len()) + (8 + ssnd.len());
        data.extend_from_slice(&(form_size as u32).to_be_bytes());
        data.extend_from_slice(b"AIFF");
        data.extend_from_slice(b"COMM");
        data.extend_from_slice(&(comm.len() as u32).to_be_bytes());
        data.extend_from_slice(&comm);
        data.extend_from_slice(b"SSND");
        data.extend_from_slice(&(ssnd.len() as u32).to_be_bytes());
        data.extend_from_slice(&ssnd);
        data
    }

    fn write_temp(data: &[u8], name: &str) -> std::path::PathBuf {
        let mut path = std::env::temp_dir();
        path.push(name);
        std::fs::write(&path, data).unwrap();
        path
    }

    #[test]
    fn parses_comm_sample_rate() {
        let samples = vec![0u8; 4 * 10];
        let aiff = build_aiff(44100, 2, 16, &samples);
        let path = write_temp(&aiff, "aiff-test-1.aiff");
        let mut demux = AiffDemuxer::new(Box::new(FileSource::open(&path).unwrap()));
        demux.parse_container().unwrap();
        assert_eq!(demux.streams()[0].sample_rate, 44100);
        assert_eq!(demux.streams()[0].channels, 2);
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn reads_full_ssnd_payload() {
        let samples = vec![9u8; 4 * 5];
        let aiff = build_aiff(22050, 2, 16, &samples);
        let path = write_temp(&aiff, "aiff-test-2.aiff");
        let mut demux = AiffDemuxer::new(Box::new(FileSource::open(&path).unwrap()));
        demux.parse_container().unwrap();
        let chunk = demux.read_chunk_any().unwrap().unwrap();
        assert_eq!(chunk.data.len(), 20);
        assert!(chunk.end_of_stream);
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn extended_float_zero_is_safe() {
        assert_eq!(extended_to_u32(&[0u8; 10]), 0);
    }
}
