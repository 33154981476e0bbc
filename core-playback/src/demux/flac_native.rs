//! Native FLAC container: metadata block walker + raw frame-byte chunker.
//!
//! FLAC frames carry no explicit length field, so this demuxer does not
//! attempt to split them itself. It hands the codec raw byte blocks in
//! order; [`crate::codec::flac`] reassembles frame boundaries using its
//! own `BitReader`, whose `feed`/`NeedMore` contract is built exactly for
//! streaming input like this.

use crate::error::{PlaybackError, Result};
use crate::io::{IoSource, Whence};

use super::{Demuxer, MediaChunk, StreamInfo, Timestamp};

const READ_BLOCK: usize = 32 * 1024;

pub struct FlacNativeDemuxer {
    io: Box<dyn IoSource>,
    stream: Option<StreamInfo>,
    audio_start: u64,
    position: u64,
    eof: bool,
}

impl FlacNativeDemuxer {
    pub fn new(io: Box<dyn IoSource>) -> Self {
        Self {
            io,
            stream: None,
            audio_start: 0,
            position: 0,
            eof: false,
        }
    }
}

fn parse_streaminfo(body: &[u8]) -> Result<(u32, u16, u16, u64)> {
    if body.len() < 34 {
        return Err(PlaybackError::Truncated("STREAMINFO".into()));
    }
    // Bytes 10..18 pack: sample_rate(20) | channels-1(3) | bits_per_sample-1(5) | total_samples(36)
    let packed = u64::from_be_bytes(body[10..18].try_into().unwrap());
    let sample_rate = ((packed >> 44) & 0xF_FFFF) as u32;
    let channels = (((packed >> 41) & 0x7) + 1) as u16;
    let bits_per_sample = (((packed >> 36) & 0x1F) + 1) as u16;
    let total_samples = packed & 0xF_FFFF_FFFF;
    Ok((sample_rate, channels, bits_per_sample, total_samples))
}

impl Demuxer for FlacNativeDemuxer {
    fn parse_container(&mut self) -> Result<()> {
        let mut magic = [0u8; 4];
        self.io.read_exact(&mut magic)?;
        if &magic != b"fLaC" {
            return Err(PlaybackError::Format("missing fLaC marker".into()));
        }

        let mut streaminfo_raw = Vec::new();
        let mut sample_rate = 0u32;
        let mut channels = 0u16;
        let mut bits_per_sample = 0u16;
        let mut total_samples = 0u64;

        loop {
            let mut header = [0u8; 4];
            self.io.read_exact(&mut header)?;
            let is_last = header[0] & 0x80 != 0;
            let block_type = header[0] & 0x7F;
            let length = u32::from_be_bytes([0, header[1], header[2], header[3]]) as usize;
            let mut body = vec![0u8; length];
            self.io.read_exact(&mut body)?;

            if block_type == 0 {
                // STREAMINFO
                let (rate, ch, bits, samples) = parse_streaminfo(&body)?;
                sample_rate = rate;
                channels = ch;
                bits_per_sample = bits;
                total_samples = samples;
                streaminfo_raw = body;
            }
            // SEEKTABLE(3)/VORBIS_COMMENT(4)/CUESHEET(5)/PICTURE(6)/PADDING(1)/
            // APPLICATION(2) are walked but not retained by the container
            // layer; tag and picture extraction happens via crate::tags
            // against the raw bytes when the host asks for them.

            if is_last {
                break;
            }
        }

        if sample_rate == 0 {
            return Err(PlaybackError::Format("no STREAMINFO block found".into()));
        }

        self.audio_start = self.io.tell()?;
        let duration_ms = if sample_rate > 0 {
            total_samples.saturating_mul(1000) / sample_rate as u64
        } else {
            0
        };

        self.stream = Some(StreamInfo {
            stream_id: 0,
            codec_name: "flac".to_string(),
            container: "flac-native".to_string(),
            sample_rate,
            channels,
            bits_per_sample,
            nominal_bitrate: None,
            duration_samples: if total_samples > 0 { Some(total_samples) } else { None },
            duration_ms: if total_samples > 0 { Some(duration_ms) } else { None },
            codec_private: streaminfo_raw,
        });

        self.io.seek(self.audio_start as i64, Whence::Start)?;
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
        Ok(Some(MediaChunk {
            stream_id: 0,
            data: buf,
            timestamp: Timestamp::Unknown,
            end_of_stream: false,
        }))
    }

    fn seek_to(&mut self, target_ms: u64) -> Result<()> {
        // Without a SEEKTABLE index this falls back to rewinding to the
        // first frame; a codec-level seek table (when present in the
        // metadata) is consulted by the pipeline before calling this.
        let _ = target_ms;
        self.io.seek(self.audio_start as i64, Whence::Start)?;
        self.position = 0;
        self.eof = false;
        Ok(())
    }

    fn duration_ms(&self) -> u64 {
        self.stream.as_ref().and_then(|s| s.duration_ms).unwrap_or(0)
    }

    fn position_ms(&self) -> u64 {
        0
    }

    fn is_eof(&self) -> bool {
        self.eof
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::file::FileSource;

    fn build_streaminfo(sample_rate: u32, channels: u16, bits: u16, total_samples: u64) -> Vec<u8> {
        let mut body = vec![0u8; 34];
        body[0..2].copy_from_slice(&4096u16.to_be_bytes()); // min block size
        body[2..4].copy_from_slice(&4096u16.to_be_bytes()); // max block size
        let packed: u64 = ((sample_rate as u64 & 0xF_FFFF) << 44)
            | (((channels as u64 - 1) & 0x7) << 41)
            | (((bits as u64 - 1) & 0x1F) << 36)
            | (total_samples & 0xF_FFFF_FFFF);
        body[10..18].copy_from_slice(&packed.to_be_bytes());
        body
    }

    fn build_flac(sample_rate: u32, channels: u16, bits: u16, total_samples: u64, audio: &[u8]) -> Vec<u8> {
        let mut data = Vec::new();
        data.extend_from_slice(b"fLaC");
        let streaminfo = build_streaminfo(sample_rate, channels, bits, total_samples);
        data.push(0x80); // last-block flag, type 0 (STREAMINFO)
        data.extend_from_slice(&(streaminfo.len() as u32).to_be_bytes()[1..4]);
        data.extend_from_slice(&streaminfo);
        data.extend_from_slice(audio);
        data
    }

    fn write_temp(data: &[u8], name: &str) -> std::path::PathBuf {
        let mut path = std::env::temp_dir();
        path.push(name);
        std::fs::write(&path, data).unwrap();
        path
    }

    #[test]
    fn parses_streaminfo_fields() {
        let flac = build_flac(44100, 2, 16, 88200, &[0u8; 64]);
        let path = write_temp(&flac, "flacnative-test-1.flac");
        let mut demux = FlacNativeDemuxer::new(Box::new(FileSource::open(&path).unwrap()));
        demux.parse_container().unwrap();
        let info = &demux.streams()[0];
        assert_eq!(info.sample_rate, 44100);
        assert_eq!(info.channels, 2);
        assert_eq!(info.bits_per_sample, 16);
        assert_eq!(info.duration_samples, Some(88200));
        assert_eq!(info.codec_private.len(), 34);
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn reads_frame_bytes_opaquely() {
        let audio = vec![0xAAu8; 100];
        let flac = build_flac(8000, 1, 16, 0, &audio);
        let path = write_temp(&flac, "flacnative-test-2.flac");
        let mut demux = FlacNativeDemuxer::new(Box::new(FileSource::open(&path).unwrap()));
        demux.parse_container().unwrap();
        let chunk = demux.read_chunk_any().unwrap().unwrap();
        assert_eq!(chunk.data, audio);
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn rejects_missing_marker() {
        let path = write_temp(b"NOPE", "flacnative-test-3.flac");
        let mut demux = FlacNativeDemuxer::new(Box::new(FileSource::open(&path).unwrap()));
        assert!(demux.parse_container().is_err());
        std::fs::remove_file(path).ok();
    }
}
