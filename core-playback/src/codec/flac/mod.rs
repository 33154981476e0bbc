//! FLAC decoder: frame parsing, fixed/LPC prediction, partitioned Rice
//! residuals, and stereo decorrelation, tied together into an [`AudioCodec`].
//!
//! The container layer (`crate::demux::flac_native`, and the native-FLAC
//! path inside `crate::demux::ogg`/`crate::demux::iso`) hands this codec
//! opaque byte chunks; frame boundaries are recovered here via
//! [`BitReader`]'s `feed`/`NeedMore` streaming contract rather than by the
//! demuxer pre-splitting frames.

mod decorrelate;
mod frame;
mod predictor;
mod residual;

use md5::{Digest, Md5};

use crate::bitreader::BitReader;
use crate::config::{CrcPolicy, CrcPolicyState};
use crate::crc::crc16;
use crate::error::{PlaybackError, Result};

use self::frame::ChannelAssignment;

use super::{AudioCodec, AudioFrame};

fn parse_streaminfo(body: &[u8]) -> Result<(u32, u16, u16, u64, [u8; 16])> {
    if body.len() < 34 {
        return Err(PlaybackError::Truncated("STREAMINFO".into()));
    }
    let packed = u64::from_be_bytes(body[10..18].try_into().unwrap());
    let sample_rate = ((packed >> 44) & 0xF_FFFF) as u32;
    let channels = (((packed >> 41) & 0x7) + 1) as u16;
    let bits_per_sample = (((packed >> 36) & 0x1F) + 1) as u16;
    let total_samples = packed & 0xF_FFFF_FFFF;
    let mut md5 = [0u8; 16];
    md5.copy_from_slice(&body[18..34]);
    Ok((sample_rate, channels, bits_per_sample, total_samples, md5))
}

fn scale_to_i16(value: i64, bits_per_sample: u16) -> i16 {
    let bits = bits_per_sample as i64;
    let widened = if bits <= 16 {
        value << (16 - bits)
    } else {
        let shift = bits - 16;
        (value + (1 << (shift - 1))) >> shift
    };
    widened.clamp(i16::MIN as i64, i16::MAX as i64) as i16
}

/// Appends `value`, truncated to `bits_per_sample` and packed little-endian
/// over `bytes_per_sample` bytes, the way the reference encoder feeds its
/// running stream MD5 (RFC 9639 section 11).
fn push_md5_sample(buf: &mut Vec<u8>, value: i64, bytes_per_sample: usize) {
    let bytes = value.to_le_bytes();
    buf.extend_from_slice(&bytes[0..bytes_per_sample]);
}

pub struct FlacCodec {
    reader: BitReader,
    sample_rate: u32,
    channels: u16,
    bits_per_sample: u16,
    expected_md5: Option<[u8; 16]>,
    hasher: Md5,
    position_samples: u64,
    crc_state: CrcPolicyState,
    scratch: Vec<u8>,
}

impl Default for FlacCodec {
    fn default() -> Self {
        Self::with_crc_policy(CrcPolicy::default())
    }
}

impl FlacCodec {
    pub fn with_crc_policy(policy: CrcPolicy) -> Self {
        Self {
            reader: BitReader::new(),
            sample_rate: 0,
            channels: 0,
            bits_per_sample: 0,
            expected_md5: None,
            hasher: Md5::new(),
            position_samples: 0,
            crc_state: CrcPolicyState::new(policy),
            scratch: Vec::new(),
        }
    }

    fn subframe_bits(&self, assignment: ChannelAssignment, index: usize) -> u16 {
        match assignment {
            ChannelAssignment::Independent(_) => self.bits_per_sample,
            ChannelAssignment::LeftSide | ChannelAssignment::MidSide => {
                if index == 0 {
                    self.bits_per_sample
                } else {
                    self.bits_per_sample + 1
                }
            }
            ChannelAssignment::RightSide => {
                if index == 0 {
                    self.bits_per_sample + 1
                } else {
                    self.bits_per_sample
                }
            }
        }
    }

    /// Attempts to parse and decode exactly one frame from the current
    /// reader position. `Ok(None)` means the buffer is visibly too short
    /// to even hold a sync code; `Err(NeedMore)` means a partial frame was
    /// in flight and the caller should rewind and wait for more bytes.
    fn try_decode_one_frame(&mut self) -> Result<Option<AudioFrame>> {
        if self.reader.bits_remaining() < 32 {
            return Ok(None);
        }

        let crc_check = self.crc_state.effective_policy() != CrcPolicy::Disabled;
        let frame_start_byte = self.reader.byte_pos();
        let header = frame::parse_frame_header(&mut self.reader, self.sample_rate, self.bits_per_sample, crc_check)?;

        if crc_check && !frame::header_crc_is_valid(&header) {
            self.crc_state.record_failure();
            if self.crc_state.effective_policy() == CrcPolicy::Strict {
                return Err(PlaybackError::CrcMismatch {
                    context: "FLAC frame header",
                    stored: header.header_crc as u32,
                    computed: 0,
                });
            }
            tracing::warn!(stored = header.header_crc, "FLAC frame header CRC mismatch");
        }

        let channel_count = header.channel_assignment.channel_count() as usize;
        let mut raw_channels = Vec::with_capacity(channel_count);
        for idx in 0..channel_count {
            let bps = self.subframe_bits(header.channel_assignment, idx);
            raw_channels.push(frame::decode_subframe(&mut self.reader, header.block_size, bps)?);
        }

        let channels: Vec<Vec<i64>> = match header.channel_assignment {
            ChannelAssignment::Independent(_) => raw_channels,
            ChannelAssignment::LeftSide => {
                let (l, r) = decorrelate::reconstruct_left_side(&raw_channels[0], &raw_channels[1]);
                vec![l, r]
            }
            ChannelAssignment::RightSide => {
                let (l, r) = decorrelate::reconstruct_right_side(&raw_channels[1], &raw_channels[0]);
                vec![l, r]
            }
            ChannelAssignment::MidSide => {
                let (l, r) = decorrelate::reconstruct_mid_side(&raw_channels[0], &raw_channels[1]);
                vec![l, r]
            }
        };

        self.reader.align_to_byte();
        let footer_start_byte = self.reader.byte_pos();
        let stored_footer_crc = self.reader.read_bits(16)? as u16;

        if crc_check {
            let frame_bytes = self.reader.bytes_in_range(frame_start_byte, footer_start_byte.saturating_sub(1));
            let computed = crc16(&frame_bytes);
            if computed != stored_footer_crc {
                self.crc_state.record_failure();
                if self.crc_state.effective_policy() == CrcPolicy::Strict {
                    return Err(PlaybackError::CrcMismatch {
                        context: "FLAC frame footer",
                        stored: stored_footer_crc as u32,
                        computed: computed as u32,
                    });
                }
                tracing::warn!(stored = stored_footer_crc, computed, "FLAC frame footer CRC mismatch");
            } else {
                self.crc_state.record_success();
            }
        }

        let bytes_per_sample = self.bits_per_sample.div_ceil(8) as usize;
        let mut pcm = Vec::with_capacity(header.block_size as usize * channel_count);
        for i in 0..header.block_size as usize {
            for channel in &channels {
                let value = channel[i];
                push_md5_sample(&mut self.scratch, value, bytes_per_sample);
                pcm.push(scale_to_i16(value, self.bits_per_sample));
            }
        }
        self.hasher.update(&self.scratch);
        self.scratch.clear();

        let timestamp_samples = self.position_samples;
        self.position_samples += header.block_size as u64;

        Ok(Some(AudioFrame {
            samples: pcm,
            sample_rate: header.sample_rate,
            channels: channel_count as u16,
            timestamp_samples,
        }))
    }
}

impl AudioCodec for FlacCodec {
    fn initialize(&mut self, codec_private: &[u8], sample_rate: u32, channels: u16) -> Result<()> {
        if codec_private.len() >= 34 {
            let (rate, ch, bits, _total_samples, md5) = parse_streaminfo(codec_private)?;
            self.sample_rate = rate;
            self.channels = ch;
            self.bits_per_sample = bits;
            self.expected_md5 = if md5 != [0u8; 16] { Some(md5) } else { None };
        } else {
            self.sample_rate = sample_rate;
            self.channels = channels;
            self.bits_per_sample = 16;
        }
        self.reader = BitReader::new();
        self.hasher = Md5::new();
        self.position_samples = 0;
        Ok(())
    }

    fn decode(&mut self, chunk: &[u8]) -> Result<Vec<AudioFrame>> {
        self.reader.feed(chunk);
        let mut frames = Vec::new();
        loop {
            let mark = self.reader.mark();
            match self.try_decode_one_frame() {
                Ok(Some(frame)) => frames.push(frame),
                Ok(None) => break,
                Err(PlaybackError::NeedMore { .. }) => {
                    self.reader.rewind_to(mark);
                    break;
                }
                Err(e) => return Err(e),
            }
        }
        self.reader.compact();
        Ok(frames)
    }

    fn flush(&mut self) -> Result<Vec<AudioFrame>> {
        if let Some(expected) = self.expected_md5 {
            let computed: [u8; 16] = self.hasher.clone().finalize().into();
            if computed != expected {
                tracing::warn!("FLAC stream MD5 mismatch at end of decode");
            }
        }
        Ok(Vec::new())
    }

    fn reset(&mut self) {
        self.reader = BitReader::new();
        self.hasher = Md5::new();
        self.position_samples = 0;
        self.crc_state.record_success();
    }

    fn name(&self) -> &'static str {
        "flac"
    }

    fn can_decode(&self, codec_name: &str) -> bool {
        codec_name == "flac"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct BitPacker {
        bits: Vec<bool>,
    }

    impl BitPacker {
        fn new() -> Self {
            Self { bits: Vec::new() }
        }

        fn push_bits(&mut self, value: u64, width: u32) {
            for i in (0..width).rev() {
                self.bits.push((value >> i) & 1 != 0);
            }
        }

        fn align_to_byte(&mut self) {
            while self.bits.len() % 8 != 0 {
                self.bits.push(false);
            }
        }

        fn into_bytes(self) -> Vec<u8> {
            let mut bytes = vec![0u8; self.bits.len().div_ceil(8)];
            for (i, bit) in self.bits.iter().enumerate() {
                if *bit {
                    bytes[i / 8] |= 0x80 >> (i % 8);
                }
            }
            bytes
        }
    }

    /// Builds one mono CONSTANT-subframe frame: block_size samples all
    /// equal to `value`, at 8kHz/16-bit, with valid header and footer CRCs.
    /// Uses explicit 8-bit block size (code 6) so block_size is exact.
    fn build_constant_frame(value: i16, block_size: u32) -> Vec<u8> {
        let mut header = BitPacker::new();
        header.push_bits(0b1111_1111_1111_10, 14);
        header.push_bits(0, 1);
        header.push_bits(0, 1);
        header.push_bits(6, 4); // block size code 6: explicit 8-bit, value-1
        header.push_bits(4, 4); // sample rate code 4 => 8000 Hz
        header.push_bits(0, 4); // channel assignment: 1 independent channel
        header.push_bits(4, 3); // sample size code 4 => 16 bits
        header.push_bits(0, 1); // reserved
        header.push_bits(0, 8); // frame number (single byte, value 0)
        header.push_bits((block_size - 1) as u64, 8); // explicit block size - 1

        let header_bytes_before_crc = header.bits.clone();
        let header_crc = {
            let mut packer = BitPacker { bits: header_bytes_before_crc };
            packer.align_to_byte();
            crate::crc::crc8(&packer.into_bytes())
        };
        header.push_bits(header_crc as u64, 8);

        // Subframe: zero bit, type 0 (CONSTANT), no wasted bits, 16-bit value.
        header.push_bits(0, 1);
        header.push_bits(0b000000, 6);
        header.push_bits(0, 1);
        header.push_bits(value as u16 as u64, 16);
        header.align_to_byte();

        let frame_bytes_before_footer = header.bits.clone();
        let footer_crc = {
            let packer = BitPacker { bits: frame_bytes_before_footer };
            crc16(&packer.into_bytes())
        };
        header.push_bits(footer_crc as u64, 16);

        header.into_bytes()
    }

    #[test]
    fn decodes_constant_subframe_frame() {
        let frame_bytes = build_constant_frame(1234, 256);
        let streaminfo = {
            let mut body = vec![0u8; 34];
            body[0..2].copy_from_slice(&256u16.to_be_bytes());
            body[2..4].copy_from_slice(&256u16.to_be_bytes());
            let packed: u64 = ((8000u64 & 0xF_FFFF) << 44) | ((0u64) << 41) | ((15u64) << 36);
            body[10..18].copy_from_slice(&packed.to_be_bytes());
            body
        };

        let mut codec = FlacCodec::default();
        codec.initialize(&streaminfo, 8000, 1).unwrap();
        let frames = codec.decode(&frame_bytes).unwrap();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].samples.len(), 256);
        assert!(frames[0].samples.iter().all(|&s| s == 1234));
        assert_eq!(frames[0].sample_rate, 8000);
        assert_eq!(frames[0].channels, 1);
    }

    #[test]
    fn partial_frame_yields_no_frames_until_fed_more() {
        let frame_bytes = build_constant_frame(10, 256);
        let mut codec = FlacCodec::default();
        codec.initialize(&[0u8; 34], 8000, 1).unwrap();

        let (first, rest) = frame_bytes.split_at(frame_bytes.len() - 2);
        let frames = codec.decode(first).unwrap();
        assert!(frames.is_empty());
        let frames = codec.decode(rest).unwrap();
        assert_eq!(frames.len(), 1);
    }

    #[test]
    fn scale_to_i16_widens_low_bit_depth() {
        assert_eq!(scale_to_i16(1, 8), 256);
        assert_eq!(scale_to_i16(-1, 8), -256);
        assert_eq!(scale_to_i16(100, 16), 100);
    }

    #[test]
    fn can_decode_matches_flac_only() {
        let codec = FlacCodec::default();
        assert!(codec.can_decode("flac"));
        assert!(!codec.can_decode("vorbis"));
    }
}
