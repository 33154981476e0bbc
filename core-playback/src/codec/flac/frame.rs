//! FLAC frame header and subframe parsing: sync code, block/sample-rate
//! code tables, channel assignment, and per-channel subframe decode.

use crate::bitreader::BitReader;
use crate::crc::crc8;
use crate::error::{PlaybackError, Result};

use super::predictor;
use super::residual;

const SYNC_CODE: u32 = 0b1111_1111_1111_10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelAssignment {
    Independent(u8),
    LeftSide,
    RightSide,
    MidSide,
}

impl ChannelAssignment {
    fn from_code(code: u32) -> Result<Self> {
        match code {
            0..=7 => Ok(ChannelAssignment::Independent(code as u8 + 1)),
            8 => Ok(ChannelAssignment::LeftSide),
            9 => Ok(ChannelAssignment::RightSide),
            10 => Ok(ChannelAssignment::MidSide),
            other => Err(PlaybackError::Format(format!("reserved channel assignment code {other}"))),
        }
    }

    pub fn channel_count(self) -> u8 {
        match self {
            ChannelAssignment::Independent(n) => n,
            _ => 2,
        }
    }
}

pub struct FrameHeader {
    pub block_size: u32,
    pub sample_rate: u32,
    pub channel_assignment: ChannelAssignment,
    pub bits_per_sample: u16,
    pub header_crc: u8,
    header_bytes: Vec<u8>,
}

fn block_size_from_code(code: u32, reader: &mut BitReader) -> Result<(u32, bool)> {
    match code {
        0 => Err(PlaybackError::Format("reserved block size code".into())),
        1 => Ok((192, false)),
        2..=5 => Ok((576 << (code - 2), false)),
        6 => Ok((reader.read_bits(8)? + 1, true)),
        7 => Ok((reader.read_bits(16)? + 1, true)),
        8..=15 => Ok((256 << (code - 8), false)),
        _ => unreachable!(),
    }
}

fn sample_rate_from_code(code: u32, reader: &mut BitReader, streaminfo_rate: u32) -> Result<u32> {
    match code {
        0 => Ok(streaminfo_rate),
        1 => Ok(88_200),
        2 => Ok(176_400),
        3 => Ok(192_000),
        4 => Ok(8_000),
        5 => Ok(16_000),
        6 => Ok(22_050),
        7 => Ok(24_000),
        8 => Ok(32_000),
        9 => Ok(44_100),
        10 => Ok(48_000),
        11 => Ok(96_000),
        12 => Ok(reader.read_bits(8)? * 1000),
        13 => Ok(reader.read_bits(16)?),
        14 => Ok(reader.read_bits(16)? * 10),
        _ => Err(PlaybackError::Format("invalid sample rate code".into())),
    }
}

fn bits_per_sample_from_code(code: u32, streaminfo_bits: u16) -> Result<u16> {
    match code {
        0 => Ok(streaminfo_bits),
        1 => Ok(8),
        2 => Ok(12),
        4 => Ok(16),
        5 => Ok(20),
        6 => Ok(24),
        7 => Ok(32),
        _ => Err(PlaybackError::Format(format!("reserved sample size code {code}"))),
    }
}

/// Reads a UTF-8-coded frame or sample number per FLAC's variant of UTF-8
/// (up to 7 continuation bytes, rather than UTF-8's usual 3).
fn read_utf8_coded_number(reader: &mut BitReader) -> Result<u64> {
    let first = reader.read_bits(8)?;
    let extra_bytes = if first & 0x80 == 0 {
        return Ok(first as u64);
    } else if first & 0xE0 == 0xC0 {
        1
    } else if first & 0xF0 == 0xE0 {
        2
    } else if first & 0xF8 == 0xF0 {
        3
    } else if first & 0xFC == 0xF8 {
        4
    } else if first & 0xFE == 0xFC {
        5
    } else if first & 0xFF == 0xFE {
        6
    } else {
        return Err(PlaybackError::Format("invalid UTF-8 coded number lead byte".into()));
    };

    let mut value = (first & (0x7F >> (extra_bytes + 1))) as u64;
    for _ in 0..extra_bytes {
        let byte = reader.read_bits(8)?;
        if byte & 0xC0 != 0x80 {
            return Err(PlaybackError::Format("invalid UTF-8 coded number continuation byte".into()));
        }
        value = (value << 6) | (byte & 0x3F) as u64;
    }
    Ok(value)
}

/// Parses one frame header. `reader` must be positioned at the sync
/// code; on success it is byte-aligned just past the header CRC-8.
pub fn parse_frame_header(reader: &mut BitReader, streaminfo_rate: u32, streaminfo_bits: u16, crc_check: bool) -> Result<FrameHeader> {
    let header_start_byte = reader.byte_pos();

    let sync = reader.read_bits(14)?;
    if sync != SYNC_CODE {
        return Err(PlaybackError::Format("missing FLAC frame sync code".into()));
    }
    let _reserved = reader.read_bits(1)?;
    let _blocking_strategy = reader.read_bits(1)?;

    let block_size_code = reader.read_bits(4)?;
    let sample_rate_code = reader.read_bits(4)?;
    let channel_code = reader.read_bits(4)?;
    let sample_size_code = reader.read_bits(3)?;
    let _reserved2 = reader.read_bits(1)?;

    let _frame_or_sample_number = read_utf8_coded_number(reader)?;

    let (block_size, _explicit) = block_size_from_code(block_size_code, reader)?;
    let sample_rate = sample_rate_from_code(sample_rate_code, reader, streaminfo_rate)?;
    let channel_assignment = ChannelAssignment::from_code(channel_code)?;
    let bits_per_sample = bits_per_sample_from_code(sample_size_code, streaminfo_bits)?;

    let header_crc = reader.read_bits(8)? as u8;

    // The CRC byte itself is excluded from the range it covers.
    let header_end_byte = reader.byte_pos();
    let header_bytes = if crc_check {
        reader.bytes_in_range(header_start_byte, header_end_byte.saturating_sub(2))
    } else {
        Vec::new()
    };

    Ok(FrameHeader {
        block_size,
        sample_rate,
        channel_assignment,
        bits_per_sample,
        header_crc,
        header_bytes,
    })
}

pub fn header_crc_is_valid(header: &FrameHeader) -> bool {
    crc8(&header.header_bytes) == header.header_crc
}

/// Decodes one subframe (channel) at `bits_per_sample` precision,
/// returning `block_size` reconstructed sample values.
pub fn decode_subframe(reader: &mut BitReader, block_size: u32, bits_per_sample: u16) -> Result<Vec<i64>> {
    let zero_bit = reader.read_bits(1)?;
    if zero_bit != 0 {
        return Err(PlaybackError::Format("subframe header missing zero bit".into()));
    }
    let subframe_type = reader.read_bits(6)?;
    let has_wasted_bits = reader.read_bits(1)? == 1;
    let wasted_bits = if has_wasted_bits { reader.read_unary()? + 1 } else { 0 };
    if wasted_bits >= bits_per_sample as u32 {
        return Err(PlaybackError::Format(format!(
            "wasted bits {wasted_bits} not less than bit depth {bits_per_sample}"
        )));
    }
    let bps = bits_per_sample as u32 - wasted_bits;

    let samples = match subframe_type {
        0b000000 => {
            let value = reader.read_signed(bps)? as i64;
            vec![value; block_size as usize]
        }
        0b000001 => {
            let mut out = Vec::with_capacity(block_size as usize);
            for _ in 0..block_size {
                out.push(reader.read_signed(bps)? as i64);
            }
            out
        }
        0b001000..=0b001100 => {
            let order = subframe_type - 0b001000;
            let mut warmup = Vec::with_capacity(order as usize);
            for _ in 0..order {
                warmup.push(reader.read_signed(bps)? as i64);
            }
            let residual = residual::decode_residual(reader, order, block_size)?;
            predictor::reconstruct_fixed(order, &warmup, &residual)?
        }
        0b100000..=0b111111 => {
            let order = (subframe_type - 0b100000) + 1;
            let mut warmup = Vec::with_capacity(order as usize);
            for _ in 0..order {
                warmup.push(reader.read_signed(bps)? as i64);
            }
            let precision = reader.read_bits(4)? + 1;
            if precision > 15 {
                return Err(PlaybackError::Format("invalid LPC coefficient precision".into()));
            }
            let shift = reader.read_bits(5)? as i32;
            if shift < 0 {
                return Err(PlaybackError::Format("negative LPC shift is not supported".into()));
            }
            let mut coeffs = Vec::with_capacity(order as usize);
            for _ in 0..order {
                coeffs.push(reader.read_signed(precision)?);
            }
            let residual = residual::decode_residual(reader, order, block_size)?;
            predictor::reconstruct_lpc(&coeffs, shift as u32, &warmup, &residual)?
        }
        other => return Err(PlaybackError::Format(format!("reserved subframe type {other}"))),
    };

    if wasted_bits > 0 {
        Ok(samples.into_iter().map(|s| s << wasted_bits).collect())
    } else {
        Ok(samples)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_assignment_independent_channel_count() {
        assert_eq!(ChannelAssignment::from_code(1).unwrap().channel_count(), 2);
        assert_eq!(ChannelAssignment::from_code(0).unwrap().channel_count(), 1);
    }

    #[test]
    fn channel_assignment_rejects_reserved_codes() {
        assert!(ChannelAssignment::from_code(12).is_err());
    }

    #[test]
    fn utf8_coded_number_single_byte() {
        let mut reader = BitReader::from_bytes(&[0x42]);
        assert_eq!(read_utf8_coded_number(&mut reader).unwrap(), 0x42);
    }

    #[test]
    fn utf8_coded_number_two_byte() {
        // 0xC2 0x80 => value 0
        let mut reader = BitReader::from_bytes(&[0xC2, 0x80]);
        assert_eq!(read_utf8_coded_number(&mut reader).unwrap(), 0);
    }
}
