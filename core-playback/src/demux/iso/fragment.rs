//! Fragmented MP4 (`moof`/`traf`): `tfhd`/`tfdt`/`trun` overlay that
//! produces extra samples appended after the `moov` sample table.

use crate::error::{PlaybackError, Result};
use crate::io::{IoSource, Whence};

use super::sample_table::Sample;

const MAX_BOX_DEPTH: u32 = 64;

pub struct TrackFragment {
    pub track_id: u32,
    pub samples: Vec<Sample>,
}

struct BoxHeader {
    box_type: [u8; 4],
    payload_offset: u64,
    end_offset: u64,
}

fn read_box_header(io: &mut dyn IoSource) -> Result<Option<BoxHeader>> {
    let start = io.tell()?;
    let mut head = [0u8; 8];
    let n = io.read(&mut head)?;
    if n == 0 {
        return Ok(None);
    }
    if n < 8 {
        return Err(PlaybackError::Truncated("ISO box header".into()));
    }
    let size = u32::from_be_bytes(head[0..4].try_into().unwrap()) as u64;
    let box_type: [u8; 4] = head[4..8].try_into().unwrap();
    if size < 8 {
        return Err(PlaybackError::Format("ISO box smaller than its own header".into()));
    }
    Ok(Some(BoxHeader {
        box_type,
        payload_offset: start + 8,
        end_offset: start + size,
    }))
}

fn u32_at(body: &[u8], offset: usize) -> Result<u32> {
    let bytes: [u8; 4] = body
        .get(offset..offset + 4)
        .ok_or_else(|| PlaybackError::Truncated("fragment box field".into()))?
        .try_into()
        .unwrap();
    Ok(u32::from_be_bytes(bytes))
}

fn u64_at(body: &[u8], offset: usize) -> Result<u64> {
    let bytes: [u8; 8] = body
        .get(offset..offset + 8)
        .ok_or_else(|| PlaybackError::Truncated("fragment box field".into()))?
        .try_into()
        .unwrap();
    Ok(u64::from_be_bytes(bytes))
}

#[derive(Default)]
struct TrackFragmentHeader {
    track_id: u32,
    base_data_offset: u64,
    default_sample_duration: u32,
    default_sample_size: u32,
}

fn parse_tfhd(body: &[u8], moof_start: u64) -> Result<TrackFragmentHeader> {
    let flags = u32_at(body, 0)? & 0x00FF_FFFF;
    let track_id = u32_at(body, 4)?;
    let mut cursor = 8usize;
    let mut base_data_offset = moof_start;
    if flags & 0x0000_01 != 0 {
        base_data_offset = u64_at(body, cursor)?;
        cursor += 8;
    }
    if flags & 0x0000_02 != 0 {
        cursor += 4; // sample_description_index, unused
    }
    let mut default_sample_duration = 0;
    if flags & 0x0000_08 != 0 {
        default_sample_duration = u32_at(body, cursor)?;
        cursor += 4;
    }
    let mut default_sample_size = 0;
    if flags & 0x0000_10 != 0 {
        default_sample_size = u32_at(body, cursor)?;
        cursor += 4;
    }
    let _ = cursor;
    Ok(TrackFragmentHeader {
        track_id,
        base_data_offset,
        default_sample_duration,
        default_sample_size,
    })
}

fn parse_trun(body: &[u8], header: &TrackFragmentHeader, base_decode_time: u64) -> Result<Vec<Sample>> {
    let flags = u32_at(body, 0)? & 0x00FF_FFFF;
    let sample_count = u32_at(body, 4)?;
    let mut cursor = 8usize;

    let mut data_offset = header.base_data_offset;
    if flags & 0x0000_01 != 0 {
        let relative = u32_at(body, cursor)? as i32;
        data_offset = (header.base_data_offset as i64 + relative as i64) as u64;
        cursor += 4;
    }
    if flags & 0x0000_04 != 0 {
        cursor += 4; // first_sample_flags, unused (no seek-sync distinction yet)
    }

    let has_duration = flags & 0x0000_100 != 0;
    let has_size = flags & 0x0000_200 != 0;
    let has_flags = flags & 0x0000_400 != 0;
    let has_cts = flags & 0x0000_800 != 0;

    let per_sample_len = [has_duration, has_size, has_flags, has_cts].iter().filter(|p| **p).count() * 4;
    let entries_len = (sample_count as usize)
        .checked_mul(per_sample_len)
        .ok_or_else(|| PlaybackError::Overflow(format!("trun sample count {sample_count} * entry size {per_sample_len}")))?;
    if cursor.checked_add(entries_len).map(|total| total > body.len()).unwrap_or(true) {
        return Err(PlaybackError::Truncated("trun sample entries".into()));
    }

    let mut samples = Vec::with_capacity(sample_count as usize);
    let mut running_offset = data_offset;
    let mut running_time = base_decode_time;

    for _ in 0..sample_count {
        let duration = if has_duration {
            let d = u32_at(body, cursor)?;
            cursor += 4;
            d
        } else {
            header.default_sample_duration
        };
        let size = if has_size {
            let s = u32_at(body, cursor)?;
            cursor += 4;
            s
        } else {
            header.default_sample_size
        };
        if has_flags {
            cursor += 4;
        }
        if has_cts {
            cursor += 4;
        }

        samples.push(Sample {
            offset: running_offset,
            size,
            decode_time: running_time,
        });
        running_offset = running_offset
            .checked_add(size as u64)
            .ok_or_else(|| PlaybackError::Overflow("trun sample offset".into()))?;
        running_time = running_time
            .checked_add(duration as u64)
            .ok_or_else(|| PlaybackError::Overflow("trun sample decode time".into()))?;
    }

    Ok(samples)
}

/// Walks one `moof` box and returns the per-track sample overlay it
/// contributes. `moof_start` is the offset of the `moof` box itself
/// (the base for `tfhd`'s default-base-is-moof convention).
pub fn parse_moof(io: &mut dyn IoSource, start: u64, end: u64, depth: u32) -> Result<Vec<TrackFragment>> {
    if depth > MAX_BOX_DEPTH {
        return Err(PlaybackError::Format("ISO box nesting too deep".into()));
    }
    let moof_start = start - 8; // header.payload_offset is start+8 for a normal-size box
    io.seek(start as i64, Whence::Start)?;
    let mut fragments = Vec::new();

    while io.tell()? < end {
        let header = match read_box_header(io)? {
            None => break,
            Some(h) => h,
        };
        if &header.box_type == b"traf" {
            if let Some(frag) = parse_traf(io, header.payload_offset, header.end_offset, depth + 1, moof_start)? {
                fragments.push(frag);
            }
        }
        io.seek(header.end_offset as i64, Whence::Start)?;
    }
    Ok(fragments)
}

fn parse_traf(io: &mut dyn IoSource, start: u64, end: u64, depth: u32, moof_start: u64) -> Result<Option<TrackFragment>> {
    if depth > MAX_BOX_DEPTH {
        return Err(PlaybackError::Format("ISO box nesting too deep".into()));
    }
    io.seek(start as i64, Whence::Start)?;
    let mut tfhd: Option<TrackFragmentHeader> = None;
    let mut base_decode_time = 0u64;
    let mut samples = Vec::new();

    while io.tell()? < end {
        let header = match read_box_header(io)? {
            None => break,
            Some(h) => h,
        };
        let body_len = (header.end_offset - header.payload_offset) as usize;
        match &header.box_type {
            b"tfhd" => {
                let mut body = vec![0u8; body_len];
                io.seek(header.payload_offset as i64, Whence::Start)?;
                io.read_exact(&mut body)?;
                tfhd = Some(parse_tfhd(&body, moof_start)?);
            }
            b"tfdt" => {
                let mut body = vec![0u8; body_len];
                io.seek(header.payload_offset as i64, Whence::Start)?;
                io.read_exact(&mut body)?;
                let version = body.first().copied().unwrap_or(0);
                base_decode_time = if version == 1 { u64_at(&body, 4)? } else { u32_at(&body, 4)? as u64 };
            }
            b"trun" => {
                let mut body = vec![0u8; body_len];
                io.seek(header.payload_offset as i64, Whence::Start)?;
                io.read_exact(&mut body)?;
                if let Some(header_info) = &tfhd {
                    let run_samples = parse_trun(&body, header_info, base_decode_time)?;
                    if let Some(last) = run_samples.last() {
                        base_decode_time = last.decode_time;
                    }
                    samples.extend(run_samples);
                }
            }
            _ => {}
        }
        io.seek(header.end_offset as i64, Whence::Start)?;
    }

    match tfhd {
        Some(h) if !samples.is_empty() => Ok(Some(TrackFragment { track_id: h.track_id, samples })),
        _ => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_tfhd_with_defaults() {
        let mut body = Vec::new();
        body.extend_from_slice(&0x00_0008u32.to_be_bytes()); // default-sample-duration-present
        body.extend_from_slice(&7u32.to_be_bytes()); // track_id
        body.extend_from_slice(&1024u32.to_be_bytes()); // default duration
        let parsed = parse_tfhd(&body, 0).unwrap();
        assert_eq!(parsed.track_id, 7);
        assert_eq!(parsed.default_sample_duration, 1024);
    }

    #[test]
    fn parses_trun_with_explicit_sizes() {
        let header = TrackFragmentHeader {
            track_id: 1,
            base_data_offset: 5000,
            default_sample_duration: 0,
            default_sample_size: 0,
        };
        let mut body = Vec::new();
        body.extend_from_slice(&0x00_0300u32.to_be_bytes()); // size+duration present
        body.extend_from_slice(&2u32.to_be_bytes()); // sample_count
        body.extend_from_slice(&100u32.to_be_bytes()); // duration 1
        body.extend_from_slice(&50u32.to_be_bytes()); // size 1
        body.extend_from_slice(&100u32.to_be_bytes()); // duration 2
        body.extend_from_slice(&60u32.to_be_bytes()); // size 2

        let samples = parse_trun(&body, &header, 0).unwrap();
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[0].offset, 5000);
        assert_eq!(samples[0].size, 50);
        assert_eq!(samples[1].offset, 5050);
        assert_eq!(samples[1].decode_time, 100);
    }
}
