//! ID3v2 (2.2/2.3/2.4): header + synchsafe size + frames.
//!
//! Frame-id width and size encoding differ by version (3-byte ids / 3-byte
//! sizes in 2.2; 4-byte ids / 4-byte sizes in 2.3 and 2.4, synchsafe only
//! in 2.4). This parser tolerates truncation and never allocates based on
//! an unchecked length field.

use super::{Tags, MAX_PARSE_SIZE};

struct Header {
    major_version: u8,
    _flags: u8,
    tag_size: u32,
}

fn read_synchsafe(bytes: &[u8; 4]) -> u32 {
    ((bytes[0] as u32 & 0x7F) << 21)
        | ((bytes[1] as u32 & 0x7F) << 14)
        | ((bytes[2] as u32 & 0x7F) << 7)
        | (bytes[3] as u32 & 0x7F)
}

fn parse_header(data: &[u8]) -> Option<Header> {
    if data.len() < 10 || &data[0..3] != b"ID3" {
        return None;
    }
    let major_version = data[3];
    let flags = data[5];
    let size_bytes: [u8; 4] = data[6..10].try_into().ok()?;
    // A header claiming the maximum synchsafe value (all non-sign bits
    // set) is rejected outright rather than trusted as "huge but valid" —
    // feeding it to a naive allocator would be an easy DoS.
    if size_bytes == [0x7F, 0x7F, 0x7F, 0x7F] {
        return None;
    }
    let tag_size = read_synchsafe(&size_bytes);
    if tag_size as usize > MAX_PARSE_SIZE {
        return None;
    }
    Some(Header {
        major_version,
        _flags: flags,
        tag_size,
    })
}

/// Parses an ID3v2 tag from the start of `data`. Returns `None` on any
/// structural problem; never panics, never allocates proportional to an
/// attacker-controlled length before validating it.
pub fn parse(data: &[u8]) -> Option<Tags> {
    let header = parse_header(data)?;
    let body_end = (10 + header.tag_size as usize).min(data.len());
    let body = &data[10..body_end];

    let mut tags = Tags::default();
    let mut cursor = 0usize;
    let (id_len, size_len, frame_header_len) = match header.major_version {
        2 => (3, 3, 6),
        _ => (4, 4, 10),
    };

    while cursor + frame_header_len <= body.len() {
        let id = &body[cursor..cursor + id_len];
        if id.iter().all(|&b| b == 0) {
            break; // padding
        }
        let size_field = &body[cursor + id_len..cursor + id_len + size_len];
        let frame_size = if header.major_version == 4 {
            let mut arr = [0u8; 4];
            arr[4 - size_len..].copy_from_slice(size_field);
            read_synchsafe(&arr) as usize
        } else {
            size_field.iter().fold(0usize, |acc, &b| (acc << 8) | b as usize)
        };
        let frame_start = cursor + frame_header_len;
        if frame_size > body.len().saturating_sub(frame_start) {
            break; // truncated; stop rather than read out of bounds
        }
        let frame_body = &body[frame_start..frame_start + frame_size];
        apply_frame(id, frame_body, &mut tags);
        cursor = frame_start + frame_size;
    }

    Some(tags)
}

fn apply_frame(id: &[u8], body: &[u8], tags: &mut Tags) {
    let text = decode_text_frame(body);
    match id {
        b"TIT2" | b"TT2" => tags.title = text,
        b"TPE1" | b"TP1" => tags.artist = text,
        b"TALB" | b"TAL" => tags.album = text,
        b"TYER" | b"TDRC" | b"TYE" => tags.year = text,
        b"TCON" | b"TCO" => tags.genre = text,
        b"COMM" | b"COM" => tags.comment = text,
        b"TRCK" | b"TRK" => {
            tags.track = text
                .as_deref()
                .and_then(|s| s.split('/').next())
                .and_then(|s| s.trim().parse().ok());
        }
        _ => {}
    }
}

/// Text frames begin with a one-byte encoding marker: 0 = Latin-1/ISO-8859-1,
/// 1 = UTF-16 with BOM, 2 = UTF-16BE (2.4), 3 = UTF-8 (2.4).
fn decode_text_frame(body: &[u8]) -> Option<String> {
    if body.is_empty() {
        return None;
    }
    let encoding = body[0];
    let payload = &body[1..];
    let decoded = match encoding {
        0 => payload.iter().map(|&b| b as char).collect::<String>(),
        3 => String::from_utf8_lossy(payload).into_owned(),
        1 | 2 => decode_utf16(payload),
        _ => return None,
    };
    let trimmed = decoded.trim_matches(|c: char| c == '\0').trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn decode_utf16(payload: &[u8]) -> String {
    if payload.len() < 2 {
        return String::new();
    }
    let big_endian = payload[0] == 0xFE && payload[1] == 0xFF;
    let little_endian = payload[0] == 0xFF && payload[1] == 0xFE;
    let rest = if big_endian || little_endian { &payload[2..] } else { payload };
    let units: Vec<u16> = rest
        .chunks_exact(2)
        .map(|pair| {
            if big_endian {
                u16::from_be_bytes([pair[0], pair[1]])
            } else {
                u16::from_le_bytes([pair[0], pair[1]])
            }
        })
        .collect();
    String::from_utf16_lossy(&units)
}
