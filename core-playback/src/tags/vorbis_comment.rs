//! Vorbis comments: LE32 length-prefixed vendor string + field list.
//!
//! Shared by Ogg Vorbis/Opus/Speex streams and the FLAC `VORBIS_COMMENT`
//! metadata block — both use the exact same field encoding.

use std::collections::HashMap;

use super::{Tags, MAX_PARSE_SIZE};

/// A parsed comment block: the vendor string plus every `KEY=VALUE` field,
/// case-insensitively keyed (multiple values per key are preserved in
/// insertion order).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VorbisComments {
    pub vendor: String,
    pub fields: HashMap<String, Vec<String>>,
}

impl VorbisComments {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields
            .get(&key.to_ascii_uppercase())
            .and_then(|v| v.first())
            .map(|s| s.as_str())
    }

    pub fn to_tags(&self) -> Tags {
        Tags {
            artist: self.get("ARTIST").map(str::to_string),
            title: self.get("TITLE").map(str::to_string),
            album: self.get("ALBUM").map(str::to_string),
            year: self.get("DATE").map(str::to_string),
            genre: self.get("GENRE").map(str::to_string),
            comment: self.get("COMMENT").or_else(|| self.get("DESCRIPTION")).map(str::to_string),
            track: self.get("TRACKNUMBER").and_then(|s| s.parse().ok()),
        }
    }
}

fn read_u32_le(data: &[u8], offset: usize) -> Option<(u32, usize)> {
    let bytes: [u8; 4] = data.get(offset..offset + 4)?.try_into().ok()?;
    Some((u32::from_le_bytes(bytes), offset + 4))
}

/// Parses a Vorbis comment block starting at the beginning of `data`
/// (no leading framing byte — callers strip any codec-specific packet
/// header first). Returns `None` on any structural problem.
pub fn parse(data: &[u8]) -> Option<VorbisComments> {
    let (vendor_len, mut offset) = read_u32_le(data, 0)?;
    if vendor_len as usize > MAX_PARSE_SIZE {
        return None;
    }
    let vendor_bytes = data.get(offset..offset + vendor_len as usize)?;
    let vendor = String::from_utf8_lossy(vendor_bytes).into_owned();
    offset += vendor_len as usize;

    let (field_count, mut offset2) = read_u32_le(data, offset)?;
    offset = offset2;
    if field_count as usize > MAX_PARSE_SIZE / 8 {
        return None;
    }

    let mut fields: HashMap<String, Vec<String>> = HashMap::new();
    for _ in 0..field_count {
        let (field_len, next) = read_u32_le(data, offset)?;
        if field_len as usize > MAX_PARSE_SIZE {
            return None;
        }
        let field_bytes = data.get(next..next + field_len as usize)?;
        offset2 = next + field_len as usize;
        offset = offset2;

        let field_str = String::from_utf8_lossy(field_bytes);
        if let Some(eq) = field_str.find('=') {
            let key = field_str[..eq].to_ascii_uppercase();
            let value = field_str[eq + 1..].to_string();
            fields.entry(key).or_default().push(value);
        }
        // Fields without `=` are malformed per spec; skipped, not fatal.
    }

    Some(VorbisComments { vendor, fields })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build(vendor: &str, fields: &[&str]) -> Vec<u8> {
        let mut data = Vec::new();
        data.extend_from_slice(&(vendor.len() as u32).to_le_bytes());
        data.extend_from_slice(vendor.as_bytes());
        data.extend_from_slice(&(fields.len() as u32).to_le_bytes());
        for f in fields {
            data.extend_from_slice(&(f.len() as u32).to_le_bytes());
            data.extend_from_slice(f.as_bytes());
        }
        data
    }

    #[test]
    fn parses_fields_case_insensitively() {
        let data = build("libvorbis", &["ARTIST=Foo Fighters", "title=Everlong"]);
        let comments = parse(&data).unwrap();
        assert_eq!(comments.vendor, "libvorbis");
        assert_eq!(comments.get("Artist"), Some("Foo Fighters"));
        assert_eq!(comments.get("TITLE"), Some("Everlong"));
    }

    #[test]
    fn multi_valued_fields_preserved() {
        let data = build("v", &["GENRE=Rock", "GENRE=Alternative"]);
        let comments = parse(&data).unwrap();
        assert_eq!(comments.fields.get("GENRE").unwrap().len(), 2);
    }

    #[test]
    fn to_tags_maps_standard_fields() {
        let data = build("v", &["ARTIST=A", "TITLE=T", "TRACKNUMBER=4"]);
        let tags = parse(&data).unwrap().to_tags();
        assert_eq!(tags.artist.as_deref(), Some("A"));
        assert_eq!(tags.title.as_deref(), Some("T"));
        assert_eq!(tags.track, Some(4));
    }

    #[test]
    fn truncated_input_returns_none() {
        assert!(parse(&[1, 2, 3]).is_none());
    }

    #[test]
    fn huge_declared_length_rejected_without_allocating() {
        let mut data = Vec::new();
        data.extend_from_slice(&u32::MAX.to_le_bytes());
        assert!(parse(&data).is_none());
    }

    #[test]
    fn field_missing_equals_sign_is_skipped_not_fatal() {
        let data = build("v", &["NOEQUALSSIGN", "ARTIST=A"]);
        let comments = parse(&data).unwrap();
        assert_eq!(comments.get("ARTIST"), Some("A"));
    }

    #[test]
    fn random_bytes_never_panic() {
        let mut seed: u64 = 0x0f0f_0f0f_f0f0_f0f0;
        for _ in 0..64 {
            let data: Vec<u8> = (0..200)
                .map(|_| {
                    seed ^= seed << 13;
                    seed ^= seed >> 7;
                    seed ^= seed << 17;
                    (seed & 0xFF) as u8
                })
                .collect();
            let _ = parse(&data);
        }
    }
}
