//! Embedded picture parsers: ID3v2 `APIC` and FLAC/Vorbis
//! `METADATA_BLOCK_PICTURE`.
//!
//! Both encode the same logical fields — type, MIME, description,
//! dimensions, payload — just with different framing (APIC is
//! length-implicit/null-terminated; METADATA_BLOCK_PICTURE is explicit
//! big-endian length-prefixed throughout).

use super::MAX_PARSE_SIZE;

/// Picture type per the ID3v2/FLAC shared enumeration. Codes 0-20 are
/// named; anything else is tolerated and reported as `Reserved`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PictureType {
    Other,
    FileIcon,
    OtherFileIcon,
    CoverFront,
    CoverBack,
    LeafletPage,
    Media,
    LeadArtist,
    Artist,
    Conductor,
    Band,
    Composer,
    Lyricist,
    RecordingLocation,
    DuringRecording,
    DuringPerformance,
    VideoCapture,
    ABrightColoredFish,
    Illustration,
    BandLogo,
    PublisherLogo,
    Reserved(u8),
}

impl PictureType {
    fn from_code(code: u8) -> Self {
        match code {
            0 => Self::Other,
            1 => Self::FileIcon,
            2 => Self::OtherFileIcon,
            3 => Self::CoverFront,
            4 => Self::CoverBack,
            5 => Self::LeafletPage,
            6 => Self::Media,
            7 => Self::LeadArtist,
            8 => Self::Artist,
            9 => Self::Conductor,
            10 => Self::Band,
            11 => Self::Composer,
            12 => Self::Lyricist,
            13 => Self::RecordingLocation,
            14 => Self::DuringRecording,
            15 => Self::DuringPerformance,
            16 => Self::VideoCapture,
            17 => Self::ABrightColoredFish,
            18 => Self::Illustration,
            19 => Self::BandLogo,
            20 => Self::PublisherLogo,
            other => Self::Reserved(other),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Picture {
    pub picture_type: PictureType,
    pub mime_type: String,
    pub description: String,
    pub width: u32,
    pub height: u32,
    pub depth: u32,
    pub colors: u32,
    pub data: Vec<u8>,
}

/// Parses an ID3v2 `APIC` frame body (the encoding byte has already been
/// consumed by the caller's ID3v2 frame dispatch, so `body` starts with
/// the encoding byte per the APIC layout itself — this parser takes the
/// full frame body including it).
pub fn parse_apic(body: &[u8]) -> Option<Picture> {
    if body.is_empty() || body.len() > MAX_PARSE_SIZE {
        return None;
    }
    let mut pos = 1; // skip text-encoding byte
    let mime_end = body[pos..].iter().position(|&b| b == 0)? + pos;
    let mime_type = String::from_utf8_lossy(&body[pos..mime_end]).into_owned();
    pos = mime_end + 1;

    let picture_type = PictureType::from_code(*body.get(pos)?);
    pos += 1;

    let desc_end = body[pos..].iter().position(|&b| b == 0)? + pos;
    let description = String::from_utf8_lossy(&body[pos..desc_end]).into_owned();
    pos = desc_end + 1;

    let data = body.get(pos..)?.to_vec();

    Some(Picture {
        picture_type,
        mime_type,
        description,
        width: 0,
        height: 0,
        depth: 0,
        colors: 0,
        data,
    })
}

fn read_u32_be(data: &[u8], offset: usize) -> Option<(u32, usize)> {
    let bytes: [u8; 4] = data.get(offset..offset + 4)?.try_into().ok()?;
    Some((u32::from_be_bytes(bytes), offset + 4))
}

/// Parses a FLAC/Vorbis `METADATA_BLOCK_PICTURE` payload. All fields are
/// explicit big-endian lengths; an overflowing length field rejects the
/// picture rather than truncating it.
pub fn parse_metadata_block_picture(data: &[u8]) -> Option<Picture> {
    let (type_code, offset) = read_u32_be(data, 0)?;
    let picture_type = PictureType::from_code(type_code.min(u8::MAX as u32) as u8);

    let (mime_len, offset) = read_u32_be(data, offset)?;
    if mime_len as usize > MAX_PARSE_SIZE {
        return None;
    }
    let mime_type = String::from_utf8_lossy(data.get(offset..offset + mime_len as usize)?).into_owned();
    let offset = offset + mime_len as usize;

    let (desc_len, offset) = read_u32_be(data, offset)?;
    if desc_len as usize > MAX_PARSE_SIZE {
        return None;
    }
    let description = String::from_utf8_lossy(data.get(offset..offset + desc_len as usize)?).into_owned();
    let offset = offset + desc_len as usize;

    let (width, offset) = read_u32_be(data, offset)?;
    let (height, offset) = read_u32_be(data, offset)?;
    let (depth, offset) = read_u32_be(data, offset)?;
    let (colors, offset) = read_u32_be(data, offset)?;

    let (data_len, offset) = read_u32_be(data, offset)?;
    if data_len as usize > MAX_PARSE_SIZE {
        return None;
    }
    let payload = data.get(offset..offset + data_len as usize)?.to_vec();

    Some(Picture {
        picture_type,
        mime_type,
        description,
        width,
        height,
        depth,
        colors,
        data: payload,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build_mbp(mime: &str, desc: &str, payload: &[u8]) -> Vec<u8> {
        let mut data = Vec::new();
        data.extend_from_slice(&3u32.to_be_bytes()); // CoverFront
        data.extend_from_slice(&(mime.len() as u32).to_be_bytes());
        data.extend_from_slice(mime.as_bytes());
        data.extend_from_slice(&(desc.len() as u32).to_be_bytes());
        data.extend_from_slice(desc.as_bytes());
        data.extend_from_slice(&100u32.to_be_bytes());
        data.extend_from_slice(&100u32.to_be_bytes());
        data.extend_from_slice(&24u32.to_be_bytes());
        data.extend_from_slice(&0u32.to_be_bytes());
        data.extend_from_slice(&(payload.len() as u32).to_be_bytes());
        data.extend_from_slice(payload);
        data
    }

    #[test]
    fn parses_metadata_block_picture() {
        let data = build_mbp("image/jpeg", "cover", &[1, 2, 3, 4]);
        let pic = parse_metadata_block_picture(&data).unwrap();
        assert_eq!(pic.mime_type, "image/jpeg");
        assert_eq!(pic.description, "cover");
        assert_eq!(pic.width, 100);
        assert_eq!(pic.data, vec![1, 2, 3, 4]);
        assert!(matches!(pic.picture_type, PictureType::CoverFront));
    }

    #[test]
    fn reserved_type_code_tolerated() {
        let mut data = build_mbp("image/png", "", &[]);
        data[0..4].copy_from_slice(&200u32.to_be_bytes());
        let pic = parse_metadata_block_picture(&data).unwrap();
        assert!(matches!(pic.picture_type, PictureType::Reserved(200)));
    }

    #[test]
    fn overflowing_length_field_rejected() {
        let mut data = Vec::new();
        data.extend_from_slice(&3u32.to_be_bytes());
        data.extend_from_slice(&u32::MAX.to_be_bytes());
        assert!(parse_metadata_block_picture(&data).is_none());
    }

    #[test]
    fn parses_apic_frame() {
        let mut body = vec![0u8]; // latin-1 encoding
        body.extend_from_slice(b"image/jpeg\0");
        body.push(3); // cover front
        body.extend_from_slice(b"\0"); // empty description
        body.extend_from_slice(&[0xFF, 0xD8, 0xFF]);
        let pic = parse_apic(&body).unwrap();
        assert_eq!(pic.mime_type, "image/jpeg");
        assert_eq!(pic.data, vec![0xFF, 0xD8, 0xFF]);
    }

    #[test]
    fn random_bytes_never_panic() {
        let mut seed: u64 = 0x2222_3333_4444_5555;
        for _ in 0..64 {
            let data: Vec<u8> = (0..200)
                .map(|_| {
                    seed ^= seed << 13;
                    seed ^= seed >> 7;
                    seed ^= seed << 17;
                    (seed & 0xFF) as u8
                })
                .collect();
            let _ = parse_apic(&data);
            let _ = parse_metadata_block_picture(&data);
        }
    }
}
