//! ID3v1: fixed 128-byte trailer at the end of an MP3 (or any) file.

use super::Tags;

const TAG_SIZE: usize = 128;

/// Parses the last 128 bytes of `data` as an ID3v1(.1) tag. Returns `None`
/// if `data` is shorter than 128 bytes or the `TAG` marker is absent —
/// never panics on truncated or garbage input.
pub fn parse(data: &[u8]) -> Option<Tags> {
    if data.len() < TAG_SIZE {
        return None;
    }
    let tag = &data[data.len() - TAG_SIZE..];
    if &tag[0..3] != b"TAG" {
        return None;
    }

    let title = latin1_field(&tag[3..33]);
    let artist = latin1_field(&tag[33..63]);
    let album = latin1_field(&tag[63..93]);
    let year = latin1_field(&tag[93..97]);

    // ID3v1.1: comment is 28 bytes + a zero byte + a track number byte,
    // when byte 28 of the comment field is 0 and byte 29 is nonzero.
    let comment_region = &tag[97..127];
    let (comment, track) = if comment_region[28] == 0 && comment_region[29] != 0 {
        (latin1_field(&comment_region[..28]), Some(comment_region[29] as u32))
    } else {
        (latin1_field(comment_region), None)
    };

    let genre_byte = tag[127];
    let genre = genre_name(genre_byte).map(str::to_string);

    Some(Tags {
        artist,
        title,
        album,
        year,
        genre,
        comment,
        track,
    })
}

fn latin1_field(raw: &[u8]) -> Option<String> {
    let trimmed = raw
        .split(|&b| b == 0)
        .next()
        .unwrap_or(raw)
        .iter()
        .map(|&b| b as char)
        .collect::<String>();
    let trimmed = trimmed.trim_end();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// The 80 standard-ish genres from the Winamp extended table; unknown
/// codes (including 0xFF, the "none" sentinel) are tolerated and produce
/// `None` rather than a fabricated name.
fn genre_name(code: u8) -> Option<&'static str> {
    const GENRES: &[&str] = &[
        "Blues", "Classic Rock", "Country", "Dance", "Disco", "Funk", "Grunge", "Hip-Hop",
        "Jazz", "Metal", "New Age", "Oldies", "Other", "Pop", "R&B", "Rap", "Reggae", "Rock",
        "Techno", "Industrial", "Alternative", "Ska", "Death Metal", "Pranks", "Soundtrack",
        "Euro-Techno", "Ambient", "Trip-Hop", "Vocal", "Jazz+Funk", "Fusion", "Trance",
        "Classical", "Instrumental", "Acid", "House", "Game", "Sound Clip", "Gospel", "Noise",
        "Alternative Rock", "Bass", "Soul", "Punk", "Space", "Meditative", "Instrumental Pop",
        "Instrumental Rock", "Ethnic", "Gothic", "Darkwave", "Techno-Industrial", "Electronic",
        "Pop-Folk", "Eurodance", "Dream", "Southern Rock", "Comedy", "Cult", "Gangsta",
        "Top 40", "Christian Rap", "Pop/Funk", "Jungle", "Native American", "Cabaret",
        "New Wave", "Psychedelic", "Rave", "Showtunes", "Trailer", "Lo-Fi", "Tribal",
        "Acid Punk", "Acid Jazz", "Polka", "Retro", "Musical", "Rock & Roll", "Hard Rock",
    ];
    GENRES.get(code as usize).copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build_tag(title: &str, artist: &str, genre: u8) -> Vec<u8> {
        let mut tag = vec![0u8; TAG_SIZE];
        tag[0..3].copy_from_slice(b"TAG");
        let t = title.as_bytes();
        tag[3..3 + t.len()].copy_from_slice(t);
        let a = artist.as_bytes();
        tag[33..33 + a.len()].copy_from_slice(a);
        tag[127] = genre;
        tag
    }

    #[test]
    fn parses_basic_fields() {
        let tag = build_tag("Everlong", "Foo Fighters", 17);
        let tags = parse(&tag).unwrap();
        assert_eq!(tags.title.as_deref(), Some("Everlong"));
        assert_eq!(tags.artist.as_deref(), Some("Foo Fighters"));
        assert_eq!(tags.genre.as_deref(), Some("Rock"));
    }

    #[test]
    fn rejects_missing_marker() {
        let data = vec![0u8; TAG_SIZE];
        assert!(parse(&data).is_none());
    }

    #[test]
    fn rejects_short_input() {
        assert!(parse(b"TAGxxx").is_none());
    }

    #[test]
    fn v1_1_track_number_extracted() {
        let mut tag = build_tag("Title", "Artist", 0);
        tag[97 + 28] = 0;
        tag[97 + 29] = 7;
        let tags = parse(&tag).unwrap();
        assert_eq!(tags.track, Some(7));
    }

    #[test]
    fn random_bytes_never_panics() {
        let mut seed: u64 = 0x1234_5678_9abc_def0;
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
