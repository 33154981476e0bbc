//! Tag and metadata parsers.
//!
//! Every parser here is total: malformed or adversarial input produces
//! `None` or an empty result, never a panic or a propagated error. This is
//! a deliberate departure from the rest of the crate's `Result`-returning
//! style, because user-supplied media files are expected to carry garbage
//! tags far more often than garbage audio data.

pub mod id3v1;
pub mod id3v2;
pub mod picture;
pub mod vorbis_comment;

/// Parsed, normalized tag fields common across formats. Individual parsers
/// fill in what they found; absent fields stay `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tags {
    pub artist: Option<String>,
    pub title: Option<String>,
    pub album: Option<String>,
    pub year: Option<String>,
    pub genre: Option<String>,
    pub comment: Option<String>,
    pub track: Option<u32>,
}

/// Cap applied to any single parsed field or buffer to bound allocation
/// under adversarial input.
pub const MAX_PARSE_SIZE: usize = 10 * 1024 * 1024;
