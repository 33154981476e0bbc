//! Abstract random-access byte source.
//!
//! Every demuxer reads through this trait rather than a concrete `File` so
//! that the same parsing code runs over local files and HTTP-backed
//! resources.

pub mod file;
#[cfg(feature = "http-streaming")]
pub mod http;

use crate::error::Result;

/// Origin for [`IoSource::seek`], mirroring `std::io::SeekFrom` without
/// pulling a dependency on it into the trait surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Whence {
    Start,
    Current,
    End,
}

/// Total size of a source, when known.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceSize {
    Known(u64),
    Unknown,
}

impl SourceSize {
    pub fn as_u64(self) -> Option<u64> {
        match self {
            SourceSize::Known(n) => Some(n),
            SourceSize::Unknown => None,
        }
    }
}

/// Abstract byte source: `read`/`seek`/`tell`/`size`/`eof`.
pub trait IoSource: Send {
    /// Reads up to `buf.len()` bytes, returning the count actually read
    /// (0 at end of stream). Mirrors `std::io::Read::read`'s short-read
    /// contract rather than requiring the buffer be filled.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize>;

    /// Moves the logical read position and returns the new absolute offset.
    fn seek(&mut self, offset: i64, whence: Whence) -> Result<u64>;

    /// Current absolute offset.
    fn tell(&mut self) -> Result<u64>;

    /// Total size, if known up front (a non-ranged HTTP resource with no
    /// `Content-Length` reports `Unknown`).
    fn size(&self) -> SourceSize;

    /// `true` once a `read` has returned 0 bytes at the current position.
    fn eof(&self) -> bool;

    /// Reads exactly `buf.len()` bytes or reports `NeedMore`.
    fn read_exact(&mut self, buf: &mut [u8]) -> Result<()> {
        let mut filled = 0;
        while filled < buf.len() {
            let n = self.read(&mut buf[filled..])?;
            if n == 0 {
                return Err(crate::error::PlaybackError::NeedMore {
                    needed: buf.len() - filled,
                    available: filled,
                });
            }
            filled += n;
        }
        Ok(())
    }
}
