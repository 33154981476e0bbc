//! File-backed [`IoSource`].

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};

use super::{IoSource, SourceSize, Whence};
use crate::error::Result;

/// Owns an OS file descriptor; closed on drop (standard `File` semantics).
pub struct FileSource {
    file: File,
    size: u64,
    eof: bool,
}

impl FileSource {
    pub fn open(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let file = File::open(path)?;
        let size = file.metadata()?.len();
        Ok(Self {
            file,
            size,
            eof: false,
        })
    }
}

impl IoSource for FileSource {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let n = self.file.read(buf)?;
        if n == 0 {
            self.eof = true;
        }
        Ok(n)
    }

    fn seek(&mut self, offset: i64, whence: Whence) -> Result<u64> {
        let from = match whence {
            Whence::Start => SeekFrom::Start(offset as u64),
            Whence::Current => SeekFrom::Current(offset),
            Whence::End => SeekFrom::End(offset),
        };
        let pos = self.file.seek(from)?;
        self.eof = false;
        Ok(pos)
    }

    fn tell(&mut self) -> Result<u64> {
        Ok(self.file.stream_position()?)
    }

    fn size(&self) -> SourceSize {
        SourceSize::Known(self.size)
    }

    fn eof(&self) -> bool {
        self.eof
    }
}
