use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::instrument;

/// How a codec opens its file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mode {
    /// Existing file, read only.
    Read,
    /// Existing file, reads and writes.
    ReadWrite,
    /// New file, fails if one already exists at the path.
    Create,
}

impl Mode {
    pub fn is_writable(self) -> bool {
        matches!(self, Mode::ReadWrite | Mode::Create)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum OpenError {
    #[error("Could not open {path:?}: {source}")]
    NotFound {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Can not create new file at {0:?}, one already exists")]
    AlreadyExists(PathBuf),
    #[error("Os returned IO-error: {0}")]
    Io(#[from] io::Error),
}

/// Opens `path` according to `mode`.
#[instrument(level = "debug")]
pub(crate) fn open(path: &Path, mode: Mode) -> Result<File, OpenError> {
    let res = match mode {
        Mode::Read => OpenOptions::new().read(true).open(path),
        Mode::ReadWrite => OpenOptions::new().read(true).write(true).open(path),
        Mode::Create => {
            return match OpenOptions::new()
                .read(true)
                .write(true)
                .create_new(true)
                .open(path)
            {
                Ok(file) => Ok(file),
                Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {
                    Err(OpenError::AlreadyExists(path.to_owned()))
                }
                Err(err) => Err(OpenError::Io(err)),
            }
        }
    };

    res.map_err(|source| OpenError::NotFound {
        path: path.to_owned(),
        source,
    })
}

/// The files have a fixed prefix (header and, for wave files, the channel
/// descriptors). Instead of taking it into account everywhere we use this. It
/// forwards corrected seeks so the body can be addressed as if the prefix
/// does not exist. Absolute access to the prefix goes through
/// [`BodyFile::prefix_mut`].
#[derive(Debug)]
pub(crate) struct BodyFile {
    handle: File,
    offset: u64,
}

impl BodyFile {
    pub(crate) fn new(handle: File) -> Self {
        Self { handle, offset: 0 }
    }

    /// Body starts this many bytes into the file.
    pub(crate) fn set_offset(&mut self, offset: u64) {
        self.offset = offset;
    }

    /// The underlying handle, seeks on it are absolute.
    pub(crate) fn prefix_mut(&mut self) -> &mut File {
        &mut self.handle
    }

    pub(crate) fn file_len(&self) -> io::Result<u64> {
        self.handle.metadata().map(|m| m.len())
    }

    /// Length of the file without the prefix, zero if the
    /// file is shorter than the prefix.
    pub(crate) fn body_len(&self) -> io::Result<u64> {
        self.file_len().map(|len| len.saturating_sub(self.offset))
    }

    pub(crate) fn seek_end(&mut self) -> io::Result<u64> {
        self.handle.seek(SeekFrom::End(0))
    }

    pub(crate) fn sync_data(&self) -> io::Result<()> {
        self.handle.sync_data()
    }
}

impl Seek for BodyFile {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let offset_pos = match pos {
            SeekFrom::Start(p) => SeekFrom::Start(p + self.offset),
            SeekFrom::End(p) => SeekFrom::End(p),
            SeekFrom::Current(p) => SeekFrom::Current(p),
        };
        self.handle
            .seek(offset_pos)
            .map(|p| p.saturating_sub(self.offset))
    }

    fn stream_position(&mut self) -> io::Result<u64> {
        self.handle
            .stream_position()
            .map(|p| p.saturating_sub(self.offset))
    }
}

impl Read for BodyFile {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.handle.read(buf)
    }
}

impl Write for BodyFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.handle.write(buf)
    }
    fn flush(&mut self) -> io::Result<()> {
        self.handle.flush()
    }
}

/// Writes `text` as exactly `width` bytes: zero padded when shorter,
/// truncated (on a char boundary) when longer.
pub(crate) fn write_fixed_str(
    w: &mut impl Write,
    text: &str,
    width: usize,
) -> io::Result<()> {
    let mut field = vec![0u8; width];
    let bytes = truncate_to_boundary(text, width).as_bytes();
    field[..bytes.len()].copy_from_slice(bytes);
    w.write_all(&field)
}

/// Reads a `width` byte text field, strips the zero padding.
pub(crate) fn read_fixed_str(r: &mut impl Read, width: usize) -> io::Result<String> {
    let mut field = vec![0u8; width];
    r.read_exact(&mut field)?;
    Ok(decode_fixed_str(&field))
}

pub(crate) fn decode_fixed_str(field: &[u8]) -> String {
    let end = field
        .iter()
        .rposition(|b| *b != 0)
        .map(|last| last + 1)
        .unwrap_or(0);
    String::from_utf8_lossy(&field[..end]).into_owned()
}

fn truncate_to_boundary(text: &str, width: usize) -> &str {
    if text.len() <= width {
        return text;
    }
    let mut end = width;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_text_is_zero_padded() {
        let mut buf = Vec::new();
        write_fixed_str(&mut buf, "HR", 8).unwrap();
        assert_eq!(buf, b"HR\0\0\0\0\0\0");
        assert_eq!(decode_fixed_str(&buf), "HR");
    }

    #[test]
    fn long_text_is_truncated() {
        let mut buf = Vec::new();
        write_fixed_str(&mut buf, "T1ICU-NORTH", 8).unwrap();
        assert_eq!(buf, b"T1ICU-NO");
    }

    #[test]
    fn truncation_keeps_utf8_valid() {
        let mut buf = Vec::new();
        // 'é' is two bytes and straddles the 4 byte limit
        write_fixed_str(&mut buf, "abcé", 4).unwrap();
        assert_eq!(buf, b"abc\0");
        assert_eq!(decode_fixed_str(&buf), "abc");
    }

    #[test]
    fn inner_zero_bytes_survive() {
        assert_eq!(decode_fixed_str(b"a\0b\0\0"), "a\0b");
    }
}
