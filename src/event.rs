//! Single channel event files: a fixed header followed by records of four
//! doubles (value, time offset, low bound, high bound).

pub mod header;

use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use byteorder::{ByteOrder, LittleEndian, ReadBytesExt, WriteBytesExt};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, trace, warn};

use crate::error::{PreconditionError, State};
use crate::file::{self, BodyFile, Mode, OpenError};

pub use header::EventHeader;
use header::HEADER_SIZE;

/// value, offset, low and high: 4 x double
pub const RECORD_SIZE: u64 = 4 * 8;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    pub value: f64,
    /// Seconds since the capture time in the header.
    pub offset: f64,
    pub low: f64,
    pub high: f64,
}

impl EventRecord {
    pub fn new(value: f64, offset: f64, low: f64, high: f64) -> Self {
        Self {
            value,
            offset,
            low,
            high,
        }
    }

    fn read_from(r: &mut impl Read) -> io::Result<Self> {
        Ok(Self {
            value: r.read_f64::<LittleEndian>()?,
            offset: r.read_f64::<LittleEndian>()?,
            low: r.read_f64::<LittleEndian>()?,
            high: r.read_f64::<LittleEndian>()?,
        })
    }

    fn write_to(&self, w: &mut impl Write) -> io::Result<()> {
        w.write_f64::<LittleEndian>(self.value)?;
        w.write_f64::<LittleEndian>(self.offset)?;
        w.write_f64::<LittleEndian>(self.low)?;
        w.write_f64::<LittleEndian>(self.high)
    }
}

impl From<(f64, f64, f64, f64)> for EventRecord {
    fn from((value, offset, low, high): (f64, f64, f64, f64)) -> Self {
        Self::new(value, offset, low, high)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Could not open event file: {0}")]
    Open(#[from] OpenError),
    #[error(transparent)]
    Precondition(#[from] PreconditionError),
    #[error("Could not get file size: {0}")]
    FileSize(io::Error),
    #[error("Could not read header: {0}")]
    ReadHeader(io::Error),
    #[error("Could not write header: {0}")]
    WriteHeader(io::Error),
    #[error("Could not move to record {index}: {source}")]
    Seek {
        index: u64,
        #[source]
        source: io::Error,
    },
    #[error("Could not read record: {0}")]
    ReadRecord(io::Error),
    #[error("Could not append record: {0}")]
    WriteRecord(io::Error),
    #[error("Could not flush file while closing: {0}")]
    Close(io::Error),
}

/// An open event file.
///
/// Records are read sequentially from the current position, use
/// [`seek_record`](Self::seek_record) to move around. Writes always append.
/// The header must be read or written before touching records. The file is
/// closed on drop.
#[derive(Debug)]
pub struct EventFile {
    path: PathBuf,
    mode: Mode,
    state: State,
    file: Option<BodyFile>,
    header: EventHeader,
    record_count: u64,
}

impl EventFile {
    /// Opening an existing file also counts the records in it.
    ///
    /// # Errors
    /// - [`OpenError::AlreadyExists`] when creating and the path exists
    /// - [`OpenError::NotFound`] when reading and the file can not be opened
    #[instrument(fields(record_count))]
    pub fn open(path: impl AsRef<Path> + std::fmt::Debug, mode: Mode) -> Result<Self, Error> {
        let path = path.as_ref();
        let mut file = BodyFile::new(file::open(path, mode)?);
        file.set_offset(HEADER_SIZE);

        let record_count = match mode {
            Mode::Create => 0,
            Mode::Read | Mode::ReadWrite => {
                let body = file.body_len().map_err(Error::FileSize)?;
                if body % RECORD_SIZE != 0 {
                    warn!(
                        trailing_bytes = body % RECORD_SIZE,
                        "file ends in a partial record"
                    );
                }
                body / RECORD_SIZE
            }
        };
        tracing::Span::current().record("record_count", record_count);

        Ok(Self {
            path: path.to_owned(),
            mode,
            state: State::Opened,
            file: Some(file),
            header: EventHeader::default(),
            record_count,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn is_closed(&self) -> bool {
        self.state == State::Closed
    }

    pub fn header(&self) -> &EventHeader {
        &self.header
    }

    /// Number of complete records in the file.
    pub fn record_count(&self) -> u64 {
        self.record_count
    }

    pub fn set_header(&mut self, header: EventHeader) {
        self.header = header;
        if self.state == State::HeaderKnown {
            self.state = State::Opened;
        }
    }

    fn file_mut(&mut self, operation: &'static str) -> Result<&mut BodyFile, PreconditionError> {
        self.file
            .as_mut()
            .ok_or(PreconditionError::Closed { operation })
    }

    /// Reads the header, afterwards the file is positioned at the
    /// first record.
    #[instrument(skip(self), fields(path = ?self.path), err)]
    pub fn read_header(&mut self) -> Result<(), Error> {
        self.state.ensure_open("read_header")?;
        let prefix = self.file_mut("read_header")?.prefix_mut();
        prefix.seek(SeekFrom::Start(0)).map_err(Error::ReadHeader)?;
        let header = EventHeader::read_from(prefix).map_err(Error::ReadHeader)?;
        debug!(label = %header.label, bed = %header.bed, "read header");

        self.header = header;
        self.state = State::HeaderKnown;
        Ok(())
    }

    /// Writes the header at the start of the file. Text fields are zero
    /// padded or truncated to their width.
    #[instrument(skip(self), fields(path = ?self.path), err)]
    pub fn write_header(&mut self) -> Result<(), Error> {
        self.state.ensure_open("write_header")?;
        let mut buf = Vec::with_capacity(HEADER_SIZE as usize);
        self.header.write_to(&mut buf).map_err(Error::WriteHeader)?;

        let prefix = self.file_mut("write_header")?.prefix_mut();
        prefix.seek(SeekFrom::Start(0)).map_err(Error::WriteHeader)?;
        prefix.write_all(&buf).map_err(Error::WriteHeader)?;
        self.state = State::HeaderKnown;
        Ok(())
    }

    /// Positions the file at record `index`, counting from zero.
    pub fn seek_record(&mut self, index: u64) -> Result<(), Error> {
        self.state.ensure_header_known("seek_record")?;
        let file = self.file_mut("seek_record")?;
        file.seek(SeekFrom::Start(index.saturating_mul(RECORD_SIZE)))
            .map_err(|source| Error::Seek { index, source })?;
        Ok(())
    }

    /// Reads the record at the current position.
    pub fn read_record(&mut self) -> Result<EventRecord, Error> {
        self.state.ensure_header_known("read_record")?;
        let file = self.file_mut("read_record")?;
        EventRecord::read_from(file).map_err(Error::ReadRecord)
    }

    /// Reads up to `count` records from the current position in one go.
    /// Fewer are returned if the file ends first.
    #[instrument(skip(self), level = "debug", err)]
    pub fn read_records(&mut self, count: u64) -> Result<Vec<EventRecord>, Error> {
        self.state.ensure_header_known("read_records")?;
        let file = self.file_mut("read_records")?;

        let mut buf = Vec::new();
        file.take(count.saturating_mul(RECORD_SIZE))
            .read_to_end(&mut buf)
            .map_err(Error::ReadRecord)?;
        let complete = buf.len() - buf.len() % RECORD_SIZE as usize;
        trace!(bytes = buf.len(), "read records");

        let mut values = vec![0f64; complete / 8];
        LittleEndian::read_f64_into(&buf[..complete], &mut values);
        Ok(values
            .into_iter()
            .tuples::<(f64, f64, f64, f64)>()
            .map(EventRecord::from)
            .collect())
    }

    /// Appends a record to the end of the file.
    pub fn write_record(&mut self, record: EventRecord) -> Result<(), Error> {
        self.state.ensure_header_known("write_record")?;
        let mut buf = Vec::with_capacity(RECORD_SIZE as usize);
        record.write_to(&mut buf).map_err(Error::WriteRecord)?;

        let file = self.file_mut("write_record")?;
        file.seek_end().map_err(Error::WriteRecord)?;
        file.write_all(&buf).map_err(Error::WriteRecord)?;
        self.record_count += 1;
        Ok(())
    }

    /// Flushes and releases the file. Closing twice is a no-op.
    pub fn close(&mut self) -> Result<(), Error> {
        self.state = State::Closed;
        let Some(mut file) = self.file.take() else {
            return Ok(());
        };
        file.flush().map_err(Error::Close)?;
        if self.mode.is_writable() {
            file.sync_data().map_err(Error::Close)?;
        }
        Ok(())
    }
}

impl Drop for EventFile {
    fn drop(&mut self) {
        if let Err(err) = self.close() {
            warn!(path = ?self.path, "{err}");
        }
    }
}
