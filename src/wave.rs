//! Multi-channel waveform files: a fixed header, one descriptor per channel
//! and a body of interleaved samples.

pub mod data;
pub mod encoding;
pub mod header;

use std::io::{self, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use byteorder::{LittleEndian, WriteBytesExt};
use num_traits::ToPrimitive;
use tracing::{debug, instrument, warn};

use crate::error::{PreconditionError, State};
use crate::file::{self, BodyFile, Mode, OpenError};

pub use data::{ReadOptions, Span};
pub use encoding::{ChannelData, SampleEncoding};
pub use header::{ChannelInfo, WaveHeader};

use data::Window;
use header::{CHANNEL_SIZE, HEADER_SIZE, MAGIC, SAMPLE_COUNT_POS};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Could not open wave file: {0}")]
    Open(#[from] OpenError),
    #[error(transparent)]
    Precondition(#[from] PreconditionError),
    #[error("Unsupported sample encoding: {0}, expected 1 (double), 2 (float) or 3 (short)")]
    UnsupportedFormat(i32),
    #[error(
        "Header says there are {header} channels but {descriptors} \
        channel descriptors are set"
    )]
    ChannelCountMismatch { header: i32, descriptors: usize },
    #[error("Sample {tick} of channel {channel} can not be stored in the file's encoding")]
    ValueOutOfRange { channel: usize, tick: usize },
    #[error("A gap of {gap_secs} seconds does not fit in memory")]
    GapTooLong { gap_secs: i64 },
    #[error("Could not read header: {0}")]
    ReadHeader(io::Error),
    #[error("Could not write header: {0}")]
    WriteHeader(io::Error),
    #[error("Could not read samples: {0}")]
    ReadData(io::Error),
    #[error("Could not append samples: {0}")]
    WriteData(io::Error),
    #[error("Could not persist sample count: {0}")]
    UpdateSampleCount(io::Error),
    #[error("Could not flush file while closing: {0}")]
    Close(io::Error),
}

/// An open multi-channel waveform file.
///
/// The header must be established, by [`read_header`](Self::read_header) or
/// [`write_header`](Self::write_header), before samples can be read or
/// written. Changing the in-memory header or channels makes it unknown again
/// until it is written. The file is closed on drop, call
/// [`close`](Self::close) to see errors from flushing.
#[derive(Debug)]
pub struct WaveFile {
    path: PathBuf,
    mode: Mode,
    state: State,
    file: Option<BodyFile>,
    header: WaveHeader,
    channels: Vec<ChannelInfo>,
}

impl WaveFile {
    /// # Errors
    /// - [`OpenError::AlreadyExists`] when creating and the path exists
    /// - [`OpenError::NotFound`] when reading and the file can not be opened
    #[instrument]
    pub fn open(path: impl AsRef<Path> + std::fmt::Debug, mode: Mode) -> Result<Self, Error> {
        let path = path.as_ref();
        let handle = file::open(path, mode)?;
        Ok(Self {
            path: path.to_owned(),
            mode,
            state: State::Opened,
            file: Some(BodyFile::new(handle)),
            header: WaveHeader::default(),
            channels: Vec::new(),
        })
    }

    pub fn builder() -> crate::builder::WaveFileBuilder<false> {
        crate::builder::WaveFileBuilder::new()
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

    pub fn header(&self) -> &WaveHeader {
        &self.header
    }

    pub fn channels(&self) -> &[ChannelInfo] {
        &self.channels
    }

    /// Channel labels, an empty label is replaced by `Unnamed_Channel_<n>`
    /// where `n` counts from one.
    pub fn channel_labels(&self) -> Vec<String> {
        self.channels
            .iter()
            .enumerate()
            .map(|(i, c)| {
                if c.label.is_empty() {
                    format!("Unnamed_Channel_{}", i + 1)
                } else {
                    c.label.clone()
                }
            })
            .collect()
    }

    pub fn set_header(&mut self, header: WaveHeader) {
        self.header = header;
        self.forget_header();
    }

    pub fn add_channel(&mut self, channel: ChannelInfo) {
        self.channels.push(channel);
        self.forget_header();
    }

    pub fn set_channels(&mut self, channels: Vec<ChannelInfo>) {
        self.channels = channels;
        self.forget_header();
    }

    fn forget_header(&mut self) {
        if self.state == State::HeaderKnown {
            self.state = State::Opened;
        }
    }

    fn file_mut(&mut self, operation: &'static str) -> Result<&mut BodyFile, PreconditionError> {
        self.file
            .as_mut()
            .ok_or(PreconditionError::Closed { operation })
    }

    fn body_offset(&self) -> u64 {
        HEADER_SIZE + CHANNEL_SIZE * self.channels.len() as u64
    }

    /// Parses the header and exactly as many channel descriptors as it
    /// announces, replacing the in-memory state.
    #[instrument(skip(self), fields(path = ?self.path), err)]
    pub fn read_header(&mut self) -> Result<(), Error> {
        self.state.ensure_open("read_header")?;
        let file = self.file_mut("read_header")?;

        let prefix = file.prefix_mut();
        prefix.seek(SeekFrom::Start(0)).map_err(Error::ReadHeader)?;
        let header = WaveHeader::read_from(prefix).map_err(Error::ReadHeader)?;
        let channels = (0..header.channel_count())
            .map(|_| ChannelInfo::read_from(prefix))
            .collect::<Result<Vec<_>, _>>()
            .map_err(Error::ReadHeader)?;

        if header.magic != MAGIC {
            warn!(magic = ?header.magic, "file does not start with the CFWB tag");
        }
        debug!(
            n_channels = header.n_channels,
            samples_per_channel = header.samples_per_channel,
            data_format = header.data_format,
            "read header"
        );

        self.header = header;
        self.channels = channels;
        let offset = self.body_offset();
        self.check_body_len(offset);
        self.file_mut("read_header")?.set_offset(offset);
        self.state = State::HeaderKnown;
        Ok(())
    }

    fn check_body_len(&self, offset: u64) {
        let Ok(encoding) = self.header.encoding() else {
            return;
        };
        let record = (encoding.width() * self.channels.len()) as u64;
        let Some(file) = self.file.as_ref() else {
            return;
        };
        if let Ok(len) = file.file_len() {
            let in_file = len.saturating_sub(offset).checked_div(record).unwrap_or(0);
            if in_file != self.header.sample_count() {
                warn!(
                    in_header = self.header.samples_per_channel,
                    in_file, "sample count in header does not match the file size"
                );
            }
        }
    }

    /// Writes the header followed by every channel descriptor at the start
    /// of the file. Text fields are zero padded or truncated to 32 bytes.
    ///
    /// The whole prefix is rewritten every time, the caller must keep the
    /// channel count and encoding the same once samples have been written.
    #[instrument(skip(self), fields(path = ?self.path), err)]
    pub fn write_header(&mut self) -> Result<(), Error> {
        self.state.ensure_open("write_header")?;
        if self.header.channel_count() != self.channels.len() {
            return Err(Error::ChannelCountMismatch {
                header: self.header.n_channels,
                descriptors: self.channels.len(),
            });
        }

        let mut buf = Vec::with_capacity(self.body_offset() as usize);
        self.header.write_to(&mut buf).map_err(Error::WriteHeader)?;
        for channel in &self.channels {
            channel.write_to(&mut buf).map_err(Error::WriteHeader)?;
        }

        let offset = self.body_offset();
        let file = self.file_mut("write_header")?;
        let prefix = file.prefix_mut();
        prefix.seek(SeekFrom::Start(0)).map_err(Error::WriteHeader)?;
        prefix.write_all(&buf).map_err(Error::WriteHeader)?;
        file.set_offset(offset);
        self.state = State::HeaderKnown;
        Ok(())
    }

    /// Reads `length` sample ticks starting at `offset` for every channel.
    ///
    /// An offset and length of zero reads the whole body. A window that runs
    /// past the sample count in the header is cut short, one that starts
    /// past it is empty.
    ///
    /// # Errors
    /// Fails with [`PreconditionError`] if the header is not known and with
    /// [`Error::UnsupportedFormat`] for an unknown encoding.
    #[instrument(skip(self), level = "debug", err)]
    pub fn read_channel_data(
        &mut self,
        offset: Span,
        length: Span,
        options: ReadOptions,
    ) -> Result<Vec<ChannelData>, Error> {
        self.state.ensure_header_known("read_channel_data")?;
        let encoding = self.header.encoding()?;
        let window = Window::clamp(
            offset.to_samples(self.header.secs_per_tick),
            length.to_samples(self.header.secs_per_tick),
            self.header.sample_count(),
        );
        debug!(?window, "reading samples");

        let n_channels = self.channels.len();
        let file = self.file_mut("read_channel_data")?;
        let raw = data::read_raw(file, window, n_channels, encoding).map_err(Error::ReadData)?;
        if options.skip_scaling {
            return Ok(raw);
        }

        let scaled = data::scale(raw, &self.channels);
        if options.downsample_ratio == 1.0 {
            Ok(scaled)
        } else {
            Ok(data::downsample(scaled, options.downsample_ratio))
        }
    }

    /// Appends samples to the end of the body. One slice per channel, in
    /// channel order, values are stored as is (no scaling).
    ///
    /// - `gap_secs > 0`: first writes `gap_secs * sampling_rate` ticks of
    ///   filler ([`encoding::MIN_SHORT_VALUE`] for shorts).
    /// - `gap_secs < 0`: the first `-gap_secs * sampling_rate` ticks of the
    ///   input already are in the file and are skipped.
    ///
    /// The first channel decides how many ticks are written, missing samples
    /// in shorter channels are written as filler. Returns the number of ticks
    /// written including the gap. The header's sample count is not touched,
    /// use [`update_sample_count`](Self::update_sample_count).
    #[instrument(skip(self, channels), level = "debug", err)]
    pub fn write_channel_data<T, C>(
        &mut self,
        channels: &[C],
        sampling_rate: u32,
        gap_secs: i64,
    ) -> Result<u64, Error>
    where
        T: ToPrimitive + Copy,
        C: AsRef<[T]>,
    {
        self.state.ensure_header_known("write_channel_data")?;
        let encoding = self.header.encoding()?;
        if channels.len() != self.channels.len() {
            warn!(
                given = channels.len(),
                in_header = self.channels.len(),
                "writing a different number of channels then the header describes"
            );
        }

        let encoded = data::encode(channels, encoding, sampling_rate, gap_secs)?;
        let file = self.file_mut("write_channel_data")?;
        file.seek_end().map_err(Error::WriteData)?;
        file.write_all(&encoded.bytes).map_err(Error::WriteData)?;
        debug!(ticks = encoded.ticks, "appended samples");
        Ok(encoded.ticks)
    }

    /// Sets the sample count in memory. With `persist` and a writable mode
    /// only that field is rewritten in the file, then the file is flushed.
    #[instrument(skip(self), level = "debug", err)]
    pub fn update_sample_count(&mut self, samples: i32, persist: bool) -> Result<(), Error> {
        self.state.ensure_header_known("update_sample_count")?;
        self.header.samples_per_channel = samples;
        if !persist {
            return Ok(());
        }
        if !self.mode.is_writable() {
            debug!("file opened read only, not persisting sample count");
            return Ok(());
        }

        let file = self.file_mut("update_sample_count")?;
        let prefix = file.prefix_mut();
        prefix
            .seek(SeekFrom::Start(SAMPLE_COUNT_POS))
            .map_err(Error::UpdateSampleCount)?;
        prefix
            .write_i32::<LittleEndian>(samples)
            .map_err(Error::UpdateSampleCount)?;
        prefix.flush().map_err(Error::UpdateSampleCount)?;
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

impl Drop for WaveFile {
    fn drop(&mut self) {
        if let Err(err) = self.close() {
            warn!(path = ?self.path, "{err}");
        }
    }
}
