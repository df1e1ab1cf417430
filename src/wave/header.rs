use std::io::{self, Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use chrono::{NaiveDateTime, TimeDelta};
use serde::{Deserialize, Serialize};

use crate::capture::CaptureTime;
use crate::file::{read_fixed_str, write_fixed_str};

use super::encoding::SampleEncoding;
use super::Error;

pub const MAGIC: [u8; 4] = *b"CFWB";
pub const VERSION: i32 = 1;

pub const LABEL_LEN: usize = 32;
pub const UNIT_LEN: usize = 32;

/// magic, version, secs per tick, capture time, trigger and 4 x int32
pub const HEADER_SIZE: u64 = 4 + 4 + 8 + CaptureTime::SIZE as u64 + 8 + 4 * 4;
/// label, unit and 4 x double
pub const CHANNEL_SIZE: u64 = (LABEL_LEN + UNIT_LEN) as u64 + 4 * 8;
/// Byte offset of the samples per channel field, it is the only field
/// ever rewritten on its own.
pub const SAMPLE_COUNT_POS: u64 = 4 + 4 + 8 + CaptureTime::SIZE as u64 + 8 + 4;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaveHeader {
    pub magic: [u8; 4],
    pub version: i32,
    /// Seconds between two sample ticks.
    pub secs_per_tick: f64,
    pub start: CaptureTime,
    pub trigger: f64,
    pub n_channels: i32,
    pub samples_per_channel: i32,
    pub time_channel: i32,
    /// Raw encoding code as stored in the file, see [`WaveHeader::encoding`].
    pub data_format: i32,
}

impl Default for WaveHeader {
    fn default() -> Self {
        Self {
            magic: MAGIC,
            version: VERSION,
            secs_per_tick: 0.0,
            start: CaptureTime::default(),
            trigger: 0.0,
            n_channels: 0,
            samples_per_channel: 0,
            time_channel: 0,
            data_format: SampleEncoding::Short.code(),
        }
    }
}

impl WaveHeader {
    /// # Errors
    /// Returns [`Error::UnsupportedFormat`] if the data format code
    /// is not one of the three known encodings.
    pub fn encoding(&self) -> Result<SampleEncoding, Error> {
        SampleEncoding::from_code(self.data_format)
            .ok_or(Error::UnsupportedFormat(self.data_format))
    }

    pub fn set_encoding(&mut self, encoding: SampleEncoding) {
        self.data_format = encoding.code();
    }

    /// Samples per second, `None` when no tick length is set.
    pub fn sampling_rate(&self) -> Option<f64> {
        (self.secs_per_tick > 0.0).then(|| 1.0 / self.secs_per_tick)
    }

    /// Time covered by the samples the header claims are present.
    pub fn duration(&self) -> TimeDelta {
        let secs = f64::from(self.samples_per_channel) * self.secs_per_tick;
        #[allow(clippy::cast_possible_truncation)]
        let micros = (secs * 1e6).round() as i64;
        TimeDelta::microseconds(micros)
    }

    pub fn start_time(&self) -> Option<NaiveDateTime> {
        self.start.to_datetime()
    }

    pub fn end_time(&self) -> Option<NaiveDateTime> {
        self.start_time().map(|start| start + self.duration())
    }

    /// Channel count as a usize, negative counts are treated as zero.
    pub(crate) fn channel_count(&self) -> usize {
        usize::try_from(self.n_channels).unwrap_or(0)
    }

    pub(crate) fn sample_count(&self) -> u64 {
        u64::try_from(self.samples_per_channel).unwrap_or(0)
    }

    pub(crate) fn read_from(r: &mut impl Read) -> io::Result<Self> {
        let mut magic = [0u8; 4];
        r.read_exact(&mut magic)?;
        Ok(Self {
            magic,
            version: r.read_i32::<LittleEndian>()?,
            secs_per_tick: r.read_f64::<LittleEndian>()?,
            start: CaptureTime::read_from(r)?,
            trigger: r.read_f64::<LittleEndian>()?,
            n_channels: r.read_i32::<LittleEndian>()?,
            samples_per_channel: r.read_i32::<LittleEndian>()?,
            time_channel: r.read_i32::<LittleEndian>()?,
            data_format: r.read_i32::<LittleEndian>()?,
        })
    }

    pub(crate) fn write_to(&self, w: &mut impl Write) -> io::Result<()> {
        w.write_all(&self.magic)?;
        w.write_i32::<LittleEndian>(self.version)?;
        w.write_f64::<LittleEndian>(self.secs_per_tick)?;
        self.start.write_to(w)?;
        w.write_f64::<LittleEndian>(self.trigger)?;
        w.write_i32::<LittleEndian>(self.n_channels)?;
        w.write_i32::<LittleEndian>(self.samples_per_channel)?;
        w.write_i32::<LittleEndian>(self.time_channel)?;
        w.write_i32::<LittleEndian>(self.data_format)
    }
}

/// Describes one channel, stored once per channel right after the header
/// in the same order as the samples in every tick.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChannelInfo {
    /// At most 32 bytes are stored.
    pub label: String,
    /// At most 32 bytes are stored.
    #[serde(default)]
    pub unit: String,
    #[serde(default = "unit_scale")]
    pub scale: f64,
    #[serde(default)]
    pub offset: f64,
    #[serde(default)]
    pub range_high: f64,
    #[serde(default)]
    pub range_low: f64,
}

fn unit_scale() -> f64 {
    1.0
}

impl ChannelInfo {
    pub fn new(label: impl Into<String>, unit: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            unit: unit.into(),
            scale: 1.0,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_scaling(mut self, scale: f64, offset: f64) -> Self {
        self.scale = scale;
        self.offset = offset;
        self
    }

    #[must_use]
    pub fn with_range(mut self, low: f64, high: f64) -> Self {
        self.range_low = low;
        self.range_high = high;
        self
    }

    /// Physical value of a raw short sample: `scale * (raw + offset)`.
    pub fn scale_raw(&self, raw: i16) -> f64 {
        self.scale * (f64::from(raw) + self.offset)
    }

    pub(crate) fn read_from(r: &mut impl Read) -> io::Result<Self> {
        Ok(Self {
            label: read_fixed_str(r, LABEL_LEN)?,
            unit: read_fixed_str(r, UNIT_LEN)?,
            scale: r.read_f64::<LittleEndian>()?,
            offset: r.read_f64::<LittleEndian>()?,
            range_high: r.read_f64::<LittleEndian>()?,
            range_low: r.read_f64::<LittleEndian>()?,
        })
    }

    pub(crate) fn write_to(&self, w: &mut impl Write) -> io::Result<()> {
        write_fixed_str(w, &self.label, LABEL_LEN)?;
        write_fixed_str(w, &self.unit, UNIT_LEN)?;
        w.write_f64::<LittleEndian>(self.scale)?;
        w.write_f64::<LittleEndian>(self.offset)?;
        w.write_f64::<LittleEndian>(self.range_high)?;
        w.write_f64::<LittleEndian>(self.range_low)
    }
}
