use byteorder::{ByteOrder, LittleEndian};
use num_traits::ToPrimitive;
use serde::{Deserialize, Serialize};

/// Short samples with one of these raw values mean no data was recorded.
pub const GAP_SHORT_VALUES: [i16; 2] = [-32767, -32768];
/// Written for missing short samples.
pub const MIN_SHORT_VALUE: i16 = -32767;
/// Written for missing float samples.
pub const MIN_FLOAT_VALUE: f32 = -3.4e38;
/// Written for missing double samples. Scaled reads also return this
/// for short samples that hold a gap sentinel.
pub const MIN_DOUBLE_VALUE: f64 = -1.7e308;

/// On disk representation of every sample in a wave file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SampleEncoding {
    Double,
    Float,
    Short,
}

impl SampleEncoding {
    pub const fn code(self) -> i32 {
        match self {
            SampleEncoding::Double => 1,
            SampleEncoding::Float => 2,
            SampleEncoding::Short => 3,
        }
    }

    pub const fn from_code(code: i32) -> Option<Self> {
        match code {
            1 => Some(SampleEncoding::Double),
            2 => Some(SampleEncoding::Float),
            3 => Some(SampleEncoding::Short),
            _ => None,
        }
    }

    /// Bytes per sample.
    pub const fn width(self) -> usize {
        match self {
            SampleEncoding::Double => 8,
            SampleEncoding::Float => 4,
            SampleEncoding::Short => 2,
        }
    }

    /// Encoded filler for gaps and for channels that run out of samples.
    pub(crate) fn filler(self) -> Vec<u8> {
        let mut buf = vec![0u8; self.width()];
        match self {
            SampleEncoding::Double => LittleEndian::write_f64(&mut buf, MIN_DOUBLE_VALUE),
            SampleEncoding::Float => LittleEndian::write_f32(&mut buf, MIN_FLOAT_VALUE),
            SampleEncoding::Short => LittleEndian::write_i16(&mut buf, MIN_SHORT_VALUE),
        }
        buf
    }

    /// Appends `value` to `out`, returns false if it can not be
    /// represented in this encoding.
    pub(crate) fn encode_into(self, value: impl ToPrimitive, out: &mut Vec<u8>) -> bool {
        let mut buf = [0u8; 8];
        let width = self.width();
        match self {
            SampleEncoding::Double => match value.to_f64() {
                Some(v) => LittleEndian::write_f64(&mut buf, v),
                None => return false,
            },
            SampleEncoding::Float => match value.to_f32() {
                Some(v) => LittleEndian::write_f32(&mut buf, v),
                None => return false,
            },
            SampleEncoding::Short => match value.to_i16() {
                Some(v) => LittleEndian::write_i16(&mut buf, v),
                None => return false,
            },
        }
        out.extend_from_slice(&buf[..width]);
        true
    }

    pub(crate) fn empty_channel(self, capacity: usize) -> ChannelData {
        match self {
            SampleEncoding::Double => ChannelData::Double(Vec::with_capacity(capacity)),
            SampleEncoding::Float => ChannelData::Float(Vec::with_capacity(capacity)),
            SampleEncoding::Short => ChannelData::Short(Vec::with_capacity(capacity)),
        }
    }
}

/// Samples of one channel.
///
/// Scaled reads return `Double`, raw reads return the variant matching the
/// file's encoding and resampled reads return `Short`.
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelData {
    Double(Vec<f64>),
    Float(Vec<f32>),
    Short(Vec<i16>),
}

impl ChannelData {
    pub fn len(&self) -> usize {
        match self {
            ChannelData::Double(v) => v.len(),
            ChannelData::Float(v) => v.len(),
            ChannelData::Short(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Widens every sample to `f64`, this is lossless.
    pub fn to_f64(&self) -> Vec<f64> {
        match self {
            ChannelData::Double(v) => v.clone(),
            ChannelData::Float(v) => v.iter().copied().map(f64::from).collect(),
            ChannelData::Short(v) => v.iter().copied().map(f64::from).collect(),
        }
    }

    pub fn as_f64(&self) -> Option<&[f64]> {
        match self {
            ChannelData::Double(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_f32(&self) -> Option<&[f32]> {
        match self {
            ChannelData::Float(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_i16(&self) -> Option<&[i16]> {
        match self {
            ChannelData::Short(v) => Some(v),
            _ => None,
        }
    }

    /// Appends one raw sample, the encoding must match the variant.
    pub(crate) fn push_raw(&mut self, bytes: &[u8]) {
        match self {
            ChannelData::Double(v) => v.push(LittleEndian::read_f64(bytes)),
            ChannelData::Float(v) => v.push(LittleEndian::read_f32(bytes)),
            ChannelData::Short(v) => v.push(LittleEndian::read_i16(bytes)),
        }
    }
}
