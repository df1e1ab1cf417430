use std::io::{self, Read, Seek, SeekFrom};

use num_traits::ToPrimitive;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::resample::resample;

use super::encoding::{ChannelData, SampleEncoding, GAP_SHORT_VALUES, MIN_DOUBLE_VALUE};
use super::header::ChannelInfo;
use super::Error;

/// A position or length in the sample body, either counted in sample ticks
/// or in seconds. Seconds are converted using the header's tick length and
/// truncated to whole ticks.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Span {
    Samples(u64),
    Seconds(f64),
}

impl Default for Span {
    fn default() -> Self {
        Span::Samples(0)
    }
}

impl Span {
    /// Negative or NaN seconds become zero, a zero tick length turns
    /// any positive number of seconds into `u64::MAX` ticks.
    pub fn to_samples(self, secs_per_tick: f64) -> u64 {
        match self {
            Span::Samples(n) => n,
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            Span::Seconds(secs) => (secs / secs_per_tick) as u64,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReadOptions {
    /// Target rate divided by the file's rate. Anything other then 1.0
    /// resamples every (scaled) channel, see [`resample`].
    pub downsample_ratio: f64,
    /// Return the samples as stored: no scaling, gap sentinels untouched
    /// and no resampling.
    pub skip_scaling: bool,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            downsample_ratio: 1.0,
            skip_scaling: false,
        }
    }
}

impl ReadOptions {
    #[must_use]
    pub fn raw() -> Self {
        Self {
            skip_scaling: true,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn downsampled(ratio: f64) -> Self {
        Self {
            downsample_ratio: ratio,
            ..Self::default()
        }
    }
}

/// Range of sample ticks to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Window {
    pub(crate) offset: u64,
    pub(crate) len: u64,
}

impl Window {
    /// Requesting offset and length zero reads everything, a window running
    /// past the end is cut short.
    pub(crate) fn clamp(offset: u64, len: u64, total: u64) -> Self {
        let len = if offset == 0 && len == 0 {
            total
        } else if offset.saturating_add(len) > total {
            total.saturating_sub(offset)
        } else {
            len
        };
        Self { offset, len }
    }
}

/// Reads `window` from a body of interleaved samples, one bulk read.
///
/// Fails with [`io::ErrorKind::UnexpectedEof`] if the body holds fewer
/// samples than the window asks for.
pub(crate) fn read_raw(
    body: &mut (impl Read + Seek),
    window: Window,
    n_channels: usize,
    encoding: SampleEncoding,
) -> io::Result<Vec<ChannelData>> {
    let width = encoding.width();
    let record = (width * n_channels) as u64;
    let start = window.offset.saturating_mul(record);
    let n_bytes = window.len.saturating_mul(record);
    trace!("reading {n_bytes} bytes starting {start} bytes into the body");

    let mut buf = Vec::new();
    if n_bytes > 0 {
        body.seek(SeekFrom::Start(start))?;
        body.take(n_bytes).read_to_end(&mut buf)?;
    }
    if (buf.len() as u64) < n_bytes {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            format!(
                "body ends {} bytes into a {n_bytes} byte read, \
                sample count in header is larger than the data",
                buf.len()
            ),
        ));
    }

    let ticks = if record == 0 { 0 } else { buf.len() / record as usize };
    let mut channels: Vec<_> = (0..n_channels)
        .map(|_| encoding.empty_channel(ticks))
        .collect();
    for tick in buf.chunks_exact(width * n_channels) {
        for (channel, sample) in channels.iter_mut().zip(tick.chunks_exact(width)) {
            channel.push_raw(sample);
        }
    }
    Ok(channels)
}

/// Turns raw samples into physical values. Short samples are scaled using
/// their channel's scale and offset, gap sentinels become
/// [`MIN_DOUBLE_VALUE`]. Float and double samples are only widened.
pub(crate) fn scale(raw: Vec<ChannelData>, infos: &[ChannelInfo]) -> Vec<ChannelData> {
    raw.into_iter()
        .zip(infos)
        .map(|(channel, info)| match channel {
            ChannelData::Short(samples) => ChannelData::Double(
                samples
                    .into_iter()
                    .map(|raw| {
                        if GAP_SHORT_VALUES.contains(&raw) {
                            MIN_DOUBLE_VALUE
                        } else {
                            info.scale_raw(raw)
                        }
                    })
                    .collect(),
            ),
            ChannelData::Float(_) => ChannelData::Double(channel.to_f64()),
            ChannelData::Double(_) => channel,
        })
        .collect()
}

pub(crate) fn downsample(scaled: Vec<ChannelData>, ratio: f64) -> Vec<ChannelData> {
    scaled
        .into_iter()
        .map(|channel| match channel {
            ChannelData::Double(v) => ChannelData::Short(resample(&v, ratio)),
            ChannelData::Float(v) => ChannelData::Short(resample(&v, ratio)),
            ChannelData::Short(v) => ChannelData::Short(resample(&v, ratio)),
        })
        .collect()
}

/// Encoded body data ready to be appended.
#[derive(Debug)]
pub(crate) struct Encoded {
    pub(crate) bytes: Vec<u8>,
    /// Ticks written, including gap fill.
    pub(crate) ticks: u64,
}

/// Interleaves `channels` into body records.
///
/// A positive `gap_secs` first adds `gap_secs * sampling_rate` ticks of
/// filler, a negative one skips that many ticks at the start of the input
/// as they overlap with data already in the file. The first channel decides
/// the number of ticks. Channels shorter than the first are padded with the
/// encoding's filler, longer ones are cut. That matches how existing files
/// were written.
pub(crate) fn encode<T, C>(
    channels: &[C],
    encoding: SampleEncoding,
    sampling_rate: u32,
    gap_secs: i64,
) -> Result<Encoded, Error>
where
    T: ToPrimitive + Copy,
    C: AsRef<[T]>,
{
    let filler = encoding.filler();
    let n_channels = channels.len();
    let gap_ticks = gap_secs.unsigned_abs().saturating_mul(u64::from(sampling_rate));
    let (fill_ticks, overlap) = if gap_secs > 0 {
        (gap_ticks, 0)
    } else {
        (0, usize::try_from(gap_ticks).unwrap_or(usize::MAX))
    };
    let input_ticks = channels.first().map_or(0, |c| c.as_ref().len());
    let data_ticks = input_ticks.saturating_sub(overlap);

    let fill_bytes = usize::try_from(fill_ticks)
        .ok()
        .and_then(|ticks| ticks.checked_mul(n_channels * filler.len()))
        .ok_or(Error::GapTooLong { gap_secs })?;
    let mut bytes = Vec::with_capacity(fill_bytes + data_ticks * n_channels * encoding.width());
    bytes.extend(filler.iter().copied().cycle().take(fill_bytes));

    for tick in overlap..input_ticks {
        for (channel, samples) in channels.iter().enumerate() {
            match samples.as_ref().get(tick) {
                Some(value) => {
                    if !encoding.encode_into(*value, &mut bytes) {
                        return Err(Error::ValueOutOfRange { channel, tick });
                    }
                }
                None => bytes.extend_from_slice(&filler),
            }
        }
    }

    debug!(
        fill_ticks,
        data_ticks, overlap, "encoded {} bytes of body data", bytes.len()
    );
    Ok(Encoded {
        bytes,
        ticks: fill_ticks + data_ticks as u64,
    })
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::wave::encoding::{MIN_FLOAT_VALUE, MIN_SHORT_VALUE};
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case(0, 0, 100, Window { offset: 0, len: 100 })]
    #[case(10, 20, 100, Window { offset: 10, len: 20 })]
    #[case(90, 20, 100, Window { offset: 90, len: 10 })]
    #[case(100, 5, 100, Window { offset: 100, len: 0 })]
    #[case(150, 5, 100, Window { offset: 150, len: 0 })]
    #[case(150, 0, 100, Window { offset: 150, len: 0 })]
    #[case(0, 0, 0, Window { offset: 0, len: 0 })]
    fn window_is_clamped(
        #[case] offset: u64,
        #[case] len: u64,
        #[case] total: u64,
        #[case] expected: Window,
    ) {
        assert_eq!(Window::clamp(offset, len, total), expected);
    }

    #[test]
    fn seconds_truncate_to_ticks() {
        assert_eq!(Span::Seconds(1.29).to_samples(0.01), 129);
        assert_eq!(Span::Seconds(1.2).to_samples(0.5), 2);
        assert_eq!(Span::Seconds(2.0).to_samples(0.5), 4);
        assert_eq!(Span::Seconds(-3.0).to_samples(0.5), 0);
        assert_eq!(Span::Samples(7).to_samples(0.5), 7);
    }

    fn body(encoding: SampleEncoding, channels: &[Vec<i16>]) -> Cursor<Vec<u8>> {
        let encoded = encode(channels, encoding, 0, 0).unwrap();
        Cursor::new(encoded.bytes)
    }

    #[test]
    fn raw_read_deinterleaves() {
        let mut body = body(SampleEncoding::Short, &[vec![1, 2, 3], vec![-1, -2, -3]]);
        let window = Window { offset: 1, len: 2 };
        let read = read_raw(&mut body, window, 2, SampleEncoding::Short).unwrap();
        assert_eq!(
            read,
            vec![ChannelData::Short(vec![2, 3]), ChannelData::Short(vec![-2, -3])]
        );
    }

    #[test]
    fn window_past_body_end_is_an_error() {
        let mut body = body(SampleEncoding::Short, &[vec![1, 2, 3]]);
        let window = Window {
            offset: 0,
            len: u64::MAX / 4,
        };
        let err = read_raw(&mut body, window, 1, SampleEncoding::Short).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn gap_sentinels_become_missing_value() {
        let info = ChannelInfo::new("ECG", "mV").with_scaling(2.0, 1.0);
        let raw = vec![ChannelData::Short(vec![100, -32767, -32768, 0])];
        let scaled = scale(raw, &[info]);
        assert_eq!(
            scaled,
            vec![ChannelData::Double(vec![
                202.0,
                MIN_DOUBLE_VALUE,
                MIN_DOUBLE_VALUE,
                2.0
            ])]
        );
    }

    #[test]
    fn float_samples_are_not_scaled() {
        let info = ChannelInfo::new("SpO2", "%").with_scaling(2.0, 1.0);
        let scaled = scale(vec![ChannelData::Float(vec![1.5, -2.0])], &[info]);
        assert_eq!(scaled, vec![ChannelData::Double(vec![1.5, -2.0])]);
    }

    #[test]
    fn positive_gap_is_filled() {
        let encoded = encode(&[vec![1.0f64; 5]], SampleEncoding::Float, 10, 2).unwrap();
        assert_eq!(encoded.ticks, 25);
        let mut body = Cursor::new(encoded.bytes);
        let window = Window { offset: 0, len: 25 };
        let read = read_raw(&mut body, window, 1, SampleEncoding::Float).unwrap();
        let samples = read[0].as_f32().unwrap();
        assert!(samples[..20].iter().all(|s| *s == MIN_FLOAT_VALUE));
        assert!(samples[20..].iter().all(|s| *s == 1.0));
    }

    #[test]
    fn negative_gap_skips_overlap() {
        let input = [vec![1i16, 2, 3, 4, 5], vec![6, 7, 8, 9, 10]];
        let encoded = encode(&input, SampleEncoding::Short, 2, -1).unwrap();
        assert_eq!(encoded.ticks, 3);
        let mut body = Cursor::new(encoded.bytes);
        let window = Window { offset: 0, len: 3 };
        let read = read_raw(&mut body, window, 2, SampleEncoding::Short).unwrap();
        assert_eq!(read[0], ChannelData::Short(vec![3, 4, 5]));
        assert_eq!(read[1], ChannelData::Short(vec![8, 9, 10]));
    }

    #[test]
    fn overlap_larger_then_input_writes_nothing() {
        let encoded = encode(&[vec![1i16, 2]], SampleEncoding::Short, 10, -1).unwrap();
        assert_eq!(encoded.ticks, 0);
        assert!(encoded.bytes.is_empty());
    }

    #[test]
    fn short_channel_is_padded_long_channel_is_cut() {
        let input = [vec![1i16, 2, 3], vec![4], vec![5, 6, 7, 8]];
        let encoded = encode(&input, SampleEncoding::Short, 0, 0).unwrap();
        assert_eq!(encoded.ticks, 3);
        let mut body = Cursor::new(encoded.bytes);
        let window = Window { offset: 0, len: 3 };
        let read = read_raw(&mut body, window, 3, SampleEncoding::Short).unwrap();
        assert_eq!(
            read[1],
            ChannelData::Short(vec![4, MIN_SHORT_VALUE, MIN_SHORT_VALUE])
        );
        assert_eq!(read[2], ChannelData::Short(vec![5, 6, 7]));
    }

    #[test]
    fn unrepresentable_value_names_its_position() {
        let input = [vec![1i32, 2], vec![3, 70_000]];
        let err = encode(&input, SampleEncoding::Short, 0, 0).unwrap_err();
        assert!(
            matches!(err, Error::ValueOutOfRange { channel: 1, tick: 1 }),
            "got: {err:?}"
        );
    }
}
