use std::fmt;
use std::path::Path;

use ron::ser::PrettyConfig;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::capture::CaptureTime;
use crate::file::Mode;
use crate::wave::{self, ChannelInfo, SampleEncoding, WaveFile, WaveHeader};

/// Creates a new wave file with its header written. Obtain one through
/// [`WaveFile::builder`]. `create` only becomes available once the sampling
/// rate (or tick length) is set.
#[derive(Debug, Clone)]
pub struct WaveFileBuilder<const RATE_SET: bool> {
    secs_per_tick: f64,
    start: CaptureTime,
    trigger: f64,
    time_channel: i32,
    encoding: SampleEncoding,
    channels: Vec<ChannelInfo>,
}

impl WaveFileBuilder<false> {
    pub(crate) fn new() -> Self {
        Self {
            secs_per_tick: 0.0,
            start: CaptureTime::default(),
            trigger: 0.0,
            time_channel: 0,
            encoding: SampleEncoding::Short,
            channels: Vec::new(),
        }
    }

    pub fn from_template(template: WaveTemplate) -> WaveFileBuilder<true> {
        Self::new()
            .sampling_rate(template.sampling_rate)
            .encoding(template.encoding)
            .trigger(template.trigger)
            .time_channel(template.time_channel)
            .channels(template.channels)
    }
}

impl<const RATE_SET: bool> WaveFileBuilder<RATE_SET> {
    /// Samples per second per channel.
    pub fn sampling_rate(self, hz: f64) -> WaveFileBuilder<true> {
        self.secs_per_tick(1.0 / hz)
    }

    pub fn secs_per_tick(self, secs: f64) -> WaveFileBuilder<true> {
        WaveFileBuilder {
            secs_per_tick: secs,
            start: self.start,
            trigger: self.trigger,
            time_channel: self.time_channel,
            encoding: self.encoding,
            channels: self.channels,
        }
    }

    /// When the recording started, accepts a [`CaptureTime`] or a
    /// [`chrono::NaiveDateTime`].
    #[must_use]
    pub fn start(mut self, start: impl Into<CaptureTime>) -> Self {
        self.start = start.into();
        self
    }

    #[must_use]
    pub fn trigger(mut self, trigger: f64) -> Self {
        self.trigger = trigger;
        self
    }

    #[must_use]
    pub fn time_channel(mut self, time_channel: i32) -> Self {
        self.time_channel = time_channel;
        self
    }

    /// Default is [`SampleEncoding::Short`].
    #[must_use]
    pub fn encoding(mut self, encoding: SampleEncoding) -> Self {
        self.encoding = encoding;
        self
    }

    #[must_use]
    pub fn channel(mut self, channel: ChannelInfo) -> Self {
        self.channels.push(channel);
        self
    }

    #[must_use]
    pub fn channels(mut self, channels: impl IntoIterator<Item = ChannelInfo>) -> Self {
        self.channels.extend(channels);
        self
    }
}

impl WaveFileBuilder<true> {
    /// The header `create` will write, without any samples.
    pub fn header(&self) -> WaveHeader {
        let mut header = WaveHeader {
            secs_per_tick: self.secs_per_tick,
            start: self.start,
            trigger: self.trigger,
            n_channels: i32::try_from(self.channels.len()).unwrap_or(i32::MAX),
            samples_per_channel: 0,
            time_channel: self.time_channel,
            ..WaveHeader::default()
        };
        header.set_encoding(self.encoding);
        header
    }

    /// Create the file, fails if it already exists. The returned file has
    /// its header written and is ready for samples.
    #[instrument(skip(self))]
    pub fn create(self, path: impl AsRef<Path> + fmt::Debug) -> Result<WaveFile, wave::Error> {
        let header = self.header();
        let mut file = WaveFile::open(path, Mode::Create)?;
        file.set_header(header);
        file.set_channels(self.channels);
        file.write_header()?;
        Ok(file)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    #[error("Could not parse template: {0}")]
    Parse(#[from] ron::error::SpannedError),
    #[error("Could not serialize template: {0}")]
    Serialize(#[from] ron::Error),
}

/// Layout of a wave file that can be stored as RON text and reused to
/// create files with the same channels.
///
/// ```ron
/// (
///     sampling_rate: 240.0,
///     encoding: Short,
///     channels: [
///         (label: "II", unit: "mV", scale: 0.01),
///         (label: "ABP", unit: "mmHg", scale: 0.1, offset: 100.0),
///     ],
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaveTemplate {
    pub sampling_rate: f64,
    #[serde(default = "default_encoding")]
    pub encoding: SampleEncoding,
    #[serde(default)]
    pub trigger: f64,
    #[serde(default)]
    pub time_channel: i32,
    pub channels: Vec<ChannelInfo>,
}

fn default_encoding() -> SampleEncoding {
    SampleEncoding::Short
}

impl WaveTemplate {
    pub fn from_ron(text: &str) -> Result<Self, TemplateError> {
        Ok(ron::from_str(text)?)
    }

    pub fn to_ron(&self) -> Result<String, TemplateError> {
        Ok(ron::ser::to_string_pretty(self, PrettyConfig::new())?)
    }

    /// Template describing an existing file.
    pub fn from_file(file: &WaveFile) -> Self {
        let header = file.header();
        Self {
            sampling_rate: header.sampling_rate().unwrap_or(0.0),
            encoding: header.encoding().unwrap_or(SampleEncoding::Short),
            trigger: header.trigger,
            time_channel: header.time_channel,
            channels: file.channels().to_vec(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const TEMPLATE: &str = r#"(
        sampling_rate: 240.0,
        channels: [
            (label: "II", unit: "mV", scale: 0.01),
            (label: "ABP", unit: "mmHg", scale: 0.1, offset: 100.0),
            (label: "SPO2"),
        ],
    )"#;

    #[test]
    fn template_fills_in_defaults() {
        let template = WaveTemplate::from_ron(TEMPLATE).unwrap();
        assert_eq!(template.encoding, SampleEncoding::Short);
        assert_eq!(template.channels.len(), 3);
        assert_eq!(template.channels[1].offset, 100.0);
        assert_eq!(template.channels[2].scale, 1.0);
        assert_eq!(template.channels[2].unit, "");
    }

    #[test]
    fn template_survives_ron() {
        let template = WaveTemplate::from_ron(TEMPLATE).unwrap();
        let text = template.to_ron().unwrap();
        assert_eq!(WaveTemplate::from_ron(&text).unwrap(), template);
    }

    #[test]
    fn builder_header_counts_channels() {
        let template = WaveTemplate::from_ron(TEMPLATE).unwrap();
        let header = WaveFileBuilder::from_template(template).header();
        assert_eq!(header.n_channels, 3);
        assert_eq!(header.data_format, 3);
        assert_eq!(header.sampling_rate(), Some(240.0));
    }

    #[test]
    fn malformed_template_is_an_error() {
        let err = WaveTemplate::from_ron("(channels: [])").unwrap_err();
        assert!(matches!(err, TemplateError::Parse(_)), "got: {err:?}");
    }
}
