use std::path::{Path, PathBuf};

use physio_bin::{ChannelInfo, EventFile, EventHeader, EventRecord, Mode, SampleEncoding, WaveFile};
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use rand_xoshiro::Xoshiro128StarStar;
use temp_dir::TempDir;

pub fn setup_tracing() {
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::{fmt, EnvFilter};

    let _ignore_err = color_eyre::install();
    let filter = EnvFilter::builder()
        .with_default_directive("physio_bin=debug".parse().unwrap())
        .from_env()
        .unwrap();

    let fmt = fmt::layer()
        .pretty()
        .with_line_number(true)
        .with_test_writer();

    let _ignore_err = tracing_subscriber::registry()
        .with(filter)
        .with(fmt)
        .with(tracing_error::ErrorLayer::default())
        .try_init();
}

/// Temporary directory with a path inside it, the directory is removed
/// when this is dropped.
pub struct TestPath {
    _dir: TempDir,
    pub path: PathBuf,
}

impl TestPath {
    pub fn new(name: &str) -> Self {
        let dir = TempDir::new().unwrap();
        let path = dir.child(name);
        Self { _dir: dir, path }
    }
}

impl std::fmt::Debug for TestPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.path.fmt(f)
    }
}

impl AsRef<Path> for TestPath {
    fn as_ref(&self) -> &Path {
        &self.path
    }
}

/// Sine wave in the short range with some gaussian noise on top.
pub fn noisy_sine(seed: u64, n: usize, period: usize, amplitude: f64) -> Vec<i16> {
    let mut rng = Xoshiro128StarStar::seed_from_u64(seed);
    let noise = Normal::new(0.0, amplitude / 20.0).unwrap();
    (0..n)
        .map(|i| {
            let phase = i as f64 / period as f64 * std::f64::consts::TAU;
            let value = amplitude * phase.sin() + noise.sample(&mut rng);
            value.clamp(-32_000.0, 32_000.0) as i16
        })
        .collect()
}

/// Random short samples that never hit one of the gap sentinels.
pub fn random_shorts(seed: u64, n: usize) -> Vec<i16> {
    let mut rng = Xoshiro128StarStar::seed_from_u64(seed);
    (0..n).map(|_| rng.random_range(-32_766..=32_767)).collect()
}

pub fn ecg_channels(n: usize) -> Vec<ChannelInfo> {
    (0..n)
        .map(|i| ChannelInfo::new(format!("lead {i}"), "mV").with_scaling(0.01, 0.0))
        .collect()
}

/// Creates a closed short encoded wave file holding `channels`.
pub fn write_wave_file(path: &Path, sampling_rate: f64, channels: &[Vec<i16>]) {
    let mut file = WaveFile::builder()
        .sampling_rate(sampling_rate)
        .encoding(SampleEncoding::Short)
        .channels(ecg_channels(channels.len()))
        .create(path)
        .unwrap();
    let written = file.write_channel_data(channels, 0, 0).unwrap();
    file.update_sample_count(written as i32, true).unwrap();
    file.close().unwrap();
}

pub fn heart_rate_header() -> EventHeader {
    EventHeader {
        label: "HR".to_owned(),
        uom: "Bpm".to_owned(),
        unit: "T1ICU".to_owned(),
        bed: "101".to_owned(),
        start: physio_bin::CaptureTime {
            year: 2019,
            month: 3,
            day: 31,
            hour: 8,
            minute: 15,
            second: 30.0,
        },
    }
}

/// Creates a closed event file holding `records`.
pub fn write_event_file(path: &Path, records: &[EventRecord]) {
    let mut file = EventFile::open(path, Mode::Create).unwrap();
    file.set_header(heart_rate_header());
    file.write_header().unwrap();
    for record in records {
        file.write_record(*record).unwrap();
    }
    file.close().unwrap();
}
