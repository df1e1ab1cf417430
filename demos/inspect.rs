use std::env::args;
use std::path::PathBuf;

use color_eyre::eyre::{Context, Result};
use physio_bin::{EventFile, Mode, ReadOptions, Span, WaveFile, WaveTemplate};

fn main() -> Result<()> {
    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();
    let path = parse_args();

    if path.extension().is_some_and(|ext| ext == "vital") {
        inspect_events(path)
    } else {
        inspect_wave(path)
    }
}

fn inspect_wave(path: PathBuf) -> Result<()> {
    let mut file = WaveFile::open(&path, Mode::Read).wrap_err("Could not open wave file")?;
    file.read_header().wrap_err("Could not read header")?;

    let header = file.header();
    println!("start:    {:?}", header.start_time());
    println!("end:      {:?}", header.end_time());
    println!("rate:     {:?} Hz", header.sampling_rate());
    println!("samples:  {}", header.samples_per_channel);
    println!("template:\n{}", WaveTemplate::from_file(&file).to_ron()?);

    let data = file
        .read_channel_data(Span::Samples(0), Span::Samples(10), ReadOptions::default())
        .wrap_err("Could not read samples")?;
    for (label, channel) in file.channel_labels().iter().zip(data) {
        println!("{label}: {:?}", channel.to_f64());
    }
    Ok(())
}

fn inspect_events(path: PathBuf) -> Result<()> {
    let mut file = EventFile::open(&path, Mode::Read).wrap_err("Could not open event file")?;
    file.read_header().wrap_err("Could not read header")?;

    let header = file.header();
    println!(
        "{} [{}] from {} bed {}, starting {:?}",
        header.label,
        header.uom,
        header.unit,
        header.bed,
        header.start.to_datetime()
    );
    println!("records: {}", file.record_count());
    for record in file.read_records(10).wrap_err("Could not read records")? {
        println!(
            "{:>10.2}s {:>8.2} ({} - {})",
            record.offset, record.value, record.low, record.high
        );
    }
    Ok(())
}

fn parse_args() -> PathBuf {
    args()
        .nth(1)
        .expect("should get one argument: the path of a wave or event file")
        .into()
}
