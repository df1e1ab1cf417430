use physio_bin::event::Error;
use physio_bin::{EventFile, EventRecord, Mode, PreconditionError};
use physio_bin_test_support::{heart_rate_header, setup_tracing, write_event_file, TestPath};
use pretty_assertions::assert_eq;

fn heart_rate_records() -> Vec<EventRecord> {
    let values = [80.0, 90.0, 85.0, 130.0, 135.0];
    let offsets = [0.0, 60.0, 12.0, 180.0, 360.0];
    let highs = [1000.0, 1000.0, 1000.0, 150.0, 150.0];
    values
        .into_iter()
        .zip(offsets)
        .zip(highs)
        .map(|((value, offset), high)| EventRecord::new(value, offset, 0.0, high))
        .collect()
}

fn open_read(path: &TestPath) -> EventFile {
    let mut file = EventFile::open(path, Mode::Read).unwrap();
    file.read_header().unwrap();
    file
}

#[test]
fn records_round_trip() {
    setup_tracing();
    let test_path = TestPath::new("records_round_trip.vital");
    let records = heart_rate_records();
    write_event_file(&test_path.path, &records);

    let len = std::fs::metadata(&test_path.path).unwrap().len();
    assert_eq!(len, 64 + 5 * 32);

    let mut file = open_read(&test_path);
    assert_eq!(file.header(), &heart_rate_header());
    assert_eq!(file.record_count(), 5);
    let read: Vec<_> = (0..5).map(|_| file.read_record().unwrap()).collect();
    assert_eq!(read, records);
}

#[test]
fn header_start_is_a_datetime() {
    let start = heart_rate_header().start.to_datetime().unwrap();
    assert_eq!(start.to_string(), "2019-03-31 08:15:30");
}

#[test]
fn reading_past_the_end_fails() {
    setup_tracing();
    let test_path = TestPath::new("reading_past_the_end_fails.vital");
    write_event_file(&test_path.path, &heart_rate_records()[..1]);

    let mut file = open_read(&test_path);
    file.read_record().unwrap();
    let err = file.read_record().unwrap_err();
    assert!(matches!(err, Error::ReadRecord(_)), "got: {err:?}");
}

#[test]
fn bulk_read_stops_at_end_of_file() {
    setup_tracing();
    let test_path = TestPath::new("bulk_read_stops_at_end_of_file.vital");
    let records = heart_rate_records();
    write_event_file(&test_path.path, &records);

    let mut file = open_read(&test_path);
    let first = file.read_records(2).unwrap();
    assert_eq!(first, &records[..2]);
    let rest = file.read_records(10).unwrap();
    assert_eq!(rest, &records[2..]);
    assert!(file.read_records(1).unwrap().is_empty());
}

#[test]
fn seek_to_record() {
    setup_tracing();
    let test_path = TestPath::new("seek_to_record.vital");
    let records = heart_rate_records();
    write_event_file(&test_path.path, &records);

    let mut file = open_read(&test_path);
    file.seek_record(3).unwrap();
    assert_eq!(file.read_record().unwrap(), records[3]);
    file.seek_record(0).unwrap();
    assert_eq!(file.read_record().unwrap(), records[0]);
}

#[test]
fn append_to_existing_file() {
    setup_tracing();
    let test_path = TestPath::new("append_to_existing_file.vital");
    let records = heart_rate_records();
    write_event_file(&test_path.path, &records[..3]);

    let mut file = EventFile::open(&test_path, Mode::ReadWrite).unwrap();
    assert_eq!(file.record_count(), 3);
    file.read_header().unwrap();
    for record in &records[3..] {
        file.write_record(*record).unwrap();
    }
    assert_eq!(file.record_count(), 5);
    file.close().unwrap();

    let mut file = open_read(&test_path);
    assert_eq!(file.read_records(5).unwrap(), records);
}

#[test]
fn partial_record_is_not_counted() {
    setup_tracing();
    let test_path = TestPath::new("partial_record_is_not_counted.vital");
    write_event_file(&test_path.path, &heart_rate_records()[..2]);

    let mut bytes = std::fs::read(&test_path.path).unwrap();
    bytes.extend([0u8; 12]);
    std::fs::write(&test_path.path, bytes).unwrap();

    let mut file = open_read(&test_path);
    assert_eq!(file.record_count(), 2);
    file.seek_record(0).unwrap();
    assert_eq!(file.read_records(3).unwrap().len(), 2);
}

#[test]
fn long_header_text_is_truncated() {
    setup_tracing();
    let test_path = TestPath::new("long_header_text_is_truncated.vital");

    let mut header = heart_rate_header();
    header.label = "NBP-MEAN-NONINVASIVE".to_owned();
    header.bed = "10234".to_owned();
    let mut file = EventFile::open(&test_path, Mode::Create).unwrap();
    file.set_header(header);
    file.write_header().unwrap();
    file.close().unwrap();

    let file = open_read(&test_path);
    assert_eq!(file.header().label, "NBP-MEAN-NONINVA");
    assert_eq!(file.header().bed, "1023");
    assert_eq!(file.record_count(), 0);
}

#[test]
fn records_need_known_header() {
    setup_tracing();
    let test_path = TestPath::new("records_need_known_header.vital");

    let mut file = EventFile::open(&test_path, Mode::Create).unwrap();
    let err = file
        .write_record(EventRecord::new(1.0, 0.0, 0.0, 0.0))
        .unwrap_err();
    assert!(
        matches!(
            err,
            Error::Precondition(PreconditionError::HeaderUnknown { .. })
        ),
        "got: {err:?}"
    );

    file.set_header(heart_rate_header());
    file.write_header().unwrap();
    file.close().unwrap();
    let err = file.read_record().unwrap_err();
    assert!(
        matches!(err, Error::Precondition(PreconditionError::Closed { .. })),
        "got: {err:?}"
    );
}
