use physio_bin::{event, wave, EventFile, Mode, OpenError, WaveFile};
use physio_bin_test_support::{setup_tracing, write_event_file, write_wave_file, TestPath};
use rstest::rstest;

#[rstest]
#[case(Mode::Read)]
#[case(Mode::ReadWrite)]
fn missing_file_is_not_found(#[case] mode: Mode) {
    setup_tracing();
    let test_path = TestPath::new("missing");

    let err = WaveFile::open(&test_path, mode).unwrap_err();
    assert!(
        matches!(err, wave::Error::Open(OpenError::NotFound { .. })),
        "got: {err:?}"
    );
    let err = EventFile::open(&test_path, mode).unwrap_err();
    assert!(
        matches!(err, event::Error::Open(OpenError::NotFound { .. })),
        "got: {err:?}"
    );
}

#[test]
fn create_refuses_existing_wave_file() {
    setup_tracing();
    let test_path = TestPath::new("existing.adibin");
    write_wave_file(&test_path.path, 100.0, &[vec![1, 2, 3]]);
    let before = std::fs::read(&test_path.path).unwrap();

    let err = WaveFile::open(&test_path, Mode::Create).unwrap_err();
    assert!(
        matches!(err, wave::Error::Open(OpenError::AlreadyExists(_))),
        "got: {err:?}"
    );
    assert_eq!(std::fs::read(&test_path.path).unwrap(), before);
}

#[test]
fn create_refuses_existing_event_file() {
    setup_tracing();
    let test_path = TestPath::new("existing.vital");
    write_event_file(&test_path.path, &[]);

    let err = EventFile::open(&test_path, Mode::Create).unwrap_err();
    assert!(
        matches!(err, event::Error::Open(OpenError::AlreadyExists(_))),
        "got: {err:?}"
    );
}
