use flate2::write::GzEncoder;
use flate2::Compression as GzLevel;
use logsieve::error::EngineError;
use logsieve::source::{Compression, LineSource};
use std::io::{Cursor, Write};
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

fn collect(src: LineSource) -> Vec<String> {
    src.map(|l| l.unwrap()).collect()
}

#[test]
fn splits_on_every_line_ending_convention() {
    let src = LineSource::from_reader(Cursor::new(b"a\r\nb\rc\n\nd".to_vec()), "mem");
    assert_eq!(collect(src), vec!["a", "b", "c", "", "d"]);
}

#[test]
fn trailing_newline_does_not_add_a_line() {
    let src = LineSource::from_reader(Cursor::new(b"one\ntwo\r\n".to_vec()), "mem");
    assert_eq!(collect(src), vec!["one", "two"]);
}

#[test]
fn strips_bom_and_replaces_invalid_utf8() {
    let mut bytes = "\u{feff}first\n".as_bytes().to_vec();
    bytes.extend_from_slice(&[b'a', 0xff, b'b', b'\n']);
    let src = LineSource::from_reader(Cursor::new(bytes), "mem");
    assert_eq!(collect(src), vec!["first".to_string(), "a\u{fffd}b".to_string()]);
}

#[test]
fn reads_plain_files() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("app.log");
    std::fs::write(&path, "alpha\nbeta\n").unwrap();
    let src = LineSource::open(&path).unwrap();
    assert_eq!(src.path(), path.as_path());
    assert_eq!(collect(src), vec!["alpha", "beta"]);
}

#[test]
fn reads_gzip_files_transparently() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("app.log.gz");
    let mut enc = GzEncoder::new(Vec::new(), GzLevel::default());
    for i in 0..1000 {
        writeln!(enc, "line {i}").unwrap();
    }
    std::fs::write(&path, enc.finish().unwrap()).unwrap();

    let lines = collect(LineSource::open(&path).unwrap());
    assert_eq!(lines.len(), 1000);
    assert_eq!(lines[0], "line 0");
    assert_eq!(lines[999], "line 999");
}

#[test]
fn unsupported_compression_fails_before_reading() {
    let err = LineSource::open("/nonexistent/archive.log.bz2").err().unwrap();
    match err {
        EngineError::UnsupportedCompression { kind, .. } => assert_eq!(kind, "bzip2"),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn compression_is_inferred_from_the_name() {
    assert_eq!(Compression::from_path(Path::new("a.log")), Compression::None);
    assert_eq!(Compression::from_path(Path::new("a.LOG.GZ")), Compression::Gzip);
    assert_eq!(Compression::from_path(Path::new("a.tar.gz")), Compression::Unsupported("tar+gzip"));
    assert_eq!(Compression::from_path(Path::new("a.tgz")), Compression::Unsupported("tar+gzip"));
    assert_eq!(Compression::from_path(Path::new("a.zst")), Compression::Unsupported("zstd"));
    assert_eq!(Compression::from_path(Path::new("a.xz")), Compression::Unsupported("xz"));
    assert_eq!(Compression::from_path(Path::new("noext")), Compression::None);
}

#[test]
fn missing_file_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = LineSource::open(dir.path().join("missing.log")).err().unwrap();
    assert!(matches!(err, EngineError::Io { .. }));
    assert!(err.to_string().contains("missing.log"));
}

#[test]
fn raised_cancel_flag_stops_iteration() {
    let flag = Arc::new(AtomicBool::new(true));
    let mut src = LineSource::from_reader(Cursor::new(b"a\nb\n".to_vec()), "mem").with_cancel_flag(flag);
    assert!(matches!(src.next(), Some(Err(EngineError::Cancelled))));
    assert!(src.next().is_none());
}

#[test]
fn long_lines_cross_buffer_boundaries() {
    let long = "x".repeat(200_000);
    let data = format!("{long}\r\nshort");
    let src = LineSource::from_reader(std::io::BufReader::with_capacity(64, Cursor::new(data.into_bytes())), "mem");
    let lines = collect(src);
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0].len(), 200_000);
    assert_eq!(lines[1], "short");
}
