use std::collections::HashSet;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use flate2::read::MultiGzDecoder;
use proptest::prelude::*;

use marian_io::file_stream::TEMP_PREFIX;
use marian_io::{CompressionType, InputFileStream, OutputFileStream, TemporaryFile};

fn precreated(dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::File::create(&path).expect("pre-create target");
    path
}

fn write_bytes(path: &Path, bytes: &[u8]) {
    let mut out = OutputFileStream::try_open(path).expect("open output");
    assert_eq!(out.write_raw(bytes), bytes.len());
    out.finish().expect("finish output");
    assert!(out.is_valid());
}

fn read_all(path: &Path) -> Vec<u8> {
    let mut input = InputFileStream::try_open(path).expect("open input");
    let mut data = Vec::new();
    input.read_to_end(&mut data).expect("read input");
    data
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn plain_files_round_trip(bytes in proptest::collection::vec(any::<u8>(), 0..4096)) {
        let dir = tempfile::tempdir().unwrap();
        let path = precreated(dir.path(), "shard.bin");

        write_bytes(&path, &bytes);
        prop_assert_eq!(std::fs::read(&path).unwrap(), bytes.clone());
        prop_assert_eq!(read_all(&path), bytes);
    }

    #[test]
    fn gzip_files_round_trip(bytes in proptest::collection::vec(any::<u8>(), 0..4096)) {
        let dir = tempfile::tempdir().unwrap();
        let path = precreated(dir.path(), "shard.bin.gz");

        write_bytes(&path, &bytes);
        prop_assert_eq!(read_all(&path), bytes);
    }
}

#[test]
fn gzip_output_is_standard_gzip() {
    let dir = tempfile::tempdir().unwrap();
    let path = precreated(dir.path(), "train.en.gz");
    write_bytes(&path, b"the quick brown fox\n");

    let raw = std::fs::read(&path).unwrap();
    assert_eq!(&raw[..2], &[0x1f, 0x8b]);

    let mut text = String::new();
    MultiGzDecoder::new(&raw[..])
        .read_to_string(&mut text)
        .unwrap();
    assert_eq!(text, "the quick brown fox\n");
}

#[test]
fn streams_report_path_and_compression() {
    let dir = tempfile::tempdir().unwrap();
    let gz = precreated(dir.path(), "vocab.yml.gz");
    let plain = precreated(dir.path(), "vocab.yml");

    let out = OutputFileStream::open(&gz);
    assert_eq!(out.path(), Some(gz.as_path()));
    assert_eq!(out.compression(), CompressionType::Gzip);
    drop(out);

    let input = InputFileStream::open(&plain);
    assert_eq!(input.path(), Some(plain.as_path()));
    assert_eq!(input.compression(), CompressionType::None);
}

#[test]
fn formatted_values_round_trip_through_gzip() {
    let dir = tempfile::tempdir().unwrap();
    let path = precreated(dir.path(), "dims.txt.gz");

    {
        let mut out = OutputFileStream::open(&path);
        out.write_value(&32000)
            .write_value(" ")
            .write_value(&512)
            .write_value("\n")
            .write_value(&0.25f32)
            .write_value("\n");
    }

    let mut input = InputFileStream::open(&path);
    let (mut dim_voc, mut dim_emb, mut scale) = (0usize, 0usize, 0f32);
    input
        .extract(&mut dim_voc)
        .extract(&mut dim_emb)
        .extract(&mut scale);
    assert!(input.is_valid());
    assert_eq!((dim_voc, dim_emb, scale), (32000, 512, 0.25));

    assert_eq!(input.read_value::<String>(), None);
    assert!(!input.is_valid());
}

#[test]
fn empty_on_zero_length_file_consumes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let path = precreated(dir.path(), "empty.txt");

    let mut input = InputFileStream::open(&path);
    assert!(input.empty());
    assert!(input.empty());
    assert!(input.is_valid());

    let mut byte = [0u8; 1];
    input.read_raw(&mut byte);
    assert!(!input.is_valid());
}

#[test]
fn zero_length_gzip_file_reads_as_empty() {
    let dir = tempfile::tempdir().unwrap();
    let path = precreated(dir.path(), "touched.txt.gz");

    let mut input = InputFileStream::open(&path);
    assert_eq!(input.compression(), CompressionType::Gzip);
    assert!(input.empty());
    assert!(input.is_valid());

    let mut line = String::new();
    assert!(!input.read_line(&mut line));
    assert!(!input.is_valid());
}

#[test]
fn gzip_file_with_empty_payload_is_empty() {
    let dir = tempfile::tempdir().unwrap();
    let path = precreated(dir.path(), "nothing.gz");
    OutputFileStream::open(&path).finish().unwrap();
    assert!(std::fs::metadata(&path).unwrap().len() > 0);

    let mut input = InputFileStream::open(&path);
    assert!(input.empty());
    assert!(input.is_valid());
}

#[test]
fn empty_is_false_before_first_read_of_content() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("one-line.txt");
    std::fs::write(&path, "Hallo Welt\n").unwrap();

    let mut input = InputFileStream::open(&path);
    assert!(!input.empty());
    let mut line = String::new();
    assert!(input.read_line(&mut line));
    assert_eq!(line, "Hallo Welt");
    assert!(input.empty());
}

#[test]
fn missing_paths_are_rejected_without_creating_them() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("missing.gz");

    assert!(InputFileStream::try_open(&missing).is_err());
    assert!(OutputFileStream::try_open(&missing).is_err());
    assert!(!missing.exists());
}

#[test]
fn temp_file_round_trip_matches_example_scenario() {
    let temp = TemporaryFile::new("/tmp/", true);
    let name = temp.file_name().to_string_lossy().into_owned();
    assert!(name.starts_with(&format!("/tmp/{TEMP_PREFIX}")));
    assert!(!temp.file_name().exists());

    {
        let mut out = OutputFileStream::from_temp(&temp);
        assert_eq!(out.write_raw(b"hello"), 5);
        out.finish().unwrap();
    }

    let mut input = InputFileStream::from_temp(&temp);
    assert_eq!(input.path(), None);
    let mut buf = [0u8; 5];
    assert_eq!(input.read_raw(&mut buf), 5);
    assert!(input.is_valid());
    assert_eq!(&buf, b"hello");
}

#[test]
fn temp_stream_rewinds_before_reading() {
    let dir = tempfile::tempdir().unwrap();
    let mut temp = TemporaryFile::new(dir.path(), true);
    temp.write_all(b"1 2 3").unwrap();

    // The descriptor sits at the end of the data; the stream starts over
    let mut input = InputFileStream::from_temp(&temp);
    let values: Vec<u32> = std::iter::from_fn(|| input.read_value()).collect();
    assert_eq!(values, vec![1, 2, 3]);
}

#[test]
fn raw_elements_round_trip_through_temp_file() {
    let dir = tempfile::tempdir().unwrap();
    let temp = TemporaryFile::new(dir.path(), true);
    let weights = [0.5f32, -1.25, 3.0, f32::MAX];

    {
        let mut out = OutputFileStream::from_temp(&temp);
        assert_eq!(out.write_raw(&weights), 16);
    }

    let mut input = InputFileStream::from_temp(&temp);
    let mut loaded = [0f32; 4];
    assert_eq!(input.read_raw(&mut loaded), 16);
    assert_eq!(loaded, weights);
    assert!(input.empty());
}

#[test]
fn early_unlink_file_is_invisible_but_usable() {
    let dir = tempfile::tempdir().unwrap();
    let temp = TemporaryFile::new(dir.path(), true);

    assert!(!temp.file_name().exists());
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);

    {
        let mut out = OutputFileStream::from_temp(&temp);
        out.write_value("still here");
    }
    let mut input = InputFileStream::from_temp(&temp);
    let mut line = String::new();
    assert!(input.read_line(&mut line));
    assert_eq!(line, "still here");
}

#[test]
fn deferred_removal_happens_once_on_drop() {
    let dir = tempfile::tempdir().unwrap();
    let temp = TemporaryFile::new(dir.path(), false);
    let path = temp.file_name().to_path_buf();

    assert!(path.exists());
    assert_eq!(path.parent(), Some(dir.path()));
    drop(temp);
    assert!(!path.exists());
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[test]
fn concurrent_temp_files_get_distinct_names() {
    let dir = tempfile::tempdir().unwrap();
    let base = dir.path().to_path_buf();

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let base = base.clone();
            std::thread::spawn(move || {
                (0..16)
                    .map(|_| TemporaryFile::new(&base, false))
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    let temps: Vec<TemporaryFile> = handles
        .into_iter()
        .flat_map(|handle| handle.join().expect("creator thread panicked"))
        .collect();
    let names: HashSet<PathBuf> = temps
        .iter()
        .map(|temp| temp.file_name().to_path_buf())
        .collect();

    assert_eq!(names.len(), 8 * 16);
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 8 * 16);

    drop(temps);
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[test]
fn external_streams_are_borrowed_not_owned() {
    let mut sink: Vec<u8> = Vec::new();
    {
        let mut out = OutputFileStream::from_writer(&mut sink);
        out.write_value("borrowed ").write_value(&42);
    }
    assert_eq!(sink, b"borrowed 42");

    let mut source = std::io::Cursor::new(sink);
    {
        let mut input = InputFileStream::from_reader(&mut source);
        assert_eq!(input.read_value::<String>().as_deref(), Some("borrowed"));
    }
    // The caller's reader kept its position after the wrapper went away
    let mut rest = String::new();
    source.read_to_string(&mut rest).unwrap();
    assert_eq!(rest, " 42");
}
