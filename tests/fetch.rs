use rangefold::fetch::{fetch_all, fetch_range, segment_path};
use rangefold::partition::ByteRange;
use rangefold::testing::{counting_values, value_table};
use rangefold::{Error, FetchConfig, MemorySource, RemainderPolicy};
use std::fs;
use std::path::Path;

fn leftover_segments(dir: &Path) -> anyhow::Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in fs::read_dir(dir)? {
        let name = entry?.file_name().to_string_lossy().into_owned();
        if name.contains(".csv-") {
            names.push(name);
        }
    }
    Ok(names)
}

#[test]
fn reassembles_exact_bytes_in_range_order() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let dest = tmp.path().join("out.csv");
    let text = value_table(&counting_values(250));
    let src = MemorySource::new("mem://table", text.clone());

    let cfg = FetchConfig::default().with_workers(7).with_chunk_size(5);
    let report = fetch_all(&src, &dest, &cfg)?;

    assert_eq!(fs::read_to_string(&dest)?, text);
    assert_eq!(report.path, dest);
    assert_eq!(report.total_size, text.len() as u64);
    assert_eq!(report.bytes_written, text.len() as u64);
    assert_eq!(report.segments.len(), 7);
    for (i, seg) in report.segments.iter().enumerate() {
        assert_eq!(seg.index, i);
        assert_eq!(seg.bytes_written, seg.range.len());
    }
    assert_eq!(src.probes(), 1);
    assert_eq!(src.range_requests(), 7);
    Ok(())
}

#[test]
fn counts_every_newline_across_segments() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let dest = tmp.path().join("out.csv");
    let text = value_table(&counting_values(99));
    let src = MemorySource::new("mem://table", text.clone());

    let report = fetch_all(&src, &dest, &FetchConfig::default().with_workers(4))?;

    // header line + 99 data lines
    assert_eq!(report.record_count, 100);
    let per_segment: u64 = report.segments.iter().map(|s| s.record_separators).sum();
    assert_eq!(per_segment, report.record_count);
    Ok(())
}

#[test]
fn segment_files_are_removed_after_reassembly() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let dest = tmp.path().join("out.csv");
    let src = MemorySource::new("mem://table", value_table(&counting_values(40)));

    fetch_all(&src, &dest, &FetchConfig::default().with_workers(5))?;

    assert!(leftover_segments(tmp.path())?.is_empty());
    for n in 1..=5 {
        assert!(!segment_path(&dest, n).exists());
    }
    Ok(())
}

#[test]
fn drop_policy_leaves_trailing_remainder_unfetched() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let dest = tmp.path().join("out.bin");
    let bytes: Vec<u8> = (0u8..=99).collect();
    let src = MemorySource::new("mem://bytes", bytes.clone());

    let cfg = FetchConfig::default()
        .with_workers(3)
        .with_remainder(RemainderPolicy::Drop);
    let report = fetch_all(&src, &dest, &cfg)?;

    // 100 / 3 = 33 per range; the last byte is never requested
    assert_eq!(report.bytes_written, 99);
    assert_eq!(fs::read(&dest)?, bytes[..99].to_vec());
    Ok(())
}

#[test]
fn extend_last_policy_fetches_whole_resource() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let dest = tmp.path().join("out.bin");
    let bytes: Vec<u8> = (0u8..=99).collect();
    let src = MemorySource::new("mem://bytes", bytes.clone());

    let cfg = FetchConfig::default()
        .with_workers(3)
        .with_remainder(RemainderPolicy::ExtendLast);
    let report = fetch_all(&src, &dest, &cfg)?;

    assert_eq!(report.segments.last().map(|s| s.range), Some(ByteRange::new(66, 99)));
    assert_eq!(fs::read(&dest)?, bytes);
    Ok(())
}

#[test]
fn more_workers_than_bytes() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let dest = tmp.path().join("out.txt");
    let src = MemorySource::new("mem://tiny", b"a\nb".to_vec());

    let report = fetch_all(&src, &dest, &FetchConfig::default().with_workers(16))?;
    assert_eq!(report.segments.len(), 3);
    assert_eq!(fs::read(&dest)?, b"a\nb");
    assert_eq!(report.record_count, 1);
    Ok(())
}

#[test]
fn empty_resource_is_rejected_before_any_download() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let dest = tmp.path().join("out.csv");
    let src = MemorySource::new("mem://empty", Vec::new());

    let err = fetch_all(&src, &dest, &FetchConfig::default().with_workers(4)).unwrap_err();
    assert!(matches!(err, Error::EmptyResource(ref loc) if loc == "mem://empty"));
    assert_eq!(src.range_requests(), 0);
    assert!(!dest.exists());
    Ok(())
}

#[test]
fn zero_workers_is_rejected() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let src = MemorySource::new("mem://x", b"abc".to_vec());
    let err = fetch_all(&src, &tmp.path().join("o"), &FetchConfig::default().with_workers(0))
        .unwrap_err();
    assert!(matches!(err, Error::InvalidWorkerCount));
    Ok(())
}

#[test]
fn failing_range_surfaces_and_cleans_up() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let dest = tmp.path().join("out.csv");
    // 4 workers over 40 bytes: ranges start at 0, 10, 20, 30
    let src = MemorySource::new("mem://flaky", vec![b'x'; 40]).failing_at(20);

    let err = fetch_all(&src, &dest, &FetchConfig::default().with_workers(4)).unwrap_err();
    assert!(matches!(err, Error::Status { status: 503, .. }));
    // every worker still ran to completion before the error came back
    assert_eq!(src.range_requests(), 4);
    assert!(leftover_segments(tmp.path())?.is_empty());
    assert!(!dest.exists());
    Ok(())
}

#[test]
fn source_ignoring_ranges_is_reported() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let dest = tmp.path().join("out.csv");
    let src = MemorySource::new("mem://noranges", vec![b'y'; 30]).ignoring_ranges();

    let err = fetch_all(&src, &dest, &FetchConfig::default().with_workers(3)).unwrap_err();
    assert!(matches!(err, Error::RangeNotHonored { .. }));

    // a single range covering the whole resource is still fine
    fetch_all(&src, &dest, &FetchConfig::default().with_workers(1))?;
    assert_eq!(fs::read(&dest)?.len(), 30);
    Ok(())
}

#[test]
fn fetch_range_writes_only_its_slice() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let dest = tmp.path().join("segment");
    let src = MemorySource::new("mem://lines", b"aa\nbb\ncc\ndd\n".to_vec());

    let report = fetch_range(&src, 2, ByteRange::new(3, 8), &dest, 2)?;
    assert_eq!(fs::read(&dest)?, b"bb\ncc\n");
    assert_eq!(report.index, 2);
    assert_eq!(report.bytes_written, 6);
    assert_eq!(report.record_separators, 2);
    Ok(())
}

#[test]
fn segment_names_suffix_the_destination() {
    let p = segment_path(Path::new("/tmp/abc.csv"), 3);
    assert_eq!(p, Path::new("/tmp/abc.csv-3"));
}
