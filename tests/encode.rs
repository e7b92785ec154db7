use anyhow::Result;
use rbsplit::testing::*;
use rbsplit::{EncodeConfig, OutputLayout, RemainderPolicy, read_column, run};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

fn config(partitions: u32, repetitions: u32) -> EncodeConfig {
    EncodeConfig {
        partitions,
        repetitions,
        staging_capacity: 3,
        write_manifest: false,
        ..Default::default()
    }
}

fn row_multiset(root: &Path, partitions: u32) -> Result<HashMap<Vec<String>, usize>> {
    let spec = sample_spec();
    let mut seen = HashMap::new();
    for p in 0..partitions {
        for row in partition_rows(root, &spec, p)? {
            *seen.entry(row).or_insert(0) += 1;
        }
    }
    Ok(seen)
}

#[test]
fn every_record_lands_k_times_and_partitions_balance() -> Result<()> {
    init_test_logging();
    let dir = tempfile::tempdir()?;
    let input = dir.path().join("flows.csv");
    let rows = sample_rows(100);
    write_sample_csv(&input, &rows)?;
    let out = dir.path().join("out");

    let summary = run(sample_spec(), &[input], &out, config(4, 2))?;

    assert_eq!(summary.records, 100);
    assert_balanced(&summary.assigned, 50);
    assert_eq!(summary.elements_per_column(), 200);
    assert_eq!(summary.columns.len(), 4);
    for column in &summary.columns {
        assert_eq!(column.records_per_partition, vec![50; 4], "{}", column.name);
    }

    let on_disk = assert_partitions_aligned(&out, &sample_spec(), 4)?;
    assert_eq!(on_disk, vec![50; 4]);

    let seen = row_multiset(&out, 4)?;
    assert_eq!(seen.len(), 100);
    for row in &rows {
        assert_eq!(seen.get(&row.stored_fields()), Some(&2), "{row:?}");
    }
    Ok(())
}

#[test]
fn ignored_columns_have_no_files() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let input = dir.path().join("flows.csv");
    write_sample_csv(&input, &sample_rows(10))?;
    let out = dir.path().join("out");
    run(sample_spec(), &[input], &out, config(2, 1))?;

    let layout = OutputLayout::new(&out);
    assert!(!layout.column_path(0, 0).exists());
    for c in 1..5 {
        assert!(layout.column_path(0, c).exists(), "column {c}");
        assert!(layout.column_path(1, c).exists(), "column {c}");
    }
    assert_eq!(layout.partitions_on_disk()?, vec![0, 1]);
    Ok(())
}

#[test]
fn headers_describe_payloads() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let input = dir.path().join("flows.csv");
    write_sample_csv(&input, &sample_rows(30))?;
    let out = dir.path().join("out");
    run(sample_spec(), &[input], &out, config(3, 1))?;

    let spec = sample_spec();
    let layout = OutputLayout::new(&out);
    for (c, path) in layout.column_files(&spec, 1) {
        let (header, values) = read_column(&path, &spec)?;
        let ty = &spec.column(c).unwrap().ty;
        assert_eq!(header.type_tag, ty.tag());
        assert_eq!(usize::from(header.element_width), ty.width());
        assert_eq!(header.records, 10);
        assert_eq!(values.len(), 10);
        let len = std::fs::metadata(&path)?.len();
        assert_eq!(len, 32 + header.records * u64::from(header.element_width));
    }
    Ok(())
}

#[test]
fn drop_policy_discards_the_trailing_remainder() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let input = dir.path().join("flows.csv");
    let rows = sample_rows(10);
    write_sample_csv(&input, &rows)?;
    let out = dir.path().join("out");

    let summary = run(sample_spec(), &[input], &out, config(3, 1))?;
    assert_eq!(summary.records, 10);
    assert_balanced(&summary.assigned, 3);

    // Assignments run out after nine records; the tenth is consumed unstaged.
    let seen = row_multiset(&out, 3)?;
    assert_eq!(seen.len(), 9);
    assert!(!seen.contains_key(&rows[9].stored_fields()));
    Ok(())
}

#[test]
fn distribute_policy_stages_every_assignment() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let input = dir.path().join("flows.csv");
    let rows = sample_rows(10);
    write_sample_csv(&input, &rows)?;
    let out = dir.path().join("out");

    let cfg = EncodeConfig {
        remainder: RemainderPolicy::Distribute,
        ..config(3, 1)
    };
    let summary = run(sample_spec(), &[input], &out, cfg)?;
    assert_eq!(summary.assigned, vec![4, 3, 3]);

    let seen = row_multiset(&out, 3)?;
    assert_eq!(seen.len(), 10);
    assert!(seen.values().all(|&n| n == 1));
    Ok(())
}

#[test]
fn runs_are_byte_identical() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let input = dir.path().join("flows.csv");
    write_sample_csv(&input, &sample_rows(257))?;

    let a = dir.path().join("a");
    let b = dir.path().join("b");
    run(sample_spec(), &[input.clone()], &a, config(5, 3))?;
    // A different staging capacity changes write sizes, never bytes.
    let cfg = EncodeConfig {
        staging_capacity: 4096,
        ..config(5, 3)
    };
    run(sample_spec(), &[input], &b, cfg)?;

    let spec = sample_spec();
    let (la, lb) = (OutputLayout::new(&a), OutputLayout::new(&b));
    for p in 0..5 {
        for ((_, fa), (_, fb)) in la.column_files(&spec, p).iter().zip(lb.column_files(&spec, p)) {
            assert_eq!(std::fs::read(fa)?, std::fs::read(&fb)?, "{}", fa.display());
        }
    }
    Ok(())
}

#[test]
fn seed_changes_the_split() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let input = dir.path().join("flows.csv");
    write_sample_csv(&input, &sample_rows(64))?;

    let a = dir.path().join("a");
    let b = dir.path().join("b");
    run(sample_spec(), &[input.clone()], &a, config(2, 1))?;
    let cfg = EncodeConfig {
        seed: 0xDEAD_BEEF,
        ..config(2, 1)
    };
    run(sample_spec(), &[input], &b, cfg)?;

    let path = |root: &PathBuf| OutputLayout::new(root).column_path(0, 1);
    assert_ne!(std::fs::read(path(&a))?, std::fs::read(path(&b))?);
    Ok(())
}

#[test]
fn inputs_are_encoded_in_order() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let rows = sample_rows(40);
    let first = dir.path().join("a.csv");
    let second = dir.path().join("b.csv");
    write_sample_csv(&first, &rows[..25])?;
    write_sample_csv(&second, &rows[25..])?;
    let combined = dir.path().join("all.csv");
    write_sample_csv(&combined, &rows)?;

    let split = dir.path().join("split");
    let whole = dir.path().join("whole");
    let summary = run(sample_spec(), &[first, second], &split, config(4, 1))?;
    assert_eq!(summary.records, 40);
    run(sample_spec(), &[combined], &whole, config(4, 1))?;

    // The sampler sees the same record sequence, so the layouts agree.
    for p in 0..4 {
        assert_eq!(
            partition_rows(&split, &sample_spec(), p)?,
            partition_rows(&whole, &sample_spec(), p)?
        );
    }
    Ok(())
}

#[test]
fn header_only_input_yields_empty_files() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let input = dir.path().join("empty.csv");
    write_sample_csv(&input, &[])?;
    let out = dir.path().join("out");

    let summary = run(sample_spec(), &[input], &out, config(2, 2))?;
    assert_eq!(summary.records, 0);
    assert_eq!(summary.assigned, vec![0, 0]);
    assert_eq!(assert_partitions_aligned(&out, &sample_spec(), 2)?, vec![0, 0]);
    Ok(())
}

#[test]
fn existing_output_root_is_refused() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let input = dir.path().join("flows.csv");
    write_sample_csv(&input, &sample_rows(5))?;
    let out = dir.path().join("out");
    std::fs::create_dir(&out)?;

    let err = run(sample_spec(), &[input], &out, config(2, 1)).unwrap_err();
    assert!(matches!(err, rbsplit::Error::Io { .. }), "{err}");
    Ok(())
}
