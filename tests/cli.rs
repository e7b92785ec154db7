use anyhow::{Result, ensure};
use rbsplit::testing::*;
use std::path::Path;
use std::process::{Command, Output};

fn rbsplit(args: &[&str]) -> Result<Output> {
    Ok(Command::new(env!("CARGO_BIN_EXE_rbsplit"))
        .args(args)
        .env("RUST_LOG", "warn")
        .output()?)
}

fn write_schema(path: &Path) -> Result<()> {
    let doc = serde_json::to_string_pretty(&sample_spec().to_schema_file())?;
    std::fs::write(path, doc)?;
    Ok(())
}

fn s(path: &Path) -> &str {
    path.to_str().unwrap()
}

#[test]
fn encode_inspect_and_dump() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let schema = dir.path().join("schema.json");
    write_schema(&schema)?;
    let rows = sample_rows(20);
    write_sample_csv(&dir.path().join("a.csv"), &rows[..12])?;
    write_sample_csv(&dir.path().join("b.csv"), &rows[12..])?;
    let out = dir.path().join("out");
    let pattern = format!("{}/*.csv", dir.path().display());

    let encoded = rbsplit(&[
        "encode",
        "--partitions",
        "2",
        "--repetitions",
        "1",
        "--schema-file",
        s(&schema),
        "--out",
        s(&out),
        "--staging-capacity",
        "4",
        pattern.as_str(),
    ])?;
    ensure!(
        encoded.status.success(),
        "encode failed: {}",
        String::from_utf8_lossy(&encoded.stderr)
    );
    assert!(String::from_utf8(encoded.stdout)?.contains("encoded 20 records"));

    let inspected = rbsplit(&["inspect", s(&out), "--schema-file", s(&schema)])?;
    ensure!(inspected.status.success(), "inspect failed");
    let table = String::from_utf8(inspected.stdout)?;
    // Header row plus four stored columns in two partitions.
    assert_eq!(table.lines().count(), 1 + 2 * 4);
    assert!(table.lines().any(|l| l.starts_with("0\t4\tLabel\tattack\t")));

    let dumped = dir.path().join("p0.csv");
    let dump = rbsplit(&[
        "dump",
        s(&out),
        "--partition",
        "0",
        "--schema-file",
        s(&schema),
        "--output",
        s(&dumped),
    ])?;
    ensure!(dump.status.success(), "dump failed");
    let mut rdr = csv::Reader::from_path(&dumped)?;
    assert_eq!(
        rdr.headers()?.iter().collect::<Vec<_>>(),
        ["bytes", "delta", "score", "Label"]
    );
    let back: Vec<Vec<String>> = rdr
        .records()
        .map(|r| r.map(|r| r.iter().map(str::to_string).collect()))
        .collect::<Result<_, _>>()?;
    assert_eq!(back, partition_rows(&out, &sample_spec(), 0)?);
    assert_eq!(back.len(), 10);
    Ok(())
}

#[test]
fn failures_exit_non_zero() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let schema = dir.path().join("schema.json");
    write_schema(&schema)?;
    let input = dir.path().join("bad.csv");
    std::fs::write(&input, "id,bytes,delta,score,label\nx,1,2,3,Syn\n")?;
    let out = dir.path().join("out");

    let result = rbsplit(&[
        "encode",
        "-p",
        "2",
        "--schema-file",
        s(&schema),
        "--out",
        s(&out),
        s(&input),
    ])?;
    assert!(!result.status.success());
    assert!(String::from_utf8_lossy(&result.stderr).contains("header mismatch"));
    assert!(!out.exists());

    let missing = rbsplit(&["encode", "--out", s(&out), s(&input)])?;
    assert!(!missing.status.success());
    Ok(())
}

#[test]
fn prints_builtin_schema() -> Result<()> {
    let printed = rbsplit(&["schema", "--schema", "cicfm"])?;
    ensure!(printed.status.success(), "schema failed");
    let spec = rbsplit::schema::ColumnSpec::from_json_str(&String::from_utf8(printed.stdout)?)?;
    assert_eq!(spec, rbsplit::datasets::cicfm::spec()?);
    Ok(())
}
