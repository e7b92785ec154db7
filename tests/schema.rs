use anyhow::Result;
use rbsplit::codec::{ColumnType, tags};
use rbsplit::reader::ColumnValues;
use rbsplit::schema::ColumnSpec;
use rbsplit::testing::*;
use rbsplit::{EncodeConfig, Error, datasets, read_column, run};

const SCHEMA: &str = r#"{
  "vocabularies": {
    "verdict": { "tag": "0x5443494452455600", "labels": ["ok", "bad"] }
  },
  "columns": [
    { "name": "ts", "type": "ignore" },
    { "name": "port", "type": "uint16" },
    { "name": "rtt", "type": "double" },
    { "name": "verdict", "type": "verdict" }
  ]
}"#;

#[test]
fn schema_files_resolve_types_and_vocabularies() -> Result<()> {
    let spec = ColumnSpec::from_json_str(SCHEMA)?;
    assert_eq!(spec.len(), 4);
    assert_eq!(spec.stored_columns(), 3);
    assert_eq!(spec.header_line(), "ts,port,rtt,verdict");
    assert_eq!(spec.column(1).unwrap().ty, ColumnType::UInt16);
    match &spec.column(3).unwrap().ty {
        ColumnType::Label(set) => {
            assert_eq!(set.tag, 0x5443_4944_5245_5600);
            assert_eq!(set.labels, ["ok", "bad"]);
        }
        other => panic!("expected a label column, got {other}"),
    }
    Ok(())
}

#[test]
fn schema_file_drives_a_run() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let schema = dir.path().join("schema.json");
    std::fs::write(&schema, SCHEMA)?;
    let spec = ColumnSpec::from_json_file(&schema)?;

    let input = dir.path().join("probe.csv");
    write_csv(
        &input,
        spec.names(),
        [
            ["t0", "443", "0.125", "ok"],
            ["t1", "0x50", "1e-3", "bad"],
        ],
    )?;
    let out = dir.path().join("out");
    let cfg = EncodeConfig {
        write_manifest: false,
        ..Default::default()
    };
    run(spec.clone(), &[input], &out, cfg)?;

    let (header, port) = read_column(out.join("p00000000/c00000001.bin"), &spec)?;
    assert_eq!(header.type_tag, tags::UINT16);
    assert_eq!(port, ColumnValues::U16(vec![443, 80]));
    let (_, rtt) = read_column(out.join("p00000000/c00000002.bin"), &spec)?;
    assert_eq!(rtt, ColumnValues::F64(vec![0.125, 0.001]));
    let (header, verdict) = read_column(out.join("p00000000/c00000003.bin"), &spec)?;
    assert_eq!(header.type_tag, 0x5443_4944_5245_5600);
    assert_eq!(verdict.text(1).as_deref(), Some("bad"));
    Ok(())
}

#[test]
fn bad_schemas_are_rejected() {
    let unknown_type = r#"{ "columns": [ { "name": "a", "type": "uint128" } ] }"#;
    assert!(matches!(
        ColumnSpec::from_json_str(unknown_type),
        Err(Error::InvalidSchema(_))
    ));

    let builtin_tag = r#"{
        "vocabularies": { "v": { "tag": 0, "labels": ["x"] } },
        "columns": [ { "name": "a", "type": "v" } ]
    }"#;
    assert!(ColumnSpec::from_json_str(builtin_tag).is_err());

    let duplicate_label = r#"{
        "vocabularies": { "v": { "tag": 7, "labels": ["x", "x"] } },
        "columns": [ { "name": "a", "type": "v" } ]
    }"#;
    assert!(ColumnSpec::from_json_str(duplicate_label).is_err());

    assert!(ColumnSpec::from_json_str(r#"{ "columns": [] }"#).is_err());
}

#[test]
fn builtin_schema_survives_a_schema_file_round_trip() -> Result<()> {
    let spec = datasets::cicfm::spec()?;
    let json = serde_json::to_string(&spec.to_schema_file())?;
    assert_eq!(ColumnSpec::from_json_str(&json)?, spec);
    assert!(datasets::by_name("nope").is_err());
    Ok(())
}

#[test]
fn cicfm_captures_encode() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let spec = datasets::by_name("cicfm")?;
    let input = dir.path().join("DrDoS_DNS.csv");

    let labels = datasets::cicfm::LABELS;
    let records: Vec<Vec<String>> = (0..26)
        .map(|i| {
            spec.columns()
                .iter()
                .enumerate()
                .map(|(c, col)| match &col.ty {
                    ColumnType::Ignore => format!("skip-{i}-{c}"),
                    ColumnType::Label(_) => labels[i % labels.len()].to_string(),
                    // Sparse exports leave some cells empty.
                    _ if (i + c) % 11 == 0 => String::new(),
                    _ => format!("{}.5", i * 100 + c),
                })
                .collect()
        })
        .collect();
    write_csv(&input, spec.names(), &records)?;

    let out = dir.path().join("out");
    let cfg = EncodeConfig {
        partitions: 2,
        write_manifest: false,
        ..Default::default()
    };
    let summary = run(spec.clone(), &[input], &out, cfg)?;
    assert_balanced(&summary.assigned, 13);
    assert_eq!(summary.columns.len(), 82);

    let mut seen = Vec::new();
    for p in 0..2 {
        let (_, values) = read_column(out.join(format!("p{p:08X}/c00000057.bin")), &spec)?;
        assert_eq!(values.len(), 13);
        seen.extend((0..13).filter_map(|i| values.text(i)));
    }
    seen.sort();
    let mut expected: Vec<String> = (0..26).map(|i| labels[i % 13].to_string()).collect();
    expected.sort();
    assert_eq!(seen, expected);
    Ok(())
}
