//! `rbsplit` - encode CSV captures into partitioned raw binary columns.

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use rbsplit::schema::ColumnSpec;
use rbsplit::{
    ColumnReader, EncodeConfig, OutputLayout, RemainderPolicy, datasets, io, preflight, read_column,
};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "rbsplit", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate and encode CSV inputs into a new partitioned layout
    Encode(EncodeArgs),
    /// Print the header of every column file under a layout
    Inspect(InspectArgs),
    /// Write one partition back out as CSV
    Dump(DumpArgs),
    /// Print a schema as a JSON schema file
    Schema(SchemaArgs),
    /// Re-hash a layout against its manifest
    #[cfg(feature = "manifest")]
    Verify(VerifyArgs),
}

#[derive(Args)]
struct SchemaSource {
    /// Built-in schema name
    #[arg(long, conflicts_with = "schema_file")]
    schema: Option<String>,

    /// JSON schema file
    #[arg(long)]
    schema_file: Option<PathBuf>,
}

impl SchemaSource {
    fn load(&self) -> Result<Option<ColumnSpec>> {
        match (&self.schema, &self.schema_file) {
            (Some(name), _) => Ok(Some(datasets::by_name(name)?)),
            (None, Some(path)) => Ok(Some(
                ColumnSpec::from_json_file(path)
                    .with_context(|| format!("loading schema {}", path.display()))?,
            )),
            (None, None) => Ok(None),
        }
    }

    fn require(&self) -> Result<ColumnSpec> {
        match self.load()? {
            Some(spec) => Ok(spec),
            None => bail!("a schema is required: pass --schema NAME or --schema-file FILE"),
        }
    }
}

#[derive(Args)]
struct EncodeArgs {
    /// Number of partitions
    #[arg(short, long)]
    partitions: Option<u32>,

    /// Partitions each record is assigned to
    #[arg(short, long)]
    repetitions: Option<u32>,

    /// Output directory (must not exist)
    #[arg(short, long)]
    out: PathBuf,

    #[command(flatten)]
    schema: SchemaSource,

    /// JSON run configuration; flags override its fields
    #[arg(long)]
    config: Option<PathBuf>,

    /// Elements staged per column file before a flush
    #[arg(long)]
    staging_capacity: Option<usize>,

    /// What to do with slots that do not split evenly
    #[arg(long)]
    remainder: Option<RemainderPolicy>,

    /// Generator seed
    #[arg(long)]
    seed: Option<u64>,

    /// Threads used for pre-flight counting
    #[arg(long)]
    threads: Option<usize>,

    /// Do not write manifest.json
    #[arg(long)]
    no_manifest: bool,

    /// CSV inputs (paths or glob patterns), encoded in the given order
    #[arg(required = true)]
    inputs: Vec<String>,
}

#[derive(Args)]
struct InspectArgs {
    /// Layout root
    root: PathBuf,

    /// Resolves label vocabularies
    #[command(flatten)]
    schema: SchemaSource,
}

#[derive(Args)]
struct DumpArgs {
    /// Layout root
    root: PathBuf,

    /// Partition index
    #[arg(long)]
    partition: u32,

    #[command(flatten)]
    schema: SchemaSource,

    /// Output CSV (compressed by extension); stdout when omitted
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Args)]
struct SchemaArgs {
    #[command(flatten)]
    schema: SchemaSource,
}

#[cfg(feature = "manifest")]
#[derive(Args)]
struct VerifyArgs {
    /// Layout root
    root: PathBuf,
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("rbsplit=info")),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Encode(args) => encode(args),
        Commands::Inspect(args) => inspect(&args),
        Commands::Dump(args) => dump(&args),
        Commands::Schema(args) => schema(&args),
        #[cfg(feature = "manifest")]
        Commands::Verify(args) => verify(&args),
    }
}

fn encode(args: EncodeArgs) -> Result<()> {
    let spec = args.schema.require()?;
    let mut config = match &args.config {
        Some(path) => EncodeConfig::from_json_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => EncodeConfig::default(),
    };
    if let Some(p) = args.partitions {
        config.partitions = p;
    }
    if let Some(k) = args.repetitions {
        config.repetitions = k;
    }
    if let Some(n) = args.staging_capacity {
        config.staging_capacity = n;
    }
    if let Some(policy) = args.remainder {
        config.remainder = policy;
    }
    if let Some(seed) = args.seed {
        config.seed = seed;
    }
    if args.no_manifest {
        config.write_manifest = false;
    }
    config.validate()?;

    let threads = args.threads.unwrap_or_else(num_cpus::get).max(1);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .context("configuring the pre-flight thread pool")?;

    let inputs = io::resolve_inputs(&args.inputs)?;
    info!(inputs = inputs.len(), threads, "starting pre-flight");
    let counted = preflight(&spec, &inputs, config.count_chunk_bytes)?;

    let mut session =
        rbsplit::EncodingSession::create(spec, &args.out, config, counted.total_records)?;
    for input in &inputs {
        session.encode_file(input)?;
    }
    let summary = session.finish()?;

    println!(
        "encoded {} records into {} partitions under {}",
        summary.records,
        summary.partitions,
        summary.root.display()
    );
    for (p, n) in summary.assigned.iter().enumerate() {
        println!("  p{p:08X}: {n} records");
    }
    Ok(())
}

/// Column files of one partition directory, sorted by column index.
fn column_files(dir: &Path) -> Result<Vec<(usize, PathBuf)>> {
    let mut found = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("reading {}", dir.display()))? {
        let path = entry?.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if let Some(hex) = name.strip_prefix('c').and_then(|n| n.strip_suffix(".bin"))
            && hex.len() == 8
            && let Ok(c) = usize::from_str_radix(hex, 16)
        {
            found.push((c, path));
        }
    }
    found.sort();
    Ok(found)
}

fn inspect(args: &InspectArgs) -> Result<()> {
    let spec = args.schema.load()?;
    let layout = OutputLayout::new(&args.root);
    let partitions = layout.partitions_on_disk()?;
    if partitions.is_empty() {
        bail!("no partition directories under {}", args.root.display());
    }

    let mut out = std::io::stdout().lock();
    writeln!(out, "partition\tcolumn\tname\ttype\ttag\twidth\trecords")?;
    for p in partitions {
        for (c, path) in column_files(&layout.partition_dir(p))? {
            let reader = ColumnReader::open(&path)?;
            let header = *reader.header();
            let ty = reader
                .column_type(spec.as_ref())
                .map_or_else(|_| "?".to_string(), |t| t.to_string());
            let name = spec
                .as_ref()
                .and_then(|s| s.column(c))
                .map_or("?", |col| col.name.as_str());
            writeln!(
                out,
                "{p}\t{c}\t{name}\t{ty}\t{:#018x}\t{}\t{}",
                header.type_tag, header.element_width, header.records
            )?;
        }
    }
    Ok(())
}

fn dump(args: &DumpArgs) -> Result<()> {
    let spec = args.schema.require()?;
    let layout = OutputLayout::new(&args.root);

    let mut columns = Vec::new();
    for (c, path) in layout.column_files(&spec, args.partition) {
        let (_, values) = read_column(&path, &spec)?;
        columns.push((c, values));
    }
    let records = columns.first().map_or(0, |(_, v)| v.len());
    if let Some((c, v)) = columns.iter().find(|(_, v)| v.len() != records) {
        bail!(
            "partition {} is inconsistent: column {c} holds {} records, expected {records}",
            args.partition,
            v.len()
        );
    }

    let sink: Box<dyn Write> = match &args.output {
        Some(path) => {
            let f = File::create(path).with_context(|| format!("creating {}", path.display()))?;
            io::auto_detect_writer(f, path)?
        }
        None => Box::new(std::io::stdout()),
    };
    let mut wtr = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(sink);

    wtr.write_record(
        columns
            .iter()
            .filter_map(|(c, _)| spec.column(*c).map(|col| col.name.as_str())),
    )?;
    for i in 0..records {
        wtr.write_record(columns.iter().map(|(_, v)| v.text(i).unwrap_or_default()))?;
    }
    wtr.flush()?;
    info!(partition = args.partition, records, "dumped partition");
    Ok(())
}

fn schema(args: &SchemaArgs) -> Result<()> {
    let spec = args.schema.require()?;
    let doc = serde_json::to_string_pretty(&spec.to_schema_file())?;
    println!("{doc}");
    Ok(())
}

#[cfg(feature = "manifest")]
fn verify(args: &VerifyArgs) -> Result<()> {
    let layout = OutputLayout::new(&args.root);
    let manifest = rbsplit::RunManifest::load(&layout.manifest_path())?;
    let changed = manifest.verify(layout.root())?;
    if !changed.is_empty() {
        for path in &changed {
            eprintln!("digest mismatch: {}", path.display());
        }
        bail!("{} of {} column files changed", changed.len(), manifest.files.len());
    }
    println!("{} column files verified", manifest.files.len());
    Ok(())
}
