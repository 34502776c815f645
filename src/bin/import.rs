//! recordkv Import Binary
//!
//! Bulk-loads text log files into one partition and commits.

use std::io;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use clap::Parser;
use recordkv::ingest::{open_input, IngestEvent};
use recordkv::{
    Config, Dbms, IngestConfig, IngestPipeline, ParseDescriptor, PartitionSpec, Schema,
};
use tracing_subscriber::{fmt, EnvFilter};

/// recordkv Import
#[derive(Parser, Debug)]
#[command(name = "recordkv-import")]
#[command(about = "Bulk-load text logs into a recordkv partition")]
#[command(version)]
struct Args {
    /// Data directory
    #[arg(short, long, default_value = "./recordkv_data")]
    data_dir: PathBuf,

    /// Partition to load into
    #[arg(short, long)]
    partition: String,

    /// Record schema, e.g. "key:ts:timestamp,key:uid:uint64,val:bytes:uint32"
    #[arg(short, long)]
    schema: String,

    /// Token-to-field mapping, e.g. "ts,uid,-,bytes" ('-' skips, 'name:fixN' scales)
    #[arg(short, long)]
    fields: String,

    /// Token separator (a space splits on any whitespace)
    #[arg(long, default_value = " ")]
    separator: char,

    /// Records per batch
    #[arg(short, long, default_value = "65536")]
    batch_size: usize,

    /// Caller state stored with the commit
    #[arg(short, long, default_value = "0")]
    external_state: u64,

    /// Print every line that fails to parse
    #[arg(long)]
    report_failures: bool,

    /// Input files ('-' or none for stdin); .gz and .xz are decompressed
    files: Vec<PathBuf>,
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,recordkv=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();

    tracing::info!("recordkv import v{}", recordkv::VERSION);
    tracing::info!("Data directory: {}", args.data_dir.display());

    if let Err(e) = run(args) {
        tracing::error!("Import failed: {}", e);
        process::exit(1);
    }
}

fn run(args: Args) -> recordkv::Result<()> {
    if !args.separator.is_ascii() {
        return Err(recordkv::RecordKvError::Config(format!(
            "separator must be a single ASCII character, got '{}'",
            args.separator
        )));
    }

    let schema = Schema::parse_spec(&args.schema)?;
    let descriptor = ParseDescriptor::parse_spec(&schema, &args.fields)?;

    let config = Config::builder().data_dir(&args.data_dir).build();
    let mut dbms: Dbms = Dbms::open(config, vec![PartitionSpec::new(&args.partition, &schema)])?;
    let partition = Arc::clone(dbms.partition(&args.partition)?);

    let ingest = IngestConfig::builder()
        .batch_capacity(args.batch_size)
        .separator(args.separator as u8)
        .report_failures(args.report_failures)
        .build();

    let mut pipeline = IngestPipeline::new(partition, &schema, descriptor, ingest);
    pipeline.start()?;

    let on_event = |event: IngestEvent<'_>| match event {
        IngestEvent::Progress {
            lines_read,
            lines_ok,
        } => tracing::info!(lines_read, lines_ok, "Progress"),
        IngestEvent::Failure { error, line } => tracing::warn!(
            error = %error,
            line = %String::from_utf8_lossy(line),
            "Line rejected"
        ),
    };

    if args.files.is_empty() {
        pipeline.import_with(io::stdin().lock(), on_event)?;
    } else {
        for path in &args.files {
            let (read, ok) = if path.as_os_str() == "-" {
                pipeline.import_with(io::stdin().lock(), on_event)?
            } else {
                pipeline.import_with(open_input(path)?, on_event)?
            };
            tracing::info!(file = %path.display(), lines_read = read, lines_ok = ok, "Imported file");
        }
    }

    let report = pipeline.stop()?;
    let checkpoint = dbms.commit(args.external_state)?;
    tracing::info!(
        lines_read = report.lines_read,
        lines_ok = report.lines_ok,
        records_stored = report.records_stored,
        checkpoint = %checkpoint.encode(),
        "Import committed"
    );

    dbms.close()
}
