use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use garckit::crypto::text::TextKeys;
use garckit::formats::garc::GarcReader;
use garckit::schema::{Record, RecordSchema, presets};
use serde::Serialize;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "garc", about = "Inspect and export GARC archives as JSON")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show section offsets and record count
    Info { input: PathBuf },
    /// List record offsets and sizes
    Records { input: PathBuf },
    /// List the sub-record sizes of one mini-archive record
    Mini { input: PathBuf, record: usize },
    /// Decrypt one text table
    Text {
        input: PathBuf,
        record: usize,
        /// Key of the first line (hex)
        #[arg(long, value_parser = parse_hex_u16)]
        key_base: Option<u16>,
        /// Per-line key increment (hex)
        #[arg(long, value_parser = parse_hex_u16)]
        key_advance: Option<u16>,
    },
    /// Decode fixed-size records with a built-in layout
    Decode {
        input: PathBuf,
        #[arg(short, long, value_enum)]
        schema: SchemaKind,
        /// Decode the sub-records of this mini-archive record instead of
        /// the top-level records
        #[arg(long)]
        mini: Option<usize>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum SchemaKind {
    Personal,
    Move,
}

#[derive(Serialize)]
struct ArchiveInfo {
    fato_offset: u64,
    fatb_offset: u64,
    fimb_offset: u64,
    data_offset: u64,
    records: usize,
}

#[derive(Serialize)]
struct RecordInfo {
    index: usize,
    start: u32,
    size: u16,
}

/// A decoded record tagged with its record (or sub-record) id.
#[derive(Debug, Serialize)]
struct DecodedRecord {
    index: usize,
    record: Record,
}

fn parse_hex_u16(s: &str) -> Result<u16, String> {
    let digits = s.trim_start_matches("0x").trim_start_matches("0X");
    u16::from_str_radix(digits, 16).map_err(|e| format!("invalid hex key '{s}': {e}"))
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Info { input } => {
            let reader = GarcReader::open(&input)?;
            let garc = &reader.garc;
            print_json(&ArchiveInfo {
                fato_offset: garc.fato_offset,
                fatb_offset: garc.fatb_offset,
                fimb_offset: garc.fimb_offset,
                data_offset: garc.data_offset(),
                records: garc.len(),
            })
        }
        Commands::Records { input } => {
            let reader = GarcReader::open(&input)?;
            let records: Vec<RecordInfo> = reader
                .garc
                .records
                .iter()
                .enumerate()
                .map(|(index, d)| RecordInfo {
                    index,
                    start: d.start,
                    size: d.size,
                })
                .collect();
            print_json(&records)
        }
        Commands::Mini { input, record } => {
            let mut reader = GarcReader::open(&input)?;
            let sizes = reader
                .sub_records(record)?
                .map(|sub| sub.map(|bytes| bytes.len()))
                .collect::<garckit::Result<Vec<_>>>()?;
            print_json(&sizes)
        }
        Commands::Text {
            input,
            record,
            key_base,
            key_advance,
        } => {
            let defaults = TextKeys::default();
            let keys = TextKeys {
                base: key_base.unwrap_or(defaults.base),
                advance: key_advance.unwrap_or(defaults.advance),
            };
            let mut reader = GarcReader::open(&input)?;
            let lines = reader
                .strings_with(record, keys)?
                .collect::<garckit::Result<Vec<_>>>()?;
            print_json(&lines)
        }
        Commands::Decode {
            input,
            schema,
            mini,
        } => {
            let schema = match schema {
                SchemaKind::Personal => presets::personal()?,
                SchemaKind::Move => presets::moves()?,
            };
            let mut reader = GarcReader::open(&input)?;
            let raws = match mini {
                Some(index) => reader.sub_records(index)?.collect::<garckit::Result<Vec<_>>>()?,
                None => reader.records().collect::<garckit::Result<Vec<_>>>()?,
            };
            print_json(&decode_all(&schema, &raws)?)
        }
    }
}

/// Decode every record of the schema's size, skipping the rest. Each
/// decoded record keeps its index among `raws`.
fn decode_all(schema: &RecordSchema, raws: &[Vec<u8>]) -> garckit::Result<Vec<DecodedRecord>> {
    let mut out = Vec::with_capacity(raws.len());
    for (index, raw) in raws.iter().enumerate() {
        if !schema.matches(raw) {
            warn!(
                index,
                size = raw.len(),
                expected = schema.size(),
                "skipping record of unexpected size"
            );
            continue;
        }
        out.push(DecodedRecord {
            index,
            record: schema.decode(raw)?,
        });
    }
    info!(decoded = out.len(), total = raws.len(), "decoded records");
    Ok(out)
}

fn print_json<T: Serialize>(value: &T) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
