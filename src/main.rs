use std::path::PathBuf;
use std::str::FromStr;

use anyhow::Result;
use clap::{Parser, Subcommand};
use log::LevelFilter;

use bardemux::count::{print_summary as print_count_summary, run_count, CountConfig};
use bardemux::mutationhash::EditAlphabet;
use bardemux::orchestrator::{print_summary as print_demux_summary, run_demux, RunConfig};

const DEFAULT_CB_REGEX: &str = r"(.*):(?P<CB>[ATGCN]{11})";
const DEFAULT_HTO_REGEX: &str = r"(.*)(?P<HTO>[ATGCN]{15})";

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Barcode-tolerant FASTQ demultiplexer and hashtag-oligo counter"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Demultiplex a FASTQ stream by cell barcode into per-sample files.
    Demux(DemuxArgs),
    /// Count matches against a barcode whitelist without writing output files.
    Count(CountArgs),
}

#[derive(Parser, Debug)]
struct DemuxArgs {
    /// Input FASTQ file, optionally gzip-compressed (.gz).
    #[arg(long)]
    fastq: PathBuf,

    /// Tab- (or --delimiter-) separated sample sheet with sample and barcode columns.
    #[arg(long)]
    samplesheet: PathBuf,

    /// Header regex with a named `CB` capture group.
    #[arg(long, default_value = DEFAULT_CB_REGEX)]
    barcode_regex: String,

    /// Maximum Hamming distance tolerated between an observed and a reference barcode.
    #[arg(short = 'k', long = "edit-distance", default_value_t = 1)]
    edit_distance: usize,

    /// Alphabet substitutions are drawn from when enumerating mutations.
    #[arg(long, default_value = "ACGT")]
    edit_alphabet: String,

    /// Chunker read/carry buffer size in bytes; must exceed the longest record.
    #[arg(long, default_value_t = 4_000_000)]
    buffer_size: usize,

    /// Number of classification worker threads.
    #[arg(long, default_value_t = num_cpus::get())]
    worker_threads: usize,

    /// Number of writer shard threads.
    #[arg(long, default_value_t = 2)]
    writer_threads: usize,

    /// Write unmatched and ambiguous records to a dedicated `unmatched` output.
    #[arg(long, default_value_t = false)]
    write_unmatched: bool,

    /// Classify and route records with an empty sequence instead of dropping them.
    #[arg(long, default_value_t = false)]
    keep_empty: bool,

    /// Directory output files are written into; created if missing.
    #[arg(long, default_value = ".")]
    output_dir: PathBuf,

    /// Output filename suffix appended to each sample name.
    #[arg(long, default_value = ".fastq.gz")]
    suffix: String,

    /// Sample sheet column holding the sample name.
    #[arg(long, default_value = "sample")]
    sample_column: String,

    /// Sample sheet column holding the reference barcode.
    #[arg(long, default_value = "barcode")]
    barcode_column: String,

    /// Sample sheet column separator.
    #[arg(long, default_value = "\t")]
    delimiter: String,

    /// Enable debug-level logging and a per-sample breakdown in the summary.
    #[arg(long, default_value_t = false)]
    debug: bool,
}

#[derive(Parser, Debug)]
struct CountArgs {
    /// Input FASTQ file, optionally gzip-compressed (.gz).
    #[arg(long)]
    fastq: PathBuf,

    /// Newline-delimited whitelist of reference hashtag-oligo barcodes.
    #[arg(long)]
    whitelist: PathBuf,

    /// Header regex with a named `HTO` capture group.
    #[arg(long, default_value = DEFAULT_HTO_REGEX)]
    barcode_regex: String,

    /// Maximum Hamming distance tolerated between an observed and a reference barcode.
    #[arg(short = 'k', long = "edit-distance", default_value_t = 1)]
    edit_distance: usize,

    /// Alphabet substitutions are drawn from when enumerating mutations.
    #[arg(long, default_value = "ACGT")]
    edit_alphabet: String,

    /// Chunker read/carry buffer size in bytes; must exceed the longest record.
    #[arg(long, default_value_t = 4_000_000)]
    buffer_size: usize,

    /// Number of counting worker threads.
    #[arg(long, default_value_t = num_cpus::get())]
    worker_threads: usize,

    /// Count records with an empty sequence instead of dropping them.
    #[arg(long, default_value_t = false)]
    keep_empty: bool,

    /// Enable debug-level logging.
    #[arg(long, default_value_t = false)]
    debug: bool,
}

fn init_logging(debug: bool) {
    env_logger::Builder::from_default_env()
        .filter_level(if debug {
            LevelFilter::Debug
        } else {
            LevelFilter::Warn
        })
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Demux(args) => {
            init_logging(args.debug);
            let delimiter = args.delimiter.as_bytes().first().copied().unwrap_or(b'\t');
            let config = RunConfig {
                fastq: args.fastq,
                samplesheet: args.samplesheet,
                barcode_regex: args.barcode_regex,
                edit_distance: args.edit_distance,
                edit_alphabet: EditAlphabet::from_str(&args.edit_alphabet)?,
                buffer_size: args.buffer_size,
                worker_threads: args.worker_threads,
                writer_threads: args.writer_threads,
                write_unmatched: args.write_unmatched,
                keep_empty: args.keep_empty,
                output_dir: args.output_dir,
                suffix: args.suffix,
                sample_column: args.sample_column,
                barcode_column: args.barcode_column,
                delimiter,
            };
            let outcome = run_demux(config)?;
            let stdout = std::io::stdout();
            print_demux_summary(&outcome, args.debug, &mut stdout.lock())?;
        }
        Command::Count(args) => {
            init_logging(args.debug);
            let config = CountConfig {
                fastq: args.fastq,
                whitelist: args.whitelist,
                barcode_regex: args.barcode_regex,
                edit_distance: args.edit_distance,
                edit_alphabet: EditAlphabet::from_str(&args.edit_alphabet)?,
                buffer_size: args.buffer_size,
                worker_threads: args.worker_threads,
                keep_empty: args.keep_empty,
            };
            let counts = run_count(config)?;
            let stdout = std::io::stdout();
            print_count_summary(&counts, &mut stdout.lock())?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn demux_requires_fastq_and_samplesheet() {
        let err = Cli::try_parse_from(["bardemux", "demux"]);
        assert!(err.is_err());
    }

    #[test]
    fn demux_parses_with_defaults() {
        let cli = Cli::try_parse_from([
            "bardemux",
            "demux",
            "--fastq",
            "in.fastq",
            "--samplesheet",
            "sheet.tsv",
        ])
        .unwrap();
        match cli.command {
            Command::Demux(args) => {
                assert_eq!(args.edit_distance, 1);
                assert_eq!(args.suffix, ".fastq.gz");
                assert!(!args.write_unmatched);
            }
            _ => panic!("expected Demux"),
        }
    }

    #[test]
    fn count_parses_with_hto_default_regex() {
        let cli = Cli::try_parse_from([
            "bardemux",
            "count",
            "--fastq",
            "in.fastq",
            "--whitelist",
            "wl.txt",
        ])
        .unwrap();
        match cli.command {
            Command::Count(args) => {
                assert_eq!(args.barcode_regex, DEFAULT_HTO_REGEX);
            }
            _ => panic!("expected Count"),
        }
    }
}
