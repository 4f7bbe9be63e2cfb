use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use crossbeam_channel::bounded;
use log::{debug, info};

use crate::chunker::Chunker;
use crate::classify::RouteKey;
use crate::dispatch::{merge, run_worker, RunStats};
use crate::header::BarcodePattern;
use crate::io_util::{input_progress_bar, open_input, ProgressRead};
use crate::mutationhash::{EditAlphabet, MutationHash};
use crate::route::RouteTable;
use crate::samplesheet::{load_samplesheet, SampleSheet};
use crate::writer::{plan_outputs, WriterShard};

/// Fully resolved, validated configuration for a `demux` run. Constructing
/// one is where every Configuration-class error is raised; once built it is
/// immutable for the rest of the run.
pub struct RunConfig {
    pub fastq: PathBuf,
    pub samplesheet: PathBuf,
    pub barcode_regex: String,
    pub edit_distance: usize,
    pub edit_alphabet: EditAlphabet,
    pub buffer_size: usize,
    pub worker_threads: usize,
    pub writer_threads: usize,
    pub write_unmatched: bool,
    pub keep_empty: bool,
    pub output_dir: PathBuf,
    pub suffix: String,
    pub sample_column: String,
    pub barcode_column: String,
    pub delimiter: u8,
}

/// Outcome of a completed `demux` run: the aggregated classification totals
/// plus the sample sheet, so the caller can print a per-sample breakdown.
pub struct RunOutcome {
    pub stats: RunStats,
    pub samples: Vec<String>,
}

pub fn run_demux(config: RunConfig) -> Result<RunOutcome> {
    if !config.output_dir.exists() {
        std::fs::create_dir_all(&config.output_dir).with_context(|| {
            format!(
                "failed to create output directory {}",
                config.output_dir.display()
            )
        })?;
    }
    let probe = config.output_dir.join(".bardemux-write-check");
    std::fs::write(&probe, b"").with_context(|| {
        format!(
            "output directory {} is not writable",
            config.output_dir.display()
        )
    })?;
    let _ = std::fs::remove_file(&probe);

    let pattern =
        BarcodePattern::compile(&config.barcode_regex, "CB").context("invalid CB barcode regex")?;

    let sheet: SampleSheet = load_samplesheet(
        &config.samplesheet,
        config.delimiter,
        &config.sample_column,
        &config.barcode_column,
    )
    .context("failed to load sample sheet")?;
    info!("loaded {} samples from sample sheet", sheet.len());

    let hash = MutationHash::build(&sheet.barcodes, config.edit_distance, config.edit_alphabet)
        .context("failed to build mutation hash")?;
    debug!(
        "built mutation hash over {} references (k={}, alphabet={:?})",
        hash.num_references(),
        config.edit_distance,
        config.edit_alphabet
    );

    if config.writer_threads == 0 {
        bail!("writer thread count must be at least 1");
    }
    let route = RouteTable::build(sheet.len(), config.writer_threads, config.write_unmatched)
        .context("failed to build route table")?;
    let plan = plan_outputs(
        &sheet.samples,
        &config.output_dir,
        &config.suffix,
        &route,
        config.write_unmatched,
    );

    let source = open_input(&config.fastq)?;
    let bar = input_progress_bar(&config.fastq);
    let tracked = ProgressRead::new(source, bar.clone());
    let mut chunker = Chunker::new(tracked, config.buffer_size);

    let (blob_tx, blob_rx) = bounded::<Vec<u8>>(config.worker_threads.max(1) * 2);

    let stats = std::thread::scope(|scope| -> Result<RunStats> {
        let mut writer_senders = Vec::with_capacity(route.num_shards);
        let mut writer_handles = Vec::with_capacity(route.num_shards);
        for shard_plan in &plan {
            let shard = WriterShard::open(shard_plan)?;
            let (tx, rx) = bounded::<(RouteKey, Vec<u8>)>(config.worker_threads.max(1) * 4);
            writer_handles.push(scope.spawn(move || shard.run(rx)));
            writer_senders.push(tx);
        }

        let mut worker_handles = Vec::with_capacity(config.worker_threads);
        for _ in 0..config.worker_threads.max(1) {
            let blob_rx = blob_rx.clone();
            let senders: Vec<_> = writer_senders.iter().cloned().collect();
            let route = &route;
            let pattern = &pattern;
            let hash = &hash;
            let keep_empty = config.keep_empty;
            let write_unmatched = config.write_unmatched;
            worker_handles.push(scope.spawn(move || {
                run_worker(
                    &blob_rx,
                    &senders,
                    route,
                    pattern,
                    hash,
                    keep_empty,
                    write_unmatched,
                )
            }));
        }
        // Drop the orchestrator's own sender handles now that every worker
        // holds its clones -- otherwise the writer channels never close
        // once workers finish, since a live clone would remain here.
        drop(writer_senders);

        while let Some(blob) = chunker.next_blob()? {
            blob_tx
                .send(blob)
                .expect("worker pool closed its receiver before input was exhausted");
        }
        drop(blob_tx);

        let mut per_worker = Vec::with_capacity(worker_handles.len());
        for handle in worker_handles {
            per_worker.push(handle.join().expect("worker thread panicked"));
        }

        for handle in writer_handles {
            handle
                .join()
                .expect("writer thread panicked")
                .context("writer shard failed")?;
        }

        Ok(merge(per_worker))
    })?;
    bar.finish_and_clear();

    Ok(RunOutcome {
        stats,
        samples: sheet.samples,
    })
}

/// Print the `demux` summary: the tab-separated totals line, and (only in
/// debug mode) one `sample\tcount` line per sample.
pub fn print_summary(
    outcome: &RunOutcome,
    debug_detail: bool,
    out: &mut impl std::io::Write,
) -> Result<()> {
    let s = &outcome.stats;
    writeln!(
        out,
        "{}\t{}\t{}\t{}",
        s.records_seen, s.matched, s.ambiguous, s.unmatched
    )?;
    if debug_detail {
        for (sample, count) in outcome.samples.iter().zip(&s.per_reference) {
            writeln!(out, "{sample}\t{count}")?;
        }
    }
    Ok(())
}
