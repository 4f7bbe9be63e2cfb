use anyhow::{Context, Result};
use crossbeam_channel::bounded;
use log::debug;

use crate::chunker::Chunker;
use crate::classify::{count_blob, BlobStats};
use crate::header::BarcodePattern;
use crate::io_util::{input_progress_bar, open_input, ProgressRead};
use crate::mutationhash::{EditAlphabet, MutationHash};
use crate::samplesheet::load_whitelist;

/// Resolved, validated configuration for the `count` subcommand -- the
/// hashtag-oligo-quantification specialization of the pipeline that has no
/// writer shards and aggregates `Matched(b)` counts instead of writing
/// records.
pub struct CountConfig {
    pub fastq: std::path::PathBuf,
    pub whitelist: std::path::PathBuf,
    pub barcode_regex: String,
    pub edit_distance: usize,
    pub edit_alphabet: EditAlphabet,
    pub buffer_size: usize,
    pub worker_threads: usize,
    pub keep_empty: bool,
}

/// Aggregate result of a counting run: one tally per whitelist barcode plus
/// the totals needed for the summary line.
pub struct Counts {
    pub barcodes: Vec<Vec<u8>>,
    pub per_reference: Vec<u64>,
    pub total: usize,
    pub matched: usize,
    pub ambiguous: usize,
    pub unmatched: usize,
}

pub fn run_count(config: CountConfig) -> Result<Counts> {
    let pattern = BarcodePattern::compile(&config.barcode_regex, "HTO")
        .context("invalid HTO barcode regex")?;
    let whitelist = load_whitelist(&config.whitelist).context("failed to load whitelist")?;
    let hash = MutationHash::build(&whitelist, config.edit_distance, config.edit_alphabet)
        .context("failed to build mutation hash")?;
    debug!(
        "built mutation hash over {} whitelist barcodes (k={}, alphabet={:?})",
        whitelist.len(),
        config.edit_distance,
        config.edit_alphabet
    );

    let source = open_input(&config.fastq)?;
    let bar = input_progress_bar(&config.fastq);
    let tracked = ProgressRead::new(source, bar.clone());
    let mut chunker = Chunker::new(tracked, config.buffer_size);

    let (blob_tx, blob_rx) = bounded::<Vec<u8>>(config.worker_threads.max(1) * 2);

    let all_stats: Vec<BlobStats> = std::thread::scope(|scope| -> Result<Vec<BlobStats>> {
        let mut handles = Vec::with_capacity(config.worker_threads);
        for _ in 0..config.worker_threads.max(1) {
            let blob_rx = blob_rx.clone();
            let pattern = &pattern;
            let hash = &hash;
            let keep_empty = config.keep_empty;
            handles.push(scope.spawn(move || {
                let mut local = BlobStats {
                    per_reference: vec![0u64; hash.num_references()],
                    ..Default::default()
                };
                for blob in blob_rx.iter() {
                    let (counts, stats) = count_blob(&blob, keep_empty, pattern, hash);
                    local.records_seen += stats.records_seen;
                    local.matched += stats.matched;
                    local.ambiguous += stats.ambiguous;
                    local.unmatched += stats.unmatched;
                    local.parse_duration += stats.parse_duration;
                    for (total, added) in local.per_reference.iter_mut().zip(&counts) {
                        *total += added;
                    }
                }
                local
            }));
        }
        drop(blob_rx);

        while let Some(blob) = chunker.next_blob()? {
            blob_tx
                .send(blob)
                .expect("worker pool closed its receiver before input was exhausted");
        }
        drop(blob_tx);

        let mut stats = Vec::with_capacity(handles.len());
        for handle in handles {
            stats.push(handle.join().expect("counting worker thread panicked"));
        }
        Ok(stats)
    })?;
    bar.finish_and_clear();

    let mut total_stats = BlobStats {
        per_reference: vec![0u64; hash.num_references()],
        ..Default::default()
    };
    for s in all_stats {
        total_stats.records_seen += s.records_seen;
        total_stats.matched += s.matched;
        total_stats.ambiguous += s.ambiguous;
        total_stats.unmatched += s.unmatched;
        for (total, added) in total_stats.per_reference.iter_mut().zip(&s.per_reference) {
            *total += added;
        }
    }

    let barcodes = (0..hash.num_references())
        .map(|i| hash.reference(i as u32).to_vec())
        .collect();

    Ok(Counts {
        barcodes,
        per_reference: total_stats.per_reference,
        total: total_stats.records_seen,
        matched: total_stats.matched,
        ambiguous: total_stats.ambiguous,
        unmatched: total_stats.unmatched,
    })
}

/// Print the counting-mode summary: one `barcode\tcount` line per whitelist
/// entry, followed by the tab-separated totals line shared with `demux`.
pub fn print_summary(counts: &Counts, out: &mut impl std::io::Write) -> Result<()> {
    for (barcode, count) in counts.barcodes.iter().zip(&counts.per_reference) {
        writeln!(
            out,
            "{}\t{}",
            String::from_utf8_lossy(barcode),
            count
        )?;
    }
    writeln!(
        out,
        "{}\t{}\t{}\t{}",
        counts.total, counts.matched, counts.ambiguous, counts.unmatched
    )?;
    Ok(())
}
