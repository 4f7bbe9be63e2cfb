use std::time::{Duration, Instant};

use rustc_hash::FxHashMap;

use crate::header::BarcodePattern;
use crate::mutationhash::MutationHash;
use crate::record::split_records;

/// The outcome of classifying a single record's barcode against the
/// mutation hash. Exactly one variant applies to any record -- there is no
/// fourth case.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Matched(u32),
    Ambiguous,
    Unmatched,
}

/// Parse the header with `pattern` and resolve the captured barcode against
/// `hash`. A header that fails to match, a barcode absent from the index,
/// and an ambiguous (multi-reference) key are all distinguished here.
pub fn classify(header: &[u8], pattern: &BarcodePattern, hash: &MutationHash) -> Classification {
    let Some(barcode) = pattern.extract(header) else {
        return Classification::Unmatched;
    };
    match hash.get(barcode) {
        None => Classification::Unmatched,
        Some(refs) if refs.len() == 1 => Classification::Matched(refs[0]),
        Some(_) => Classification::Ambiguous,
    }
}

/// Where a classified record's serialized payload should be routed, before
/// it is resolved to an actual writer shard by the route table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RouteKey {
    Reference(u32),
    Unmatched,
}

#[derive(Debug, Default, Clone)]
pub struct BlobStats {
    pub records_seen: usize,
    pub matched: usize,
    pub ambiguous: usize,
    pub unmatched: usize,
    /// Per-reference matched counts, indexed the same as the mutation hash's
    /// reference list. Only populated by `process_blob`/`count_blob`, which
    /// both know the reference count up front.
    pub per_reference: Vec<u64>,
    pub parse_duration: Duration,
    pub route_duration: Duration,
}

/// Classify every record in `blob`, bucketing serialized FASTQ payloads by
/// `RouteKey` in input order within each bucket. Empty sequences are
/// dropped up front unless `keep_empty` is set. When `write_unmatched` is
/// false, unmatched/ambiguous records are classified (for stats) but their
/// payload is not buffered at all.
pub fn process_blob(
    blob: &[u8],
    keep_empty: bool,
    write_unmatched: bool,
    pattern: &BarcodePattern,
    hash: &MutationHash,
) -> (FxHashMap<RouteKey, Vec<u8>>, BlobStats) {
    let start = Instant::now();
    let mut stats = BlobStats {
        per_reference: vec![0u64; hash.num_references()],
        ..Default::default()
    };
    let mut bucket_records: FxHashMap<RouteKey, Vec<crate::record::Record<'_>>> =
        FxHashMap::default();

    for record in split_records(blob) {
        if record.sequence.is_empty() && !keep_empty {
            continue;
        }
        stats.records_seen += 1;

        let route_key = match classify(record.header, pattern, hash) {
            Classification::Matched(idx) => {
                stats.matched += 1;
                stats.per_reference[idx as usize] += 1;
                Some(RouteKey::Reference(idx))
            }
            Classification::Ambiguous => {
                stats.ambiguous += 1;
                write_unmatched.then_some(RouteKey::Unmatched)
            }
            Classification::Unmatched => {
                stats.unmatched += 1;
                write_unmatched.then_some(RouteKey::Unmatched)
            }
        };

        if let Some(key) = route_key {
            bucket_records.entry(key).or_default().push(record);
        }
    }
    stats.parse_duration = start.elapsed();

    // Phase 2: serialize each bucket's records back to FASTQ text, in input
    // order, as a single payload the writer shard can append verbatim.
    let route_start = Instant::now();
    let mut buckets: FxHashMap<RouteKey, Vec<u8>> = FxHashMap::default();
    for (key, records) in bucket_records {
        let payload = buckets.entry(key).or_default();
        for record in records {
            record.write_fastq(payload);
        }
    }
    stats.route_duration = route_start.elapsed();

    (buckets, stats)
}

/// Counting-mode specialization: tally `Matched(b)` outcomes per reference
/// without buffering any payload. Used by the `count` subcommand.
pub fn count_blob(
    blob: &[u8],
    keep_empty: bool,
    pattern: &BarcodePattern,
    hash: &MutationHash,
) -> (Vec<u64>, BlobStats) {
    let start = Instant::now();
    let mut stats = BlobStats::default();
    let mut counts = vec![0u64; hash.num_references()];

    for record in split_records(blob) {
        if record.sequence.is_empty() && !keep_empty {
            continue;
        }
        stats.records_seen += 1;
        match classify(record.header, pattern, hash) {
            Classification::Matched(idx) => {
                stats.matched += 1;
                counts[idx as usize] += 1;
            }
            Classification::Ambiguous => stats.ambiguous += 1,
            Classification::Unmatched => stats.unmatched += 1,
        }
    }

    stats.parse_duration = start.elapsed();
    stats.per_reference = counts.clone();
    (counts, stats)
}
