use std::time::Duration;

use crossbeam_channel::{Receiver, Sender};

use crate::classify::{process_blob, BlobStats, RouteKey};
use crate::header::BarcodePattern;
use crate::mutationhash::MutationHash;
use crate::route::RouteTable;

/// Aggregate, cross-worker classification totals the orchestrator folds into
/// the final summary line.
#[derive(Debug, Default, Clone)]
pub struct RunStats {
    pub records_seen: usize,
    pub matched: usize,
    pub ambiguous: usize,
    pub unmatched: usize,
    pub per_reference: Vec<u64>,
    pub parse_duration: Duration,
    pub route_duration: Duration,
}

impl RunStats {
    fn add_blob(&mut self, stats: BlobStats) {
        self.records_seen += stats.records_seen;
        self.matched += stats.matched;
        self.ambiguous += stats.ambiguous;
        self.unmatched += stats.unmatched;
        self.parse_duration += stats.parse_duration;
        self.route_duration += stats.route_duration;
        if self.per_reference.is_empty() {
            self.per_reference = stats.per_reference;
        } else {
            for (total, added) in self.per_reference.iter_mut().zip(&stats.per_reference) {
                *total += added;
            }
        }
    }
}

/// Merge worker-local `RunStats` returned by each joined thread into one
/// run-wide total.
pub fn merge(stats: impl IntoIterator<Item = RunStats>) -> RunStats {
    let mut total = RunStats::default();
    for s in stats {
        total.records_seen += s.records_seen;
        total.matched += s.matched;
        total.ambiguous += s.ambiguous;
        total.unmatched += s.unmatched;
        total.parse_duration += s.parse_duration;
        total.route_duration += s.route_duration;
        if total.per_reference.is_empty() {
            total.per_reference = s.per_reference;
        } else {
            for (t, a) in total.per_reference.iter_mut().zip(&s.per_reference) {
                *t += a;
            }
        }
    }
    total
}

/// Run one worker's loop: pull blobs from `blobs` until the channel closes,
/// classify each, and forward every nonempty route bucket to the writer
/// shard channel its key belongs to.
///
/// Blobs are independent and their processing order across workers is not
/// observable, matching the dispatch fabric's no-ordering-across-chunks
/// contract.
pub fn run_worker(
    blobs: &Receiver<Vec<u8>>,
    writer_senders: &[Sender<(RouteKey, Vec<u8>)>],
    route: &RouteTable,
    pattern: &BarcodePattern,
    hash: &MutationHash,
    keep_empty: bool,
    write_unmatched: bool,
) -> RunStats {
    let mut stats = RunStats::default();

    for blob in blobs.iter() {
        let (buckets, blob_stats) =
            process_blob(&blob, keep_empty, write_unmatched, pattern, hash);
        stats.add_blob(blob_stats);

        for (key, payload) in buckets {
            let shard = match key {
                RouteKey::Reference(idx) => route.shard_for_reference(idx),
                RouteKey::Unmatched => route
                    .unmatched_shard()
                    .expect("unmatched bucket produced without an unmatched shard configured"),
            };
            // A closed receiver means that writer shard has already failed
            // and shut down; the worker keeps draining other blobs rather
            // than panicking, letting the orchestrator's join surface the
            // shard's error.
            let _ = writer_senders[shard].send((key, payload));
        }
    }

    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mutationhash::EditAlphabet;
    use crossbeam_channel::unbounded;

    #[test]
    fn routes_matched_record_to_its_shard_channel() {
        let pattern = BarcodePattern::compile(r"(.*):(?P<CB>[ATGCN]{4})", "CB").unwrap();
        let hash =
            MutationHash::build(&[b"AAAA".to_vec(), b"CCCC".to_vec()], 1, EditAlphabet::Acgt)
                .unwrap();
        let route = RouteTable::build(2, 2, false).unwrap();

        let (blob_tx, blob_rx) = unbounded();
        blob_tx
            .send(b"@r:AAAA\nGGGG\n+\nIIII\n".to_vec())
            .unwrap();
        drop(blob_tx);

        let (w0_tx, w0_rx) = unbounded();
        let (w1_tx, w1_rx) = unbounded();
        let senders = vec![w0_tx, w1_tx];

        let stats = run_worker(&blob_rx, &senders, &route, &pattern, &hash, false, false);
        assert_eq!(stats.matched, 1);

        let shard = route.shard_for_reference(0);
        let rx = if shard == 0 { &w0_rx } else { &w1_rx };
        let (key, payload) = rx.try_recv().unwrap();
        assert_eq!(key, RouteKey::Reference(0));
        assert!(String::from_utf8_lossy(&payload).contains("AAAA"));
    }
}
