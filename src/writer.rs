use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use crossbeam_channel::Receiver;

use crate::classify::RouteKey;
use crate::io_util::Sink;

/// A writer shard: owns a fixed, disjoint set of output sinks and drains a
/// single queue of `(RouteKey, payload)` items until the channel closes.
///
/// Sinks are opened eagerly at construction -- an unwritable output path is
/// a configuration error surfaced before the pipeline ever starts moving
/// bytes, not a failure discovered mid-run.
pub struct WriterShard {
    sinks: HashMap<RouteKey, Sink>,
}

impl WriterShard {
    /// Open one sink per `(RouteKey, path)` pair this shard owns.
    pub fn open(owned: &[(RouteKey, std::path::PathBuf)]) -> Result<Self> {
        let mut sinks = HashMap::with_capacity(owned.len());
        for (key, path) in owned {
            let sink = Sink::create(path)
                .with_context(|| format!("failed to open writer sink {}", path.display()))?;
            sinks.insert(*key, sink);
        }
        Ok(WriterShard { sinks })
    }

    /// Drain `rx` until the channel closes -- every worker's `Sender` clone
    /// has been dropped, the channel-close shutdown signal sanctioned by the
    /// concurrency design in place of an explicit sentinel value. Returns the
    /// number of payloads written, or the first write error encountered,
    /// which is fatal to this shard.
    pub fn run(mut self, rx: Receiver<(RouteKey, Vec<u8>)>) -> Result<usize> {
        let mut processed = 0usize;
        for (key, payload) in rx.iter() {
            let sink = self
                .sinks
                .get_mut(&key)
                .expect("worker routed a payload to a key this shard does not own");
            sink.write_all(&payload)
                .with_context(|| format!("write failed for route {key:?}"))?;
            processed += 1;
        }
        self.close()?;
        Ok(processed)
    }

    fn close(self) -> Result<()> {
        for (key, sink) in self.sinks {
            sink.close()
                .with_context(|| format!("failed to finalize sink for route {key:?}"))?;
        }
        Ok(())
    }
}

/// Build the `sample + suffix` (and, if enabled, `unmatched + suffix`)
/// output path for every reference, grouped by the writer shard that owns
/// it, ready to be handed to `WriterShard::open`.
pub fn plan_outputs(
    samples: &[String],
    output_dir: &Path,
    suffix: &str,
    route: &crate::route::RouteTable,
    write_unmatched: bool,
) -> Vec<Vec<(RouteKey, std::path::PathBuf)>> {
    let mut per_shard: Vec<Vec<(RouteKey, std::path::PathBuf)>> =
        (0..route.num_shards).map(|_| Vec::new()).collect();

    for (idx, sample) in samples.iter().enumerate() {
        let shard = route.shard_for_reference(idx as u32);
        let path = output_dir.join(format!("{sample}{suffix}"));
        per_shard[shard].push((RouteKey::Reference(idx as u32), path));
    }

    if write_unmatched {
        if let Some(shard) = route.unmatched_shard() {
            let path = output_dir.join(format!("unmatched{suffix}"));
            per_shard[shard].push((RouteKey::Unmatched, path));
        }
    }

    per_shard
}
