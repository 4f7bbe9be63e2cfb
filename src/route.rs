use crate::error::DemuxError;

/// Assigns every reference barcode (by index into the reference list) and,
/// if enabled, the unmatched bucket, to one of `W` writer shards.
///
/// References are partitioned by a deterministic stride (`index % shards`)
/// across the shards available for samples, the same round-robin the
/// original tool used (`seq[i::size]`) to balance barcode load. When
/// `write_unmatched` is set, one shard is reserved exclusively for the
/// unmatched bucket so a hot unmatched stream never contends with a sample's
/// queue.
pub struct RouteTable {
    sample_shard: Vec<usize>,
    unmatched_shard: Option<usize>,
    pub num_shards: usize,
}

impl RouteTable {
    pub fn build(
        num_references: usize,
        writer_threads: usize,
        write_unmatched: bool,
    ) -> Result<Self, DemuxError> {
        if writer_threads == 0 {
            return Err(DemuxError::config("writer thread count must be at least 1"));
        }

        let (sample_shards, unmatched_shard, num_shards) = if write_unmatched {
            if writer_threads < 2 {
                (1usize, Some(0usize), 1usize)
            } else {
                (writer_threads - 1, Some(writer_threads - 1), writer_threads)
            }
        } else {
            (writer_threads, None, writer_threads)
        };

        let sample_shard = (0..num_references).map(|i| i % sample_shards).collect();

        Ok(RouteTable {
            sample_shard,
            unmatched_shard,
            num_shards,
        })
    }

    pub fn shard_for_reference(&self, reference_idx: u32) -> usize {
        self.sample_shard[reference_idx as usize]
    }

    pub fn unmatched_shard(&self) -> Option<usize> {
        self.unmatched_shard
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stride_partitions_evenly() {
        let route = RouteTable::build(6, 3, false).unwrap();
        assert_eq!(route.num_shards, 3);
        assert_eq!(route.shard_for_reference(0), 0);
        assert_eq!(route.shard_for_reference(1), 1);
        assert_eq!(route.shard_for_reference(2), 2);
        assert_eq!(route.shard_for_reference(3), 0);
    }

    #[test]
    fn reserves_a_shard_for_unmatched() {
        let route = RouteTable::build(4, 3, true).unwrap();
        assert_eq!(route.num_shards, 3);
        assert_eq!(route.unmatched_shard(), Some(2));
        // samples only stride over the remaining 2 shards
        assert_eq!(route.shard_for_reference(0), 0);
        assert_eq!(route.shard_for_reference(1), 1);
        assert_eq!(route.shard_for_reference(2), 0);
    }

    #[test]
    fn single_writer_thread_with_unmatched_shares_shard() {
        let route = RouteTable::build(2, 1, true).unwrap();
        assert_eq!(route.num_shards, 1);
        assert_eq!(route.unmatched_shard(), Some(0));
        assert_eq!(route.shard_for_reference(0), 0);
        assert_eq!(route.shard_for_reference(1), 0);
    }
}
