use std::ops::Range;

/// Splits `total` samples among `num_shards` and returns the range for `shard_id`.
///
/// Properties:
/// - Ranges are contiguous, disjoint and cover `[0..total)`.
/// - Sizes differ by at most 1 (balanced partition).
pub fn shard_range(total: usize, shard_id: usize, num_shards: usize) -> Range<usize> {
    let base = total / num_shards;
    let rem = total % num_shards;

    let start = shard_id * base + shard_id.min(rem);
    let extra = usize::from(shard_id < rem);
    start..start + base + extra
}
