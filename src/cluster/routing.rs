use crate::core::MemberId;
use sha2::{Digest, Sha256};

/// Maps a member to its partition in `[0, total_partitions)`.
///
/// SHA-256 of the member's canonical decimal form, top 64 bits (big-endian)
/// modulo the partition count. Deterministic across processes and releases,
/// and near-uniform for sequential ids.
///
/// # Panics
///
/// Panics when `total_partitions` is zero; a topology with no partitions is
/// rejected at startup, so reaching this is a caller bug.
pub fn partition_of(member: MemberId, total_partitions: u32) -> u32 {
    assert!(total_partitions > 0, "total_partitions must be positive");
    let digest = Sha256::digest(member.canonical().as_bytes());
    let mut top = [0u8; 8];
    top.copy_from_slice(&digest[..8]);
    (u64::from_be_bytes(top) % u64::from(total_partitions)) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_partition_always_routes_to_zero() {
        for raw in [-5_i64, 0, 1, 42, i64::MAX] {
            assert_eq!(partition_of(MemberId(raw), 1), 0);
        }
    }

    #[test]
    fn sequential_ids_spread_over_all_partitions() {
        let total = 8;
        let mut counts = vec![0usize; total as usize];
        for raw in 0..8_000 {
            counts[partition_of(MemberId(raw), total) as usize] += 1;
        }
        // 1000 expected per bucket; a hot shard would blow well past these bounds.
        for count in counts {
            assert!((800..=1200).contains(&count), "skewed bucket: {count}");
        }
    }

    #[test]
    #[should_panic(expected = "total_partitions must be positive")]
    fn zero_partitions_fails_fast() {
        partition_of(MemberId(1), 0);
    }
}
