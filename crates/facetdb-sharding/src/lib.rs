//! Deterministic partitioning of coarse keys into buckets.
//!
//! A hot partition key (say `orders#2024-06-01`) can be spread over N physical
//! partitions by suffixing the bucket computed from a finer-grained key
//! (`orders#2024-06-01#7`). Readers recompute the same bucket, or fan out over
//! every bucket, without any lookup table.
//!
//! ## Algorithm
//!
//! 1. SHA-256 digest of the key bytes
//! 2. First four digest bytes combined big-endian into a `u32`
//! 3. Reduced modulo the partition count
//!
//! The mapping is part of the on-disk format: changing it would orphan every
//! item written under a bucketed key.

use sha2::{Digest, Sha256};

/// Maps `key` to a bucket in `[0, partitions)`.
///
/// A partition count of zero is treated as one.
pub fn partition(key: &str, partitions: u32) -> u32 {
    let digest = Sha256::digest(key.as_bytes());
    let value = u32::from_be_bytes([digest[0], digest[1], digest[2], digest[3]]);
    value % partitions.max(1)
}

/// Routes keys to bucketed partition keys for a fixed partition count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShardRouter {
    partitions: u32,
}

impl ShardRouter {
    pub fn new(partitions: u32) -> Self {
        Self {
            partitions: partitions.max(1),
        }
    }

    pub fn partitions(&self) -> u32 {
        self.partitions
    }

    /// Bucket for `key`.
    pub fn bucket(&self, key: &str) -> u32 {
        partition(key, self.partitions)
    }

    /// `{base}#{bucket(key)}`
    pub fn shard_key(&self, base: &str, key: &str) -> String {
        format!("{}#{}", base, self.bucket(key))
    }

    /// Every bucketed variant of `base`, in bucket order.
    pub fn fan_out(&self, base: &str) -> Vec<String> {
        (0..self.partitions)
            .map(|bucket| format!("{}#{}", base, bucket))
            .collect()
    }
}
