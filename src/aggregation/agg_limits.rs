use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use common::ByteCount;
use log::warn;

use super::{DEFAULT_BUCKET_LIMIT, DEFAULT_MEMORY_LIMIT};
use crate::AggregationError;

/// An estimate for memory consumption. Non recursive
pub trait MemoryConsumption {
    fn memory_consumption(&self) -> usize;
}

impl<K, V, S> MemoryConsumption for HashMap<K, V, S> {
    fn memory_consumption(&self) -> usize {
        let capacity = self.capacity();
        (std::mem::size_of::<K>() + std::mem::size_of::<V>() + 1) * capacity
    }
}

impl<T> MemoryConsumption for Vec<T> {
    fn memory_consumption(&self) -> usize {
        std::mem::size_of::<T>() * self.capacity()
    }
}

/// Aggregation memory limit after which the request fails. Defaults to DEFAULT_MEMORY_LIMIT
/// (500MB). The limit is shared by all the components of one aggregation request.
pub struct AggregationLimits {
    /// The counter which is shared between the aggregations for one request.
    memory_consumption: Arc<AtomicU64>,
    /// The memory_limit in bytes
    memory_limit: ByteCount,
    /// The maximum number of buckets _returned_
    /// This is not counting intermediate buckets.
    bucket_limit: u32,
}

impl Clone for AggregationLimits {
    fn clone(&self) -> Self {
        Self {
            memory_consumption: Arc::clone(&self.memory_consumption),
            memory_limit: self.memory_limit,
            bucket_limit: self.bucket_limit,
        }
    }
}

impl Default for AggregationLimits {
    fn default() -> Self {
        Self {
            memory_consumption: Default::default(),
            memory_limit: DEFAULT_MEMORY_LIMIT.into(),
            bucket_limit: DEFAULT_BUCKET_LIMIT,
        }
    }
}

impl AggregationLimits {
    /// *memory_limit*
    /// memory_limit is defined in bytes.
    /// Aggregation fails when the estimated memory consumption of the aggregation is higher than
    /// memory_limit.
    /// memory_limit will default to `DEFAULT_MEMORY_LIMIT` (500MB)
    ///
    /// *bucket_limit*
    /// Limits the maximum number of buckets returned from an aggregation request.
    /// bucket_limit will default to `DEFAULT_BUCKET_LIMIT` (65000)
    ///
    /// Note: The returned instance contains a Arc shared counter to track memory consumption.
    pub fn new(memory_limit: Option<u64>, bucket_limit: Option<u32>) -> Self {
        Self {
            memory_consumption: Default::default(),
            memory_limit: memory_limit.unwrap_or(DEFAULT_MEMORY_LIMIT).into(),
            bucket_limit: bucket_limit.unwrap_or(DEFAULT_BUCKET_LIMIT),
        }
    }

    /// Create a new ResourceLimitGuard, that will release the memory when dropped.
    pub fn new_guard(&self) -> ResourceLimitGuard {
        ResourceLimitGuard {
            memory_consumption: Arc::clone(&self.memory_consumption),
            memory_limit: self.memory_limit,
            allocated_with_the_guard: 0,
        }
    }

    /// Maximum number of buckets a single aggregation may return.
    pub fn get_bucket_limit(&self) -> u32 {
        self.bucket_limit
    }

    /// The memory limit in bytes.
    pub fn get_memory_limit(&self) -> ByteCount {
        self.memory_limit
    }

    /// Bytes currently held by all the guards of this instance and its clones.
    pub fn memory_consumed(&self) -> ByteCount {
        self.memory_consumption.load(Ordering::Relaxed).into()
    }
}

fn validate_memory_consumption(
    memory_consumption: &AtomicU64,
    memory_limit: ByteCount,
) -> Result<(), AggregationError> {
    // Load the estimated memory consumed by the aggregations
    let memory_consumed: ByteCount = memory_consumption.load(Ordering::Relaxed).into();
    if memory_consumed > memory_limit {
        warn!("aggregation memory limit exceeded: {memory_consumed} > {memory_limit}");
        return Err(AggregationError::MemoryExceeded {
            limit: memory_limit,
            current: memory_consumed,
        });
    }
    Ok(())
}

/// Handle on the shared memory budget, owned by one component.
///
/// Every byte added through a guard is given back when the guard is dropped,
/// whether the aggregation completed or failed.
pub struct ResourceLimitGuard {
    /// The counter which is shared between the aggregations for one request.
    memory_consumption: Arc<AtomicU64>,
    /// The memory_limit in bytes
    memory_limit: ByteCount,
    /// Allocated memory with this guard.
    allocated_with_the_guard: u64,
}

impl ResourceLimitGuard {
    /// Charges `num_bytes` to the shared budget.
    ///
    /// The bytes stay charged to the guard even if the limit is exceeded, the
    /// error is returned after the counter was updated.
    pub fn add_memory_consumed(&mut self, num_bytes: u64) -> crate::Result<()> {
        self.memory_consumption
            .fetch_add(num_bytes, Ordering::Relaxed);
        self.allocated_with_the_guard += num_bytes;
        validate_memory_consumption(&self.memory_consumption, self.memory_limit)?;
        Ok(())
    }

    /// Gives back up to `num_bytes` previously charged through this guard.
    pub fn release_memory(&mut self, num_bytes: u64) {
        let num_bytes = num_bytes.min(self.allocated_with_the_guard);
        self.memory_consumption
            .fetch_sub(num_bytes, Ordering::Relaxed);
        self.allocated_with_the_guard -= num_bytes;
    }

    /// Bytes currently charged through this guard.
    pub fn allocated(&self) -> ByteCount {
        self.allocated_with_the_guard.into()
    }
}

impl Drop for ResourceLimitGuard {
    /// Removes the memory consumed tracked by this _instance_ of AggregationLimits.
    fn drop(&mut self) {
        self.memory_consumption
            .fetch_sub(self.allocated_with_the_guard, Ordering::Relaxed);
    }
}

/// Pushes `value` into `vec`, charging the guard before the vec grows.
///
/// The capacity doubles, but never beyond `max_len` unless the vec is already
/// that long.
pub(crate) fn push_tracked<T>(
    vec: &mut Vec<T>,
    value: T,
    max_len: usize,
    guard: &mut ResourceLimitGuard,
) -> crate::Result<()> {
    if vec.len() == vec.capacity() {
        let new_capacity = (vec.capacity() * 2)
            .max(4)
            .min(max_len)
            .max(vec.len() + 1);
        let additional = new_capacity - vec.len();
        guard.add_memory_consumed((additional * std::mem::size_of::<T>()) as u64)?;
        vec.reserve_exact(additional);
    }
    vec.push(value);
    Ok(())
}
