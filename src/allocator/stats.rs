//! Allocation statistics tracking
//!
//! Snapshot and atomic-recorder types used by the tracking decorator.

use core::sync::atomic::{AtomicUsize, Ordering};

use crate::utils::atomic_max;

/// Statistics snapshot for an allocator
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AllocatorStats {
    /// Bytes currently allocated
    pub allocated_bytes: usize,
    /// Peak bytes allocated
    pub peak_allocated_bytes: usize,
    /// Total number of allocations
    pub allocation_count: usize,
    /// Total number of deallocations
    pub deallocation_count: usize,
    /// Number of failed allocations
    pub failed_allocations: usize,
}

impl AllocatorStats {
    /// Checks whether any allocation is still outstanding
    pub fn has_active_allocations(&self) -> bool {
        self.allocation_count > self.deallocation_count
    }

    /// Allocations minus deallocations
    pub fn allocation_balance(&self) -> isize {
        self.allocation_count as isize - self.deallocation_count as isize
    }
}

impl core::fmt::Display for AllocatorStats {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        writeln!(f, "Allocator statistics:")?;
        writeln!(f, "  Current allocated: {} bytes", self.allocated_bytes)?;
        writeln!(f, "  Peak allocated: {} bytes", self.peak_allocated_bytes)?;
        writeln!(f, "  Allocations: {}", self.allocation_count)?;
        writeln!(f, "  Deallocations: {}", self.deallocation_count)?;
        write!(f, "  Failed allocations: {}", self.failed_allocations)
    }
}

/// Thread-safe recorder behind [`AllocatorStats`]
#[derive(Debug, Default)]
pub struct AtomicAllocatorStats {
    allocated_bytes: AtomicUsize,
    peak_allocated_bytes: AtomicUsize,
    allocation_count: AtomicUsize,
    deallocation_count: AtomicUsize,
    failed_allocations: AtomicUsize,
}

impl AtomicAllocatorStats {
    /// Creates an empty recorder
    pub const fn new() -> Self {
        Self {
            allocated_bytes: AtomicUsize::new(0),
            peak_allocated_bytes: AtomicUsize::new(0),
            allocation_count: AtomicUsize::new(0),
            deallocation_count: AtomicUsize::new(0),
            failed_allocations: AtomicUsize::new(0),
        }
    }

    /// Records a successful allocation of `size` usable bytes
    pub fn record_allocation(&self, size: usize) {
        self.allocation_count.fetch_add(1, Ordering::Relaxed);
        let live = self
            .allocated_bytes
            .fetch_add(size, Ordering::Relaxed)
            .saturating_add(size);
        atomic_max(&self.peak_allocated_bytes, live);
    }

    /// Records a deallocation returning `size` usable bytes
    pub fn record_deallocation(&self, size: usize) {
        self.deallocation_count.fetch_add(1, Ordering::Relaxed);
        self.allocated_bytes.fetch_sub(size, Ordering::Relaxed);
    }

    /// Records a failed allocation
    pub fn record_failure(&self) {
        self.failed_allocations.fetch_add(1, Ordering::Relaxed);
    }

    /// Bytes currently allocated
    pub fn current_allocated(&self) -> usize {
        self.allocated_bytes.load(Ordering::Relaxed)
    }

    /// Peak bytes allocated
    pub fn peak_allocated(&self) -> usize {
        self.peak_allocated_bytes.load(Ordering::Relaxed)
    }

    /// Takes a snapshot of the current statistics
    pub fn snapshot(&self) -> AllocatorStats {
        AllocatorStats {
            allocated_bytes: self.allocated_bytes.load(Ordering::Relaxed),
            peak_allocated_bytes: self.peak_allocated_bytes.load(Ordering::Relaxed),
            allocation_count: self.allocation_count.load(Ordering::Relaxed),
            deallocation_count: self.deallocation_count.load(Ordering::Relaxed),
            failed_allocations: self.failed_allocations.load(Ordering::Relaxed),
        }
    }

    /// Resets every counter to zero
    pub fn reset(&self) {
        self.allocated_bytes.store(0, Ordering::Relaxed);
        self.peak_allocated_bytes.store(0, Ordering::Relaxed);
        self.allocation_count.store(0, Ordering::Relaxed);
        self.deallocation_count.store(0, Ordering::Relaxed);
        self.failed_allocations.store(0, Ordering::Relaxed);
    }
}

/// Trait for allocators that expose collected statistics
pub trait StatisticsProvider {
    /// Current statistics snapshot
    fn statistics(&self) -> AllocatorStats;

    /// Resets collected statistics
    fn reset_statistics(&self);
}
