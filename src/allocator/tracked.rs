//! Tracking decorator
//!
//! Wraps any allocator and records live bytes, peak bytes, and call counts
//! without changing the underlying behavior. The accounting unit is the
//! usable size the inner allocator granted, so once every outstanding block
//! is returned through the tracker, its live-byte counter is zero again.

use core::ptr::NonNull;

use super::stats::{AllocatorStats, AtomicAllocatorStats, StatisticsProvider};
use super::{Allocator, MemoryUsage, ThreadSafeAllocator};
use crate::error::AllocResult;

/// Allocator decorator that records memory usage statistics
#[derive(Debug, Default)]
pub struct TrackedAllocator<A> {
    inner: A,
    stats: AtomicAllocatorStats,
}

impl<A> TrackedAllocator<A> {
    /// Wraps `allocator` with statistics tracking.
    pub fn new(allocator: A) -> Self {
        Self {
            inner: allocator,
            stats: AtomicAllocatorStats::new(),
        }
    }

    /// The wrapped allocator.
    pub fn inner(&self) -> &A {
        &self.inner
    }

    /// Consumes the tracker and returns the wrapped allocator.
    pub fn into_inner(self) -> A {
        self.inner
    }

    /// Usable bytes currently live through this tracker.
    pub fn allocated_bytes(&self) -> usize {
        self.stats.current_allocated()
    }

    /// Highest value `allocated_bytes` has reached.
    pub fn peak_allocated_bytes(&self) -> usize {
        self.stats.peak_allocated()
    }

    /// Checks whether more blocks were handed out than returned.
    pub fn has_leaks(&self) -> bool {
        self.stats.snapshot().has_active_allocations()
    }
}

// SAFETY: every pointer is forwarded untouched; the decorator only observes.
unsafe impl<A: Allocator> Allocator for TrackedAllocator<A> {
    fn allocate(&self, size: usize) -> AllocResult<NonNull<u8>> {
        match self.inner.allocate(size) {
            Ok(ptr) => {
                // SAFETY: ptr is a live block of the inner allocator.
                let granted = unsafe { self.inner.usable_size(Some(ptr)) };
                self.stats.record_allocation(granted);
                Ok(ptr)
            },
            Err(err) => {
                self.stats.record_failure();
                Err(err)
            },
        }
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>) {
        // SAFETY: ptr is a live block of the inner allocator (caller
        // contract); the size is read before the block is released.
        unsafe {
            let granted = self.inner.usable_size(Some(ptr));
            self.inner.deallocate(ptr);
            self.stats.record_deallocation(granted);
        }
    }

    unsafe fn usable_size(&self, ptr: Option<NonNull<u8>>) -> usize {
        // SAFETY: forwarded caller contract.
        unsafe { self.inner.usable_size(ptr) }
    }
}

impl<A: MemoryUsage> MemoryUsage for TrackedAllocator<A> {
    fn used_memory(&self) -> usize {
        self.allocated_bytes()
    }

    fn available_memory(&self) -> Option<usize> {
        self.inner.available_memory()
    }

    fn total_memory(&self) -> Option<usize> {
        self.inner.total_memory()
    }
}

impl<A> StatisticsProvider for TrackedAllocator<A> {
    fn statistics(&self) -> AllocatorStats {
        self.stats.snapshot()
    }

    fn reset_statistics(&self) {
        self.stats.reset();
    }
}

// SAFETY: statistics are atomic; everything else is the inner allocator's.
unsafe impl<A: ThreadSafeAllocator> ThreadSafeAllocator for TrackedAllocator<A> {}

/// Convenience for wrapping any allocator with tracking
pub trait TrackExt: Sized {
    /// Wraps this allocator with statistics tracking.
    fn with_tracking(self) -> TrackedAllocator<Self>;
}

impl<A: Allocator> TrackExt for A {
    fn with_tracking(self) -> TrackedAllocator<Self> {
        TrackedAllocator::new(self)
    }
}
