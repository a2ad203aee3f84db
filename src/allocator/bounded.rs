//! Capacity-gated allocator
//!
//! Wraps another allocator and refuses any request that would push the
//! total of live usable bytes past a fixed budget. Capacity is honest: once
//! every block is returned, a request for the full budget succeeds again.
//!
//! ## Invariants
//!
//! - live bytes never exceed the budget
//! - the counter is reserved before the inner allocation and rolled back if
//!   the inner allocator fails
//! - releases subtract the same usable size that was added

use core::ptr::NonNull;
use core::sync::atomic::{AtomicUsize, Ordering};

use super::{Allocator, MemoryUsage, SystemAllocator, ThreadSafeAllocator};
use crate::error::{AllocError, AllocResult};

/// Allocator that enforces a fixed byte budget over an inner allocator
#[derive(Debug)]
pub struct BoundedAllocator<A = SystemAllocator> {
    inner: A,
    capacity: usize,
    used: AtomicUsize,
}

impl BoundedAllocator<SystemAllocator> {
    /// Creates a budgeted wrapper over the system heap.
    pub fn new(capacity: usize) -> Self {
        Self::with_inner(capacity, SystemAllocator::new())
    }
}

impl<A> BoundedAllocator<A> {
    /// Creates a budgeted wrapper over `inner`.
    pub fn with_inner(capacity: usize, inner: A) -> Self {
        Self {
            inner,
            capacity,
            used: AtomicUsize::new(0),
        }
    }

    /// The byte budget.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Bytes currently counted against the budget.
    #[inline]
    pub fn used(&self) -> usize {
        self.used.load(Ordering::Acquire)
    }

    /// The wrapped allocator.
    pub fn inner(&self) -> &A {
        &self.inner
    }

    /// Consumes the wrapper and returns the inner allocator.
    pub fn into_inner(self) -> A {
        self.inner
    }

    /// Reserves `size` bytes against the budget, failing without side
    /// effects when it would not fit.
    fn try_reserve(&self, size: usize) -> AllocResult<()> {
        let mut current = self.used.load(Ordering::Relaxed);
        loop {
            let next = match current.checked_add(size) {
                Some(next) if next <= self.capacity => next,
                _ => {
                    return Err(AllocError::capacity_exceeded(
                        size,
                        self.capacity.saturating_sub(current),
                    ));
                },
            };

            match self
                .used
                .compare_exchange_weak(current, next, Ordering::AcqRel, Ordering::Acquire)
            {
                Ok(_) => return Ok(()),
                Err(observed) => current = observed,
            }
        }
    }
}

// SAFETY: alignment and validity come from the inner allocator; the wrapper
// only adds accounting and forwards every pointer untouched.
unsafe impl<A: Allocator> Allocator for BoundedAllocator<A> {
    fn allocate(&self, size: usize) -> AllocResult<NonNull<u8>> {
        self.try_reserve(size)?;

        let ptr = match self.inner.allocate(size) {
            Ok(ptr) => ptr,
            Err(err) => {
                // Give the reservation back; nothing was handed out.
                self.used.fetch_sub(size, Ordering::AcqRel);
                return Err(err);
            },
        };

        // SAFETY: ptr is a live block of the inner allocator.
        let granted = unsafe { self.inner.usable_size(Some(ptr)) };
        if granted > size {
            self.used.fetch_add(granted - size, Ordering::AcqRel);
        }

        Ok(ptr)
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>) {
        // SAFETY: ptr is a live block of the inner allocator (caller
        // contract); the usable size read here is the same value the
        // accounting added.
        unsafe {
            let granted = self.inner.usable_size(Some(ptr));
            self.inner.deallocate(ptr);
            self.used.fetch_sub(granted, Ordering::AcqRel);
        }
    }

    unsafe fn usable_size(&self, ptr: Option<NonNull<u8>>) -> usize {
        // SAFETY: forwarded caller contract.
        unsafe { self.inner.usable_size(ptr) }
    }
}

impl<A> MemoryUsage for BoundedAllocator<A> {
    fn used_memory(&self) -> usize {
        self.used()
    }

    fn available_memory(&self) -> Option<usize> {
        Some(self.capacity.saturating_sub(self.used()))
    }

    fn total_memory(&self) -> Option<usize> {
        Some(self.capacity)
    }
}

// SAFETY: the counter is atomic and the inner allocator is itself
// thread-safe.
unsafe impl<A: ThreadSafeAllocator> ThreadSafeAllocator for BoundedAllocator<A> {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_over_budget_requests() {
        let allocator = BoundedAllocator::new(64);

        assert!(allocator.allocate(65).is_err());
        assert_eq!(allocator.used(), 0);
    }

    #[test]
    fn accounting_balances() {
        let allocator = BoundedAllocator::new(128);

        let a = allocator.allocate(64).unwrap();
        let b = allocator.allocate(64).unwrap();
        assert_eq!(allocator.used(), 128);
        assert!(allocator.allocate(1).is_err());

        unsafe {
            allocator.deallocate(a);
            allocator.deallocate(b);
        }
        assert_eq!(allocator.used(), 0);

        let full = allocator.allocate(128).unwrap();
        unsafe { allocator.deallocate(full) };
    }
}
