//! Inline stack allocator
//!
//! Same bump discipline as [`ScratchAllocator`](super::ScratchAllocator),
//! but the region is an `N`-byte array embedded in the allocator value
//! itself: construction touches no heap at all.
//!
//! ## Invariants
//!
//! - the region base is `MAX_SCALAR_ALIGN`-aligned (enforced by the repr)
//!   and the cursor is an offset that only grows by aligned amounts, so
//!   every returned address keeps the alignment guarantee
//! - a request that does not fit fails without moving the cursor
//! - the cursor is position-independent; the value may be moved while no
//!   allocation is outstanding

use core::cell::UnsafeCell;
use core::ptr::NonNull;
use core::sync::atomic::{AtomicUsize, Ordering};

use super::{Allocator, MemoryUsage, ThreadSafeAllocator};
use crate::error::{AllocError, AllocResult};
use crate::utils::{align_up, Backoff, MAX_SCALAR_ALIGN};

#[repr(C, align(16))]
struct InlineRegion<const N: usize>([u8; N]);

const _: () = assert!(core::mem::align_of::<InlineRegion<0>>() == MAX_SCALAR_ALIGN);

/// Bump allocator over an inline, fixed-size region
///
/// The region lives inside the allocator value, so the allocator must not
/// be moved while any of its blocks are in use. `deallocate` is a no-op.
pub struct StackAllocator<const N: usize> {
    region: UnsafeCell<InlineRegion<N>>,
    /// Byte offset of the next free slot, always a multiple of
    /// `MAX_SCALAR_ALIGN`.
    cursor: AtomicUsize,
}

// SAFETY: the atomic cursor hands every byte range to exactly one caller;
// the cell only provides the aliasing-legal route to write those ranges.
unsafe impl<const N: usize> Sync for StackAllocator<N> {}
// SAFETY: plain owned bytes, no thread affinity.
unsafe impl<const N: usize> Send for StackAllocator<N> {}

impl<const N: usize> StackAllocator<N> {
    /// Creates an allocator with a zeroed inline region.
    pub const fn new() -> Self {
        Self {
            region: UnsafeCell::new(InlineRegion([0u8; N])),
            cursor: AtomicUsize::new(0),
        }
    }

    /// Total capacity of the inline region in bytes.
    #[inline]
    pub const fn capacity(&self) -> usize {
        N
    }

    /// Bytes consumed so far.
    #[inline]
    pub fn used(&self) -> usize {
        self.cursor.load(Ordering::Acquire)
    }

    /// Bytes still available.
    #[inline]
    pub fn available(&self) -> usize {
        N - self.used()
    }

    #[inline]
    fn base(&self) -> *mut u8 {
        self.region.get().cast::<u8>()
    }
}

impl<const N: usize> Default for StackAllocator<N> {
    fn default() -> Self {
        Self::new()
    }
}

// SAFETY: the region base is MAX_SCALAR_ALIGN-aligned by the repr and the
// cursor advances only by rounded amounts, so claimed offsets (and the
// addresses derived from them) keep the alignment guarantee; the CAS hands
// each range to exactly one caller.
unsafe impl<const N: usize> Allocator for StackAllocator<N> {
    fn allocate(&self, size: usize) -> AllocResult<NonNull<u8>> {
        let rounded = align_up(size, MAX_SCALAR_ALIGN);
        let mut backoff = Backoff::new();
        let mut current = self.cursor.load(Ordering::Acquire);

        loop {
            let next = match current.checked_add(rounded) {
                Some(next) if next <= N => next,
                _ => return Err(AllocError::region_overflow(N, size)),
            };

            match self
                .cursor
                .compare_exchange_weak(current, next, Ordering::AcqRel, Ordering::Acquire)
            {
                Ok(_) => {
                    // SAFETY: current <= N, so the offset address stays
                    // inside (or one past) the region and is never null.
                    return Ok(unsafe { NonNull::new_unchecked(self.base().add(current)) });
                },
                Err(observed) => {
                    current = observed;
                    backoff.spin();
                },
            }
        }
    }

    unsafe fn deallocate(&self, _ptr: NonNull<u8>) {
        // Monotonic region: individual blocks are never released.
    }

    unsafe fn usable_size(&self, ptr: Option<NonNull<u8>>) -> usize {
        match ptr {
            // Span from the block to the end of the region; exact for the
            // most recent allocation, an upper region bound for earlier
            // ones, and always at least the granted size.
            Some(ptr) => N - (ptr.as_ptr() as usize - self.base() as usize),
            None => N,
        }
    }
}

impl<const N: usize> MemoryUsage for StackAllocator<N> {
    fn used_memory(&self) -> usize {
        self.used()
    }

    fn available_memory(&self) -> Option<usize> {
        Some(self.available())
    }

    fn total_memory(&self) -> Option<usize> {
        Some(N)
    }
}

// SAFETY: the cursor CAS hands out disjoint ranges; the region cell is Sync.
unsafe impl<const N: usize> ThreadSafeAllocator for StackAllocator<N> {}

impl<const N: usize> core::fmt::Debug for StackAllocator<N> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("StackAllocator")
            .field("capacity", &N)
            .field("used", &self.used())
            .finish()
    }
}
