//! Monotonic scratch allocator
//!
//! Owns one contiguous heap region for its whole lifetime. Allocation bumps
//! an atomic cursor; individual blocks are never released, the region goes
//! back to the heap when the allocator is dropped.
//!
//! ## Invariants
//!
//! - the cursor only moves forward, in call order
//! - every returned address is aligned to `MAX_SCALAR_ALIGN` (requests are
//!   rounded up, so the cursor stays aligned)
//! - a request that does not fit fails without moving the cursor
//!
//! ## Memory ordering
//!
//! - Acquire loads of the cursor see all previously published allocations
//! - the CAS uses `AcqRel` so a successful bump both claims the range and
//!   publishes it

use core::cell::UnsafeCell;
use core::ptr::NonNull;
use core::sync::atomic::{AtomicUsize, Ordering};

use super::{Allocator, MemoryUsage, ThreadSafeAllocator};
use crate::error::{AllocError, AllocResult};
use crate::utils::{align_up, Backoff, MAX_SCALAR_ALIGN};

/// Interior-mutable byte region shared through `&self`.
#[repr(transparent)]
struct RegionCell(UnsafeCell<[u8]>);

// SAFETY: the atomic cursor hands every byte range to exactly one caller;
// the cell only provides the aliasing-legal route to write those ranges.
unsafe impl Sync for RegionCell {}
// SAFETY: plain owned bytes, no thread affinity.
unsafe impl Send for RegionCell {}

/// Bump allocator over a single heap-owned region
///
/// `deallocate` is a no-op; there is no per-block free and no reset.
pub struct ScratchAllocator {
    region: Box<RegionCell>,
    end_addr: usize,
    cursor: AtomicUsize,
}

impl ScratchAllocator {
    /// Allocates a region of `size` bytes from the system heap.
    ///
    /// # Errors
    /// Fails for a zero-size region.
    pub fn new(size: usize) -> AllocResult<Self> {
        if size == 0 {
            return Err(AllocError::invalid_size(0, "scratch region cannot be empty"));
        }

        let boxed = vec![0u8; size].into_boxed_slice();
        let len = boxed.len();
        let raw = Box::into_raw(boxed).cast::<u8>();
        // SAFETY: RegionCell is repr(transparent) over UnsafeCell<[u8]>,
        // which is repr(transparent) over [u8]; ownership moves through
        // into_raw/from_raw with the length preserved.
        let region: Box<RegionCell> = unsafe {
            Box::from_raw(core::ptr::slice_from_raw_parts_mut(raw, len) as *mut RegionCell)
        };

        let start_addr = region.0.get() as *mut u8 as usize;
        Ok(Self {
            region,
            end_addr: start_addr + size,
            cursor: AtomicUsize::new(start_addr),
        })
    }

    #[inline]
    fn base_addr(&self) -> usize {
        self.region.0.get() as *mut u8 as usize
    }

    /// Total capacity of the region in bytes.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.end_addr - self.base_addr()
    }

    /// Bytes consumed so far.
    #[inline]
    pub fn used(&self) -> usize {
        self.cursor.load(Ordering::Acquire) - self.base_addr()
    }

    /// Bytes still available.
    #[inline]
    pub fn available(&self) -> usize {
        self.end_addr - self.cursor.load(Ordering::Acquire)
    }

    fn try_bump(&self, size: usize) -> AllocResult<NonNull<u8>> {
        let rounded = align_up(size, MAX_SCALAR_ALIGN);
        let mut backoff = Backoff::new();
        let mut current = self.cursor.load(Ordering::Acquire);

        loop {
            // The heap base carries no alignment promise of its own, so the
            // claimed address is realigned on every bump.
            let claimed = align_up(current, MAX_SCALAR_ALIGN);
            let next = claimed
                .checked_add(rounded)
                .ok_or(AllocError::SizeOverflow { size })?;
            if next > self.end_addr {
                return Err(AllocError::region_overflow(self.capacity(), size));
            }

            match self
                .cursor
                .compare_exchange_weak(current, next, Ordering::AcqRel, Ordering::Acquire)
            {
                // SAFETY: the CAS claimed [claimed, next) exclusively and
                // claimed is non-zero (it points into a live heap region).
                Ok(_) => return Ok(unsafe { NonNull::new_unchecked(claimed as *mut u8) }),
                Err(observed) => {
                    current = observed;
                    backoff.spin();
                },
            }
        }
    }
}

// SAFETY: try_bump realigns every claimed address to MAX_SCALAR_ALIGN and
// the CAS hands each byte range to exactly one caller, so returned blocks
// are aligned, disjoint, and live until the allocator drops.
unsafe impl Allocator for ScratchAllocator {
    fn allocate(&self, size: usize) -> AllocResult<NonNull<u8>> {
        self.try_bump(size)
    }

    unsafe fn deallocate(&self, _ptr: NonNull<u8>) {
        // Monotonic region: individual blocks are never released.
    }

    unsafe fn usable_size(&self, ptr: Option<NonNull<u8>>) -> usize {
        match ptr {
            // Span from the block to the end of the region; exact for the
            // most recent allocation, an upper region bound for earlier
            // ones, and always at least the granted size.
            Some(ptr) => self.end_addr - ptr.as_ptr() as usize,
            None => self.capacity(),
        }
    }
}

impl MemoryUsage for ScratchAllocator {
    fn used_memory(&self) -> usize {
        self.used()
    }

    fn available_memory(&self) -> Option<usize> {
        Some(self.available())
    }

    fn total_memory(&self) -> Option<usize> {
        Some(self.capacity())
    }
}

// SAFETY: the cursor CAS hands out disjoint ranges; the region cell is Sync.
unsafe impl ThreadSafeAllocator for ScratchAllocator {}

impl core::fmt::Debug for ScratchAllocator {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ScratchAllocator")
            .field("capacity", &self.capacity())
            .field("used", &self.used())
            .finish()
    }
}
