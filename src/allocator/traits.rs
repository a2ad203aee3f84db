//! The allocator contract and its companion traits
//!
//! The system is built around a small set of traits:
//! - `Allocator`: the raw byte contract every backend implements
//! - `AllocatorExt`: typed construct/destroy helpers layered on top
//! - `ThreadSafeAllocator`: marker for allocators safe to share
//! - `MemoryUsage`: capacity reporting
//!
//! Allocations are self-describing: deallocation and size queries take only
//! the block address, never a layout. Backends either prefix a header
//! ([`SystemAllocator`](super::SystemAllocator)) or never release blocks
//! individually (the region allocators).

use core::mem;
use core::ptr::{self, NonNull};

use crate::error::{AllocError, AllocResult};
use crate::utils::MAX_SCALAR_ALIGN;

/// Raw allocation contract
///
/// Every block handed out is aligned to [`MAX_SCALAR_ALIGN`] and usable for
/// at least the requested number of bytes. The trait is object-safe; the
/// per-thread allocator stack stores `&dyn Allocator` entries.
///
/// # Safety
///
/// Implementors must ensure that:
/// - `allocate` returns blocks aligned to [`MAX_SCALAR_ALIGN`] with usable
///   size at least the request
/// - a block stays valid until it is deallocated through the same instance
/// - `usable_size` reports at least the size originally requested for any
///   live block of this instance
pub unsafe trait Allocator {
    /// Allocates at least `size` bytes.
    ///
    /// A zero-size request returns a valid, dealloctable block of usable
    /// size zero.
    ///
    /// # Errors
    /// Returns an error when the backing store is exhausted or the request
    /// exceeds the allocator's budget or region.
    fn allocate(&self, size: usize) -> AllocResult<NonNull<u8>>;

    /// Releases a block previously returned by this allocator.
    ///
    /// # Safety
    /// - `ptr` must come from `allocate` on this same instance
    /// - the block must not have been deallocated already
    /// - `ptr` must not be used after this call
    unsafe fn deallocate(&self, ptr: NonNull<u8>);

    /// Reports the usable size of a block.
    ///
    /// With `None`, region allocators report their total capacity; block
    /// allocators report zero.
    ///
    /// # Safety
    /// A `Some` pointer must refer to a live block of this instance.
    unsafe fn usable_size(&self, ptr: Option<NonNull<u8>>) -> usize;
}

/// Typed construct/destroy helpers available on every allocator
///
/// The counterpart of placement construction: raw storage comes from the
/// allocator, the value is written in place, and `destroy` runs the drop
/// glue before releasing the storage.
pub trait AllocatorExt: Allocator {
    /// Allocates storage for `T` and moves `value` into it.
    ///
    /// # Errors
    /// Fails when the allocation fails or when `T` demands an alignment
    /// above [`MAX_SCALAR_ALIGN`].
    fn create<T>(&self, value: T) -> AllocResult<NonNull<T>> {
        if mem::align_of::<T>() > MAX_SCALAR_ALIGN {
            return Err(AllocError::invalid_alignment(mem::align_of::<T>()));
        }

        let raw = self.allocate(mem::size_of::<T>())?;
        let typed = raw.cast::<T>();
        // SAFETY: the block is writable, at least size_of::<T>() bytes, and
        // sufficiently aligned (checked above against the crate guarantee).
        unsafe { typed.as_ptr().write(value) };
        Ok(typed)
    }

    /// Drops the value in place and releases its storage.
    ///
    /// # Safety
    /// - `ptr` must come from `create` on this same instance
    /// - the value must not have been destroyed already
    unsafe fn destroy<T>(&self, ptr: NonNull<T>) {
        // SAFETY: ptr refers to a live value created by this allocator
        // (caller contract); after the drop the raw block is released
        // exactly once.
        unsafe {
            ptr::drop_in_place(ptr.as_ptr());
            self.deallocate(ptr.cast());
        }
    }
}

impl<A: Allocator + ?Sized> AllocatorExt for A {}

/// Marker for allocators that can be shared between threads
///
/// # Safety
/// Implementors must synchronize all internal state; concurrent calls to
/// any contract method from multiple threads must be sound.
pub unsafe trait ThreadSafeAllocator: Allocator + Send + Sync {}

/// Capacity reporting
///
/// Implemented by allocators that know how much of their store is in use.
pub trait MemoryUsage {
    /// Currently used memory in bytes
    fn used_memory(&self) -> usize;

    /// Remaining memory in bytes, `None` when unbounded
    fn available_memory(&self) -> Option<usize>;

    /// Total capacity in bytes, `None` when unbounded
    fn total_memory(&self) -> Option<usize> {
        match (self.used_memory(), self.available_memory()) {
            (used, Some(available)) => Some(used + available),
            _ => None,
        }
    }

    /// Usage as a percentage of total capacity, `None` when unbounded
    fn memory_usage_percent(&self) -> Option<f32> {
        self.total_memory().and_then(|total| {
            if total == 0 {
                Some(0.0)
            } else {
                Some((self.used_memory() as f32 / total as f32) * 100.0)
            }
        })
    }
}

// ============================================================================
// Blanket implementations for references
// ============================================================================

// SAFETY: delegation; the referent upholds the contract.
unsafe impl<T: Allocator + ?Sized> Allocator for &T {
    fn allocate(&self, size: usize) -> AllocResult<NonNull<u8>> {
        (**self).allocate(size)
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>) {
        // SAFETY: forwarded caller contract.
        unsafe { (**self).deallocate(ptr) }
    }

    unsafe fn usable_size(&self, ptr: Option<NonNull<u8>>) -> usize {
        // SAFETY: forwarded caller contract.
        unsafe { (**self).usable_size(ptr) }
    }
}

impl<T: MemoryUsage + ?Sized> MemoryUsage for &T {
    fn used_memory(&self) -> usize {
        (**self).used_memory()
    }

    fn available_memory(&self) -> Option<usize> {
        (**self).available_memory()
    }

    fn total_memory(&self) -> Option<usize> {
        (**self).total_memory()
    }
}
