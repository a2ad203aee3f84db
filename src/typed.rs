//! Allocator-aware object construction
//!
//! Two construction paths share the thread's allocator stack:
//!
//! - the **plain path** ([`create`]/[`destroy`]) for ordinary values, whose
//!   storage comes from the process default allocator and which carry no
//!   allocator field of their own
//! - the **aware path** ([`create_scoped`]/[`destroy_scoped`]) for types
//!   that embed a [`CapturedAllocator`]: the allocator active at
//!   construction time is captured into the value, and both the value's own
//!   allocations and its boxed storage route through that captured
//!   reference for the value's whole lifetime, even if the stack changes
//!   afterwards
//!
//! Rust has no stable specialization, so the path split is carried by the
//! [`AllocatorAware`] bound instead of a single dispatching entry point.

use core::mem;
use core::ptr::{self, NonNull};

use crate::error::{AllocError, AllocResult};
use crate::scope::{self, AllocatorRef};
use crate::utils::MAX_SCALAR_ALIGN;

// ============================================================================
// Plain path
// ============================================================================

/// Allocates storage from the process default allocator and moves `value`
/// into it.
///
/// Plain values deliberately bypass whatever the scope has installed; their
/// per-object footprint is exactly `size_of::<T>()` and [`destroy`] frees
/// through the same default allocator.
///
/// # Errors
/// Fails when the heap is exhausted or `T` demands an alignment above
/// [`MAX_SCALAR_ALIGN`].
pub fn create<T>(value: T) -> AllocResult<NonNull<T>> {
    if mem::align_of::<T>() > MAX_SCALAR_ALIGN {
        return Err(AllocError::invalid_alignment(mem::align_of::<T>()));
    }

    let raw = scope::default_allocator().allocate(mem::size_of::<T>())?;
    let typed = raw.cast::<T>();
    // SAFETY: the block is writable, large enough for T, and aligned
    // (checked above against the crate guarantee).
    unsafe { typed.as_ptr().write(value) };
    Ok(typed)
}

/// Drops a value created by [`create`] and releases its storage.
///
/// # Safety
/// - `ptr` must come from [`create`]
/// - the value must not have been destroyed already
pub unsafe fn destroy<T>(ptr: NonNull<T>) {
    // SAFETY: ptr refers to a live value whose storage came from the
    // default allocator (caller contract); the block is released once.
    unsafe {
        ptr::drop_in_place(ptr.as_ptr());
        scope::default_allocator().deallocate(ptr.cast());
    }
}

// ============================================================================
// Aware path
// ============================================================================

/// Embeddable base that captures the scope's allocator at construction
///
/// A type opts into allocator-aware construction by holding one of these
/// (typically built with `Default` or [`capture`](Self::capture) in its
/// constructor) and implementing [`AllocatorAware`] by delegation. All of
/// the value's own allocations should go through the captured reference,
/// not through [`scope::current`] again: the top of the stack may change
/// during the value's lifetime, and correctness demands the allocator the
/// value was born with.
#[derive(Debug, Clone, Copy)]
pub struct CapturedAllocator {
    allocator: AllocatorRef,
}

impl CapturedAllocator {
    /// Captures the current top of this thread's allocator stack.
    pub fn capture() -> Self {
        Self {
            allocator: scope::current(),
        }
    }

    /// The allocator captured at construction time.
    pub fn allocator(&self) -> AllocatorRef {
        self.allocator
    }
}

impl Default for CapturedAllocator {
    fn default() -> Self {
        Self::capture()
    }
}

/// Types that captured an allocator at construction
///
/// The captured reference must stay fixed for the value's lifetime (an
/// intentional rebind notwithstanding); [`create_scoped`] and
/// [`destroy_scoped`] use it for the value's own boxed storage.
pub trait AllocatorAware {
    /// The allocator this value routes its allocations through.
    fn allocator(&self) -> AllocatorRef;
}

impl AllocatorAware for CapturedAllocator {
    fn allocator(&self) -> AllocatorRef {
        self.allocator()
    }
}

/// Allocates storage through `value`'s captured allocator and moves `value`
/// into it.
///
/// The storage and the value's internal allocations end up in the same
/// allocator, which is what makes trackers balance: everything the value
/// caused returns to zero after [`destroy_scoped`].
///
/// # Errors
/// Fails when the captured allocator refuses the request or `T` demands an
/// alignment above [`MAX_SCALAR_ALIGN`].
pub fn create_scoped<T: AllocatorAware>(value: T) -> AllocResult<NonNull<T>> {
    if mem::align_of::<T>() > MAX_SCALAR_ALIGN {
        return Err(AllocError::invalid_alignment(mem::align_of::<T>()));
    }

    let allocator = value.allocator();
    // SAFETY: the captured allocator is alive: the value was just
    // constructed under the scope that installed it (stack discipline).
    let raw = unsafe { allocator.allocate(mem::size_of::<T>())? };
    let typed = raw.cast::<T>();
    // SAFETY: the block is writable, large enough for T, and aligned.
    unsafe { typed.as_ptr().write(value) };
    Ok(typed)
}

/// Drops a value created by [`create_scoped`] and releases its storage
/// through the value's captured allocator.
///
/// # Safety
/// - `ptr` must come from [`create_scoped`]
/// - the value must not have been destroyed already
/// - the captured allocator must still be alive
pub unsafe fn destroy_scoped<T: AllocatorAware>(ptr: NonNull<T>) {
    // SAFETY: ptr refers to a live value (caller contract); the allocator
    // is read before the drop so the storage goes back where it came from.
    unsafe {
        let allocator = ptr.as_ref().allocator();
        ptr::drop_in_place(ptr.as_ptr());
        allocator.deallocate(ptr.cast());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_create_round_trips() {
        let ptr = create(42u32).unwrap();
        assert_eq!(unsafe { *ptr.as_ref() }, 42);
        unsafe { destroy(ptr) };
    }

    #[test]
    fn overaligned_types_are_rejected() {
        #[repr(align(64))]
        struct Wide(#[allow(dead_code)] u8);

        assert!(matches!(
            create(Wide(0)),
            Err(AllocError::InvalidAlignment { align: 64 })
        ));
    }

    #[test]
    fn captured_allocator_defaults_to_system() {
        let base = CapturedAllocator::capture();
        assert!(base.allocator().ptr_eq(scope::default_allocator()));
    }
}
