//! Per-thread allocator stack
//!
//! Each thread carries its own stack of active allocator references. The
//! typed layer and [`Buffer`](crate::buffer::Buffer) consult the top of the
//! stack, so any scope can redirect allocations without changing call
//! sites. When the stack is empty, a process-wide [`SystemAllocator`]
//! answers instead.
//!
//! Stacks of different threads are fully independent: a push on one thread
//! is never visible from another.
//!
//! ## Stack discipline
//!
//! Entries are non-owning. Whoever pushes an allocator guarantees it stays
//! alive and in place until the matching pop; [`ScopedAllocator`] and
//! [`with_allocator`] uphold that guarantee structurally, raw
//! [`push`]/[`pop`] leave it to the caller.

use core::marker::PhantomData;
use core::ptr::NonNull;
use std::cell::RefCell;

use crate::allocator::{Allocator, SystemAllocator};
use crate::error::AllocResult;

thread_local! {
    static STACK: RefCell<Vec<AllocatorRef>> = const { RefCell::new(Vec::new()) };
}

/// Process-wide fallback consulted when a thread's stack is empty.
static FALLBACK: SystemAllocator = SystemAllocator::new();

// ============================================================================
// AllocatorRef
// ============================================================================

/// Copyable, non-owning reference to an allocator
///
/// The currency of the allocator stack: what [`current`] returns, what
/// [`Buffer`](crate::buffer::Buffer) and allocator-aware values capture.
/// Lifetime is erased; dereferencing methods are `unsafe` and rely on the
/// stack discipline above. Equality compares allocator identity (the
/// address of the instance).
#[derive(Debug, Clone, Copy)]
pub struct AllocatorRef {
    ptr: NonNull<dyn Allocator>,
}

impl AllocatorRef {
    /// Captures a reference to `allocator`, erasing its lifetime.
    pub fn new(allocator: &dyn Allocator) -> Self {
        // SAFETY: only the lifetime is erased; every dereference below is
        // gated on the referent still being alive (stack discipline or the
        // capturing container's own invariant).
        let erased: &'static dyn Allocator = unsafe { core::mem::transmute(allocator) };
        Self {
            ptr: NonNull::from(erased),
        }
    }

    /// Reference to the process-wide system allocator.
    pub fn system() -> Self {
        Self::new(&FALLBACK)
    }

    /// The referenced allocator instance, by address.
    pub fn as_ptr(&self) -> *const dyn Allocator {
        self.ptr.as_ptr()
    }

    /// Checks whether this reference points at `allocator`.
    pub fn ptr_eq(&self, allocator: &dyn Allocator) -> bool {
        self.ptr.cast::<u8>() == NonNull::from(allocator).cast::<u8>()
    }

    /// Borrows the referenced allocator.
    ///
    /// # Safety
    /// The referent must still be alive and at the captured address.
    pub unsafe fn get(&self) -> &dyn Allocator {
        // SAFETY: caller contract.
        unsafe { self.ptr.as_ref() }
    }

    /// Allocates through the referenced allocator.
    ///
    /// # Safety
    /// The referent must still be alive and at the captured address.
    pub unsafe fn allocate(&self, size: usize) -> AllocResult<NonNull<u8>> {
        // SAFETY: caller contract.
        unsafe { self.get().allocate(size) }
    }

    /// Deallocates through the referenced allocator.
    ///
    /// # Safety
    /// Same as [`get`](Self::get), plus the block contract of
    /// [`Allocator::deallocate`].
    pub unsafe fn deallocate(&self, ptr: NonNull<u8>) {
        // SAFETY: caller contract.
        unsafe { self.get().deallocate(ptr) }
    }

    /// Queries a usable size through the referenced allocator.
    ///
    /// # Safety
    /// Same as [`get`](Self::get), plus the block contract of
    /// [`Allocator::usable_size`].
    pub unsafe fn usable_size(&self, ptr: Option<NonNull<u8>>) -> usize {
        // SAFETY: caller contract.
        unsafe { self.get().usable_size(ptr) }
    }
}

impl PartialEq for AllocatorRef {
    fn eq(&self, other: &Self) -> bool {
        self.ptr.cast::<u8>() == other.ptr.cast::<u8>()
    }
}

impl Eq for AllocatorRef {}

// ============================================================================
// Stack operations
// ============================================================================

/// The process-wide default allocator (the empty-stack fallback).
pub fn default_allocator() -> &'static dyn Allocator {
    &FALLBACK
}

/// Returns the top of the current thread's stack, or the process default.
///
/// Never fails; an empty stack falls back to [`default_allocator`].
pub fn current() -> AllocatorRef {
    STACK
        .with(|stack| stack.borrow().last().copied())
        .unwrap_or_else(AllocatorRef::system)
}

/// Number of entries on the current thread's stack.
pub fn depth() -> usize {
    STACK.with(|stack| stack.borrow().len())
}

/// Pushes a non-owning reference onto the current thread's stack.
///
/// # Safety
/// `allocator` must stay alive and at the same address until the matching
/// [`pop`] on this thread. Prefer [`ScopedAllocator`] or
/// [`with_allocator`], which enforce this.
pub unsafe fn push(allocator: &dyn Allocator) {
    let entry = AllocatorRef::new(allocator);
    STACK.with(|stack| stack.borrow_mut().push(entry));

    #[cfg(feature = "logging")]
    tracing::trace!(depth = depth(), "allocator pushed");
}

/// Removes and returns the top of the current thread's stack.
///
/// Returns `None` when the stack is empty (an unbalanced pop is a caller
/// bug; callers typically assert on the returned entry).
pub fn pop() -> Option<AllocatorRef> {
    let entry = STACK.with(|stack| stack.borrow_mut().pop());

    #[cfg(feature = "logging")]
    tracing::trace!(depth = depth(), popped = entry.is_some(), "allocator popped");

    entry
}

/// Runs `f` with a borrow of the current allocator.
///
/// The safe way to use whatever the scope has installed: the borrow cannot
/// outlive the call, and stack entries are live for its duration by the
/// stack discipline.
pub fn with_current<R>(f: impl FnOnce(&dyn Allocator) -> R) -> R {
    let current = current();
    // SAFETY: stack entries are alive until popped (stack discipline); the
    // fallback is 'static. The borrow ends before this frame returns.
    f(unsafe { current.get() })
}

/// Runs `f` with `allocator` installed as the current allocator.
///
/// Push and pop are balanced on every exit path, including panics.
pub fn with_allocator<R>(allocator: &dyn Allocator, f: impl FnOnce() -> R) -> R {
    let _guard = ScopedAllocator::new(allocator);
    f()
}

// ============================================================================
// ScopedAllocator
// ============================================================================

/// RAII guard that installs an allocator for the current scope
///
/// Pushes on construction, pops exactly one entry on drop. The guard is
/// neither `Send` nor `Sync` (it must pop on the thread that pushed) and is
/// not copyable.
///
/// Leaking the guard (e.g. `mem::forget`) skips the pop; the entry then
/// stays on the stack and the allocator must outlive the thread.
#[must_use = "dropping the guard immediately pops the allocator again"]
pub struct ScopedAllocator<'a> {
    pushed: AllocatorRef,
    _borrow: PhantomData<&'a dyn Allocator>,
}

impl<'a> ScopedAllocator<'a> {
    /// Installs `allocator` on the current thread's stack.
    pub fn new(allocator: &'a dyn Allocator) -> Self {
        // SAFETY: the guard borrows the allocator for 'a and pops on drop,
        // so the entry never outlives the referent.
        unsafe { push(allocator) };
        Self {
            pushed: AllocatorRef::new(allocator),
            _borrow: PhantomData,
        }
    }

    /// The allocator this guard installed.
    pub fn allocator(&self) -> AllocatorRef {
        self.pushed
    }
}

impl Drop for ScopedAllocator<'_> {
    fn drop(&mut self) {
        let popped = pop();
        debug_assert!(
            matches!(popped, Some(entry) if entry == self.pushed),
            "allocator scope popped an entry it did not push"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allocator::BoundedAllocator;

    #[test]
    fn empty_stack_falls_back_to_system() {
        assert_eq!(depth(), 0);
        assert!(current().ptr_eq(default_allocator()));
    }

    #[test]
    fn guard_restores_previous_top() {
        let outer = BoundedAllocator::new(1024);
        let inner = BoundedAllocator::new(64);

        let _outer_guard = ScopedAllocator::new(&outer);
        assert!(current().ptr_eq(&outer));

        {
            let _inner_guard = ScopedAllocator::new(&inner);
            assert!(current().ptr_eq(&inner));
        }

        assert!(current().ptr_eq(&outer));
    }

    #[test]
    fn with_allocator_balances_on_panic() {
        let allocator = BoundedAllocator::new(64);
        let before = depth();

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            with_allocator(&allocator, || panic!("boom"));
        }));

        assert!(result.is_err());
        assert_eq!(depth(), before);
    }
}
