//! Owning byte buffer
//!
//! A contiguous byte region whose storage comes from the allocator stack.
//! The buffer captures the allocator active at construction and frees
//! through it on drop; copies draw fresh storage from whatever the
//! *current* scope installs, because a copy belongs to the scope that made
//! it.

use core::ops::{Deref, DerefMut};
use core::ptr::{self, NonNull};

use crate::scope::{self, AllocatorRef};

/// Owning, allocator-backed byte region
///
/// Invariants:
/// - `len() == 0` exactly when no storage is held (`as_ptr()` is null)
/// - non-empty storage was obtained from, and is returned to, the captured
///   allocator, which must outlive the buffer
///
/// Allocation failure is not an error here: a buffer that could not get its
/// storage is simply empty, and callers check `len()`.
pub struct Buffer {
    data: Option<NonNull<u8>>,
    len: usize,
    allocator: AllocatorRef,
}

impl Buffer {
    /// Creates a buffer of `len` zeroed bytes from the current allocator.
    ///
    /// With `len == 0`, or when the allocator refuses the request, the
    /// buffer is empty.
    pub fn new(len: usize) -> Self {
        let allocator = scope::current();
        if len == 0 {
            return Self { data: None, len: 0, allocator };
        }

        // SAFETY: the captured allocator is the live top of this thread's
        // stack (or the 'static fallback).
        match unsafe { allocator.allocate(len) } {
            Ok(ptr) => {
                // SAFETY: the block is writable for at least len bytes.
                unsafe { ptr::write_bytes(ptr.as_ptr(), 0, len) };
                Self { data: Some(ptr), len, allocator }
            },
            Err(_err) => {
                #[cfg(feature = "logging")]
                tracing::warn!(requested = len, error = %_err, "buffer allocation failed");
                Self { data: None, len: 0, allocator }
            },
        }
    }

    /// Number of bytes held.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Checks whether the buffer holds no storage.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Base address of the bytes; null for an empty buffer.
    #[inline]
    pub fn as_ptr(&self) -> *const u8 {
        self.data.map_or(ptr::null(), |ptr| ptr.as_ptr() as *const u8)
    }

    /// Mutable base address of the bytes; null for an empty buffer.
    #[inline]
    pub fn as_mut_ptr(&mut self) -> *mut u8 {
        self.data.map_or(ptr::null_mut(), NonNull::as_ptr)
    }

    /// The allocator this buffer frees through.
    pub fn allocator(&self) -> AllocatorRef {
        self.allocator
    }

    /// The bytes as a slice.
    pub fn as_slice(&self) -> &[u8] {
        match self.data {
            // SAFETY: len bytes were allocated, zero-initialized or written
            // through this buffer, and stay valid until drop.
            Some(ptr) => unsafe { core::slice::from_raw_parts(ptr.as_ptr(), self.len) },
            None => &[],
        }
    }

    /// The bytes as a mutable slice.
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        match self.data {
            // SAFETY: as for as_slice, and &mut self gives exclusivity.
            Some(ptr) => unsafe { core::slice::from_raw_parts_mut(ptr.as_ptr(), self.len) },
            None => &mut [],
        }
    }

    /// Moves the storage out, leaving this buffer empty.
    ///
    /// The returned buffer keeps the original captured allocator; `self`
    /// ends up with `len() == 0` and a null data pointer.
    pub fn take(&mut self) -> Buffer {
        core::mem::take(self)
    }
}

impl Default for Buffer {
    /// An empty buffer; captures the current allocator for symmetry but
    /// holds no storage.
    fn default() -> Self {
        Self {
            data: None,
            len: 0,
            allocator: scope::current(),
        }
    }
}

impl Clone for Buffer {
    /// Duplicates the contents into storage from the *current* scope.
    ///
    /// An allocation failure yields an empty buffer, like [`Buffer::new`].
    fn clone(&self) -> Self {
        let mut copy = Buffer::new(self.len);
        if copy.len == self.len {
            copy.as_mut_slice().copy_from_slice(self.as_slice());
        }
        copy
    }
}

impl Drop for Buffer {
    fn drop(&mut self) {
        if let Some(ptr) = self.data {
            // SAFETY: ptr came from the captured allocator, which outlives
            // the buffer, and is released exactly once.
            unsafe { self.allocator.deallocate(ptr) };
        }
    }
}

impl Deref for Buffer {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        self.as_slice()
    }
}

impl DerefMut for Buffer {
    fn deref_mut(&mut self) -> &mut [u8] {
        self.as_mut_slice()
    }
}

impl core::fmt::Debug for Buffer {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Buffer")
            .field("len", &self.len)
            .field("allocator", &self.allocator.as_ptr())
            .finish()
    }
}
