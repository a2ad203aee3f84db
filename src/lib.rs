//! # onyx-memory
//!
//! Pluggable memory-management core: a family of allocators behind one
//! contract, a per-thread allocator stack that lets any scope redirect
//! allocations without changing call sites, allocator-aware object
//! construction, and value types built on top of those services.
//!
//! ## Quick start
//!
//! ```rust
//! use onyx_memory::prelude::*;
//!
//! let tracker = SystemAllocator::new().with_tracking();
//!
//! onyx_memory::scope::with_allocator(&tracker, || {
//!     let buffer = Buffer::new(256);
//!     assert_eq!(buffer.len(), 256);
//!     assert_eq!(tracker.allocated_bytes(), 256);
//! });
//!
//! assert_eq!(tracker.allocated_bytes(), 0);
//! ```
//!
//! ## Architecture
//!
//! - [`allocator`] — the `Allocator` contract and its implementations:
//!   system heap, capacity-gated wrapper, heap-backed scratch region,
//!   inline stack region, and a statistics decorator
//! - [`scope`] — the per-thread allocator stack with scoped installation
//! - [`typed`] — allocator-aware construct/destroy for plain and
//!   allocator-capturing values
//! - [`outcome`] — a result-or-error value carrier
//! - [`buffer`] — an owning byte region drawing storage from the stack
//!
//! Allocators never own each other and the stack never owns its entries;
//! whoever installs an allocator keeps it alive for the whole scope.
//!
//! ## Features
//!
//! - `logging` (default): structured logging via `tracing` for scope
//!   transitions and surfaced allocation failures

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![warn(clippy::all)]

pub mod allocator;
pub mod buffer;
pub mod error;
pub mod outcome;
pub mod scope;
pub mod typed;
pub mod utils;

pub use crate::allocator::{
    Allocator, AllocatorExt, BoundedAllocator, MemoryUsage, ScratchAllocator, StackAllocator,
    SystemAllocator, TrackExt, TrackedAllocator,
};
pub use crate::buffer::Buffer;
pub use crate::error::{AllocError, AllocResult};
pub use crate::outcome::Outcome;
pub use crate::scope::{AllocatorRef, ScopedAllocator};
pub use crate::typed::{AllocatorAware, CapturedAllocator};

/// Convenient re-exports of the commonly used types and traits.
pub mod prelude {
    pub use crate::allocator::{
        Allocator, AllocatorExt, AllocatorStats, BoundedAllocator, MemoryUsage, ScratchAllocator,
        StackAllocator, StatisticsProvider, SystemAllocator, ThreadSafeAllocator, TrackExt,
        TrackedAllocator,
    };
    pub use crate::buffer::Buffer;
    pub use crate::error::{AllocError, AllocResult};
    pub use crate::outcome::Outcome;
    pub use crate::scope::{AllocatorRef, ScopedAllocator};
    pub use crate::typed::{AllocatorAware, CapturedAllocator};
    pub use crate::utils::MAX_SCALAR_ALIGN;
}
