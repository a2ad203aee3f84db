//! Allocator implementations
//!
//! One raw-byte contract, several backing strategies: the system heap, a
//! capacity-gated wrapper, two monotonic regions (heap-backed and inline),
//! and a statistics decorator that composes over any of them.

mod bounded;
mod scratch;
mod stack;
mod stats;
mod system;
mod tracked;
mod traits;

pub use bounded::BoundedAllocator;
pub use scratch::ScratchAllocator;
pub use stack::StackAllocator;
pub use stats::{AllocatorStats, AtomicAllocatorStats, StatisticsProvider};
pub use system::SystemAllocator;
pub use tracked::{TrackExt, TrackedAllocator};
pub use traits::{Allocator, AllocatorExt, MemoryUsage, ThreadSafeAllocator};
