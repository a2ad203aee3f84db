//! Integration tests for the owning byte buffer
//!
//! Value semantics under a tracking scope: copies draw fresh storage,
//! moves transfer it, and everything returns to the tracker.

use onyx_memory::allocator::{BoundedAllocator, SystemAllocator, TrackExt};
use onyx_memory::buffer::Buffer;
use onyx_memory::scope::ScopedAllocator;

#[test]
fn buffers_balance_a_tracking_scope() {
    let tracker = SystemAllocator::new().with_tracking();

    {
        let _scope = ScopedAllocator::new(&tracker);

        let mut buffer1 = Buffer::new(100);
        let mut buffer2 = Buffer::new(200);

        assert_eq!(buffer1.len(), 100);
        assert_eq!(buffer2.len(), 200);
        assert_eq!(tracker.allocated_bytes(), 300);

        buffer1[0] = 42;
        buffer1[99] = 84;
        buffer2[0] = 1;
        buffer2[199] = 2;

        assert_eq!(buffer1[0], 42);
        assert_eq!(buffer1[99], 84);
        assert_eq!(buffer2[0], 1);
        assert_eq!(buffer2[199], 2);
    }

    assert_eq!(tracker.allocated_bytes(), 0);
}

#[test]
fn copies_duplicate_contents_into_fresh_storage() {
    let tracker = SystemAllocator::new().with_tracking();
    let _scope = ScopedAllocator::new(&tracker);

    let mut original = Buffer::new(100);
    original[0] = 42;
    original[99] = 84;

    let copy = original.clone();
    assert_eq!(copy.len(), 100);
    assert_eq!(copy[0], 42);
    assert_eq!(copy[99], 84);
    assert_ne!(copy.as_ptr(), original.as_ptr());

    // Assignment through clone_from replaces the old contents.
    let mut assigned = Buffer::default();
    assert_eq!(assigned.len(), 0);
    assert!(assigned.as_ptr().is_null());

    assigned.clone_from(&copy);
    assert_eq!(assigned.len(), 100);
    assert_eq!(assigned[0], 42);
    assert_eq!(assigned[99], 84);

    drop(original);
    drop(copy);
    drop(assigned);
    assert_eq!(tracker.allocated_bytes(), 0);
}

#[test]
fn moves_transfer_storage_and_empty_the_source() {
    let tracker = SystemAllocator::new().with_tracking();
    let _scope = ScopedAllocator::new(&tracker);

    let mut original = Buffer::new(100);
    original[0] = 42;
    original[99] = 84;
    let data_before = original.as_ptr();

    let mut moved = original.take();
    assert_eq!(original.len(), 0);
    assert!(original.as_ptr().is_null());
    assert_eq!(moved.len(), 100);
    assert_eq!(moved.as_ptr(), data_before);
    assert_eq!(moved[0], 42);
    assert_eq!(moved[99], 84);

    // Chained move: the middle buffer is emptied in turn.
    let target = moved.take();
    assert_eq!(moved.len(), 0);
    assert!(moved.as_ptr().is_null());
    assert_eq!(target.len(), 100);
    assert_eq!(target[0], 42);

    drop(original);
    drop(moved);
    drop(target);
    assert_eq!(tracker.allocated_bytes(), 0);
}

#[test]
fn exhausted_allocator_yields_an_empty_buffer() {
    let bounded = BoundedAllocator::new(10);
    let _scope = ScopedAllocator::new(&bounded);

    let buffer = Buffer::new(100);
    assert_eq!(buffer.len(), 0);
    assert!(buffer.as_ptr().is_null());

    // A fitting request still works afterwards.
    let small = Buffer::new(10);
    assert_eq!(small.len(), 10);
}

#[test]
fn copies_belong_to_the_current_scope() {
    let outer = SystemAllocator::new().with_tracking();
    let inner = SystemAllocator::new().with_tracking();

    let _outer_scope = ScopedAllocator::new(&outer);
    let original = Buffer::new(50);
    assert_eq!(outer.allocated_bytes(), 50);

    {
        // A copy made under a different scope draws from that scope.
        let _inner_scope = ScopedAllocator::new(&inner);
        let copy = original.clone();
        assert_eq!(copy.len(), 50);
        assert_eq!(inner.allocated_bytes(), 50);
        assert!(copy.allocator().ptr_eq(&inner));
    }

    assert_eq!(inner.allocated_bytes(), 0);
    assert_eq!(outer.allocated_bytes(), 50);
}
