//! Integration tests for the inline stack allocator

use onyx_memory::allocator::{Allocator, MemoryUsage, StackAllocator};
use onyx_memory::utils::{is_aligned, MAX_SCALAR_ALIGN};

#[test]
fn capacity_is_exposed_through_the_contract() {
    let allocator = StackAllocator::<1000>::new();
    assert_eq!(unsafe { allocator.usable_size(None) }, 1000);
}

#[test]
fn small_allocations_stay_aligned_despite_failed_probes() {
    let allocator = StackAllocator::<1000>::new();

    for _ in 0..10 {
        let ptr = allocator.allocate(3).expect("allocation failed");
        assert!(is_aligned(ptr.as_ptr() as usize, MAX_SCALAR_ALIGN));

        // An over-capacity probe fails and must not disturb the cursor.
        assert!(allocator.allocate(1000).is_err());
    }
}

#[test]
fn successive_blocks_are_adjacent_and_distinct() {
    let allocator = StackAllocator::<256>::new();

    let first = allocator.allocate(3).expect("allocation failed");
    let second = allocator.allocate(3).expect("allocation failed");

    assert_ne!(first.as_ptr(), second.as_ptr());
    assert_eq!(
        second.as_ptr() as usize - first.as_ptr() as usize,
        MAX_SCALAR_ALIGN
    );
}

#[test]
fn construction_touches_no_heap() {
    // The whole allocator is one inline value; a const context is enough
    // to build it.
    static ALLOCATOR: StackAllocator<64> = StackAllocator::new();
    assert_eq!(ALLOCATOR.capacity(), 64);
}

#[test]
fn exhaustion_and_usage_reporting() {
    let allocator = StackAllocator::<64>::new();

    let _a = allocator.allocate(16).expect("allocation failed");
    let _b = allocator.allocate(16).expect("allocation failed");
    assert_eq!(allocator.used_memory(), 32);
    assert_eq!(allocator.available_memory(), Some(32));

    assert!(allocator.allocate(33).is_err());
    assert_eq!(allocator.used_memory(), 32);

    let _c = allocator.allocate(32).expect("allocation failed");
    assert_eq!(allocator.available_memory(), Some(0));
}

#[test]
fn blocks_are_writable() {
    let allocator = StackAllocator::<128>::new();

    let ptr = allocator.allocate(5).expect("allocation failed");
    unsafe {
        std::ptr::write_bytes(ptr.as_ptr(), 0xAB, 5);
        assert_eq!(*ptr.as_ptr(), 0xAB);
        assert_eq!(*ptr.as_ptr().add(4), 0xAB);
    }
}
