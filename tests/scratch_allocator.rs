//! Integration tests for the monotonic scratch allocator

use onyx_memory::allocator::{Allocator, MemoryUsage, ScratchAllocator};
use onyx_memory::utils::{is_aligned, MAX_SCALAR_ALIGN};

#[test]
fn capacity_is_exposed_through_the_contract() {
    let allocator = ScratchAllocator::new(1000).expect("failed to create scratch region");

    assert_eq!(unsafe { allocator.usable_size(None) }, 1000);

    let ptr = allocator.allocate(10).expect("allocation failed");
    assert!(is_aligned(ptr.as_ptr() as usize, MAX_SCALAR_ALIGN));

    // The region cannot also hold a full-capacity block now.
    assert!(allocator.allocate(1000).is_err());
}

#[test]
fn cursor_is_monotonic_and_stable_on_failure() {
    let allocator = ScratchAllocator::new(256).expect("failed to create scratch region");

    let first = allocator.allocate(10).expect("allocation failed");
    let used_after_first = allocator.used();

    // An oversized request fails and must not move the cursor.
    assert!(allocator.allocate(512).is_err());
    assert_eq!(allocator.used(), used_after_first);

    let second = allocator.allocate(10).expect("allocation failed");
    assert!(second.as_ptr() as usize > first.as_ptr() as usize);
    assert!(allocator.used() > used_after_first);
}

#[test]
fn free_is_a_no_op() {
    let allocator = ScratchAllocator::new(256).expect("failed to create scratch region");

    let ptr = allocator.allocate(32).expect("allocation failed");
    let used = allocator.used();

    unsafe { allocator.deallocate(ptr) };
    assert_eq!(allocator.used(), used);
}

#[test]
fn blocks_are_writable_across_the_region() {
    let allocator = ScratchAllocator::new(1024).expect("failed to create scratch region");

    let mut blocks = Vec::new();
    while let Ok(ptr) = allocator.allocate(100) {
        unsafe { std::ptr::write_bytes(ptr.as_ptr(), blocks.len() as u8, 100) };
        blocks.push(ptr);
    }
    assert!(!blocks.is_empty());

    for (index, ptr) in blocks.iter().enumerate() {
        unsafe {
            assert_eq!(*ptr.as_ptr(), index as u8);
            assert_eq!(*ptr.as_ptr().add(99), index as u8);
        }
    }
}

#[test]
fn usage_reporting_tracks_the_cursor() {
    let allocator = ScratchAllocator::new(512).expect("failed to create scratch region");

    assert_eq!(allocator.total_memory(), Some(512));
    assert_eq!(allocator.used_memory(), 0);

    let _ptr = allocator.allocate(64).expect("allocation failed");
    assert!(allocator.used_memory() >= 64);
    assert!(allocator.available_memory().unwrap() <= 512 - 64);
}

#[test]
fn zero_capacity_is_rejected() {
    assert!(ScratchAllocator::new(0).is_err());
}
