/*!
 * Free Capacity Tests
 * Free, used and percentage figures derived from the free lists
 */

use freelist_inspector::heap::{FreeBreakdown, FreeListSpace, HeapLayout, UsageLevel};
use freelist_inspector::snapshot::builder::SPACE_ADDRESS;
use freelist_inspector::{InspectError, SyntheticHeap};
use pretty_assertions::assert_eq;

fn base_heap() -> freelist_inspector::snapshot::SyntheticHeapBuilder {
    SyntheticHeap::builder(HeapLayout::lp64())
        .object(512)
        .free_chunk(3)
        .object(256)
        .free_chunk(400)
        .object(64)
}

#[test]
fn test_used_plus_free_equals_capacity() {
    let heap = base_heap().linear_block(10).build().unwrap();
    let space = heap.space();
    let figures = space.figures().unwrap();

    assert_eq!(figures.capacity, heap.bounds.capacity());
    assert_eq!(figures.free, (3 + 400 + 10) * 8);
    assert_eq!(figures.free, heap.listed_free_bytes);
    assert_eq!(figures.used + figures.free, figures.capacity);
    assert_eq!(space.used().unwrap(), figures.used);
}

#[test]
fn test_breakdown_per_source() {
    let heap = base_heap().linear_block(10).build().unwrap();
    let (_, breakdown) = heap.space().figures_with_breakdown().unwrap();

    assert_eq!(
        breakdown,
        FreeBreakdown {
            indexed_words: 3,
            dictionary_words: 400,
            linear_block_words: 10,
        }
    );
}

#[test]
fn test_indexed_entries_add_exactly_their_words() {
    let before = base_heap().build().unwrap();
    let after = base_heap().indexed_entries(7, 2).build().unwrap();

    let delta = after.space().free().unwrap() - before.space().free().unwrap();
    assert_eq!(delta, 7 * 2 * 8);
    assert_eq!(
        before.space().capacity().unwrap(),
        after.space().capacity().unwrap()
    );
}

#[test]
fn test_dictionary_entries_add_exactly_their_words() {
    let before = base_heap().build().unwrap();
    let after = base_heap().dictionary_entries(20, 1).build().unwrap();

    let delta = after.space().free().unwrap() - before.space().free().unwrap();
    assert_eq!(delta, 20 * 8);
    assert_eq!(
        after.space().collector_state().dictionary().unwrap().total_free_blocks().unwrap(),
        2
    );
}

#[test]
fn test_linear_block_counts_as_free() {
    let without = base_heap().build().unwrap();
    let with = base_heap().linear_block(16).build().unwrap();

    assert_eq!(
        with.space().free().unwrap() - without.space().free().unwrap(),
        16 * 8
    );
    assert_eq!(with.space().used().unwrap(), without.space().used().unwrap());
    let lab = with
        .space()
        .collector_state()
        .linear_allocation_buffer()
        .unwrap();
    assert_eq!(lab.bump_pointer().unwrap(), with.bounds.end() - 16 * 8);
}

#[test]
fn test_large_size_class_boundary() {
    let heap = SyntheticHeap::builder(HeapLayout::lp64())
        .object(24)
        .free_chunk(256)
        .free_chunk(257)
        .build()
        .unwrap();
    let (_, breakdown) = heap.space().figures_with_breakdown().unwrap();

    assert_eq!(breakdown.indexed_words, 256);
    assert_eq!(breakdown.dictionary_words, 257);
}

#[test]
fn test_used_percentage() {
    let heap = SyntheticHeap::builder(HeapLayout::lp64())
        .object(600)
        .free_chunk(25)
        .build()
        .unwrap();
    let space = heap.space();

    assert_eq!(space.capacity().unwrap(), 800);
    assert_eq!(space.used().unwrap(), 600);
    assert_eq!(space.used_percentage().unwrap(), 75);
    assert_eq!(UsageLevel::from_percentage(75), UsageLevel::Medium);
}

#[test]
fn test_used_percentage_rounds_down() {
    // 1000 bytes of capacity, 272 free
    let heap = SyntheticHeap::builder(HeapLayout::lp64())
        .object(728)
        .free_chunk(34)
        .build()
        .unwrap();
    let space = heap.space();

    assert_eq!(space.capacity().unwrap(), 1000);
    assert_eq!(space.used_percentage().unwrap(), 72);
}

#[test]
fn test_fully_free_and_fully_used() {
    let free = SyntheticHeap::builder(HeapLayout::lp64())
        .free_chunk(100)
        .build()
        .unwrap();
    assert_eq!(free.space().used_percentage().unwrap(), 0);

    let used = SyntheticHeap::builder(HeapLayout::lp64())
        .object(800)
        .build()
        .unwrap();
    assert_eq!(used.space().used_percentage().unwrap(), 100);
    assert_eq!(used.space().free().unwrap(), 0);
}

#[test]
fn test_zero_capacity_percentage_not_applicable() {
    let heap = SyntheticHeap::builder(HeapLayout::lp64()).build().unwrap();
    let space = heap.space();

    assert_eq!(space.capacity().unwrap(), 0);
    assert_eq!(space.used().unwrap(), 0);
    assert!(matches!(
        space.used_percentage(),
        Err(InspectError::NotApplicable(_))
    ));
}

#[test]
fn test_free_exceeding_capacity_is_invariant_violation() {
    let heap = SyntheticHeap::builder(HeapLayout::lp64())
        .object(24)
        .dictionary_entries(100, 1)
        .build()
        .unwrap();

    assert!(heap.space().free().is_ok());
    assert!(matches!(
        heap.space().used(),
        Err(InspectError::InvariantViolation { .. })
    ));
}

#[test]
fn test_capacity_survives_truncated_walk() {
    let heap = SyntheticHeap::builder(HeapLayout::lp64())
        .object(24)
        .free_chunk(3)
        .unparsable(48)
        .free_chunk(5)
        .build()
        .unwrap();
    let space = heap.space();

    assert!(!space.live_regions().unwrap().is_complete());
    assert_eq!(space.free().unwrap(), (3 + 5) * 8);
    assert_eq!(space.used().unwrap(), 24 + 48);
}

#[test]
fn test_wild_dictionary_handle_is_invariant_violation() {
    let mut heap = base_heap().build().unwrap();
    let layout = heap.context().layout.clone();
    heap.snapshot
        .image
        .write_word(SPACE_ADDRESS + layout.space.dictionary, (usize::MAX - 3) as u64, 8)
        .unwrap();

    assert!(matches!(
        heap.space().free(),
        Err(InspectError::InvariantViolation { address, .. }) if address == usize::MAX - 3
    ));
    assert!(heap.space().figures().is_err());
}

#[test]
fn test_wild_space_address_is_invariant_violation() {
    let heap = base_heap().build().unwrap();
    let space = FreeListSpace::attach(heap.image(), heap.context(), usize::MAX - 3);

    assert!(matches!(
        space.free(),
        Err(InspectError::InvariantViolation { .. })
    ));
}
