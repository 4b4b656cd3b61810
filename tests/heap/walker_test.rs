/*!
 * Region Walker Tests
 * Live region listing over synthetic heaps, including truncated and corrupt walks
 */

use freelist_inspector::heap::{
    FreeListSpace, HeapLayout, LiveRegion, NoRecovery, RegionWalker, WalkCompletion, WalkConfig,
};
use freelist_inspector::snapshot::builder::{HEAP_BASE, SPACE_ADDRESS};
use freelist_inspector::{InspectError, SyntheticHeap};
use pretty_assertions::assert_eq;

const B: usize = HEAP_BASE;

fn lp64() -> HeapLayout {
    HeapLayout::lp64()
}

fn region(start: usize, end: usize) -> LiveRegion {
    LiveRegion::try_new(start, end).unwrap()
}

#[test]
fn test_alternating_live_and_free() {
    let heap = SyntheticHeap::builder(lp64())
        .object(24)
        .free_chunk(4)
        .object(40)
        .array(8, 3)
        .free_chunk(3)
        .object(32)
        .build()
        .unwrap();

    let regions = heap.space().live_regions().unwrap();

    assert_eq!(
        regions.regions,
        vec![
            region(B, B + 24),
            region(B + 56, B + 144),
            region(B + 168, B + 200),
        ]
    );
    assert_eq!(regions.completion, WalkCompletion::Complete);
    assert_eq!(regions, heap.expected);
    assert_eq!(regions.live_bytes(), heap.live_bytes);
}

#[test]
fn test_heap_of_only_free_chunks_has_no_regions() {
    let heap = SyntheticHeap::builder(lp64())
        .free_chunk(3)
        .free_chunk(300)
        .linear_block(8)
        .build()
        .unwrap();

    let regions = heap.space().live_regions().unwrap();
    assert!(regions.is_empty());
    assert!(regions.is_complete());
}

#[test]
fn test_single_object_fills_space() {
    let heap = SyntheticHeap::builder(lp64()).object(64).build().unwrap();

    let regions = heap.space().live_regions().unwrap();
    assert_eq!(regions.regions, vec![region(B, B + 64)]);
}

#[test]
fn test_empty_space_walk_is_complete() {
    let heap = SyntheticHeap::builder(lp64()).build().unwrap();

    let regions = heap.space().live_regions().unwrap();
    assert!(regions.is_empty());
    assert_eq!(regions.completion, WalkCompletion::Complete);
}

#[test]
fn test_small_objects_are_rounded_to_min_chunk() {
    let heap = SyntheticHeap::builder(lp64())
        .object(8)
        .free_chunk(3)
        .object(16)
        .build()
        .unwrap();

    let regions = heap.space().live_regions().unwrap();
    assert_eq!(
        regions.regions,
        vec![region(B, B + 24), region(B + 48, B + 72)]
    );
}

#[test]
fn test_unparsable_chunk_truncates_walk() {
    let heap = SyntheticHeap::builder(lp64())
        .object(24)
        .free_chunk(3)
        .object(32)
        .unparsable(40)
        .object(24)
        .build()
        .unwrap();

    let regions = heap.space().live_regions().unwrap();

    assert_eq!(
        regions.regions,
        vec![region(B, B + 24), region(B + 48, B + 80)]
    );
    assert_eq!(regions.completion, WalkCompletion::Truncated { at: B + 80 });
    assert_eq!(regions, heap.expected);
}

#[test]
fn test_truncation_right_after_free_chunk() {
    let heap = SyntheticHeap::builder(lp64())
        .free_chunk(3)
        .unparsable(24)
        .build()
        .unwrap();

    let regions = heap.space().live_regions().unwrap();
    assert!(regions.is_empty());
    assert_eq!(regions.completion, WalkCompletion::Truncated { at: B + 24 });
}

#[test]
fn test_marked_unparsable_is_skipped() {
    let heap = SyntheticHeap::builder(lp64())
        .object(24)
        .marked_unparsable(48)
        .object(24)
        .free_chunk(3)
        .build()
        .unwrap();

    let regions = heap.space().live_regions().unwrap();
    assert_eq!(regions.regions, vec![region(B, B + 96)]);
    assert!(regions.is_complete());
}

#[test]
fn test_dangling_descriptor_uses_recovery() {
    let marked = SyntheticHeap::builder(lp64())
        .object(24)
        .dangling_object(32, true)
        .build()
        .unwrap();
    let regions = marked.space().live_regions().unwrap();
    assert_eq!(regions.regions, vec![region(B, B + 56)]);
    assert!(regions.is_complete());

    let unmarked = SyntheticHeap::builder(lp64())
        .object(24)
        .dangling_object(32, false)
        .build()
        .unwrap();
    let regions = unmarked.space().live_regions().unwrap();
    assert_eq!(regions.regions, vec![region(B, B + 24)]);
    assert_eq!(regions.completion, WalkCompletion::Truncated { at: B + 24 });
}

#[test]
fn test_no_collector_means_no_recovery() {
    let heap = SyntheticHeap::builder(lp64())
        .object(24)
        .marked_unparsable(48)
        .object(24)
        .without_collector()
        .build()
        .unwrap();

    let regions = heap.space().live_regions().unwrap();
    assert_eq!(regions.completion, WalkCompletion::Truncated { at: B + 24 });
    assert_eq!(regions, heap.expected);
}

#[test]
fn test_zero_size_free_chunk_is_invariant_violation() {
    let heap = SyntheticHeap::builder(lp64())
        .object(24)
        .corrupt_free_chunk(0)
        .object(24)
        .build()
        .unwrap();

    let err = heap.space().live_regions().unwrap_err();
    assert!(
        matches!(err, InspectError::InvariantViolation { address, .. } if address == B + 24),
        "unexpected error: {err:?}"
    );
}

#[test]
fn test_negative_free_chunk_is_invariant_violation() {
    let heap = SyntheticHeap::builder(lp64())
        .corrupt_free_chunk(-3)
        .build()
        .unwrap();

    let err = heap.space().live_regions().unwrap_err();
    assert!(matches!(err, InspectError::InvariantViolation { .. }));
}

#[test]
fn test_chunk_past_space_end_is_invariant_violation() {
    let heap = SyntheticHeap::builder(lp64())
        .object(24)
        .corrupt_free_chunk(100)
        .build()
        .unwrap();

    let err = heap.space().live_regions().unwrap_err();
    assert!(matches!(err, InspectError::InvariantViolation { address, .. } if address == B + 24));
}

#[test]
fn test_step_limit_stops_walk() {
    let heap = SyntheticHeap::builder(lp64())
        .object(24)
        .object(24)
        .object(24)
        .object(24)
        .build()
        .unwrap();
    let context = heap
        .context()
        .clone()
        .with_walk_config(WalkConfig::default().with_max_steps(2));
    let space = FreeListSpace::attach(heap.image(), &context, SPACE_ADDRESS);

    let err = space.live_regions().unwrap_err();
    assert_eq!(
        err,
        InspectError::WalkLimitExceeded {
            steps: 2,
            cursor: B + 48,
        }
    );
}

#[test]
fn test_step_limit_equal_to_chunk_count_completes() {
    let heap = SyntheticHeap::builder(lp64())
        .object(24)
        .free_chunk(3)
        .object(24)
        .build()
        .unwrap();
    let context = heap
        .context()
        .clone()
        .with_walk_config(WalkConfig::default().with_max_steps(3));
    let space = FreeListSpace::attach(heap.image(), &context, SPACE_ADDRESS);

    assert!(space.live_regions().unwrap().is_complete());
}

#[test]
fn test_walker_is_lazy_and_fused() {
    let heap = SyntheticHeap::builder(lp64())
        .object(24)
        .free_chunk(3)
        .object(24)
        .free_chunk(3)
        .object(24)
        .build()
        .unwrap();
    let space = heap.space();
    let mut walker = space.walker().unwrap();

    let first = walker.next().unwrap().unwrap();
    assert_eq!(first, region(B, B + 24));
    assert_eq!(walker.completion(), None);
    assert_eq!(walker.cursor(), B + 48);

    let rest: Vec<_> = walker.by_ref().map(Result::unwrap).collect();
    assert_eq!(rest.len(), 2);
    assert_eq!(walker.completion(), Some(WalkCompletion::Complete));
    assert!(walker.next().is_none());
}

#[test]
fn test_walk_fails_once_then_stops() {
    let heap = SyntheticHeap::builder(lp64())
        .object(24)
        .free_chunk(3)
        .corrupt_free_chunk(0)
        .build()
        .unwrap();
    let space = heap.space();
    let mut walker = space.walker().unwrap();

    assert!(walker.next().unwrap().is_ok());
    assert!(walker.next().unwrap().is_err());
    assert!(walker.next().is_none());
    assert_eq!(walker.completion(), None);
}

#[test]
fn test_ilp32_walk_matches_layout() {
    let heap = SyntheticHeap::builder(HeapLayout::ilp32())
        .object(12)
        .free_chunk(4)
        .array(4, 5)
        .free_chunk(3)
        .object(24)
        .build()
        .unwrap();

    let regions = heap.space().live_regions().unwrap();
    assert_eq!(regions, heap.expected);
    assert_eq!(regions.len(), 3);
    assert!(regions.is_complete());
}

#[test]
fn test_walker_without_oracle_stops_at_marked_chunk() {
    let heap = SyntheticHeap::builder(lp64())
        .object(24)
        .marked_unparsable(48)
        .object(24)
        .build()
        .unwrap();

    let walker = RegionWalker::new(heap.image(), heap.context(), heap.bounds, NoRecovery);
    let regions = walker.collect_regions().unwrap();

    assert_eq!(regions.regions, vec![region(B, B + 24)]);
    assert_eq!(regions.completion, WalkCompletion::Truncated { at: B + 24 });
}

#[test]
fn test_bounds_at_top_of_address_space_are_invariant_violation() {
    let mut heap = SyntheticHeap::builder(lp64()).object(24).build().unwrap();
    let layout = heap.context().layout.clone();
    let top = usize::MAX - 4;
    heap.snapshot
        .image
        .write_word(SPACE_ADDRESS + layout.space.bottom, top as u64, 8)
        .unwrap();
    heap.snapshot
        .image
        .write_word(SPACE_ADDRESS + layout.space.end, usize::MAX as u64, 8)
        .unwrap();

    let err = heap.space().live_regions().unwrap_err();
    assert!(
        matches!(err, InspectError::InvariantViolation { address, .. } if address == top),
        "unexpected error: {err:?}"
    );
    assert!(heap.space().report().is_err());
}

#[test]
fn test_region_rejects_empty_and_inverted_ranges() {
    assert!(matches!(
        LiveRegion::try_new(B, B),
        Err(InspectError::InvariantViolation { address, .. }) if address == B
    ));
    assert!(LiveRegion::try_new(B + 8, B).is_err());
    assert_eq!(region(B, B + 8).byte_size(), 8);
}
