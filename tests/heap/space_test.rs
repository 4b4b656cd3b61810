/*!
 * Free-List Space Tests
 * Facade queries and the combined space report
 */

use freelist_inspector::heap::{HeapLayout, UsageLevel, WalkCompletion};
use freelist_inspector::snapshot::builder::HEAP_BASE;
use freelist_inspector::{InspectError, SyntheticHeap};
use pretty_assertions::assert_eq;

#[test]
fn test_bounds_match_builder() {
    let heap = SyntheticHeap::builder(HeapLayout::lp64())
        .object(40)
        .free_chunk(6)
        .build()
        .unwrap();
    let bounds = heap.space().bounds().unwrap();

    assert_eq!(bounds, heap.bounds);
    assert_eq!(bounds.start(), HEAP_BASE);
    assert_eq!(bounds.capacity(), 40 + 48);
}

#[test]
fn test_region_and_list_views_agree_on_complete_walk() {
    let heap = SyntheticHeap::demo(HeapLayout::lp64(), 12).unwrap();
    let space = heap.space();

    assert_eq!(space.used_from_regions().unwrap(), space.used().unwrap());
    assert_eq!(space.free_from_regions().unwrap(), space.free().unwrap());
}

#[test]
fn test_report() {
    let heap = SyntheticHeap::builder(HeapLayout::lp64())
        .object(600)
        .free_chunk(25)
        .build()
        .unwrap();
    let report = heap.space().report().unwrap();

    assert_eq!(report.start, HEAP_BASE);
    assert_eq!(report.end, HEAP_BASE + 800);
    assert_eq!(report.capacity, 800);
    assert_eq!(report.used, 600);
    assert_eq!(report.free, 200);
    assert_eq!(report.used_percentage, Some(75));
    assert_eq!(report.usage_level, Some(UsageLevel::Medium));
    assert_eq!(report.breakdown.indexed_words, 25);
    assert_eq!(report.live_region_count, 1);
    assert_eq!(report.live_bytes, 600);
    assert_eq!(report.completion, WalkCompletion::Complete);
}

#[test]
fn test_report_on_truncated_walk() {
    let heap = SyntheticHeap::builder(HeapLayout::lp64())
        .object(96)
        .unparsable(24)
        .object(24)
        .build()
        .unwrap();
    let report = heap.space().report().unwrap();

    assert_eq!(report.used, 144);
    assert_eq!(report.used_percentage, Some(100));
    assert_eq!(report.usage_level, Some(UsageLevel::Critical));
    assert_eq!(report.live_bytes, 96);
    assert_eq!(
        report.completion,
        WalkCompletion::Truncated {
            at: HEAP_BASE + 96
        }
    );
}

#[test]
fn test_report_on_empty_space() {
    let heap = SyntheticHeap::builder(HeapLayout::lp64()).build().unwrap();
    let report = heap.space().report().unwrap();

    assert_eq!(report.capacity, 0);
    assert_eq!(report.used_percentage, None);
    assert_eq!(report.usage_level, None);
    assert_eq!(report.live_region_count, 0);
}

#[test]
fn test_report_serializes() {
    let heap = SyntheticHeap::demo(HeapLayout::lp64(), 3).unwrap();
    let report = heap.space().report().unwrap();

    let json = serde_json::to_string(&report).unwrap();
    assert!(json.contains("\"capacity\""));
    assert!(json.contains("\"status\""));
}

#[test]
fn test_queries_reread_the_image() {
    let mut heap = SyntheticHeap::builder(HeapLayout::lp64())
        .object(24)
        .free_chunk(3)
        .build()
        .unwrap();
    let before = heap.space().free().unwrap();

    let layout = heap.context().layout.clone();
    let entry = freelist_inspector::snapshot::builder::SPACE_ADDRESS
        + layout.space.indexed_free_list
        + 3 * layout.free_list.entry_stride
        + layout.free_list.count;
    heap.snapshot.image.write_word(entry, 0, 8).unwrap();

    assert_eq!(before, 24);
    assert_eq!(heap.space().free().unwrap(), 0);
}

#[test]
fn test_report_with_regions_shares_one_walk() {
    let heap = SyntheticHeap::demo(HeapLayout::lp64(), 6).unwrap();
    let (report, regions) = heap.space().report_with_regions().unwrap();

    assert_eq!(regions, heap.expected);
    assert_eq!(report.live_region_count, regions.len());
    assert_eq!(report.live_bytes, regions.live_bytes());
    assert_eq!(report, heap.space().report().unwrap());
}

#[test]
fn test_queries_reject_inconsistent_layout() {
    let mut heap = SyntheticHeap::builder(HeapLayout::lp64())
        .object(24)
        .free_chunk(4)
        .build()
        .unwrap();
    heap.snapshot.context.layout.min_obj_alignment = 0;
    let space = heap.space();

    assert!(matches!(space.report(), Err(InspectError::InvalidLayout(_))));
    assert!(matches!(space.free(), Err(InspectError::InvalidLayout(_))));
    assert!(matches!(
        space.live_regions(),
        Err(InspectError::InvalidLayout(_))
    ));
}
