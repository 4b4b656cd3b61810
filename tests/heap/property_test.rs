/*!
 * Property Tests
 * Walk and accounting invariants over generated heaps
 */

use freelist_inspector::heap::HeapLayout;
use freelist_inspector::snapshot::SyntheticHeapBuilder;
use freelist_inspector::SyntheticHeap;
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Piece {
    Object(usize),
    Array(usize, u32),
    Free(u64),
    Marked(usize),
}

fn piece() -> impl Strategy<Value = Piece> {
    prop_oneof![
        (1usize..512).prop_map(Piece::Object),
        (1usize..16, 0u32..32).prop_map(|(e, n)| Piece::Array(e, n)),
        (3u64..600).prop_map(Piece::Free),
        (24usize..256).prop_map(Piece::Marked),
    ]
}

fn build(layout: HeapLayout, pieces: &[Piece]) -> SyntheticHeap {
    pieces
        .iter()
        .fold(SyntheticHeap::builder(layout), |b: SyntheticHeapBuilder, p| match *p {
            Piece::Object(bytes) => b.object(bytes),
            Piece::Array(elem, len) => b.array(elem, len),
            Piece::Free(words) => b.free_chunk(words),
            Piece::Marked(bytes) => b.marked_unparsable(bytes),
        })
        .build()
        .unwrap()
}

proptest! {
    #[test]
    fn prop_walk_matches_layout(pieces in prop::collection::vec(piece(), 0..40)) {
        let heap = build(HeapLayout::lp64(), &pieces);
        let regions = heap.space().live_regions().unwrap();

        prop_assert_eq!(&regions, &heap.expected);
        prop_assert!(regions.is_complete());
    }

    #[test]
    fn prop_regions_are_ordered_and_disjoint(pieces in prop::collection::vec(piece(), 0..40)) {
        let heap = build(HeapLayout::lp64(), &pieces);
        let regions = heap.space().live_regions().unwrap();

        for region in &regions.regions {
            prop_assert!(region.start < region.end);
            prop_assert!(heap.bounds.start() <= region.start && region.end <= heap.bounds.end());
        }
        for pair in regions.regions.windows(2) {
            prop_assert!(pair[0].end < pair[1].start);
        }
    }

    #[test]
    fn prop_used_plus_free_is_capacity(pieces in prop::collection::vec(piece(), 0..40)) {
        let heap = build(HeapLayout::lp64(), &pieces);
        let space = heap.space();
        let figures = space.figures().unwrap();

        prop_assert_eq!(figures.used + figures.free, figures.capacity);
        prop_assert_eq!(space.used_from_regions().unwrap(), figures.used);
        prop_assert_eq!(figures.used, heap.live_bytes);
    }

    #[test]
    fn prop_ilp32_walk_matches_layout(pieces in prop::collection::vec(piece(), 0..24)) {
        let heap = build(HeapLayout::ilp32(), &pieces);
        let regions = heap.space().live_regions().unwrap();

        prop_assert_eq!(regions.live_bytes(), heap.live_bytes);
    }

    #[test]
    fn prop_percentage_in_range(pieces in prop::collection::vec(piece(), 1..20)) {
        let heap = build(HeapLayout::lp64(), &pieces);
        let pct = heap.space().used_percentage().unwrap();

        prop_assert!(pct <= 100);
    }
}
