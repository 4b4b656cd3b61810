/*!
 * Free Capacity Accounting
 * Sums the three free-space representations into one figure
 *
 * Independent of the region walker: a truncated walk never affects these numbers.
 */

use super::address_space::AddressSpace;
use super::free_lists::{IndexedFreeListSet, LargeChunkDictionary, LinearAllocationBuffer};
use super::layout::HeapLayout;
use super::traits::MemoryReader;
use super::types::{CapacityFigures, FreeBreakdown};
use crate::core::types::{InspectResult, Size};
use crate::core::InspectError;
use tracing::debug;

/// Borrowed views of one space's free lists
pub struct FreeCapacityAggregator<'a, R: MemoryReader + ?Sized> {
    indexed: IndexedFreeListSet<'a, R>,
    dictionary: LargeChunkDictionary<'a, R>,
    linear_block: LinearAllocationBuffer<'a, R>,
    layout: &'a HeapLayout,
}

impl<'a, R: MemoryReader + ?Sized> FreeCapacityAggregator<'a, R> {
    pub fn new(
        indexed: IndexedFreeListSet<'a, R>,
        dictionary: LargeChunkDictionary<'a, R>,
        linear_block: LinearAllocationBuffer<'a, R>,
        layout: &'a HeapLayout,
    ) -> Self {
        Self {
            indexed,
            dictionary,
            linear_block,
            layout,
        }
    }

    /// Free words per source
    pub fn breakdown(&self) -> InspectResult<FreeBreakdown> {
        let breakdown = FreeBreakdown {
            indexed_words: self.indexed.total_words()?,
            dictionary_words: self.dictionary.aggregate_words()?,
            linear_block_words: self.linear_block.remaining_words()?,
        };
        debug!(
            indexed_words = breakdown.indexed_words,
            dictionary_words = breakdown.dictionary_words,
            linear_block_words = breakdown.linear_block_words,
            "free list totals"
        );
        Ok(breakdown)
    }

    /// Free bytes across all three sources
    pub fn free_bytes(&self) -> InspectResult<Size> {
        let breakdown = self.breakdown()?;
        self.to_bytes(&breakdown)
    }

    fn to_bytes(&self, breakdown: &FreeBreakdown) -> InspectResult<Size> {
        breakdown
            .total_words()
            .and_then(|words| self.layout.words_to_bytes(words))
            .ok_or_else(|| {
                InspectError::invariant(
                    self.dictionary.handle(),
                    format!("free word total {:?} overflows", breakdown),
                )
            })
    }

    /// Capacity, free and used bytes of `space`
    pub fn figures(&self, space: &AddressSpace) -> InspectResult<(CapacityFigures, FreeBreakdown)> {
        let breakdown = self.breakdown()?;
        let free = self.to_bytes(&breakdown)?;
        let figures = CapacityFigures::from_free(space.capacity(), free, space.start())?;
        Ok((figures, breakdown))
    }
}
