/*!
 * Segregated Free List Views
 * Read-only accessors over the collector's three free-space representations
 *
 * - Indexed free lists: one bucket per exact small size class
 * - Dictionary: size-ordered structure for large chunks; only its header totals are read
 * - Linear allocation block: one bump-pointer region
 *
 * Views borrow the reader for a single query and never write to the target.
 */

use super::address_space::offset;
use super::layout::HeapLayout;
use super::traits::MemoryReader;
use crate::core::types::{Address, InspectResult, WordCount};
use crate::core::InspectError;
use serde::{Deserialize, Serialize};

/// One indexed size class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FreeListBucket {
    /// Exact chunk size of this class, in words
    pub size_words: usize,
    pub count: u64,
}

impl FreeListBucket {
    pub fn total_words(&self) -> Option<WordCount> {
        (self.size_words as u64).checked_mul(self.count)
    }
}

/// Buckets of small free chunks keyed by exact word size
pub struct IndexedFreeListSet<'a, R: MemoryReader + ?Sized> {
    reader: &'a R,
    layout: &'a HeapLayout,
    base: Address,
}

impl<'a, R: MemoryReader + ?Sized> IndexedFreeListSet<'a, R> {
    /// `base` is the address of entry zero of the free list array
    pub fn new(reader: &'a R, layout: &'a HeapLayout, base: Address) -> Self {
        Self {
            reader,
            layout,
            base,
        }
    }

    /// Word sizes of every indexed class
    pub fn size_classes(&self) -> impl Iterator<Item = usize> {
        (self.layout.index_set_start()..self.layout.index_set_size)
            .step_by(self.layout.index_set_stride())
    }

    fn is_size_class(&self, size_words: usize) -> bool {
        size_words >= self.layout.index_set_start()
            && size_words < self.layout.index_set_size
            && size_words % self.layout.index_set_stride() == 0
    }

    fn entry_address(&self, size_words: usize) -> InspectResult<Address> {
        let entry = size_words
            .checked_mul(self.layout.free_list.entry_stride)
            .ok_or_else(|| InspectError::invariant(self.base, "free list entry offset overflows"))?;
        offset(self.base, entry)
    }

    /// Number of free chunks of exactly `size_words` words
    pub fn count(&self, size_words: usize) -> InspectResult<u64> {
        if !self.is_size_class(size_words) {
            return Err(InspectError::invariant(
                self.base,
                format!("{} words is not an indexed size class", size_words),
            ));
        }
        let addr = offset(self.entry_address(size_words)?, self.layout.free_list.count)?;
        self.reader.read_word(addr, self.layout.word_size)
    }

    pub fn bucket(&self, size_words: usize) -> InspectResult<FreeListBucket> {
        Ok(FreeListBucket {
            size_words,
            count: self.count(size_words)?,
        })
    }

    /// Every size class, including empty ones
    pub fn buckets(&self) -> InspectResult<Vec<FreeListBucket>> {
        self.size_classes().map(|size| self.bucket(size)).collect()
    }

    /// Words held across all buckets
    pub fn total_words(&self) -> InspectResult<WordCount> {
        self.size_classes().try_fold(0u64, |acc, size| {
            let bucket = self.bucket(size)?;
            bucket
                .total_words()
                .and_then(|words| acc.checked_add(words))
                .ok_or_else(|| {
                    InspectError::invariant(
                        self.base,
                        format!("free list count {} of size {} overflows", bucket.count, size),
                    )
                })
        })
    }
}

/// Size-ordered dictionary of large free chunks
pub struct LargeChunkDictionary<'a, R: MemoryReader + ?Sized> {
    reader: &'a R,
    layout: &'a HeapLayout,
    handle: Address,
}

impl<'a, R: MemoryReader + ?Sized> LargeChunkDictionary<'a, R> {
    pub fn new(reader: &'a R, layout: &'a HeapLayout, handle: Address) -> Self {
        Self {
            reader,
            layout,
            handle,
        }
    }

    pub fn handle(&self) -> Address {
        self.handle
    }

    /// Total words held by the dictionary, as maintained in its header
    pub fn aggregate_words(&self) -> InspectResult<WordCount> {
        self.reader.read_word(
            offset(self.handle, self.layout.dictionary.total_size)?,
            self.layout.word_size,
        )
    }

    /// Number of chunks held by the dictionary
    pub fn total_free_blocks(&self) -> InspectResult<u64> {
        self.reader.read_word(
            offset(self.handle, self.layout.dictionary.total_free_blocks)?,
            self.layout.word_size,
        )
    }
}

/// The small linear allocation block
pub struct LinearAllocationBuffer<'a, R: MemoryReader + ?Sized> {
    reader: &'a R,
    layout: &'a HeapLayout,
    address: Address,
}

impl<'a, R: MemoryReader + ?Sized> LinearAllocationBuffer<'a, R> {
    pub fn new(reader: &'a R, layout: &'a HeapLayout, address: Address) -> Self {
        Self {
            reader,
            layout,
            address,
        }
    }

    /// Words not yet carved out of the reserved region
    pub fn remaining_words(&self) -> InspectResult<WordCount> {
        self.reader.read_word(
            offset(self.address, self.layout.linear_block.word_size)?,
            self.layout.word_size,
        )
    }

    /// Next address handed out by the bump pointer; zero when no region is reserved
    pub fn bump_pointer(&self) -> InspectResult<Address> {
        self.reader.read_address(
            offset(self.address, self.layout.linear_block.ptr)?,
            self.layout.word_size,
        )
    }
}
