/*!
 * Collector State
 * Locates the free-list structures through the space descriptor
 */

use super::address_space::{offset, AddressSpace};
use super::free_lists::{IndexedFreeListSet, LargeChunkDictionary, LinearAllocationBuffer};
use super::layout::HeapLayout;
use super::oracle::MarkBitMap;
use super::traits::MemoryReader;
use crate::core::types::{Address, InspectResult};

/// Accessor over the space descriptor at a fixed address in the target
pub struct CollectorState<'a, R: MemoryReader + ?Sized> {
    reader: &'a R,
    layout: &'a HeapLayout,
    space: Address,
}

impl<'a, R: MemoryReader + ?Sized> CollectorState<'a, R> {
    pub fn new(reader: &'a R, layout: &'a HeapLayout, space: Address) -> Self {
        Self {
            reader,
            layout,
            space,
        }
    }

    pub fn space_address(&self) -> Address {
        self.space
    }

    fn read_field(&self, field: usize) -> InspectResult<Address> {
        self.reader
            .read_address(offset(self.space, field)?, self.layout.word_size)
    }

    /// Current `[bottom, end)` of the space
    pub fn bounds(&self) -> InspectResult<AddressSpace> {
        let bottom = self.read_field(self.layout.space.bottom)?;
        let end = self.read_field(self.layout.space.end)?;
        AddressSpace::new(bottom, end)
    }

    /// Address of the collector struct; zero when the space has none
    pub fn collector_handle(&self) -> InspectResult<Address> {
        self.read_field(self.layout.space.collector)
    }

    pub fn dictionary_handle(&self) -> InspectResult<Address> {
        self.read_field(self.layout.space.dictionary)
    }

    pub fn indexed_free_list_base(&self) -> InspectResult<Address> {
        offset(self.space, self.layout.space.indexed_free_list)
    }

    pub fn linear_alloc_block_address(&self) -> InspectResult<Address> {
        offset(self.space, self.layout.space.linear_alloc_block)
    }

    pub fn indexed_free_lists(&self) -> InspectResult<IndexedFreeListSet<'a, R>> {
        Ok(IndexedFreeListSet::new(
            self.reader,
            self.layout,
            self.indexed_free_list_base()?,
        ))
    }

    pub fn dictionary(&self) -> InspectResult<LargeChunkDictionary<'a, R>> {
        Ok(LargeChunkDictionary::new(
            self.reader,
            self.layout,
            self.dictionary_handle()?,
        ))
    }

    pub fn linear_allocation_buffer(&self) -> InspectResult<LinearAllocationBuffer<'a, R>> {
        Ok(LinearAllocationBuffer::new(
            self.reader,
            self.layout,
            self.linear_alloc_block_address()?,
        ))
    }

    /// Boundary-mark bitmap of the collector, if the space has a collector
    pub fn mark_bitmap(&self) -> InspectResult<Option<MarkBitMap<'a, R>>> {
        let collector = self.collector_handle()?;
        if collector == 0 {
            return Ok(None);
        }

        let w = self.layout.word_size;
        let offsets = &self.layout.bitmap;
        let bitmap = offset(collector, offsets.bitmap)?;

        let covered_start = self
            .reader
            .read_address(offset(bitmap, offsets.covered_start)?, w)?;
        let covered_words = self
            .reader
            .read_address(offset(bitmap, offsets.covered_words)?, w)?;
        let words = self.reader.read_address(offset(bitmap, offsets.words)?, w)?;

        Ok(Some(MarkBitMap::new(
            self.reader,
            self.layout,
            covered_start,
            covered_words,
            words,
        )))
    }
}
