/*!
 * Heap Image
 * Captured memory segments served through `MemoryReader`
 */

use crate::core::types::{Address, InspectResult, Size};
use crate::core::InspectError;
use crate::heap::MemoryReader;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Non-overlapping byte segments keyed by base address
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeapImage {
    segments: BTreeMap<Address, Vec<u8>>,
}

impl HeapImage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Map `bytes` at `base`, replacing any segment with the same base
    pub fn map(&mut self, base: Address, bytes: Vec<u8>) {
        self.segments.insert(base, bytes);
    }

    /// Map `len` zero bytes at `base`
    pub fn map_zeroed(&mut self, base: Address, len: Size) {
        self.map(base, vec![0u8; len]);
    }

    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    /// Total captured bytes
    pub fn mapped_bytes(&self) -> Size {
        self.segments.values().map(Vec::len).sum()
    }

    fn locate(&self, address: Address, len: Size) -> Option<(Address, usize)> {
        let (&base, bytes) = self.segments.range(..=address).next_back()?;
        let offset = address - base;
        let end = offset.checked_add(len)?;
        (end <= bytes.len()).then_some((base, offset))
    }

    /// Overwrite bytes inside an already mapped segment
    pub fn write(&mut self, address: Address, data: &[u8]) -> InspectResult<()> {
        let (base, offset) = self
            .locate(address, data.len())
            .ok_or_else(|| InspectError::unreadable(address, data.len()))?;
        if let Some(bytes) = self.segments.get_mut(&base) {
            bytes[offset..offset + data.len()].copy_from_slice(data);
        }
        Ok(())
    }

    /// Write a little-endian word of `word_size` bytes
    pub fn write_word(&mut self, address: Address, value: u64, word_size: Size) -> InspectResult<()> {
        let bytes = value.to_le_bytes();
        self.write(address, &bytes[..word_size.min(8)])
    }
}

impl MemoryReader for HeapImage {
    fn read_into(&self, address: Address, buf: &mut [u8]) -> InspectResult<()> {
        let (base, offset) = self
            .locate(address, buf.len())
            .ok_or_else(|| InspectError::unreadable(address, buf.len()))?;
        let bytes = &self.segments[&base];
        buf.copy_from_slice(&bytes[offset..offset + buf.len()]);
        Ok(())
    }
}
