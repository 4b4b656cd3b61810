/*!
 * Chunk Classification
 * Decides what occupies the memory at a cursor
 */

use super::address_space::offset;
use super::layout::HeapLayout;
use super::traits::MemoryReader;
use crate::core::limits::FREE_CHUNK_TAG;
use crate::core::types::{Address, InspectResult, Size};
use tracing::trace;

/// What the memory at a cursor holds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Chunk {
    /// Free chunk; raw size in heap words as stored in its header (may be corrupt)
    Free { size_words: i64 },
    /// Live object with a resolvable descriptor; size in bytes before alignment
    Live { size_bytes: Size },
    /// Neither a tagged free chunk nor a resolvable object
    Unparsable,
}

/// Classifies chunks by reading headers through a `MemoryReader`
pub struct ChunkClassifier<'a, R: MemoryReader + ?Sized> {
    reader: &'a R,
    layout: &'a HeapLayout,
}

impl<'a, R: MemoryReader + ?Sized> ChunkClassifier<'a, R> {
    pub fn new(reader: &'a R, layout: &'a HeapLayout) -> Self {
        Self { reader, layout }
    }

    /// Classify the chunk at `cursor`
    ///
    /// A tagged free chunk wins over everything else. Failing to read the
    /// cursor's own header is an error; failing to resolve a descriptor is not.
    pub fn classify(&self, cursor: Address) -> InspectResult<Chunk> {
        let w = self.layout.word_size;
        let slot = self.reader.read_word(offset(cursor, w)?, w)?;

        if slot & FREE_CHUNK_TAG == FREE_CHUNK_TAG {
            let size_words = self.reader.read_signed_word(cursor, w)?;
            trace!(cursor, size_words, "free chunk");
            return Ok(Chunk::Free { size_words });
        }

        if slot == 0 {
            trace!(cursor, "null descriptor slot");
            return Ok(Chunk::Unparsable);
        }

        match self.resolve_size(cursor, slot) {
            Some(size_bytes) => Ok(Chunk::Live { size_bytes }),
            None => {
                trace!(
                    cursor,
                    descriptor = slot,
                    "unresolvable descriptor"
                );
                Ok(Chunk::Unparsable)
            }
        }
    }

    /// Resolve the descriptor at `descriptor` and compute the object size
    fn resolve_size(&self, cursor: Address, descriptor: u64) -> Option<Size> {
        let desc = &self.layout.descriptor;
        let base = usize::try_from(descriptor).ok()?;

        let magic = self.reader.read_u64(base.checked_add(desc.magic_offset)?).ok()?;
        if magic != desc.magic {
            return None;
        }

        let helper = self
            .reader
            .read_i64(base.checked_add(desc.layout_helper_offset)?)
            .ok()?;

        let size = if helper > 0 {
            usize::try_from(helper).ok()?
        } else if helper < 0 {
            let element_size = usize::try_from(helper.checked_neg()?).ok()?;
            let length = self
                .reader
                .read_u32(cursor.checked_add(desc.array_length_offset)?)
                .ok()? as usize;
            length
                .checked_mul(element_size)?
                .checked_add(desc.array_header_bytes)?
        } else {
            return None;
        };

        (size > 0).then_some(size)
    }
}
