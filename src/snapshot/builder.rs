/*!
 * Synthetic Heaps
 * Lays out a complete free-list space in a `HeapImage`
 *
 * Chunks are appended from the heap base in order. Free chunks are recorded
 * in the indexed lists or the dictionary according to their size, so a heap
 * built only from `free_chunk`, `linear_block` and live chunks satisfies
 * `used + free == capacity`. The builder also records which live regions a
 * walk should report.
 */

use super::file::SnapshotFile;
use super::image::HeapImage;
use crate::core::limits::FREE_CHUNK_TAG;
use crate::core::types::{Address, InspectResult, Size};
use crate::core::InspectError;
use crate::heap::{
    AddressSpace, FreeListSpace, HeapLayout, InspectContext, LiveRegion, LiveRegions,
    WalkCompletion,
};
use std::collections::BTreeMap;

/// Address of the space descriptor
pub const SPACE_ADDRESS: Address = 0x10_0000;
/// Address of the dictionary header
pub const DICTIONARY_ADDRESS: Address = 0x20_0000;
/// Address of the collector struct
pub const COLLECTOR_ADDRESS: Address = 0x30_0000;
/// First object descriptor
pub const DESCRIPTOR_BASE: Address = 0x40_0000;
/// Packed boundary-mark bits
pub const BITMAP_ADDRESS: Address = 0x50_0000;
/// Default start of the heap
pub const HEAP_BASE: Address = 0x100_0000;
/// Aligned but never mapped; used for descriptors that cannot be resolved
pub const DANGLING_DESCRIPTOR: Address = 0x7f00_0000;

const DESCRIPTOR_SIZE: Size = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FreeRole {
    Listed,
    LinearBlock,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChunkSpec {
    Free { words: u64, role: FreeRole },
    CorruptFree { raw_size: i64 },
    Object { bytes: Size },
    Array { element_size: Size, length: u32 },
    Unparsable { bytes: Size, marked: bool, descriptor: Address },
}

/// Builder for a synthetic free-list space
#[derive(Debug, Clone)]
pub struct SyntheticHeapBuilder {
    layout: HeapLayout,
    heap_base: Address,
    chunks: Vec<ChunkSpec>,
    extra_indexed: BTreeMap<usize, u64>,
    extra_dictionary_words: u64,
    extra_dictionary_blocks: u64,
    with_collector: bool,
}

impl SyntheticHeapBuilder {
    pub fn new(layout: HeapLayout) -> Self {
        Self {
            layout,
            heap_base: HEAP_BASE,
            chunks: Vec::new(),
            extra_indexed: BTreeMap::new(),
            extra_dictionary_words: 0,
            extra_dictionary_blocks: 0,
            with_collector: true,
        }
    }

    pub fn heap_base(mut self, base: Address) -> Self {
        self.heap_base = base;
        self
    }

    /// Leave the collector pointer null so no size can be recovered
    pub fn without_collector(mut self) -> Self {
        self.with_collector = false;
        self
    }

    /// Free chunk of `words` heap words, recorded in the matching free list
    pub fn free_chunk(mut self, words: u64) -> Self {
        self.chunks.push(ChunkSpec::Free {
            words,
            role: FreeRole::Listed,
        });
        self
    }

    /// Free chunk reserved as the linear allocation block
    pub fn linear_block(mut self, words: u64) -> Self {
        self.chunks.push(ChunkSpec::Free {
            words,
            role: FreeRole::LinearBlock,
        });
        self
    }

    /// Tagged free chunk whose size word holds `raw_size`; occupies one minimum chunk
    pub fn corrupt_free_chunk(mut self, raw_size: i64) -> Self {
        self.chunks.push(ChunkSpec::CorruptFree { raw_size });
        self
    }

    /// Instance of `bytes` bytes with a resolvable descriptor
    pub fn object(mut self, bytes: Size) -> Self {
        self.chunks.push(ChunkSpec::Object { bytes });
        self
    }

    /// Array of `length` elements of `element_size` bytes
    pub fn array(mut self, element_size: Size, length: u32) -> Self {
        self.chunks.push(ChunkSpec::Array {
            element_size,
            length,
        });
        self
    }

    /// Object with a null descriptor slot and no boundary marks
    pub fn unparsable(mut self, bytes: Size) -> Self {
        self.chunks.push(ChunkSpec::Unparsable {
            bytes,
            marked: false,
            descriptor: 0,
        });
        self
    }

    /// Object with a null descriptor slot whose extent is boundary-marked
    pub fn marked_unparsable(mut self, bytes: Size) -> Self {
        self.chunks.push(ChunkSpec::Unparsable {
            bytes,
            marked: true,
            descriptor: 0,
        });
        self
    }

    /// Object whose descriptor pointer leads to unmapped memory
    pub fn dangling_object(mut self, bytes: Size, marked: bool) -> Self {
        self.chunks.push(ChunkSpec::Unparsable {
            bytes,
            marked,
            descriptor: DANGLING_DESCRIPTOR,
        });
        self
    }

    /// Add free list entries with no backing chunk in the heap
    pub fn indexed_entries(mut self, size_words: usize, count: u64) -> Self {
        *self.extra_indexed.entry(size_words).or_insert(0) += count;
        self
    }

    /// Add dictionary totals with no backing chunks in the heap
    pub fn dictionary_entries(mut self, total_words: u64, blocks: u64) -> Self {
        self.extra_dictionary_words += total_words;
        self.extra_dictionary_blocks += blocks;
        self
    }

    fn occupied_bytes(&self, spec: &ChunkSpec) -> Option<Size> {
        let layout = &self.layout;
        match *spec {
            ChunkSpec::Free { words, .. } => layout.words_to_bytes(words),
            ChunkSpec::CorruptFree { .. } => Some(layout.min_chunk_size),
            ChunkSpec::Object { bytes } | ChunkSpec::Unparsable { bytes, .. } => {
                Some(layout.adjust_object_size(bytes))
            }
            ChunkSpec::Array {
                element_size,
                length,
            } => element_size
                .checked_mul(length as usize)?
                .checked_add(layout.descriptor.array_header_bytes)
                .map(|raw| layout.adjust_object_size(raw)),
        }
    }

    fn is_indexed(&self, words: u64) -> bool {
        let words = words as usize;
        words >= self.layout.index_set_start()
            && words < self.layout.index_set_size
            && words % self.layout.index_set_stride() == 0
    }

    /// Lay out the image
    pub fn build(self) -> InspectResult<SyntheticHeap> {
        self.layout.validate()?;
        let layout = self.layout.clone();
        let w = layout.word_size;

        if !layout.is_word_aligned(self.heap_base) {
            return Err(InspectError::invalid_layout("heap base is not word aligned"));
        }

        if let Some(&size) = self.extra_indexed.keys().find(|&&size| !self.is_indexed(size as u64)) {
            return Err(InspectError::invalid_layout(format!(
                "{} words is not an indexed size class",
                size
            )));
        }

        // Placement pass
        let mut placed = Vec::with_capacity(self.chunks.len());
        let mut cursor = self.heap_base;
        for spec in &self.chunks {
            if matches!(
                spec,
                ChunkSpec::Object { bytes: 0 } | ChunkSpec::Array { element_size: 0, .. }
            ) {
                return Err(InspectError::invariant(cursor, "descriptor size must be non-zero"));
            }
            let size = self
                .occupied_bytes(spec)
                .ok_or_else(|| InspectError::invariant(cursor, "chunk size overflows"))?;
            if size < layout.min_chunk_size {
                return Err(InspectError::invariant(
                    cursor,
                    format!("chunk of {} bytes is below the minimum chunk size", size),
                ));
            }
            placed.push((cursor, size, *spec));
            cursor = cursor
                .checked_add(size)
                .ok_or_else(|| InspectError::invariant(cursor, "heap end overflows"))?;
        }
        let bounds = AddressSpace::new(self.heap_base, cursor)?;

        let mut image = HeapImage::new();
        image.map_zeroed(self.heap_base, bounds.capacity());
        image.map_zeroed(SPACE_ADDRESS, layout.space.linear_alloc_block + 4 * w);
        image.map_zeroed(DICTIONARY_ADDRESS, 4 * w);
        image.map_zeroed(COLLECTOR_ADDRESS, layout.bitmap.bitmap + 4 * w);

        let heap_words = bounds.capacity() / w;
        let bits_per_word = w * 8;
        let bitmap_words = heap_words / bits_per_word + 1;
        let mut bitmap = vec![0u64; bitmap_words];

        let mut descriptors: BTreeMap<i64, Address> = BTreeMap::new();
        let mut indexed = self.extra_indexed.clone();
        let mut dictionary_words = self.extra_dictionary_words;
        let mut dictionary_blocks = self.extra_dictionary_blocks;
        let mut linear_block: Option<(Address, u64)> = None;

        // Expected walk, mirroring the region walker on a well-formed heap
        let mut regions = Vec::new();
        let mut region_start = self.heap_base;
        let mut completion = WalkCompletion::Complete;
        let mut live_bytes = 0;

        for &(addr, size, spec) in &placed {
            match spec {
                ChunkSpec::Free { words, role } => {
                    image.write_word(addr, words, w)?;
                    image.write_word(addr + w, FREE_CHUNK_TAG, w)?;
                    match role {
                        FreeRole::Listed if self.is_indexed(words) => {
                            *indexed.entry(words as usize).or_insert(0) += 1;
                        }
                        FreeRole::Listed => {
                            dictionary_words += words;
                            dictionary_blocks += 1;
                        }
                        FreeRole::LinearBlock => {
                            let (ptr, total) = linear_block.unwrap_or((addr, 0));
                            linear_block = Some((ptr, total + words));
                        }
                    }
                }
                ChunkSpec::CorruptFree { raw_size } => {
                    image.write_word(addr, raw_size as u64, w)?;
                    image.write_word(addr + w, FREE_CHUNK_TAG, w)?;
                }
                ChunkSpec::Object { bytes } => {
                    let desc = descriptor_for(&mut descriptors, bytes as i64);
                    image.write_word(addr, 1, w)?;
                    image.write_word(addr + w, desc as u64, w)?;
                    live_bytes += size;
                }
                ChunkSpec::Array {
                    element_size,
                    length,
                } => {
                    let desc = descriptor_for(&mut descriptors, -(element_size as i64));
                    image.write_word(addr, 1, w)?;
                    image.write_word(addr + w, desc as u64, w)?;
                    image.write(
                        addr + layout.descriptor.array_length_offset,
                        &length.to_le_bytes(),
                    )?;
                    live_bytes += size;
                }
                ChunkSpec::Unparsable {
                    marked, descriptor, ..
                } => {
                    image.write_word(addr + w, descriptor as u64, w)?;
                    if marked {
                        let first = (addr - self.heap_base) / w;
                        let last = (addr + size - w - self.heap_base) / w;
                        for bit in [first, first + 1, last] {
                            bitmap[bit / bits_per_word] |= 1u64 << (bit % bits_per_word);
                        }
                    }
                    live_bytes += size;
                }
            }

            if completion.is_complete() {
                match spec {
                    ChunkSpec::Free { .. } | ChunkSpec::CorruptFree { .. } => {
                        if addr > region_start {
                            regions.push(LiveRegion::new(region_start, addr));
                        }
                        region_start = addr + size;
                    }
                    ChunkSpec::Unparsable { marked, .. } if !marked || !self.with_collector => {
                        completion = WalkCompletion::Truncated { at: addr };
                    }
                    _ => {}
                }
                if let WalkCompletion::Truncated { at } = completion {
                    if at > region_start {
                        regions.push(LiveRegion::new(region_start, at));
                    }
                }
            }
        }
        if completion.is_complete() && bounds.end() > region_start {
            regions.push(LiveRegion::new(region_start, bounds.end()));
        }

        // Descriptors
        if !descriptors.is_empty() {
            image.map_zeroed(DESCRIPTOR_BASE, descriptors.len() * DESCRIPTOR_SIZE);
            for (&helper, &desc) in &descriptors {
                image.write(
                    desc + layout.descriptor.magic_offset,
                    &layout.descriptor.magic.to_le_bytes(),
                )?;
                image.write(
                    desc + layout.descriptor.layout_helper_offset,
                    &helper.to_le_bytes(),
                )?;
            }
        }

        // Space descriptor
        image.write_word(SPACE_ADDRESS + layout.space.bottom, bounds.start() as u64, w)?;
        image.write_word(SPACE_ADDRESS + layout.space.end, bounds.end() as u64, w)?;
        image.write_word(
            SPACE_ADDRESS + layout.space.dictionary,
            DICTIONARY_ADDRESS as u64,
            w,
        )?;
        for (&size_words, &count) in &indexed {
            let entry = SPACE_ADDRESS
                + layout.space.indexed_free_list
                + size_words * layout.free_list.entry_stride;
            image.write_word(entry, size_words as u64, w)?;
            image.write_word(entry + layout.free_list.count, count, w)?;
        }
        if let Some((ptr, words)) = linear_block {
            let lab = SPACE_ADDRESS + layout.space.linear_alloc_block;
            image.write_word(lab + layout.linear_block.ptr, ptr as u64, w)?;
            image.write_word(lab + layout.linear_block.word_size, words, w)?;
        }

        // Dictionary header
        image.write_word(
            DICTIONARY_ADDRESS + layout.dictionary.total_size,
            dictionary_words,
            w,
        )?;
        image.write_word(
            DICTIONARY_ADDRESS + layout.dictionary.total_free_blocks,
            dictionary_blocks,
            w,
        )?;

        // Collector and boundary marks
        if self.with_collector {
            image.write_word(
                SPACE_ADDRESS + layout.space.collector,
                COLLECTOR_ADDRESS as u64,
                w,
            )?;
            let bm = COLLECTOR_ADDRESS + layout.bitmap.bitmap;
            image.write_word(bm + layout.bitmap.covered_start, bounds.start() as u64, w)?;
            image.write_word(bm + layout.bitmap.covered_words, heap_words as u64, w)?;
            image.write_word(bm + layout.bitmap.words, BITMAP_ADDRESS as u64, w)?;

            let bytes = bitmap
                .iter()
                .flat_map(|word| word.to_le_bytes().into_iter().take(w))
                .collect();
            image.map(BITMAP_ADDRESS, bytes);
        }

        let listed_free_words = indexed
            .iter()
            .map(|(&size, &count)| size as u64 * count)
            .sum::<u64>()
            + dictionary_words
            + linear_block.map_or(0, |(_, words)| words);

        let context = InspectContext::new(layout)?;
        Ok(SyntheticHeap {
            snapshot: SnapshotFile::new(context, SPACE_ADDRESS, image),
            bounds,
            expected: LiveRegions {
                regions,
                completion,
            },
            live_bytes,
            listed_free_bytes: listed_free_words as Size * w,
        })
    }
}

fn descriptor_for(descriptors: &mut BTreeMap<i64, Address>, helper: i64) -> Address {
    let next = DESCRIPTOR_BASE + descriptors.len() * DESCRIPTOR_SIZE;
    *descriptors.entry(helper).or_insert(next)
}

/// A built heap together with what inspecting it should produce
#[derive(Debug, Clone)]
pub struct SyntheticHeap {
    pub snapshot: SnapshotFile,
    pub bounds: AddressSpace,
    /// Regions a walk reports on this heap
    pub expected: LiveRegions,
    /// Bytes occupied by every non-free chunk, including any past a truncation point
    pub live_bytes: Size,
    /// Bytes recorded across the indexed lists, dictionary and linear block
    pub listed_free_bytes: Size,
}

impl SyntheticHeap {
    pub fn builder(layout: HeapLayout) -> SyntheticHeapBuilder {
        SyntheticHeapBuilder::new(layout)
    }

    /// Mixed heap used by the CLI and benchmarks
    pub fn demo(layout: HeapLayout, repeat: usize) -> InspectResult<Self> {
        let mut builder = Self::builder(layout);
        for i in 0..repeat {
            builder = builder
                .object(24 + (i % 5) * 8)
                .array(8, (i % 7) as u32 + 1)
                .free_chunk(3 + (i % 4) as u64)
                .object(64)
                .marked_unparsable(48);
            if i % 10 == 9 {
                builder = builder.free_chunk(512);
            }
        }
        builder.linear_block(64).object(32).build()
    }

    pub fn image(&self) -> &HeapImage {
        &self.snapshot.image
    }

    pub fn context(&self) -> &InspectContext {
        &self.snapshot.context
    }

    /// Attach a `FreeListSpace` to the built image
    pub fn space(&self) -> FreeListSpace<'_, HeapImage> {
        FreeListSpace::attach(
            &self.snapshot.image,
            &self.snapshot.context,
            self.snapshot.space_address,
        )
    }
}
