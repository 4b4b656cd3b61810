/*!
 * Heap Layout
 * Explicit description of the inspected space's geometry and struct offsets
 *
 * Every component receives the layout at construction. Nothing is looked up
 * from a process-wide registry.
 */

use crate::core::limits::{
    DEFAULT_FREE_LIST_ENTRY_STRIDE, DEFAULT_INDEX_SET_SIZE, DEFAULT_MIN_CHUNK_SIZE,
    DEFAULT_MIN_OBJ_ALIGNMENT, DEFAULT_WORD_SIZE, DESCRIPTOR_MAGIC, MAX_WALK_STEPS_CEILING,
};
use crate::core::json::{self, JsonError};
use crate::core::types::{Address, InspectResult, Size, WordCount};
use crate::core::InspectError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Field offsets inside the space descriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpaceOffsets {
    pub bottom: Size,
    pub end: Size,
    pub collector: Size,
    pub dictionary: Size,
    /// Start of the inline `indexed_free_list[0]` array
    pub indexed_free_list: Size,
    /// Start of the inline small linear allocation block
    pub linear_alloc_block: Size,
}

/// Layout of one entry in the indexed free list array
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FreeListOffsets {
    pub entry_stride: Size,
    pub count: Size,
}

/// Layout of the large chunk dictionary header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DictionaryOffsets {
    pub total_size: Size,
    pub total_free_blocks: Size,
}

/// Layout of the linear allocation block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinearBlockOffsets {
    pub ptr: Size,
    pub word_size: Size,
}

/// Layout of the collector's boundary mark bitmap
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BitMapOffsets {
    /// Offset of the inline bitmap struct inside the collector struct
    pub bitmap: Size,
    /// Offsets inside the bitmap struct; `words` holds a pointer to the bit array
    pub covered_start: Size,
    pub covered_words: Size,
    pub words: Size,
}

/// Layout of object descriptors and object headers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DescriptorLayout {
    pub magic: u64,
    pub magic_offset: Size,
    pub layout_helper_offset: Size,
    /// Offset of the 32-bit array length inside an array object
    pub array_length_offset: Size,
    pub array_header_bytes: Size,
}

/// Geometry and offsets of the inspected free-list space
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeapLayout {
    pub word_size: Size,
    pub min_obj_alignment: Size,
    pub min_chunk_size: Size,
    pub index_set_size: usize,
    pub space: SpaceOffsets,
    pub free_list: FreeListOffsets,
    pub dictionary: DictionaryOffsets,
    pub linear_block: LinearBlockOffsets,
    pub bitmap: BitMapOffsets,
    pub descriptor: DescriptorLayout,
}

impl Default for HeapLayout {
    fn default() -> Self {
        Self::lp64()
    }
}

impl HeapLayout {
    /// 64-bit layout
    pub fn lp64() -> Self {
        Self::for_word_size(DEFAULT_WORD_SIZE)
    }

    /// 32-bit layout
    pub fn ilp32() -> Self {
        Self::for_word_size(4)
    }

    fn for_word_size(w: Size) -> Self {
        let free_list_stride = DEFAULT_FREE_LIST_ENTRY_STRIDE / DEFAULT_WORD_SIZE * w;
        let indexed_free_list = 6 * w;
        let linear_alloc_block = indexed_free_list + DEFAULT_INDEX_SET_SIZE * free_list_stride;
        Self {
            word_size: w,
            min_obj_alignment: DEFAULT_MIN_OBJ_ALIGNMENT,
            min_chunk_size: DEFAULT_MIN_CHUNK_SIZE / DEFAULT_WORD_SIZE * w,
            index_set_size: DEFAULT_INDEX_SET_SIZE,
            space: SpaceOffsets {
                bottom: 0,
                end: w,
                collector: 2 * w,
                dictionary: 3 * w,
                indexed_free_list,
                linear_alloc_block,
            },
            free_list: FreeListOffsets {
                entry_stride: free_list_stride,
                count: w,
            },
            dictionary: DictionaryOffsets {
                total_size: w,
                total_free_blocks: 2 * w,
            },
            linear_block: LinearBlockOffsets { ptr: 0, word_size: w },
            bitmap: BitMapOffsets {
                bitmap: 0,
                covered_start: 0,
                covered_words: w,
                words: 2 * w,
            },
            descriptor: DescriptorLayout {
                magic: DESCRIPTOR_MAGIC,
                magic_offset: 0,
                layout_helper_offset: 8,
                array_length_offset: 2 * w,
                array_header_bytes: 2 * w + 8,
            },
        }
    }

    /// Check the geometry for consistency
    pub fn validate(&self) -> InspectResult<()> {
        if self.word_size != 4 && self.word_size != 8 {
            return Err(InspectError::invalid_layout(format!(
                "word size must be 4 or 8, got {}",
                self.word_size
            )));
        }
        if !self.min_obj_alignment.is_power_of_two()
            || self.min_obj_alignment % self.word_size != 0
        {
            return Err(InspectError::invalid_layout(format!(
                "alignment {} must be a power of two and a multiple of the word size",
                self.min_obj_alignment
            )));
        }
        if self.min_chunk_size == 0 || self.min_chunk_size % self.word_size != 0 {
            return Err(InspectError::invalid_layout(format!(
                "minimum chunk size {} must be a positive multiple of the word size",
                self.min_chunk_size
            )));
        }
        if self.index_set_size <= self.index_set_start() {
            return Err(InspectError::invalid_layout(format!(
                "index set size {} must exceed the first size class {}",
                self.index_set_size,
                self.index_set_start()
            )));
        }
        if self.free_list.entry_stride < self.free_list.count + self.word_size {
            return Err(InspectError::invalid_layout(
                "free list entry stride does not cover the count field",
            ));
        }
        Ok(())
    }

    /// Smallest indexed size class, in words
    #[inline]
    pub fn index_set_start(&self) -> usize {
        self.min_obj_alignment / self.word_size
    }

    /// Step between indexed size classes, in words
    #[inline]
    pub fn index_set_stride(&self) -> usize {
        self.index_set_start()
    }

    /// Convert heap words to bytes
    #[inline]
    pub fn words_to_bytes(&self, words: WordCount) -> Option<Size> {
        usize::try_from(words)
            .ok()
            .and_then(|w| w.checked_mul(self.word_size))
    }

    /// Round a size up to the minimum alignment
    #[inline]
    pub fn align_object_size(&self, size: Size) -> Size {
        let mask = self.min_obj_alignment - 1;
        size.saturating_add(mask) & !mask
    }

    /// Clamp to the minimum chunk size, then align
    #[inline]
    pub fn adjust_object_size(&self, size: Size) -> Size {
        self.align_object_size(size.max(self.min_chunk_size))
    }

    /// Whether an address is aligned to the heap word
    #[inline]
    pub fn is_word_aligned(&self, address: Address) -> bool {
        address % self.word_size == 0
    }
}

/// Walk tuning knobs
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalkConfig {
    /// Maximum chunks visited per walk; defaults to one per heap word
    #[serde(default)]
    pub max_walk_steps: Option<u64>,
}

impl WalkConfig {
    pub fn with_max_steps(mut self, steps: u64) -> Self {
        self.max_walk_steps = Some(steps.min(MAX_WALK_STEPS_CEILING));
        self
    }

    /// Step limit for a space of the given capacity
    pub fn step_limit(&self, capacity: Size, word_size: Size) -> u64 {
        match self.max_walk_steps {
            Some(steps) => steps.min(MAX_WALK_STEPS_CEILING),
            None => (capacity / word_size.max(1)) as u64 + 1,
        }
    }
}

/// Everything a component needs to interpret the target's memory
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InspectContext {
    pub layout: HeapLayout,
    #[serde(default)]
    pub walk: WalkConfig,
}

impl InspectContext {
    pub fn new(layout: HeapLayout) -> InspectResult<Self> {
        layout.validate()?;
        Ok(Self {
            layout,
            walk: WalkConfig::default(),
        })
    }

    pub fn with_walk_config(mut self, walk: WalkConfig) -> Self {
        self.walk = walk;
        self
    }

    /// Load and validate a context from a JSON file
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ContextLoadError> {
        let ctx: Self = json::from_file(path)?;
        ctx.layout.validate()?;
        Ok(ctx)
    }
}

/// Failure loading a context file
#[derive(Debug, thiserror::Error)]
pub enum ContextLoadError {
    #[error(transparent)]
    Json(#[from] JsonError),
    #[error(transparent)]
    Layout(#[from] InspectError),
}
