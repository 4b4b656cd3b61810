/*!
 * Heap Layout Limits and Constants
 *
 * Centralized location for the defaults of the inspected space layout and
 * the thresholds used when reporting on it.
 */

// =============================================================================
// LAYOUT DEFAULTS (64-bit target)
// =============================================================================

/// Heap word size in bytes
pub const DEFAULT_WORD_SIZE: usize = 8;

/// Minimum object alignment in bytes
pub const DEFAULT_MIN_OBJ_ALIGNMENT: usize = 8;

/// Minimum chunk size in bytes (size, prev and next words of a free chunk)
pub const DEFAULT_MIN_CHUNK_SIZE: usize = 3 * DEFAULT_WORD_SIZE;

/// Exclusive upper bound of the indexed free list size classes, in words
pub const DEFAULT_INDEX_SET_SIZE: usize = 257;

/// Bytes occupied by one entry of the indexed free list array
pub const DEFAULT_FREE_LIST_ENTRY_STRIDE: usize = 4 * DEFAULT_WORD_SIZE;

// =============================================================================
// CHUNK TAGGING
// =============================================================================

/// Low bit of the `prev` slot marks a free chunk.
/// Descriptor pointers are word aligned, so this bit is never set in a live header.
pub const FREE_CHUNK_TAG: u64 = 0x1;

/// Magic value identifying a readable object descriptor
pub const DESCRIPTOR_MAGIC: u64 = 0x4b4c_4153_5344_4553;

// =============================================================================
// USAGE THRESHOLDS (percent)
// =============================================================================

pub const USAGE_MEDIUM_PERCENT: u8 = 60;
pub const USAGE_HIGH_PERCENT: u8 = 80;
pub const USAGE_CRITICAL_PERCENT: u8 = 95;

// =============================================================================
// WALK LIMITS
// =============================================================================

/// Upper bound on any explicitly configured step limit
pub const MAX_WALK_STEPS_CEILING: u64 = 1 << 40;

/// Environment variable overriding the walk step limit
pub const MAX_STEPS_ENV: &str = "HEAP_INSPECT_MAX_STEPS";
