/*!
 * Heap Inspection
 *
 * Read-only inspection of a segregated free-list space owned by another process.
 *
 * ## Components
 *
 * - **ChunkClassifier**: free chunk, live object or unparsable, per cursor
 * - **PrintezisOracle**: recovers sizes of objects whose header is not yet written
 * - **Free list views**: indexed buckets, large chunk dictionary, linear allocation block
 * - **RegionWalker**: lazy live-region traversal, possibly truncated
 * - **FreeCapacityAggregator**: free bytes from the free lists alone
 * - **FreeListSpace**: facade tying the above to one space descriptor
 */

pub mod address_space;
pub mod capacity;
pub mod chunk;
pub mod collector;
pub mod free_lists;
pub mod layout;
pub mod oracle;
pub mod space;
pub mod traits;
pub mod types;
pub mod walker;

// Re-export for convenience
pub use address_space::AddressSpace;
pub use capacity::FreeCapacityAggregator;
pub use chunk::{Chunk, ChunkClassifier};
pub use collector::CollectorState;
pub use free_lists::{FreeListBucket, IndexedFreeListSet, LargeChunkDictionary, LinearAllocationBuffer};
pub use layout::{HeapLayout, InspectContext, WalkConfig};
pub use oracle::{MarkBitMap, PrintezisOracle};
pub use space::FreeListSpace;
pub use traits::{MemoryReader, NoRecovery, SizeRecoveryOracle};
pub use types::*;
pub use walker::RegionWalker;
