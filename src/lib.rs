/*!
 * Free-List Space Inspector Library
 * Read-only accounting of a segregated free-list heap from outside its process
 */

pub mod core;
pub mod heap;
pub mod monitoring;
pub mod snapshot;

// Re-exports
pub use crate::core::{InspectError, InspectResult};
pub use heap::{
    AddressSpace, CapacityFigures, Chunk, FreeListSpace, HeapLayout, InspectContext, LiveRegion,
    LiveRegions, MemoryReader, RegionWalker, SizeRecoveryOracle, SpaceReport, WalkCompletion,
};
pub use monitoring::init_tracing;
pub use snapshot::{HeapImage, SnapshotFile, SyntheticHeap};
