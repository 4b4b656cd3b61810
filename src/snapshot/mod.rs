/*!
 * Snapshot Module
 * Captured heap images, snapshot files and synthetic heaps
 */

pub mod builder;
pub mod file;
pub mod image;

// Re-export for convenience
pub use builder::{SyntheticHeap, SyntheticHeapBuilder};
pub use file::{SnapshotError, SnapshotFile};
pub use image::HeapImage;
