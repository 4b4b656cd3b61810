/*!
 * Core Types
 * Common types used across the inspector
 */

/// Address in the inspected process
pub type Address = usize;

/// Size in bytes
pub type Size = usize;

/// Size in heap words
pub type WordCount = u64;

/// Common result type for inspection operations
pub type InspectResult<T> = Result<T, super::errors::InspectError>;
