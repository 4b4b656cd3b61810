/*!
 * Error Types
 * Centralized error handling with thiserror, miette, and serde support
 */

use super::types::{Address, Size};
use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Inspection errors with serialization support
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Diagnostic)]
#[serde(tag = "error_type", content = "details", rename_all = "snake_case")]
pub enum InspectError {
    #[error("Heap invariant violated at 0x{address:x}: {reason}")]
    #[diagnostic(
        code(heap::invariant_violation),
        help("The snapshot is corrupted or was taken while the heap was mutating. Take a fresh snapshot.")
    )]
    InvariantViolation { address: Address, reason: String },

    #[error("Unreadable memory: {length} bytes at 0x{address:x}")]
    #[diagnostic(
        code(heap::unreadable_memory),
        help("The address is unmapped or outside the captured snapshot segments.")
    )]
    UnreadableMemory { address: Address, length: Size },

    #[error("Not applicable: {0}")]
    #[diagnostic(code(heap::not_applicable))]
    NotApplicable(String),

    #[error("Walk aborted after {steps} steps at 0x{cursor:x}")]
    #[diagnostic(
        code(heap::walk_limit_exceeded),
        help("Raise max_walk_steps if the space is genuinely this fragmented.")
    )]
    WalkLimitExceeded { steps: u64, cursor: Address },

    #[error("Invalid heap layout: {0}")]
    #[diagnostic(
        code(heap::invalid_layout),
        help("Check word size, alignment and minimum chunk size in the layout file.")
    )]
    InvalidLayout(String),
}

impl InspectError {
    /// Create an invariant violation error
    #[inline]
    pub fn invariant(address: Address, reason: impl Into<String>) -> Self {
        Self::InvariantViolation {
            address,
            reason: reason.into(),
        }
    }

    /// Create an unreadable memory error
    #[inline]
    pub fn unreadable(address: Address, length: Size) -> Self {
        Self::UnreadableMemory { address, length }
    }

    /// Create a not applicable error
    #[inline]
    pub fn not_applicable(reason: impl Into<String>) -> Self {
        Self::NotApplicable(reason.into())
    }

    /// Create an invalid layout error
    #[inline]
    pub fn invalid_layout(reason: impl Into<String>) -> Self {
        Self::InvalidLayout(reason.into())
    }

    /// Whether the error came from the read primitive rather than from heap contents
    pub fn is_unreadable(&self) -> bool {
        matches!(self, Self::UnreadableMemory { .. })
    }
}
