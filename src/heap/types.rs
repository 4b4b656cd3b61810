/*!
 * Heap Types
 * Results produced by walking and accounting a free-list space
 */

use crate::core::limits::{USAGE_CRITICAL_PERCENT, USAGE_HIGH_PERCENT, USAGE_MEDIUM_PERCENT};
use crate::core::types::{Address, InspectResult, Size, WordCount};
use crate::core::InspectError;
use serde::{Deserialize, Serialize};

/// Maximal `[start, end)` range holding no free chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LiveRegion {
    pub start: Address,
    pub end: Address,
}

impl LiveRegion {
    /// Unchecked constructor; the caller guarantees `start < end`
    pub(crate) fn new(start: Address, end: Address) -> Self {
        Self { start, end }
    }

    /// Region `[start, end)`, rejecting empty or inverted ranges
    pub fn try_new(start: Address, end: Address) -> InspectResult<Self> {
        if start >= end {
            return Err(InspectError::invariant(
                start,
                format!("live region end {:#x} is not past its start", end),
            ));
        }
        Ok(Self { start, end })
    }

    #[inline]
    pub fn byte_size(&self) -> Size {
        self.end - self.start
    }
}

/// How a region walk ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum WalkCompletion {
    /// The cursor reached the end of the space
    Complete,
    /// An unparsable chunk with no recoverable size stopped the walk
    Truncated { at: Address },
}

impl WalkCompletion {
    pub fn is_complete(&self) -> bool {
        matches!(self, Self::Complete)
    }
}

/// Live regions of one walk together with how far the walk got
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiveRegions {
    pub regions: Vec<LiveRegion>,
    pub completion: WalkCompletion,
}

impl LiveRegions {
    /// Sum of the byte extents of every region
    pub fn live_bytes(&self) -> Size {
        self.regions.iter().map(LiveRegion::byte_size).sum()
    }

    pub fn is_complete(&self) -> bool {
        self.completion.is_complete()
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }
}

/// Free words contributed by each free-space representation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FreeBreakdown {
    pub indexed_words: WordCount,
    pub dictionary_words: WordCount,
    pub linear_block_words: WordCount,
}

impl FreeBreakdown {
    pub fn total_words(&self) -> Option<WordCount> {
        self.indexed_words
            .checked_add(self.dictionary_words)?
            .checked_add(self.linear_block_words)
    }
}

/// Capacity, free and used bytes of a space
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapacityFigures {
    pub capacity: Size,
    pub free: Size,
    pub used: Size,
}

impl CapacityFigures {
    /// Derive `used` from capacity and free; free beyond capacity means a torn or corrupt read
    pub fn from_free(capacity: Size, free: Size, origin: Address) -> InspectResult<Self> {
        let used = capacity.checked_sub(free).ok_or_else(|| {
            InspectError::invariant(
                origin,
                format!("free bytes {} exceed capacity {}", free, capacity),
            )
        })?;
        Ok(Self {
            capacity,
            free,
            used,
        })
    }

    /// Used share of capacity, truncated to a whole percent
    pub fn used_percentage(&self) -> InspectResult<u8> {
        used_percentage(self.used, self.capacity)
    }
}

/// `floor(used / capacity * 100)`, or `NotApplicable` for an empty space
pub fn used_percentage(used: Size, capacity: Size) -> InspectResult<u8> {
    if capacity == 0 {
        return Err(InspectError::not_applicable(
            "used percentage of a zero-capacity space",
        ));
    }
    let pct = (used as u128 * 100) / capacity as u128;
    Ok(pct.min(100) as u8)
}

/// Usage levels of a space
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UsageLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl UsageLevel {
    pub fn from_percentage(pct: u8) -> Self {
        if pct >= USAGE_CRITICAL_PERCENT {
            UsageLevel::Critical
        } else if pct >= USAGE_HIGH_PERCENT {
            UsageLevel::High
        } else if pct >= USAGE_MEDIUM_PERCENT {
            UsageLevel::Medium
        } else {
            UsageLevel::Low
        }
    }
}

impl std::fmt::Display for UsageLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            UsageLevel::Low => write!(f, "LOW"),
            UsageLevel::Medium => write!(f, "MEDIUM"),
            UsageLevel::High => write!(f, "HIGH"),
            UsageLevel::Critical => write!(f, "CRITICAL"),
        }
    }
}

/// Numeric summary of one space
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpaceReport {
    pub start: Address,
    pub end: Address,
    pub capacity: Size,
    pub used: Size,
    pub free: Size,
    /// Absent when the space is empty
    pub used_percentage: Option<u8>,
    pub usage_level: Option<UsageLevel>,
    pub breakdown: FreeBreakdown,
    pub live_region_count: usize,
    pub live_bytes: Size,
    pub completion: WalkCompletion,
}
