/*!
 * Address Space
 * Bounds of the space under inspection
 */

use crate::core::types::{Address, InspectResult, Size};
use crate::core::InspectError;
use serde::{Deserialize, Serialize};

/// `base + bytes` for addresses derived from target memory
///
/// Overflow means the pointer or bound that produced `base` is corrupt.
#[inline]
pub fn offset(base: Address, bytes: usize) -> InspectResult<Address> {
    base.checked_add(bytes).ok_or_else(|| {
        InspectError::invariant(
            base,
            format!("offset of {} bytes overflows the address space", bytes),
        )
    })
}

/// Half-open `[start, end)` range of the inspected space
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AddressSpace {
    start: Address,
    end: Address,
}

impl AddressSpace {
    pub fn new(start: Address, end: Address) -> InspectResult<Self> {
        if start > end {
            return Err(InspectError::invariant(
                start,
                format!("space end 0x{:x} precedes its start", end),
            ));
        }
        Ok(Self { start, end })
    }

    #[inline]
    pub fn start(&self) -> Address {
        self.start
    }

    #[inline]
    pub fn end(&self) -> Address {
        self.end
    }

    /// Size of the space in bytes
    #[inline]
    pub fn capacity(&self) -> Size {
        self.end - self.start
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    #[inline]
    pub fn contains(&self, address: Address) -> bool {
        address >= self.start && address < self.end
    }
}
