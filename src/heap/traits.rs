/*!
 * Heap Traits
 * Seams between the inspector and the inspected process
 */

use crate::core::types::{Address, InspectResult, Size};
use crate::core::InspectError;

/// Raw read access to the target's address space
///
/// Implementations never mutate the target. Multi-byte values are little-endian.
pub trait MemoryReader {
    /// Fill `buf` with the bytes at `address`, or fail with `UnreadableMemory`
    fn read_into(&self, address: Address, buf: &mut [u8]) -> InspectResult<()>;

    /// Read `length` bytes at `address`
    fn read(&self, address: Address, length: Size) -> InspectResult<Vec<u8>> {
        let mut buf = vec![0u8; length];
        self.read_into(address, &mut buf)?;
        Ok(buf)
    }

    fn read_u32(&self, address: Address) -> InspectResult<u32> {
        let mut buf = [0u8; 4];
        self.read_into(address, &mut buf)?;
        Ok(u32::from_le_bytes(buf))
    }

    fn read_u64(&self, address: Address) -> InspectResult<u64> {
        let mut buf = [0u8; 8];
        self.read_into(address, &mut buf)?;
        Ok(u64::from_le_bytes(buf))
    }

    fn read_i64(&self, address: Address) -> InspectResult<i64> {
        self.read_u64(address).map(|v| v as i64)
    }

    /// Read one heap word of `word_size` bytes, zero-extended
    fn read_word(&self, address: Address, word_size: Size) -> InspectResult<u64> {
        match word_size {
            4 => self.read_u32(address).map(u64::from),
            8 => self.read_u64(address),
            _ => Err(InspectError::invalid_layout(format!(
                "unsupported word size {}",
                word_size
            ))),
        }
    }

    /// Read one heap word, sign-extended
    fn read_signed_word(&self, address: Address, word_size: Size) -> InspectResult<i64> {
        match word_size {
            4 => self.read_u32(address).map(|v| i64::from(v as i32)),
            _ => self.read_word(address, word_size).map(|v| v as i64),
        }
    }

    /// Read a pointer-sized value
    fn read_address(&self, address: Address, word_size: Size) -> InspectResult<Address> {
        let raw = self.read_word(address, word_size)?;
        usize::try_from(raw).map_err(|_| {
            InspectError::invariant(address, format!("pointer 0x{:x} exceeds host width", raw))
        })
    }
}

impl<R: MemoryReader + ?Sized> MemoryReader for &R {
    fn read_into(&self, address: Address, buf: &mut [u8]) -> InspectResult<()> {
        (**self).read_into(address, buf)
    }
}

/// Recovers the size of a chunk whose header cannot be parsed
pub trait SizeRecoveryOracle {
    /// `Ok(None)` means undeterminable, which ends a walk without error.
    /// Returned sizes are in bytes, at least the minimum chunk size and aligned.
    fn recover_size(&self, cursor: Address) -> InspectResult<Option<Size>>;
}

impl<O: SizeRecoveryOracle + ?Sized> SizeRecoveryOracle for &O {
    fn recover_size(&self, cursor: Address) -> InspectResult<Option<Size>> {
        (**self).recover_size(cursor)
    }
}

/// Oracle for spaces without a collector: never recovers a size
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRecovery;

impl SizeRecoveryOracle for NoRecovery {
    fn recover_size(&self, _cursor: Address) -> InspectResult<Option<Size>> {
        Ok(None)
    }
}
