/*!
 * Size Recovery
 * Boundary-mark bitmap lookups for objects whose header is not yet stable
 *
 * While an object is being initialised the collector marks the bits for its
 * first two words and for its last word. The extent is therefore known from
 * the bitmap before the descriptor slot is written.
 */

use super::address_space::offset;
use super::layout::HeapLayout;
use super::traits::{MemoryReader, SizeRecoveryOracle};
use crate::core::types::{Address, InspectResult, Size};
use crate::core::InspectError;
use tracing::debug;

/// Read-only view of the collector's mark bitmap
///
/// One bit per heap word of the covered range, packed into heap-word-sized
/// bitmap words, least significant bit first.
pub struct MarkBitMap<'a, R: MemoryReader + ?Sized> {
    reader: &'a R,
    word_size: Size,
    covered_start: Address,
    covered_end: Address,
    words: Address,
}

impl<'a, R: MemoryReader + ?Sized> MarkBitMap<'a, R> {
    /// View over a bitmap covering `covered_words` heap words from `covered_start`;
    /// the packed bits live at `words`
    pub fn new(
        reader: &'a R,
        layout: &HeapLayout,
        covered_start: Address,
        covered_words: usize,
        words: Address,
    ) -> Self {
        let covered_end = covered_words
            .checked_mul(layout.word_size)
            .and_then(|bytes| covered_start.checked_add(bytes))
            .unwrap_or(Address::MAX);
        Self {
            reader,
            word_size: layout.word_size,
            covered_start,
            covered_end,
            words,
        }
    }

    #[inline]
    fn bits_per_word(&self) -> usize {
        self.word_size * 8
    }

    #[inline]
    pub fn covers(&self, address: Address) -> bool {
        address >= self.covered_start && address < self.covered_end
    }

    #[inline]
    fn bit_index(&self, address: Address) -> usize {
        (address - self.covered_start) / self.word_size
    }

    #[inline]
    fn address_of_bit(&self, bit: usize) -> Address {
        self.covered_start + bit * self.word_size
    }

    fn bitmap_word(&self, index: usize) -> InspectResult<u64> {
        let byte = index
            .checked_mul(self.word_size)
            .ok_or_else(|| InspectError::invariant(self.words, "bitmap index overflows"))?;
        self.reader.read_word(offset(self.words, byte)?, self.word_size)
    }

    /// Whether the word at `address` is marked; uncovered addresses are unmarked
    pub fn is_marked(&self, address: Address) -> InspectResult<bool> {
        if !self.covers(address) {
            return Ok(false);
        }
        let bit = self.bit_index(address);
        let word = self.bitmap_word(bit / self.bits_per_word())?;
        Ok(word >> (bit % self.bits_per_word()) & 1 == 1)
    }

    /// First marked word at or after `from`, stopping before `limit`
    pub fn next_marked(&self, from: Address, limit: Address) -> InspectResult<Option<Address>> {
        let limit = limit.min(self.covered_end);
        if from >= limit || from < self.covered_start {
            return Ok(None);
        }

        let bpw = self.bits_per_word();
        let end_bit = self.bit_index(limit - 1) + 1;
        let mut bit = self.bit_index(from);

        while bit < end_bit {
            let word = self.bitmap_word(bit / bpw)? >> (bit % bpw);
            if word != 0 {
                let found = bit + word.trailing_zeros() as usize;
                return Ok((found < end_bit).then(|| self.address_of_bit(found)));
            }
            bit = (bit / bpw + 1) * bpw;
        }
        Ok(None)
    }
}

/// Size recovery through Printezis marks
pub struct PrintezisOracle<'a, R: MemoryReader + ?Sized> {
    bitmap: Option<MarkBitMap<'a, R>>,
    layout: &'a HeapLayout,
    limit: Address,
}

impl<'a, R: MemoryReader + ?Sized> PrintezisOracle<'a, R> {
    /// `bitmap` is `None` when the space has no collector; `limit` bounds the mark search
    pub fn new(bitmap: Option<MarkBitMap<'a, R>>, layout: &'a HeapLayout, limit: Address) -> Self {
        Self {
            bitmap,
            layout,
            limit,
        }
    }
}

impl<'a, R: MemoryReader + ?Sized> SizeRecoveryOracle for PrintezisOracle<'a, R> {
    fn recover_size(&self, cursor: Address) -> InspectResult<Option<Size>> {
        let Some(bitmap) = &self.bitmap else {
            return Ok(None);
        };
        let w = self.layout.word_size;

        if !(bitmap.is_marked(cursor)? && bitmap.is_marked(offset(cursor, w)?)?) {
            debug!(cursor, "missing Printezis marks");
            return Ok(None);
        }

        let Some(last_word) = bitmap.next_marked(offset(cursor, 2 * w)?, self.limit)? else {
            debug!(cursor, "no terminating Printezis mark");
            return Ok(None);
        };

        let size = offset(last_word, w)? - cursor;
        Ok(Some(self.layout.adjust_object_size(size)))
    }
}
