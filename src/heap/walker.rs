/*!
 * Region Walker
 * Lazy traversal of a space yielding its live regions
 *
 * The walker keeps a cursor and the start of the current live region. Free
 * chunks close the pending region, live objects extend it, and unparsable
 * chunks are skipped by their recovered size. When no size can be recovered
 * the walk stops early and reports `WalkCompletion::Truncated`; that is a
 * partial result, not an error.
 */

use super::address_space::AddressSpace;
use super::chunk::{Chunk, ChunkClassifier};
use super::layout::{HeapLayout, InspectContext};
use super::traits::{MemoryReader, SizeRecoveryOracle};
use super::types::{LiveRegion, LiveRegions, WalkCompletion};
use crate::core::types::{Address, InspectResult, Size};
use crate::core::InspectError;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WalkState {
    Walking,
    Finished(WalkCompletion),
    Failed,
}

/// Single-pass iterator over the live regions of one snapshot
///
/// Yields `Err` at most once; the iterator is fused afterwards.
pub struct RegionWalker<'a, R: MemoryReader + ?Sized, O: SizeRecoveryOracle> {
    classifier: ChunkClassifier<'a, R>,
    oracle: O,
    layout: &'a HeapLayout,
    space: AddressSpace,
    cursor: Address,
    region_start: Address,
    steps: u64,
    step_limit: u64,
    live_bytes: Size,
    state: WalkState,
}

impl<'a, R: MemoryReader + ?Sized, O: SizeRecoveryOracle> RegionWalker<'a, R, O> {
    pub fn new(reader: &'a R, context: &'a InspectContext, space: AddressSpace, oracle: O) -> Self {
        let layout = &context.layout;
        Self {
            classifier: ChunkClassifier::new(reader, layout),
            oracle,
            layout,
            space,
            cursor: space.start(),
            region_start: space.start(),
            steps: 0,
            step_limit: context.walk.step_limit(space.capacity(), layout.word_size),
            live_bytes: 0,
            state: WalkState::Walking,
        }
    }

    /// Current cursor position
    pub fn cursor(&self) -> Address {
        self.cursor
    }

    /// Chunks visited so far
    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// How the walk ended, once it has
    pub fn completion(&self) -> Option<WalkCompletion> {
        match self.state {
            WalkState::Finished(completion) => Some(completion),
            _ => None,
        }
    }

    /// Drain the walker into a region list
    pub fn collect_regions(mut self) -> InspectResult<LiveRegions> {
        let mut regions = Vec::new();
        for region in self.by_ref() {
            regions.push(region?);
        }
        let completion = self.completion().unwrap_or(WalkCompletion::Complete);
        Ok(LiveRegions {
            regions,
            completion,
        })
    }

    fn close_region(&mut self, upto: Address) -> Option<LiveRegion> {
        if upto > self.region_start {
            let region = LiveRegion::new(self.region_start, upto);
            self.live_bytes += region.byte_size();
            Some(region)
        } else {
            None
        }
    }

    fn advance(&mut self, cursor: Address, bytes: Size) -> InspectResult<()> {
        let next = cursor
            .checked_add(bytes)
            .filter(|next| *next <= self.space.end())
            .ok_or_else(|| {
                InspectError::invariant(
                    cursor,
                    format!(
                        "chunk of {} bytes extends past space end 0x{:x}",
                        bytes,
                        self.space.end()
                    ),
                )
            })?;
        self.cursor = next;
        Ok(())
    }

    fn finish(&mut self, completion: WalkCompletion) {
        self.state = WalkState::Finished(completion);
    }

    /// Visit one chunk; returns a region when one closes
    fn step(&mut self) -> InspectResult<Option<LiveRegion>> {
        let cursor = self.cursor;

        if cursor >= self.space.end() {
            let region = self.close_region(self.space.end());
            self.finish(WalkCompletion::Complete);
            info!(
                start = self.space.start(),
                end = self.space.end(),
                steps = self.steps,
                live_bytes = self.live_bytes,
                "region walk complete"
            );
            return Ok(region);
        }

        if self.steps >= self.step_limit {
            return Err(InspectError::WalkLimitExceeded {
                steps: self.steps,
                cursor,
            });
        }
        self.steps += 1;

        match self.classifier.classify(cursor)? {
            Chunk::Free { size_words } => {
                if size_words <= 0 {
                    return Err(InspectError::invariant(
                        cursor,
                        format!("free chunk with non-positive size {}", size_words),
                    ));
                }
                let bytes = self
                    .layout
                    .words_to_bytes(size_words as u64)
                    .ok_or_else(|| {
                        InspectError::invariant(
                            cursor,
                            format!("free chunk size {} overflows", size_words),
                        )
                    })?;
                let region = self.close_region(cursor);
                self.advance(cursor, bytes)?;
                self.region_start = self.cursor;
                Ok(region)
            }
            Chunk::Live { size_bytes } => {
                self.advance(cursor, self.layout.adjust_object_size(size_bytes))?;
                Ok(None)
            }
            Chunk::Unparsable => match self.oracle.recover_size(cursor)? {
                Some(size) => {
                    debug!(cursor, size, "skipped unparsable chunk by recovered size");
                    self.advance(cursor, size)?;
                    Ok(None)
                }
                None => {
                    let region = self.close_region(cursor);
                    self.finish(WalkCompletion::Truncated { at: cursor });
                    warn!(
                        cursor,
                        steps = self.steps,
                        "chunk size undeterminable, live region listing truncated"
                    );
                    Ok(region)
                }
            },
        }
    }
}

impl<'a, R: MemoryReader + ?Sized, O: SizeRecoveryOracle> Iterator for RegionWalker<'a, R, O> {
    type Item = InspectResult<LiveRegion>;

    fn next(&mut self) -> Option<Self::Item> {
        while self.state == WalkState::Walking {
            match self.step() {
                Ok(Some(region)) => return Some(Ok(region)),
                Ok(None) => continue,
                Err(err) => {
                    self.state = WalkState::Failed;
                    warn!(error = %err, cursor = self.cursor, "region walk failed");
                    return Some(Err(err));
                }
            }
        }
        None
    }
}

impl<'a, R: MemoryReader + ?Sized, O: SizeRecoveryOracle> std::iter::FusedIterator
    for RegionWalker<'a, R, O>
{
}
