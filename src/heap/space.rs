/*!
 * Free-List Space
 * Entry point for inspecting one segregated free-list space
 *
 * ## Two views of occupancy
 *
 * - `free()` / `used()` come from the free-list structures alone and stay
 *   correct even when the region walk cannot finish
 * - `used_from_regions()` / `free_from_regions()` sum the live regions of a
 *   walk and are only as complete as that walk
 *
 * Every call re-reads the snapshot; nothing is cached between queries.
 */

use super::address_space::AddressSpace;
use super::capacity::FreeCapacityAggregator;
use super::collector::CollectorState;
use super::layout::{HeapLayout, InspectContext};
use super::oracle::PrintezisOracle;
use super::traits::MemoryReader;
use super::types::{
    CapacityFigures, FreeBreakdown, LiveRegions, SpaceReport, UsageLevel,
};
use super::walker::RegionWalker;
use crate::core::types::{Address, InspectResult, Size};
use crate::monitoring::span_operation;
use tracing::info;

/// A free-list space attached at a fixed address in a target
pub struct FreeListSpace<'a, R: MemoryReader + ?Sized> {
    reader: &'a R,
    context: &'a InspectContext,
    state: CollectorState<'a, R>,
}

impl<'a, R: MemoryReader + ?Sized> FreeListSpace<'a, R> {
    /// Attach to the space descriptor at `space_address`
    pub fn attach(reader: &'a R, context: &'a InspectContext, space_address: Address) -> Self {
        Self {
            reader,
            context,
            state: CollectorState::new(reader, &context.layout, space_address),
        }
    }

    pub fn collector_state(&self) -> &CollectorState<'a, R> {
        &self.state
    }

    pub fn bounds(&self) -> InspectResult<AddressSpace> {
        self.state.bounds()
    }

    pub fn capacity(&self) -> InspectResult<Size> {
        Ok(self.bounds()?.capacity())
    }

    fn checked_layout(&self) -> InspectResult<&'a HeapLayout> {
        self.context.layout.validate()?;
        Ok(&self.context.layout)
    }

    fn aggregator(&self) -> InspectResult<FreeCapacityAggregator<'a, R>> {
        let layout = self.checked_layout()?;
        Ok(FreeCapacityAggregator::new(
            self.state.indexed_free_lists()?,
            self.state.dictionary()?,
            self.state.linear_allocation_buffer()?,
            layout,
        ))
    }

    /// Free bytes according to the free lists
    pub fn free(&self) -> InspectResult<Size> {
        self.aggregator()?.free_bytes()
    }

    /// `capacity() - free()`
    pub fn used(&self) -> InspectResult<Size> {
        Ok(self.figures()?.used)
    }

    pub fn figures(&self) -> InspectResult<CapacityFigures> {
        Ok(self.figures_with_breakdown()?.0)
    }

    pub fn figures_with_breakdown(&self) -> InspectResult<(CapacityFigures, FreeBreakdown)> {
        let bounds = self.bounds()?;
        self.aggregator()?.figures(&bounds)
    }

    /// Used share of capacity in whole percent; `NotApplicable` for an empty space
    pub fn used_percentage(&self) -> InspectResult<u8> {
        self.figures()?.used_percentage()
    }

    /// Lazy walker over the live regions
    pub fn walker(&self) -> InspectResult<RegionWalker<'a, R, PrintezisOracle<'a, R>>> {
        let layout = self.checked_layout()?;
        let bounds = self.bounds()?;
        let oracle = PrintezisOracle::new(self.state.mark_bitmap()?, layout, bounds.end());
        Ok(RegionWalker::new(self.reader, self.context, bounds, oracle))
    }

    /// Walk the whole space; the result may be truncated
    pub fn live_regions(&self) -> InspectResult<LiveRegions> {
        let span = span_operation("live_regions");
        let _guard = span.enter();

        let result = self.walker()?.collect_regions();
        match &result {
            Ok(regions) => {
                span.record_result(true);
                span.record_items_processed(regions.len());
            }
            Err(err) => span.record_error(&err.to_string()),
        }
        result
    }

    /// Bytes covered by live regions
    pub fn used_from_regions(&self) -> InspectResult<Size> {
        Ok(self.live_regions()?.live_bytes())
    }

    /// `capacity() - used_from_regions()`
    pub fn free_from_regions(&self) -> InspectResult<Size> {
        let capacity = self.capacity()?;
        Ok(capacity.saturating_sub(self.used_from_regions()?))
    }

    /// Numeric summary combining free-list accounting and a region walk
    pub fn report(&self) -> InspectResult<SpaceReport> {
        Ok(self.report_with_regions()?.0)
    }

    /// `report()` together with the regions its single walk produced
    pub fn report_with_regions(&self) -> InspectResult<(SpaceReport, LiveRegions)> {
        let span = span_operation("space_report");
        let _guard = span.enter();

        let bounds = self.bounds()?;
        let (figures, breakdown) = self.figures_with_breakdown()?;
        let regions = self.live_regions()?;
        let used_percentage = figures.used_percentage().ok();

        info!(
            capacity = figures.capacity,
            used = figures.used,
            free = figures.free,
            complete = regions.is_complete(),
            "space inspected"
        );
        span.record_result(true);

        let report = SpaceReport {
            start: bounds.start(),
            end: bounds.end(),
            capacity: figures.capacity,
            used: figures.used,
            free: figures.free,
            used_percentage,
            usage_level: used_percentage.map(UsageLevel::from_percentage),
            breakdown,
            live_region_count: regions.len(),
            live_bytes: regions.live_bytes(),
            completion: regions.completion,
        };
        Ok((report, regions))
    }
}
