/*!
 * Free-List Inspector - Command Line Entry Point
 *
 * Offline diagnostics for captured free-list spaces:
 * - Capacity, used and free accounting
 * - Live region listing
 * - Synthetic snapshot generation
 */

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use freelist_inspector::core::json;
use freelist_inspector::core::limits::MAX_STEPS_ENV;
use freelist_inspector::heap::WalkConfig;
use freelist_inspector::{
    init_tracing, FreeListSpace, HeapLayout, InspectContext, SnapshotFile, SpaceReport,
    SyntheticHeap, WalkCompletion,
};

/// Offline inspector for segregated free-list heap spaces.
#[derive(Debug, Parser)]
#[command(name = "freelist-inspect")]
#[command(about = "Account for capacity, used and free bytes of a captured free-list space")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Inspect a snapshot file and print its space report.
    Inspect {
        /// Snapshot file produced by `synth` or a capture tool.
        snapshot: PathBuf,
        /// JSON layout context overriding the one stored in the snapshot.
        #[arg(long)]
        layout: Option<PathBuf>,
        /// Print the report as JSON.
        #[arg(long)]
        json: bool,
        /// Also list every live region.
        #[arg(long)]
        regions: bool,
    },
    /// Write a synthetic snapshot for demos and testing.
    Synth {
        /// Output snapshot path.
        output: PathBuf,
        /// Number of times the demo chunk pattern repeats.
        #[arg(long, default_value_t = 16)]
        repeat: usize,
        /// Use a 32-bit layout instead of the 64-bit default.
        #[arg(long)]
        ilp32: bool,
    },
}

fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();
    match cli.command {
        Command::Inspect {
            snapshot,
            layout,
            json,
            regions,
        } => inspect(snapshot, layout, json, regions),
        Command::Synth {
            output,
            repeat,
            ilp32,
        } => synth(output, repeat, ilp32),
    }
}

fn inspect(path: PathBuf, layout: Option<PathBuf>, as_json: bool, list_regions: bool) -> Result<()> {
    let snapshot = SnapshotFile::load(&path)
        .with_context(|| format!("failed to load snapshot {}", path.display()))?;

    let context = match layout {
        Some(layout_path) => InspectContext::from_json_file(&layout_path)
            .with_context(|| format!("failed to load layout {}", layout_path.display()))?,
        None => snapshot.context.clone(),
    };
    let context = apply_step_override(context)?;

    let space = FreeListSpace::attach(&snapshot.image, &context, snapshot.space_address);
    let (report, regions) = space
        .report_with_regions()
        .context("space inspection failed")?;

    if as_json {
        let mut out = serde_json::to_value(&report)?;
        if list_regions {
            out["regions"] = serde_json::to_value(&regions)?;
        }
        println!("{}", json::to_string_pretty(&out)?);
        return Ok(());
    }

    print_report(&report);
    if list_regions {
        for region in &regions.regions {
            println!(
                "  [{:#x}, {:#x})  {} bytes",
                region.start,
                region.end,
                region.byte_size()
            );
        }
    }
    Ok(())
}

fn apply_step_override(context: InspectContext) -> Result<InspectContext> {
    match std::env::var(MAX_STEPS_ENV) {
        Ok(raw) => {
            let steps: u64 = raw
                .trim()
                .parse()
                .with_context(|| format!("{MAX_STEPS_ENV} must be an unsigned integer"))?;
            let walk = WalkConfig::default().with_max_steps(steps);
            Ok(context.with_walk_config(walk))
        }
        Err(_) => Ok(context),
    }
}

fn print_report(report: &SpaceReport) {
    println!("space      [{:#x}, {:#x})", report.start, report.end);
    println!("capacity   {} bytes", report.capacity);
    println!("used       {} bytes", report.used);
    println!("free       {} bytes", report.free);
    match (report.used_percentage, report.usage_level) {
        (Some(pct), Some(level)) => println!("usage      {pct}% ({level})"),
        _ => println!("usage      n/a"),
    }
    println!(
        "free lists indexed={}w dictionary={}w linear={}w",
        report.breakdown.indexed_words,
        report.breakdown.dictionary_words,
        report.breakdown.linear_block_words
    );
    println!(
        "regions    {} covering {} bytes",
        report.live_region_count, report.live_bytes
    );
    if let WalkCompletion::Truncated { at } = report.completion {
        warn!(at, "region walk truncated");
        println!("walk       truncated at {at:#x}");
    }
}

fn synth(output: PathBuf, repeat: usize, ilp32: bool) -> Result<()> {
    let layout = if ilp32 {
        HeapLayout::ilp32()
    } else {
        HeapLayout::lp64()
    };
    let heap = SyntheticHeap::demo(layout, repeat).context("failed to build synthetic heap")?;
    heap.snapshot
        .save(&output)
        .with_context(|| format!("failed to write {}", output.display()))?;

    info!(
        path = %output.display(),
        capacity = heap.bounds.capacity(),
        regions = heap.expected.len(),
        "synthetic snapshot written"
    );
    Ok(())
}
