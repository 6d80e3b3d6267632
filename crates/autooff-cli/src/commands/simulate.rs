use crate::OutputFormat;
use crate::output::{SpinnerProgress, print_report};
use anyhow::{Context, Result};
use autooff_core::dom::MemoryPage;
use autooff_core::progress::TracingProgress;
use autooff_core::{CancelFlag, RunOptions, Session, Timing};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub fn execute(
    fixture: &Path,
    instant: bool,
    section_pause_ms: Option<u64>,
    max_passes: usize,
    store: Option<PathBuf>,
    format: OutputFormat,
) -> Result<()> {
    tracing::info!("Simulating Auto-OFF on fixture: {}", fixture.display());

    let page = MemoryPage::from_file(fixture)
        .with_context(|| format!("Failed to load page fixture {}", fixture.display()))?;
    let store = super::open_store(store)?;

    let mut timing = if instant { Timing::instant() } else { Timing::default() };
    if let Some(ms) = section_pause_ms {
        timing = timing.with_section_pause(Duration::from_millis(ms));
    }
    let options = RunOptions {
        timing,
        max_passes: max_passes.max(1),
        ..RunOptions::default()
    };

    let session = Session::new(page, store).with_options(options);
    let cancel = CancelFlag::new();

    let runtime = super::runtime()?;
    let report = runtime.block_on(async {
        // Spinner output would interleave with machine-readable formats
        if format == OutputFormat::Pretty {
            let spinner = SpinnerProgress::new();
            let report = session.run(&spinner, &cancel).await;
            spinner.finish("Simulation finished");
            report
        } else {
            session.run(&TracingProgress, &cancel).await
        }
    })?;

    print_report(&report, format)
}
