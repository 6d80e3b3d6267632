use super::collector::Collector;
use super::{accordion, locator, toggle};
use crate::dom::{LabelCache, Page, Selector, ToggleKind, is_checked, label_text};
use crate::progress::{CancelFlag, ProgressSink};
use crate::report::{RunReport, ToggleOutcome, millis};
use crate::settings::{
    DYNAMIC_GROUPS, EXTRA_IDS, EXTRA_SECTION, FULL_TIME_SECTION, Policy, Preferences,
    SECTION_ID_ALIASES, Settings, Store, UsageStats,
};
use crate::timing::{Timing, pause};
use crate::{Error, Result};
use futures::future::join_all;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

/// Limits and delays for a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOptions {
    pub timing: Timing,
    /// Passes over all sections; later passes only run while the previous
    /// one still switched something off
    pub max_passes: usize,
    /// Delayed re-queries per section on the first pass
    pub max_requeries: u32,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            timing: Timing::default(),
            max_passes: 3,
            max_requeries: 4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Idle,
    Preparing,
    OpeningSections,
    ProcessingPass(usize),
    ProcessingExtras,
    ProcessingDynamicGroups,
    Reporting,
    Cancelled,
}

impl RunPhase {
    fn progress_text(self) -> String {
        match self {
            RunPhase::Idle => "Ready".to_string(),
            RunPhase::Preparing => "Preparing...".to_string(),
            RunPhase::OpeningSections => "Opening all sections...".to_string(),
            RunPhase::ProcessingPass(1) => "Processing sections...".to_string(),
            RunPhase::ProcessingPass(n) => format!("Processing sections (pass {})...", n),
            RunPhase::ProcessingExtras => "Processing extra checkboxes...".to_string(),
            RunPhase::ProcessingDynamicGroups => {
                "Processing software tools & platforms...".to_string()
            }
            RunPhase::Reporting => "Saving results...".to_string(),
            RunPhase::Cancelled => "Cancelling...".to_string(),
        }
    }
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunPhase::ProcessingPass(n) => write!(f, "processing pass {}", n),
            other => write!(f, "{:?}", other),
        }
    }
}

/// One page context: the page, its store, and the guard that keeps runs
/// from overlapping.
pub struct Session<P> {
    page: P,
    store: Arc<dyn Store>,
    options: RunOptions,
    running: AtomicBool,
}

struct RunGuard<'a>(&'a AtomicBool);

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl<P: Page> Session<P> {
    pub fn new(page: P, store: Arc<dyn Store>) -> Self {
        Self {
            page,
            store,
            options: RunOptions::default(),
            running: AtomicBool::new(false),
        }
    }

    pub fn with_options(mut self, options: RunOptions) -> Self {
        self.options = options;
        self
    }

    pub fn page(&self) -> &P {
        &self.page
    }

    pub fn options(&self) -> &RunOptions {
        &self.options
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Run Auto-OFF once.
    ///
    /// Fails only with `Error::AlreadyRunning` when another run on this
    /// session has not finished; every other failure is logged and the run
    /// carries on. Settings are read at the start, counters written at the
    /// end, also for a cancelled run.
    pub async fn run(&self, progress: &dyn ProgressSink, cancel: &CancelFlag) -> Result<RunReport> {
        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            tracing::warn!("Auto-OFF is already running; ignoring the new request");
            return Err(Error::AlreadyRunning);
        }
        let _guard = RunGuard(&self.running);

        let store = self.store.as_ref();
        let mut prefs = Preferences::load(store).await;
        UsageStats::initialize(store).await;

        let run = Run::new(&self.page, &prefs.settings, &self.options, progress, cancel);
        let report = run.execute().await;

        UsageStats::record_run(store, report.changed_count(), &report.metrics).await;
        prefs.increment_usage(store).await;

        log_results(&report);
        progress.set_text(&report.completion_message());
        Ok(report)
    }
}

struct OpenSection<N> {
    id: String,
    root: N,
}

/// State of a single run, dropped when it ends
struct Run<'a, P: Page + ?Sized> {
    page: &'a P,
    policy: Policy,
    settings: &'a Settings,
    options: &'a RunOptions,
    progress: &'a dyn ProgressSink,
    cancel: &'a CancelFlag,
    labels: LabelCache,
    report: RunReport,
    phase: RunPhase,
}

impl<'a, P: Page + ?Sized> Run<'a, P> {
    fn new(
        page: &'a P,
        settings: &'a Settings,
        options: &'a RunOptions,
        progress: &'a dyn ProgressSink,
        cancel: &'a CancelFlag,
    ) -> Self {
        Self {
            page,
            policy: settings.policy(),
            settings,
            options,
            progress,
            cancel,
            labels: LabelCache::new(),
            report: RunReport::default(),
            phase: RunPhase::Idle,
        }
    }

    fn enter(&mut self, phase: RunPhase) {
        tracing::info!("Auto-OFF: {} -> {}", self.phase, phase);
        self.phase = phase;
        self.progress.set_text(&phase.progress_text());
    }

    /// Poll point. Once the flag is seen the run stays cancelled.
    fn cancelled(&mut self) -> bool {
        if self.phase == RunPhase::Cancelled {
            return true;
        }
        if !self.cancel.is_cancelled() {
            return false;
        }
        self.enter(RunPhase::Cancelled);
        self.report.cancelled = true;
        true
    }

    async fn execute(mut self) -> RunReport {
        let started = Instant::now();

        self.enter(RunPhase::Preparing);
        pause(self.options.timing.prepare).await;

        if !self.cancelled() {
            self.full_time().await;
        }

        let sections = if self.cancelled() {
            Vec::new()
        } else {
            self.open_sections().await
        };

        let processing = Instant::now();
        if !self.cancelled() {
            self.passes(&sections).await;
        }
        if !self.cancelled() {
            self.extras().await;
        }
        if !self.cancelled() {
            self.dynamic_groups().await;
        }
        self.report.metrics.processing_ms = millis(processing.elapsed());

        if !self.cancelled() {
            self.enter(RunPhase::Reporting);
        }
        self.report.metrics.total_ms = millis(started.elapsed());
        self.report
    }

    /// The page's "full-time" position-type checkboxes, found through their labels
    async fn full_time(&mut self) {
        self.progress.set_text("Processing Full-Time checkboxes...");
        let labels = match self.page.query_all(None, &Selector::label()).await {
            Ok(labels) => labels,
            Err(e) => {
                tracing::warn!("Could not search for full-time checkboxes: {}", e);
                return;
            }
        };

        for label in labels {
            if self.cancelled() {
                return;
            }
            let Ok(state) = self.page.read(&label).await else {
                continue;
            };
            let text = state.text.trim().to_lowercase();
            if !(text == "full-time" || text == "fulltime" || text.contains("full-time")) {
                continue;
            }
            let Some(target_id) = state.label_for.as_deref().filter(|id| !id.is_empty()) else {
                continue;
            };
            match self.page.by_id(target_id).await {
                Ok(Some(target)) => {
                    tracing::debug!("Found full-time checkbox #{}", target_id);
                    let name = if state.text.trim().is_empty() {
                        "full-time".to_string()
                    } else {
                        state.text.trim().to_string()
                    };
                    self.switch_off_single(&target, FULL_TIME_SECTION, name, true)
                        .await;
                }
                Ok(None) => tracing::debug!("Full-time label points at missing #{}", target_id),
                Err(e) => tracing::warn!("Failed to look up #{}: {}", target_id, e),
            }
        }
    }

    async fn open_sections(&mut self) -> Vec<OpenSection<P::Node>> {
        self.enter(RunPhase::OpeningSections);
        let page = self.page;
        let timing = &self.options.timing;

        if tracing::enabled!(tracing::Level::DEBUG) {
            match locator::discover(page).await {
                Ok(found) => {
                    for section in found {
                        tracing::debug!(
                            "Discovered #{} (accordion: {}, checkboxes: {})",
                            section.id,
                            section.has_accordion,
                            section.checkbox_count
                        );
                    }
                }
                Err(e) => tracing::debug!("Section discovery failed: {}", e),
            }
        }

        let started = Instant::now();
        let mut located = Vec::new();
        let mut keys = HashSet::new();
        for id in self.settings.all_sections() {
            if !self.policy.section_allowed(&id) {
                tracing::debug!("Section '{}' is excluded", id);
                continue;
            }
            match locator::locate(page, &id, SECTION_ID_ALIASES).await {
                Ok(Some(node)) => {
                    if keys.insert(page.node_key(&node)) {
                        located.push((id, node));
                    } else {
                        tracing::debug!("Section '{}' resolves to an element already queued", id);
                    }
                }
                Ok(None) => tracing::debug!("Section '{}' not found on page", id),
                Err(e) => tracing::warn!("Failed to locate section '{}': {}", id, e),
            }
        }

        let opened = join_all(located.into_iter().map(|(id, node)| async move {
            let result = accordion::open(page, &node, timing).await;
            (id, result)
        }))
        .await;

        let mut sections = Vec::new();
        for (id, result) in opened {
            match result {
                Ok(section) => {
                    tracing::debug!(
                        "Opened '{}' ({:?}, {:.0}ms)",
                        id,
                        section.signal,
                        millis(section.elapsed)
                    );
                    sections.push(OpenSection {
                        id,
                        root: section.root,
                    });
                }
                Err(e) => tracing::warn!("Failed to open section '{}': {}", id, e),
            }
        }

        self.report.metrics.accordion_ms += millis(started.elapsed());
        tracing::info!(
            "Opened {} sections: {}",
            sections.len(),
            sections.iter().map(|s| s.id.as_str()).collect::<Vec<_>>().join(", ")
        );
        sections
    }

    async fn passes(&mut self, sections: &[OpenSection<P::Node>]) {
        let max_passes = self.options.max_passes.max(1);

        for pass in 1..=max_passes {
            if self.cancelled() {
                return;
            }
            self.enter(RunPhase::ProcessingPass(pass));
            self.report.metrics.passes = pass;

            let mut changed = 0;
            for section in sections {
                if self.cancelled() {
                    return;
                }
                changed += self.process_section(section, pass == 1).await;
            }

            if changed == 0 {
                tracing::debug!("Pass {} switched nothing off", pass);
                return;
            }
            if pass == max_passes {
                tracing::warn!(
                    "Stopped after {} passes while toggles were still changing; some may remain on",
                    max_passes
                );
                self.report.metrics.degraded = true;
                return;
            }
            tracing::info!("Pass {} switched {} toggles off; running another pass", pass, changed);
            pause(self.options.timing.pass_gap).await;
        }
    }

    /// Collect, then switch off every toggle of one section concurrently.
    /// Returns how many changed.
    async fn process_section(&mut self, section: &OpenSection<P::Node>, first_pass: bool) -> usize {
        let started = Instant::now();
        self.progress.set_text(&format!("Processing {}...", section.id));

        let page = self.page;
        let timing = &self.options.timing;
        let collector = Collector {
            policy: &self.policy,
            timing,
            max_requeries: self.options.max_requeries,
        };
        let toggles = match collector.collect(page, &section.id, &section.root, first_pass).await {
            Ok(toggles) => toggles,
            Err(e) => {
                tracing::warn!("Failed to collect toggles in '{}': {}", section.id, e);
                return 0;
            }
        };
        if toggles.is_empty() {
            tracing::debug!("Section '{}': nothing to switch off", section.id);
            self.report.metrics.add_section_time(&section.id, started.elapsed());
            return 0;
        }

        tracing::info!("Section '{}': switching off {} toggles", section.id, toggles.len());
        let labels = &self.labels;
        let root = &section.root;
        let results = join_all(toggles.iter().map(|element| async move {
            let label = match label_text(page, root, &element.node, Some(labels)).await {
                Ok(label) if !label.is_empty() => label,
                Ok(_) => element.identity.clone().unwrap_or_default(),
                Err(e) => {
                    tracing::debug!("Label lookup failed: {}", e);
                    element.identity.clone().unwrap_or_default()
                }
            };
            let result = toggle::turn_off(page, &element.node, timing).await;
            pause(timing.click_wait).await;
            (label, result)
        }))
        .await;

        let mut changed = 0;
        for (label, result) in results {
            match result {
                Ok(result) => {
                    let outcome = result.into_outcome(&section.id, label);
                    if outcome.changed {
                        changed += 1;
                    }
                    self.record(outcome);
                }
                Err(e) => tracing::warn!("{}: error on '{}': {}", section.id, label, e),
            }
        }

        self.report.metrics.add_section_time(&section.id, started.elapsed());
        tracing::debug!(
            "Section '{}' done; pausing {:?} so the page can save",
            section.id,
            timing.section_pause
        );
        pause(timing.section_pause).await;
        changed
    }

    async fn extras(&mut self) {
        self.enter(RunPhase::ProcessingExtras);
        for id in EXTRA_IDS {
            if self.cancelled() {
                return;
            }
            match self.page.by_id(id).await {
                Ok(Some(node)) => {
                    self.switch_off_single(&node, EXTRA_SECTION, format!("#{}", id), false)
                        .await;
                }
                Ok(None) => tracing::debug!("Extra #{} not found on page", id),
                Err(e) => tracing::warn!("Failed to look up #{}: {}", id, e),
            }
        }
    }

    async fn dynamic_groups(&mut self) {
        self.enter(RunPhase::ProcessingDynamicGroups);
        for (prefix, section) in DYNAMIC_GROUPS {
            if self.cancelled() {
                return;
            }
            let nodes = match self.page.query_all(None, &Selector::id_prefix(prefix)).await {
                Ok(nodes) => nodes,
                Err(e) => {
                    tracing::warn!("Failed to search for {}* toggles: {}", prefix, e);
                    continue;
                }
            };
            tracing::debug!("Found {} elements with id prefix '{}'", nodes.len(), prefix);

            for node in nodes {
                if self.cancelled() {
                    return;
                }
                let label = match self.page.read(&node).await {
                    Ok(state) => state
                        .id
                        .as_deref()
                        .and_then(|id| id.strip_prefix(prefix))
                        .unwrap_or_default()
                        .to_string(),
                    Err(e) => {
                        tracing::debug!("Skipping unreadable {}* element: {}", prefix, e);
                        continue;
                    }
                };
                self.switch_off_single(&node, section, label, true).await;
            }
        }
    }

    /// Policy check, on-state check, then `turn_off` for one element found by id
    async fn switch_off_single(
        &mut self,
        node: &P::Node,
        section: &str,
        label: String,
        checkbox_only: bool,
    ) {
        let state = match self.page.read(node).await {
            Ok(state) => state,
            Err(e) => {
                tracing::warn!("{}: could not read '{}': {}", section, label, e);
                return;
            }
        };
        let Some(kind) = ToggleKind::classify(&state) else {
            return;
        };
        if checkbox_only && !kind.is_checkbox_role() {
            return;
        }
        if !self.policy.allows(state.identity(), section) || !is_checked(&state) {
            return;
        }

        let timing = &self.options.timing;
        match toggle::turn_off(self.page, node, timing).await {
            Ok(result) => self.record(result.into_outcome(section, label)),
            Err(e) => tracing::warn!("{}: error on '{}': {}", section, label, e),
        }
        pause(timing.click_wait).await;
    }

    fn record(&mut self, outcome: ToggleOutcome) {
        if !outcome.ok {
            tracing::warn!("{}: '{}' did not switch off", outcome.section, outcome.label);
        } else {
            tracing::debug!(
                "{}: '{}' {} -> {} ({})",
                outcome.section,
                outcome.label,
                outcome.before,
                outcome.after,
                outcome.method
            );
        }
        self.report.metrics.record(&outcome);
        self.report.outcomes.push(outcome);
    }
}

fn log_results(report: &RunReport) {
    let metrics = &report.metrics;
    tracing::info!("{}", report.summary_line());
    tracing::info!(
        "Total execution time: {:.2}ms, {} checkboxes, {:.1}% success",
        metrics.total_ms,
        metrics.checkbox_count,
        metrics.success_rate()
    );
    if let Some(average) = metrics.average_ms() {
        tracing::debug!("Average time per checkbox: {:.2}ms", average);
    }
    if let Some(share) = metrics.accordion_share() {
        tracing::debug!("Time spent on accordions: {:.2}ms ({:.1}%)", metrics.accordion_ms, share);
    }
    tracing::debug!("Processing time: {:.2}ms", metrics.processing_ms);
    tracing::debug!("Method distribution: {:?}", metrics.method_counts);
    tracing::debug!("Section times: {:?}", metrics.section_ms);
    for (section, rows) in report.by_section() {
        let changed = rows.iter().filter(|o| o.changed).count();
        tracing::debug!("{}: {}/{} changed", section, changed, rows.len());
    }
}
