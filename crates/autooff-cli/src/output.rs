//! Rendering of run reports and the spinner shown while a run is in progress.

use crate::OutputFormat;
use anyhow::Result;
use autooff_core::{ProgressSink, RunReport, ToggleOutcome};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Progress text on an indicatif spinner
pub struct SpinnerProgress {
    bar: ProgressBar,
}

impl SpinnerProgress {
    pub fn new() -> Self {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        bar.enable_steady_tick(Duration::from_millis(100));
        Self { bar }
    }

    pub fn finish(&self, message: &str) {
        self.bar.finish_with_message(message.to_string());
    }
}

impl Default for SpinnerProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressSink for SpinnerProgress {
    fn set_text(&self, text: &str) {
        self.bar.set_message(text.to_string());
    }
}

pub fn print_report(report: &RunReport, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => output_json(report),
        OutputFormat::Table => {
            output_table(report);
            Ok(())
        }
        OutputFormat::Pretty => {
            output_pretty(report);
            Ok(())
        }
    }
}

fn section_line(section: &str, rows: &[&ToggleOutcome]) -> String {
    let changed = rows.iter().filter(|o| o.changed).count();
    format!("{}: {}/{} changed", section, changed, rows.len())
}

fn output_pretty(report: &RunReport) {
    let headline = report.completion_message();
    if report.cancelled {
        println!("\n{}", style(headline).yellow().bold());
    } else {
        println!("\n{}", style(headline).green().bold());
    }

    let groups = report.by_section();
    if groups.is_empty() {
        println!("\n{}", style("Nothing was switched on.").dim());
    } else {
        println!("\n{}", style("By section:").bold());
        for (section, rows) in &groups {
            println!("  {}", section_line(section, rows));
            for outcome in rows {
                let mark = if outcome.ok {
                    style("✓").green()
                } else {
                    style("✗").red()
                };
                println!(
                    "    {} {} {}",
                    mark,
                    outcome.label,
                    style(format!("{} → {}", outcome.before, outcome.after)).dim()
                );
            }
        }
    }

    let metrics = &report.metrics;
    println!("\n{}", style("Performance:").bold());
    println!("  Total time:            {:.1} ms", metrics.total_ms);
    println!("  Checkboxes processed:  {}", metrics.checkbox_count);
    println!("  Success rate:          {:.1}%", metrics.success_rate());
    if let Some(average) = metrics.average_ms() {
        println!("  Average per checkbox:  {:.1} ms", average);
    }
    if let Some(share) = metrics.accordion_share() {
        println!("  Opening accordions:    {:.1}% of total", share);
    }
    if !metrics.method_counts.is_empty() {
        let methods: Vec<String> = metrics
            .method_counts
            .iter()
            .map(|(method, count)| format!("{}={}", method, count))
            .collect();
        println!("  Methods:               {}", methods.join(", "));
    }
    println!("  Passes:                {}", metrics.passes);
    if metrics.degraded {
        println!(
            "  {}",
            style("Pass limit reached while items were still switching on").yellow()
        );
    }

    println!("\n{}", report.summary_line());
}

fn output_json(report: &RunReport) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(report)?);
    Ok(())
}

fn output_table(report: &RunReport) {
    println!("Section,Label,Before,After,Changed,Method,Ok");
    for outcome in &report.outcomes {
        println!(
            "{},{},{},{},{},{},{}",
            outcome.section,
            csv_field(&outcome.label),
            outcome.before,
            outcome.after,
            outcome.changed,
            outcome.method,
            outcome.ok
        );
    }
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
