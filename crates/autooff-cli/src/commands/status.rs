use crate::OutputFormat;
use anyhow::Result;
use autooff_core::settings::{LastPerformance, UsageStats};
use autooff_license::LicenseStatus;
use chrono::{DateTime, Local};
use serde::Serialize;
use std::path::PathBuf;

/// Everything the dashboard shows
#[derive(Debug, Serialize)]
pub struct Dashboard {
    pub license: LicenseStatus,
    pub stats: UsageStats,
}

pub fn execute(store: Option<PathBuf>, format: OutputFormat) -> Result<()> {
    let store = super::open_store(store)?;
    let runtime = super::runtime()?;

    let dashboard = runtime.block_on(async {
        let license = LicenseStatus::load(store.as_ref()).await;
        let stats = UsageStats::load(store.as_ref()).await?;
        Ok::<_, anyhow::Error>(Dashboard { license, stats })
    })?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&dashboard)?),
        OutputFormat::Table => output_table(&dashboard),
        OutputFormat::Pretty => output_pretty(&dashboard),
    }
    Ok(())
}

fn run_time(performance: &LastPerformance) -> String {
    DateTime::from_timestamp_millis(performance.timestamp)
        .map(|utc| {
            utc.with_timezone(&Local)
                .format("%Y-%m-%d %H:%M:%S")
                .to_string()
        })
        .unwrap_or_else(|| "unknown".to_string())
}

fn output_pretty(dashboard: &Dashboard) {
    use console::style;

    let license = &dashboard.license;
    let stats = &dashboard.stats;

    println!("\n{}", style("Auto-OFF Dashboard").bold().cyan());
    println!("{}", style("==================").cyan());

    println!("\n{}", style("License:").bold());
    if license.is_premium {
        println!("  Status:             {}", style("Premium").green().bold());
    } else if license.check_license() {
        println!("  Status:             {}", style("Trial").yellow());
    } else {
        println!("  Status:             {}", style("Trial expired").red());
    }
    println!("  Plan:               {}", license.plan);

    println!("\n{}", style("Usage:").bold());
    println!("  Runs:               {}", stats.usage_count);
    println!("  Total operations:   {}", stats.total_operations);
    println!("  Items switched off: {}", stats.checkboxes_processed);

    println!("\n{}", style("Last run:").bold());
    match &stats.last_performance {
        Some(performance) => {
            println!("  When:               {}", run_time(performance));
            println!("  Execution time:     {:.1} ms", performance.execution_time_ms);
            println!("  Checkboxes:         {}", performance.checkboxes_processed);
            println!("  Success rate:       {:.1}%", performance.success_rate);
        }
        None => println!("  {}", style("No runs yet").dim()),
    }
    println!();
}

fn output_table(dashboard: &Dashboard) {
    let license = &dashboard.license;
    let stats = &dashboard.stats;

    println!("Metric,Value");
    println!("Premium,{}", license.is_premium);
    println!("Plan,{}", license.plan);
    println!("Runs,{}", stats.usage_count);
    println!("Total Operations,{}", stats.total_operations);
    println!("Items Switched Off,{}", stats.checkboxes_processed);
    if let Some(performance) = &stats.last_performance {
        println!("Last Execution Time (ms),{:.1}", performance.execution_time_ms);
        println!("Last Checkboxes,{}", performance.checkboxes_processed);
        println!("Last Success Rate (%),{:.1}", performance.success_rate);
    }
}
