use crate::OutputFormat;
use anyhow::{Result, bail};
use autooff_license::{Plan, validate_license};
use clap::Subcommand;
use serde_json::json;
use std::path::PathBuf;

#[derive(Subcommand, Debug, Clone)]
pub enum LicenseAction {
    /// Activate premium with a license key
    Activate {
        /// The license key
        #[arg(value_name = "KEY")]
        key: String,

        /// Plan the key was bought for
        #[arg(long, default_value = "basic")]
        plan: Plan,
    },

    /// List the available plans
    Plans,
}

pub fn execute(action: LicenseAction, store: Option<PathBuf>, format: OutputFormat) -> Result<()> {
    match action {
        LicenseAction::Activate { key, plan } => activate(&key, plan, store),
        LicenseAction::Plans => plans(format),
    }
}

fn activate(key: &str, plan: Plan, store: Option<PathBuf>) -> Result<()> {
    let store = super::open_store(store)?;
    let runtime = super::runtime()?;

    if !runtime.block_on(validate_license(store.as_ref(), key, plan)) {
        bail!("Invalid license key");
    }
    println!("✅ License activated ({} plan)", plan.name());
    Ok(())
}

fn plans(format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            let plans: Vec<_> = Plan::ALL
                .iter()
                .map(|plan| {
                    json!({
                        "id": plan.as_str(),
                        "name": plan.name(),
                        "price": plan.price_cents(),
                        "maxCheckboxes": plan.max_checkboxes(),
                        "features": plan.features(),
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&plans)?);
        }
        OutputFormat::Table => {
            println!("Plan,Price,Checkboxes");
            for plan in Plan::ALL {
                let limit = plan
                    .max_checkboxes()
                    .map_or_else(|| "unlimited".to_string(), |n| n.to_string());
                println!("{},{},{}", plan.as_str(), plan.price_display(), limit);
            }
        }
        OutputFormat::Pretty => {
            use console::style;

            for plan in Plan::ALL {
                println!(
                    "\n{} {}",
                    style(plan.name()).bold().cyan(),
                    style(plan.price_display()).green()
                );
                for feature in plan.features() {
                    println!("  • {}", feature);
                }
            }
            println!();
        }
    }
    Ok(())
}
