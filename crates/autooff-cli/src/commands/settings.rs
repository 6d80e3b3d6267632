use crate::OutputFormat;
use anyhow::{Context, Result};
use autooff_core::settings::{Preferences, SECTION_IDS, Settings};
use clap::Subcommand;
use std::path::PathBuf;

#[derive(Subcommand, Debug, Clone)]
pub enum SettingsAction {
    /// Show the current settings
    Show,

    /// Never switch off the elements with these ids
    Preserve {
        #[arg(required = true, value_name = "ID")]
        ids: Vec<String>,
    },

    /// Stop preserving the elements with these ids
    Unpreserve {
        #[arg(required = true, value_name = "ID")]
        ids: Vec<String>,
    },

    /// Skip these sections entirely
    Exclude {
        #[arg(required = true, value_name = "SECTION")]
        sections: Vec<String>,
    },

    /// Process previously excluded sections again
    Include {
        #[arg(required = true, value_name = "SECTION")]
        sections: Vec<String>,
    },

    /// Process additional sections after the built-in ones
    AddSection {
        #[arg(required = true, value_name = "NAME")]
        names: Vec<String>,
    },

    /// Remove custom sections
    RemoveSection {
        #[arg(required = true, value_name = "NAME")]
        names: Vec<String>,
    },

    /// Restore the default settings
    Reset,
}

fn add_all(list: &mut Vec<String>, items: Vec<String>) -> usize {
    let mut added = 0;
    for item in items {
        let item = item.trim().to_string();
        if !item.is_empty() && !list.contains(&item) {
            list.push(item);
            added += 1;
        }
    }
    added
}

fn remove_all(list: &mut Vec<String>, items: &[String]) -> usize {
    let before = list.len();
    list.retain(|entry| !items.iter().any(|item| item.trim() == entry));
    before - list.len()
}

/// Apply `action` to `settings`. Returns a message when something changed,
/// `None` for read-only actions.
pub fn apply(settings: &mut Settings, action: SettingsAction) -> Option<String> {
    let message = match action {
        SettingsAction::Show => return None,
        SettingsAction::Preserve { ids } => {
            let n = add_all(&mut settings.preserve_selected, ids);
            format!("Preserving {} more element(s)", n)
        }
        SettingsAction::Unpreserve { ids } => {
            let n = remove_all(&mut settings.preserve_selected, &ids);
            format!("No longer preserving {} element(s)", n)
        }
        SettingsAction::Exclude { sections } => {
            let n = add_all(&mut settings.exclude_sections, sections);
            format!("Excluded {} more section(s)", n)
        }
        SettingsAction::Include { sections } => {
            let n = remove_all(&mut settings.exclude_sections, &sections);
            format!("Included {} section(s) again", n)
        }
        SettingsAction::AddSection { names } => {
            let names: Vec<String> = names
                .into_iter()
                .filter(|name| !SECTION_IDS.contains(&name.trim()))
                .collect();
            let n = add_all(&mut settings.custom_sections, names);
            format!("Added {} custom section(s)", n)
        }
        SettingsAction::RemoveSection { names } => {
            let n = remove_all(&mut settings.custom_sections, &names);
            format!("Removed {} custom section(s)", n)
        }
        SettingsAction::Reset => {
            *settings = Settings::default();
            "Settings reset to defaults".to_string()
        }
    };
    Some(message)
}

pub fn execute(
    action: SettingsAction,
    store: Option<PathBuf>,
    format: OutputFormat,
) -> Result<()> {
    let store = super::open_store(store)?;
    let runtime = super::runtime()?;

    runtime.block_on(async {
        let mut prefs = Preferences::try_load(store.as_ref())
            .await
            .context("Failed to read stored settings")?;
        if let Some(message) = apply(&mut prefs.settings, action) {
            prefs.save_settings(store.as_ref()).await?;
            tracing::debug!("Saved settings: {:?}", prefs.settings);
            println!("✅ {}", message);
            return Ok(());
        }

        match format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&prefs.settings)?),
            OutputFormat::Table => output_table(&prefs.settings),
            OutputFormat::Pretty => output_pretty(&prefs.settings),
        }
        Ok::<_, anyhow::Error>(())
    })
}

fn list_or_none(items: &[String]) -> String {
    if items.is_empty() {
        "(none)".to_string()
    } else {
        items.join(", ")
    }
}

fn output_pretty(settings: &Settings) {
    use console::style;

    println!("\n{}", style("Auto-OFF Settings").bold().cyan());
    println!("{}", style("=================").cyan());
    println!("  Auto save:          {}", settings.auto_save);
    println!("  Show progress:      {}", settings.show_progress);
    println!("  Keyboard shortcuts: {}", settings.enable_keyboard_shortcuts);
    println!("  Context menu:       {}", settings.enable_right_click);
    println!("  Theme:              {}", settings.theme);
    println!("  Language:           {}", settings.language);
    println!("  Preserved:          {}", list_or_none(&settings.preserve_selected));
    println!("  Excluded sections:  {}", list_or_none(&settings.exclude_sections));
    println!("  Custom sections:    {}", list_or_none(&settings.custom_sections));

    println!("\n{}", style("Sections processed:").bold());
    for section in settings.all_sections() {
        if settings.exclude_sections.contains(&section) {
            println!("  {} {}", section, style("(excluded)").dim());
        } else {
            println!("  {}", section);
        }
    }
    println!();
}

fn output_table(settings: &Settings) {
    println!("Setting,Value");
    println!("auto_save,{}", settings.auto_save);
    println!("show_progress,{}", settings.show_progress);
    println!("enable_keyboard_shortcuts,{}", settings.enable_keyboard_shortcuts);
    println!("enable_right_click,{}", settings.enable_right_click);
    println!("theme,{}", settings.theme);
    println!("language,{}", settings.language);
    println!("preserve_selected,{}", settings.preserve_selected.join(" "));
    println!("exclude_sections,{}", settings.exclude_sections.join(" "));
    println!("custom_sections,{}", settings.custom_sections.join(" "));
}
