//! User settings, run policy and the persisted counters.

mod preferences;
mod store;

pub use preferences::{LastPerformance, Preferences, UsageStats};
pub use store::{JsonFileStore, MemoryStore, Store, keys};

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Sections scanned on every run, in processing order
pub const SECTION_IDS: &[&str] = &[
    "skills",
    "interests",
    "certifications",
    "memberships",
    "membership",
    "projects",
    "activities",
    "publications",
    "software",
    "software-tools",
    "tools",
    "career-highlights",
    "highlights",
    "technical-skills",
    "languages",
    "frameworks",
];

/// Alternate ids the page uses for a section (singular forms)
pub const SECTION_ID_ALIASES: &[(&str, &[&str])] = &[
    ("certifications", &["certification"]),
    ("memberships", &["membership"]),
    ("activities", &["activity"]),
    ("publications", &["publication"]),
    ("interests", &["interest"]),
    ("languages", &["language"]),
    ("frameworks", &["framework"]),
    ("projects", &["project"]),
    ("skills", &["skill"]),
];

/// Single checkboxes outside any section
pub const EXTRA_IDS: &[&str] =
    &["education-additional-information-994ca3e3-8454-4f8a-bcfa-54727b6ca182"];

/// Id prefixes of generated toggle groups that live outside named sections,
/// with the section name their outcomes are reported under
pub const DYNAMIC_GROUPS: &[(&str, &str)] = &[
    ("skill-", "software-tools"),
    ("tool-", "software-tools"),
    ("platform-", "software-tools"),
];

pub const FULL_TIME_SECTION: &str = "position-type";
pub const EXTRA_SECTION: &str = "extra";

/// Alias lookup over an alias table
pub fn aliases_for<'a>(table: &'a [(&'a str, &'a [&'a str])], logical_id: &str) -> &'a [&'a str] {
    table
        .iter()
        .find(|(id, _)| *id == logical_id)
        .map(|(_, aliases)| *aliases)
        .unwrap_or(&[])
}

/// User preferences, stored under the `settings` key.
///
/// Missing fields take their defaults, so older or partial records load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub auto_save: bool,
    pub show_progress: bool,
    pub enable_keyboard_shortcuts: bool,
    pub enable_right_click: bool,
    pub custom_sections: Vec<String>,
    pub preserve_selected: Vec<String>,
    pub exclude_sections: Vec<String>,
    pub theme: String,
    pub language: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            auto_save: true,
            show_progress: true,
            enable_keyboard_shortcuts: true,
            enable_right_click: true,
            custom_sections: Vec::new(),
            preserve_selected: Vec::new(),
            exclude_sections: Vec::new(),
            theme: "auto".to_string(),
            language: "en".to_string(),
        }
    }
}

impl Settings {
    /// Default sections followed by custom ones, without duplicates
    pub fn all_sections(&self) -> Vec<String> {
        let mut sections: Vec<String> = SECTION_IDS.iter().map(|s| s.to_string()).collect();
        for custom in &self.custom_sections {
            if !sections.contains(custom) {
                sections.push(custom.clone());
            }
        }
        sections
    }

    pub fn policy(&self) -> Policy {
        Policy::new(
            self.preserve_selected.iter().cloned(),
            self.exclude_sections.iter().cloned(),
        )
    }
}

/// Which elements a run may touch
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Policy {
    preserve: HashSet<String>,
    exclude: HashSet<String>,
}

impl Policy {
    pub fn new(
        preserve: impl IntoIterator<Item = String>,
        exclude: impl IntoIterator<Item = String>,
    ) -> Self {
        Self {
            preserve: preserve.into_iter().collect(),
            exclude: exclude.into_iter().collect(),
        }
    }

    pub fn section_allowed(&self, section: &str) -> bool {
        !self.exclude.contains(section)
    }

    pub fn is_preserved(&self, identity: Option<&str>) -> bool {
        identity.is_some_and(|id| self.preserve.contains(id))
    }

    pub fn allows(&self, identity: Option<&str>, section: &str) -> bool {
        !self.is_preserved(identity) && self.section_allowed(section)
    }
}
