use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SwitchState {
    On,
    Off,
}

impl SwitchState {
    pub fn from_checked(checked: bool) -> Self {
        if checked { SwitchState::On } else { SwitchState::Off }
    }

    pub fn is_on(self) -> bool {
        self == SwitchState::On
    }
}

impl fmt::Display for SwitchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SwitchState::On => "on",
            SwitchState::Off => "off",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToggleMethod {
    /// Already off, nothing dispatched
    Noop,
    Click,
}

impl ToggleMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            ToggleMethod::Noop => "noop",
            ToggleMethod::Click => "click",
        }
    }
}

impl fmt::Display for ToggleMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of one attempt to switch an element off
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToggleOutcome {
    pub section: String,
    pub label: String,
    pub before: SwitchState,
    pub after: SwitchState,
    pub changed: bool,
    pub method: ToggleMethod,
    pub ok: bool,
}

/// Counters and timings for one run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunMetrics {
    pub total_ms: f64,
    pub accordion_ms: f64,
    pub processing_ms: f64,
    pub section_ms: BTreeMap<String, f64>,
    /// Elements a toggle was attempted on
    pub checkbox_count: usize,
    pub success_count: usize,
    pub failure_count: usize,
    pub method_counts: BTreeMap<ToggleMethod, usize>,
    pub passes: usize,
    /// The pass limit was reached while passes were still changing things
    pub degraded: bool,
}

impl RunMetrics {
    pub fn record(&mut self, outcome: &ToggleOutcome) {
        self.checkbox_count += 1;
        *self.method_counts.entry(outcome.method).or_insert(0) += 1;
        if outcome.method == ToggleMethod::Click {
            if outcome.ok {
                self.success_count += 1;
            } else {
                self.failure_count += 1;
            }
        }
    }

    pub fn add_section_time(&mut self, section: &str, elapsed: Duration) {
        *self.section_ms.entry(section.to_string()).or_insert(0.0) += millis(elapsed);
    }

    /// Share of verified clicks that turned their element off, in percent
    pub fn success_rate(&self) -> f64 {
        let verified = self.success_count + self.failure_count;
        if verified == 0 {
            100.0
        } else {
            self.success_count as f64 / verified as f64 * 100.0
        }
    }

    pub fn average_ms(&self) -> Option<f64> {
        (self.checkbox_count > 0).then(|| self.total_ms / self.checkbox_count as f64)
    }

    pub fn accordion_share(&self) -> Option<f64> {
        (self.total_ms > 0.0).then(|| self.accordion_ms / self.total_ms * 100.0)
    }
}

pub(crate) fn millis(duration: Duration) -> f64 {
    duration.as_secs_f64() * 1000.0
}

/// Everything a run produced
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub outcomes: Vec<ToggleOutcome>,
    pub metrics: RunMetrics,
    pub cancelled: bool,
}

impl RunReport {
    pub fn changed_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.changed).count()
    }

    /// Outcomes grouped by section, sections in order of first appearance
    pub fn by_section(&self) -> Vec<(&str, Vec<&ToggleOutcome>)> {
        let mut groups: Vec<(&str, Vec<&ToggleOutcome>)> = Vec::new();
        for outcome in &self.outcomes {
            match groups.iter_mut().find(|(name, _)| *name == outcome.section) {
                Some((_, rows)) => rows.push(outcome),
                None => groups.push((outcome.section.as_str(), vec![outcome])),
            }
        }
        groups
    }

    pub fn summary_line(&self) -> String {
        format!(
            "scanned={} • changed={} • success={} • failed={}",
            self.outcomes.len(),
            self.changed_count(),
            self.metrics.success_count,
            self.metrics.failure_count
        )
    }

    /// The single user-facing line shown when a run ends
    pub fn completion_message(&self) -> String {
        if self.cancelled {
            return "Auto-OFF cancelled".to_string();
        }
        format!(
            "Auto-OFF complete! {} items switched off in {:.1}s ({:.0}% success)",
            self.changed_count(),
            self.metrics.total_ms / 1000.0,
            self.metrics.success_rate()
        )
    }
}
