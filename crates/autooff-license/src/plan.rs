use crate::Error;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Monthly subscription plans
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Plan {
    Basic,
    Pro,
}

impl Plan {
    pub const ALL: [Plan; 2] = [Plan::Basic, Plan::Pro];

    pub fn as_str(&self) -> &'static str {
        match self {
            Plan::Basic => "basic",
            Plan::Pro => "pro",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Plan::Basic => "Basic",
            Plan::Pro => "Pro",
        }
    }

    /// Monthly price in US cents
    pub fn price_cents(&self) -> u64 {
        match self {
            Plan::Basic => 499,
            Plan::Pro => 999,
        }
    }

    /// `None` means unlimited
    pub fn max_checkboxes(&self) -> Option<u64> {
        match self {
            Plan::Basic => Some(8_000),
            Plan::Pro => None,
        }
    }

    pub fn features(&self) -> &'static [&'static str] {
        match self {
            Plan::Basic => &[
                "8,000 checkboxes unselected",
                "Basic filtering options",
                "Email support",
                "Standard processing speed",
            ],
            Plan::Pro => &[
                "Unlimited checkboxes",
                "Advanced filtering & targeting",
                "Export to CSV/JSON",
                "Priority processing speed",
                "Priority support",
                "Custom section targeting",
                "Bulk operations",
            ],
        }
    }

    pub fn price_display(&self) -> String {
        format!("${}.{:02}/month", self.price_cents() / 100, self.price_cents() % 100)
    }
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Plan {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "basic" => Ok(Plan::Basic),
            "pro" => Ok(Plan::Pro),
            other => Err(Error::UnknownPlan(other.to_string())),
        }
    }
}
