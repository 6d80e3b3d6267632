use crate::Plan;
use autooff_core::settings::{Preferences, Store};
use serde::Serialize;

/// The key that unlocks premium locally
pub const PRODUCT_KEY: &str = "TEAL_PREMIUM_2025";

/// Runs allowed before a license is required; `None` is an unlimited trial
pub const TRIAL_LIMIT: Option<u64> = None;

/// License state derived from the stored preferences
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LicenseStatus {
    pub is_premium: bool,
    pub plan: String,
    pub usage_count: u64,
    pub trial_expired: bool,
}

impl LicenseStatus {
    pub fn from_preferences(prefs: &Preferences) -> Self {
        Self {
            is_premium: prefs.license_key.as_deref() == Some(PRODUCT_KEY),
            plan: prefs.current_plan.clone(),
            usage_count: prefs.usage_count,
            trial_expired: TRIAL_LIMIT.is_some_and(|limit| prefs.usage_count >= limit),
        }
    }

    pub async fn load(store: &dyn Store) -> Self {
        Self::from_preferences(&Preferences::load(store).await)
    }

    /// Premium, or still within the trial
    pub fn check_license(&self) -> bool {
        self.is_premium || !self.trial_expired
    }
}

/// Activate premium when `key` is the product key. Returns whether it was.
pub async fn validate_license(store: &dyn Store, key: &str, plan: Plan) -> bool {
    if key.trim() != PRODUCT_KEY {
        tracing::debug!("Rejected license key");
        return false;
    }

    let prefs = Preferences {
        license_key: Some(PRODUCT_KEY.to_string()),
        current_plan: plan.as_str().to_string(),
        ..Default::default()
    };
    if let Err(e) = prefs.save_license(store).await {
        tracing::error!("Failed to save license: {}", e);
    }
    tracing::info!("License activated ({} plan)", plan);
    true
}
