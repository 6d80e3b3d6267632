use super::store::{Store, keys};
use super::Settings;
use crate::report::RunMetrics;
use crate::Result;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

/// Persisted user state, loaded once per run.
///
/// `load` falls back to defaults when the store can't be read. Each write
/// touches only the keys it owns, so a fallback record is never written back
/// over the stored one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Preferences {
    pub usage_count: u64,
    pub license_key: Option<String>,
    pub current_plan: String,
    pub settings: Settings,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            usage_count: 0,
            license_key: None,
            current_plan: "basic".to_string(),
            settings: Settings::default(),
        }
    }
}

impl Preferences {
    pub async fn load(store: &dyn Store) -> Self {
        match Self::try_load(store).await {
            Ok(prefs) => {
                tracing::debug!("Settings loaded: {:?}", prefs);
                prefs
            }
            Err(e) => {
                tracing::error!("Failed to load settings, using defaults: {}", e);
                Self::default()
            }
        }
    }

    /// Like `load`, but a read or decode failure is returned
    pub async fn try_load(store: &dyn Store) -> Result<Self> {
        let values = store
            .get(&[
                keys::USAGE_COUNT,
                keys::LICENSE_KEY,
                keys::CURRENT_PLAN,
                keys::SETTINGS,
            ])
            .await?;

        let settings = match values.get(keys::SETTINGS) {
            Some(value) if !value.is_null() => serde_json::from_value(value.clone())?,
            _ => Settings::default(),
        };

        Ok(Self {
            usage_count: values.get(keys::USAGE_COUNT).and_then(Value::as_u64).unwrap_or(0),
            license_key: values
                .get(keys::LICENSE_KEY)
                .and_then(Value::as_str)
                .map(str::to_string),
            current_plan: values
                .get(keys::CURRENT_PLAN)
                .and_then(Value::as_str)
                .unwrap_or("basic")
                .to_string(),
            settings,
        })
    }

    /// Write `license_key` and `current_plan`
    pub async fn save_license(&self, store: &dyn Store) -> Result<()> {
        let mut values = Map::new();
        values.insert(keys::LICENSE_KEY.to_string(), json!(self.license_key));
        values.insert(keys::CURRENT_PLAN.to_string(), json!(self.current_plan));
        store.set(values).await
    }

    /// Write `settings`
    pub async fn save_settings(&self, store: &dyn Store) -> Result<()> {
        let mut values = Map::new();
        values.insert(keys::SETTINGS.to_string(), serde_json::to_value(&self.settings)?);
        store.set(values).await
    }

    /// Add one to the stored run counter. Only `usage_count` is written.
    pub async fn increment_usage(&mut self, store: &dyn Store) {
        let result = async {
            let current = store.get(&[keys::USAGE_COUNT]).await?;
            let count = current
                .get(keys::USAGE_COUNT)
                .and_then(Value::as_u64)
                .unwrap_or(0)
                + 1;

            let mut values = Map::new();
            values.insert(keys::USAGE_COUNT.to_string(), json!(count));
            store.set(values).await?;
            Ok::<_, crate::Error>(count)
        }
        .await;

        match result {
            Ok(count) => self.usage_count = count,
            Err(e) => {
                self.usage_count += 1;
                tracing::error!("Failed to update usage count: {}", e);
            }
        }
    }
}

/// The last run's headline numbers, as shown on the dashboard
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LastPerformance {
    pub execution_time_ms: f64,
    pub checkboxes_processed: usize,
    pub success_rate: f64,
    /// Unix milliseconds
    pub timestamp: i64,
}

/// Lifetime counters
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UsageStats {
    pub usage_count: u64,
    pub total_operations: u64,
    pub checkboxes_processed: u64,
    pub last_performance: Option<LastPerformance>,
}

impl UsageStats {
    pub async fn load(store: &dyn Store) -> Result<Self> {
        let values = store
            .get(&[
                keys::USAGE_COUNT,
                keys::TOTAL_OPERATIONS,
                keys::CHECKBOXES_PROCESSED,
                keys::LAST_PERFORMANCE,
            ])
            .await?;
        let count = |key: &str| values.get(key).and_then(Value::as_u64).unwrap_or(0);

        Ok(Self {
            usage_count: count(keys::USAGE_COUNT),
            total_operations: count(keys::TOTAL_OPERATIONS),
            checkboxes_processed: count(keys::CHECKBOXES_PROCESSED),
            last_performance: values
                .get(keys::LAST_PERFORMANCE)
                .filter(|v| !v.is_null())
                .map(|v| serde_json::from_value(v.clone()))
                .transpose()?,
        })
    }

    /// Zero the counters on first use
    pub async fn initialize(store: &dyn Store) {
        let result = async {
            let existing = store.get(&[keys::TOTAL_OPERATIONS]).await?;
            if existing.is_empty() {
                let mut values = Map::new();
                values.insert(keys::TOTAL_OPERATIONS.to_string(), json!(0));
                values.insert(keys::CHECKBOXES_PROCESSED.to_string(), json!(0));
                values.insert(keys::USAGE_COUNT.to_string(), json!(0));
                store.set(values).await?;
                tracing::info!("Usage statistics initialized");
            }
            Ok::<_, crate::Error>(())
        }
        .await;

        if let Err(e) = result {
            tracing::error!("Failed to initialize stats: {}", e);
        }
    }

    /// Record a finished run
    pub async fn record_run(store: &dyn Store, changed: usize, metrics: &RunMetrics) {
        let result = async {
            let performance = LastPerformance {
                execution_time_ms: metrics.total_ms,
                checkboxes_processed: metrics.checkbox_count,
                success_rate: if metrics.checkbox_count > 0 {
                    metrics.success_rate()
                } else {
                    0.0
                },
                timestamp: chrono::Utc::now().timestamp_millis(),
            };
            let mut values = Map::new();
            values.insert(
                keys::LAST_PERFORMANCE.to_string(),
                serde_json::to_value(&performance)?,
            );
            store.set(values).await?;

            let current = Self::load(store).await?;
            let total_operations = current.total_operations + 1;
            let checkboxes_processed = current.checkboxes_processed + changed as u64;

            let mut values = Map::new();
            values.insert(keys::TOTAL_OPERATIONS.to_string(), json!(total_operations));
            values.insert(
                keys::CHECKBOXES_PROCESSED.to_string(),
                json!(checkboxes_processed),
            );
            store.set(values).await?;

            tracing::info!(
                "Usage stats updated: {} operations, {} checkboxes",
                total_operations,
                checkboxes_processed
            );
            Ok::<_, crate::Error>(())
        }
        .await;

        if let Err(e) = result {
            tracing::error!("Failed to update usage stats: {}", e);
        }
    }
}
