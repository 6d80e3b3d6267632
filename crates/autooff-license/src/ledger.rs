//! In-memory payment and subscription records for the demo server.
//!
//! Nothing here talks to a payment processor: an intent is considered paid as
//! soon as it is confirmed.

use crate::{Error, Plan, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use tokio::sync::Mutex;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentIntent {
    pub id: String,
    pub client_secret: String,
    pub amount: u64,
    pub currency: String,
    pub plan: Plan,
    pub customer_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    pub plan: Plan,
    pub license_key: String,
    pub created_at: DateTime<Utc>,
    pub active: bool,
    pub payment_intent_id: String,
}

#[derive(Debug, Default)]
struct State {
    intents: HashMap<String, PaymentIntent>,
    /// Keyed by customer id; a customer holds one subscription at a time
    subscriptions: HashMap<String, Subscription>,
}

#[derive(Debug, Default)]
pub struct Ledger {
    state: Mutex<State>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn create_intent(&self, plan: Plan, customer_id: Option<String>) -> PaymentIntent {
        let id = format!("pi_{}", Uuid::new_v4().simple());
        let intent = PaymentIntent {
            client_secret: format!("{}_secret_{}", id, Uuid::new_v4().simple()),
            id: id.clone(),
            amount: plan.price_cents(),
            currency: "usd".to_string(),
            plan,
            customer_id,
        };

        tracing::info!(
            "Created payment intent {} ({} cents, {} plan)",
            id,
            intent.amount,
            plan
        );
        self.state.lock().await.intents.insert(id, intent.clone());
        intent
    }

    /// Turn a known intent into an active subscription with a fresh license key
    pub async fn confirm(
        &self,
        intent_id: &str,
        customer_id: &str,
        plan: Plan,
    ) -> Result<Subscription> {
        let mut state = self.state.lock().await;
        if !state.intents.contains_key(intent_id) {
            tracing::warn!("Confirmation for unknown payment intent {}", intent_id);
            return Err(Error::PaymentNotCompleted);
        }

        let subscription = Subscription {
            plan,
            license_key: generate_license_key(Utc::now()),
            created_at: Utc::now(),
            active: true,
            payment_intent_id: intent_id.to_string(),
        };
        state
            .subscriptions
            .insert(customer_id.to_string(), subscription.clone());

        tracing::info!("Issued license for customer {} ({} plan)", customer_id, plan);
        Ok(subscription)
    }

    /// The active subscription holding `license_key`, if any
    pub async fn validate(&self, license_key: &str) -> Option<Subscription> {
        self.state
            .lock()
            .await
            .subscriptions
            .values()
            .find(|s| s.active && s.license_key == license_key)
            .cloned()
    }
}

/// `TEAL_PREMIUM_<unix millis>_<9 uppercase base-36 characters>`
pub fn generate_license_key(now: DateTime<Utc>) -> String {
    format!("TEAL_PREMIUM_{}_{}", now.timestamp_millis(), key_suffix(Uuid::new_v4()))
}

/// The low base-36 digits of a v4 uuid's random bits
fn key_suffix(id: Uuid) -> String {
    const DIGITS: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";
    let mut value = id.as_u128();
    (0..9)
        .map(|_| {
            let digit = DIGITS[(value % 36) as usize] as char;
            value /= 36;
            digit
        })
        .collect()
}
