//! Per-day consumption ledger.
//!
//! Food entries are grouped by (user, device-local calendar date). Daily
//! totals are recomputed from the surviving entries on every read instead
//! of being maintained incrementally, so the totals can never drift from
//! the entry list. Entries carry a stable uuid and are removed by id.
//!
//! Mutations follow the permissive contract of the rest of the core:
//! they return `false` on storage failure rather than propagating errors,
//! and a failed remote mirror never rolls back the local write.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use chrono::{Local, NaiveDate};
use serde_json::{json, Map};
use tracing::warn;
use uuid::Uuid;

use crate::models::{ConsumedFood, DailyTotals};
use crate::storage::LocalStore;
use crate::sync::{sanitize_user_id, RemoteSync};

/// Input for a new ledger entry; id and timestamp are set at append time.
#[derive(Debug, Clone)]
pub struct FoodInput {
    pub name: String,
    pub serving_description: String,
    pub calories: f64,
    pub protein: f64,
    pub fat: f64,
    pub carbs: f64,
    pub quantity: f64,
    pub source: String,
    pub source_id: String,
}

type DayMap = HashMap<String, Vec<ConsumedFood>>;

pub struct ConsumptionLedger {
    store: Arc<dyn LocalStore>,
    remote: Arc<dyn RemoteSync>,
}

impl ConsumptionLedger {
    pub fn new(store: Arc<dyn LocalStore>, remote: Arc<dyn RemoteSync>) -> Self {
        Self { store, remote }
    }

    fn foods_key(user: Option<&str>) -> String {
        format!("@consumed_foods_{}", sanitize_user_id(user))
    }

    fn date_key(date: NaiveDate) -> String {
        date.format("%Y-%m-%d").to_string()
    }

    async fn load_days(&self, user: Option<&str>) -> Result<DayMap> {
        match self.store.get(&Self::foods_key(user)).await? {
            Some(raw) => Ok(serde_json::from_str(&raw).unwrap_or_default()),
            None => Ok(DayMap::new()),
        }
    }

    async fn save_days(&self, user: Option<&str>, days: &DayMap) -> Result<()> {
        let raw = serde_json::to_string(days)?;
        self.store.set(&Self::foods_key(user), &raw).await
    }

    /// Append a food entry to today's list. Rejects non-finite or negative
    /// macro values. Returns `false` on invalid input or storage failure.
    pub async fn add(&self, user: Option<&str>, input: FoodInput) -> bool {
        self.add_on(user, Local::now().date_naive(), input).await
    }

    pub(crate) async fn add_on(&self, user: Option<&str>, date: NaiveDate, input: FoodInput) -> bool {
        let macros = [input.calories, input.protein, input.fat, input.carbs, input.quantity];
        if macros.iter().any(|v| !v.is_finite() || *v < 0.0) {
            warn!(food = %input.name, "rejecting food entry with invalid macro values");
            return false;
        }

        let entry = ConsumedFood {
            id: Uuid::new_v4(),
            name: input.name,
            serving_description: input.serving_description,
            calories: input.calories,
            protein: input.protein,
            fat: input.fat,
            carbs: input.carbs,
            quantity: input.quantity,
            source: input.source,
            source_id: input.source_id,
            logged_at: Local::now(),
        };

        let result: Result<()> = async {
            let mut days = self.load_days(user).await?;
            days.entry(Self::date_key(date)).or_default().push(entry);
            self.save_days(user, &days).await
        }
        .await;

        match result {
            Ok(()) => {
                self.mirror_totals(user, date).await;
                true
            }
            Err(e) => {
                warn!(error = %e, "failed to persist food entry");
                false
            }
        }
    }

    /// Remove one entry from today's list by id. `false` when today has no
    /// list, the id is unknown, or storage fails.
    pub async fn remove(&self, user: Option<&str>, entry_id: Uuid) -> bool {
        let date = Local::now().date_naive();
        let result: Result<bool> = async {
            let mut days = self.load_days(user).await?;
            let Some(foods) = days.get_mut(&Self::date_key(date)) else {
                return Ok(false);
            };
            let before = foods.len();
            foods.retain(|f| f.id != entry_id);
            if foods.len() == before {
                return Ok(false);
            }
            self.save_days(user, &days).await?;
            Ok(true)
        }
        .await;

        match result {
            Ok(true) => {
                self.mirror_totals(user, date).await;
                true
            }
            Ok(false) => false,
            Err(e) => {
                warn!(error = %e, "failed to remove food entry");
                false
            }
        }
    }

    /// Today's surviving entries, oldest first. Empty when none recorded.
    pub async fn todays_foods(&self, user: Option<&str>) -> Vec<ConsumedFood> {
        self.foods_on(user, Local::now().date_naive()).await
    }

    pub(crate) async fn foods_on(&self, user: Option<&str>, date: NaiveDate) -> Vec<ConsumedFood> {
        match self.load_days(user).await {
            Ok(mut days) => days.remove(&Self::date_key(date)).unwrap_or_default(),
            Err(e) => {
                warn!(error = %e, "failed to read food ledger");
                Vec::new()
            }
        }
    }

    /// Today's totals, recomputed from the surviving entries. All-zero
    /// when nothing is recorded.
    pub async fn todays_totals(&self, user: Option<&str>) -> DailyTotals {
        self.totals_on(user, Local::now().date_naive()).await
    }

    pub(crate) async fn totals_on(&self, user: Option<&str>, date: NaiveDate) -> DailyTotals {
        let mut totals = DailyTotals::default();
        for food in self.foods_on(user, date).await {
            totals.add(&food);
        }
        totals
    }

    /// Clear today's entries. Days other than today are left untouched.
    pub async fn reset_today(&self, user: Option<&str>) -> bool {
        let date = Local::now().date_naive();
        let result: Result<bool> = async {
            let mut days = self.load_days(user).await?;
            if days.remove(&Self::date_key(date)).is_none() {
                // Nothing recorded today; skip the write
                return Ok(true);
            }
            self.save_days(user, &days).await?;
            Ok(true)
        }
        .await;

        match result {
            Ok(done) => {
                self.mirror_totals(user, date).await;
                done
            }
            Err(e) => {
                warn!(error = %e, "failed to reset today's ledger");
                false
            }
        }
    }

    /// Best-effort remote mirror of the day's macro totals. Guest sessions
    /// never push; push failures are logged and ignored.
    async fn mirror_totals(&self, user: Option<&str>, date: NaiveDate) {
        let Some(uid) = user.filter(|u| !u.is_empty()) else {
            return;
        };
        let totals = self.totals_on(user, date).await;
        let mut fields = Map::new();
        fields.insert("caloriesConsumed".to_string(), json!(totals.calories));
        fields.insert("proteinConsumed".to_string(), json!(totals.protein));
        fields.insert("carbsConsumed".to_string(), json!(totals.carbs));
        fields.insert("fatConsumed".to_string(), json!(totals.fat));
        if let Err(e) = self.remote.push(uid, fields).await {
            warn!(error = %e, "remote mirror of daily totals failed");
        }
    }
}
