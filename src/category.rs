//! Per-dimension aggregation stores.
//!
//! One generic store covers all six tracked dimensions; the differences
//! (clamp range, percentage derivation, remote field names) live in a
//! `CategorySpec` so the load/update/reset flow exists exactly once.
//! The six specs are constructed by the functions at the bottom.
//!
//! Load order: remote record wins when it carries the dimension's field,
//! then the local cache, then zero. Every accepted mutation persists
//! locally first and then mirrors remotely best-effort.

use std::sync::Arc;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tokio::sync::Mutex;
use tracing::warn;

use crate::storage::LocalStore;
use crate::sync::{sanitize_user_id, RemoteSync};

/// How a dimension derives its display percentage from its value.
#[derive(Debug, Clone, Copy)]
pub enum PercentRule {
    /// Value measured against a fixed goal (water ml, steps, sleep hours).
    OfGoal(f64),
    /// The value already is a percentage.
    Identity,
}

#[derive(Debug, Clone, Copy)]
pub struct CategorySpec {
    pub name: &'static str,
    /// Values are clamped into [0, max_value].
    pub max_value: f64,
    pub percent: PercentRule,
    /// Field name on the remote health record.
    pub value_field: &'static str,
    /// Secondary metric field (calories burned, assessment score).
    pub secondary_field: Option<&'static str>,
}

impl CategorySpec {
    fn percentage_for(&self, value: f64) -> u8 {
        let pct = match self.percent {
            PercentRule::OfGoal(goal) if goal > 0.0 => (value / goal * 100.0).round(),
            PercentRule::OfGoal(_) => 0.0,
            PercentRule::Identity => value.round(),
        };
        pct.clamp(0.0, 100.0) as u8
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoryState {
    pub value: f64,
    pub percentage: u8,
    /// Secondary metric, 0 when the dimension has none.
    pub secondary: f64,
}

pub struct CategoryStore {
    spec: CategorySpec,
    store: Arc<dyn LocalStore>,
    remote: Arc<dyn RemoteSync>,
    state: Mutex<CategoryState>,
}

impl CategoryStore {
    pub fn new(spec: CategorySpec, store: Arc<dyn LocalStore>, remote: Arc<dyn RemoteSync>) -> Self {
        Self {
            spec,
            store,
            remote,
            state: Mutex::new(CategoryState::default()),
        }
    }

    pub fn name(&self) -> &'static str {
        self.spec.name
    }

    fn local_key(&self, user: Option<&str>) -> String {
        format!("@{}_{}", self.spec.name, sanitize_user_id(user))
    }

    /// Current in-memory state.
    pub async fn state(&self) -> CategoryState {
        *self.state.lock().await
    }

    /// Load state for a user: remote field wins, then local cache, then 0.
    pub async fn load(&self, user: Option<&str>) -> CategoryState {
        if let Some(uid) = user.filter(|u| !u.is_empty()) {
            match self.remote.pull(uid).await {
                Ok(Some(record)) => {
                    if let Some(value) = record.get(self.spec.value_field).and_then(Value::as_f64) {
                        let secondary = self
                            .spec
                            .secondary_field
                            .and_then(|f| record.get(f))
                            .and_then(Value::as_f64)
                            .unwrap_or(0.0);
                        let state = self.clamped_state(value, secondary);
                        *self.state.lock().await = state;
                        self.persist_local(user, state).await;
                        return state;
                    }
                }
                Ok(None) => {}
                Err(e) => warn!(category = self.spec.name, error = %e, "remote load failed"),
            }
        }

        let state = match self.store.get(&self.local_key(user)).await {
            Ok(Some(raw)) => serde_json::from_str(&raw).unwrap_or_default(),
            Ok(None) => CategoryState::default(),
            Err(e) => {
                warn!(category = self.spec.name, error = %e, "local load failed");
                CategoryState::default()
            }
        };
        *self.state.lock().await = state;
        state
    }

    /// Clamp and store a new value. Non-finite or negative raw input is
    /// rejected with a warning and leaves the state untouched.
    pub async fn update(&self, user: Option<&str>, raw: f64) -> bool {
        self.apply(user, raw, None).await
    }

    /// Like [`update`](Self::update) but also sets the secondary metric.
    pub async fn update_with_secondary(&self, user: Option<&str>, raw: f64, secondary: f64) -> bool {
        self.apply(user, raw, Some(secondary)).await
    }

    async fn apply(&self, user: Option<&str>, raw: f64, secondary: Option<f64>) -> bool {
        if !raw.is_finite() || raw < 0.0 || secondary.is_some_and(|s| !s.is_finite() || s < 0.0) {
            warn!(category = self.spec.name, raw, "rejecting invalid value");
            return false;
        }

        let state = {
            let mut guard = self.state.lock().await;
            let kept_secondary = secondary.unwrap_or(guard.secondary);
            *guard = self.clamped_state(raw, kept_secondary);
            *guard
        };

        self.persist_local(user, state).await;
        self.push_remote(user, state).await;
        true
    }

    /// Zero the value, percentage and secondary metric.
    pub async fn reset(&self, user: Option<&str>) -> Result<()> {
        let state = CategoryState::default();
        *self.state.lock().await = state;

        if user.filter(|u| !u.is_empty()).is_none() {
            // Guest: drop the cached entry instead of writing zeros
            self.store.remove(&self.local_key(user)).await?;
            return Ok(());
        }

        self.persist_local(user, state).await;
        self.push_remote(user, state).await;
        Ok(())
    }

    fn clamped_state(&self, raw: f64, secondary: f64) -> CategoryState {
        let value = raw.clamp(0.0, self.spec.max_value);
        CategoryState {
            value,
            percentage: self.spec.percentage_for(value),
            secondary,
        }
    }

    async fn persist_local(&self, user: Option<&str>, state: CategoryState) {
        // Guest sessions with an all-zero state skip persistence so
        // anonymous sessions do not litter the store with zero entries.
        let guest = user.filter(|u| !u.is_empty()).is_none();
        if guest && state.value == 0.0 && state.secondary == 0.0 {
            return;
        }
        let raw = match serde_json::to_string(&state) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(category = self.spec.name, error = %e, "state serialize failed");
                return;
            }
        };
        if let Err(e) = self.store.set(&self.local_key(user), &raw).await {
            warn!(category = self.spec.name, error = %e, "local persist failed");
        }
    }

    /// Best-effort; guest values are never pushed.
    async fn push_remote(&self, user: Option<&str>, state: CategoryState) {
        let Some(uid) = user.filter(|u| !u.is_empty()) else {
            return;
        };
        let mut fields = Map::new();
        fields.insert(self.spec.value_field.to_string(), json!(state.value));
        if let Some(field) = self.spec.secondary_field {
            fields.insert(field.to_string(), json!(state.secondary));
        }
        if let Err(e) = self.remote.push(uid, fields).await {
            warn!(category = self.spec.name, error = %e, "remote push failed");
        }
    }
}

/// Water intake in ml, measured against a configurable daily goal.
pub fn water(store: Arc<dyn LocalStore>, remote: Arc<dyn RemoteSync>, goal_ml: f64) -> CategoryStore {
    CategoryStore::new(
        CategorySpec {
            name: "water_intake",
            max_value: goal_ml,
            percent: PercentRule::OfGoal(goal_ml),
            value_field: "waterIntake",
            secondary_field: None,
        },
        store,
        remote,
    )
}

/// Step count, capped at 50 000, with percentage against a 10 000 goal.
pub fn steps(store: Arc<dyn LocalStore>, remote: Arc<dyn RemoteSync>) -> CategoryStore {
    CategoryStore::new(
        CategorySpec {
            name: "daily_steps",
            max_value: 50_000.0,
            percent: PercentRule::OfGoal(10_000.0),
            value_field: "dailySteps",
            secondary_field: None,
        },
        store,
        remote,
    )
}

/// Workout completion percentage plus calories burned as secondary metric.
pub fn workout(store: Arc<dyn LocalStore>, remote: Arc<dyn RemoteSync>) -> CategoryStore {
    CategoryStore::new(
        CategorySpec {
            name: "workout",
            max_value: 100.0,
            percent: PercentRule::Identity,
            value_field: "workoutPercentage",
            secondary_field: Some("caloriesBurned"),
        },
        store,
        remote,
    )
}

/// Nutrition progress percentage, fed from the consumption ledger.
pub fn nutrition(store: Arc<dyn LocalStore>, remote: Arc<dyn RemoteSync>) -> CategoryStore {
    CategoryStore::new(
        CategorySpec {
            name: "nutrition",
            max_value: 100.0,
            percent: PercentRule::Identity,
            value_field: "nutritionPercentage",
            secondary_field: None,
        },
        store,
        remote,
    )
}

/// Sleep hours, clamped to [0, 24], percentage against an 8 hour target.
pub fn sleep(store: Arc<dyn LocalStore>, remote: Arc<dyn RemoteSync>) -> CategoryStore {
    CategoryStore::new(
        CategorySpec {
            name: "sleep",
            max_value: 24.0,
            percent: PercentRule::OfGoal(8.0),
            value_field: "sleepHours",
            secondary_field: None,
        },
        store,
        remote,
    )
}

/// Mental-health percentage plus raw assessment score as secondary metric.
pub fn mental_health(store: Arc<dyn LocalStore>, remote: Arc<dyn RemoteSync>) -> CategoryStore {
    CategoryStore::new(
        CategorySpec {
            name: "mental_health",
            max_value: 100.0,
            percent: PercentRule::Identity,
            value_field: "mentalHealthPercentage",
            secondary_field: Some("mentalHealthScore"),
        },
        store,
        remote,
    )
}
