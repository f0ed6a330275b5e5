//! Session facade over the whole tracking core.
//!
//! A `HealthTracker` is built per signed-in user (or guest) and owns the
//! six category stores, the consumption ledger and the assessment manager,
//! all sharing one local store and one sync backend. It wires the flows
//! the screens trigger: ledger mutations refresh the nutrition percentage
//! against the metabolic plan, assessments feed the mental-health store,
//! and the reset scheduler zeroes everything once per day.

use std::sync::Arc;

use chrono::Local;
use tracing::debug;
use uuid::Uuid;

use crate::assessment::{AssessmentManager, AssessmentRecord, AssessmentStatus};
use crate::calculator;
use crate::category::{self, CategoryStore};
use crate::ledger::{ConsumptionLedger, FoodInput};
use crate::models::{ConsumedFood, DailyTotals, HealthSnapshot, NutritionPlan, UserProfile};
use crate::reset::DailyResetScheduler;
use crate::storage::LocalStore;
use crate::sync::RemoteSync;

/// Default daily water goal in ml.
pub const DEFAULT_WATER_GOAL_ML: f64 = 2000.0;

pub struct HealthTracker {
    user: Option<String>,
    store: Arc<dyn LocalStore>,
    plan: tokio::sync::Mutex<Option<NutritionPlan>>,
    pub water: Arc<CategoryStore>,
    pub steps: Arc<CategoryStore>,
    pub workout: Arc<CategoryStore>,
    pub nutrition: Arc<CategoryStore>,
    pub sleep: Arc<CategoryStore>,
    pub mental_health: Arc<CategoryStore>,
    ledger: ConsumptionLedger,
    assessment: AssessmentManager,
}

impl HealthTracker {
    pub fn new(
        store: Arc<dyn LocalStore>,
        remote: Arc<dyn RemoteSync>,
        user: Option<String>,
        water_goal_ml: f64,
    ) -> Self {
        Self {
            user,
            store: store.clone(),
            plan: tokio::sync::Mutex::new(None),
            water: Arc::new(category::water(store.clone(), remote.clone(), water_goal_ml)),
            steps: Arc::new(category::steps(store.clone(), remote.clone())),
            workout: Arc::new(category::workout(store.clone(), remote.clone())),
            nutrition: Arc::new(category::nutrition(store.clone(), remote.clone())),
            sleep: Arc::new(category::sleep(store.clone(), remote.clone())),
            mental_health: Arc::new(category::mental_health(store.clone(), remote.clone())),
            ledger: ConsumptionLedger::new(store.clone(), remote.clone()),
            assessment: AssessmentManager::new(store, remote),
        }
    }

    fn user(&self) -> Option<&str> {
        self.user.as_deref()
    }

    fn categories(&self) -> Vec<Arc<CategoryStore>> {
        vec![
            self.water.clone(),
            self.steps.clone(),
            self.workout.clone(),
            self.nutrition.clone(),
            self.sleep.clone(),
            self.mental_health.clone(),
        ]
    }

    /// Load every category for this session (remote wins over cache).
    pub async fn load_all(&self) {
        for cat in self.categories() {
            cat.load(self.user()).await;
        }
    }

    /// Derive and cache the metabolic plan for a profile. The nutrition
    /// percentage is measured against this plan's calorie target.
    pub async fn set_profile(&self, profile: &UserProfile) -> NutritionPlan {
        let plan = calculator::nutrition_plan(profile);
        *self.plan.lock().await = Some(plan.clone());
        self.refresh_nutrition().await;
        plan
    }

    pub async fn plan(&self) -> Option<NutritionPlan> {
        self.plan.lock().await.clone()
    }

    /// Append a food entry and refresh the nutrition percentage.
    pub async fn log_food(&self, input: FoodInput) -> bool {
        let added = self.ledger.add(self.user(), input).await;
        if added {
            self.refresh_nutrition().await;
        }
        added
    }

    /// Remove a food entry by id and refresh the nutrition percentage.
    pub async fn remove_food(&self, entry_id: Uuid) -> bool {
        let removed = self.ledger.remove(self.user(), entry_id).await;
        if removed {
            self.refresh_nutrition().await;
        }
        removed
    }

    pub async fn todays_foods(&self) -> Vec<ConsumedFood> {
        self.ledger.todays_foods(self.user()).await
    }

    pub async fn todays_totals(&self) -> DailyTotals {
        self.ledger.todays_totals(self.user()).await
    }

    /// Nutrition percentage = consumed calories vs the plan's daily
    /// target, capped at 100. Without a plan (or a zeroed one) the
    /// percentage is left alone.
    async fn refresh_nutrition(&self) {
        let target = match *self.plan.lock().await {
            Some(ref plan) if plan.daily_calories > 0 => f64::from(plan.daily_calories),
            _ => {
                debug!("no calorie target; skipping nutrition percentage refresh");
                return;
            }
        };
        let totals = self.ledger.todays_totals(self.user()).await;
        let pct = (totals.calories / target * 100.0).clamp(0.0, 100.0);
        self.nutrition.update(self.user(), pct).await;
    }

    pub async fn log_water(&self, ml: f64) -> bool {
        self.water.update(self.user(), ml).await
    }

    pub async fn log_steps(&self, count: f64) -> bool {
        self.steps.update(self.user(), count).await
    }

    pub async fn log_sleep(&self, hours: f64) -> bool {
        self.sleep.update(self.user(), hours).await
    }

    pub async fn log_workout(&self, percentage: f64, calories_burned: f64) -> bool {
        self.workout
            .update_with_secondary(self.user(), percentage, calories_burned)
            .await
    }

    /// Score today's questionnaire and feed the mental-health store.
    pub async fn submit_assessment(&self, answers: &[usize]) -> Option<AssessmentRecord> {
        let record = self.assessment.submit(self.user(), answers).await?;
        self.mental_health
            .update_with_secondary(
                self.user(),
                f64::from(record.percentage),
                f64::from(record.points),
            )
            .await;
        Some(record)
    }

    /// Lazily expired: completed only if today's questionnaire was taken.
    pub async fn assessment_status(&self) -> AssessmentStatus {
        self.assessment.status(self.user()).await
    }

    pub async fn reset_assessment(&self) -> bool {
        self.assessment.reset(self.user()).await
    }

    /// Scheduler over this session's six categories. Spawn
    /// [`DailyResetScheduler::run`] on it for the midnight cycle, or call
    /// `reset_if_needed` directly on startup.
    pub fn scheduler(&self) -> Arc<DailyResetScheduler> {
        Arc::new(DailyResetScheduler::new(
            self.store.clone(),
            self.categories(),
        ))
    }

    /// Aggregate snapshot for the chat advisor.
    pub async fn snapshot(&self) -> HealthSnapshot {
        HealthSnapshot {
            water_percentage: self.water.state().await.percentage,
            nutrition_percentage: self.nutrition.state().await.percentage,
            workout_percentage: self.workout.state().await.percentage,
            sleep_percentage: self.sleep.state().await.percentage,
            mental_health_percentage: self.mental_health.state().await.percentage,
            daily_steps: self.steps.state().await.value as u64,
        }
    }

    /// Today's local date, the key under which everything above is tracked.
    pub fn today(&self) -> chrono::NaiveDate {
        Local::now().date_naive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ActivityLevel, Gender};
    use crate::storage::MemoryStore;
    use crate::sync::MemoryRemote;
    use serde_json::json;

    fn food(name: &str, calories: f64) -> FoodInput {
        FoodInput {
            name: name.to_string(),
            serving_description: "1 serving".to_string(),
            calories,
            protein: 10.0,
            fat: 5.0,
            carbs: 20.0,
            quantity: 1.0,
            source: "manual".to_string(),
            source_id: String::new(),
        }
    }

    fn reference_profile() -> UserProfile {
        UserProfile {
            weight_kg: Some(80.0),
            height_cm: Some(180.0),
            age: Some(25),
            gender: Some(Gender::Male),
            activity_level: Some(ActivityLevel::Moderate),
            weight_goal: None,
        }
    }

    fn tracker() -> (HealthTracker, Arc<MemoryRemote>) {
        let remote = Arc::new(MemoryRemote::new());
        (
            HealthTracker::new(
                Arc::new(MemoryStore::new()),
                remote.clone(),
                Some("u1".to_string()),
                DEFAULT_WATER_GOAL_ML,
            ),
            remote,
        )
    }

    #[tokio::test]
    async fn logging_food_refreshes_nutrition_percentage() {
        let (tracker, remote) = tracker();
        let plan = tracker.set_profile(&reference_profile()).await;
        assert_eq!(plan.daily_calories, 2798);

        assert!(tracker.log_food(food("lunch", 1399.0)).await);
        // 1399 / 2798 = 50%
        assert_eq!(tracker.nutrition.state().await.percentage, 50);
        assert_eq!(remote.field("u1", "nutritionPercentage"), Some(json!(50.0)));
        assert_eq!(remote.field("u1", "caloriesConsumed"), Some(json!(1399.0)));
    }

    #[tokio::test]
    async fn removing_food_rolls_percentage_back() {
        let (tracker, _) = tracker();
        tracker.set_profile(&reference_profile()).await;

        assert!(tracker.log_food(food("a", 1000.0)).await);
        assert!(tracker.log_food(food("b", 500.0)).await);
        let id = tracker.todays_foods().await[1].id;
        assert!(tracker.remove_food(id).await);

        let totals = tracker.todays_totals().await;
        assert_eq!(totals.calories, 1000.0);
        // 1000 / 2798 = 35.7 -> 36
        assert_eq!(tracker.nutrition.state().await.percentage, 36);
    }

    #[tokio::test]
    async fn without_plan_nutrition_percentage_stays_put() {
        let (tracker, _) = tracker();
        assert!(tracker.log_food(food("snack", 400.0)).await);
        assert_eq!(tracker.nutrition.state().await.percentage, 0);
    }

    #[tokio::test]
    async fn assessment_feeds_mental_health_store() {
        let (tracker, remote) = tracker();
        let record = tracker.submit_assessment(&[3, 2, 2, 2, 2]).await.unwrap();
        assert_eq!(record.percentage, 75);

        let state = tracker.mental_health.state().await;
        assert_eq!(state.percentage, 75);
        assert_eq!(state.secondary, 12.0);
        assert_eq!(
            remote.field("u1", "mentalHealthPercentage"),
            Some(json!(75.0))
        );
        assert_eq!(tracker.assessment_status().await, AssessmentStatus::Completed);
    }

    #[tokio::test]
    async fn scheduler_covers_all_six_categories() {
        let (tracker, _) = tracker();
        assert!(tracker.log_water(500.0).await);
        assert!(tracker.log_steps(4000.0).await);
        assert!(tracker.log_sleep(7.0).await);
        assert!(tracker.log_workout(40.0, 200.0).await);

        let scheduler = tracker.scheduler();
        assert_eq!(scheduler.reset_if_needed(Some("u1")).await, 6);

        let snapshot = tracker.snapshot().await;
        assert_eq!(snapshot.water_percentage, 0);
        assert_eq!(snapshot.sleep_percentage, 0);
        assert_eq!(snapshot.daily_steps, 0);
    }

    #[tokio::test]
    async fn snapshot_reflects_current_state() {
        let (tracker, _) = tracker();
        assert!(tracker.log_water(1000.0).await);
        assert!(tracker.log_steps(7500.0).await);
        assert!(tracker.log_sleep(8.0).await);

        let snapshot = tracker.snapshot().await;
        assert_eq!(snapshot.water_percentage, 50);
        assert_eq!(snapshot.daily_steps, 7500);
        assert_eq!(snapshot.sleep_percentage, 100);
    }
}
