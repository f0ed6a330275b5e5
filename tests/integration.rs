use std::sync::Arc;

use vitaltrack_core::auth::FirebaseAuth;
use vitaltrack_core::config::FirebaseConfig;
use vitaltrack_core::firestore::FirestoreClient;
use vitaltrack_core::ledger::FoodInput;
use vitaltrack_core::models::{ActivityLevel, Gender, UserProfile};
use vitaltrack_core::storage::MemoryStore;
use vitaltrack_core::sync::{FirestoreSync, MemoryRemote, RemoteSync};
use vitaltrack_core::tracker::{HealthTracker, DEFAULT_WATER_GOAL_ML};

/// Surface the core's warn-path logging while tests run.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::WARN)
        .with_test_writer()
        .try_init();
}

fn food(name: &str, calories: f64, protein: f64, fat: f64, carbs: f64) -> FoodInput {
    FoodInput {
        name: name.to_string(),
        serving_description: "1 serving".to_string(),
        calories,
        protein,
        fat,
        carbs,
        quantity: 1.0,
        source: "manual".to_string(),
        source_id: String::new(),
    }
}

#[tokio::test]
async fn full_day_flow_against_in_memory_backends() {
    init_tracing();
    let store = Arc::new(MemoryStore::new());
    let remote = Arc::new(MemoryRemote::new());
    let tracker = HealthTracker::new(
        store,
        remote.clone(),
        Some("day-flow-user".to_string()),
        DEFAULT_WATER_GOAL_ML,
    );

    // Morning: profile known, nothing logged yet
    let plan = tracker
        .set_profile(&UserProfile {
            weight_kg: Some(80.0),
            height_cm: Some(180.0),
            age: Some(25),
            gender: Some(Gender::Male),
            activity_level: Some(ActivityLevel::Moderate),
            weight_goal: None,
        })
        .await;
    assert_eq!(plan.bmr, 1805);
    assert_eq!(plan.daily_calories, 2798);

    // Startup reset check: first run of the day zeroes everything once
    let scheduler = tracker.scheduler();
    assert_eq!(scheduler.reset_if_needed(Some("day-flow-user")).await, 6);
    assert_eq!(scheduler.reset_if_needed(Some("day-flow-user")).await, 0);

    // Log the day
    assert!(tracker.log_water(1500.0).await);
    assert!(tracker.log_steps(8200.0).await);
    assert!(tracker.log_sleep(7.5).await);
    assert!(tracker.log_workout(60.0, 310.0).await);
    assert!(tracker.log_food(food("oatmeal", 166.0, 5.9, 3.6, 28.1)).await);
    assert!(tracker.log_food(food("chicken salad", 420.0, 38.0, 22.0, 12.0)).await);

    // Mis-logged entry is removed by id; totals follow
    let foods = tracker.todays_foods().await;
    assert_eq!(foods.len(), 2);
    assert!(tracker.remove_food(foods[0].id).await);
    let totals = tracker.todays_totals().await;
    assert_eq!(totals.calories, 420.0);
    assert_eq!(totals.protein, 38.0);

    // Questionnaire
    let record = tracker.submit_assessment(&[3, 3, 2, 2, 2]).await.unwrap();
    assert_eq!(record.status, "Good");

    // Remote record mirrors the session
    let pulled = remote.pull("day-flow-user").await.unwrap().unwrap();
    assert_eq!(pulled["waterIntake"], serde_json::json!(1500.0));
    assert_eq!(pulled["dailySteps"], serde_json::json!(8200.0));
    assert_eq!(pulled["sleepHours"], serde_json::json!(7.5));
    assert_eq!(pulled["workoutPercentage"], serde_json::json!(60.0));
    assert_eq!(pulled["caloriesBurned"], serde_json::json!(310.0));
    assert_eq!(pulled["caloriesConsumed"], serde_json::json!(420.0));
    assert!(pulled["lastUpdated"].as_i64().unwrap() > 0);

    let snapshot = tracker.snapshot().await;
    assert_eq!(snapshot.water_percentage, 75);
    // 420 / 2798 -> 15%
    assert_eq!(snapshot.nutrition_percentage, 15);
}

#[tokio::test]
async fn new_device_adopts_remote_state_on_load() {
    init_tracing();
    let remote = Arc::new(MemoryRemote::new());
    remote.seed(
        "roaming-user",
        serde_json::json!({
            "waterIntake": 1200.0,
            "dailySteps": 6400.0,
            "sleepHours": 6.5,
            "workoutPercentage": 80.0,
            "caloriesBurned": 450.0
        }),
    );

    // Fresh device: empty local store
    let tracker = HealthTracker::new(
        Arc::new(MemoryStore::new()),
        remote,
        Some("roaming-user".to_string()),
        DEFAULT_WATER_GOAL_ML,
    );
    tracker.load_all().await;

    let snapshot = tracker.snapshot().await;
    assert_eq!(snapshot.water_percentage, 60);
    assert_eq!(snapshot.daily_steps, 6400);
    assert_eq!(snapshot.workout_percentage, 80);
    assert_eq!(tracker.workout.state().await.secondary, 450.0);
}

#[tokio::test]
async fn guest_session_never_touches_the_remote() {
    init_tracing();
    let store = Arc::new(MemoryStore::new());
    let remote = Arc::new(MemoryRemote::new());
    let tracker = HealthTracker::new(store, remote.clone(), None, DEFAULT_WATER_GOAL_ML);

    assert!(tracker.log_water(900.0).await);
    assert!(tracker.log_food(food("toast", 150.0, 4.0, 3.0, 25.0)).await);
    assert_eq!(tracker.todays_foods().await.len(), 1);

    assert_eq!(remote.push_count("guest"), 0);
    assert!(remote.pull("guest").await.unwrap().is_none());
}

// Live Firestore round-trip; skipped unless credentials are configured in
// the environment (.env honored).
#[tokio::test]
async fn live_remote_round_trip() {
    init_tracing();
    dotenvy::dotenv().ok();
    let (Ok(email), Ok(password)) = (
        std::env::var("VT_TEST_EMAIL"),
        std::env::var("VT_TEST_PASSWORD"),
    ) else {
        eprintln!("skipping live_remote_round_trip: no credentials");
        return;
    };

    let config = FirebaseConfig::from_env();
    let auth = FirebaseAuth::sign_in(config.clone(), &email, &password)
        .await
        .unwrap();
    let uid = auth.user_id().await.unwrap();
    let sync = FirestoreSync::new(FirestoreClient::new(auth, config.project_id));

    let mut fields = serde_json::Map::new();
    fields.insert("waterIntake".to_string(), serde_json::json!(1234.0));
    sync.push(&uid, fields).await.unwrap();

    let record = sync.pull(&uid).await.unwrap().unwrap();
    assert_eq!(record["waterIntake"], serde_json::json!(1234.0));
}
