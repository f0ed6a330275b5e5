//! Core of a mobile health-tracking app: metabolic calculations, a
//! per-day food ledger, six per-dimension aggregation stores with daily
//! resets, and best-effort Firestore mirroring of all of it.
//!
//! Local state is authoritative for a session; the remote record wins at
//! load time and is otherwise a last-writer-wins mirror.

pub mod assessment;
pub mod auth;
pub mod calculator;
pub mod category;
pub mod chat;
pub mod config;
pub mod firestore;
pub mod food_api;
pub mod ledger;
pub mod models;
pub mod reset;
pub mod storage;
pub mod sync;
pub mod tracker;

pub use ledger::FoodInput;
pub use models::{
    ActivityLevel, BmiCategory, ConsumedFood, DailyTotals, Gender, HealthSnapshot, NutrientGoals,
    NutritionPlan, UserProfile, WeightGoal,
};
pub use tracker::HealthTracker;
