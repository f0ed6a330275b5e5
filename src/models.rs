use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Biological sex used by the BMR formula.
///
/// Anything that is not `Male` is computed with the female constant,
/// matching the permissive handling of malformed profile data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    pub fn parse(s: &str) -> Self {
        if s.eq_ignore_ascii_case("male") {
            Self::Male
        } else {
            Self::Female
        }
    }
}

/// Physical activity level, mapped to a TDEE multiplier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityLevel {
    Sedentary,
    Light,
    Moderate,
    Active,
    VeryActive,
}

impl ActivityLevel {
    pub fn multiplier(self) -> f64 {
        match self {
            Self::Sedentary => 1.2,
            Self::Light => 1.375,
            Self::Moderate => 1.55,
            Self::Active => 1.725,
            Self::VeryActive => 1.9,
        }
    }

    /// Unrecognized strings fall back to `Moderate`.
    pub fn parse(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "sedentary" => Self::Sedentary,
            "light" => Self::Light,
            "active" => Self::Active,
            "very_active" | "veryactive" => Self::VeryActive,
            _ => Self::Moderate,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeightGoal {
    Lose,
    Maintain,
    Gain,
}

/// BMI band. Upper bounds are inclusive (24.9 is still `Normal`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BmiCategory {
    Underweight,
    Normal,
    Overweight,
    Obese,
    SeverelyObese,
}

impl BmiCategory {
    /// Macro split as (protein, carbs, fat) fractions of daily calories.
    pub fn macro_split(self) -> (f64, f64, f64) {
        match self {
            Self::Underweight => (0.25, 0.50, 0.25),
            Self::Normal => (0.20, 0.50, 0.30),
            Self::Overweight => (0.25, 0.45, 0.30),
            Self::Obese | Self::SeverelyObese => (0.30, 0.40, 0.30),
        }
    }
}

/// Profile fields consumed by the metabolic calculator.
///
/// Every field is optional: the profile subsystem may hand us partial or
/// malformed data, and the calculator degrades to zeros instead of failing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserProfile {
    /// Weight in kg
    pub weight_kg: Option<f64>,
    /// Height in cm
    pub height_cm: Option<f64>,
    /// Age in years
    pub age: Option<u32>,
    pub gender: Option<Gender>,
    pub activity_level: Option<ActivityLevel>,
    pub weight_goal: Option<WeightGoal>,
}

impl UserProfile {
    /// Builds a profile from a loosely typed record, as pulled from a
    /// remote document. Numbers may arrive as JSON numbers or strings;
    /// unknown gender or activity strings fall back to their defaults.
    pub fn from_record(record: &serde_json::Value) -> Self {
        fn number(v: &serde_json::Value) -> Option<f64> {
            match v {
                serde_json::Value::Number(n) => n.as_f64(),
                serde_json::Value::String(s) => s.parse().ok(),
                _ => None,
            }
        }

        Self {
            weight_kg: record.get("weight").and_then(number),
            height_cm: record.get("height").and_then(number),
            age: record.get("age").and_then(number).map(|a| a as u32),
            gender: record
                .get("gender")
                .and_then(|v| v.as_str())
                .map(Gender::parse),
            activity_level: record
                .get("activityLevel")
                .and_then(|v| v.as_str())
                .map(ActivityLevel::parse),
            weight_goal: record
                .get("weightGoal")
                .and_then(|v| serde_json::from_value(v.clone()).ok()),
        }
    }
}

/// Daily gram targets per macronutrient.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NutrientGoals {
    pub protein_g: u32,
    pub carbs_g: u32,
    pub fat_g: u32,
}

/// Derived metabolic plan. Recomputed on demand from the profile,
/// never persisted as a source of truth.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NutritionPlan {
    pub bmi: f64,
    pub bmi_category: BmiCategory,
    /// Basal metabolic rate, kcal/day
    pub bmr: u32,
    /// Activity-adjusted calorie target, kcal/day
    pub daily_calories: u32,
    pub nutrient_goals: NutrientGoals,
}

/// A food entry recorded in the daily consumption ledger.
///
/// Immutable once created; removed only as a whole, by id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsumedFood {
    pub id: Uuid,
    pub name: String,
    pub serving_description: String,
    /// kcal for the logged quantity
    pub calories: f64,
    /// Grams for the logged quantity
    pub protein: f64,
    pub fat: f64,
    pub carbs: f64,
    pub quantity: f64,
    /// Which lookup source produced this entry ("primary", "fallback", "builtin", "manual")
    pub source: String,
    pub source_id: String,
    pub logged_at: DateTime<Local>,
}

/// Aggregate macros for one (user, day). Always elementwise equal to the
/// sum of the surviving entries for that day.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DailyTotals {
    pub calories: f64,
    pub protein: f64,
    pub fat: f64,
    pub carbs: f64,
}

impl DailyTotals {
    pub fn add(&mut self, food: &ConsumedFood) {
        self.calories += food.calories;
        self.protein += food.protein;
        self.fat += food.fat;
        self.carbs += food.carbs;
    }

    pub fn is_zero(&self) -> bool {
        self.calories == 0.0 && self.protein == 0.0 && self.fat == 0.0 && self.carbs == 0.0
    }
}

/// Read-only snapshot of the current aggregate percentages, handed to the
/// chat advisor as context.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct HealthSnapshot {
    pub water_percentage: u8,
    pub nutrition_percentage: u8,
    pub workout_percentage: u8,
    pub sleep_percentage: u8,
    pub mental_health_percentage: u8,
    pub daily_steps: u64,
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;

    #[test]
    fn profile_from_record_parses_enums_case_insensitively() {
        let record = json!({
            "weight": 80.0,
            "height": "180",
            "age": 25,
            "gender": "MALE",
            "activityLevel": "very_active",
            "weightGoal": "maintain",
        });
        let profile = UserProfile::from_record(&record);
        assert_eq!(profile.weight_kg, Some(80.0));
        assert_eq!(profile.height_cm, Some(180.0));
        assert_eq!(profile.age, Some(25));
        assert_eq!(profile.gender, Some(Gender::Male));
        assert_eq!(profile.activity_level, Some(ActivityLevel::VeryActive));
        assert_eq!(profile.weight_goal, Some(WeightGoal::Maintain));
    }

    #[test]
    fn profile_from_record_falls_back_on_malformed_fields() {
        let record = json!({
            "weight": "heavy",
            "gender": "nonbinary",
            "activityLevel": "couch",
        });
        let profile = UserProfile::from_record(&record);
        assert_eq!(profile.weight_kg, None);
        assert_eq!(profile.gender, Some(Gender::Female));
        assert_eq!(profile.activity_level, Some(ActivityLevel::Moderate));
        assert!(profile.weight_goal.is_none());
    }

    #[test]
    fn profile_from_record_on_empty_record_is_default() {
        let profile = UserProfile::from_record(&json!({}));
        assert!(profile.weight_kg.is_none() && profile.gender.is_none());
    }
}
