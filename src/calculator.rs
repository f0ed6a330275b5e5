//! Metabolic calculations: BMI, BMR (Mifflin-St Jeor), activity-adjusted
//! calorie targets and macro gram goals.
//!
//! All functions are pure and never fail: malformed or non-positive input
//! degrades to zero so a broken profile can never crash a caller. The UI
//! treats a zeroed plan as "profile incomplete".

use crate::models::{
    ActivityLevel, BmiCategory, Gender, NutrientGoals, NutritionPlan, UserProfile,
};

/// Calories per gram of protein and carbohydrate.
const KCAL_PER_G_PROTEIN_CARB: f64 = 4.0;
/// Calories per gram of fat.
const KCAL_PER_G_FAT: f64 = 9.0;

/// Body Mass Index, rounded to one decimal. Returns 0.0 for
/// non-positive or non-finite input.
pub fn bmi(weight_kg: f64, height_cm: f64) -> f64 {
    if !weight_kg.is_finite() || !height_cm.is_finite() || weight_kg <= 0.0 || height_cm <= 0.0 {
        return 0.0;
    }
    let height_m = height_cm / 100.0;
    let raw = weight_kg / (height_m * height_m);
    (raw * 10.0).round() / 10.0
}

/// BMI band with inclusive upper bounds (24.9 is still `Normal`).
pub fn bmi_category(bmi: f64) -> BmiCategory {
    if bmi < 18.5 {
        BmiCategory::Underweight
    } else if bmi <= 24.9 {
        BmiCategory::Normal
    } else if bmi <= 29.9 {
        BmiCategory::Overweight
    } else if bmi <= 34.9 {
        BmiCategory::Obese
    } else {
        BmiCategory::SeverelyObese
    }
}

/// Basal metabolic rate in kcal/day, Mifflin-St Jeor:
/// 10·w + 6.25·h − 5·a, then +5 for males and −161 otherwise.
/// Returns 0 for non-positive input.
pub fn bmr(weight_kg: f64, height_cm: f64, age: u32, gender: Gender) -> u32 {
    if !weight_kg.is_finite() || !height_cm.is_finite() || weight_kg <= 0.0 || height_cm <= 0.0
        || age == 0
    {
        return 0;
    }
    let base = 10.0 * weight_kg + 6.25 * height_cm - 5.0 * f64::from(age);
    let adjusted = match gender {
        Gender::Male => base + 5.0,
        Gender::Female => base - 161.0,
    };
    if adjusted <= 0.0 {
        0
    } else {
        adjusted.round() as u32
    }
}

/// Activity-adjusted daily calorie target. Zero BMR yields zero.
pub fn daily_calories(bmr: u32, activity: ActivityLevel) -> u32 {
    if bmr == 0 {
        return 0;
    }
    (f64::from(bmr) * activity.multiplier()).round() as u32
}

/// Gram targets per macro, from the BMI-category calorie split at
/// 4 kcal/g (protein, carbs) and 9 kcal/g (fat).
///
/// Each gram value is rounded independently; the tiny calorie drift
/// from rounding is accepted rather than renormalized.
pub fn nutrient_goals(daily_calories: u32, category: BmiCategory) -> NutrientGoals {
    let (protein_frac, carb_frac, fat_frac) = category.macro_split();
    let cals = f64::from(daily_calories);
    NutrientGoals {
        protein_g: (cals * protein_frac / KCAL_PER_G_PROTEIN_CARB).round() as u32,
        carbs_g: (cals * carb_frac / KCAL_PER_G_PROTEIN_CARB).round() as u32,
        fat_g: (cals * fat_frac / KCAL_PER_G_FAT).round() as u32,
    }
}

/// Full metabolic plan for a profile. Missing gender defaults to the
/// female constant and missing activity level to `Moderate`, mirroring
/// how unrecognized profile strings are handled elsewhere.
pub fn nutrition_plan(profile: &UserProfile) -> NutritionPlan {
    let weight = profile.weight_kg.unwrap_or(0.0);
    let height = profile.height_cm.unwrap_or(0.0);
    let age = profile.age.unwrap_or(0);
    let gender = profile.gender.unwrap_or(Gender::Female);
    let activity = profile.activity_level.unwrap_or(ActivityLevel::Moderate);

    let bmi_value = bmi(weight, height);
    let category = bmi_category(bmi_value);
    let bmr_value = bmr(weight, height, age, gender);
    let calories = daily_calories(bmr_value, activity);

    NutritionPlan {
        bmi: bmi_value,
        bmi_category: category,
        bmr: bmr_value,
        daily_calories: calories,
        nutrient_goals: nutrient_goals(calories, category),
    }
}
