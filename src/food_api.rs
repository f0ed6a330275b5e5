//! Food lookup with three-tier degradation.
//!
//! Queries go to the primary nutrition API first, then the fallback API,
//! and finally a small built-in table, so a search never surfaces a hard
//! error: only when every tier fails does the caller see an empty list.
//! Whatever the source, results are normalized to a flat per-serving
//! record the ledger can consume directly.

use anyhow::{anyhow, Result};
use reqwest::Client;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::config::FoodApiConfig;

/// Normalized food record, independent of which source produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct FoodSummary {
    pub source_id: String,
    pub name: String,
    pub serving_description: String,
    pub calories: f64,
    pub protein: f64,
    pub fat: f64,
    pub carbs: f64,
    /// "primary", "fallback" or "builtin"
    pub source: &'static str,
}

/// Built-in last-resort table, per common serving.
const BUILTIN_FOODS: &[(&str, &str, f64, f64, f64, f64)] = &[
    // name, serving, kcal, protein, fat, carbs
    ("Apple", "1 medium (182 g)", 95.0, 0.5, 0.3, 25.0),
    ("Banana", "1 medium (118 g)", 105.0, 1.3, 0.4, 27.0),
    ("White rice, cooked", "1 cup (158 g)", 205.0, 4.3, 0.4, 44.5),
    ("Chicken breast, grilled", "100 g", 165.0, 31.0, 3.6, 0.0),
    ("Egg, boiled", "1 large (50 g)", 78.0, 6.3, 5.3, 0.6),
    ("Whole milk", "1 cup (244 g)", 149.0, 7.7, 7.9, 11.7),
    ("Bread, whole wheat", "1 slice (32 g)", 82.0, 4.0, 1.1, 13.8),
    ("Oatmeal, cooked", "1 cup (234 g)", 166.0, 5.9, 3.6, 28.1),
    ("Salmon, baked", "100 g", 206.0, 22.1, 12.4, 0.0),
    ("Greek yogurt, plain", "1 cup (245 g)", 146.0, 20.0, 3.8, 7.9),
    ("Almonds", "1 oz (28 g)", 164.0, 6.0, 14.2, 6.1),
    ("Potato, baked", "1 medium (173 g)", 161.0, 4.3, 0.2, 36.6),
];

pub struct FoodSearchClient {
    http: Client,
    config: FoodApiConfig,
}

impl FoodSearchClient {
    pub fn new(config: FoodApiConfig) -> Self {
        Self {
            http: Client::new(),
            config,
        }
    }

    /// Search all tiers in order. Never fails; an empty vec means every
    /// tier came up empty or unreachable.
    pub async fn search(&self, query: &str) -> Vec<FoodSummary> {
        match self.search_remote(query, true).await {
            Ok(results) if !results.is_empty() => return results,
            Ok(_) => debug!(query, "primary source returned no results"),
            Err(e) => warn!(query, error = %e, "primary food source failed"),
        }
        match self.search_remote(query, false).await {
            Ok(results) if !results.is_empty() => return results,
            Ok(_) => debug!(query, "fallback source returned no results"),
            Err(e) => warn!(query, error = %e, "fallback food source failed"),
        }
        search_builtin(query)
    }

    /// Single food by source id, same cascade as [`search`](Self::search).
    pub async fn details(&self, food_id: &str) -> Option<FoodSummary> {
        for primary in [true, false] {
            match self.fetch_details(food_id, primary).await {
                Ok(Some(food)) => return Some(food),
                Ok(None) => {}
                Err(e) => warn!(food_id, error = %e, "food details lookup failed"),
            }
        }
        BUILTIN_FOODS
            .iter()
            .enumerate()
            .find(|(idx, _)| format!("builtin-{idx}") == food_id)
            .map(|(idx, row)| builtin_summary(idx, row))
    }

    async fn search_remote(&self, query: &str, primary: bool) -> Result<Vec<FoodSummary>> {
        let (url, key, source) = if primary {
            (
                &self.config.primary_url,
                &self.config.primary_key,
                "primary",
            )
        } else {
            (
                &self.config.fallback_url,
                &self.config.fallback_key,
                "fallback",
            )
        };
        if key.is_empty() {
            return Err(anyhow!("{source} food source not configured"));
        }

        let resp = self
            .http
            .get(url)
            .query(&[("method", "foods.search"), ("search_expression", query)])
            .bearer_auth(key)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(anyhow!("{source} search failed: {} - {}", status, body));
        }

        let data: Value = resp.json().await?;
        Ok(parse_foods(&data, source))
    }

    async fn fetch_details(&self, food_id: &str, primary: bool) -> Result<Option<FoodSummary>> {
        let (url, key, source) = if primary {
            (
                &self.config.primary_url,
                &self.config.primary_key,
                "primary",
            )
        } else {
            (
                &self.config.fallback_url,
                &self.config.fallback_key,
                "fallback",
            )
        };
        if key.is_empty() {
            return Err(anyhow!("{source} food source not configured"));
        }

        let resp = self
            .http
            .get(url)
            .query(&[("method", "food.get"), ("food_id", food_id)])
            .bearer_auth(key)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(anyhow!("{source} details failed: {} - {}", status, body));
        }

        let data: Value = resp.json().await?;
        Ok(parse_foods(&json!({ "foods": [data.get("food").unwrap_or(&data)] }), source)
            .into_iter()
            .next())
    }
}

/// Parse an API response of shape
/// `{ foods: [{ food_id, food_name, servings: [{serving_description,
/// calories, protein, fat, carbohydrate}] }] }`, normalizing each food to
/// its first serving.
fn parse_foods(data: &Value, source: &'static str) -> Vec<FoodSummary> {
    let Some(foods) = data.get("foods").and_then(Value::as_array) else {
        return Vec::new();
    };

    foods
        .iter()
        .filter_map(|food| {
            let id = food
                .get("food_id")
                .and_then(|v| v.as_str().map(ToOwned::to_owned).or_else(|| v.as_i64().map(|n| n.to_string())))?;
            let name = food.get("food_name").and_then(Value::as_str)?.to_string();
            let serving = food
                .get("servings")
                .and_then(Value::as_array)
                .and_then(|s| s.first())?;

            let num = |key: &str| -> f64 {
                serving
                    .get(key)
                    .and_then(|v| v.as_f64().or_else(|| v.as_str().and_then(|s| s.parse().ok())))
                    .unwrap_or(0.0)
            };

            Some(FoodSummary {
                source_id: id,
                name,
                serving_description: serving
                    .get("serving_description")
                    .and_then(Value::as_str)
                    .unwrap_or("1 serving")
                    .to_string(),
                calories: num("calories"),
                protein: num("protein"),
                fat: num("fat"),
                carbs: num("carbohydrate"),
                source,
            })
        })
        .collect()
}

fn builtin_summary(idx: usize, row: &(&str, &str, f64, f64, f64, f64)) -> FoodSummary {
    FoodSummary {
        source_id: format!("builtin-{idx}"),
        name: row.0.to_string(),
        serving_description: row.1.to_string(),
        calories: row.2,
        protein: row.3,
        fat: row.4,
        carbs: row.5,
        source: "builtin",
    }
}

/// Case-insensitive substring match over the built-in table.
fn search_builtin(query: &str) -> Vec<FoodSummary> {
    let needle = query.to_lowercase();
    BUILTIN_FOODS
        .iter()
        .enumerate()
        .filter(|(_, row)| row.0.to_lowercase().contains(&needle))
        .map(|(idx, row)| builtin_summary(idx, row))
        .collect()
}
