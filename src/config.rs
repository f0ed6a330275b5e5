//! Environment-driven configuration.
//!
//! Everything has a default so the crate works out of the box against the
//! demo Firebase project; tests load overrides from `.env` via dotenvy.

use std::env;

#[derive(Debug, Clone)]
pub struct FirebaseConfig {
    /// Public web API key. Not a secret: it ships inside every copy of the
    /// app and is only usable with the project's configured auth providers.
    pub api_key: String,
    pub project_id: String,
}

impl FirebaseConfig {
    pub fn from_env() -> Self {
        Self {
            api_key: env::var("VT_FIREBASE_API_KEY")
                .unwrap_or_else(|_| "AIzaSyDemoKeyReplaceMe".to_string()),
            project_id: env::var("VT_FIREBASE_PROJECT")
                .unwrap_or_else(|_| "vitaltrack-demo".to_string()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct FoodApiConfig {
    /// Primary nutrition database endpoint.
    pub primary_url: String,
    pub primary_key: String,
    /// Fallback endpoint tried when the primary fails.
    pub fallback_url: String,
    pub fallback_key: String,
}

impl FoodApiConfig {
    pub fn from_env() -> Self {
        Self {
            primary_url: env::var("VT_FOOD_PRIMARY_URL")
                .unwrap_or_else(|_| "https://platform.fatsecret.com/rest/server.api".to_string()),
            primary_key: env::var("VT_FOOD_PRIMARY_KEY").unwrap_or_default(),
            fallback_url: env::var("VT_FOOD_FALLBACK_URL")
                .unwrap_or_else(|_| "https://trackapi.nutritionix.com/v2".to_string()),
            fallback_key: env::var("VT_FOOD_FALLBACK_KEY").unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ChatConfig {
    pub url: String,
    pub api_key: String,
    pub model: String,
}

impl ChatConfig {
    pub fn from_env() -> Self {
        Self {
            url: env::var("VT_CHAT_URL")
                .unwrap_or_else(|_| "https://api.openai.com/v1/chat/completions".to_string()),
            api_key: env::var("VT_CHAT_API_KEY").unwrap_or_default(),
            model: env::var("VT_CHAT_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub firebase: FirebaseConfig,
    pub food_api: FoodApiConfig,
    pub chat: ChatConfig,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            firebase: FirebaseConfig::from_env(),
            food_api: FoodApiConfig::from_env(),
            chat: ChatConfig::from_env(),
        }
    }
}
