//! Health-advice chat wrapper.
//!
//! Thin client over an OpenAI-shape chat completion endpoint. The current
//! aggregate percentages are embedded in the system prompt so the model
//! answers against the user's actual day; nothing is written back to the
//! tracked state.

use anyhow::{anyhow, Result};
use reqwest::Client;
use serde_json::{json, Value};

use crate::config::ChatConfig;
use crate::models::HealthSnapshot;

pub struct ChatClient {
    http: Client,
    config: ChatConfig,
}

impl ChatClient {
    pub fn new(config: ChatConfig) -> Self {
        Self {
            http: Client::new(),
            config,
        }
    }

    fn system_prompt(snapshot: &HealthSnapshot) -> String {
        format!(
            "You are a friendly health assistant inside a tracking app. \
             Today's progress: water {}%, nutrition {}%, workout {}%, \
             sleep {}%, mental wellbeing {}%, steps {}. \
             Give short, practical advice grounded in these numbers. \
             You are not a medical professional; recommend seeing one for \
             anything serious.",
            snapshot.water_percentage,
            snapshot.nutrition_percentage,
            snapshot.workout_percentage,
            snapshot.sleep_percentage,
            snapshot.mental_health_percentage,
            snapshot.daily_steps,
        )
    }

    /// Send one free-text message with the snapshot as context and return
    /// the model's reply.
    pub async fn advise(&self, message: &str, snapshot: &HealthSnapshot) -> Result<String> {
        if self.config.api_key.is_empty() {
            return Err(anyhow!("chat endpoint not configured"));
        }

        let body = json!({
            "model": self.config.model,
            "messages": [
                { "role": "system", "content": Self::system_prompt(snapshot) },
                { "role": "user", "content": message }
            ],
            "max_tokens": 400
        });

        let resp = self
            .http
            .post(&self.config.url)
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(anyhow!("chat completion failed: {} - {}", status, text));
        }

        let data: Value = resp.json().await?;
        data["choices"][0]["message"]["content"]
            .as_str()
            .map(|s| s.trim().to_string())
            .ok_or_else(|| anyhow!("chat response carried no content"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_prompt_embeds_snapshot() {
        let snapshot = HealthSnapshot {
            water_percentage: 60,
            nutrition_percentage: 45,
            workout_percentage: 30,
            sleep_percentage: 88,
            mental_health_percentage: 75,
            daily_steps: 6400,
        };
        let prompt = ChatClient::system_prompt(&snapshot);
        assert!(prompt.contains("water 60%"));
        assert!(prompt.contains("steps 6400"));
    }

    #[tokio::test]
    async fn unconfigured_client_errors_before_any_request() {
        let client = ChatClient::new(ChatConfig {
            url: "http://localhost:1".to_string(),
            api_key: String::new(),
            model: "test".to_string(),
        });
        let err = client
            .advise("help", &HealthSnapshot::default())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("not configured"));
    }
}
