//! Daily mental-health check-in.
//!
//! A fixed questionnaire is scored from per-question point tables and
//! normalized to 0-100. The completed/needs-assessment status expires
//! lazily: a stored assessment taken on a previous local day counts as
//! not done, checked on load rather than by a timer.

use std::sync::Arc;

use anyhow::Result;
use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map};
use tracing::warn;

use crate::storage::LocalStore;
use crate::sync::{sanitize_user_id, RemoteSync};

pub struct Question {
    pub prompt: &'static str,
    /// (label, points) pairs; the chosen option's points feed the score.
    pub options: &'static [(&'static str, u32)],
}

/// The daily check-in. Option points are fixed per question; the maximum
/// total is 16.
pub const QUESTIONS: &[Question] = &[
    Question {
        prompt: "How would you rate your mood today?",
        options: &[("Low", 0), ("Flat", 1), ("Okay", 2), ("Great", 4)],
    },
    Question {
        prompt: "How well did you sleep last night?",
        options: &[("Poorly", 0), ("Restless", 1), ("Fine", 2), ("Deeply", 3)],
    },
    Question {
        prompt: "How stressed do you feel right now?",
        options: &[("Overwhelmed", 0), ("Tense", 1), ("Manageable", 2), ("Relaxed", 3)],
    },
    Question {
        prompt: "How connected do you feel to the people around you?",
        options: &[("Isolated", 0), ("Distant", 1), ("Somewhat", 2), ("Close", 3)],
    },
    Question {
        prompt: "How much energy do you have for the day ahead?",
        options: &[("None", 0), ("Running low", 1), ("Enough", 2), ("Plenty", 3)],
    },
];

fn max_points() -> u32 {
    QUESTIONS
        .iter()
        .map(|q| q.options.iter().map(|(_, p)| *p).max().unwrap_or(0))
        .sum()
}

/// Raw point total for a completed questionnaire: one chosen option index
/// per question. `None` when the answer list is incomplete or an index is
/// out of range.
pub fn raw_points(answers: &[usize]) -> Option<u32> {
    if answers.len() != QUESTIONS.len() {
        return None;
    }
    let mut total = 0u32;
    for (question, &choice) in QUESTIONS.iter().zip(answers) {
        total += question.options.get(choice)?.1;
    }
    Some(total)
}

/// Normalized 0-100 score for a completed questionnaire.
pub fn score_answers(answers: &[usize]) -> Option<u8> {
    raw_points(answers)
        .map(|total| (f64::from(total) / f64::from(max_points()) * 100.0).round() as u8)
}

/// Status label thresholds on the normalized percentage.
pub fn status_label(percentage: u8) -> &'static str {
    match percentage {
        85.. => "Excellent",
        70..=84 => "Good",
        40..=69 => "Average",
        _ => "Needs Attention",
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssessmentStatus {
    NeedsAssessment,
    Completed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssessmentRecord {
    pub percentage: u8,
    /// Raw point total before normalization.
    pub points: u32,
    pub status: String,
    pub date: NaiveDate,
}

pub struct AssessmentManager {
    store: Arc<dyn LocalStore>,
    remote: Arc<dyn RemoteSync>,
}

impl AssessmentManager {
    pub fn new(store: Arc<dyn LocalStore>, remote: Arc<dyn RemoteSync>) -> Self {
        Self { store, remote }
    }

    fn local_key(user: Option<&str>) -> String {
        format!("@mental_assessment_{}", sanitize_user_id(user))
    }

    /// Score and record today's questionnaire. `None` for incomplete or
    /// out-of-range answers.
    pub async fn submit(&self, user: Option<&str>, answers: &[usize]) -> Option<AssessmentRecord> {
        self.submit_on(user, answers, Local::now().date_naive()).await
    }

    pub(crate) async fn submit_on(
        &self,
        user: Option<&str>,
        answers: &[usize],
        date: NaiveDate,
    ) -> Option<AssessmentRecord> {
        let Some(points) = raw_points(answers) else {
            warn!("rejecting incomplete or out-of-range questionnaire answers");
            return None;
        };
        let percentage = (f64::from(points) / f64::from(max_points()) * 100.0).round() as u8;
        let record = AssessmentRecord {
            percentage,
            points,
            status: status_label(percentage).to_string(),
            date,
        };

        if let Err(e) = self.persist(user, &record).await {
            warn!(error = %e, "failed to persist assessment");
            return None;
        }

        if let Some(uid) = user.filter(|u| !u.is_empty()) {
            let mut fields = Map::new();
            fields.insert("mentalHealthStatus".to_string(), json!(record.status));
            fields.insert(
                "assessmentDate".to_string(),
                json!(record.date.format("%Y-%m-%d").to_string()),
            );
            if let Err(e) = self.remote.push(uid, fields).await {
                warn!(error = %e, "remote mirror of assessment failed");
            }
        }

        Some(record)
    }

    async fn persist(&self, user: Option<&str>, record: &AssessmentRecord) -> Result<()> {
        let raw = serde_json::to_string(record)?;
        self.store.set(&Self::local_key(user), &raw).await
    }

    /// The stored record, if any. Does not apply day-expiry.
    pub async fn record(&self, user: Option<&str>) -> Option<AssessmentRecord> {
        match self.store.get(&Self::local_key(user)).await {
            Ok(Some(raw)) => serde_json::from_str(&raw).ok(),
            Ok(None) => None,
            Err(e) => {
                warn!(error = %e, "failed to read assessment record");
                None
            }
        }
    }

    /// Completed only when a record exists and was taken today (local).
    pub async fn status(&self, user: Option<&str>) -> AssessmentStatus {
        self.status_on(user, Local::now().date_naive()).await
    }

    pub(crate) async fn status_on(&self, user: Option<&str>, today: NaiveDate) -> AssessmentStatus {
        match self.record(user).await {
            Some(record) if record.date == today => AssessmentStatus::Completed,
            _ => AssessmentStatus::NeedsAssessment,
        }
    }

    /// User-triggered reset back to needs-assessment.
    pub async fn reset(&self, user: Option<&str>) -> bool {
        if let Err(e) = self.store.remove(&Self::local_key(user)).await {
            warn!(error = %e, "failed to clear assessment record");
            return false;
        }
        if let Some(uid) = user.filter(|u| !u.is_empty()) {
            let mut fields = Map::new();
            fields.insert("mentalHealthStatus".to_string(), json!(""));
            fields.insert("assessmentDate".to_string(), json!(""));
            if let Err(e) = self.remote.push(uid, fields).await {
                warn!(error = %e, "remote clear of assessment failed");
            }
        }
        true
    }
}
