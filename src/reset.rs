//! Once-per-day category resets.
//!
//! Each category's last reset time is persisted (epoch ms, device-scoped),
//! and a category is due whenever that timestamp's local calendar date is
//! older than today or absent. The scheduler checks on startup, which
//! covers the app being closed across midnight, and then re-arms a timer
//! for the next local midnight indefinitely. Categories reset
//! independently; one failure never blocks the rest.
//!
//! The timer dies with the task that runs it (abort the `run` task on
//! teardown); persistence of the last-reset ledger is what carries the
//! schedule across process restarts.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Local, NaiveDate, TimeZone};
use tracing::{debug, info, warn};

use crate::category::CategoryStore;
use crate::storage::LocalStore;

pub struct DailyResetScheduler {
    store: Arc<dyn LocalStore>,
    categories: Vec<Arc<CategoryStore>>,
}

impl DailyResetScheduler {
    pub fn new(store: Arc<dyn LocalStore>, categories: Vec<Arc<CategoryStore>>) -> Self {
        Self { store, categories }
    }

    fn ledger_key(name: &str) -> String {
        format!("@last_reset_{name}")
    }

    async fn last_reset_date(&self, name: &str) -> Option<NaiveDate> {
        let raw = self.store.get(&Self::ledger_key(name)).await.ok()??;
        let millis: i64 = raw.parse().ok()?;
        Local
            .timestamp_millis_opt(millis)
            .single()
            .map(|dt| dt.date_naive())
    }

    pub(crate) async fn record_reset_at(&self, name: &str, millis: i64) {
        if let Err(e) = self
            .store
            .set(&Self::ledger_key(name), &millis.to_string())
            .await
        {
            warn!(category = name, error = %e, "failed to record reset time");
        }
    }

    /// Reset every category whose last reset is older than today.
    /// Returns how many categories were reset.
    pub async fn reset_if_needed(&self, user: Option<&str>) -> usize {
        self.check_on(user, Local::now().date_naive()).await
    }

    pub(crate) async fn check_on(&self, user: Option<&str>, today: NaiveDate) -> usize {
        let mut reset_count = 0;
        for category in &self.categories {
            let name = category.name();
            let due = match self.last_reset_date(name).await {
                Some(last) => last < today,
                None => true,
            };
            if !due {
                debug!(category = name, "already reset today");
                continue;
            }
            match category.reset(user).await {
                Ok(()) => {
                    self.record_reset_at(name, Local::now().timestamp_millis())
                        .await;
                    reset_count += 1;
                }
                Err(e) => {
                    // Leave the ledger untouched so the category stays due
                    warn!(category = name, error = %e, "category reset failed");
                }
            }
        }
        reset_count
    }

    /// Catch up immediately, then reset again just after each local
    /// midnight. Runs until the owning task is aborted.
    pub async fn run(self: Arc<Self>, user: Option<String>) {
        loop {
            let count = self.reset_if_needed(user.as_deref()).await;
            if count > 0 {
                info!(categories = count, "daily reset performed");
            }
            let wait = until_next_midnight(Local::now()) + Duration::from_secs(1);
            debug!(seconds = wait.as_secs(), "reset timer armed");
            tokio::time::sleep(wait).await;
        }
    }
}

/// Time until the next local midnight. Falls back to an hour when the
/// local midnight is ambiguous (DST transitions).
pub fn until_next_midnight(now: DateTime<Local>) -> Duration {
    now.date_naive()
        .succ_opt()
        .and_then(|tomorrow| tomorrow.and_hms_opt(0, 0, 0))
        .and_then(|naive| Local.from_local_datetime(&naive).earliest())
        .and_then(|midnight| (midnight - now).to_std().ok())
        .unwrap_or_else(|| Duration::from_secs(3600))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::category;
    use crate::storage::MemoryStore;
    use crate::sync::MemoryRemote;
    use anyhow::Result;
    use async_trait::async_trait;

    fn scheduler() -> (DailyResetScheduler, Vec<Arc<CategoryStore>>) {
        let store: Arc<MemoryStore> = Arc::new(MemoryStore::new());
        let remote = Arc::new(MemoryRemote::new());
        let categories: Vec<Arc<CategoryStore>> = vec![
            Arc::new(category::water(store.clone(), remote.clone(), 2000.0)),
            Arc::new(category::steps(store.clone(), remote.clone())),
            Arc::new(category::workout(store.clone(), remote.clone())),
            Arc::new(category::nutrition(store.clone(), remote.clone())),
            Arc::new(category::sleep(store.clone(), remote.clone())),
            Arc::new(category::mental_health(store.clone(), remote.clone())),
        ];
        (
            DailyResetScheduler::new(store, categories.clone()),
            categories,
        )
    }

    #[tokio::test]
    async fn resets_each_category_at_most_once_per_day() {
        let (scheduler, categories) = scheduler();
        let today = Local::now().date_naive();

        for cat in &categories {
            assert!(cat.update(Some("u1"), 5.0).await);
        }

        assert_eq!(scheduler.check_on(Some("u1"), today).await, 6);
        for cat in &categories {
            assert_eq!(cat.state().await.value, 0.0, "{} not zeroed", cat.name());
        }

        // Second check within the same day must not reset anything
        assert_eq!(scheduler.check_on(Some("u1"), today).await, 0);
    }

    #[tokio::test]
    async fn catches_up_after_midnight_passed_while_closed() {
        let (scheduler, categories) = scheduler();
        let today = Local::now().date_naive();
        let yesterday_ms = Local::now().timestamp_millis() - 24 * 60 * 60 * 1000;

        for cat in &categories {
            scheduler.record_reset_at(cat.name(), yesterday_ms).await;
        }

        assert_eq!(scheduler.check_on(Some("u1"), today).await, 6);
    }

    struct BrokenStore;

    #[async_trait]
    impl LocalStore for BrokenStore {
        async fn get(&self, _key: &str) -> Result<Option<String>> {
            Err(anyhow::anyhow!("disk gone"))
        }
        async fn set(&self, _key: &str, _value: &str) -> Result<()> {
            Err(anyhow::anyhow!("disk gone"))
        }
        async fn remove(&self, _key: &str) -> Result<()> {
            Err(anyhow::anyhow!("disk gone"))
        }
    }

    #[tokio::test]
    async fn one_failing_category_does_not_block_others() {
        let good_store: Arc<MemoryStore> = Arc::new(MemoryStore::new());
        let remote = Arc::new(MemoryRemote::new());

        // Guest resets go through LocalStore::remove, so a broken store
        // makes this category's reset fail.
        let broken = Arc::new(category::water(Arc::new(BrokenStore), remote.clone(), 2000.0));
        let healthy = Arc::new(category::steps(good_store.clone(), remote));

        let scheduler =
            DailyResetScheduler::new(good_store, vec![broken.clone(), healthy.clone()]);
        let today = Local::now().date_naive();

        assert_eq!(scheduler.check_on(None, today).await, 1);
        // The failed category stays due for the next check
        assert_eq!(scheduler.last_reset_date(broken.name()).await, None);
        assert_eq!(scheduler.last_reset_date(healthy.name()).await, Some(today));
    }

    #[test]
    fn next_midnight_is_within_a_day() {
        let wait = until_next_midnight(Local::now());
        assert!(wait <= Duration::from_secs(24 * 60 * 60));
        assert!(wait > Duration::ZERO);
    }
}
