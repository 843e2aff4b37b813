//! Anonymous usage counters.
//!
//! Each device gets a random identifier stored alongside a collection of
//! per-identifier visit records. Nothing personal is collected: only first
//! and last visit timestamps and a visit count.
//!
//! Persisted layout (key [`keys::ANALYTICS`]):
//!
//! ```json
//! { "users": { "<id>": { "firstVisit": "...", "lastVisit": "...", "visitCount": 3 } },
//!   "totalVisits": 3 }
//! ```

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::Error;
use crate::storage::{SharedStore, keys};

/// Window used for the active-users statistic.
const ACTIVE_WINDOW_DAYS: i64 = 30;

/// Visit record for one anonymous identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageRecord {
    pub first_visit: DateTime<Utc>,
    pub last_visit: DateTime<Utc>,
    pub visit_count: u64,
}

/// All usage records plus the running visit total.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageLog {
    #[serde(default)]
    pub users: BTreeMap<String, UsageRecord>,
    #[serde(default)]
    pub total_visits: u64,
}

impl UsageLog {
    /// Record one visit for `user_id` at `now`.
    pub fn record_visit(&mut self, user_id: &str, now: DateTime<Utc>) -> &UsageRecord {
        self.total_visits += 1;
        self.users
            .entry(user_id.to_string())
            .and_modify(|r| {
                r.last_visit = now;
                r.visit_count += 1;
            })
            .or_insert(UsageRecord { first_visit: now, last_visit: now, visit_count: 1 })
    }

    /// Compute the read-only statistics at `now`.
    pub fn stats(&self, now: DateTime<Utc>) -> UsageStats {
        let unique_users = self.users.len() as u64;
        let average_visits_per_user = if unique_users == 0 {
            0.0
        } else {
            (self.total_visits as f64 / unique_users as f64 * 100.0).round() / 100.0
        };

        let cutoff = now - Duration::days(ACTIVE_WINDOW_DAYS);
        let active_users_last_30_days = self.users.values().filter(|r| r.last_visit > cutoff).count() as u64;

        UsageStats {
            unique_users,
            total_visits: self.total_visits,
            average_visits_per_user,
            active_users_last_30_days,
            first_ever_visit: self.users.values().map(|r| r.first_visit).min(),
            last_visit: self.users.values().map(|r| r.last_visit).max(),
        }
    }
}

/// Statistics exposed on the diagnostic surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct UsageStats {
    pub unique_users: u64,
    pub total_visits: u64,
    /// Rounded to two decimals; zero when there are no users.
    pub average_visits_per_user: f64,
    pub active_users_last_30_days: u64,
    pub first_ever_visit: Option<DateTime<Utc>>,
    pub last_visit: Option<DateTime<Utc>>,
}

impl fmt::Display for UsageStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stamp = |t: Option<DateTime<Utc>>| t.map(|t| t.to_rfc3339()).unwrap_or_else(|| "-".to_string());
        writeln!(f, "Unique Users: {}", self.unique_users)?;
        writeln!(f, "Total Visits: {}", self.total_visits)?;
        writeln!(f, "Avg Visits/User: {:.2}", self.average_visits_per_user)?;
        writeln!(f, "Active Users (30d): {}", self.active_users_last_30_days)?;
        writeln!(f, "First Visit Ever: {}", stamp(self.first_ever_visit))?;
        write!(f, "Last Visit: {}", stamp(self.last_visit))
    }
}

/// Outcome of recording a page load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Visit {
    pub user_id: String,
    pub record: UsageRecord,
    pub unique_users: u64,
    pub total_visits: u64,
}

/// Tracks page loads against the shared key-value store.
#[derive(Clone)]
pub struct UsageTracker {
    store: SharedStore,
}

impl UsageTracker {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    /// Record one page load.
    ///
    /// Storage failures are logged and never fail the load: a device whose
    /// identifier cannot be persisted still gets counted for this session.
    pub fn track_visit(&self, now: DateTime<Utc>) -> Visit {
        let user_id = self.device_id();

        let mut log = self.load();
        let record = log.record_visit(&user_id, now).clone();
        self.save(&log);

        tracing::info!(
            unique_users = log.users.len(),
            total_visits = log.total_visits,
            visit_number = record.visit_count,
            "usage recorded"
        );

        Visit { user_id, record, unique_users: log.users.len() as u64, total_visits: log.total_visits }
    }

    /// Compute usage statistics at `now`.
    pub fn stats(&self, now: DateTime<Utc>) -> UsageStats {
        self.load().stats(now)
    }

    /// Discard the whole usage collection once `confirm` agrees.
    ///
    /// The device identifier is kept. Returns whether anything was reset.
    pub fn reset(&self, confirm: impl FnOnce() -> bool) -> Result<bool, Error> {
        if !confirm() {
            return Ok(false);
        }
        self.store.remove(keys::ANALYTICS)?;
        tracing::info!("usage records reset");
        Ok(true)
    }

    /// Resolve the device identifier, minting and persisting one if none is stored.
    ///
    /// A failed read yields an identifier for this session only; the stored
    /// one is never overwritten.
    fn device_id(&self) -> String {
        match self.store.get(keys::USER_ID) {
            Ok(Some(id)) if !id.is_empty() => return id,
            Ok(_) => {}
            Err(e) => {
                tracing::warn!("failed to read device id, using a session id: {e}");
                return uuid::Uuid::new_v4().to_string();
            }
        }

        let id = uuid::Uuid::new_v4().to_string();
        if let Err(e) = self.store.set(keys::USER_ID, &id) {
            tracing::error!("failed to save device id: {e}");
        }
        id
    }

    /// Load the usage collection; absent or malformed data reads as empty.
    fn load(&self) -> UsageLog {
        let raw = match self.store.get(keys::ANALYTICS) {
            Ok(Some(raw)) => raw,
            Ok(None) => return UsageLog::default(),
            Err(e) => {
                tracing::warn!("failed to read usage records: {e}");
                return UsageLog::default();
            }
        };

        serde_json::from_str(&raw).unwrap_or_else(|e| {
            tracing::warn!("discarding malformed usage records: {e}");
            UsageLog::default()
        })
    }

    fn save(&self, log: &UsageLog) {
        let result = serde_json::to_string(log)
            .map_err(|e| Error::Storage(format!("failed to serialize usage records: {e}")))
            .and_then(|json| self.store.set(keys::ANALYTICS, &json));
        if let Err(e) = result {
            tracing::error!("failed to save usage records: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::SqliteStore;
    use crate::storage::KeyValueStore;
    use chrono::TimeZone;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    /// Fails the next read of the device id.
    struct FlakyStore {
        inner: SqliteStore,
        fail_id_read: AtomicBool,
    }

    impl KeyValueStore for FlakyStore {
        fn get(&self, key: &str) -> Result<Option<String>, Error> {
            if key == keys::USER_ID && self.fail_id_read.swap(false, Ordering::SeqCst) {
                return Err(Error::Storage("disk I/O error".into()));
            }
            self.inner.get(key)
        }

        fn set(&self, key: &str, value: &str) -> Result<(), Error> {
            self.inner.set(key, value)
        }

        fn remove(&self, key: &str) -> Result<(), Error> {
            self.inner.remove(key)
        }

        fn usage_bytes(&self) -> Result<usize, Error> {
            self.inner.usage_bytes()
        }
    }

    fn tracker() -> (UsageTracker, SharedStore) {
        let store: SharedStore = Arc::new(SqliteStore::open_in_memory(64 * 1024).unwrap());
        (UsageTracker::new(store.clone()), store)
    }

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, day, hour, 0, 0).unwrap()
    }

    #[test]
    fn test_first_and_second_load() {
        let (tracker, _) = tracker();

        let first = tracker.track_visit(at(1, 8));
        assert_eq!(first.record.visit_count, 1);
        assert_eq!(first.record.first_visit, at(1, 8));
        assert_eq!(first.record.last_visit, at(1, 8));

        let second = tracker.track_visit(at(2, 9));
        assert_eq!(second.user_id, first.user_id);
        assert_eq!(second.record.visit_count, 2);
        assert_eq!(second.record.first_visit, at(1, 8));
        assert_eq!(second.record.last_visit, at(2, 9));
    }

    #[test]
    fn test_n_loads_count_n() {
        let (tracker, _) = tracker();
        let mut last = None;
        for day in 1..=12 {
            last = Some(tracker.track_visit(at(day, 6)));
        }
        let last = last.unwrap();
        assert_eq!(last.record.visit_count, 12);
        assert_eq!(last.record.first_visit, at(1, 6));
        assert_eq!(last.total_visits, 12);
        assert_eq!(last.unique_users, 1);
    }

    #[test]
    fn test_device_id_is_uuid_v4_and_persisted() {
        let (tracker, store) = tracker();
        let visit = tracker.track_visit(at(1, 0));

        let id = uuid::Uuid::parse_str(&visit.user_id).unwrap();
        assert_eq!(id.get_version_num(), 4);
        assert_eq!(store.get(keys::USER_ID).unwrap(), Some(visit.user_id));
    }

    #[test]
    fn test_failed_id_read_keeps_stored_identity() {
        let store = Arc::new(FlakyStore {
            inner: SqliteStore::open_in_memory(64 * 1024).unwrap(),
            fail_id_read: AtomicBool::new(false),
        });
        let tracker = UsageTracker::new(store.clone());
        let first = tracker.track_visit(at(1, 0));

        store.fail_id_read.store(true, Ordering::SeqCst);
        let session = tracker.track_visit(at(2, 0));
        assert_ne!(session.user_id, first.user_id);
        assert_eq!(store.get(keys::USER_ID).unwrap(), Some(first.user_id.clone()));

        let third = tracker.track_visit(at(3, 0));
        assert_eq!(third.user_id, first.user_id);
        assert_eq!(third.record.visit_count, 2);
    }

    #[test]
    fn test_persisted_layout() {
        let (tracker, store) = tracker();
        let visit = tracker.track_visit(at(1, 0));

        let raw = store.get(keys::ANALYTICS).unwrap().unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["totalVisits"], 1);
        assert_eq!(value["users"][&visit.user_id]["visitCount"], 1);
        assert!(value["users"][&visit.user_id]["firstVisit"].is_string());
    }

    #[test]
    fn test_reads_records_written_by_the_page() {
        let (tracker, store) = tracker();
        store.set(keys::USER_ID, "3f2a9c1e-8b7d-4e6f-a5c4-1d2e3f4a5b6c").unwrap();
        store
            .set(
                keys::ANALYTICS,
                r#"{"users":{"3f2a9c1e-8b7d-4e6f-a5c4-1d2e3f4a5b6c":{"firstVisit":"2026-02-01T10:00:00.000Z","lastVisit":"2026-02-20T10:00:00.000Z","visitCount":4}},"totalVisits":4}"#,
            )
            .unwrap();

        let visit = tracker.track_visit(at(1, 0));
        assert_eq!(visit.record.visit_count, 5);
        assert_eq!(visit.record.first_visit, Utc.with_ymd_and_hms(2026, 2, 1, 10, 0, 0).unwrap());
        assert_eq!(visit.total_visits, 5);
    }

    #[test]
    fn test_malformed_records_reinitialise() {
        let (tracker, store) = tracker();
        store.set(keys::ANALYTICS, "{not json").unwrap();

        let visit = tracker.track_visit(at(1, 0));
        assert_eq!(visit.record.visit_count, 1);
        assert_eq!(visit.total_visits, 1);
    }

    #[test]
    fn test_storage_full_still_counts_session() {
        let store: SharedStore = Arc::new(SqliteStore::open_in_memory(4).unwrap());
        let tracker = UsageTracker::new(store.clone());

        let visit = tracker.track_visit(at(1, 0));
        assert_eq!(visit.record.visit_count, 1);
        assert_eq!(store.get(keys::ANALYTICS).unwrap(), None);
    }

    #[test]
    fn test_stats_empty() {
        let stats = UsageLog::default().stats(at(1, 0));
        assert_eq!(stats.unique_users, 0);
        assert_eq!(stats.total_visits, 0);
        assert_eq!(stats.average_visits_per_user, 0.0);
        assert_eq!(stats.active_users_last_30_days, 0);
        assert!(stats.first_ever_visit.is_none());
        assert!(stats.last_visit.is_none());
    }

    #[test]
    fn test_stats_average_and_window() {
        let mut log = UsageLog::default();
        log.record_visit("a", Utc.with_ymd_and_hms(2025, 12, 1, 0, 0, 0).unwrap());
        log.record_visit("b", at(1, 0));
        log.record_visit("b", at(2, 0));
        log.record_visit("c", at(3, 0));

        let stats = log.stats(at(10, 0));
        assert_eq!(stats.unique_users, 3);
        assert_eq!(stats.total_visits, 4);
        assert_eq!(stats.average_visits_per_user, 1.33);
        assert_eq!(stats.active_users_last_30_days, 2);
        assert!(stats.active_users_last_30_days <= stats.unique_users);
        assert_eq!(stats.first_ever_visit, Some(Utc.with_ymd_and_hms(2025, 12, 1, 0, 0, 0).unwrap()));
        assert_eq!(stats.last_visit, Some(at(3, 0)));
    }

    #[test]
    fn test_stats_display_panel() {
        let mut log = UsageLog::default();
        log.record_visit("a", at(1, 0));
        log.record_visit("a", at(2, 0));
        let text = log.stats(at(2, 0)).to_string();
        assert!(text.contains("Unique Users: 1"));
        assert!(text.contains("Avg Visits/User: 2.00"));
        assert!(text.contains("Active Users (30d): 1"));
    }

    #[test]
    fn test_reset_requires_confirmation() {
        let (tracker, store) = tracker();
        tracker.track_visit(at(1, 0));

        assert!(!tracker.reset(|| false).unwrap());
        assert!(store.get(keys::ANALYTICS).unwrap().is_some());

        assert!(tracker.reset(|| true).unwrap());
        assert!(store.get(keys::ANALYTICS).unwrap().is_none());
        assert!(store.get(keys::USER_ID).unwrap().is_some());
        assert_eq!(tracker.stats(at(1, 0)).unique_users, 0);
    }
}
