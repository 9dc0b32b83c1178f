//! Lifecycle call processing

use std::sync::Arc;

use chrono::{DateTime, Local, Utc};
use parking_lot::Mutex;

use crate::store::{KvStore, LIFECYCLE_LOG_KEY};
use crate::types::{CallType, Variables, LINK_ID};

use super::calendar;
use super::record::LifecycleRecord;
use super::*;

/// Processes lifecycle calls against the durable [`LifecycleRecord`].
pub struct LifecycleEngine {
    store: Arc<dyn KvStore>,
    /// Installed version, compared against the first launch version
    app_version: Option<String>,
    record: Mutex<LifecycleRecord>,
}

impl LifecycleEngine {
    /// Load the lifecycle log from `store`.
    ///
    /// A missing or unreadable log starts a fresh record.
    pub fn load(store: Arc<dyn KvStore>, app_version: Option<String>) -> Self {
        let record = match store.get(LIFECYCLE_LOG_KEY) {
            Ok(Some(bytes)) => match serde_json::from_slice::<LifecycleRecord>(&bytes) {
                Ok(record) => {
                    tracing::debug!(prior_call = ?record.prior_call, "Loaded lifecycle log");
                    record
                }
                Err(e) => {
                    tracing::error!(error = %e, "Lifecycle log is corrupt, starting fresh");
                    LifecycleRecord::default()
                }
            },
            Ok(None) => {
                tracing::debug!("No prior lifecycle log");
                LifecycleRecord::default()
            }
            Err(e) => {
                tracing::error!(error = %e, "Unable to load lifecycle log, starting fresh");
                LifecycleRecord::default()
            }
        };

        Self {
            store,
            app_version,
            record: Mutex::new(record),
        }
    }

    /// Process a call at the current local time.
    pub fn lifecycle_data(&self, call: CallType) -> Option<Variables> {
        self.lifecycle_data_at(call, Local::now())
    }

    /// Process a call made at `now`.
    ///
    /// Returns the enrichment map, or `None` when the call was suppressed.
    pub fn lifecycle_data_at(&self, call: CallType, now: DateTime<Local>) -> Option<Variables> {
        let mut record = self.record.lock();
        let prior = record.prior_call;

        let data = if is_suppressed(prior, call) {
            tracing::debug!(call = %call, prior = ?prior, "Suppressing lifecycle call");
            None
        } else {
            let data = self.process(&mut record, call, &now);
            tracing::info!(call = %call, fields = data.len(), "Lifecycle data built");
            Some(data)
        };

        if prior != Some(call) {
            record.prior_call = Some(call);
            self.save(&record);
        }

        data
    }

    /// Zero every counter and clear every timestamp, then persist.
    pub fn reset(&self) {
        let mut record = self.record.lock();
        *record = LifecycleRecord::default();
        self.save(&record);
        tracing::info!("Lifecycle log reset");
    }

    /// Copy of the current record
    pub fn record(&self) -> LifecycleRecord {
        self.record.lock().clone()
    }

    fn process(
        &self,
        record: &mut LifecycleRecord,
        call: CallType,
        now: &DateTime<Local>,
    ) -> Variables {
        let at = now.with_timezone(&Utc);
        let prior = record.prior_call;
        let had_first_launch = record.first_launch.is_some();

        if call == CallType::Create {
            if record.first_launch.is_none() {
                record.first_launch = Some(at);
            }
            match self.app_version.as_deref() {
                Some(version) => record.observe_version(version, at),
                None => tracing::debug!("App version unknown, skipping update detection"),
            }
        }
        record.count(call);

        let mut data = enrichment(record, at, now);

        let name = call.lifecycle_name().to_string();
        data.insert(KEY_LIFECYCLE_TYPE.to_string(), name.clone());
        data.insert(LINK_ID.to_string(), name);

        if let Some(similar) = record.stats(call).recent {
            data.insert(
                KEY_LAST_SIMILAR_CALL_DATE.to_string(),
                calendar::iso8601(similar),
            );
        }

        if call == CallType::Create && !had_first_launch && record.wake.recent_count == 1 {
            data.insert(KEY_IS_FIRST_LAUNCH.to_string(), "true".to_string());
        }

        // Session duration
        data.insert(
            KEY_TOTAL_SECONDS_AWAKE.to_string(),
            record.seconds_awake_total.to_string(),
        );
        if call == CallType::Create {
            data.insert(
                KEY_PRIOR_SECONDS_AWAKE.to_string(),
                record.seconds_awake_since_launch.to_string(),
            );
            record.seconds_awake_since_launch = 0;
        } else if call.ends_session() && !prior.is_some_and(|p| p.ends_session()) {
            match record.wake.recent {
                Some(woke) => {
                    let seconds = (at - woke).num_seconds().max(0);
                    data.insert(KEY_SECONDS_AWAKE.to_string(), seconds.to_string());
                    record.seconds_awake_total += seconds;
                    record.seconds_awake_since_launch += seconds;
                }
                None => tracing::debug!(call = %call, "No prior wake, skipping awake time"),
            }
        }

        record.stamp(call, at);
        data
    }

    fn save(&self, record: &LifecycleRecord) {
        let result = serde_json::to_vec(record)
            .map_err(crate::Error::from)
            .and_then(|bytes| self.store.set(LIFECYCLE_LOG_KEY, &bytes));
        match result {
            Ok(()) => tracing::trace!("Lifecycle log saved"),
            Err(e) => tracing::error!(error = %e, "Unable to save lifecycle log"),
        }
    }
}

fn is_suppressed(prior: Option<CallType>, call: CallType) -> bool {
    match prior {
        Some(CallType::Create) if call == CallType::Resume => true,
        Some(prior) => prior == call,
        None => false,
    }
}

/// Counters, dates and calendar flags derived from the record
fn enrichment(record: &LifecycleRecord, at: DateTime<Utc>, now: &DateTime<Local>) -> Variables {
    let mut data = Variables::new();

    let counters = [
        (&record.wake, KEY_WAKE_COUNT, KEY_TOTAL_WAKE_COUNT),
        (&record.launch, KEY_LAUNCH_COUNT, KEY_TOTAL_LAUNCH_COUNT),
        (&record.sleep, KEY_SLEEP_COUNT, KEY_TOTAL_SLEEP_COUNT),
        (&record.terminate, KEY_TERMINATE_COUNT, KEY_TOTAL_TERMINATE_COUNT),
        (&record.crash, KEY_CRASH_COUNT, KEY_TOTAL_CRASH_COUNT),
    ];
    for (stats, recent_key, total_key) in counters {
        if stats.is_counted() {
            data.insert(recent_key.to_string(), stats.recent_count.to_string());
            data.insert(total_key.to_string(), stats.total_count.to_string());
        }
    }

    if let Some(first_launch) = record.first_launch {
        data.insert(
            KEY_FIRST_LAUNCH_DATE.to_string(),
            calendar::iso8601(first_launch),
        );
        data.insert(
            KEY_FIRST_LAUNCH_DATE_MMDDYYYY.to_string(),
            calendar::mmddyyyy(first_launch),
        );
    }

    if let Some(updated) = record.recent_update {
        data.insert(
            KEY_UPDATE_LAUNCH_DATE.to_string(),
            calendar::iso8601(updated),
        );
        if record.is_app_updated() && updated.timestamp_millis() == at.timestamp_millis() {
            data.insert(KEY_IS_FIRST_UPDATE_LAUNCH.to_string(), "true".to_string());
        }
        let days = calendar::days_between(updated, now);
        if days >= 1 {
            data.insert(KEY_DAYS_SINCE_UPDATE.to_string(), days.to_string());
        }
    }

    let prior_wake = record.wake.recent;
    if calendar::is_new_month(prior_wake, now) {
        data.insert(KEY_IS_FIRST_WAKE_MONTH.to_string(), "true".to_string());
    }
    if calendar::is_new_day(prior_wake, now) {
        data.insert(KEY_IS_FIRST_WAKE_TODAY.to_string(), "true".to_string());
    }

    data.insert(
        KEY_HOUR_OF_DAY.to_string(),
        calendar::hour_of_day(now).to_string(),
    );
    data.insert(
        KEY_DAY_OF_WEEK.to_string(),
        calendar::day_of_week(now).to_string(),
    );
    data.insert(
        KEY_DAYS_SINCE_WAKE.to_string(),
        calendar::days_between(prior_wake.unwrap_or(at), now).to_string(),
    );
    data.insert(
        KEY_DAYS_SINCE_LAUNCH.to_string(),
        calendar::days_between(record.first_launch.unwrap_or(at), now).to_string(),
    );

    data
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use chrono::{Duration, TimeZone};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Store that counts writes
    #[derive(Default)]
    struct CountingStore {
        inner: MemoryStore,
        writes: AtomicUsize,
    }

    impl KvStore for CountingStore {
        fn get(&self, key: &str) -> crate::Result<Option<Vec<u8>>> {
            self.inner.get(key)
        }

        fn set(&self, key: &str, value: &[u8]) -> crate::Result<()> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            self.inner.set(key, value)
        }
    }

    fn local(day: u32, hour: u32) -> DateTime<Local> {
        Local
            .with_ymd_and_hms(2024, 6, day, hour, 0, 0)
            .single()
            .expect("unambiguous local time")
    }

    fn engine(version: &str) -> (LifecycleEngine, Arc<CountingStore>) {
        let store = Arc::new(CountingStore::default());
        let engine = LifecycleEngine::load(store.clone(), Some(version.to_string()));
        (engine, store)
    }

    #[test]
    fn test_first_launch() {
        let (engine, store) = engine("1.0");
        let now = local(3, 9);
        let data = engine.lifecycle_data_at(CallType::Create, now).unwrap();

        let first = calendar::iso8601(now.with_timezone(&Utc));
        assert_eq!(data[KEY_LIFECYCLE_TYPE], "launch");
        assert_eq!(data[LINK_ID], "launch");
        assert_eq!(data[KEY_IS_FIRST_LAUNCH], "true");
        assert_eq!(data[KEY_FIRST_LAUNCH_DATE], first);
        assert_eq!(data[KEY_LAUNCH_COUNT], "1");
        assert_eq!(data[KEY_TOTAL_WAKE_COUNT], "1");
        assert_eq!(data[KEY_IS_FIRST_WAKE_TODAY], "true");
        assert_eq!(data[KEY_IS_FIRST_WAKE_MONTH], "true");
        assert_eq!(data[KEY_DAYS_SINCE_LAUNCH], "0");
        assert_eq!(data[KEY_PRIOR_SECONDS_AWAKE], "0");
        assert_eq!(data[KEY_TOTAL_SECONDS_AWAKE], "0");
        assert_eq!(data[KEY_HOUR_OF_DAY], "9");
        // 2024-06-03 was a Monday
        assert_eq!(data[KEY_DAY_OF_WEEK], "2");
        assert!(!data.contains_key(KEY_LAST_SIMILAR_CALL_DATE));
        assert!(!data.contains_key(KEY_SLEEP_COUNT));
        assert!(!data.contains_key(KEY_DAYS_SINCE_UPDATE));
        assert_eq!(store.writes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_repeat_call_is_suppressed() {
        let (engine, store) = engine("1.0");
        engine.lifecycle_data_at(CallType::Create, local(3, 9));
        assert!(engine
            .lifecycle_data_at(CallType::Pause, local(3, 10))
            .is_some());
        let writes = store.writes.load(Ordering::SeqCst);

        assert!(engine
            .lifecycle_data_at(CallType::Pause, local(3, 11))
            .is_none());
        assert_eq!(store.writes.load(Ordering::SeqCst), writes);
        assert_eq!(engine.record().sleep.total_count, 1);
    }

    #[test]
    fn test_resume_after_create_is_suppressed() {
        let (engine, _store) = engine("1.0");
        assert!(engine
            .lifecycle_data_at(CallType::Create, local(3, 9))
            .is_some());
        assert!(engine
            .lifecycle_data_at(CallType::Resume, local(3, 9))
            .is_none());
        assert_eq!(engine.record().wake.total_count, 1);

        // prior call advanced to resume, so a pause still counts
        let data = engine
            .lifecycle_data_at(CallType::Pause, local(3, 10))
            .unwrap();
        assert_eq!(data[KEY_LIFECYCLE_TYPE], "sleep");
        assert_eq!(data[KEY_SECONDS_AWAKE], "3600");
        assert_eq!(data[KEY_TOTAL_SECONDS_AWAKE], "0");
    }

    #[test]
    fn test_session_duration_accumulates() {
        let (engine, _store) = engine("1.0");
        engine.lifecycle_data_at(CallType::Create, local(3, 9));
        engine.lifecycle_data_at(CallType::Pause, local(3, 10));

        let wake = engine
            .lifecycle_data_at(CallType::Resume, local(3, 12))
            .unwrap();
        assert_eq!(wake[KEY_TOTAL_SECONDS_AWAKE], "3600");
        assert!(!wake.contains_key(KEY_IS_FIRST_WAKE_TODAY));

        let sleep = engine
            .lifecycle_data_at(CallType::Pause, local(3, 12) + Duration::minutes(30))
            .unwrap();
        assert_eq!(sleep[KEY_SECONDS_AWAKE], "1800");

        // destroy right after a pause adds no awake time
        let destroy = engine
            .lifecycle_data_at(CallType::Destroy, local(3, 13))
            .unwrap();
        assert!(!destroy.contains_key(KEY_SECONDS_AWAKE));
        assert_eq!(destroy[KEY_TOTAL_SECONDS_AWAKE], "5400");
        assert_eq!(destroy[KEY_TERMINATE_COUNT], "1");

        let relaunch = engine
            .lifecycle_data_at(CallType::Create, local(4, 9))
            .unwrap();
        assert_eq!(relaunch[KEY_PRIOR_SECONDS_AWAKE], "5400");
        assert_eq!(engine.record().seconds_awake_since_launch, 0);
        assert_eq!(engine.record().seconds_awake_total, 5400);
        assert!(!relaunch.contains_key(KEY_IS_FIRST_LAUNCH));
    }

    #[test]
    fn test_days_since_launch_and_wake() {
        let (engine, _store) = engine("1.0");
        let launch = local(3, 9);
        engine.lifecycle_data_at(CallType::Create, launch);
        engine.lifecycle_data_at(CallType::Pause, local(3, 10));

        let data = engine
            .lifecycle_data_at(CallType::Resume, local(5, 9))
            .unwrap();
        assert_eq!(data[KEY_DAYS_SINCE_LAUNCH], "2");
        assert_eq!(data[KEY_DAYS_SINCE_WAKE], "2");
        assert_eq!(data[KEY_IS_FIRST_WAKE_TODAY], "true");
        assert!(!data.contains_key(KEY_IS_FIRST_WAKE_MONTH));
        assert_eq!(
            data[KEY_LAST_SIMILAR_CALL_DATE],
            calendar::iso8601(launch.with_timezone(&Utc))
        );
        assert_eq!(data[KEY_WAKE_COUNT], "2");
    }

    #[test]
    fn test_update_detection() {
        let store = Arc::new(CountingStore::default());
        let first = LifecycleEngine::load(store.clone(), Some("1.0".to_string()));
        first.lifecycle_data_at(CallType::Create, local(3, 9));
        first.lifecycle_data_at(CallType::Destroy, local(3, 10));

        let updated = LifecycleEngine::load(store.clone(), Some("2.0".to_string()));
        let launch_at = local(4, 9);
        let data = updated
            .lifecycle_data_at(CallType::Create, launch_at)
            .unwrap();
        assert_eq!(data[KEY_IS_FIRST_UPDATE_LAUNCH], "true");
        assert_eq!(
            data[KEY_UPDATE_LAUNCH_DATE],
            calendar::iso8601(launch_at.with_timezone(&Utc))
        );
        assert!(!data.contains_key(KEY_DAYS_SINCE_UPDATE));

        updated.lifecycle_data_at(CallType::Destroy, local(4, 10));
        let later = updated
            .lifecycle_data_at(CallType::Create, local(7, 9))
            .unwrap();
        assert!(!later.contains_key(KEY_IS_FIRST_UPDATE_LAUNCH));
        assert_eq!(later[KEY_DAYS_SINCE_UPDATE], "3");
        assert_eq!(later[KEY_TOTAL_LAUNCH_COUNT], "3");
    }

    #[test]
    fn test_crash_counters() {
        let (engine, _store) = engine("1.0");
        engine.lifecycle_data_at(CallType::Create, local(3, 9));
        let data = engine
            .lifecycle_data_at(CallType::Crash, local(3, 9))
            .unwrap();
        assert_eq!(data[KEY_LIFECYCLE_TYPE], "crash");
        assert_eq!(data[KEY_CRASH_COUNT], "1");
        assert_eq!(data[KEY_TOTAL_CRASH_COUNT], "1");
    }

    #[test]
    fn test_record_survives_reload() {
        let (engine, store) = engine("1.0");
        engine.lifecycle_data_at(CallType::Create, local(3, 9));
        engine.lifecycle_data_at(CallType::Pause, local(3, 10));

        let reloaded = LifecycleEngine::load(store, Some("1.0".to_string()));
        assert_eq!(reloaded.record(), engine.record());
        assert!(reloaded
            .lifecycle_data_at(CallType::Pause, local(3, 11))
            .is_none());
    }

    #[test]
    fn test_reset_restores_first_launch() {
        let (engine, store) = engine("1.0");
        engine.lifecycle_data_at(CallType::Create, local(3, 9));
        engine.lifecycle_data_at(CallType::Destroy, local(3, 10));

        engine.reset();
        assert_eq!(engine.record(), LifecycleRecord::default());

        let data = engine
            .lifecycle_data_at(CallType::Create, local(5, 9))
            .unwrap();
        assert_eq!(data[KEY_IS_FIRST_LAUNCH], "true");
        assert_eq!(data[KEY_TOTAL_LAUNCH_COUNT], "1");

        let reloaded = LifecycleEngine::load(store, None);
        assert_eq!(reloaded.record().launch.total_count, 1);
    }

    #[test]
    fn test_corrupt_log_starts_fresh() {
        let store = Arc::new(MemoryStore::new());
        store.set_string(LIFECYCLE_LOG_KEY, "not json").unwrap();
        let engine = LifecycleEngine::load(store, None);
        assert_eq!(engine.record(), LifecycleRecord::default());
    }
}
