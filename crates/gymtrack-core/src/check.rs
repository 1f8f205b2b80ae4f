//! The daily membership check.
//!
//! ```text
//!   preferences ──► enabled? ──no──► Disabled
//!                      │
//!                      ▼
//!   owner ──────► signed in? ──no──► Err(Unauthenticated)
//!                      │
//!                      ▼
//!   store ─────────► list ──err──► Err(Store)
//!                      │
//!                      ▼
//!   clock ──────► should_notify ──(0, 0)──► Quiet
//!                      │
//!                      ▼
//!   notifier ◄──── Notified(counts)
//! ```
//!
//! The check runs once and reports. Scheduling and retrying belong to the
//! caller, see [`DailySchedule`] and [`RetryPolicy`].

use chrono::{DateTime, NaiveTime, TimeDelta, TimeZone, Timelike};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

use crate::clock::Clock;
use crate::error::{CoreError, Result};
use crate::member::OwnerId;
use crate::notify::{summary_message, Notifier};
use crate::status::{should_notify, NotifyCounts};
use crate::storage::MemberStore;

/// Preference that gates the check.
pub const NOTIFICATIONS_ENABLED_KEY: &str = "notifications.enabled";

/// Read-only access to user preferences.
pub trait PreferenceStore {
    fn get_bool(&self, key: &str, default: bool) -> bool;
}

impl PreferenceStore for HashMap<String, bool> {
    fn get_bool(&self, key: &str, default: bool) -> bool {
        self.get(key).copied().unwrap_or(default)
    }
}

/// Result of a successful check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CheckOutcome {
    /// Notifications are turned off; nothing was read.
    Disabled,
    /// Nobody is expiring soon or expired.
    Quiet,
    /// A reminder was sent.
    Notified(NotifyCounts),
}

/// One run of the scheduled check, wired to its collaborators.
pub struct MembershipCheck<'a> {
    store: &'a dyn MemberStore,
    clock: &'a dyn Clock,
    notifier: &'a dyn Notifier,
    prefs: &'a dyn PreferenceStore,
}

impl<'a> MembershipCheck<'a> {
    pub fn new(
        store: &'a dyn MemberStore,
        clock: &'a dyn Clock,
        notifier: &'a dyn Notifier,
        prefs: &'a dyn PreferenceStore,
    ) -> Self {
        Self {
            store,
            clock,
            notifier,
            prefs,
        }
    }

    /// Run the check for `owner`.
    ///
    /// # Errors
    /// [`CoreError::Unauthenticated`] without an owner, or the store error
    /// if the collection cannot be read.
    pub fn run(&self, owner: Option<&OwnerId>) -> Result<CheckOutcome> {
        if !self.prefs.get_bool(NOTIFICATIONS_ENABLED_KEY, true) {
            tracing::info!("membership check skipped: notifications disabled");
            return Ok(CheckOutcome::Disabled);
        }

        let owner = owner.ok_or_else(|| {
            tracing::warn!("membership check failed: no owner configured");
            CoreError::Unauthenticated
        })?;

        let members = self.store.list(owner).map_err(|e| {
            tracing::warn!(owner = %owner, error = %e, "membership check failed to read members");
            e
        })?;
        if members.is_empty() {
            tracing::info!(owner = %owner, "membership check: no members");
            return Ok(CheckOutcome::Quiet);
        }

        let counts = should_notify(&members, self.clock.now())?;
        if !counts.is_warranted() {
            tracing::info!(owner = %owner, total = members.len(), "membership check: all current");
            return Ok(CheckOutcome::Quiet);
        }

        let (title, body) = summary_message(counts);
        self.notifier.notify(&title, &body);
        tracing::info!(
            owner = %owner,
            expiring_soon = counts.expiring_soon,
            expired = counts.expired,
            "membership check: reminder sent"
        );
        Ok(CheckOutcome::Notified(counts))
    }
}

/// Local time of day at which the check runs, once per day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailySchedule {
    at: NaiveTime,
}

impl Default for DailySchedule {
    fn default() -> Self {
        Self {
            at: NaiveTime::MIN + TimeDelta::hours(9),
        }
    }
}

impl DailySchedule {
    /// # Errors
    /// [`CoreError::InvalidArgument`] when `hour`/`minute` is not a time of day.
    pub fn new(hour: u32, minute: u32) -> Result<Self> {
        let at = NaiveTime::from_hms_opt(hour, minute, 0).ok_or_else(|| {
            CoreError::invalid_argument("schedule", format!("{hour:02}:{minute:02} is not a time of day"))
        })?;
        Ok(Self { at })
    }

    pub fn hour(&self) -> u32 {
        self.at.hour()
    }

    pub fn minute(&self) -> u32 {
        self.at.minute()
    }

    /// Time between runs.
    pub fn period(&self) -> Duration {
        Duration::from_secs(24 * 60 * 60)
    }

    /// First scheduled instant at or after `now`, in `now`'s time zone.
    ///
    /// When the scheduled time falls in a DST gap the run moves one hour later.
    pub fn next_run_after<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> DateTime<Tz> {
        let tz = now.timezone();
        let mut date = now.date_naive();
        for _ in 0..3 {
            let local = date.and_time(self.at);
            let resolved = tz
                .from_local_datetime(&local)
                .earliest()
                .or_else(|| tz.from_local_datetime(&(local + TimeDelta::hours(1))).earliest());
            if let Some(at) = resolved {
                if at >= *now {
                    return at;
                }
            }
            match date.succ_opt() {
                Some(next) => date = next,
                None => break,
            }
        }
        now.clone() + TimeDelta::days(1)
    }

    /// How long to sleep from `now` until the next run.
    pub fn delay_until_next<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> Duration {
        (self.next_run_after(now) - now.clone())
            .to_std()
            .unwrap_or_default()
    }
}

/// Exponential backoff after a failed run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub initial: Duration,
    pub factor: u32,
    pub max: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            initial: Duration::from_secs(30),
            factor: 2,
            max: Duration::from_secs(5 * 60 * 60),
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `attempt` (0-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let multiplier = self.factor.checked_pow(attempt).unwrap_or(u32::MAX);
        self.initial
            .checked_mul(multiplier)
            .unwrap_or(self.max)
            .min(self.max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::error::StoreError;
    use crate::member::Member;
    use crate::notify::RecordingNotifier;
    use crate::storage::InMemoryStore;
    use chrono::{FixedOffset, Utc};

    fn member(id: &str, registered: (i32, u32, u32), days: u32) -> Member {
        Member {
            id: id.to_string(),
            first_name: "Ana".to_string(),
            last_name: "Ruiz".to_string(),
            phone: "5512345678".to_string(),
            plan_duration_days: days,
            registration_date: Some(
                Utc.with_ymd_and_hms(registered.0, registered.1, registered.2, 8, 0, 0)
                    .unwrap(),
            ),
            is_active: true,
        }
    }

    fn owner() -> OwnerId {
        OwnerId::new("coach@gym.com").unwrap()
    }

    fn clock() -> FixedClock {
        FixedClock(Utc.with_ymd_and_hms(2024, 1, 28, 9, 0, 0).unwrap())
    }

    fn enabled() -> HashMap<String, bool> {
        HashMap::new()
    }

    #[test]
    fn notifies_expiring_and_expired_counts() {
        let store = InMemoryStore::with_members(
            &owner(),
            [
                member("a", (2024, 1, 1), 30),  // 3 days left
                member("b", (2024, 1, 25), 5),  // 2 days left
                member("c", (2024, 1, 1), 20),  // expired 7 days ago
                member("d", (2024, 1, 20), 60), // active
            ],
        );
        let notifier = RecordingNotifier::new();
        let clock = clock();
        let prefs = enabled();
        let check = MembershipCheck::new(&store, &clock, &notifier, &prefs);

        let outcome = check.run(Some(&owner())).unwrap();
        assert_eq!(
            outcome,
            CheckOutcome::Notified(NotifyCounts {
                expiring_soon: 2,
                expired: 1
            })
        );
        assert_eq!(
            notifier.sent(),
            vec![(
                "Membership summary".to_string(),
                "Today you have 2 memberships expiring soon and 1 expired.".to_string()
            )]
        );
    }

    #[test]
    fn all_active_is_quiet() {
        let store = InMemoryStore::with_members(&owner(), [member("d", (2024, 1, 20), 60)]);
        let notifier = RecordingNotifier::new();
        let clock = clock();
        let prefs = enabled();
        let outcome = MembershipCheck::new(&store, &clock, &notifier, &prefs)
            .run(Some(&owner()))
            .unwrap();
        assert_eq!(outcome, CheckOutcome::Quiet);
        assert!(notifier.sent().is_empty());
    }

    #[test]
    fn empty_collection_is_quiet() {
        let store = InMemoryStore::new();
        let notifier = RecordingNotifier::new();
        let clock = clock();
        let prefs = enabled();
        let outcome = MembershipCheck::new(&store, &clock, &notifier, &prefs)
            .run(Some(&owner()))
            .unwrap();
        assert_eq!(outcome, CheckOutcome::Quiet);
    }

    #[test]
    fn disabled_preference_skips_everything() {
        let store = InMemoryStore::new();
        store.set_offline(true);
        let notifier = RecordingNotifier::new();
        let clock = clock();
        let prefs = HashMap::from([(NOTIFICATIONS_ENABLED_KEY.to_string(), false)]);
        let outcome = MembershipCheck::new(&store, &clock, &notifier, &prefs)
            .run(None)
            .unwrap();
        assert_eq!(outcome, CheckOutcome::Disabled);
    }

    #[test]
    fn missing_owner_is_unauthenticated() {
        let store = InMemoryStore::new();
        let notifier = RecordingNotifier::new();
        let clock = clock();
        let prefs = enabled();
        let result = MembershipCheck::new(&store, &clock, &notifier, &prefs).run(None);
        assert!(matches!(result, Err(CoreError::Unauthenticated)));
    }

    #[test]
    fn unavailable_store_fails_the_run() {
        let store = InMemoryStore::with_members(&owner(), [member("a", (2024, 1, 1), 30)]);
        store.set_offline(true);
        let notifier = RecordingNotifier::new();
        let clock = clock();
        let prefs = enabled();
        let result = MembershipCheck::new(&store, &clock, &notifier, &prefs).run(Some(&owner()));
        assert!(matches!(
            result,
            Err(CoreError::Store(StoreError::Unavailable(_)))
        ));
        assert!(notifier.sent().is_empty());
    }

    #[test]
    fn schedule_runs_later_today_or_tomorrow() {
        let schedule = DailySchedule::default();
        assert_eq!((schedule.hour(), schedule.minute()), (9, 0));

        let before = Utc.with_ymd_and_hms(2024, 3, 1, 7, 30, 0).unwrap();
        assert_eq!(
            schedule.next_run_after(&before),
            Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap()
        );

        let exactly = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();
        assert_eq!(schedule.next_run_after(&exactly), exactly);

        let after = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 1).unwrap();
        assert_eq!(
            schedule.next_run_after(&after),
            Utc.with_ymd_and_hms(2024, 3, 2, 9, 0, 0).unwrap()
        );
        assert_eq!(schedule.period(), Duration::from_secs(86_400));
    }

    #[test]
    fn schedule_uses_local_wall_clock() {
        let tz = FixedOffset::west_opt(6 * 3600).unwrap();
        let schedule = DailySchedule::new(18, 30).unwrap();
        let now = tz.with_ymd_and_hms(2024, 3, 1, 19, 0, 0).unwrap();
        let next = schedule.next_run_after(&now);
        assert_eq!(next, tz.with_ymd_and_hms(2024, 3, 2, 18, 30, 0).unwrap());
        assert_eq!(schedule.delay_until_next(&now), Duration::from_secs(23 * 3600 + 1800));
    }

    #[test]
    fn schedule_rejects_invalid_time() {
        assert!(DailySchedule::new(24, 0).is_err());
        assert!(DailySchedule::new(9, 60).is_err());
    }

    #[test]
    fn retry_policy_doubles_up_to_cap() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(0), Duration::from_secs(30));
        assert_eq!(policy.delay_for(1), Duration::from_secs(60));
        assert_eq!(policy.delay_for(5), Duration::from_secs(960));
        assert_eq!(policy.delay_for(10), Duration::from_secs(5 * 3600));
        assert_eq!(policy.delay_for(40), Duration::from_secs(5 * 3600));
    }
}
