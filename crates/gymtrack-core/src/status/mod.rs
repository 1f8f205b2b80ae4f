//! Membership status engine.
//!
//! Pure date arithmetic and classification. Every computation is anchored
//! to UTC calendar days: an instant is truncated to its UTC date before any
//! comparison, and day differences are taken between dates, never between
//! raw timestamps, so daylight-saving shifts cannot move a result by one.
//!
//! ```text
//! expiration     = utc_date(registration) + plan_duration_days
//! remaining_days = expiration - utc_date(reference)
//!
//!   no registration      -> UNDEFINED
//!   remaining_days > 5   -> ACTIVE
//!   0 <= remaining <= 5  -> EXPIRING_SOON
//!   remaining_days < 0   -> EXPIRED
//! ```

mod views;

pub use views::{
    describe, filter_and_sort, filter_by_date, should_notify, summarize, MemberStatusView,
    NotifyCounts, StatusFilter, StatusSummary,
};

use chrono::{DateTime, Days, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{CoreError, Result};
use crate::member::Member;

/// Members with this many remaining days or fewer (and not yet expired)
/// are reported as expiring soon.
pub const EXPIRING_SOON_THRESHOLD_DAYS: i64 = 5;

/// Derived membership status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    /// More than [`EXPIRING_SOON_THRESHOLD_DAYS`] days left.
    Active,
    /// Expires today or within the threshold.
    ExpiringSoon,
    /// Expiration date is in the past.
    Expired,
    /// No registration date, so nothing can be computed.
    Undefined,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Active => "ACTIVE",
            Status::ExpiringSoon => "EXPIRING_SOON",
            Status::Expired => "EXPIRED",
            Status::Undefined => "UNDEFINED",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Anything that can be reduced to a UTC calendar day.
pub trait CalendarDay {
    fn calendar_day(&self) -> NaiveDate;
}

impl CalendarDay for NaiveDate {
    fn calendar_day(&self) -> NaiveDate {
        *self
    }
}

impl CalendarDay for DateTime<Utc> {
    fn calendar_day(&self) -> NaiveDate {
        self.date_naive()
    }
}

impl<T: CalendarDay + ?Sized> CalendarDay for &T {
    fn calendar_day(&self) -> NaiveDate {
        (**self).calendar_day()
    }
}

/// Midnight UTC at the start of `day`.
pub fn start_of_day(day: NaiveDate) -> DateTime<Utc> {
    day.and_time(chrono::NaiveTime::MIN).and_utc()
}

/// Registration day plus `plan_duration_days` whole days.
///
/// # Errors
/// [`CoreError::InvalidArgument`] if the duration is negative or the result
/// falls outside the representable calendar.
pub fn compute_expiration(
    registration: impl CalendarDay,
    plan_duration_days: i64,
) -> Result<NaiveDate> {
    let days = u64::try_from(plan_duration_days).map_err(|_| {
        CoreError::invalid_argument(
            "planDurationDays",
            format!("must not be negative (got {plan_duration_days})"),
        )
    })?;
    registration
        .calendar_day()
        .checked_add_days(Days::new(days))
        .ok_or_else(|| {
            CoreError::invalid_argument("planDurationDays", "expiration date is out of range")
        })
}

/// Signed whole days from `reference` to `expiration`. Zero means the plan
/// expires on the reference day; negative means it already expired.
pub fn compute_remaining_days(expiration: impl CalendarDay, reference: impl CalendarDay) -> i64 {
    expiration
        .calendar_day()
        .signed_duration_since(reference.calendar_day())
        .num_days()
}

/// Map remaining days to a status.
pub fn classify(remaining_days: i64, has_registration_date: bool) -> Status {
    if !has_registration_date {
        Status::Undefined
    } else if remaining_days > EXPIRING_SOON_THRESHOLD_DAYS {
        Status::Active
    } else if remaining_days >= 0 {
        Status::ExpiringSoon
    } else {
        Status::Expired
    }
}

impl Member {
    /// Expiration day, or `None` when the member has no registration date.
    ///
    /// # Errors
    /// [`CoreError::InvalidArgument`] if the plan runs past the representable
    /// calendar.
    pub fn expiration_date(&self) -> Result<Option<NaiveDate>> {
        self.registration_date
            .map(|registration| compute_expiration(registration, i64::from(self.plan_duration_days)))
            .transpose()
    }

    pub fn remaining_days_at(&self, reference: impl CalendarDay) -> Result<Option<i64>> {
        Ok(self
            .expiration_date()?
            .map(|expiration| compute_remaining_days(expiration, reference)))
    }

    pub fn status_at(&self, reference: impl CalendarDay) -> Result<Status> {
        Ok(match self.remaining_days_at(reference)? {
            Some(days) => classify(days, true),
            None => Status::Undefined,
        })
    }
}
