//! Plan durations: turning a chosen plan or expiration date into
//! `plan_duration_days`, and the registration / edit actions that use it.

use chrono::{DateTime, Months, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{CoreError, Result};
use crate::member::{Member, MemberDraft, MemberPatch, NewMember, MAX_PLAN_DURATION_DAYS};
use crate::status::{compute_remaining_days, start_of_day, CalendarDay};

/// Shortest plan a computed duration is floored to.
pub const MIN_PLAN_DURATION_DAYS: u32 = 1;

/// Plan lengths offered at registration. Months and years are calendar
/// units, so "one month" from Jan 31 ends on the last day of February.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanPreset {
    #[default]
    OneMonth,
    ThreeMonths,
    SixMonths,
    OneYear,
}

impl PlanPreset {
    pub fn months(&self) -> u32 {
        match self {
            PlanPreset::OneMonth => 1,
            PlanPreset::ThreeMonths => 3,
            PlanPreset::SixMonths => 6,
            PlanPreset::OneYear => 12,
        }
    }

    /// Expiration day of this plan when bought on `today`.
    pub fn expiration_from(&self, today: impl CalendarDay) -> Result<NaiveDate> {
        add_months(today.calendar_day(), self.months())
    }
}

impl fmt::Display for PlanPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PlanPreset::OneMonth => "one-month",
            PlanPreset::ThreeMonths => "three-months",
            PlanPreset::SixMonths => "six-months",
            PlanPreset::OneYear => "one-year",
        };
        f.write_str(s)
    }
}

impl FromStr for PlanPreset {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "one-month" | "1m" | "month" => Ok(PlanPreset::OneMonth),
            "three-months" | "3m" => Ok(PlanPreset::ThreeMonths),
            "six-months" | "6m" => Ok(PlanPreset::SixMonths),
            "one-year" | "1y" | "year" => Ok(PlanPreset::OneYear),
            other => Err(format!(
                "unknown plan '{other}' (expected one-month, three-months, six-months, one-year)"
            )),
        }
    }
}

/// Quick extensions offered when editing a member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Extension {
    Month,
    Year,
}

impl Extension {
    pub fn apply(&self, expiration: NaiveDate) -> Result<NaiveDate> {
        match self {
            Extension::Month => add_months(expiration, 1),
            Extension::Year => add_months(expiration, 12),
        }
    }
}

impl FromStr for Extension {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "month" => Ok(Extension::Month),
            "year" => Ok(Extension::Year),
            other => Err(format!("unknown extension '{other}' (expected month or year)")),
        }
    }
}

fn add_months(day: NaiveDate, months: u32) -> Result<NaiveDate> {
    day.checked_add_months(Months::new(months))
        .ok_or_else(|| CoreError::invalid_argument("expirationDate", "date is out of range"))
}

/// Days from `today` until `expiration`, floored to
/// [`MIN_PLAN_DURATION_DAYS`]. A past or same-day expiration therefore still
/// yields a one-day plan.
///
/// # Errors
/// [`CoreError::InvalidArgument`] if the plan would exceed
/// [`MAX_PLAN_DURATION_DAYS`].
pub fn duration_until(today: impl CalendarDay, expiration: impl CalendarDay) -> Result<u32> {
    let days = compute_remaining_days(expiration, today);
    if days > i64::from(MAX_PLAN_DURATION_DAYS) {
        return Err(CoreError::invalid_argument(
            "expirationDate",
            format!("plan may not exceed {MAX_PLAN_DURATION_DAYS} days (got {days})"),
        ));
    }
    Ok(days.max(i64::from(MIN_PLAN_DURATION_DAYS)) as u32)
}

/// How the plan of a new member is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanChoice {
    Preset(PlanPreset),
    Until(NaiveDate),
}

impl Default for PlanChoice {
    fn default() -> Self {
        PlanChoice::Preset(PlanPreset::default())
    }
}

impl PlanChoice {
    pub fn expiration_from(&self, today: impl CalendarDay) -> Result<NaiveDate> {
        match self {
            PlanChoice::Preset(preset) => preset.expiration_from(today),
            PlanChoice::Until(date) => Ok(*date),
        }
    }
}

/// The registration action: validated contact details plus a plan.
#[derive(Debug, Clone)]
pub struct Registration {
    pub draft: MemberDraft,
    pub plan: PlanChoice,
}

impl Registration {
    pub fn new(draft: MemberDraft, plan: PlanChoice) -> Self {
        Self { draft, plan }
    }

    /// Build the record to store. The registration date is `now` itself,
    /// the duration counts days from today to the chosen expiration.
    pub fn build(self, now: DateTime<Utc>) -> Result<NewMember> {
        let draft = self.draft.validate()?;
        let expiration = self.plan.expiration_from(now)?;
        let plan_duration_days = duration_until(now, expiration)?;
        Ok(NewMember {
            first_name: draft.first_name,
            last_name: draft.last_name,
            phone: draft.phone,
            plan_duration_days,
            registration_date: Some(now),
            is_active: true,
        })
    }
}

/// New expiration requested by an edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpirationChange {
    /// Pick a date directly.
    Until(NaiveDate),
    /// Push the current expiration (or today, if none) forward.
    Extend(Extension),
}

/// The edit action. Unset fields keep their stored values.
#[derive(Debug, Clone, Default)]
pub struct MemberEdit {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub expiration: Option<ExpirationChange>,
}

impl MemberEdit {
    /// Validate the edit against the current record and produce the patch.
    ///
    /// Changing the expiration restarts the plan: the registration date
    /// becomes today at midnight UTC and the duration is recomputed from
    /// today to the new expiration.
    pub fn into_patch(self, current: &Member, now: DateTime<Utc>) -> Result<MemberPatch> {
        let draft = MemberDraft {
            first_name: self.first_name.unwrap_or_else(|| current.first_name.clone()),
            last_name: self.last_name.unwrap_or_else(|| current.last_name.clone()),
            phone: self.phone.unwrap_or_else(|| current.phone.clone()),
        }
        .validate()?;

        let mut patch = MemberPatch::default();
        if draft.first_name != current.first_name {
            patch.first_name = Some(draft.first_name);
        }
        if draft.last_name != current.last_name {
            patch.last_name = Some(draft.last_name);
        }
        if draft.phone != current.phone {
            patch.phone = Some(draft.phone);
        }

        if let Some(change) = self.expiration {
            let today = now.calendar_day();
            let expiration = match change {
                ExpirationChange::Until(date) => date,
                ExpirationChange::Extend(ext) => {
                    ext.apply(current.expiration_date()?.unwrap_or(today))?
                }
            };
            patch.registration_date = Some(start_of_day(today));
            patch.plan_duration_days = Some(duration_until(today, expiration)?);
        }

        Ok(patch)
    }
}
