//! Collection-level views over the status engine: dashboard counts, the
//! calendar day filter, the searchable member list and the notification
//! tally.
//!
//! All functions borrow their input and keep no state between calls, so
//! they can be re-run on every store snapshot. A member whose plan runs off
//! the calendar fails the whole view with
//! [`CoreError::InvalidArgument`](crate::error::CoreError::InvalidArgument).

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::{CalendarDay, Status};
use crate::error::Result;
use crate::member::Member;

/// Dashboard counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusSummary {
    pub active: usize,
    pub expiring_soon: usize,
    pub expired: usize,
    pub undefined: usize,
    /// Every member, whatever its status.
    pub total: usize,
}

impl StatusSummary {
    fn record(&mut self, status: Status) {
        self.total += 1;
        match status {
            Status::Active => self.active += 1,
            Status::ExpiringSoon => self.expiring_soon += 1,
            Status::Expired => self.expired += 1,
            Status::Undefined => self.undefined += 1,
        }
    }
}

/// Count members per status as of `reference`.
pub fn summarize(members: &[Member], reference: impl CalendarDay) -> Result<StatusSummary> {
    let today = reference.calendar_day();
    let mut summary = StatusSummary::default();
    for member in members {
        summary.record(member.status_at(today)?);
    }
    Ok(summary)
}

/// Members whose expiration falls on `target`, in input order.
pub fn filter_by_date(members: &[Member], target: impl CalendarDay) -> Result<Vec<&Member>> {
    let target = target.calendar_day();
    let mut matched = Vec::new();
    for member in members {
        if member.expiration_date()? == Some(target) {
            matched.push(member);
        }
    }
    Ok(matched)
}

/// Status tab of the member list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StatusFilter {
    #[default]
    All,
    Active,
    ExpiringSoon,
    Expired,
}

impl StatusFilter {
    pub fn matches(&self, status: Status) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Active => status == Status::Active,
            StatusFilter::ExpiringSoon => status == Status::ExpiringSoon,
            StatusFilter::Expired => status == Status::Expired,
        }
    }
}

impl fmt::Display for StatusFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StatusFilter::All => "all",
            StatusFilter::Active => "active",
            StatusFilter::ExpiringSoon => "expiring-soon",
            StatusFilter::Expired => "expired",
        };
        f.write_str(s)
    }
}

impl FromStr for StatusFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "all" => Ok(StatusFilter::All),
            "active" => Ok(StatusFilter::Active),
            "expiring-soon" | "expiring" => Ok(StatusFilter::ExpiringSoon),
            "expired" => Ok(StatusFilter::Expired),
            other => Err(format!(
                "unknown status filter '{other}' (expected all, active, expiring-soon, expired)"
            )),
        }
    }
}

/// Search, filter by status tab, and order by remaining days ascending.
///
/// `search` is matched case-insensitively as a substring of
/// "first last"; an empty search matches everyone. Members without a
/// registration date sort after everyone else. The sort is stable, so
/// members with equal remaining days keep their input order.
pub fn filter_and_sort<'a>(
    members: &'a [Member],
    search: &str,
    filter: StatusFilter,
    reference: impl CalendarDay,
) -> Result<Vec<&'a Member>> {
    let today = reference.calendar_day();
    let needle = search.trim().to_lowercase();

    let mut matched: Vec<(Option<i64>, &Member)> = Vec::new();
    for member in members {
        let name_matches = needle.is_empty()
            || format!("{} {}", member.first_name, member.last_name)
                .to_lowercase()
                .contains(&needle);
        if name_matches && filter.matches(member.status_at(today)?) {
            matched.push((member.remaining_days_at(today)?, member));
        }
    }

    matched.sort_by_key(|(remaining, _)| (remaining.is_none(), remaining.unwrap_or(0)));
    Ok(matched.into_iter().map(|(_, m)| m).collect())
}

/// Members that warrant a reminder.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotifyCounts {
    pub expiring_soon: usize,
    pub expired: usize,
}

impl NotifyCounts {
    pub fn total(&self) -> usize {
        self.expiring_soon + self.expired
    }

    /// True when at least one member is expiring soon or expired.
    pub fn is_warranted(&self) -> bool {
        self.total() > 0
    }
}

impl From<StatusSummary> for NotifyCounts {
    fn from(summary: StatusSummary) -> Self {
        Self {
            expiring_soon: summary.expiring_soon,
            expired: summary.expired,
        }
    }
}

/// Expiring-soon and expired counts as of `reference`.
pub fn should_notify(members: &[Member], reference: impl CalendarDay) -> Result<NotifyCounts> {
    summarize(members, reference).map(NotifyCounts::from)
}

/// A member together with its derived fields, for display.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberStatusView<'a> {
    #[serde(flatten)]
    pub member: &'a Member,
    pub expiration_date: Option<NaiveDate>,
    pub remaining_days: Option<i64>,
    pub status: Status,
}

impl<'a> MemberStatusView<'a> {
    pub fn new(member: &'a Member, reference: impl CalendarDay) -> Result<Self> {
        let today = reference.calendar_day();
        Ok(Self {
            member,
            expiration_date: member.expiration_date()?,
            remaining_days: member.remaining_days_at(today)?,
            status: member.status_at(today)?,
        })
    }
}

/// Attach derived fields to each member, preserving order.
pub fn describe<'a, I>(
    members: I,
    reference: impl CalendarDay,
) -> Result<Vec<MemberStatusView<'a>>>
where
    I: IntoIterator<Item = &'a Member>,
{
    let today = reference.calendar_day();
    members
        .into_iter()
        .map(|m| MemberStatusView::new(m, today))
        .collect()
}
