//! Member records, input validation and the owner (tenant) key.
//!
//! [`Member`] is the persisted shape. Derived values such as the expiration
//! date and status are never stored; see [`crate::status`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::ValidationError;

/// Maximum length of a first or last name, in characters.
pub const MAX_NAME_LEN: usize = 50;
/// Minimum number of digits in a phone number.
pub const MIN_PHONE_LEN: usize = 10;
/// Maximum number of digits in a phone number.
pub const MAX_PHONE_LEN: usize = 15;
/// Longest plan the store accepts (100 years).
pub const MAX_PLAN_DURATION_DAYS: u32 = 36_500;

fn default_plan_duration_days() -> u32 {
    30
}

fn default_true() -> bool {
    true
}

/// One gym member, as persisted by the member store.
///
/// Serialized in camelCase:
/// `{id, firstName, lastName, phone, planDurationDays, registrationDate, isActive}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Member {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    /// Days covered by the paid plan, counted from `registration_date`.
    #[serde(default = "default_plan_duration_days")]
    pub plan_duration_days: u32,
    /// Absent for records that were never given a start date.
    #[serde(default)]
    pub registration_date: Option<DateTime<Utc>>,
    /// Stored but not consulted by status computation.
    #[serde(default = "default_true")]
    pub is_active: bool,
}

impl Member {
    /// "First Last", trimmed.
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }

    /// Schema check applied at the store boundary.
    ///
    /// Returns a human-readable reason when the record cannot be handed to
    /// the status engine.
    pub fn check_schema(&self) -> Result<(), String> {
        if self.id.trim().is_empty() {
            return Err("id is empty".into());
        }
        if self.plan_duration_days < 1 {
            return Err("planDurationDays must be at least 1".into());
        }
        if self.plan_duration_days > MAX_PLAN_DURATION_DAYS {
            return Err(format!(
                "planDurationDays must be at most {MAX_PLAN_DURATION_DAYS}"
            ));
        }
        if self.expiration_date().is_err() {
            return Err("expiration date is past the supported calendar".into());
        }
        Ok(())
    }
}

/// Fields of a member that has not been stored yet. The store assigns the id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMember {
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub plan_duration_days: u32,
    pub registration_date: Option<DateTime<Utc>>,
    pub is_active: bool,
}

impl NewMember {
    pub fn with_id(self, id: impl Into<String>) -> Member {
        Member {
            id: id.into(),
            first_name: self.first_name,
            last_name: self.last_name,
            phone: self.phone,
            plan_duration_days: self.plan_duration_days,
            registration_date: self.registration_date,
            is_active: self.is_active,
        }
    }
}

/// Partial update. `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberPatch {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub plan_duration_days: Option<u32>,
    pub registration_date: Option<DateTime<Utc>>,
    pub is_active: Option<bool>,
}

impl MemberPatch {
    pub fn is_empty(&self) -> bool {
        self == &MemberPatch::default()
    }

    /// Apply the patch to an in-memory copy of a member.
    pub fn apply_to(&self, member: &mut Member) {
        if let Some(v) = &self.first_name {
            member.first_name = v.clone();
        }
        if let Some(v) = &self.last_name {
            member.last_name = v.clone();
        }
        if let Some(v) = &self.phone {
            member.phone = v.clone();
        }
        if let Some(v) = self.plan_duration_days {
            member.plan_duration_days = v;
        }
        if let Some(v) = self.registration_date {
            member.registration_date = Some(v);
        }
        if let Some(v) = self.is_active {
            member.is_active = v;
        }
    }
}

/// Contact details as typed into a registration or edit form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemberDraft {
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
}

impl MemberDraft {
    pub fn new(
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        phone: impl Into<String>,
    ) -> Self {
        Self {
            first_name: first_name.into(),
            last_name: last_name.into(),
            phone: phone.into(),
        }
    }

    /// Trim every field and check it. Returns the cleaned draft.
    ///
    /// # Errors
    /// Returns the first [`ValidationError`] found, checking first name,
    /// last name and phone in that order.
    pub fn validate(self) -> Result<Self, ValidationError> {
        Ok(Self {
            first_name: validate_name("firstName", &self.first_name)?,
            last_name: validate_name("lastName", &self.last_name)?,
            phone: validate_phone(&self.phone)?,
        })
    }
}

/// Letters and whitespace only, non-empty after trimming, at most
/// [`MAX_NAME_LEN`] characters.
pub fn validate_name(field: &'static str, value: &str) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyField { field });
    }
    if !trimmed.chars().all(|c| c.is_alphabetic() || c.is_whitespace()) {
        return Err(ValidationError::InvalidCharacters {
            field,
            allowed: "letters and spaces",
        });
    }
    let len = trimmed.chars().count();
    if len > MAX_NAME_LEN {
        return Err(ValidationError::TooLong {
            field,
            max: MAX_NAME_LEN,
            len,
        });
    }
    Ok(trimmed.to_string())
}

/// ASCII digits only, between [`MIN_PHONE_LEN`] and [`MAX_PHONE_LEN`] long.
pub fn validate_phone(value: &str) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyField { field: "phone" });
    }
    if !trimmed.chars().all(|c| c.is_ascii_digit()) {
        return Err(ValidationError::InvalidCharacters {
            field: "phone",
            allowed: "digits",
        });
    }
    let len = trimmed.len();
    if len < MIN_PHONE_LEN {
        return Err(ValidationError::PhoneTooShort {
            min: MIN_PHONE_LEN,
            len,
        });
    }
    if len > MAX_PHONE_LEN {
        return Err(ValidationError::TooLong {
            field: "phone",
            max: MAX_PHONE_LEN,
            len,
        });
    }
    Ok(trimmed.to_string())
}

/// Accepts `local@domain.tld` addresses: a local part of letters, digits and
/// `+._%-`, and a domain of at least two dot-separated labels that start with
/// a letter or digit.
pub fn validate_email(value: &str) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    let invalid = || ValidationError::InvalidEmail(trimmed.to_string());

    let (local, domain) = trimmed.split_once('@').ok_or_else(invalid)?;
    if local.is_empty()
        || local.len() > 256
        || !local
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "+._%-".contains(c))
    {
        return Err(invalid());
    }

    let labels: Vec<&str> = domain.split('.').collect();
    if labels.len() < 2 {
        return Err(invalid());
    }
    for label in labels {
        let mut chars = label.chars();
        match chars.next() {
            Some(first) if first.is_ascii_alphanumeric() => {}
            _ => return Err(invalid()),
        }
        if label.len() > 65 || !chars.all(|c| c.is_ascii_alphanumeric() || c == '-') {
            return Err(invalid());
        }
    }
    Ok(trimmed.to_string())
}

/// Identifier of the signed-in account whose member collection is queried.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OwnerId(String);

impl OwnerId {
    pub fn new(id: impl Into<String>) -> Result<Self, ValidationError> {
        let id = id.into();
        let trimmed = id.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::EmptyField { field: "ownerId" });
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
