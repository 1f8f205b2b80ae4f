//! Member management commands for CLI.

use chrono::{NaiveDate, Utc};
use clap::Subcommand;
use gymtrack_core::plan::ExpirationChange;
use gymtrack_core::status::{describe, filter_and_sort, MemberStatusView};
use gymtrack_core::{
    Config, Extension, MemberDb, MemberDraft, MemberEdit, MemberStore, PlanChoice, PlanPreset,
    Registration, StatusFilter, StoreError,
};

use super::{print_json, signed_in_owner, CliResult};

#[derive(Subcommand)]
pub enum MemberAction {
    /// Register a new member
    Add {
        first_name: String,
        last_name: String,
        /// Phone number, digits only
        phone: String,
        /// Plan length: one-month, three-months, six-months or one-year
        /// (default: registration.default_plan)
        #[arg(long, conflicts_with = "until")]
        plan: Option<PlanPreset>,
        /// Explicit expiration date (YYYY-MM-DD)
        #[arg(long)]
        until: Option<NaiveDate>,
    },
    /// Edit a member
    Edit {
        /// Member ID
        id: String,
        /// New first name
        #[arg(long)]
        first: Option<String>,
        /// New last name
        #[arg(long)]
        last: Option<String>,
        /// New phone number
        #[arg(long)]
        phone: Option<String>,
        /// New expiration date (YYYY-MM-DD)
        #[arg(long, conflicts_with = "extend")]
        until: Option<NaiveDate>,
        /// Extend the current expiration by a month or a year
        #[arg(long)]
        extend: Option<Extension>,
    },
    /// Delete a member
    Delete {
        /// Member ID
        id: String,
    },
    /// Get member details
    Get {
        /// Member ID
        id: String,
    },
    /// List members, most urgent first
    List {
        /// Case-insensitive name search
        #[arg(long, default_value = "")]
        search: String,
        /// Status tab: all, active, expiring-soon or expired
        #[arg(long, default_value_t = StatusFilter::All)]
        status: StatusFilter,
    },
}

pub fn run(action: MemberAction) -> CliResult {
    let config = Config::load()?;
    let owner = signed_in_owner(&config)?;
    let db = MemberDb::open()?;
    let now = Utc::now();

    match action {
        MemberAction::Add {
            first_name,
            last_name,
            phone,
            plan,
            until,
        } => {
            let plan = match (until, plan) {
                (Some(date), _) => PlanChoice::Until(date),
                (None, Some(preset)) => PlanChoice::Preset(preset),
                (None, None) => PlanChoice::Preset(config.registration.default_plan),
            };
            let new_member =
                Registration::new(MemberDraft::new(first_name, last_name, phone), plan).build(now)?;
            let id = db.create(&owner, new_member)?;
            let member = db.get(&owner, &id)?.ok_or(StoreError::NotFound { id })?;
            print_json(&MemberStatusView::new(&member, now)?)?;
        }
        MemberAction::Edit {
            id,
            first,
            last,
            phone,
            until,
            extend,
        } => {
            let current = db
                .get(&owner, &id)?
                .ok_or_else(|| StoreError::NotFound { id: id.clone() })?;
            let expiration = match (until, extend) {
                (Some(date), _) => Some(ExpirationChange::Until(date)),
                (None, Some(ext)) => Some(ExpirationChange::Extend(ext)),
                (None, None) => None,
            };
            let patch = MemberEdit {
                first_name: first,
                last_name: last,
                phone,
                expiration,
            }
            .into_patch(&current, now)?;

            if !patch.is_empty() {
                db.update(&owner, &id, &patch)?;
            }
            let member = db.get(&owner, &id)?.ok_or(StoreError::NotFound { id })?;
            print_json(&MemberStatusView::new(&member, now)?)?;
        }
        MemberAction::Delete { id } => {
            db.delete(&owner, &id)?;
            print_json(&serde_json::json!({ "deleted": id }))?;
        }
        MemberAction::Get { id } => {
            let member = db.get(&owner, &id)?.ok_or(StoreError::NotFound { id })?;
            print_json(&MemberStatusView::new(&member, now)?)?;
        }
        MemberAction::List { search, status } => {
            let members = db.list(&owner)?;
            let listed = filter_and_sort(&members, &search, status, now)?;
            print_json(&describe(listed, now)?)?;
        }
    }
    Ok(())
}
