use chrono::{NaiveDate, Utc};
use gymtrack_core::status::{describe, filter_by_date};
use gymtrack_core::{Config, MemberDb, MemberStore};

use super::{print_json, signed_in_owner, CliResult};

/// Members whose plan expires on `date` (default: today, UTC).
pub fn run(date: Option<NaiveDate>) -> CliResult {
    let config = Config::load()?;
    let owner = signed_in_owner(&config)?;
    let db = MemberDb::open()?;

    let now = Utc::now();
    let target = date.unwrap_or_else(|| now.date_naive());
    let members = db.list(&owner)?;
    print_json(&describe(filter_by_date(&members, target)?, now)?)
}
