use chrono::{NaiveDate, Utc};
use gymtrack_core::status::summarize;
use gymtrack_core::{Config, CoreError, Member, MemberDb, MemberFeed, MemberStore, StatusSummary};
use serde::Serialize;
use std::time::Duration;

use super::{print_json, runtime, signed_in_owner, CliResult};

const WATCH_POLL_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Dashboard {
    date: NaiveDate,
    #[serde(flatten)]
    summary: StatusSummary,
}

impl Dashboard {
    fn today(members: &[Member]) -> Result<Self, CoreError> {
        let now = Utc::now();
        Ok(Self {
            date: now.date_naive(),
            summary: summarize(members, now)?,
        })
    }
}

pub fn run(watch: bool) -> CliResult {
    let config = Config::load()?;
    let owner = signed_in_owner(&config)?;

    if !watch {
        let db = MemberDb::open()?;
        let members = db.list(&owner)?;
        return print_json(&Dashboard::today(&members)?);
    }

    let path = MemberDb::default_path()?;
    runtime()?.block_on(async move {
        let mut feed = MemberFeed::spawn(path, owner, WATCH_POLL_INTERVAL);
        while let Some(snapshot) = feed.recv().await {
            match snapshot {
                Ok(members) => print_json(&Dashboard::today(&members)?)?,
                Err(e) => eprintln!("warning: {e}"),
            }
        }
        CliResult::Ok(())
    })
}
