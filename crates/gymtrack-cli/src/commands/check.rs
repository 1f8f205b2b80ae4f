//! Scheduled membership check commands for CLI.

use chrono::Local;
use clap::Subcommand;
use gymtrack_core::{
    CheckOutcome, Config, CoreError, DailySchedule, MemberDb, MembershipCheck, Notifier,
    RetryPolicy, SystemClock,
};

use super::{print_json, runtime, CliResult};

#[derive(Subcommand)]
pub enum CheckAction {
    /// Run the check once now
    Run,
    /// Run the check every day at notifications.hour:notifications.minute
    Daemon,
}

/// Shows reminders on the terminal. Stdout stays reserved for JSON.
struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&self, title: &str, body: &str) {
        eprintln!("{title}: {body}");
    }
}

fn run_once() -> Result<CheckOutcome, CoreError> {
    let config = Config::load()?;
    let db = MemberDb::open()?;
    MembershipCheck::new(&db, &SystemClock, &ConsoleNotifier, &config).run(config.owner().as_ref())
}

pub fn run(action: CheckAction) -> CliResult {
    match action {
        CheckAction::Run => print_json(&run_once()?),
        CheckAction::Daemon => daemon(),
    }
}

fn daemon() -> CliResult {
    let config = Config::load()?;
    let schedule = DailySchedule::new(config.notifications.hour, config.notifications.minute)?;
    let retry = RetryPolicy::default();

    runtime()?.block_on(run_daemon(schedule, retry))
}

async fn run_daemon(schedule: DailySchedule, retry: RetryPolicy) -> CliResult {
    let mut failures: u32 = 0;
    let mut delay = schedule.delay_until_next(&Local::now());
    loop {
        tracing::info!(delay_secs = delay.as_secs(), "next membership check scheduled");
        tokio::time::sleep(delay).await;

        match run_once() {
            Ok(outcome) => {
                failures = 0;
                print_json(&outcome)?;
                delay = schedule.delay_until_next(&Local::now());
            }
            Err(e) => {
                delay = retry.delay_for(failures);
                failures = failures.saturating_add(1);
                tracing::warn!(error = %e, attempt = failures, "membership check failed, retrying");
            }
        }
    }
}
