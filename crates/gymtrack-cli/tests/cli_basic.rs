//! Basic CLI E2E tests.
//!
//! Tests invoke the built `gymtrack` binary against a throwaway data
//! directory and verify outputs.

use chrono::{Days, Months, NaiveDate, Utc};
use serde_json::Value;
use std::process::Command;
use tempfile::TempDir;

/// A `gymtrack` installation with its own data directory.
struct Gym {
    dir: TempDir,
}

impl Gym {
    fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
        }
    }

    fn signed_in() -> Self {
        let gym = Self::new();
        gym.run_success(&["account", "use", "coach@gym.com"]);
        gym
    }

    /// Run a CLI command and return (stdout, stderr, exit code).
    fn run(&self, args: &[&str]) -> (String, String, i32) {
        let output = Command::new(env!("CARGO_BIN_EXE_gymtrack"))
            .args(args)
            .env("GYMTRACK_DATA_DIR", self.dir.path())
            .env_remove("RUST_LOG")
            .output()
            .expect("Failed to execute CLI command");

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();
        let code = output.status.code().unwrap_or(-1);

        (stdout, stderr, code)
    }

    fn run_success(&self, args: &[&str]) -> String {
        let (stdout, stderr, code) = self.run(args);
        assert_eq!(code, 0, "CLI command failed: {args:?}\n{stderr}");
        stdout
    }

    fn run_json(&self, args: &[&str]) -> Value {
        let stdout = self.run_success(args);
        serde_json::from_str(&stdout).expect("Failed to parse JSON output")
    }

    /// Run a CLI command that must fail and return its stderr.
    fn run_failure(&self, args: &[&str]) -> String {
        let (_, stderr, code) = self.run(args);
        assert_eq!(code, 1, "CLI command unexpectedly succeeded: {args:?}");
        stderr
    }

    fn add_until(&self, first: &str, until: NaiveDate) -> Value {
        self.run_json(&[
            "member",
            "add",
            first,
            "Ruiz",
            "5512345678",
            "--until",
            &until.to_string(),
        ])
    }
}

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

fn in_days(n: u64) -> NaiveDate {
    today().checked_add_days(Days::new(n)).unwrap()
}

#[test]
fn test_member_commands_require_account() {
    let gym = Gym::new();
    let stderr = gym.run_failure(&["member", "list"]);
    assert!(stderr.contains("Not authenticated"), "stderr: {stderr}");
}

#[test]
fn test_account_use_show_logout() {
    let gym = Gym::new();
    let stderr = gym.run_failure(&["account", "use", "not-an-email"]);
    assert!(stderr.contains("invalid email"), "stderr: {stderr}");

    let account = gym.run_json(&["account", "use", "coach@gym.com"]);
    assert_eq!(account["ownerId"], "coach@gym.com");
    assert_eq!(gym.run_json(&["account", "show"])["ownerId"], "coach@gym.com");

    let account = gym.run_json(&["account", "logout"]);
    assert!(account["ownerId"].is_null());
}

#[test]
fn test_member_add_with_until() {
    let gym = Gym::signed_in();
    let member = gym.add_until("Ana", in_days(3));

    assert_eq!(member["firstName"], "Ana");
    assert_eq!(member["planDurationDays"], 3);
    assert_eq!(member["remainingDays"], 3);
    assert_eq!(member["status"], "EXPIRING_SOON");
    assert_eq!(member["expirationDate"], in_days(3).to_string());
    assert!(member["id"].as_str().is_some_and(|id| !id.is_empty()));
}

#[test]
fn test_member_add_default_plan_is_one_month() {
    let gym = Gym::signed_in();
    let member = gym.run_json(&["member", "add", "Ana", "Ruiz", "5512345678"]);

    let expected = today().checked_add_months(Months::new(1)).unwrap();
    assert_eq!(member["expirationDate"], expected.to_string());
    assert_eq!(member["status"], "ACTIVE");
}

#[test]
fn test_member_add_past_date_gets_one_day() {
    let gym = Gym::signed_in();
    let member = gym.run_json(&[
        "member", "add", "Ana", "Ruiz", "5512345678", "--until", "2020-01-01",
    ]);
    assert_eq!(member["planDurationDays"], 1);
    assert_eq!(member["remainingDays"], 1);
}

#[test]
fn test_member_add_rejects_invalid_input() {
    let gym = Gym::signed_in();
    let stderr = gym.run_failure(&["member", "add", "Ana", "Ruiz", "123"]);
    assert!(stderr.contains("phone"), "stderr: {stderr}");

    let stderr = gym.run_failure(&["member", "add", "Ana3", "Ruiz", "5512345678"]);
    assert!(stderr.contains("firstName"), "stderr: {stderr}");

    assert_eq!(gym.run_json(&["member", "list"]), Value::Array(vec![]));
}

#[test]
fn test_member_list_sorts_and_filters() {
    let gym = Gym::signed_in();
    gym.add_until("Ana", in_days(40));
    gym.add_until("Bruno", in_days(2));
    gym.run_json(&["member", "add", "Carla", "Paz", "5512345678", "--until", "2020-01-01"]);

    let list = gym.run_json(&["member", "list"]);
    let names: Vec<&str> = list
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["firstName"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Carla", "Bruno", "Ana"]);

    let active = gym.run_json(&["member", "list", "--status", "active"]);
    assert_eq!(active.as_array().unwrap().len(), 1);
    assert_eq!(active[0]["firstName"], "Ana");

    let searched = gym.run_json(&["member", "list", "--search", "PAZ"]);
    assert_eq!(searched.as_array().unwrap().len(), 1);
    assert_eq!(searched[0]["firstName"], "Carla");
}

#[test]
fn test_member_edit_extend_month() {
    let gym = Gym::signed_in();
    let member = gym.add_until("Ana", in_days(3));
    let id = member["id"].as_str().unwrap();

    let edited = gym.run_json(&["member", "edit", id, "--extend", "month", "--last", "Paz"]);
    let expected = in_days(3).checked_add_months(Months::new(1)).unwrap();
    assert_eq!(edited["lastName"], "Paz");
    assert_eq!(edited["expirationDate"], expected.to_string());
    assert_eq!(
        edited["registrationDate"],
        format!("{}T00:00:00Z", today())
    );
    assert_eq!(edited["status"], "ACTIVE");
}

#[test]
fn test_member_delete_then_get_fails() {
    let gym = Gym::signed_in();
    let member = gym.add_until("Ana", in_days(3));
    let id = member["id"].as_str().unwrap();

    assert_eq!(gym.run_json(&["member", "get", id])["firstName"], "Ana");
    assert_eq!(gym.run_json(&["member", "delete", id])["deleted"], id);

    let stderr = gym.run_failure(&["member", "get", id]);
    assert!(stderr.contains("not found"), "stderr: {stderr}");
    gym.run_failure(&["member", "delete", id]);
}

#[test]
fn test_calendar_and_dashboard() {
    let gym = Gym::signed_in();
    gym.add_until("Ana", in_days(40));
    gym.add_until("Bruno", in_days(2));
    gym.add_until("Carla", in_days(2));

    let day = gym.run_json(&["calendar", &in_days(2).to_string()]);
    assert_eq!(day.as_array().unwrap().len(), 2);
    assert!(gym.run_json(&["calendar"]).as_array().unwrap().is_empty());

    let dashboard = gym.run_json(&["dashboard"]);
    assert_eq!(dashboard["active"], 1);
    assert_eq!(dashboard["expiringSoon"], 2);
    assert_eq!(dashboard["expired"], 0);
    assert_eq!(dashboard["total"], 3);
    assert_eq!(dashboard["date"], today().to_string());
}

#[test]
fn test_check_run_notifies() {
    let gym = Gym::signed_in();
    gym.add_until("Ana", in_days(2));
    gym.add_until("Bruno", in_days(40));

    let (stdout, stderr, code) = gym.run(&["check", "run"]);
    assert_eq!(code, 0, "stderr: {stderr}");
    let outcome: Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(outcome["outcome"], "notified");
    assert_eq!(outcome["expiringSoon"], 1);
    assert_eq!(outcome["expired"], 0);
    assert!(stderr.contains("Membership summary"), "stderr: {stderr}");
    assert!(stderr.contains("Today you have 1 memberships expiring soon and 0 expired."));
}

#[test]
fn test_check_run_respects_preference_and_account() {
    let gym = Gym::new();
    let stderr = gym.run_failure(&["check", "run"]);
    assert!(stderr.contains("Not authenticated"), "stderr: {stderr}");

    gym.run_success(&["config", "set", "notifications.enabled", "false"]);
    assert_eq!(gym.run_json(&["check", "run"])["outcome"], "disabled");

    gym.run_success(&["config", "set", "notifications.enabled", "true"]);
    gym.run_success(&["account", "use", "coach@gym.com"]);
    assert_eq!(gym.run_json(&["check", "run"])["outcome"], "quiet");
}

#[test]
fn test_config_get_set() {
    let gym = Gym::new();
    assert_eq!(gym.run_success(&["config", "get", "notifications.hour"]).trim(), "9");

    gym.run_success(&["config", "set", "notifications.hour", "7"]);
    assert_eq!(gym.run_success(&["config", "get", "notifications.hour"]).trim(), "7");

    gym.run_failure(&["config", "set", "notifications.hour", "31"]);
    gym.run_failure(&["config", "get", "no.such.key"]);

    let list = gym.run_json(&["config", "list"]);
    assert_eq!(list["registration"]["default_plan"], "one_month");

    gym.run_success(&["config", "reset"]);
    assert_eq!(gym.run_success(&["config", "get", "notifications.hour"]).trim(), "9");
}
