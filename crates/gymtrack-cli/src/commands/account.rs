use clap::Subcommand;
use gymtrack_core::member::validate_email;
use gymtrack_core::Config;
use serde::Serialize;

use super::{print_json, CliResult};

#[derive(Subcommand)]
pub enum AccountAction {
    /// Sign in as the gym owner with this email
    Use {
        /// Owner email address
        email: String,
    },
    /// Show the signed-in owner
    Show,
    /// Sign out
    Logout,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AccountView<'a> {
    owner_id: Option<&'a str>,
}

pub fn run(action: AccountAction) -> CliResult {
    let mut config = Config::load()?;
    match action {
        AccountAction::Use { email } => {
            let email = validate_email(&email)?;
            config.account.owner_id = Some(email);
            config.save()?;
        }
        AccountAction::Show => {}
        AccountAction::Logout => {
            config.account.owner_id = None;
            config.save()?;
        }
    }
    print_json(&AccountView {
        owner_id: config.account.owner_id.as_deref(),
    })
}
