use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser)]
#[command(name = "gymtrack", version, about = "GymTrack membership CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Member registration and management
    Member {
        #[command(subcommand)]
        action: commands::member::MemberAction,
    },
    /// Membership counts per status
    Dashboard {
        /// Keep running and reprint on every change
        #[arg(long)]
        watch: bool,
    },
    /// Members whose plan expires on a given day
    Calendar {
        /// Day to show (YYYY-MM-DD, default: today)
        date: Option<NaiveDate>,
    },
    /// Daily expiration reminder
    Check {
        #[command(subcommand)]
        action: commands::check::CheckAction,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
    /// Signed-in gym owner account
    Account {
        #[command(subcommand)]
        action: commands::account::AccountAction,
    },
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn,gymtrack_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing();

    let result = match cli.command {
        Commands::Member { action } => commands::member::run(action),
        Commands::Dashboard { watch } => commands::dashboard::run(watch),
        Commands::Calendar { date } => commands::calendar::run(date),
        Commands::Check { action } => commands::check::run(action),
        Commands::Config { action } => commands::config::run(action),
        Commands::Account { action } => commands::account::run(action),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
