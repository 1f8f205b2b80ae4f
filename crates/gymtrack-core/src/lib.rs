//! # GymTrack Core Library
//!
//! This library provides the core business logic for GymTrack, a membership
//! tracker for small gyms. All operations are available via the standalone
//! `gymtrack` CLI, which is a thin layer over this crate.
//!
//! ## Architecture
//!
//! - **Status engine**: Pure date arithmetic that turns a registration date and
//!   a plan duration into an expiration date, remaining days and a status
//! - **Storage**: SQLite-based member storage and TOML-based configuration
//! - **Scheduled check**: The daily reminder run, with its schedule and backoff
//! - **Feed**: Live member snapshots for dashboards
//!
//! ## Key Components
//!
//! - [`Status`]: Membership classification
//! - [`MemberStore`]: Per-owner member persistence, backed by [`MemberDb`]
//! - [`MembershipCheck`]: Decides whether to send the daily reminder
//! - [`Config`]: Application configuration management

pub mod check;
pub mod clock;
pub mod error;
pub mod feed;
pub mod member;
pub mod notify;
pub mod plan;
pub mod status;
pub mod storage;

pub use check::{CheckOutcome, DailySchedule, MembershipCheck, PreferenceStore, RetryPolicy};
pub use clock::{Clock, FixedClock, SystemClock};
pub use error::{ConfigError, CoreError, StoreError, ValidationError};
pub use feed::MemberFeed;
pub use member::{Member, MemberDraft, MemberPatch, NewMember, OwnerId};
pub use notify::{LogNotifier, Notifier, RecordingNotifier};
pub use plan::{Extension, MemberEdit, PlanChoice, PlanPreset, Registration};
pub use status::{NotifyCounts, Status, StatusFilter, StatusSummary};
pub use storage::{Config, InMemoryStore, MemberDb, MemberStore};
