mod config;
pub mod member_db;
pub mod memory;
pub mod migrations;

pub use config::{AccountConfig, Config, NotificationsConfig, RegistrationConfig, UiConfig};
pub use member_db::MemberDb;
pub use memory::InMemoryStore;

use std::path::PathBuf;

use crate::error::{ConfigError, StoreError};
use crate::member::{Member, MemberPatch, NewMember, OwnerId};

/// Access to the member collections of each owner.
///
/// Implementations validate records against the member schema on the way
/// in and on the way out, so everything returned can be handed straight to
/// the status engine.
pub trait MemberStore {
    /// Every member of `owner`, in insertion order.
    fn list(&self, owner: &OwnerId) -> Result<Vec<Member>, StoreError>;

    fn get(&self, owner: &OwnerId, id: &str) -> Result<Option<Member>, StoreError>;

    /// Store a new member and return its assigned id.
    ///
    /// # Errors
    /// [`StoreError::Rejected`] if the record breaks the member schema.
    /// Nothing is written in that case.
    fn create(&self, owner: &OwnerId, member: NewMember) -> Result<String, StoreError>;

    /// # Errors
    /// [`StoreError::NotFound`] if `id` does not belong to `owner`,
    /// [`StoreError::Rejected`] if the patched record breaks the member
    /// schema.
    fn update(&self, owner: &OwnerId, id: &str, patch: &MemberPatch) -> Result<(), StoreError>;

    /// # Errors
    /// [`StoreError::NotFound`] if `id` does not belong to `owner`.
    fn delete(&self, owner: &OwnerId, id: &str) -> Result<(), StoreError>;
}

/// Schema check for a record about to be written.
pub(crate) fn check_write(member: &Member) -> Result<(), StoreError> {
    member.check_schema().map_err(|message| StoreError::Rejected {
        id: member.id.clone(),
        message,
    })
}

/// Schema check for a record read back from storage.
pub(crate) fn check_read(member: Member) -> Result<Member, StoreError> {
    match member.check_schema() {
        Ok(()) => Ok(member),
        Err(message) => Err(StoreError::Corrupt {
            id: member.id,
            message,
        }),
    }
}

/// Returns the data directory, creating it if needed.
///
/// `GYMTRACK_DATA_DIR` wins when set. Otherwise `~/.config/gymtrack`, or
/// `~/.config/gymtrack-dev` when `GYMTRACK_ENV=dev`.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let dir = match std::env::var_os("GYMTRACK_DATA_DIR") {
        Some(explicit) if !explicit.is_empty() => PathBuf::from(explicit),
        _ => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");
            let env = std::env::var("GYMTRACK_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("gymtrack-dev")
            } else {
                base_dir.join("gymtrack")
            }
        }
    };

    std::fs::create_dir_all(&dir)
        .map_err(|e| ConfigError::DataDir(format!("{}: {e}", dir.display())))?;
    Ok(dir)
}
