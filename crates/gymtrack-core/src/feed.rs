//! Live member snapshots from a SQLite store.
//!
//! The feed owns its own connection and polls `PRAGMA data_version`, which
//! moves whenever another connection commits. Every change produces a full
//! snapshot of the owner's collection; consumers re-run the status views on
//! each one.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;

use crate::error::StoreError;
use crate::member::{Member, OwnerId};
use crate::storage::{MemberDb, MemberStore};

/// One delivery of the feed.
pub type Snapshot = Result<Vec<Member>, StoreError>;

const CHANNEL_CAPACITY: usize = 8;

/// Polling subscription over a member database file.
pub struct MemberFeed;

impl MemberFeed {
    /// Start watching `owner`'s members in the database at `path`.
    ///
    /// The first snapshot is sent straight away. Read errors are sent down
    /// the channel and polling continues; failing to open the database ends
    /// the feed after reporting the error. Dropping the receiver stops the
    /// task. Must be called from within a tokio runtime.
    ///
    /// SQLite calls run on the blocking pool, so a busy or locked database
    /// never stalls the runtime's worker threads.
    pub fn spawn(
        path: impl Into<PathBuf>,
        owner: OwnerId,
        poll_interval: Duration,
    ) -> mpsc::Receiver<Snapshot> {
        let path = path.into();
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);

        tokio::spawn(async move {
            let db = match blocking(move || MemberDb::open_at(path)).await {
                Ok(db) => Arc::new(Mutex::new(db)),
                Err(e) => {
                    tracing::warn!(error = %e, "member feed could not open store");
                    let _ = tx.send(Err(e)).await;
                    return;
                }
            };

            let mut ticker = tokio::time::interval(poll_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut last_version: Option<i64> = None;

            loop {
                ticker.tick().await;
                if tx.is_closed() {
                    break;
                }

                let polled = {
                    let db = Arc::clone(&db);
                    let owner = owner.clone();
                    blocking(move || poll_changes(&db, &owner, last_version)).await
                };
                let snapshot = match polled {
                    Ok(None) => continue,
                    Ok(Some((version, members))) => {
                        last_version = Some(version);
                        tracing::debug!(owner = %owner, count = members.len(), "member feed snapshot");
                        Ok(members)
                    }
                    Err(e) => {
                        tracing::warn!(owner = %owner, error = %e, "member feed poll failed");
                        Err(e)
                    }
                };
                if tx.send(snapshot).await.is_err() {
                    break;
                }
            }
            tracing::debug!(owner = %owner, "member feed stopped");
        });

        rx
    }
}

/// Run a store call on tokio's blocking pool.
async fn blocking<T, F>(f: F) -> Result<T, StoreError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, StoreError> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| StoreError::Unavailable(format!("member feed worker failed: {e}")))?
}

/// The owner's members with the new `data_version`, or `None` when nothing
/// was committed since `last_version`.
fn poll_changes(
    db: &Mutex<MemberDb>,
    owner: &OwnerId,
    last_version: Option<i64>,
) -> Result<Option<(i64, Vec<Member>)>, StoreError> {
    let db = db
        .lock()
        .map_err(|_| StoreError::Unavailable("member feed lock poisoned".to_string()))?;
    let version = db.data_version()?;
    if last_version == Some(version) {
        return Ok(None);
    }
    db.list(owner).map(|members| Some((version, members)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn unopenable_path_reports_and_closes() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing").join("gymtrack.db");
        let owner = OwnerId::new("coach@gym.com").unwrap();

        let mut rx = MemberFeed::spawn(path, owner, Duration::from_millis(10));
        assert!(matches!(rx.recv().await, Some(Err(StoreError::OpenFailed { .. }))));
        assert!(rx.recv().await.is_none());
    }

    #[test]
    fn unchanged_version_skips_the_read() {
        let db = Mutex::new(MemberDb::open_memory().unwrap());
        let owner = OwnerId::new("coach@gym.com").unwrap();

        let (version, members) = poll_changes(&db, &owner, None).unwrap().unwrap();
        assert!(members.is_empty());
        assert!(poll_changes(&db, &owner, Some(version)).unwrap().is_none());
    }
}
