//! SQLite-based member store.
//!
//! One `members` table holds every owner's collection; every statement is
//! scoped by `owner_id`. Timestamps are stored as RFC 3339 text.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::{Path, PathBuf};
use std::time::Duration;
use uuid::Uuid;

use super::{check_read, check_write, data_dir, migrations, MemberStore};
use crate::error::{CoreError, StoreError};
use crate::member::{Member, MemberPatch, NewMember, OwnerId};

const DB_FILE: &str = "gymtrack.db";

const SELECT_MEMBER: &str = "SELECT id, first_name, last_name, phone, plan_duration_days,
        registration_date, is_active
 FROM members";

/// Columns as stored, before schema validation.
struct MemberRow {
    id: String,
    first_name: String,
    last_name: String,
    phone: String,
    plan_duration_days: i64,
    registration_date: Option<String>,
    is_active: bool,
}

impl MemberRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            first_name: row.get(1)?,
            last_name: row.get(2)?,
            phone: row.get(3)?,
            plan_duration_days: row.get(4)?,
            registration_date: row.get(5)?,
            is_active: row.get(6)?,
        })
    }

    fn into_member(self) -> Result<Member, StoreError> {
        let corrupt = |message: String| StoreError::Corrupt {
            id: self.id.clone(),
            message,
        };

        let plan_duration_days = u32::try_from(self.plan_duration_days)
            .map_err(|_| corrupt(format!("planDurationDays out of range: {}", self.plan_duration_days)))?;

        let registration_date = match self.registration_date.as_deref() {
            None | Some("") => None,
            Some(raw) => Some(
                DateTime::parse_from_rfc3339(raw)
                    .map_err(|e| corrupt(format!("registrationDate '{raw}': {e}")))?
                    .with_timezone(&Utc),
            ),
        };

        let member = Member {
            id: self.id.clone(),
            first_name: self.first_name,
            last_name: self.last_name,
            phone: self.phone,
            plan_duration_days,
            registration_date,
            is_active: self.is_active,
        };
        check_read(member)
    }
}

/// SQLite database for member storage.
pub struct MemberDb {
    conn: Connection,
    path: Option<PathBuf>,
}

impl MemberDb {
    /// Get a reference to the underlying SQLite connection.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Location of the database file, `None` for in-memory stores.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Default database location inside [`data_dir`].
    pub fn default_path() -> Result<PathBuf, CoreError> {
        Ok(data_dir()?.join(DB_FILE))
    }

    /// Open the database at `<data_dir>/gymtrack.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the data directory is unusable or the database
    /// cannot be opened or migrated.
    pub fn open() -> Result<Self, CoreError> {
        let path = Self::default_path()?;
        Ok(Self::open_at(path)?)
    }

    /// Open (or create) a database file at `path`.
    pub fn open_at(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let conn = Connection::open(&path).map_err(|source| StoreError::OpenFailed {
            path: path.clone(),
            source,
        })?;
        conn.busy_timeout(Duration::from_secs(5))?;
        let db = Self {
            conn,
            path: Some(path),
        };
        db.migrate()?;
        tracing::debug!(path = ?db.path, "member store opened");
        Ok(db)
    }

    /// Open an in-memory database.
    pub fn open_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn, path: None };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<(), StoreError> {
        migrations::migrate(&self.conn).map_err(|e| StoreError::MigrationFailed(e.to_string()))
    }

    /// SQLite's `data_version`: changes whenever another connection commits.
    pub fn data_version(&self) -> Result<i64, StoreError> {
        Ok(self
            .conn
            .query_row("PRAGMA data_version", [], |row| row.get(0))?)
    }

    /// Number of members stored for `owner`.
    pub fn count(&self, owner: &OwnerId) -> Result<usize, StoreError> {
        let n: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM members WHERE owner_id = ?1",
            params![owner.as_str()],
            |row| row.get(0),
        )?;
        Ok(n as usize)
    }
}

impl MemberStore for MemberDb {
    fn list(&self, owner: &OwnerId) -> Result<Vec<Member>, StoreError> {
        let mut stmt = self
            .conn
            .prepare(&format!("{SELECT_MEMBER} WHERE owner_id = ?1 ORDER BY rowid"))?;
        let rows = stmt.query_map(params![owner.as_str()], MemberRow::from_row)?;

        let mut members = Vec::new();
        for row in rows {
            members.push(row?.into_member()?);
        }
        Ok(members)
    }

    fn get(&self, owner: &OwnerId, id: &str) -> Result<Option<Member>, StoreError> {
        let row = self
            .conn
            .query_row(
                &format!("{SELECT_MEMBER} WHERE owner_id = ?1 AND id = ?2"),
                params![owner.as_str(), id],
                MemberRow::from_row,
            )
            .optional()?;
        row.map(MemberRow::into_member).transpose()
    }

    fn create(&self, owner: &OwnerId, member: NewMember) -> Result<String, StoreError> {
        let member = member.with_id(Uuid::new_v4().to_string());
        check_write(&member)?;
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO members (owner_id, id, first_name, last_name, phone,
                 plan_duration_days, registration_date, is_active, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)",
            params![
                owner.as_str(),
                member.id,
                member.first_name,
                member.last_name,
                member.phone,
                member.plan_duration_days,
                member.registration_date.map(|d| d.to_rfc3339()),
                member.is_active,
                now,
            ],
        )?;
        tracing::info!(owner = %owner, member_id = %member.id, "member created");
        Ok(member.id)
    }

    fn update(&self, owner: &OwnerId, id: &str, patch: &MemberPatch) -> Result<(), StoreError> {
        let tx = self.conn.unchecked_transaction()?;
        let mut updated = self
            .get(owner, id)?
            .ok_or_else(|| StoreError::NotFound { id: id.to_string() })?;
        patch.apply_to(&mut updated);
        check_write(&updated)?;

        let changed = tx.execute(
            "UPDATE members
             SET first_name = COALESCE(?3, first_name),
                 last_name = COALESCE(?4, last_name),
                 phone = COALESCE(?5, phone),
                 plan_duration_days = COALESCE(?6, plan_duration_days),
                 registration_date = COALESCE(?7, registration_date),
                 is_active = COALESCE(?8, is_active),
                 updated_at = ?9
             WHERE owner_id = ?1 AND id = ?2",
            params![
                owner.as_str(),
                id,
                patch.first_name,
                patch.last_name,
                patch.phone,
                patch.plan_duration_days,
                patch.registration_date.map(|d| d.to_rfc3339()),
                patch.is_active,
                Utc::now().to_rfc3339(),
            ],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound { id: id.to_string() });
        }
        tx.commit()?;
        tracing::info!(owner = %owner, member_id = %id, "member updated");
        Ok(())
    }

    fn delete(&self, owner: &OwnerId, id: &str) -> Result<(), StoreError> {
        let changed = self.conn.execute(
            "DELETE FROM members WHERE owner_id = ?1 AND id = ?2",
            params![owner.as_str(), id],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound { id: id.to_string() });
        }
        tracing::info!(owner = %owner, member_id = %id, "member deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::member::MAX_PLAN_DURATION_DAYS;
    use chrono::TimeZone;

    fn owner(name: &str) -> OwnerId {
        OwnerId::new(name).unwrap()
    }

    fn new_member(first: &str) -> NewMember {
        NewMember {
            first_name: first.to_string(),
            last_name: "Ruiz".to_string(),
            phone: "5512345678".to_string(),
            plan_duration_days: 30,
            registration_date: Some(Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap()),
            is_active: true,
        }
    }

    #[test]
    fn create_and_get() {
        let db = MemberDb::open_memory().unwrap();
        let alice = owner("alice");
        let id = db.create(&alice, new_member("Ana")).unwrap();

        let member = db.get(&alice, &id).unwrap().unwrap();
        assert_eq!(member.id, id);
        assert_eq!(member.first_name, "Ana");
        assert_eq!(member.plan_duration_days, 30);
        assert_eq!(
            member.registration_date,
            Some(Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap())
        );
        assert!(member.is_active);
    }

    #[test]
    fn list_preserves_insertion_order() {
        let db = MemberDb::open_memory().unwrap();
        let alice = owner("alice");
        for name in ["Ana", "Bruno", "Carla"] {
            db.create(&alice, new_member(name)).unwrap();
        }
        let names: Vec<String> = db
            .list(&alice)
            .unwrap()
            .into_iter()
            .map(|m| m.first_name)
            .collect();
        assert_eq!(names, vec!["Ana", "Bruno", "Carla"]);
        assert_eq!(db.count(&alice).unwrap(), 3);
    }

    #[test]
    fn owners_are_isolated() {
        let db = MemberDb::open_memory().unwrap();
        let alice = owner("alice");
        let bob = owner("bob");
        let id = db.create(&alice, new_member("Ana")).unwrap();

        assert!(db.list(&bob).unwrap().is_empty());
        assert!(db.get(&bob, &id).unwrap().is_none());
        assert!(matches!(
            db.delete(&bob, &id),
            Err(StoreError::NotFound { .. })
        ));
        assert_eq!(db.list(&alice).unwrap().len(), 1);
    }

    #[test]
    fn update_applies_patch() {
        let db = MemberDb::open_memory().unwrap();
        let alice = owner("alice");
        let id = db.create(&alice, new_member("Ana")).unwrap();

        let reset = Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap();
        let patch = MemberPatch {
            last_name: Some("Paz".to_string()),
            plan_duration_days: Some(60),
            registration_date: Some(reset),
            ..Default::default()
        };
        db.update(&alice, &id, &patch).unwrap();

        let member = db.get(&alice, &id).unwrap().unwrap();
        assert_eq!(member.first_name, "Ana");
        assert_eq!(member.last_name, "Paz");
        assert_eq!(member.plan_duration_days, 60);
        assert_eq!(member.registration_date, Some(reset));
    }

    #[test]
    fn update_unknown_member_is_not_found() {
        let db = MemberDb::open_memory().unwrap();
        let result = db.update(&owner("alice"), "missing", &MemberPatch::default());
        assert!(matches!(result, Err(StoreError::NotFound { id }) if id == "missing"));
    }

    #[test]
    fn delete_removes_member() {
        let db = MemberDb::open_memory().unwrap();
        let alice = owner("alice");
        let id = db.create(&alice, new_member("Ana")).unwrap();
        db.delete(&alice, &id).unwrap();
        assert!(db.get(&alice, &id).unwrap().is_none());
    }

    #[test]
    fn null_registration_date_round_trips() {
        let db = MemberDb::open_memory().unwrap();
        let alice = owner("alice");
        let mut m = new_member("Ana");
        m.registration_date = None;
        let id = db.create(&alice, m).unwrap();
        assert!(db.get(&alice, &id).unwrap().unwrap().registration_date.is_none());
    }

    #[test]
    fn writes_breaking_the_schema_are_refused() {
        let db = MemberDb::open_memory().unwrap();
        let alice = owner("alice");

        for days in [0, MAX_PLAN_DURATION_DAYS + 1] {
            let member = NewMember {
                plan_duration_days: days,
                ..new_member("Ana")
            };
            match db.create(&alice, member) {
                Err(StoreError::Rejected { message, .. }) => {
                    assert!(message.contains("planDurationDays"), "{message}");
                }
                other => panic!("expected a rejected write, got {other:?}"),
            }
        }
        assert_eq!(db.count(&alice).unwrap(), 0);

        let id = db.create(&alice, new_member("Bruno")).unwrap();
        for days in [0, MAX_PLAN_DURATION_DAYS + 1] {
            let patch = MemberPatch {
                last_name: Some("Paz".to_string()),
                plan_duration_days: Some(days),
                ..Default::default()
            };
            assert!(matches!(
                db.update(&alice, &id, &patch),
                Err(StoreError::Rejected { id: rejected, .. }) if rejected == id
            ));
        }

        let members = db.list(&alice).unwrap();
        assert_eq!(members.len(), 1);
        assert_eq!(members[0].last_name, "Ruiz");
        assert_eq!(members[0].plan_duration_days, 30);
    }

    #[test]
    fn update_accepts_the_longest_plan() {
        let db = MemberDb::open_memory().unwrap();
        let alice = owner("alice");
        let id = db.create(&alice, new_member("Ana")).unwrap();
        let patch = MemberPatch {
            plan_duration_days: Some(MAX_PLAN_DURATION_DAYS),
            ..Default::default()
        };
        db.update(&alice, &id, &patch).unwrap();
        assert_eq!(
            db.get(&alice, &id).unwrap().unwrap().plan_duration_days,
            MAX_PLAN_DURATION_DAYS
        );
    }

    #[test]
    fn corrupt_rows_are_reported() {
        let db = MemberDb::open_memory().unwrap();
        db.conn()
            .execute(
                "INSERT INTO members (owner_id, id, first_name, last_name, phone,
                     plan_duration_days, registration_date)
                 VALUES ('alice', 'bad', 'Ana', 'Ruiz', '5512345678', 0, 'yesterday')",
                [],
            )
            .unwrap();
        let result = db.list(&owner("alice"));
        assert!(matches!(result, Err(StoreError::Corrupt { id, .. }) if id == "bad"));
    }
}
