//! Key-value persistence.
//!
//! The store holds three whole records: the user list, the booking list and
//! the active session. Callers read a full record, change it in memory and
//! write it back; nothing is cached between operations, so the last write
//! to a key wins.

use crate::model::{Booking, Session, User};
use anyhow::{anyhow, Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::rc::Rc;

pub const USERS_KEY: &str = "tb_users_v1";
pub const BOOKINGS_KEY: &str = "tb_bookings_v1";
pub const SESSION_KEY: &str = "tb_session_v1";

/// Flat record store keyed by name
pub trait Store {
    fn get(&self, key: &str) -> Result<Option<Value>>;
    fn set(&self, key: &str, value: Value) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
    /// Human-readable location, for `/session` and debug output
    fn describe(&self) -> String;
}

/// Process-local store; contents vanish on exit
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RefCell<Map<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Store for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.records.borrow().get(key).cloned())
    }

    fn set(&self, key: &str, value: Value) -> Result<()> {
        self.records.borrow_mut().insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.records.borrow_mut().remove(key);
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}

/// Store backed by a single JSON object on disk.
///
/// Every read goes to the file and every write replaces it, so several
/// processes sharing the file see each other's changes between commands.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("failed to create store directory {}", parent.display())
                })?;
            }
        }
        Ok(Self {
            path: path.to_path_buf(),
        })
    }

    fn read_all(&self) -> Result<Map<String, Value>> {
        if !self.path.exists() {
            return Ok(Map::new());
        }

        let content = std::fs::read_to_string(&self.path)
            .with_context(|| format!("failed to read store {}", self.path.display()))?;
        if content.trim().is_empty() {
            return Ok(Map::new());
        }

        let value: Value = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse store {}", self.path.display()))?;
        match value {
            Value::Object(map) => Ok(map),
            _ => Err(anyhow!(
                "store {} is not a JSON object",
                self.path.display()
            )),
        }
    }

    fn write_all(&self, records: &Map<String, Value>) -> Result<()> {
        let content = serde_json::to_string_pretty(records)?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, content)
            .with_context(|| format!("failed to write {}", tmp.display()))?;
        std::fs::rename(&tmp, &self.path)
            .with_context(|| format!("failed to replace store {}", self.path.display()))?;
        Ok(())
    }
}

impl Store for FileStore {
    fn get(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.read_all()?.remove(key))
    }

    fn set(&self, key: &str, value: Value) -> Result<()> {
        let mut records = self.read_all()?;
        records.insert(key.to_string(), value);
        self.write_all(&records)
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut records = self.read_all()?;
        if records.remove(key).is_some() {
            self.write_all(&records)?;
        }
        Ok(())
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// Typed access to the three records
#[derive(Clone)]
pub struct Records {
    store: Rc<dyn Store>,
}

impl Records {
    pub fn new(store: Rc<dyn Store>) -> Self {
        Self { store }
    }

    pub fn describe(&self) -> String {
        self.store.describe()
    }

    pub fn users(&self) -> Result<Vec<User>> {
        self.read_list(USERS_KEY)
    }

    pub fn save_users(&self, users: &[User]) -> Result<()> {
        self.write(USERS_KEY, users)
    }

    pub fn bookings(&self) -> Result<Vec<Booking>> {
        self.read_list(BOOKINGS_KEY)
    }

    pub fn save_bookings(&self, bookings: &[Booking]) -> Result<()> {
        self.write(BOOKINGS_KEY, bookings)
    }

    pub fn session(&self) -> Result<Option<Session>> {
        match self.store.get(SESSION_KEY)? {
            None | Some(Value::Null) => Ok(None),
            Some(value) => Ok(Some(
                serde_json::from_value(value).context("malformed session record")?,
            )),
        }
    }

    pub fn set_session(&self, session: &Session) -> Result<()> {
        self.write(SESSION_KEY, session)
    }

    pub fn clear_session(&self) -> Result<()> {
        self.store.remove(SESSION_KEY)
    }

    fn read_list<T: DeserializeOwned>(&self, key: &str) -> Result<Vec<T>> {
        match self.store.get(key)? {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(value) => {
                serde_json::from_value(value).with_context(|| format!("malformed record {}", key))
            }
        }
    }

    fn write<T: Serialize + ?Sized>(&self, key: &str, record: &T) -> Result<()> {
        self.store.set(key, serde_json::to_value(record)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BookingStatus, Role};
    use chrono::Utc;
    use tempfile::TempDir;

    fn sample_user() -> User {
        User {
            id: "stu-1".to_string(),
            role: Role::Student,
            email: "student@demo.com".to_string(),
            password: "123456".to_string(),
            name: "Demo Student".to_string(),
            subject: None,
        }
    }

    fn sample_booking() -> Booking {
        Booking {
            id: "bk-1".to_string(),
            teacher_id: "t-1".to_string(),
            teacher_name: "Alice Johnson".to_string(),
            teacher_subject: "Mathematics".to_string(),
            student_email: "student@demo.com".to_string(),
            student_name: "Demo Student".to_string(),
            date: "2024-06-01".to_string(),
            time: "09:00".to_string(),
            notes: String::new(),
            status: BookingStatus::Booked,
        }
    }

    #[test]
    fn test_missing_records_read_empty() {
        let records = Records::new(Rc::new(MemoryStore::new()));
        assert!(records.users().unwrap().is_empty());
        assert!(records.bookings().unwrap().is_empty());
        assert!(records.session().unwrap().is_none());
    }

    #[test]
    fn test_session_set_and_clear() {
        let records = Records::new(Rc::new(MemoryStore::new()));
        let session = Session::for_user(&sample_user(), Utc::now());
        records.set_session(&session).unwrap();
        assert_eq!(records.session().unwrap(), Some(session));

        records.clear_session().unwrap();
        assert!(records.session().unwrap().is_none());
    }

    #[test]
    fn test_file_store_persists_across_instances() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("store.json");

        let first = Records::new(Rc::new(FileStore::open(&path).unwrap()));
        first.save_users(&[sample_user()]).unwrap();
        first.save_bookings(&[sample_booking()]).unwrap();

        let second = Records::new(Rc::new(FileStore::open(&path).unwrap()));
        assert_eq!(second.users().unwrap(), vec![sample_user()]);
        assert_eq!(second.bookings().unwrap(), vec![sample_booking()]);
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn test_file_store_sees_external_writes() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("store.json");
        let a = FileStore::open(&path).unwrap();
        let b = FileStore::open(&path).unwrap();

        a.set(BOOKINGS_KEY, serde_json::json!([])).unwrap();
        b.set(USERS_KEY, serde_json::json!([])).unwrap();
        assert!(a.get(USERS_KEY).unwrap().is_some());
        assert!(b.get(BOOKINGS_KEY).unwrap().is_some());

        a.remove(USERS_KEY).unwrap();
        assert!(b.get(USERS_KEY).unwrap().is_none());
    }

    #[test]
    fn test_file_store_rejects_non_object() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("store.json");
        std::fs::write(&path, "[1, 2, 3]").unwrap();

        let store = FileStore::open(&path).unwrap();
        let err = store.get(USERS_KEY).unwrap_err();
        assert!(err.to_string().contains("not a JSON object"));
    }

    #[test]
    fn test_file_store_reports_unparseable_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("store.json");
        std::fs::write(&path, "{not json").unwrap();

        let err = FileStore::open(&path).unwrap().get(USERS_KEY).unwrap_err();
        assert!(err.to_string().starts_with("failed to parse store"));
        assert!(err.to_string().contains("store.json"));
    }

    #[test]
    fn test_malformed_record_is_an_error() {
        let store = MemoryStore::new();
        store.set(USERS_KEY, serde_json::json!({"not": "a list"})).unwrap();
        let records = Records::new(Rc::new(store));
        assert!(records.users().is_err());
    }
}
