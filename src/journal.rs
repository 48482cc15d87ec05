use crate::events::BookingEvent;
use crate::model::{Role, Session};
use crate::session::Page;
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Append-only JSONL activity log, one file per run
pub struct Journal {
    pub path: PathBuf,
    run_id: String,
    file: File,
}

#[derive(Serialize)]
struct Entry<'a> {
    ts: DateTime<Utc>,
    run_id: &'a str,
    #[serde(rename = "type")]
    event_type: &'a str,
    #[serde(flatten)]
    data: serde_json::Value,
}

impl Journal {
    pub fn new(path: &Path, run_id: &str) -> Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;

        Ok(Self {
            path: path.to_path_buf(),
            run_id: run_id.to_string(),
            file,
        })
    }

    pub fn log(&mut self, event_type: &str, data: serde_json::Value) -> Result<()> {
        let entry = Entry {
            ts: Utc::now(),
            run_id: &self.run_id,
            event_type,
            data,
        };
        let line = serde_json::to_string(&entry)?;
        writeln!(self.file, "{}", line)?;
        self.file.flush()?;
        Ok(())
    }

    pub fn run_start(&mut self, store: &str) -> Result<()> {
        self.log("run_start", serde_json::json!({ "store": store }))
    }

    pub fn login_ok(&mut self, session: &Session) -> Result<()> {
        self.log(
            "login_ok",
            serde_json::json!({ "user_id": session.id, "role": session.role }),
        )
    }

    /// Only the role and email are recorded, never the password
    pub fn login_failed(&mut self, role: Role, email: &str) -> Result<()> {
        self.log(
            "login_failed",
            serde_json::json!({ "role": role, "email": email }),
        )
    }

    pub fn logout(&mut self, user_id: Option<&str>) -> Result<()> {
        self.log("logout", serde_json::json!({ "user_id": user_id }))
    }

    pub fn registered(&mut self, user_id: &str, email: &str) -> Result<()> {
        self.log(
            "registered",
            serde_json::json!({ "user_id": user_id, "email": email }),
        )
    }

    pub fn redirect(&mut self, requested: Page, target: Page) -> Result<()> {
        self.log(
            "redirect",
            serde_json::json!({
                "requested": requested.as_str(),
                "target": target.as_str(),
            }),
        )
    }

    pub fn booking_event(&mut self, event: &BookingEvent) -> Result<()> {
        match event {
            BookingEvent::Created(b) => self.log(
                "booking_created",
                serde_json::json!({
                    "id": b.id,
                    "teacher_id": b.teacher_id,
                    "student_email": b.student_email,
                    "date": b.date,
                    "time": b.time,
                }),
            ),
            BookingEvent::StatusChanged { id, from, to } => self.log(
                "booking_status_changed",
                serde_json::json!({ "id": id, "from": from, "to": to }),
            ),
            BookingEvent::Deleted { id } => {
                self.log("booking_deleted", serde_json::json!({ "id": id }))
            }
        }
    }
}
