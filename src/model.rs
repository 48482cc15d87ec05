//! Records persisted in the store: users, bookings and the active session.
//!
//! Field names serialize in camelCase so a store written by the browser
//! version of the tool reads back unchanged.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Role of an account; gates which pages and operations are reachable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Student,
    Teacher,
    Admin,
}

impl Role {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "student" => Some(Self::Student),
            "teacher" => Some(Self::Teacher),
            "admin" => Some(Self::Admin),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Student => "student",
            Self::Teacher => "teacher",
            Self::Admin => "admin",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A registered account
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub role: Role,
    /// Stored trimmed and lower-cased
    pub email: String,
    /// Salted digest, or a bare plaintext password in legacy records
    pub password: String,
    pub name: String,
    /// Teachers only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
}

/// Lifecycle state of a booking
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
pub enum BookingStatus {
    #[default]
    Booked,
    Approved,
    Rejected,
    Completed,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Booked => "Booked",
            Self::Approved => "Approved",
            Self::Rejected => "Rejected",
            Self::Completed => "Completed",
        }
    }
}

impl std::fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An appointment between a student and a teacher
///
/// Teacher and student names are copied in at creation time so listings
/// never need to join against the user list.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub id: String,
    pub teacher_id: String,
    pub teacher_name: String,
    #[serde(default)]
    pub teacher_subject: String,
    pub student_email: String,
    pub student_name: String,
    /// `YYYY-MM-DD`
    pub date: String,
    /// `HH:MM`, 24-hour
    pub time: String,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub status: BookingStatus,
}

impl Booking {
    /// Key used by every listing; valid because both fields are zero-padded
    pub fn slot_key(&self) -> (&str, &str) {
        (&self.date, &self.time)
    }
}

/// The authenticated actor. A copy of the user's identity, never the password.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: String,
    pub role: Role,
    pub email: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    /// Missing in records written by the browser version; stamped on first read
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
}

impl Session {
    pub fn for_user(user: &User, now: DateTime<Utc>) -> Self {
        Self {
            id: user.id.clone(),
            role: user.role,
            email: user.email.clone(),
            name: user.name.clone(),
            subject: user.subject.clone(),
            started_at: Some(now),
        }
    }

    /// An unstamped session has not started its clock yet
    pub fn is_expired(&self, ttl: Option<Duration>, now: DateTime<Utc>) -> bool {
        match (ttl, self.started_at) {
            (Some(ttl), Some(started_at)) => now - started_at > ttl,
            _ => false,
        }
    }
}
