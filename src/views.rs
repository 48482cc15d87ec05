//! Plain-text rendering of the dashboards.

use crate::model::{Booking, Session, User};
use chrono::{NaiveDate, NaiveTime};
use std::fmt::Write;

const NO_BOOKINGS: &str = "  No bookings yet.";

/// `2024-06-01` -> `Jun 1, 2024`; unparseable input is shown as-is
pub fn format_date(raw: &str) -> String {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map(|d| d.format("%b %-d, %Y").to_string())
        .unwrap_or_else(|_| raw.to_string())
}

/// `13:30` -> `01:30 PM`
pub fn format_time(raw: &str) -> String {
    NaiveTime::parse_from_str(raw, "%H:%M")
        .map(|t| t.format("%I:%M %p").to_string())
        .unwrap_or_else(|_| raw.to_string())
}

pub fn welcome(session: &Session) -> String {
    format!("Welcome, {} ({})", session.name, session.email)
}

fn when(b: &Booking) -> String {
    format!("{} at {}", format_date(&b.date), format_time(&b.time))
}

fn notes_line(out: &mut String, b: &Booking) {
    if !b.notes.is_empty() {
        let _ = writeln!(out, "      notes: {}", b.notes);
    }
}

/// A student's own bookings, with teacher details
pub fn student_bookings(bookings: &[Booking]) -> String {
    let mut out = String::from("Your bookings:\n");
    if bookings.is_empty() {
        out.push_str(NO_BOOKINGS);
        out.push('\n');
        return out;
    }
    for b in bookings {
        let _ = writeln!(
            out,
            "  [{}] {} • {} | {} | {}",
            b.id,
            b.teacher_name,
            b.teacher_subject,
            when(b),
            b.status
        );
        notes_line(&mut out, b);
    }
    out
}

/// A teacher's bookings, with student details
pub fn teacher_bookings(bookings: &[Booking]) -> String {
    let mut out = String::from("Your sessions:\n");
    if bookings.is_empty() {
        out.push_str(NO_BOOKINGS);
        out.push('\n');
        return out;
    }
    for b in bookings {
        let _ = writeln!(
            out,
            "  [{}] {} • {} | {} | {}",
            b.id,
            b.student_name,
            b.student_email,
            when(b),
            b.status
        );
        notes_line(&mut out, b);
    }
    out
}

/// Every booking with both parties
pub fn all_bookings(bookings: &[Booking]) -> String {
    let mut out = String::from("All bookings:\n");
    if bookings.is_empty() {
        out.push_str(NO_BOOKINGS);
        out.push('\n');
        return out;
    }
    for b in bookings {
        let _ = writeln!(
            out,
            "  [{}] {} • {} <- {} • {} | {} | {}",
            b.id,
            b.teacher_name,
            b.teacher_subject,
            b.student_name,
            b.student_email,
            when(b),
            b.status
        );
    }
    out
}

pub fn teachers(list: &[User]) -> String {
    let mut out = String::from("Teachers:\n");
    if list.is_empty() {
        out.push_str("  No teachers.\n");
    }
    for t in list {
        let _ = writeln!(
            out,
            "  [{}] {} • {} | {}",
            t.id,
            t.name,
            t.subject.as_deref().unwrap_or("-"),
            t.email
        );
    }
    out
}

pub fn students(list: &[User]) -> String {
    let mut out = String::from("Students:\n");
    if list.is_empty() {
        out.push_str("  No students.\n");
    }
    for s in list {
        let _ = writeln!(out, "  [{}] {} | {}", s.id, s.name, s.email);
    }
    out
}
