//! Booking lifecycle: create, list, change status, delete.
//!
//! Every listing orders by `(date, time)` ascending. Dates and times are
//! normalised to zero-padded `YYYY-MM-DD` and `HH:MM` on the way in, so
//! plain string comparison is chronological. The sort is stable: bookings
//! for the same slot stay in the order they were made.

use crate::credentials::new_id;
use crate::error::{AppError, AppResult};
use crate::events::{BookingEvent, EventBus};
use crate::model::{Booking, BookingStatus, Role, Session};
use crate::store::Records;
use anyhow::Result;
use chrono::{NaiveDate, NaiveTime};
use std::rc::Rc;

pub struct BookingService {
    records: Records,
    events: Rc<EventBus>,
    allow_double_booking: bool,
}

impl BookingService {
    pub fn new(records: Records, events: Rc<EventBus>, allow_double_booking: bool) -> Self {
        Self {
            records,
            events,
            allow_double_booking,
        }
    }

    /// Book `teacher_id` for the session's student
    pub fn create(
        &self,
        student: &Session,
        teacher_id: &str,
        date: &str,
        time: &str,
        notes: &str,
    ) -> AppResult<Booking> {
        let teacher = self
            .records
            .users()?
            .into_iter()
            .find(|u| u.role == Role::Teacher && u.id == teacher_id)
            .ok_or_else(|| AppError::UnknownTeacher(teacher_id.to_string()))?;

        let date = normalize_date(date)?;
        let time = normalize_time(time)?;

        let mut bookings = self.records.bookings()?;
        if !self.allow_double_booking {
            let taken = bookings.iter().any(|b| {
                b.teacher_id == teacher.id
                    && b.date == date
                    && b.time == time
                    && b.status != BookingStatus::Rejected
            });
            if taken {
                return Err(AppError::SlotTaken {
                    teacher: teacher.name,
                    date,
                    time,
                });
            }
        }

        let id = new_id("bk-", |candidate| bookings.iter().any(|b| b.id == candidate));
        let booking = Booking {
            id,
            teacher_id: teacher.id,
            teacher_name: teacher.name,
            teacher_subject: teacher.subject.unwrap_or_default(),
            student_email: student.email.clone(),
            student_name: student.name.clone(),
            date,
            time,
            notes: notes.trim().to_string(),
            status: BookingStatus::Booked,
        };
        bookings.push(booking.clone());
        self.records.save_bookings(&bookings)?;

        self.events.publish(&BookingEvent::Created(booking.clone()));
        Ok(booking)
    }

    pub fn list_for_student(&self, email: &str) -> Result<Vec<Booking>> {
        self.list_where(|b| b.student_email == email)
    }

    pub fn list_for_teacher(&self, teacher_id: &str) -> Result<Vec<Booking>> {
        self.list_where(|b| b.teacher_id == teacher_id)
    }

    pub fn list_all(&self) -> Result<Vec<Booking>> {
        self.list_where(|_| true)
    }

    /// Overwrite the status of one booking; nothing else changes
    pub fn set_status(&self, id: &str, status: BookingStatus) -> AppResult<Booking> {
        let mut bookings = self.records.bookings()?;
        let booking = bookings
            .iter_mut()
            .find(|b| b.id == id)
            .ok_or_else(|| AppError::NotFound(id.to_string()))?;

        let from = booking.status;
        booking.status = status;
        let updated = booking.clone();
        self.records.save_bookings(&bookings)?;

        self.events.publish(&BookingEvent::StatusChanged {
            id: updated.id.clone(),
            from,
            to: status,
        });
        Ok(updated)
    }

    /// Remove a booking. A missing id leaves the store untouched.
    pub fn delete(&self, id: &str) -> AppResult<()> {
        let mut bookings = self.records.bookings()?;
        let Some(index) = bookings.iter().position(|b| b.id == id) else {
            return Err(AppError::NotFound(id.to_string()));
        };

        bookings.remove(index);
        self.records.save_bookings(&bookings)?;

        self.events.publish(&BookingEvent::Deleted { id: id.to_string() });
        Ok(())
    }

    fn list_where(&self, keep: impl Fn(&Booking) -> bool) -> Result<Vec<Booking>> {
        let mut list: Vec<Booking> = self
            .records
            .bookings()?
            .into_iter()
            .filter(|b| keep(b))
            .collect();
        list.sort_by(|a, b| a.slot_key().cmp(&b.slot_key()));
        Ok(list)
    }
}

/// Parse and re-emit as zero-padded `YYYY-MM-DD`
pub fn normalize_date(raw: &str) -> AppResult<String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map(|d| d.format("%Y-%m-%d").to_string())
        .map_err(|_| AppError::InvalidDate(raw.to_string()))
}

/// Parse `HH:MM` (seconds tolerated and dropped) and re-emit as `HH:MM`
pub fn normalize_time(raw: &str) -> AppResult<String> {
    let trimmed = raw.trim();
    NaiveTime::parse_from_str(trimmed, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(trimmed, "%H:%M:%S"))
        .map(|t| t.format("%H:%M").to_string())
        .map_err(|_| AppError::InvalidTime(raw.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accounts::Accounts;
    use crate::session::SessionManager;
    use crate::store::MemoryStore;
    use std::cell::RefCell;

    struct Fixture {
        records: Records,
        events: Rc<EventBus>,
        service: BookingService,
        student: Session,
    }

    fn fixture(allow_double_booking: bool) -> Fixture {
        let records = Records::new(Rc::new(MemoryStore::new()));
        Accounts::new(records.clone()).seed().unwrap();
        let student = SessionManager::new(records.clone(), None)
            .login(Role::Student, "student@demo.com", "123456")
            .unwrap();
        let events = Rc::new(EventBus::new());
        let service =
            BookingService::new(records.clone(), Rc::clone(&events), allow_double_booking);
        Fixture {
            records,
            events,
            service,
            student,
        }
    }

    fn other_student(email: &str) -> Session {
        Session {
            id: "stu-x".to_string(),
            role: Role::Student,
            email: email.to_string(),
            name: "Other Student".to_string(),
            subject: None,
            started_at: Some(chrono::Utc::now()),
        }
    }

    #[test]
    fn test_create_copies_teacher_and_student() {
        let f = fixture(true);
        let booking = f
            .service
            .create(&f.student, "t-1", "2024-06-01", "09:00", " bring calculator ")
            .unwrap();

        assert!(booking.id.starts_with("bk-"));
        assert_eq!(booking.teacher_name, "Alice Johnson");
        assert_eq!(booking.teacher_subject, "Mathematics");
        assert_eq!(booking.student_email, "student@demo.com");
        assert_eq!(booking.student_name, "Demo Student");
        assert_eq!(booking.notes, "bring calculator");
        assert_eq!(booking.status, BookingStatus::Booked);
        assert_eq!(f.records.bookings().unwrap(), vec![booking]);
    }

    #[test]
    fn test_create_unknown_teacher() {
        let f = fixture(true);
        for id in ["t-9", "stu-1", "adm-1"] {
            let err = f
                .service
                .create(&f.student, id, "2024-06-01", "09:00", "")
                .unwrap_err();
            assert!(matches!(err, AppError::UnknownTeacher(ref t) if t == id));
        }
        assert!(f.records.bookings().unwrap().is_empty());
    }

    #[test]
    fn test_create_ids_are_unique() {
        let f = fixture(true);
        let mut ids = std::collections::HashSet::new();
        for _ in 0..20 {
            let b = f
                .service
                .create(&f.student, "t-2", "2024-06-01", "10:00", "")
                .unwrap();
            assert!(ids.insert(b.id));
        }
    }

    #[test]
    fn test_create_normalises_date_and_time() {
        let f = fixture(true);
        let b = f
            .service
            .create(&f.student, "t-1", "2024-6-1", "9:05:00", "")
            .unwrap();
        assert_eq!(b.date, "2024-06-01");
        assert_eq!(b.time, "09:05");
    }

    #[test]
    fn test_create_rejects_bad_date_and_time() {
        let f = fixture(true);
        let err = f
            .service
            .create(&f.student, "t-1", "2024-02-30", "09:00", "")
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidDate(_)));

        let err = f
            .service
            .create(&f.student, "t-1", "2024-02-01", "25:00", "")
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidTime(_)));
    }

    #[test]
    fn test_student_listing_filters_and_sorts() {
        let f = fixture(true);
        let other = other_student("other@demo.com");
        f.service.create(&f.student, "t-1", "2024-06-02", "08:00", "").unwrap();
        f.service.create(&other, "t-1", "2024-06-01", "07:00", "").unwrap();
        f.service.create(&f.student, "t-2", "2024-06-01", "13:30", "").unwrap();
        f.service.create(&f.student, "t-3", "2024-06-01", "09:00", "").unwrap();

        let list = f.service.list_for_student("student@demo.com").unwrap();
        let slots: Vec<_> = list.iter().map(|b| (b.date.as_str(), b.time.as_str())).collect();
        assert_eq!(
            slots,
            vec![
                ("2024-06-01", "09:00"),
                ("2024-06-01", "13:30"),
                ("2024-06-02", "08:00"),
            ]
        );
        assert!(list.iter().all(|b| b.student_email == "student@demo.com"));
        assert_eq!(f.service.list_all().unwrap().len(), 4);
        assert_eq!(f.service.list_all().unwrap()[0].student_email, "other@demo.com");
    }

    #[test]
    fn test_teacher_listing_is_sorted_and_stable() {
        let f = fixture(true);
        let other = other_student("other@demo.com");
        f.service.create(&f.student, "t-1", "2024-07-01", "10:00", "").unwrap();
        let first = f.service.create(&f.student, "t-1", "2024-06-01", "10:00", "").unwrap();
        let second = f.service.create(&other, "t-1", "2024-06-01", "10:00", "").unwrap();
        f.service.create(&f.student, "t-2", "2024-05-01", "10:00", "").unwrap();

        let list = f.service.list_for_teacher("t-1").unwrap();
        assert_eq!(list.len(), 3);
        assert_eq!(list[0].id, first.id);
        assert_eq!(list[1].id, second.id);
        assert_eq!(list[2].date, "2024-07-01");
    }

    #[test]
    fn test_set_status_changes_only_status() {
        let f = fixture(true);
        let created = f
            .service
            .create(&f.student, "t-1", "2024-06-01", "09:00", "notes")
            .unwrap();

        let updated = f
            .service
            .set_status(&created.id, BookingStatus::Approved)
            .unwrap();
        assert_eq!(
            updated,
            Booking {
                status: BookingStatus::Approved,
                ..created
            }
        );

        let listed = f.service.list_for_student("student@demo.com").unwrap();
        assert_eq!(listed[0].status, BookingStatus::Approved);
    }

    #[test]
    fn test_set_status_missing() {
        let f = fixture(true);
        let err = f
            .service
            .set_status("bk-missing", BookingStatus::Completed)
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[test]
    fn test_delete_removes_from_every_listing() {
        let f = fixture(true);
        let keep = f.service.create(&f.student, "t-1", "2024-06-01", "09:00", "").unwrap();
        let gone = f.service.create(&f.student, "t-1", "2024-06-02", "09:00", "").unwrap();

        f.service.delete(&gone.id).unwrap();
        for list in [
            f.service.list_all().unwrap(),
            f.service.list_for_teacher("t-1").unwrap(),
            f.service.list_for_student("student@demo.com").unwrap(),
        ] {
            assert_eq!(list, vec![keep.clone()]);
        }
    }

    #[test]
    fn test_delete_missing_leaves_store_untouched() {
        let f = fixture(true);
        f.service.create(&f.student, "t-1", "2024-06-01", "09:00", "").unwrap();
        let before = f.records.bookings().unwrap();

        let err = f.service.delete("bk-missing").unwrap_err();
        assert!(matches!(err, AppError::NotFound(ref id) if id == "bk-missing"));
        assert_eq!(f.records.bookings().unwrap(), before);
    }

    #[test]
    fn test_double_booking_allowed_by_default() {
        let f = fixture(true);
        f.service.create(&f.student, "t-1", "2024-06-01", "09:00", "").unwrap();
        assert!(f
            .service
            .create(&f.student, "t-1", "2024-06-01", "09:00", "")
            .is_ok());
    }

    #[test]
    fn test_double_booking_refused_when_disabled() {
        let f = fixture(false);
        let first = f.service.create(&f.student, "t-1", "2024-06-01", "09:00", "").unwrap();
        let err = f
            .service
            .create(&f.student, "t-1", "2024-06-01", "09:00", "")
            .unwrap_err();
        assert!(matches!(err, AppError::SlotTaken { .. }));

        // Other teachers and rejected slots stay open
        assert!(f.service.create(&f.student, "t-2", "2024-06-01", "09:00", "").is_ok());
        f.service.set_status(&first.id, BookingStatus::Rejected).unwrap();
        assert!(f.service.create(&f.student, "t-1", "2024-06-01", "09:00", "").is_ok());
    }

    #[test]
    fn test_mutations_publish_events() {
        let f = fixture(true);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        f.events.subscribe(move |e| sink.borrow_mut().push(e.clone()));

        let b = f.service.create(&f.student, "t-1", "2024-06-01", "09:00", "").unwrap();
        f.service.set_status(&b.id, BookingStatus::Approved).unwrap();
        f.service.delete(&b.id).unwrap();
        let _ = f.service.delete(&b.id);

        let seen = seen.borrow();
        assert_eq!(seen.len(), 3);
        assert_eq!(seen[0], BookingEvent::Created(b.clone()));
        assert_eq!(
            seen[1],
            BookingEvent::StatusChanged {
                id: b.id.clone(),
                from: BookingStatus::Booked,
                to: BookingStatus::Approved,
            }
        );
        assert_eq!(seen[2], BookingEvent::Deleted { id: b.id.clone() });
    }
}
