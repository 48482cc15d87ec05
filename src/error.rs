use crate::model::Role;
use thiserror::Error;

/// Failures surfaced to the person at the keyboard
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Invalid {0} credentials")]
    InvalidCredentials(Role),
    #[error("Invalid teacher: {0}")]
    UnknownTeacher(String),
    #[error("Passwords do not match")]
    PasswordMismatch,
    #[error("Email already exists: {0}")]
    DuplicateEmail(String),
    #[error("Invalid email address: {0}")]
    InvalidEmail(String),
    #[error("Booking not found: {0}")]
    NotFound(String),
    #[error("Invalid date '{0}', expected YYYY-MM-DD")]
    InvalidDate(String),
    #[error("Invalid time '{0}', expected HH:MM")]
    InvalidTime(String),
    #[error("{teacher} already has a booking on {date} at {time}")]
    SlotTaken {
        teacher: String,
        date: String,
        time: String,
    },
    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

pub type AppResult<T> = Result<T, AppError>;
