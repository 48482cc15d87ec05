//! Login state and role-gated page access.

use crate::credentials::{normalize_email, verify_password};
use crate::error::{AppError, AppResult};
use crate::model::{Role, Session};
use crate::store::Records;
use anyhow::Result;
use chrono::{Duration, Utc};

/// Views the front end can show
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Login,
    Register,
    Student,
    Teacher,
    Admin,
}

impl Page {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "login" | "index" => Some(Self::Login),
            "register" => Some(Self::Register),
            "student" => Some(Self::Student),
            "teacher" => Some(Self::Teacher),
            "admin" => Some(Self::Admin),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Login => "login",
            Self::Register => "register",
            Self::Student => "student",
            Self::Teacher => "teacher",
            Self::Admin => "admin",
        }
    }

    /// Dashboard a role lands on after login
    pub fn for_role(role: Role) -> Self {
        match role {
            Role::Student => Self::Student,
            Role::Teacher => Self::Teacher,
            Role::Admin => Self::Admin,
        }
    }

    /// Roles allowed to open the page; `None` means no session is needed
    pub fn required_roles(&self) -> Option<&'static [Role]> {
        match self {
            Self::Login | Self::Register => None,
            Self::Student => Some(&[Role::Student]),
            Self::Teacher => Some(&[Role::Teacher]),
            Self::Admin => Some(&[Role::Admin]),
        }
    }
}

/// Outcome of a role check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Access {
    Granted(Session),
    /// Sent elsewhere: the login page without a session, otherwise the
    /// session's own dashboard
    Redirect(Page),
}

pub struct SessionManager {
    records: Records,
    ttl: Option<Duration>,
}

impl SessionManager {
    pub fn new(records: Records, ttl: Option<Duration>) -> Self {
        Self { records, ttl }
    }

    /// Authenticate against users of exactly `role`
    pub fn login(&self, role: Role, email: &str, password: &str) -> AppResult<Session> {
        let email = normalize_email(email);
        let user = self.records.users()?.into_iter().find(|u| {
            u.role == role
                && normalize_email(&u.email) == email
                && verify_password(&u.password, password)
        });

        let Some(user) = user else {
            return Err(AppError::InvalidCredentials(role));
        };

        let session = Session::for_user(&user, Utc::now());
        self.records.set_session(&session)?;
        Ok(session)
    }

    /// The active session; an expired one is cleared and reads as none.
    /// A session stored without a start time is stamped now and written back,
    /// so its lifetime counts from the first read.
    pub fn current_session(&self) -> Result<Option<Session>> {
        let Some(mut session) = self.records.session()? else {
            return Ok(None);
        };

        if session.started_at.is_none() {
            session.started_at = Some(Utc::now());
            self.records.set_session(&session)?;
        }

        if session.is_expired(self.ttl, Utc::now()) {
            self.records.clear_session()?;
            return Ok(None);
        }

        Ok(Some(session))
    }

    /// Grant access when the session's role is in `allowed`.
    /// An empty `allowed` accepts any logged-in role.
    pub fn require_role(&self, allowed: &[Role]) -> Result<Access> {
        let Some(session) = self.current_session()? else {
            return Ok(Access::Redirect(Page::Login));
        };

        if !allowed.is_empty() && !allowed.contains(&session.role) {
            return Ok(Access::Redirect(Page::for_role(session.role)));
        }

        Ok(Access::Granted(session))
    }

    pub fn logout(&self) -> Result<()> {
        self.records.clear_session()
    }
}
