//! User accounts: demo seeding, student registration and role listings.

use crate::credentials::{hash_password, is_valid_email, new_id, normalize_email};
use crate::error::{AppError, AppResult};
use crate::model::{Role, User};
use crate::store::Records;
use anyhow::Result;

pub struct Accounts {
    records: Records,
}

impl Accounts {
    pub fn new(records: Records) -> Self {
        Self { records }
    }

    /// Write the demo accounts if no users exist yet. Returns whether it did.
    pub fn seed(&self) -> Result<bool> {
        if !self.records.users()?.is_empty() {
            return Ok(false);
        }
        self.records.save_users(&demo_users())?;
        Ok(true)
    }

    /// Create a student account
    pub fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
        confirm: &str,
    ) -> AppResult<User> {
        let name = name.trim();
        let email = normalize_email(email);

        if password != confirm {
            return Err(AppError::PasswordMismatch);
        }
        if !is_valid_email(&email) {
            return Err(AppError::InvalidEmail(email));
        }

        let mut users = self.records.users()?;
        if users.iter().any(|u| normalize_email(&u.email) == email) {
            return Err(AppError::DuplicateEmail(email));
        }

        let id = new_id("stu-", |candidate| users.iter().any(|u| u.id == candidate));
        let user = User {
            id,
            role: Role::Student,
            email,
            password: hash_password(password),
            name: name.to_string(),
            subject: None,
        };
        users.push(user.clone());
        self.records.save_users(&users)?;
        Ok(user)
    }

    /// Users holding `role`, in store order
    pub fn by_role(&self, role: Role) -> Result<Vec<User>> {
        Ok(self
            .records
            .users()?
            .into_iter()
            .filter(|u| u.role == role)
            .collect())
    }

    pub fn teachers(&self) -> Result<Vec<User>> {
        self.by_role(Role::Teacher)
    }

    pub fn students(&self) -> Result<Vec<User>> {
        self.by_role(Role::Student)
    }

    pub fn admins(&self) -> Result<Vec<User>> {
        self.by_role(Role::Admin)
    }

    pub fn find_teacher(&self, id: &str) -> Result<Option<User>> {
        Ok(self.teachers()?.into_iter().find(|t| t.id == id))
    }
}

fn demo_user(id: &str, role: Role, email: &str, password: &str, name: &str) -> User {
    User {
        id: id.to_string(),
        role,
        email: email.to_string(),
        password: hash_password(password),
        name: name.to_string(),
        subject: None,
    }
}

fn demo_teacher(id: &str, email: &str, name: &str, subject: &str) -> User {
    User {
        subject: Some(subject.to_string()),
        ..demo_user(id, Role::Teacher, email, "teach123", name)
    }
}

fn demo_users() -> Vec<User> {
    vec![
        demo_user("stu-1", Role::Student, "student@demo.com", "123456", "Demo Student"),
        demo_teacher("t-1", "alice@school.com", "Alice Johnson", "Mathematics"),
        demo_teacher("t-2", "bob@school.com", "Bob Smith", "Physics"),
        demo_teacher("t-3", "carol@school.com", "Carol Lee", "English"),
        demo_user("adm-1", Role::Admin, "admin@demo.com", "admin123", "System Admin"),
    ]
}
