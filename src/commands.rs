//! Slash command parsing.
//!
//! Arguments are split with shell quoting rules, so names and notes with
//! spaces can be quoted: `/register "Jane Roe" jane@example.com pw pw`.

use crate::model::{BookingStatus, Role};
use crate::session::Page;
use anyhow::{anyhow, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    Exit,
    Login {
        role: Role,
        email: String,
        password: String,
    },
    Register {
        name: String,
        email: String,
        password: String,
        confirm: String,
    },
    Logout,
    WhoAmI,
    Session,
    Page(Page),
    Teachers,
    Students,
    Book {
        teacher_id: String,
        date: String,
        time: String,
        notes: String,
    },
    Bookings,
    SetStatus {
        id: String,
        status: BookingStatus,
    },
    Cancel {
        id: String,
    },
    Delete {
        id: String,
    },
}

pub const HELP: &str = "\
Commands:
  /help                                   - show commands
  /exit                                   - quit
  /session                                - show store and journal locations
Accounts:
  /login <student|teacher|admin> <email> <password>
  /register <name> <email> <password> <confirm>
  /logout
  /whoami
Pages:
  /page <login|register|student|teacher|admin>
  /teachers                               - list teachers
  /students                               - list students (admin)
Bookings:
  /book <teacher-id> <YYYY-MM-DD> <HH:MM> [notes...]   (student)
  /bookings                               - bookings for your role
  /approve <id> | /reject <id>            (admin)
  /complete <id>                          (teacher, admin)
  /cancel <id>                            (student, teacher)
  /delete <id>                            (admin)";

pub fn parse(line: &str) -> Result<Command> {
    let line = line.trim();
    if !line.starts_with('/') {
        return Err(anyhow!("Commands start with '/'. Type /help for a list."));
    }

    let words = shell_words::split(line).map_err(|e| anyhow!("Unbalanced quotes: {}", e))?;
    let Some((name, args)) = words.split_first() else {
        return Err(anyhow!("Empty command"));
    };

    let cmd = match name.as_str() {
        "/help" => Command::Help,
        "/exit" | "/quit" => Command::Exit,
        "/session" => Command::Session,
        "/logout" => Command::Logout,
        "/whoami" => Command::WhoAmI,
        "/teachers" => Command::Teachers,
        "/students" => Command::Students,
        "/bookings" => Command::Bookings,
        "/login" => {
            let [role, email, password] = exact::<3>(args, "/login <role> <email> <password>")?;
            let role = Role::from_str(&role)
                .ok_or_else(|| anyhow!("Unknown role '{}'. Use student, teacher or admin", role))?;
            Command::Login {
                role,
                email,
                password,
            }
        }
        "/register" => {
            let [name, email, password, confirm] =
                exact::<4>(args, "/register <name> <email> <password> <confirm>")?;
            Command::Register {
                name,
                email,
                password,
                confirm,
            }
        }
        "/page" => {
            let [page] = exact::<1>(args, "/page <login|register|student|teacher|admin>")?;
            Command::Page(
                Page::from_str(&page).ok_or_else(|| anyhow!("Unknown page '{}'", page))?,
            )
        }
        "/book" => {
            if args.len() < 3 {
                return Err(usage("/book <teacher-id> <YYYY-MM-DD> <HH:MM> [notes...]"));
            }
            Command::Book {
                teacher_id: args[0].clone(),
                date: args[1].clone(),
                time: args[2].clone(),
                notes: args[3..].join(" "),
            }
        }
        "/approve" | "/reject" | "/complete" | "/done" => {
            let [id] = exact::<1>(args, &format!("{} <id>", name))?;
            let status = match name.as_str() {
                "/approve" => BookingStatus::Approved,
                "/reject" => BookingStatus::Rejected,
                _ => BookingStatus::Completed,
            };
            Command::SetStatus { id, status }
        }
        "/cancel" => {
            let [id] = exact::<1>(args, "/cancel <id>")?;
            Command::Cancel { id }
        }
        "/delete" => {
            let [id] = exact::<1>(args, "/delete <id>")?;
            Command::Delete { id }
        }
        other => return Err(anyhow!("Unknown command: {}", other)),
    };

    Ok(cmd)
}

fn usage(form: &str) -> anyhow::Error {
    anyhow!("Usage: {}", form)
}

fn exact<const N: usize>(args: &[String], form: &str) -> Result<[String; N]> {
    <[String; N]>::try_from(args.to_vec()).map_err(|_| usage(form))
}
