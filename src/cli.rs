use crate::{
    accounts::Accounts,
    booking::BookingService,
    commands::{self, Command, HELP},
    events::{EventBus, SubscriptionId},
    journal::Journal,
    model::{BookingStatus, Role, Session},
    session::{Access, Page, SessionManager},
    store::Records,
    views,
};
use anyhow::{anyhow, Result};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::cell::{Cell, RefCell};
use std::path::PathBuf;
use std::rc::Rc;

pub struct Context {
    pub run_id: String,
    pub records: Records,
    pub accounts: Accounts,
    pub sessions: SessionManager,
    pub bookings: BookingService,
    pub events: Rc<EventBus>,
    pub journal: Option<Rc<RefCell<Journal>>>,
    pub history_path: Option<PathBuf>,
    mounted: RefCell<Option<MountedView>>,
    stale: Rc<Cell<bool>>,
}

/// The page currently on screen and its change subscription
struct MountedView {
    page: Page,
    subscription: Option<SubscriptionId>,
}

/// Result of one command line
#[derive(Debug)]
pub struct Reply {
    pub text: String,
    pub exit: bool,
}

impl Reply {
    fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            exit: false,
        }
    }
}

impl Context {
    pub fn new(
        run_id: String,
        records: Records,
        events: Rc<EventBus>,
        session_ttl: Option<chrono::Duration>,
        allow_double_booking: bool,
        journal: Option<Rc<RefCell<Journal>>>,
    ) -> Self {
        Self {
            run_id,
            accounts: Accounts::new(records.clone()),
            sessions: SessionManager::new(records.clone(), session_ttl),
            bookings: BookingService::new(
                records.clone(),
                Rc::clone(&events),
                allow_double_booking,
            ),
            records,
            events,
            journal,
            history_path: None,
            mounted: RefCell::new(None),
            stale: Rc::new(Cell::new(false)),
        }
    }

    /// Page on screen, if any
    pub fn current_page(&self) -> Option<Page> {
        self.mounted.borrow().as_ref().map(|v| v.page)
    }

    fn journal(&self, write: impl FnOnce(&mut Journal) -> Result<()>) {
        if let Some(journal) = &self.journal {
            if let Err(e) = write(&mut *journal.borrow_mut()) {
                eprintln!("Warning: failed to write journal: {}", e);
            }
        }
    }

    /// Show `page`, replacing whatever was mounted. Dashboards subscribe to
    /// booking changes so they can be redrawn after a mutation.
    fn mount(&self, page: Page) {
        self.unmount();
        let subscription = page.required_roles().map(|_| {
            let stale = Rc::clone(&self.stale);
            self.events.subscribe(move |_| stale.set(true))
        });
        *self.mounted.borrow_mut() = Some(MountedView { page, subscription });
    }

    fn unmount(&self) {
        if let Some(view) = self.mounted.borrow_mut().take() {
            if let Some(id) = view.subscription {
                self.events.unsubscribe(id);
            }
        }
        self.stale.set(false);
    }

    /// Require a session whose role is in `allowed`
    fn needs(&self, allowed: &[Role]) -> Result<Session> {
        match self.sessions.require_role(allowed)? {
            Access::Granted(session) => Ok(session),
            Access::Redirect(Page::Login) => Err(anyhow!("Not logged in. Use /login first.")),
            Access::Redirect(_) => {
                let names: Vec<&str> = allowed.iter().map(|r| r.as_str()).collect();
                Err(anyhow!("Only available to {} accounts", names.join(" or ")))
            }
        }
    }
}

pub fn run_once(ctx: &Context, lines: &[String]) -> Result<()> {
    for line in lines {
        let reply = dispatch(ctx, line)?;
        if !reply.text.is_empty() {
            println!("{}", reply.text.trim_end());
        }
        if reply.exit {
            break;
        }
    }
    Ok(())
}

pub fn run_repl(ctx: Context) -> Result<()> {
    let mut rl = DefaultEditor::new()?;
    if let Some(path) = &ctx.history_path {
        let _ = rl.load_history(path);
    }

    println!("tutorbook - type /help for commands, /exit to quit");
    if let Some(welcome) = resume(&ctx) {
        println!("{}", welcome);
    }

    loop {
        let page = ctx.current_page().unwrap_or(Page::Login);
        match rl.readline(&format!("{}> ", page.as_str())) {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                rl.add_history_entry(line)?;

                match dispatch(&ctx, line) {
                    Ok(reply) => {
                        if !reply.text.is_empty() {
                            println!("{}", reply.text.trim_end());
                        }
                        if reply.exit {
                            break;
                        }
                    }
                    Err(e) => eprintln!("Error: {}", e),
                }
            }
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("Input error: {}", e);
                break;
            }
        }
    }

    if let Some(path) = &ctx.history_path {
        if let Err(e) = rl.save_history(path) {
            eprintln!("Warning: failed to save history: {}", e);
        }
    }
    ctx.unmount();
    Ok(())
}

/// Mount the dashboard of a stored session, or the login page.
/// An unreadable session record is reported and the user starts logged out.
fn resume(ctx: &Context) -> Option<String> {
    match ctx.sessions.current_session() {
        Ok(Some(session)) => {
            ctx.mount(Page::for_role(session.role));
            Some(views::welcome(&session))
        }
        Ok(None) => {
            ctx.mount(Page::Login);
            None
        }
        Err(e) => {
            eprintln!("Warning: ignoring stored session: {}", e);
            ctx.mount(Page::Login);
            None
        }
    }
}

/// Parse and run one line; a mounted dashboard is redrawn if bookings changed
pub fn dispatch(ctx: &Context, line: &str) -> Result<Reply> {
    let cmd = commands::parse(line)?;
    let mut reply = execute(ctx, cmd)?;

    if ctx.stale.replace(false) {
        if let Some(page) = ctx.current_page() {
            if let Some(session) = ctx.sessions.current_session()? {
                reply.text.push('\n');
                reply.text.push_str(&render_page(ctx, page, Some(&session))?);
            }
        }
    }

    Ok(reply)
}

fn execute(ctx: &Context, cmd: Command) -> Result<Reply> {
    let reply = match cmd {
        Command::Help => Reply::text(HELP),
        Command::Exit => Reply {
            text: String::new(),
            exit: true,
        },
        Command::Session => {
            let journal = ctx
                .journal
                .as_ref()
                .map(|j| j.borrow().path.display().to_string())
                .unwrap_or_else(|| "<disabled>".to_string());
            Reply::text(format!(
                "Run: {}\nStore: {}\nJournal: {}",
                ctx.run_id,
                ctx.records.describe(),
                journal
            ))
        }
        Command::Login {
            role,
            email,
            password,
        } => match ctx.sessions.login(role, &email, &password) {
            Ok(session) => {
                ctx.journal(|j| j.login_ok(&session));
                let page = Page::for_role(session.role);
                ctx.mount(page);
                Reply::text(render_page(ctx, page, Some(&session))?)
            }
            Err(e) => {
                ctx.journal(|j| j.login_failed(role, &email));
                return Err(e.into());
            }
        },
        Command::Register {
            name,
            email,
            password,
            confirm,
        } => {
            if let Some(session) = ctx.sessions.current_session()? {
                return Err(anyhow!(
                    "Already logged in as {}. Use /logout first.",
                    session.email
                ));
            }
            let user = ctx.accounts.register(&name, &email, &password, &confirm)?;
            ctx.journal(|j| j.registered(&user.id, &user.email));
            ctx.mount(Page::Login);
            Reply::text(format!("Account created! Log in with /login student {}", user.email))
        }
        Command::Logout => {
            let session = ctx.sessions.current_session().unwrap_or_else(|e| {
                eprintln!("Warning: discarding unreadable session: {}", e);
                None
            });
            ctx.sessions.logout()?;
            ctx.journal(|j| j.logout(session.as_ref().map(|s| s.id.as_str())));
            ctx.mount(Page::Login);
            Reply::text("Logged out.")
        }
        Command::WhoAmI => match ctx.sessions.current_session()? {
            Some(session) => Reply::text(format!(
                "{} [{}, {}]",
                views::welcome(&session),
                session.role,
                session.id
            )),
            None => Reply::text("Not logged in."),
        },
        Command::Page(page) => {
            let allowed = page.required_roles().unwrap_or(&[]);
            let (shown, session) = if page.required_roles().is_none() {
                (page, ctx.sessions.current_session()?)
            } else {
                match ctx.sessions.require_role(allowed)? {
                    Access::Granted(session) => (page, Some(session)),
                    Access::Redirect(target) => {
                        ctx.journal(|j| j.redirect(page, target));
                        (target, ctx.sessions.current_session()?)
                    }
                }
            };
            ctx.mount(shown);
            let mut text = String::new();
            if shown != page {
                text.push_str(&format!("Redirected to the {} page.\n", shown.as_str()));
            }
            text.push_str(&render_page(ctx, shown, session.as_ref())?);
            Reply::text(text)
        }
        Command::Teachers => {
            ctx.needs(&[])?;
            Reply::text(views::teachers(&ctx.accounts.teachers()?))
        }
        Command::Students => {
            ctx.needs(&[Role::Admin])?;
            Reply::text(views::students(&ctx.accounts.students()?))
        }
        Command::Book {
            teacher_id,
            date,
            time,
            notes,
        } => {
            let student = ctx.needs(&[Role::Student])?;
            let booking = ctx
                .bookings
                .create(&student, &teacher_id, &date, &time, &notes)?;
            Reply::text(format!(
                "Appointment booked! [{}] {} on {} at {}",
                booking.id,
                booking.teacher_name,
                views::format_date(&booking.date),
                views::format_time(&booking.time)
            ))
        }
        Command::Bookings => {
            let session = ctx.needs(&[])?;
            Reply::text(bookings_for(ctx, &session)?)
        }
        Command::SetStatus { id, status } => {
            let allowed: &[Role] = match status {
                BookingStatus::Completed => &[Role::Teacher, Role::Admin],
                _ => &[Role::Admin],
            };
            ctx.needs(allowed)?;
            let booking = ctx.bookings.set_status(&id, status)?;
            Reply::text(format!("Booking {} is now {}.", booking.id, booking.status))
        }
        Command::Cancel { id } => {
            ctx.needs(&[Role::Student, Role::Teacher])?;
            ctx.bookings.delete(&id)?;
            Reply::text(format!("Booking {} cancelled.", id))
        }
        Command::Delete { id } => {
            ctx.needs(&[Role::Admin])?;
            ctx.bookings.delete(&id)?;
            Reply::text(format!("Booking {} deleted.", id))
        }
    };

    Ok(reply)
}

/// The booking listing matching the session's role
fn bookings_for(ctx: &Context, session: &Session) -> Result<String> {
    Ok(match session.role {
        Role::Student => views::student_bookings(&ctx.bookings.list_for_student(&session.email)?),
        Role::Teacher => views::teacher_bookings(&ctx.bookings.list_for_teacher(&session.id)?),
        Role::Admin => views::all_bookings(&ctx.bookings.list_all()?),
    })
}

fn render_page(ctx: &Context, page: Page, session: Option<&Session>) -> Result<String> {
    let mut out = String::new();
    match (page, session) {
        (Page::Login, _) => {
            out.push_str("Log in with /login <student|teacher|admin> <email> <password>\n");
            out.push_str("New student? /page register\n");
        }
        (Page::Register, _) => {
            out.push_str("Create a student account with /register <name> <email> <password> <confirm>\n");
        }
        (_, None) => out.push_str("Not logged in.\n"),
        (Page::Student, Some(s)) => {
            out.push_str(&views::welcome(s));
            out.push('\n');
            out.push_str(&views::teachers(&ctx.accounts.teachers()?));
            out.push_str(&bookings_for(ctx, s)?);
        }
        (Page::Teacher, Some(s)) => {
            out.push_str(&views::welcome(s));
            out.push('\n');
            out.push_str(&bookings_for(ctx, s)?);
        }
        (Page::Admin, Some(s)) => {
            out.push_str(&views::welcome(s));
            out.push('\n');
            out.push_str(&views::teachers(&ctx.accounts.teachers()?));
            out.push_str(&views::students(&ctx.accounts.students()?));
            out.push_str(&bookings_for(ctx, s)?);
        }
    }
    Ok(out)
}
