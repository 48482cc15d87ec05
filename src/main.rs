mod accounts;
mod booking;
mod cli;
mod commands;
mod config;
mod credentials;
mod error;
mod events;
mod journal;
mod model;
mod session;
mod store;
mod views;

use anyhow::Result;
use clap::Parser;
use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;

#[derive(Parser)]
#[command(name = "tutorbook", about = "Book tutoring sessions with teachers")]
pub struct Args {
    #[arg(
        short = 'c',
        long = "command",
        value_name = "LINE",
        action = clap::ArgAction::Append,
        help = "Run a command (e.g. '/bookings') and exit; repeatable"
    )]
    pub commands: Vec<String>,

    #[arg(long, env = "TUTORBOOK_STORE", help = "Store file path")]
    pub store: Option<PathBuf>,

    #[arg(long, help = "Keep records in memory only")]
    pub ephemeral: bool,

    #[arg(long, help = "Config file path")]
    pub config: Option<PathBuf>,

    #[arg(long, help = "Journal directory")]
    pub journal_dir: Option<PathBuf>,

    #[arg(long, help = "Do not write demo accounts into an empty store")]
    pub no_seed: bool,

    #[arg(long, help = "Debug output (print effective settings)")]
    pub debug: bool,
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();
    let root = std::env::current_dir()?;

    let mut cfg = if let Some(config_path) = &args.config {
        config::Config::load_from(config_path)?
    } else {
        config::Config::load(&root).unwrap_or_else(|e| {
            eprintln!("Warning: failed to load config, using defaults: {}", e);
            config::Config::default()
        })
    };

    // CLI flags win over every config layer
    if let Some(path) = &args.store {
        cfg.store.backend = config::StoreBackend::File;
        cfg.store.path = path.clone();
    }
    if args.ephemeral {
        cfg.store.backend = config::StoreBackend::Memory;
    }
    if let Some(dir) = &args.journal_dir {
        cfg.journal.dir = dir.clone();
    }
    if args.no_seed {
        cfg.seed.enabled = false;
    }

    if let Err(errors) = cfg.validate() {
        let lines: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
        return Err(anyhow::anyhow!(
            "Invalid configuration:\n  {}",
            lines.join("\n  ")
        ));
    }

    let backend: Rc<dyn store::Store> = match cfg.store.backend {
        config::StoreBackend::File => Rc::new(store::FileStore::open(&root.join(&cfg.store.path))?),
        config::StoreBackend::Memory => Rc::new(store::MemoryStore::new()),
    };
    let records = store::Records::new(backend);

    let accounts = accounts::Accounts::new(records.clone());
    if cfg.seed.enabled && accounts.seed()? && args.debug {
        eprintln!("[DEBUG] Seeded demo accounts");
    }

    if args.debug {
        eprintln!("[DEBUG] Store: {} ({})", records.describe(), cfg.store.backend.as_str());
        eprintln!(
            "[DEBUG] Users: {} students, {} teachers, {} admins",
            accounts.students()?.len(),
            accounts.teachers()?.len(),
            accounts.admins()?.len()
        );
        eprintln!("[DEBUG] Session TTL: {:?}", cfg.session.ttl_minutes);
        eprintln!(
            "[DEBUG] Double booking allowed: {}",
            cfg.bookings.allow_double_booking
        );
    }

    let run_id = uuid::Uuid::new_v4().to_string();
    let events = Rc::new(events::EventBus::new());

    let journal = if cfg.journal.enabled {
        open_journal(&root.join(&cfg.journal.dir), &run_id)
    } else {
        None
    };
    if let Some(journal) = &journal {
        if let Err(e) = journal.borrow_mut().run_start(&records.describe()) {
            eprintln!("Warning: failed to write journal: {}", e);
        }
        let sink = Rc::clone(journal);
        events.subscribe(move |event| {
            if let Err(e) = sink.borrow_mut().booking_event(event) {
                eprintln!("Warning: failed to write journal: {}", e);
            }
        });
    }

    let mut ctx = cli::Context::new(
        run_id,
        records,
        events,
        cfg.session.ttl(),
        cfg.bookings.allow_double_booking,
        journal,
    );

    if args.commands.is_empty() {
        let history = root.join(config::APP_DIR).join("history");
        if history.parent().is_some_and(|p| p.exists()) {
            ctx.history_path = Some(history);
        }
        cli::run_repl(ctx)
    } else {
        cli::run_once(&ctx, &args.commands)
    }
}

/// A journal that cannot be opened is reported and skipped
fn open_journal(dir: &std::path::Path, run_id: &str) -> Option<Rc<RefCell<journal::Journal>>> {
    if let Err(e) = std::fs::create_dir_all(dir) {
        eprintln!("Warning: failed to create journal dir {}: {}", dir.display(), e);
        return None;
    }
    let path = dir.join(format!("{}.jsonl", run_id));
    match journal::Journal::new(&path, run_id) {
        Ok(journal) => Some(Rc::new(RefCell::new(journal))),
        Err(e) => {
            eprintln!("Warning: failed to open journal {}: {}", path.display(), e);
            None
        }
    }
}
