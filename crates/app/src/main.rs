mod console;
mod input;

use std::fmt;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

use exam_core::model::{TestId, TestKind, TestPaper};
use services::{AppServices, Clock, IntervalTicks, Notifier, SessionCommand, TickSource};

use console::ConsoleNotifier;
use input::Input;

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidNumber { flag: &'static str, raw: String },
    InvalidTestId { raw: String },
    InvalidKind { raw: String },
    InvalidDbUrl { raw: String },
    InvalidBand { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidNumber { flag, raw } => write!(f, "invalid {flag} value: {raw}"),
            ArgsError::InvalidTestId { raw } => write!(f, "invalid --test-id value: {raw:?}"),
            ArgsError::InvalidKind { raw } => {
                write!(f, "invalid --kind value: {raw} (academic, general or practice)")
            }
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidBand { raw } => write!(f, "invalid --band value: {raw}"),
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

fn require_number(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<u32, ArgsError> {
    let raw = require_value(args, flag)?;
    match raw.trim().parse::<u32>() {
        Ok(value) if value > 0 => Ok(value),
        _ => Err(ArgsError::InvalidNumber { flag, raw }),
    }
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p app -- practice [--db <sqlite_url>] [--relay-url <url>] [--offline]");
    eprintln!("                               [--test-id <id>] [--title <title>] [--kind <kind>]");
    eprintln!("                               [--questions <n>] [--minutes <n>]");
    eprintln!("  cargo run -p app -- sync     [--db <sqlite_url>] [--relay-url <url>]");
    eprintln!("  cargo run -p app -- profile  [--db <sqlite_url>] [--name <name>] [--class <class>]");
    eprintln!("                               [--band <1.0-9.0>] [--module <kind>]");
    eprintln!();
    eprintln!("Defaults for practice:");
    eprintln!("  --db sqlite://exam.sqlite3");
    eprintln!("  --relay-url http://127.0.0.1:3000");
    eprintln!("  --test-id 1 --title \"Academic Reading Test 1\" --kind academic");
    eprintln!("  --questions 40 --minutes 60");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  EXAM_DB_URL, EXAM_RELAY_URL, RUST_LOG");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Practice,
    Sync,
    Profile,
}

impl Command {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "practice" => Some(Self::Practice),
            "sync" => Some(Self::Sync),
            "profile" => Some(Self::Profile),
            _ => None,
        }
    }
}

struct Args {
    db_url: String,
    relay_url: String,
    offline: bool,
    test_id: TestId,
    title: String,
    kind: TestKind,
    questions: u32,
    minutes: u32,
    name: Option<String>,
    class: Option<String>,
    band: Option<f32>,
    module: Option<TestKind>,
}

impl Args {
    fn from_env() -> Self {
        let db_url = std::env::var("EXAM_DB_URL")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .map_or_else(|| "sqlite://exam.sqlite3".into(), normalize_sqlite_url);
        let relay_url = std::env::var("EXAM_RELAY_URL")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| "http://127.0.0.1:3000".into());
        Self {
            db_url,
            relay_url,
            offline: false,
            test_id: TestId::from(1),
            title: "Academic Reading Test 1".into(),
            kind: TestKind::Academic,
            questions: 40,
            minutes: 60,
            name: None,
            class: None,
            band: None,
            module: None,
        }
    }

    fn parse(command: Command, args: &mut impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        let mut parsed = Self::from_env();

        while let Some(arg) = args.next() {
            match (command, arg.as_str()) {
                (_, "--db") => {
                    let value = require_value(args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    parsed.db_url = normalize_sqlite_url(value);
                }
                (Command::Practice | Command::Sync, "--relay-url") => {
                    parsed.relay_url = require_value(args, "--relay-url")?;
                }
                (Command::Practice, "--offline") => parsed.offline = true,
                (Command::Practice, "--test-id") => {
                    let value = require_value(args, "--test-id")?;
                    parsed.test_id = TestId::new(value.clone())
                        .map_err(|_| ArgsError::InvalidTestId { raw: value })?;
                }
                (Command::Practice, "--title") => {
                    parsed.title = require_value(args, "--title")?;
                }
                (Command::Practice, "--kind") => {
                    let value = require_value(args, "--kind")?;
                    parsed.kind = value
                        .parse()
                        .map_err(|_| ArgsError::InvalidKind { raw: value })?;
                }
                (Command::Practice, "--questions") => {
                    parsed.questions = require_number(args, "--questions")?;
                }
                (Command::Practice, "--minutes") => {
                    parsed.minutes = require_number(args, "--minutes")?;
                }
                (Command::Profile, "--name") => {
                    parsed.name = Some(require_value(args, "--name")?);
                }
                (Command::Profile, "--class") => {
                    parsed.class = Some(require_value(args, "--class")?);
                }
                (Command::Profile, "--band") => {
                    let value = require_value(args, "--band")?;
                    let band = value
                        .trim()
                        .parse::<f32>()
                        .map_err(|_| ArgsError::InvalidBand { raw: value.clone() })?;
                    parsed.band = Some(band);
                }
                (Command::Profile, "--module") => {
                    let value = require_value(args, "--module")?;
                    parsed.module = Some(
                        value
                            .parse()
                            .map_err(|_| ArgsError::InvalidKind { raw: value })?,
                    );
                }
                (_, "--help" | "-h") => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(parsed)
    }

    fn paper(&self) -> Result<TestPaper, exam_core::model::TestPaperError> {
        TestPaper::new(
            self.test_id.clone(),
            self.title.clone(),
            self.kind,
            self.minutes.saturating_mul(60),
            self.questions,
        )
    }
}

fn normalize_sqlite_url(raw: String) -> String {
    if raw == "sqlite::memory:" || raw.starts_with("sqlite://") {
        return raw;
    }

    let trimmed = raw.trim().to_string();
    let path_str = trimmed
        .strip_prefix("sqlite:")
        .unwrap_or(trimmed.as_str())
        .to_string();
    let path = std::path::Path::new(&path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| std::path::PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

fn prepare_sqlite_file(db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    if db_url == "sqlite::memory:" {
        return Ok(());
    }

    let path = db_url
        .strip_prefix("sqlite://")
        .ok_or_else(|| ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        })?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        }
        .into());
    }

    let path = std::path::Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)?;
    }
    Ok(())
}

fn init_tracing() {
    // The prompt shares the terminal, so only warnings show unless RUST_LOG says otherwise.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn practice(services: AppServices, args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let paper = args.paper()?;
    let mut controller = services.controller().with_online(!args.offline);
    if let Some(report) = controller.startup().await? {
        console::print_resync(&report);
    }

    let restored = controller.select_test(paper).await?;
    if restored.restored_answers > 0 || restored.restored_flags > 0 {
        println!(
            "Restored {} answer(s) and {} flag(s) from your last draft.",
            restored.restored_answers, restored.restored_flags
        );
    }
    if !controller.profile().identity().is_complete() {
        println!("Tip: set your details with `me <class> <name>` before submitting.");
    }
    console::print_progress(controller.progress().as_ref());
    println!("Type `start` to begin, `help` for commands.");

    let mut ticks = IntervalTicks::every_second();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                match input::parse(&line) {
                    Ok(Input::Empty) => {}
                    Ok(Input::Quit) => break,
                    Ok(Input::Help) => console::print_help(),
                    Ok(Input::Status) => console::print_progress(controller.progress().as_ref()),
                    Ok(Input::Command(command)) => match controller.dispatch(command).await {
                        Ok(outcome) => console::print_outcome(&outcome, controller.progress().as_ref()),
                        Err(err) => console::print_error(&err),
                    },
                    Err(err) => console::print_error(&err),
                }
            }
            () = ticks.next_tick() => {
                match controller.tick().await {
                    Ok(outcome) => {
                        if !matches!(outcome, services::CommandOutcome::Unchanged) {
                            console::print_outcome(&outcome, controller.progress().as_ref());
                        }
                    }
                    Err(err) => console::print_error(&err),
                }
            }
        }
    }

    let has_work = controller
        .session()
        .is_some_and(|session| session.state().is_open() && session.answered_count() > 0);
    if has_work {
        controller.dispatch(SessionCommand::SaveDraft).await?;
    }
    Ok(())
}

async fn sync(services: AppServices) -> Result<(), Box<dyn std::error::Error>> {
    let pending = services.persistence().list_pending().await?.len();
    if pending == 0 {
        println!("No pending submissions.");
        return Ok(());
    }
    let report = services.pipeline().resync().await?;
    console::print_resync(&report);
    if let Some(at) = services.persistence().last_sync().await {
        println!("Last sync: {}", at.to_rfc3339());
    }
    Ok(())
}

async fn profile(services: AppServices, args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let persistence = services.persistence();
    let mut profile = persistence.load_profile().await;
    let mut edited = false;
    if args.name.is_some() || args.class.is_some() {
        let name = args.name.clone().unwrap_or_else(|| profile.name.clone());
        let class = args.class.clone().unwrap_or_else(|| profile.class.clone());
        profile.set_identity(name, class);
        edited = true;
    }
    if let Some(band) = args.band {
        profile.set_target_band(Some(band))?;
        edited = true;
    }
    if let Some(module) = args.module {
        profile.module = module;
        edited = true;
    }
    if edited {
        persistence.save_profile(&profile).await?;
    }

    let show = |value: &str| {
        if value.is_empty() {
            "<not set>".to_owned()
        } else {
            value.to_owned()
        }
    };
    println!("Name:  {}", show(&profile.name));
    println!("Class: {}", show(&profile.class));
    println!("Module: {}", profile.module);
    if let Some(band) = profile.target_band {
        println!("Target band: {band:.1}");
    }
    let drafts = persistence.saved_drafts().await?;
    if !drafts.is_empty() {
        let ids: Vec<_> = drafts.iter().map(TestId::as_str).collect();
        println!("Saved drafts: {}", ids.join(", "));
    }
    let completed = persistence.completed_tests().await;
    if !completed.is_empty() {
        let ids: Vec<_> = completed.iter().map(TestId::as_str).collect();
        println!("Completed tests: {}", ids.join(", "));
    }
    Ok(())
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();
    init_tracing();

    let mut argv: Vec<String> = std::env::args().skip(1).collect();

    // Default behavior: practice when no subcommand is provided.
    let cmd = match argv.first().map(String::as_str) {
        None => Command::Practice,
        Some("--help" | "-h") => {
            print_usage();
            return Ok(());
        }
        Some(first) if first.starts_with("--") => Command::Practice,
        Some(first) => Command::from_arg(first).ok_or_else(|| {
            eprintln!("unknown subcommand: {first}");
            print_usage();
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "unknown subcommand")
        })?,
    };
    if !argv.is_empty() && !argv[0].starts_with("--") {
        argv.remove(0);
    }

    let mut iter = argv.into_iter();
    let parsed = Args::parse(cmd, &mut iter).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    prepare_sqlite_file(&parsed.db_url)?;
    let notifier: Arc<dyn Notifier> = Arc::new(ConsoleNotifier);
    let services =
        AppServices::new_sqlite(&parsed.db_url, &parsed.relay_url, Clock::system(), notifier)
            .await?;
    tracing::debug!(db = %parsed.db_url, relay = %parsed.relay_url, "services ready");

    match cmd {
        Command::Practice => practice(services, &parsed).await,
        Command::Sync => sync(services).await,
        Command::Profile => profile(services, &parsed).await,
    }
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
