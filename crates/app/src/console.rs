use colored::Colorize;

use exam_core::model::SessionState;
use exam_core::time::format_clock;
use services::{CommandOutcome, Notice, NoticeLevel, Notifier, ResyncReport, SessionProgress};

/// Prints notices as coloured toast lines.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&self, notice: Notice) {
        let text = notice.to_string();
        let line = match notice.level() {
            NoticeLevel::Success => format!("✔ {text}").green(),
            NoticeLevel::Info => format!("ℹ {text}").cyan(),
            NoticeLevel::Warning => format!("⚠ {text}").yellow(),
            NoticeLevel::Error => format!("✖ {text}").red().bold(),
            NoticeLevel::Prompt => format!("➤ {text}").magenta().bold(),
        };
        println!("{line}");
    }
}

pub fn print_help() {
    println!("{}", "Commands".bold());
    println!("  start | pause | p            start, pause or toggle the timer");
    println!("  a <n> <answer>               answer question n (e.g. `a 3 TRUE`)");
    println!("  f <n>                        flag or unflag question n");
    println!("  g <n> | n | b                go to question n, next, previous");
    println!("  me <class> <name>            set the name and class used to submit");
    println!("  save | submit | reset        save a draft, submit, or clear answers");
    println!("  online | offline             change connectivity");
    println!("  s | help | q                 status, this help, quit");
}

fn state_label(state: SessionState) -> colored::ColoredString {
    match state {
        SessionState::NotStarted => "not started".normal(),
        SessionState::Active => "running".green(),
        SessionState::Paused => "paused".yellow(),
        SessionState::TimedOut => "time is up".red(),
        SessionState::Submitted => "submitted".cyan(),
    }
}

pub fn print_progress(progress: Option<&SessionProgress>) {
    let Some(progress) = progress else {
        println!("No test loaded.");
        return;
    };
    let flagged = if progress.flagged.is_empty() {
        "none".to_owned()
    } else {
        progress
            .flagged
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ")
    };
    println!(
        "{} [{}] {} left | question {}/{} | answered {}/{} | flagged: {}",
        progress.title.bold(),
        state_label(progress.state),
        format_clock(progress.remaining_secs),
        progress.current,
        progress.total,
        progress.answered,
        progress.total,
        flagged
    );
}

pub fn print_outcome(outcome: &CommandOutcome, progress: Option<&SessionProgress>) {
    match outcome {
        CommandOutcome::Unchanged => println!("{}", "Nothing changed.".dimmed()),
        CommandOutcome::Changed => print_progress(progress),
        CommandOutcome::Flagged { number, flagged } => {
            let verb = if *flagged { "flagged" } else { "unflagged" };
            println!("Question {number} {verb}.");
        }
        CommandOutcome::Ticked { remaining_secs } => print_tick(*remaining_secs),
        CommandOutcome::TimedOut => {
            println!("{}", "Set your details with `me <class> <name>`, then `submit`.".magenta());
        }
        CommandOutcome::Submitted(ack) => {
            if let Some(id) = &ack.submission_id {
                println!("Submission id: {}", id.bold());
            }
        }
        CommandOutcome::Queued => {}
        CommandOutcome::Resynced(report) => print_resync(report),
    }
}

/// Print the countdown at whole minutes and through the final ten seconds.
pub fn print_tick(remaining_secs: u32) {
    if remaining_secs % 60 == 0 || remaining_secs <= 10 {
        println!("{} {} remaining", "⏱".yellow(), format_clock(remaining_secs));
    }
}

pub fn print_resync(report: &ResyncReport) {
    if let Some(reason) = &report.halted {
        println!("{} {reason}", "Sync stopped:".yellow());
    }
}

pub fn print_error(err: &dyn std::error::Error) {
    eprintln!("{} {err}", "error:".red().bold());
}
