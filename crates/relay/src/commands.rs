use std::fmt::Write as _;

use serde::Deserialize;

use exam_core::time::format_minutes_seconds;

use crate::error::NotifyError;
use crate::format::{NAME_CHARS, TITLE_CHARS, clip, display_time, escape_html};
use crate::recent::RecentSubmissions;
use crate::telegram::BotApi;

const LISTED_SUBMISSIONS: usize = 5;

//
// ─── UPDATES ───────────────────────────────────────────────────────────────────
//

/// The parts of a bot webhook update the relay reads.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Update {
    #[serde(default)]
    pub message: Option<Message>,
    #[serde(default)]
    pub callback_query: Option<CallbackQuery>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub chat: Chat,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CallbackQuery {
    pub id: String,
}

//
// ─── COMMANDS ──────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BotCommand {
    Start,
    Help,
    Submissions,
    Stats,
    Unknown(String),
}

impl BotCommand {
    /// Parse a chat message. Returns `None` for text that is not a command.
    ///
    /// `@botname` suffixes and trailing arguments are ignored.
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        let word = text.split_whitespace().next()?;
        let name = word.strip_prefix('/')?;
        let name = name.split('@').next().unwrap_or(name);
        Some(match name.to_ascii_lowercase().as_str() {
            "start" => BotCommand::Start,
            "help" => BotCommand::Help,
            "submissions" => BotCommand::Submissions,
            "stats" => BotCommand::Stats,
            _ => BotCommand::Unknown(name.to_owned()),
        })
    }

    /// The HTML reply for this command.
    #[must_use]
    pub fn reply(&self, recent: &RecentSubmissions) -> String {
        match self {
            BotCommand::Start => concat!(
                "Welcome to the IELTS Reading Master bot! 📚\n\n",
                "You will be notified here when students submit practice tests.\n\n",
                "Available commands:\n",
                "/help - Show help message\n",
                "/submissions - View recent submissions\n",
                "/stats - View submission statistics"
            )
            .to_owned(),
            BotCommand::Help => concat!(
                "<b>IELTS Reading Master bot</b>\n\n",
                "Student submissions from the practice platform are forwarded here.\n\n",
                "/submissions - The latest submissions since the relay started\n",
                "/stats - Totals and averages over those submissions"
            )
            .to_owned(),
            BotCommand::Submissions => submissions_reply(recent),
            BotCommand::Stats => stats_reply(recent),
            BotCommand::Unknown(_) => "Unknown command. Use /help for available commands.".to_owned(),
        }
    }
}

fn submissions_reply(recent: &RecentSubmissions) -> String {
    let latest = match recent.latest(LISTED_SUBMISSIONS) {
        Ok(latest) => latest,
        Err(err) => return format!("Submissions are unavailable: {err}"),
    };
    if latest.is_empty() {
        return "No submissions received since the relay started.".to_owned();
    }

    let mut reply = String::from("<b>Recent submissions</b>\n\n");
    for (index, entry) in latest.iter().enumerate() {
        let test = entry.test_title.as_deref().unwrap_or(&entry.test_id);
        let total = entry
            .total_questions
            .map_or_else(|| "?".to_owned(), |total| total.to_string());
        let _ = write!(
            reply,
            "{}. {} ({})\n   Test: {}\n   Answered: {}/{total}\n   Time spent: {}\n   Received: {}\n\n",
            index + 1,
            escape_html(&clip(&entry.student_name, NAME_CHARS)),
            escape_html(&clip(
                entry.student_class.as_deref().unwrap_or("Not specified"),
                NAME_CHARS
            )),
            escape_html(&clip(test, TITLE_CHARS)),
            entry.answered_questions,
            format_minutes_seconds(entry.time_spent),
            display_time(None, entry.received_at),
        );
    }
    reply.trim_end().to_owned()
}

fn stats_reply(recent: &RecentSubmissions) -> String {
    let stats = match recent.stats() {
        Ok(stats) => stats,
        Err(err) => return format!("Statistics are unavailable: {err}"),
    };
    let last = stats
        .last_received
        .map_or_else(|| "never".to_owned(), |at| display_time(None, at));
    format!(
        "<b>Submission statistics</b>\n\n📊 Submissions: {}\n👥 Students: {}\n📝 Tests: {}\n✅ Avg answered: {}\n⏱️ Avg time spent: {}\n🕒 Last received: {last}",
        stats.submissions,
        stats.students,
        stats.tests,
        stats.average_answered,
        format_minutes_seconds(stats.average_time_spent),
    )
}

/// React to one webhook update.
///
/// # Errors
///
/// Returns `NotifyError` if the reply or callback acknowledgement fails.
pub async fn handle_update(
    update: &Update,
    bot: &dyn BotApi,
    recent: &RecentSubmissions,
) -> Result<(), NotifyError> {
    if let Some(message) = &update.message {
        let Some(command) = message.text.as_deref().and_then(BotCommand::parse) else {
            return Ok(());
        };
        tracing::info!(chat_id = message.chat.id, command = ?command, "bot command");
        let reply = command.reply(recent);
        bot.send_message(&message.chat.id.to_string(), &reply).await?;
    } else if let Some(callback) = &update.callback_query {
        bot.answer_callback_query(&callback.id).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_commands_with_bot_suffix_and_args() {
        assert_eq!(BotCommand::parse("/start"), Some(BotCommand::Start));
        assert_eq!(BotCommand::parse("/stats@ielts_bot"), Some(BotCommand::Stats));
        assert_eq!(
            BotCommand::parse("/submissions 10 more"),
            Some(BotCommand::Submissions)
        );
        assert_eq!(
            BotCommand::parse("/students"),
            Some(BotCommand::Unknown("students".into()))
        );
        assert_eq!(BotCommand::parse("hello"), None);
        assert_eq!(BotCommand::parse("   "), None);
    }

    #[test]
    fn empty_log_replies() {
        let recent = RecentSubmissions::new(4);
        assert_eq!(
            BotCommand::Submissions.reply(&recent),
            "No submissions received since the relay started."
        );
        assert!(BotCommand::Stats.reply(&recent).contains("Last received: never"));
        assert!(BotCommand::Unknown("x".into()).reply(&recent).starts_with("Unknown command"));
    }

    #[test]
    fn update_parses_message_and_callback() {
        let update: Update =
            serde_json::from_str(r#"{"update_id":1,"message":{"chat":{"id":42},"text":"/help"}}"#)
                .unwrap();
        assert_eq!(update.message.unwrap().chat.id, 42);

        let update: Update =
            serde_json::from_str(r#"{"update_id":2,"callback_query":{"id":"cb1","data":"x"}}"#)
                .unwrap();
        assert_eq!(update.callback_query.unwrap().id, "cb1");
    }
}
