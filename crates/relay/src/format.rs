use std::fmt::Write as _;

use chrono::{DateTime, Utc};

use exam_core::time::format_minutes_seconds;

use crate::submission::RelaySubmission;

const ANSWER_PREVIEW: usize = 10;
const ANSWERS_PER_LINE: usize = 5;
const FLAGGED_PREVIEW: usize = 40;

/// Per-field caps, in characters, so one message stays under the bot API's 4096 limit.
pub(crate) const NAME_CHARS: usize = 80;
pub(crate) const TITLE_CHARS: usize = 120;
const TOKEN_CHARS: usize = 24;

/// Keep at most `max_chars` characters, marking the cut with an ellipsis.
#[must_use]
pub fn clip(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}…", text[..cut].trim_end()),
        None => text.to_owned(),
    }
}

/// Escape text for Telegram's HTML parse mode.
#[must_use]
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            other => escaped.push(other),
        }
    }
    escaped
}

/// Render `timestamp` as UTC, falling back to `received_at` when it is unreadable.
#[must_use]
pub fn display_time(timestamp: Option<&str>, received_at: DateTime<Utc>) -> String {
    let at = timestamp
        .and_then(|raw| DateTime::parse_from_rfc3339(raw.trim()).ok())
        .map_or(received_at, |parsed| parsed.with_timezone(&Utc));
    at.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

/// The teacher-facing summary of one submission.
#[must_use]
pub fn submission_message(
    submission: &RelaySubmission,
    submission_id: &str,
    received_at: DateTime<Utc>,
) -> String {
    let mut message = String::from("<b>📚 IELTS READING SUBMISSION</b>\n\n");

    let class = submission.student_class().unwrap_or("Not specified");
    let _ = writeln!(
        message,
        "👤 <b>Student:</b> {}",
        escape_html(&clip(submission.student_name(), NAME_CHARS))
    );
    let _ = writeln!(message, "📚 <b>Class:</b> {}", escape_html(&clip(class, NAME_CHARS)));
    let test_id = escape_html(&clip(submission.test_id(), TOKEN_CHARS));
    let test = match submission.test_title.as_deref().map(str::trim) {
        Some(title) if !title.is_empty() => {
            format!("{} (#{test_id})", escape_html(&clip(title, TITLE_CHARS)))
        }
        _ => format!("#{test_id}"),
    };
    let _ = writeln!(message, "📝 <b>Test:</b> {test}");
    let _ = writeln!(
        message,
        "⏰ <b>Submitted:</b> {}",
        display_time(submission.timestamp.as_deref(), received_at)
    );
    let total = submission
        .total_questions
        .map_or_else(|| "?".to_owned(), |total| total.to_string());
    let _ = writeln!(
        message,
        "✅ <b>Questions answered:</b> {}/{total}",
        submission.answered()
    );

    let answers = submission.sorted_answers();
    if !answers.is_empty() {
        message.push_str("\n<b>Answers Summary:</b>\n");
        let preview: Vec<_> = answers.iter().take(ANSWER_PREVIEW).collect();
        for line in preview.chunks(ANSWERS_PER_LINE) {
            let rendered: Vec<_> = line
                .iter()
                .map(|(question, answer)| {
                    format!(
                        "Q{}: {}",
                        escape_html(&clip(question, TOKEN_CHARS)),
                        escape_html(&clip(answer, TOKEN_CHARS))
                    )
                })
                .collect();
            message.push_str(&rendered.join("  "));
            message.push('\n');
        }
        if answers.len() > ANSWER_PREVIEW {
            let _ = writeln!(message, "... and {} more answers", answers.len() - ANSWER_PREVIEW);
        }
    }

    if !submission.flagged_questions.is_empty() {
        let mut flagged: Vec<_> = submission
            .flagged_questions
            .iter()
            .take(FLAGGED_PREVIEW)
            .map(|question| escape_html(&clip(question, TOKEN_CHARS)))
            .collect();
        if submission.flagged_questions.len() > FLAGGED_PREVIEW {
            flagged.push("…".to_owned());
        }
        let _ = write!(message, "\n🚩 <b>Flagged questions:</b> {}\n", flagged.join(", "));
    }

    let _ = write!(
        message,
        "\n📊 <b>Time spent:</b> {}\n\n<i>Submission ID: {}</i>",
        format_minutes_seconds(submission.time_spent.unwrap_or(0)),
        escape_html(submission_id)
    );
    message
}
