use std::fmt;

use exam_core::model::QuestionNumber;
use services::SessionCommand;

/// One line typed at the practice prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Empty,
    Help,
    Status,
    Quit,
    Command(SessionCommand),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputError {
    Unknown(String),
    MissingArgument {
        command: &'static str,
        what: &'static str,
    },
    InvalidQuestion(String),
}

impl fmt::Display for InputError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputError::Unknown(word) => write!(f, "unknown command: {word} (type `help`)"),
            InputError::MissingArgument { command, what } => {
                write!(f, "{command} needs {what}")
            }
            InputError::InvalidQuestion(raw) => write!(f, "not a question number: {raw}"),
        }
    }
}

impl std::error::Error for InputError {}

pub fn parse(line: &str) -> Result<Input, InputError> {
    let mut words = line.split_whitespace();
    let Some(head) = words.next() else {
        return Ok(Input::Empty);
    };

    let command = match head.to_ascii_lowercase().as_str() {
        "h" | "help" | "?" => return Ok(Input::Help),
        "s" | "status" => return Ok(Input::Status),
        "q" | "quit" | "exit" => return Ok(Input::Quit),
        "start" => SessionCommand::Start,
        "pause" => SessionCommand::Pause,
        "p" | "toggle" => SessionCommand::Toggle,
        "a" | "answer" => {
            let number = question(words.next(), "answer")?;
            let token = words.collect::<Vec<_>>().join(" ");
            if token.is_empty() {
                return Err(InputError::MissingArgument {
                    command: "answer",
                    what: "an answer",
                });
            }
            SessionCommand::SelectAnswer { number, token }
        }
        "f" | "flag" => SessionCommand::ToggleFlag(question(words.next(), "flag")?),
        "g" | "go" => SessionCommand::Navigate(question(words.next(), "go")?),
        "n" | "next" => SessionCommand::Next,
        "b" | "prev" | "previous" => SessionCommand::Previous,
        "save" => SessionCommand::SaveDraft,
        "submit" => SessionCommand::Submit,
        "reset" => SessionCommand::Reset,
        "online" => SessionCommand::ConnectivityChanged { online: true },
        "offline" => SessionCommand::ConnectivityChanged { online: false },
        "me" | "identity" => {
            let class = words.next().ok_or(InputError::MissingArgument {
                command: "me",
                what: "a class and a name",
            })?;
            let name = words.collect::<Vec<_>>().join(" ");
            if name.is_empty() {
                return Err(InputError::MissingArgument {
                    command: "me",
                    what: "a name after the class",
                });
            }
            SessionCommand::UpdateProfile {
                name,
                class: class.to_owned(),
            }
        }
        _ => return Err(InputError::Unknown(head.to_owned())),
    };
    Ok(Input::Command(command))
}

fn question(raw: Option<&str>, command: &'static str) -> Result<QuestionNumber, InputError> {
    let raw = raw.ok_or(InputError::MissingArgument {
        command,
        what: "a question number",
    })?;
    raw.parse()
        .map_err(|_| InputError::InvalidQuestion(raw.to_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn answers_keep_multi_word_tokens() {
        assert_eq!(
            parse("a 7 NOT GIVEN").unwrap(),
            Input::Command(SessionCommand::SelectAnswer {
                number: QuestionNumber::new(7),
                token: "NOT GIVEN".into(),
            })
        );
    }

    #[test]
    fn identity_takes_class_then_name() {
        assert_eq!(
            parse("me 10B Jane Doe").unwrap(),
            Input::Command(SessionCommand::UpdateProfile {
                name: "Jane Doe".into(),
                class: "10B".into(),
            })
        );
        assert!(matches!(
            parse("me 10B"),
            Err(InputError::MissingArgument { command: "me", .. })
        ));
    }

    #[test]
    fn navigation_and_meta_commands() {
        assert_eq!(parse("   ").unwrap(), Input::Empty);
        assert_eq!(parse("Q").unwrap(), Input::Quit);
        assert_eq!(parse("n").unwrap(), Input::Command(SessionCommand::Next));
        assert_eq!(
            parse("flag 3").unwrap(),
            Input::Command(SessionCommand::ToggleFlag(QuestionNumber::new(3)))
        );
        assert_eq!(
            parse("offline").unwrap(),
            Input::Command(SessionCommand::ConnectivityChanged { online: false })
        );
    }

    #[test]
    fn rejects_bad_input() {
        assert_eq!(parse("go x"), Err(InputError::InvalidQuestion("x".into())));
        assert!(matches!(parse("answer 2"), Err(InputError::MissingArgument { .. })));
        assert_eq!(parse("dance"), Err(InputError::Unknown("dance".into())));
    }
}
