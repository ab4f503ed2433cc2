use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// A submission as posted by clients.
///
/// Parsing is lenient: ids may be strings or numbers, answers and flagged
/// entries may be any scalar, and every field may be absent. Use
/// [`RelaySubmission::missing_fields`] to enforce the required ones.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelaySubmission {
    #[serde(default, deserialize_with = "loose_text")]
    pub student_name: Option<String>,
    #[serde(default, deserialize_with = "loose_text")]
    pub student_class: Option<String>,
    #[serde(default, deserialize_with = "loose_text")]
    pub test_id: Option<String>,
    #[serde(default, deserialize_with = "loose_text")]
    pub test_title: Option<String>,
    #[serde(default, deserialize_with = "loose_map")]
    pub answers: BTreeMap<String, String>,
    #[serde(default, deserialize_with = "loose_list")]
    pub flagged_questions: Vec<String>,
    #[serde(default, deserialize_with = "loose_count")]
    pub total_questions: Option<u64>,
    #[serde(default, deserialize_with = "loose_count")]
    pub answered_questions: Option<u64>,
    #[serde(default, deserialize_with = "loose_text")]
    pub timestamp: Option<String>,
    #[serde(default, deserialize_with = "loose_count")]
    pub time_spent: Option<u64>,
}

impl RelaySubmission {
    /// Names of required fields that are absent or blank.
    #[must_use]
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if is_blank(self.student_name.as_deref()) {
            missing.push("studentName");
        }
        if is_blank(self.test_id.as_deref()) {
            missing.push("testId");
        }
        missing
    }

    #[must_use]
    pub fn student_name(&self) -> &str {
        self.student_name.as_deref().map_or("", str::trim)
    }

    /// The class, if one was given.
    #[must_use]
    pub fn student_class(&self) -> Option<&str> {
        self.student_class
            .as_deref()
            .map(str::trim)
            .filter(|class| !class.is_empty())
    }

    #[must_use]
    pub fn test_id(&self) -> &str {
        self.test_id.as_deref().map_or("", str::trim)
    }

    /// `answeredQuestions`, or the number of answers when it is missing.
    #[must_use]
    pub fn answered(&self) -> u64 {
        self.answered_questions
            .unwrap_or_else(|| self.answers.len() as u64)
    }

    /// Answers ordered by question number; non-numeric keys sort last.
    #[must_use]
    pub fn sorted_answers(&self) -> Vec<(&str, &str)> {
        let mut answers: Vec<_> = self
            .answers
            .iter()
            .map(|(question, answer)| (question.as_str(), answer.as_str()))
            .collect();
        answers.sort_by_key(|(question, _)| (question.trim().parse::<u64>().unwrap_or(u64::MAX), *question));
        answers
    }
}

fn is_blank(value: Option<&str>) -> bool {
    value.is_none_or(|text| text.trim().is_empty())
}

fn scalar_text(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(text) => Some(text),
        other => Some(other.to_string()),
    }
}

fn loose_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Value>::deserialize(deserializer)?.and_then(scalar_text))
}

fn loose_map<'de, D>(deserializer: D) -> Result<BTreeMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<BTreeMap<String, Value>>::deserialize(deserializer)?.unwrap_or_default();
    Ok(raw
        .into_iter()
        .filter_map(|(question, answer)| scalar_text(answer).map(|answer| (question, answer)))
        .collect())
}

fn loose_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Vec<Value>>::deserialize(deserializer)?.unwrap_or_default();
    Ok(raw.into_iter().filter_map(scalar_text).collect())
}

fn loose_count<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(|value| match value {
        Value::Number(number) => number
            .as_u64()
            .or_else(|| number.as_f64().filter(|n| *n >= 0.0).map(|n| n as u64)),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }))
}
