use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Opaque identifier of a practice test.
///
/// Numeric ids from older payloads are carried as their decimal text.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TestId(String);

impl TestId {
    /// Creates a new `TestId`, trimming surrounding whitespace.
    ///
    /// # Errors
    ///
    /// Returns `ParseIdError` if the id is blank.
    pub fn new(id: impl Into<String>) -> Result<Self, ParseIdError> {
        let id = id.into();
        let trimmed = id.trim();
        if trimmed.is_empty() {
            return Err(ParseIdError::new("TestId"));
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Returns the underlying identifier text
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<u64> for TestId {
    fn from(id: u64) -> Self {
        Self(id.to_string())
    }
}

/// 1-based question number within a test
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QuestionNumber(u32);

impl QuestionNumber {
    /// The first question of every test.
    pub const FIRST: Self = Self(1);

    /// Creates a new `QuestionNumber`
    #[must_use]
    pub fn new(number: u32) -> Self {
        Self(number)
    }

    /// Returns the underlying u32 value
    #[must_use]
    pub fn value(&self) -> u32 {
        self.0
    }

    /// The following question number, saturating at `u32::MAX`.
    #[must_use]
    pub fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }

    /// The preceding question number, saturating at zero (which is never valid).
    #[must_use]
    pub fn previous(self) -> Self {
        Self(self.0.saturating_sub(1))
    }
}

impl fmt::Debug for TestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TestId({})", self.0)
    }
}

impl fmt::Debug for QuestionNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Q{}", self.0)
    }
}

// ─── Display Implementations ───────────────────────────────────────────────────

impl fmt::Display for TestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for QuestionNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ─── FromStr Implementations ───────────────────────────────────────────────────

/// Error type for parsing ID from string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseIdError {
    kind: &'static str,
}

impl ParseIdError {
    fn new(kind: &'static str) -> Self {
        Self { kind }
    }
}

impl fmt::Display for ParseIdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to parse {} from string", self.kind)
    }
}

impl std::error::Error for ParseIdError {}

impl FromStr for TestId {
    type Err = ParseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TestId::new(s)
    }
}

impl FromStr for QuestionNumber {
    type Err = ParseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<u32>()
            .map(QuestionNumber::new)
            .map_err(|_| ParseIdError::new("QuestionNumber"))
    }
}

// ─── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_trims_and_rejects_blank() {
        assert_eq!(TestId::new("  academic-3 ").unwrap().as_str(), "academic-3");
        assert!(TestId::new("   ").is_err());
    }

    #[test]
    fn test_id_from_number_uses_decimal_text() {
        assert_eq!(TestId::from(7).to_string(), "7");
    }

    #[test]
    fn question_number_from_str() {
        let q: QuestionNumber = " 12".parse().unwrap();
        assert_eq!(q, QuestionNumber::new(12));
        assert!("twelve".parse::<QuestionNumber>().is_err());
    }

    #[test]
    fn question_number_steps_saturate() {
        assert_eq!(QuestionNumber::new(0).previous(), QuestionNumber::new(0));
        assert_eq!(QuestionNumber::FIRST.next(), QuestionNumber::new(2));
    }

    #[test]
    fn question_number_serializes_as_map_key() {
        let mut map = std::collections::BTreeMap::new();
        map.insert(QuestionNumber::new(3), "B".to_string());
        let json = serde_json::to_string(&map).unwrap();
        assert_eq!(json, r#"{"3":"B"}"#);
        let back: std::collections::BTreeMap<QuestionNumber, String> =
            serde_json::from_str(&json).unwrap();
        assert_eq!(back, map);
    }
}
