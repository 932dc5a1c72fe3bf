//! Step keywords and test outcome status

use crate::error::StoryError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Gherkin step keyword
///
/// `Given`, `When` and `Then` are the *primary* keywords. A story stores a
/// repeated primary keyword as `And`; see the story builder for the rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Keyword {
    /// Precondition
    Given,
    /// Action
    When,
    /// Outcome
    Then,
    /// Continuation of the previous keyword
    And,
    /// Negative continuation of the previous keyword
    But,
}

impl Keyword {
    /// All keywords in declaration order
    pub const ALL: [Keyword; 5] = [
        Keyword::Given,
        Keyword::When,
        Keyword::Then,
        Keyword::And,
        Keyword::But,
    ];

    /// Check if this is a primary keyword (Given, When, Then)
    pub fn is_primary(&self) -> bool {
        matches!(self, Keyword::Given | Keyword::When | Keyword::Then)
    }

    /// Get string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Keyword::Given => "Given",
            Keyword::When => "When",
            Keyword::Then => "Then",
            Keyword::And => "And",
            Keyword::But => "But",
        }
    }
}

impl std::fmt::Display for Keyword {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Keyword {
    type Err = StoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Keyword::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| StoryError::InvalidKeyword(s.to_string()))
    }
}

/// Outcome of a finished test
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    /// Test passed
    Pass,
    /// Test failed
    Fail,
    /// Test was skipped
    Skip,
}

impl Status {
    /// Derive the status from host flags. Failure takes precedence over skip.
    pub fn from_flags(failed: bool, skipped: bool) -> Self {
        if failed {
            Status::Fail
        } else if skipped {
            Status::Skip
        } else {
            Status::Pass
        }
    }

    /// Get string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Pass => "pass",
            Status::Fail => "fail",
            Status::Skip => "skip",
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Status {
    type Err = StoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pass" => Ok(Status::Pass),
            "fail" => Ok(Status::Fail),
            "skip" => Ok(Status::Skip),
            other => Err(StoryError::InvalidStatus(other.to_string())),
        }
    }
}
