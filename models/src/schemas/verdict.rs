use std::fmt;

use serde::{Deserialize, Serialize};

/// Judge classification of a submission.
///
/// Unrecognised strings are kept verbatim in `Other` so nothing is lost when
/// the judge adds verdicts.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Verdict {
    /// Not judged yet, reported by the judge as a missing or empty verdict.
    #[default]
    Pending,
    Testing,
    Submitted,
    Ok,
    WrongAnswer,
    TimeLimitExceeded,
    MemoryLimitExceeded,
    RuntimeError,
    CompilationError,
    Other(String),
}

impl Verdict {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Pending => "",
            Self::Testing => "TESTING",
            Self::Submitted => "SUBMITTED",
            Self::Ok => "OK",
            Self::WrongAnswer => "WRONG_ANSWER",
            Self::TimeLimitExceeded => "TIME_LIMIT_EXCEEDED",
            Self::MemoryLimitExceeded => "MEMORY_LIMIT_EXCEEDED",
            Self::RuntimeError => "RUNTIME_ERROR",
            Self::CompilationError => "COMPILATION_ERROR",
            Self::Other(raw) => raw,
        }
    }

    /// Still being judged; must be re-checked on a later poll.
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending | Self::Testing | Self::Submitted)
    }

    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Ok)
    }

    /// Outcomes that cost time in a single-player room.
    pub fn is_penalized(&self) -> bool {
        matches!(
            self,
            Self::WrongAnswer | Self::TimeLimitExceeded | Self::MemoryLimitExceeded | Self::RuntimeError
        )
    }
}

impl From<&str> for Verdict {
    fn from(raw: &str) -> Self {
        match raw {
            "" => Self::Pending,
            "TESTING" => Self::Testing,
            "SUBMITTED" => Self::Submitted,
            "OK" => Self::Ok,
            "WRONG_ANSWER" => Self::WrongAnswer,
            "TIME_LIMIT_EXCEEDED" => Self::TimeLimitExceeded,
            "MEMORY_LIMIT_EXCEEDED" => Self::MemoryLimitExceeded,
            "RUNTIME_ERROR" => Self::RuntimeError,
            "COMPILATION_ERROR" => Self::CompilationError,
            other => Self::Other(other.to_owned()),
        }
    }
}

impl From<String> for Verdict {
    fn from(raw: String) -> Self {
        Self::from(raw.as_str())
    }
}

impl From<Verdict> for String {
    fn from(verdict: Verdict) -> Self {
        match verdict {
            Verdict::Other(raw) => raw,
            known => known.as_str().to_owned(),
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of a user's recent judge activity, most recent first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JudgeVerdict {
    pub submission_id: i64,
    /// Empty when the judge reports no usable contest/index pair.
    pub problem_id: String,
    pub verdict: Verdict,
}
