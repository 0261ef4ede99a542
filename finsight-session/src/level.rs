//! User expertise level.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::SessionError;

/// How much financial background the user has declared.
///
/// The set is closed: unknown strings are rejected when parsed, so every
/// downstream `match` is exhaustive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserLevel {
    #[default]
    Beginner,
    Intermediate,
    Advanced,
}

impl UserLevel {
    pub const ALL: [UserLevel; 3] = [Self::Beginner, Self::Intermediate, Self::Advanced];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Beginner => "beginner",
            Self::Intermediate => "intermediate",
            Self::Advanced => "advanced",
        }
    }
}

impl fmt::Display for UserLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UserLevel {
    type Err = SessionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "beginner" => Ok(Self::Beginner),
            "intermediate" => Ok(Self::Intermediate),
            "advanced" => Ok(Self::Advanced),
            _ => Err(SessionError::InvalidLevel(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_levels_case_insensitively() {
        assert_eq!("Advanced".parse::<UserLevel>().unwrap(), UserLevel::Advanced);
        assert_eq!(" beginner ".parse::<UserLevel>().unwrap(), UserLevel::Beginner);
        for level in UserLevel::ALL {
            assert_eq!(level.as_str().parse::<UserLevel>().unwrap(), level);
        }
    }

    #[test]
    fn rejects_unknown_level() {
        let err = "expert".parse::<UserLevel>().unwrap_err();
        assert!(matches!(err, SessionError::InvalidLevel(ref s) if s == "expert"));
    }

    #[test]
    fn serde_uses_lowercase_names() {
        assert_eq!(serde_json::to_string(&UserLevel::Intermediate).unwrap(), "\"intermediate\"");
        assert!(serde_json::from_str::<UserLevel>("\"guru\"").is_err());
    }
}
