// Copyright 2024 FastLabs Developers
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Backend-neutral severity scale.

use std::fmt;
use std::str::FromStr;

use crate::Error;

/// The backend-neutral severity of a log event.
///
/// Levels are ordered by severity: `Level::Trace < Level::Error`.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Level {
    /// Designates very low priority, often extremely verbose, information.
    Trace,
    /// Designates lower priority information.
    Debug,
    /// Designates useful information.
    Info,
    /// Designates hazardous situations.
    Warn,
    /// Designates very serious errors.
    Error,
}

impl Level {
    /// All levels, from the most verbose to the most severe.
    pub const ALL: [Level; 5] = [
        Level::Trace,
        Level::Debug,
        Level::Info,
        Level::Warn,
        Level::Error,
    ];

    /// Return the string representation of the `Level`.
    ///
    /// This returns the same string as the `fmt::Display` implementation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Trace => "TRACE",
            Level::Debug => "DEBUG",
            Level::Info => "INFO",
            Level::Warn => "WARN",
            Level::Error => "ERROR",
        }
    }

    /// Whether an event at this level passes a minimum severity of `min`.
    pub fn is_at_least(&self, min: Level) -> bool {
        *self >= min
    }

    pub(crate) fn to_log(self) -> log::Level {
        match self {
            Level::Trace => log::Level::Trace,
            Level::Debug => log::Level::Debug,
            Level::Info => log::Level::Info,
            Level::Warn => log::Level::Warn,
            Level::Error => log::Level::Error,
        }
    }
}

impl fmt::Debug for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for Level {
    type Err = Error;

    fn from_str(s: &str) -> Result<Level, Self::Err> {
        for level in Level::ALL {
            if s.eq_ignore_ascii_case(level.as_str()) {
                return Ok(level);
            }
        }

        Err(Error::config(format!("malformed level: {s:?}")))
    }
}

/// Two-way mapping between [`Level`] and a backend's native level filter.
///
/// `to_native` is total. `to_neutral` collapses native levels that are finer than the neutral
/// scale according to a fixed table, and fails with a mapping error for levels that have no
/// neutral counterpart.
pub trait LevelMapper {
    /// The backend's native level filter.
    type Native: Copy + fmt::Debug + Send + Sync + 'static;

    /// Map a neutral level to the backend's native level.
    fn to_native(level: Level) -> Self::Native;

    /// Map a native level to the neutral level.
    fn to_neutral(native: Self::Native) -> Result<Level, Error>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordering_follows_severity() {
        assert!(Level::Trace < Level::Debug);
        assert!(Level::Warn < Level::Error);
        assert!(Level::Error.is_at_least(Level::Warn));
        assert!(Level::Warn.is_at_least(Level::Warn));
        assert!(!Level::Debug.is_at_least(Level::Warn));
    }

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!("warn".parse::<Level>().unwrap(), Level::Warn);
        assert_eq!("TRACE".parse::<Level>().unwrap(), Level::Trace);
        let err = "fatal".parse::<Level>().unwrap_err();
        assert_eq!(err.to_string(), r#"ConfigError: malformed level: "fatal""#);
    }

    #[test]
    fn display_pads() {
        assert_eq!(format!("{:>5}", Level::Info), " INFO");
        assert_eq!(Level::Error.to_string(), "ERROR");
    }
}
