//! Semantic version triples.
//!
//! Only `major.minor.patch` with optional pre-release and build suffixes is
//! accepted. Error messages are lower-case and stable; they surface verbatim
//! in validation failures.

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VersionError {
    #[error("version string empty")]
    Empty,
    #[error("no major.minor.patch elements found")]
    MissingElements,
    #[error("invalid character(s) found in {part} number {value:?}")]
    InvalidCharacters { part: &'static str, value: String },
    #[error("{part} number must not contain leading zeroes {value:?}")]
    LeadingZero { part: &'static str, value: String },
    #[error("invalid prerelease {0:?}")]
    InvalidPrerelease(String),
}

/// Parsed semantic version.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Version {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
    pub pre: Option<String>,
    pub build: Option<String>,
}

impl Version {
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
            pre: None,
            build: None,
        }
    }

    /// `target.major - self.major`, exact over the whole `u64` range.
    pub fn major_delta(&self, target: &Version) -> i128 {
        i128::from(target.major) - i128::from(self.major)
    }
}

fn parse_number(part: &'static str, value: &str) -> Result<u64, VersionError> {
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(VersionError::InvalidCharacters {
            part,
            value: value.to_string(),
        });
    }
    if value.len() > 1 && value.starts_with('0') {
        return Err(VersionError::LeadingZero {
            part,
            value: value.to_string(),
        });
    }
    value.parse().map_err(|_| VersionError::InvalidCharacters {
        part,
        value: value.to_string(),
    })
}

impl FromStr for Version {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(VersionError::Empty);
        }

        let (rest, build) = match s.split_once('+') {
            Some((rest, build)) => (rest, Some(build.to_string())),
            None => (s, None),
        };
        let (core, pre) = match rest.split_once('-') {
            Some((core, pre)) => {
                if pre.is_empty() || pre.split('.').any(str::is_empty) {
                    return Err(VersionError::InvalidPrerelease(pre.to_string()));
                }
                (core, Some(pre.to_string()))
            }
            None => (rest, None),
        };

        let parts: Vec<&str> = core.split('.').collect();
        if parts.len() != 3 {
            return Err(VersionError::MissingElements);
        }

        Ok(Version {
            major: parse_number("major", parts[0])?,
            minor: parse_number("minor", parts[1])?,
            patch: parse_number("patch", parts[2])?,
            pre,
            build,
        })
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)?;
        if let Some(pre) = &self.pre {
            write!(f, "-{}", pre)?;
        }
        if let Some(build) = &self.build {
            write!(f, "+{}", build)?;
        }
        Ok(())
    }
}
