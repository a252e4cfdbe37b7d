use std::fmt::{Display, Formatter};
use std::str::FromStr;

use hmac::{digest::Output, Mac};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{config::Config, model::db::voter::HmacSha256};

/// A voter's student number, the stable credential their identity derives
/// from. The university sign-on that verified it is outside this service;
/// we only consume the result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct StudentNumber {
    inner: String,
}

impl StudentNumber {
    /// Keyed hash of the student number; the only form we ever store.
    pub fn into_hmac(self, config: &Config) -> Output<HmacSha256> {
        let mut hmac = HmacSha256::new_from_slice(config.hmac_secret())
            .expect("HMAC can take key of any size");
        hmac.update(self.inner.as_bytes());
        hmac.finalize().into_bytes()
    }
}

impl Display for StudentNumber {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.inner)
    }
}

impl FromStr for StudentNumber {
    type Err = StudentNumberError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(StudentNumberError::Empty);
        }
        if !trimmed
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-')
        {
            return Err(StudentNumberError::InvalidCharacters(trimmed.to_string()));
        }
        Ok(StudentNumber {
            inner: trimmed.to_string(),
        })
    }
}

impl TryFrom<String> for StudentNumber {
    type Error = StudentNumberError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<StudentNumber> for String {
    fn from(student_number: StudentNumber) -> Self {
        student_number.inner
    }
}

#[derive(Debug, Error)]
pub enum StudentNumberError {
    #[error("Student number cannot be empty")]
    Empty,
    #[error("Student number contains invalid characters: {0:?}")]
    InvalidCharacters(String),
}

/// Example data for tests.
#[cfg(test)]
mod examples {
    use super::*;

    impl StudentNumber {
        pub fn example() -> Self {
            "2021-10023".parse().unwrap()
        }

        pub fn example2() -> Self {
            "2022-20417".parse().unwrap()
        }
    }
}
