use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::model::common::ballot::{CandidateId, PositionId};
use crate::voting::Submission;

/// A ballot paper as submitted by a voter: one selected candidate per open
/// position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BallotPaper {
    pub selections: HashMap<PositionId, CandidateId>,
}

/// Submission outcome as exposed over the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SubmissionDesc {
    /// Every selection is reflected in the tallies.
    Accepted,
    /// The voter had already cast a ballot; nothing changed.
    AlreadyVoted,
    /// The vote is recorded but some counters are still catching up.
    TallyIncomplete { outstanding: Vec<PositionId> },
}

impl From<Submission> for SubmissionDesc {
    fn from(submission: Submission) -> Self {
        match submission {
            Submission::Accepted => Self::Accepted,
            Submission::AlreadyVoted => Self::AlreadyVoted,
            Submission::TallyIncomplete { outstanding } => Self::TallyIncomplete { outstanding },
        }
    }
}

/// Example data for tests.
#[cfg(test)]
mod examples {
    use super::*;

    impl BallotPaper {
        /// A complete, well-formed paper for the example catalogs.
        pub fn example() -> Self {
            Self {
                selections: HashMap::from([
                    ("president".to_string(), "avila".to_string()),
                    ("secretary".to_string(), "cruz".to_string()),
                ]),
            }
        }

        /// Like [`Self::example`], but with the other presidential candidate.
        pub fn example2() -> Self {
            Self {
                selections: HashMap::from([
                    ("president".to_string(), "bautista".to_string()),
                    ("secretary".to_string(), "cruz".to_string()),
                ]),
            }
        }
    }
}
