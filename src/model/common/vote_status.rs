use mongodb::bson::{to_bson, Bson};
use serde::{Deserialize, Serialize};

/// A voter's progress through the election.
///
/// The only legal transition is `NotVoted` to `Voted`, performed exactly once
/// by the conditional update in [`crate::model::db::voter::Voter::claim_vote`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VoteStatus {
    /// The voter has not yet cast a ballot.
    NotVoted,
    /// The voter's ballot has been accepted.
    Voted,
}

impl From<VoteStatus> for Bson {
    fn from(status: VoteStatus) -> Self {
        to_bson(&status).expect("Serialisation is infallible")
    }
}
