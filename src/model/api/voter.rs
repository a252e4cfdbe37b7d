use serde::{Deserialize, Serialize};

use crate::model::{
    common::{Course, VoteStatus},
    db::Voter,
};

/// The logged-in voter's own view of their record. Deliberately excludes the
/// internal ID and credential hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoterDesc {
    pub course: Course,
    pub vote_status: VoteStatus,
}

impl From<Voter> for VoterDesc {
    fn from(voter: Voter) -> Self {
        Self {
            course: voter.course,
            vote_status: voter.vote_status,
        }
    }
}
