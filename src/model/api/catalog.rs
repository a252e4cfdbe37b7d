use serde::{Deserialize, Serialize};

use crate::model::{
    common::ballot::{CandidateId, PositionId},
    db::{Candidate, Position},
};

/// An open position, as exposed over the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionDesc {
    pub position_id: PositionId,
    pub display_order: u32,
}

impl From<Position> for PositionDesc {
    fn from(position: Position) -> Self {
        Self {
            position_id: position.position.position_id,
            display_order: position.position.display_order,
        }
    }
}

/// A candidate, as exposed over the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateDesc {
    pub candidate_id: CandidateId,
    pub position_id: PositionId,
    pub name: String,
    pub avatar_url: Option<String>,
}

impl From<Candidate> for CandidateDesc {
    fn from(candidate: Candidate) -> Self {
        Self {
            candidate_id: candidate.candidate.candidate_id,
            position_id: candidate.candidate.position_id,
            name: candidate.candidate.name,
            avatar_url: candidate.candidate.avatar_url,
        }
    }
}
