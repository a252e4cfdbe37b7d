use std::collections::HashSet;

use thiserror::Error;

use crate::model::{
    api::ballot::BallotPaper,
    common::ballot::{CandidateId, PositionId},
    db::{Candidate, Position},
};

/// Why a ballot paper was rejected. All of these are caller-correctable and
/// none of them mutate any state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BallotError {
    #[error("Ballot must select exactly one candidate per open position \
             (missing: {missing:?}, unexpected: {extra:?})")]
    IncompleteBallot {
        missing: Vec<PositionId>,
        extra: Vec<PositionId>,
    },
    #[error("No such candidate '{candidate}'")]
    UnknownCandidate { candidate: CandidateId },
    #[error("Candidate '{candidate}' does not stand for position '{position}'")]
    PositionMismatch {
        candidate: CandidateId,
        position: PositionId,
    },
}

/// Check a ballot paper against catalog snapshots.
///
/// Pure function over the provided snapshots; persisting anything happens
/// strictly after validation passes.
pub fn validate(
    paper: &BallotPaper,
    positions: &[Position],
    candidates: &[Candidate],
) -> Result<(), BallotError> {
    // The selected positions must be exactly the open positions.
    let open: HashSet<&str> = positions
        .iter()
        .map(|position| position.position_id.as_str())
        .collect();
    let mut missing: Vec<PositionId> = positions
        .iter()
        .filter(|position| !paper.selections.contains_key(&position.position_id))
        .map(|position| position.position_id.clone())
        .collect();
    let mut extra: Vec<PositionId> = paper
        .selections
        .keys()
        .filter(|position| !open.contains(position.as_str()))
        .cloned()
        .collect();
    if !missing.is_empty() || !extra.is_empty() {
        missing.sort();
        extra.sort();
        return Err(BallotError::IncompleteBallot { missing, extra });
    }

    // Every selected candidate must exist and stand for the position it was
    // placed under.
    for (position, candidate) in &paper.selections {
        let known = candidates
            .iter()
            .find(|c| &c.candidate_id == candidate)
            .ok_or_else(|| BallotError::UnknownCandidate {
                candidate: candidate.clone(),
            })?;
        if &known.position_id != position {
            return Err(BallotError::PositionMismatch {
                candidate: candidate.clone(),
                position: position.clone(),
            });
        }
    }

    Ok(())
}
