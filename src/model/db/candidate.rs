use std::ops::{Deref, DerefMut};

use rocket::futures::TryStreamExt;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::model::{
    common::ballot::{CandidateId, PositionId},
    mongodb::{Coll, Id},
};

/// Core candidate data, as stored in the database.
///
/// Invariant (enforced by the administrative surface): `position_id` refers
/// to an existing position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateCore {
    /// Candidate unique identifier.
    pub candidate_id: CandidateId,
    /// The position this candidate stands for.
    pub position_id: PositionId,
    /// Display name.
    pub name: String,
    /// Reference to the candidate's avatar, if any.
    pub avatar_url: Option<String>,
}

/// A candidate without an ID.
pub type NewCandidate = CandidateCore;

/// A candidate from the database, with its unique ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub candidate: CandidateCore,
}

impl Candidate {
    /// Snapshot of the full candidate catalog.
    pub async fn catalog(candidates: &Coll<Candidate>) -> Result<Vec<Candidate>> {
        Ok(candidates.find(None, None).await?.try_collect().await?)
    }
}

impl Deref for Candidate {
    type Target = CandidateCore;

    fn deref(&self) -> &Self::Target {
        &self.candidate
    }
}

impl DerefMut for Candidate {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.candidate
    }
}
