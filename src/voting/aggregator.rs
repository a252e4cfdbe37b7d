use std::collections::HashMap;

use mongodb::Database;
use rocket::{
    futures::TryStreamExt,
    request::{self, FromRequest, Request},
    State,
};

use crate::error::Result;
use crate::model::{
    api::results::{CandidateTally, CourseParticipation, ElectionSummary, ElectionTotals},
    common::{Course, VoteStatus},
    db::{Candidate, TallyEntry, Voter},
    mongodb::Coll,
};

/// Derives turnout and per-candidate totals from committed state.
///
/// Strictly read-only: it reflects whatever the registry and tallies hold at
/// the time of the query and enforces nothing.
pub struct ResultAggregator {
    voters: Coll<Voter>,
    candidates: Coll<Candidate>,
    tallies: Coll<TallyEntry>,
}

impl ResultAggregator {
    pub fn new(db: &Database) -> Self {
        Self {
            voters: Coll::from_db(db),
            candidates: Coll::from_db(db),
            tallies: Coll::from_db(db),
        }
    }

    /// The current election summary.
    pub async fn summary(&self) -> Result<ElectionSummary> {
        let voters: Vec<Voter> = self.voters.find(None, None).await?.try_collect().await?;
        if voters.is_empty() {
            return Ok(ElectionSummary::NoData);
        }

        let total_voters = voters.len() as u64;
        let total_voted = voters
            .iter()
            .filter(|voter| voter.vote_status == VoteStatus::Voted)
            .count() as u64;

        // Turnout per course. Every known course is reported, including ones
        // with no members, whose rate is 0 rather than a division artifact.
        let mut participation: HashMap<Course, CourseParticipation> = Course::ALL
            .iter()
            .map(|course| (*course, CourseParticipation::default()))
            .collect();
        for voter in &voters {
            let entry = participation.entry(voter.course).or_default();
            entry.total += 1;
            if voter.vote_status == VoteStatus::Voted {
                entry.voted += 1;
            }
        }
        for entry in participation.values_mut() {
            if entry.total > 0 {
                entry.rate = entry.voted as f64 / entry.total as f64;
            }
        }

        // Per-candidate totals. Candidates nobody has voted for yet simply
        // have no tally rows, which reads as zero.
        let catalog = Candidate::catalog(&self.candidates).await?;
        let mut candidates = HashMap::with_capacity(catalog.len());
        for candidate in catalog {
            let by_course = TallyEntry::read_all(&self.tallies, &candidate.candidate_id).await?;
            let total = by_course.values().sum();
            candidates.insert(
                candidate.candidate.candidate_id,
                CandidateTally { total, by_course },
            );
        }

        Ok(ElectionSummary::Results(ElectionTotals {
            total_voters,
            total_voted,
            participation,
            candidates,
        }))
    }
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for ResultAggregator {
    type Error = ();

    /// Construct an aggregator from the managed database.
    ///
    /// Panics iff the [`Database`] is not managed by [`rocket::Rocket`].
    async fn from_request(req: &'r Request<'_>) -> request::Outcome<Self, Self::Error> {
        let db = req.guard::<&State<Database>>().await.unwrap();
        request::Outcome::Success(ResultAggregator::new(db))
    }
}
