use mongodb::{bson::doc, Database};
use rocket::{
    request::{self, FromRequest, Request},
    State,
};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::model::{
    api::ballot::BallotPaper,
    common::{
        ballot::{CandidateId, Counted, Pending, PositionId},
        VoteStatus,
    },
    db::{Ballot, Candidate, Position, TallyEntry, VoteClaim, Voter},
    mongodb::{Coll, Id},
};

use super::validator;

/// Terminal outcome of a ballot submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission {
    /// The ballot was counted in full.
    Accepted,
    /// The voter has already cast a ballot; no tallies were touched.
    AlreadyVoted,
    /// The voter is marked as voted but the listed positions' increments are
    /// still outstanding. The reconciler finishes them; the voter must NOT
    /// resubmit.
    TallyIncomplete { outstanding: Vec<PositionId> },
}

/// Orchestrates one ballot submission: validation, the vote-status claim,
/// and the tally increments, in that order.
///
/// The claim is the gate. It happens strictly before any increment, so a
/// voter racing against themselves (second tab, retried request) can never
/// be counted twice: the losing submission stops at the claim with
/// [`Submission::AlreadyVoted`].
pub struct VoteCoordinator {
    voters: Coll<Voter>,
    positions: Coll<Position>,
    candidates: Coll<Candidate>,
    pending_ballots: Coll<Ballot<Pending>>,
    counted_ballots: Coll<Ballot<Counted>>,
    tallies: Coll<TallyEntry>,
    retry_budget: u32,
}

impl VoteCoordinator {
    pub fn new(db: &Database, config: &Config) -> Self {
        Self {
            voters: Coll::from_db(db),
            positions: Coll::from_db(db),
            candidates: Coll::from_db(db),
            pending_ballots: Coll::from_db(db),
            counted_ballots: Coll::from_db(db),
            tallies: Coll::from_db(db),
            retry_budget: config.tally_retry_budget(),
        }
    }

    /// Submit a ballot for the given voter.
    ///
    /// On `Accepted`, every (candidate, course) entry implied by the ballot
    /// has been incremented exactly once. Validation and authorization
    /// failures are reported as errors before anything is written.
    pub async fn submit(&self, voter_id: Id, paper: BallotPaper) -> Result<Submission> {
        // Who is voting, and have they voted already? A repeat submission is
        // a benign no-op, not a catastrophe.
        let voter = self
            .voters
            .find_one(voter_id.as_doc(), None)
            .await?
            .ok_or_else(|| Error::unauthorized(format!("No voter with ID {voter_id}")))?;
        if voter.vote_status == VoteStatus::Voted {
            debug!("Voter {voter_id} has already voted, nothing to do");
            return Ok(Submission::AlreadyVoted);
        }

        // Validate against the current catalog snapshots before anything is
        // persisted.
        let positions = Position::catalog(&self.positions).await?;
        let candidates = Candidate::catalog(&self.candidates).await?;
        validator::validate(&paper, &positions, &candidates)?;

        // Claim the vote before spending it. The losing side of a race stops
        // here with no tallies touched.
        if Voter::claim_vote(&self.voters, voter_id).await? == VoteClaim::AlreadyVoted {
            info!("Voter {voter_id} lost a submission race; treating as already voted");
            return Ok(Submission::AlreadyVoted);
        }

        // The claim succeeded. Record the ballot so outstanding increments
        // survive a crash, then apply them.
        let ballot = Ballot::new(voter_id, voter.course, paper.selections);
        let recorded = match self.pending_ballots.insert_one(&ballot, None).await {
            Ok(_) => true,
            Err(e) => {
                // The increments below still run from memory; only crash
                // recovery is degraded.
                error!("Failed to record ballot for voter {voter_id}: {e}");
                false
            }
        };

        let outstanding = self.apply_increments(&ballot, recorded).await;
        if outstanding.is_empty() {
            if recorded {
                self.finish_ballot(ballot).await;
            }
            info!("Accepted ballot from voter {voter_id}");
            Ok(Submission::Accepted)
        } else {
            error!(
                "Ballot from voter {voter_id} is recorded but {} tally increment(s) \
                 could not be applied",
                outstanding.len()
            );
            Ok(Submission::TallyIncomplete { outstanding })
        }
    }

    /// Apply one atomic increment per selection, retrying failures within
    /// the budget. Returns the positions still outstanding.
    async fn apply_increments(&self, ballot: &Ballot<Pending>, recorded: bool) -> Vec<PositionId> {
        let mut outstanding: Vec<(&PositionId, &CandidateId)> = ballot.selections.iter().collect();

        for attempt in 0..=self.retry_budget {
            if attempt > 0 {
                warn!(
                    "Retrying {} failed tally increment(s), attempt {attempt}/{}",
                    outstanding.len(),
                    self.retry_budget
                );
            }

            let mut failed = Vec::new();
            for (position, candidate) in outstanding {
                match TallyEntry::increment(&self.tallies, candidate, ballot.course, 1).await {
                    Ok(count) => {
                        debug!("Tally for ('{candidate}', {}) is now {count}", ballot.course);
                        if recorded {
                            if let Err(e) =
                                Ballot::mark_counted(&self.pending_ballots, ballot.id, position)
                                    .await
                            {
                                warn!(
                                    "Failed to mark position '{position}' counted on ballot {}: {e}",
                                    ballot.id
                                );
                            }
                        }
                    }
                    Err(e) => {
                        warn!("Tally increment for ('{candidate}', {}) failed: {e}", ballot.course);
                        failed.push((position, candidate));
                    }
                }
            }

            if failed.is_empty() {
                return Vec::new();
            }
            outstanding = failed;
        }

        outstanding
            .into_iter()
            .map(|(position, _)| position.clone())
            .collect()
    }

    /// Flip a fully-applied ballot to counted. Failure is harmless: the
    /// reconciler will find its counted set complete and flip it later.
    async fn finish_ballot(&self, ballot: Ballot<Pending>) {
        let id = ballot.id;
        let counted = ballot.count();
        let filter = doc! {"_id": *id, "state": Pending};
        match self.counted_ballots.replace_one(filter, &counted, None).await {
            Ok(result) if result.modified_count == 1 => debug!("Ballot {id} fully counted"),
            Ok(_) => warn!("Ballot {id} was not pending when finishing"),
            Err(e) => warn!("Failed to finish ballot {id}: {e}"),
        }
    }
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for VoteCoordinator {
    type Error = ();

    /// Construct a coordinator from the managed database and config.
    ///
    /// Panics iff the [`Database`] or [`Config`] is not managed by
    /// [`rocket::Rocket`].
    async fn from_request(req: &'r Request<'_>) -> request::Outcome<Self, Self::Error> {
        let db = req.guard::<&State<Database>>().await.unwrap();
        let config = req.guard::<&State<Config>>().await.unwrap();
        request::Outcome::Success(VoteCoordinator::new(db, config))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::HashMap;

    use mongodb::Database;
    use rocket::{futures::TryStreamExt, local::asynchronous::Client};

    use crate::model::{
        common::Course,
        db::{candidate::NewCandidate, position::NewPosition, voter::NewVoter},
    };

    async fn insert_catalogs(db: &Database) {
        Coll::<NewPosition>::from_db(db)
            .insert_many([NewPosition::president(), NewPosition::secretary()], None)
            .await
            .unwrap();
        Coll::<NewCandidate>::from_db(db)
            .insert_many(
                [
                    NewCandidate::president_avila(),
                    NewCandidate::president_bautista(),
                    NewCandidate::secretary_cruz(),
                ],
                None,
            )
            .await
            .unwrap();
    }

    async fn insert_voter(db: &Database, voter: NewVoter) -> Id {
        Coll::<NewVoter>::from_db(db)
            .insert_one(voter, None)
            .await
            .unwrap()
            .inserted_id
            .as_object_id()
            .unwrap()
            .into()
    }

    #[backend_test]
    async fn tallies_match_accepted_ballots(client: Client, db: Database) {
        let config = client.rocket().state::<Config>().unwrap();
        insert_catalogs(&db).await;
        let coordinator = VoteCoordinator::new(&db, config);

        // Two voters from different courses, same presidential pick.
        let v1 = insert_voter(&db, NewVoter::example(config)).await;
        let v2 = insert_voter(&db, NewVoter::example2(config)).await;

        let s1 = coordinator.submit(v1, BallotPaper::example()).await.unwrap();
        let s2 = coordinator.submit(v2, BallotPaper::example()).await.unwrap();
        assert_eq!(s1, Submission::Accepted);
        assert_eq!(s2, Submission::Accepted);

        // For every candidate, the per-course sums equal the number of voted
        // voters who selected them.
        let tallies = Coll::<TallyEntry>::from_db(&db);
        let ballots: Vec<Ballot<Counted>> = Coll::<Ballot<Counted>>::from_db(&db)
            .find(doc! {"state": Counted}, None)
            .await
            .unwrap()
            .try_collect()
            .await
            .unwrap();
        assert_eq!(ballots.len(), 2);

        for candidate in ["avila", "bautista", "cruz"] {
            let selected_by = ballots
                .iter()
                .filter(|b| b.selections.values().any(|c| c == candidate))
                .count() as u64;
            let total: u64 = TallyEntry::read_all(&tallies, candidate)
                .await
                .unwrap()
                .values()
                .sum();
            assert_eq!(total, selected_by, "tally invariant broken for {candidate}");
        }

        // And the per-course split is exact.
        let avila = TallyEntry::read_all(&tallies, "avila").await.unwrap();
        assert_eq!(avila.get(&Course::Bsit), Some(&1));
        assert_eq!(avila.get(&Course::Bscs), Some(&1));
    }

    #[backend_test]
    async fn unknown_voter_is_rejected_without_side_effects(client: Client, db: Database) {
        let config = client.rocket().state::<Config>().unwrap();
        insert_catalogs(&db).await;
        let coordinator = VoteCoordinator::new(&db, config);

        let result = coordinator.submit(Id::new(), BallotPaper::example()).await;
        assert!(matches!(result, Err(Error::Status(status, _))
            if status == rocket::http::Status::Unauthorized));

        let tallies = Coll::<TallyEntry>::from_db(&db);
        assert_eq!(tallies.count_documents(None, None).await.unwrap(), 0);
    }

    #[backend_test]
    async fn validation_failure_leaves_no_trace(client: Client, db: Database) {
        let config = client.rocket().state::<Config>().unwrap();
        insert_catalogs(&db).await;
        let coordinator = VoteCoordinator::new(&db, config);
        let voter_id = insert_voter(&db, NewVoter::example(config)).await;

        let paper = BallotPaper {
            selections: HashMap::from([("president".to_string(), "avila".to_string())]),
        };
        let result = coordinator.submit(voter_id, paper).await;
        assert!(matches!(result, Err(Error::Ballot(_))));

        // No claim, no ballot, no tallies.
        let voter = Coll::<Voter>::from_db(&db)
            .find_one(voter_id.as_doc(), None)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(voter.vote_status, VoteStatus::NotVoted);
        let ballots = Coll::<Ballot<Pending>>::from_db(&db);
        assert_eq!(ballots.count_documents(None, None).await.unwrap(), 0);
        let tallies = Coll::<TallyEntry>::from_db(&db);
        assert_eq!(tallies.count_documents(None, None).await.unwrap(), 0);
    }

    #[backend_test]
    async fn second_submission_is_idempotent(client: Client, db: Database) {
        let config = client.rocket().state::<Config>().unwrap();
        insert_catalogs(&db).await;
        let coordinator = VoteCoordinator::new(&db, config);
        let voter_id = insert_voter(&db, NewVoter::example(config)).await;

        let first = coordinator
            .submit(voter_id, BallotPaper::example())
            .await
            .unwrap();
        assert_eq!(first, Submission::Accepted);

        // A different paper from the same voter changes nothing.
        let second = coordinator
            .submit(voter_id, BallotPaper::example2())
            .await
            .unwrap();
        assert_eq!(second, Submission::AlreadyVoted);

        let tallies = Coll::<TallyEntry>::from_db(&db);
        let avila = TallyEntry::read_all(&tallies, "avila").await.unwrap();
        let bautista = TallyEntry::read_all(&tallies, "bautista").await.unwrap();
        let cruz = TallyEntry::read_all(&tallies, "cruz").await.unwrap();
        assert_eq!(avila.get(&Course::Bsit), Some(&1));
        assert!(bautista.is_empty());
        assert_eq!(cruz.get(&Course::Bsit), Some(&1));
    }

    #[backend_test]
    async fn concurrent_submissions_accept_exactly_once(client: Client, db: Database) {
        let config = client.rocket().state::<Config>().unwrap();
        insert_catalogs(&db).await;
        let coordinator = VoteCoordinator::new(&db, config);
        let voter_id = insert_voter(&db, NewVoter::example(config)).await;

        let (first, second) = rocket::tokio::join!(
            coordinator.submit(voter_id, BallotPaper::example()),
            coordinator.submit(voter_id, BallotPaper::example()),
        );
        let outcomes = [first.unwrap(), second.unwrap()];
        assert_eq!(
            outcomes
                .iter()
                .filter(|o| **o == Submission::Accepted)
                .count(),
            1
        );
        assert_eq!(
            outcomes
                .iter()
                .filter(|o| **o == Submission::AlreadyVoted)
                .count(),
            1
        );

        // Counted exactly once.
        let tallies = Coll::<TallyEntry>::from_db(&db);
        let avila = TallyEntry::read_all(&tallies, "avila").await.unwrap();
        assert_eq!(avila.get(&Course::Bsit), Some(&1));
    }
}
