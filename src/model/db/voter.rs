use std::ops::{Deref, DerefMut};

use hmac::{digest::Output, Hmac};
use mongodb::bson::doc;
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::{
    config::Config,
    error::Result,
    model::{
        api::student::StudentNumber,
        common::{Course, VoteStatus},
        mongodb::{Coll, Id},
    },
};

pub type HmacSha256 = Hmac<Sha256>;

/// Core voter data, as stored in the database.
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoterCore {
    /// Voter unique key: the HMAC of their student number.
    pub student_hmac: Output<HmacSha256>,
    /// The voter's academic program, fixed at enrolment.
    pub course: Course,
    /// Whether the voter has cast their ballot.
    pub vote_status: VoteStatus,
}

impl VoterCore {
    /// Create a new Voter.
    pub fn new(student_number: StudentNumber, course: Course, config: &Config) -> Self {
        Self {
            // Do not directly store identifying student data.
            student_hmac: student_number.into_hmac(config),
            course,
            vote_status: VoteStatus::NotVoted,
        }
    }
}

/// A voter without an ID.
pub type NewVoter = VoterCore;

/// A voter from the database, with its unique ID.
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Voter {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub voter: VoterCore,
}

/// Outcome of trying to claim a voter's single vote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteClaim {
    /// This caller won the not-voted to voted transition.
    Claimed,
    /// The vote was already spent.
    AlreadyVoted,
}

impl Voter {
    /// Atomically transition the voter from not-voted to voted.
    ///
    /// The transition is a single conditional update: of any number of
    /// concurrent callers, exactly one observes [`VoteClaim::Claimed`] and
    /// every other observes [`VoteClaim::AlreadyVoted`]. Nothing else may
    /// write `vote_status`.
    pub async fn claim_vote(voters: &Coll<Voter>, voter_id: Id) -> Result<VoteClaim> {
        let filter = doc! {
            "_id": *voter_id,
            "vote_status": VoteStatus::NotVoted,
        };
        let update = doc! {
            "$set": { "vote_status": VoteStatus::Voted },
        };
        let result = voters.update_one(filter, update, None).await?;
        Ok(if result.modified_count == 1 {
            VoteClaim::Claimed
        } else {
            VoteClaim::AlreadyVoted
        })
    }
}

impl Deref for Voter {
    type Target = VoterCore;

    fn deref(&self) -> &Self::Target {
        &self.voter
    }
}

impl DerefMut for Voter {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.voter
    }
}

/// Example data for tests.
#[cfg(test)]
mod examples {
    use super::*;

    impl VoterCore {
        pub fn example(config: &Config) -> Self {
            VoterCore::new(StudentNumber::example(), Course::Bsit, config)
        }

        pub fn example2(config: &Config) -> Self {
            VoterCore::new(StudentNumber::example2(), Course::Bscs, config)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use mongodb::Database;
    use rocket::local::asynchronous::Client;

    #[backend_test]
    async fn claim_vote_exactly_once(client: Client, db: Database) {
        let config = client.rocket().state::<Config>().unwrap();
        let voters = Coll::<Voter>::from_db(&db);

        let voter_id: Id = Coll::<NewVoter>::from_db(&db)
            .insert_one(NewVoter::example(config), None)
            .await
            .unwrap()
            .inserted_id
            .as_object_id()
            .unwrap()
            .into();

        // First claim wins.
        let claim = Voter::claim_vote(&voters, voter_id).await.unwrap();
        assert_eq!(claim, VoteClaim::Claimed);

        // Every later claim loses.
        let claim = Voter::claim_vote(&voters, voter_id).await.unwrap();
        assert_eq!(claim, VoteClaim::AlreadyVoted);

        // The transition is never reversed.
        let voter = voters
            .find_one(voter_id.as_doc(), None)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(voter.vote_status, VoteStatus::Voted);
    }

    #[backend_test]
    async fn concurrent_claims_yield_one_winner(client: Client, db: Database) {
        let config = client.rocket().state::<Config>().unwrap();
        let voters = Coll::<Voter>::from_db(&db);

        let voter_id: Id = Coll::<NewVoter>::from_db(&db)
            .insert_one(NewVoter::example(config), None)
            .await
            .unwrap()
            .inserted_id
            .as_object_id()
            .unwrap()
            .into();

        let (first, second) = rocket::tokio::join!(
            Voter::claim_vote(&voters, voter_id),
            Voter::claim_vote(&voters, voter_id),
        );
        let claims = [first.unwrap(), second.unwrap()];
        assert_eq!(
            claims.iter().filter(|c| **c == VoteClaim::Claimed).count(),
            1
        );
        assert_eq!(
            claims
                .iter()
                .filter(|c| **c == VoteClaim::AlreadyVoted)
                .count(),
            1
        );
    }
}
