use std::collections::{HashMap, HashSet};
use std::ops::{Deref, DerefMut};

use chrono::{DateTime, Utc};
use mongodb::bson::{doc, serde_helpers::chrono_datetime_as_bson_datetime};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::model::{
    common::{
        ballot::{BallotState, CandidateId, Counted, Pending, PositionId},
        Course,
    },
    mongodb::{Coll, Id},
};

/// Core ballot data, as stored in the database.
///
/// A ballot is only ever written after its voter has won the vote-status
/// claim, so at most one exists per voter (also enforced by a unique index).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound(deserialize = "S: BallotState"))]
pub struct BallotCore<S: BallotState> {
    /// The voter who cast this ballot.
    pub voter_id: Id,
    /// The voter's course at casting time; tally increments are keyed by it.
    pub course: Course,
    /// One selected candidate per open position.
    pub selections: HashMap<PositionId, CandidateId>,
    /// The positions whose tally increments have already been applied.
    pub counted: HashSet<PositionId>,
    /// Casting time; the reconciler only touches pending ballots older than
    /// the grace interval.
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub creation_time: DateTime<Utc>,
    /// The current state of the ballot.
    pub state: S,
}

impl BallotCore<Pending> {
    /// Finish the lifecycle: every selection is reflected in the tallies.
    pub fn count(self) -> BallotCore<Counted> {
        let counted = self.selections.keys().cloned().collect();
        BallotCore {
            voter_id: self.voter_id,
            course: self.course,
            selections: self.selections,
            counted,
            creation_time: self.creation_time,
            state: Counted,
        }
    }
}

/// A ballot from the database, with its unique ID.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound(deserialize = "S: BallotState"))]
pub struct Ballot<S: BallotState> {
    #[serde(rename = "_id")]
    pub id: Id,
    /// Ballot contents.
    #[serde(flatten)]
    pub ballot: BallotCore<S>,
}

impl Ballot<Pending> {
    /// Create a new pending ballot with no increments applied yet.
    pub fn new(voter_id: Id, course: Course, selections: HashMap<PositionId, CandidateId>) -> Self {
        Self {
            id: Id::new(),
            ballot: BallotCore {
                voter_id,
                course,
                selections,
                counted: HashSet::new(),
                creation_time: Utc::now(),
                state: Pending,
            },
        }
    }

    /// Durably record that the increment for `position` has been applied,
    /// so a later reconciliation pass will not re-apply it.
    pub async fn mark_counted(
        ballots: &Coll<Ballot<Pending>>,
        ballot_id: Id,
        position: &str,
    ) -> Result<()> {
        ballots
            .update_one(
                doc! {"_id": *ballot_id, "state": Pending},
                doc! {"$addToSet": {"counted": position}},
                None,
            )
            .await?;
        Ok(())
    }

    /// Finish the lifecycle.
    pub fn count(self) -> Ballot<Counted> {
        Ballot {
            id: self.id,
            ballot: self.ballot.count(),
        }
    }
}

impl<S: BallotState> Deref for Ballot<S> {
    type Target = BallotCore<S>;

    fn deref(&self) -> &Self::Target {
        &self.ballot
    }
}

impl<S: BallotState> DerefMut for Ballot<S> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.ballot
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use mongodb::Database;

    #[backend_test]
    async fn mark_counted_is_durable(db: Database) {
        let ballots = Coll::<Ballot<Pending>>::from_db(&db);

        let selections = HashMap::from([
            ("president".to_string(), "avila".to_string()),
            ("secretary".to_string(), "cruz".to_string()),
        ]);
        let ballot = Ballot::new(Id::new(), Course::Bsit, selections);
        ballots.insert_one(&ballot, None).await.unwrap();

        Ballot::mark_counted(&ballots, ballot.id, "president")
            .await
            .unwrap();
        // Marking twice is a no-op.
        Ballot::mark_counted(&ballots, ballot.id, "president")
            .await
            .unwrap();

        let stored = ballots
            .find_one(ballot.id.as_doc(), None)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(
            stored.counted,
            HashSet::from(["president".to_string()])
        );
    }

    #[backend_test]
    async fn counting_covers_all_selections(db: Database) {
        let ballots = Coll::<Ballot<Pending>>::from_db(&db);
        let counted_ballots = Coll::<Ballot<Counted>>::from_db(&db);

        let selections = HashMap::from([
            ("president".to_string(), "avila".to_string()),
            ("secretary".to_string(), "cruz".to_string()),
        ]);
        let ballot = Ballot::new(Id::new(), Course::Bscs, selections.clone());
        ballots.insert_one(&ballot, None).await.unwrap();

        let counted = ballot.count();
        assert_eq!(
            counted.counted,
            selections.keys().cloned().collect::<HashSet<_>>()
        );

        counted_ballots
            .replace_one(counted.id.as_doc(), &counted, None)
            .await
            .unwrap();

        // The pending filter no longer matches it.
        let pending = ballots
            .find_one(doc! {"_id": *counted.id, "state": Pending}, None)
            .await
            .unwrap();
        assert!(pending.is_none());
    }
}
