use std::collections::HashMap;

use mongodb::{
    bson::doc,
    error::{Error as DbError, ErrorKind, WriteFailure},
    options::{FindOneAndUpdateOptions, ReturnDocument},
};
use rocket::futures::TryStreamExt;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::{common::Course, mongodb::{Coll, Id}};

/// A persisted counter for one (candidate, course) pair.
///
/// Entries are created lazily by the first increment and never deleted
/// during an election cycle. Invariant: for every candidate, the sum of
/// counts across courses equals the number of voted voters who selected
/// that candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TallyEntry {
    #[serde(rename = "_id")]
    pub id: Id,
    pub candidate_id: String,
    pub course: Course,
    pub count: u64,
}

impl TallyEntry {
    /// Atomically add `delta` to the counter for (candidate, course),
    /// creating it at `delta` if it does not exist. Returns the new count.
    ///
    /// This must stay a single upsert-increment: a read-add-write sequence
    /// loses updates under concurrent submissions.
    pub async fn increment(
        tallies: &Coll<TallyEntry>,
        candidate_id: &str,
        course: Course,
        delta: u32,
    ) -> Result<u64> {
        let filter = doc! {
            "candidate_id": candidate_id,
            "course": course,
        };
        let update = doc! {
            "$inc": { "count": i64::from(delta) },
        };
        let options = FindOneAndUpdateOptions::builder()
            .upsert(true)
            .return_document(ReturnDocument::After)
            .build();
        loop {
            let result = tallies
                .find_one_and_update(filter.clone(), update.clone(), options.clone())
                .await;
            return match result {
                Ok(Some(entry)) => Ok(entry.count),
                // Unreachable with upsert + ReturnDocument::After.
                Ok(None) => Err(Error::internal(format!(
                    "Upsert-increment for ('{candidate_id}', {course}) returned no document"
                ))),
                // Concurrent first increments race the upsert's insert; the
                // loser hits the unique index and succeeds as a plain update
                // on retry.
                Err(e) if is_duplicate_key(&e) => continue,
                Err(e) => Err(e.into()),
            };
        }
    }

    /// All per-course counts for the given candidate. Pairs that were never
    /// incremented are simply absent, i.e. zero.
    pub async fn read_all(
        tallies: &Coll<TallyEntry>,
        candidate_id: &str,
    ) -> Result<HashMap<Course, u64>> {
        let entries: Vec<TallyEntry> = tallies
            .find(doc! {"candidate_id": candidate_id}, None)
            .await?
            .try_collect()
            .await?;
        Ok(entries
            .into_iter()
            .map(|entry| (entry.course, entry.count))
            .collect())
    }
}

fn is_duplicate_key(err: &DbError) -> bool {
    const DUPLICATE_KEY: i32 = 11000;
    match &*err.kind {
        ErrorKind::Command(e) => e.code == DUPLICATE_KEY,
        ErrorKind::Write(WriteFailure::WriteError(e)) => e.code == DUPLICATE_KEY,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use mongodb::Database;
    use rocket::futures::future;

    #[backend_test]
    async fn increment_creates_then_adds(db: Database) {
        let tallies = Coll::<TallyEntry>::from_db(&db);

        // First increment lazily creates the entry.
        let count = TallyEntry::increment(&tallies, "avila", Course::Bsit, 1)
            .await
            .unwrap();
        assert_eq!(count, 1);

        // Further increments add to it.
        let count = TallyEntry::increment(&tallies, "avila", Course::Bsit, 2)
            .await
            .unwrap();
        assert_eq!(count, 3);

        // Other (candidate, course) pairs are independent.
        let count = TallyEntry::increment(&tallies, "avila", Course::Bscs, 1)
            .await
            .unwrap();
        assert_eq!(count, 1);

        let by_course = TallyEntry::read_all(&tallies, "avila").await.unwrap();
        assert_eq!(by_course.get(&Course::Bsit), Some(&3));
        assert_eq!(by_course.get(&Course::Bscs), Some(&1));
        assert_eq!(by_course.get(&Course::Bsba), None);
    }

    #[backend_test]
    async fn concurrent_increments_all_reflected(db: Database) {
        const SUBMISSIONS: usize = 20;

        let tallies = Coll::<TallyEntry>::from_db(&db);

        // N concurrent increments of the same key must all land.
        let results = future::join_all(
            (0..SUBMISSIONS).map(|_| TallyEntry::increment(&tallies, "cruz", Course::Bsit, 1)),
        )
        .await;
        for result in results {
            result.unwrap();
        }

        let by_course = TallyEntry::read_all(&tallies, "cruz").await.unwrap();
        assert_eq!(by_course.get(&Course::Bsit), Some(&(SUBMISSIONS as u64)));
    }
}
