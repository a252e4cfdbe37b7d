use std::sync::Arc;

use chrono::{Duration, Utc};
use mongodb::{bson::doc, Database};
use rocket::{
    fairing::{Fairing, Info, Kind},
    futures::future::{BoxFuture, FutureExt},
    futures::TryStreamExt,
    Build, Rocket,
};

use crate::{
    config::Config,
    error::Result,
    model::{
        common::ballot::{Counted, Pending},
        db::{Ballot, TallyEntry},
        mongodb::Coll,
    },
    scheduled_task::ScheduledTask,
};

/// Completes the tally increments of ballots whose submission was cut short
/// after the vote-status claim succeeded.
///
/// A pending ballot records which positions have already been counted, so a
/// sweep only re-applies the increments that are actually missing; it never
/// touches the vote-status claim. Sweeps run periodically and also once at
/// startup, to catch anything a crash left behind.
pub struct TallyReconciler {
    pending_ballots: Coll<Ballot<Pending>>,
    counted_ballots: Coll<Ballot<Counted>>,
    tallies: Coll<TallyEntry>,
    interval: Duration,
    grace: Duration,
}

impl TallyReconciler {
    pub fn new(db: &Database, config: &Config) -> Self {
        Self {
            pending_ballots: Coll::from_db(db),
            counted_ballots: Coll::from_db(db),
            tallies: Coll::from_db(db),
            interval: config.reconcile_interval(),
            grace: config.reconcile_grace(),
        }
    }

    /// Complete every pending ballot older than the grace interval.
    /// Returns how many ballots were finished.
    ///
    /// The grace interval keeps the sweep away from ballots whose submission
    /// is still in flight.
    pub async fn sweep(&self) -> Result<u64> {
        let cutoff = Utc::now() - self.grace;
        let filter = doc! {
            "state": Pending,
            "creation_time": {"$lt": mongodb::bson::DateTime::from_chrono(cutoff)},
        };
        let stale: Vec<Ballot<Pending>> = self
            .pending_ballots
            .find(filter, None)
            .await?
            .try_collect()
            .await?;

        let mut completed = 0;
        for ballot in stale {
            let id = ballot.id;
            match self.complete(ballot).await {
                Ok(()) => completed += 1,
                // Leave it pending; the next sweep retries.
                Err(e) => error!("Failed to reconcile ballot {id}: {e}"),
            }
        }
        Ok(completed)
    }

    /// Apply the increments a pending ballot is still missing, then finish it.
    async fn complete(&self, ballot: Ballot<Pending>) -> Result<()> {
        for (position, candidate) in &ballot.selections {
            if ballot.counted.contains(position) {
                continue;
            }
            let count =
                TallyEntry::increment(&self.tallies, candidate, ballot.course, 1).await?;
            debug!(
                "Reconciled tally for ('{candidate}', {}), now {count}",
                ballot.course
            );
            Ballot::mark_counted(&self.pending_ballots, ballot.id, position).await?;
        }

        let id = ballot.id;
        let counted = ballot.count();
        let filter = doc! {"_id": *id, "state": Pending};
        let result = self
            .counted_ballots
            .replace_one(filter, &counted, None)
            .await?;
        if result.modified_count == 1 {
            info!("Reconciled ballot {id}");
        } else {
            warn!("Ballot {id} was finished elsewhere during reconciliation");
        }
        Ok(())
    }

    /// Run a sweep, then reschedule. Since this is a recursive async
    /// function, we must use `BoxFuture` to avoid an infinitely-recursive
    /// state machine.
    fn run(reconciler: Arc<TallyReconciler>) -> BoxFuture<'static, ()> {
        async move {
            match reconciler.sweep().await {
                Ok(0) => debug!("Tally reconciler had nothing to do"),
                Ok(n) => warn!("Tally reconciler completed {n} ballot(s) with outstanding increments"),
                Err(e) => error!("Tally reconciliation sweep failed: {e}"),
            }

            let next_sweep = Utc::now() + reconciler.interval;
            // Detached on purpose; periodic sweeps never need cancelling.
            drop(ScheduledTask::new(Self::run(reconciler), next_sweep));
        }
        .boxed()
    }

    /// Schedule the first sweep to run immediately, after which the task
    /// reschedules itself every interval.
    pub fn schedule(self) {
        drop(ScheduledTask::new(Self::run(Arc::new(self)), Utc::now()));
    }
}

/// A fairing that starts the tally reconciler during Rocket ignition.
/// This fairing depends on the database being available in managed state,
/// and so must be attached after the fairing responsible for that.
pub struct TallyReconcilerFairing;

#[rocket::async_trait]
impl Fairing for TallyReconcilerFairing {
    fn info(&self) -> Info {
        Info {
            name: "Tally Reconciler",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, rocket: Rocket<Build>) -> rocket::fairing::Result {
        let db = match rocket.state::<Database>() {
            Some(db) => db,
            None => {
                error!("Database was not available when starting the tally reconciler");
                return Err(rocket);
            }
        };
        let config = match rocket.state::<Config>() {
            Some(config) => config,
            None => {
                error!("Config was not available when starting the tally reconciler");
                return Err(rocket);
            }
        };

        TallyReconciler::new(db, config).schedule();
        info!("Tally reconciler scheduled");
        Ok(rocket)
    }
}
