//! The ballot submission and tally consistency engine.
//!
//! Submission is acquire-then-act: a voter's single vote is claimed with one
//! conditional update before any counter is touched, and every counter
//! change is a single atomic upsert-increment. The reconciler picks up
//! submissions that died between the two.

mod aggregator;
mod coordinator;
mod reconciler;
mod validator;

pub use aggregator::ResultAggregator;
pub use coordinator::{Submission, VoteCoordinator};
pub use reconciler::{TallyReconciler, TallyReconcilerFairing};
pub use validator::{validate, BallotError};
