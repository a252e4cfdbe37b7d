//! DB-compatible (e.g. de/serialisable) types.
//!
//! The types in this module are serialised in a DB-friendly way, e.g.:
//!
//! - IDs and datetimes are serialised in MongoDB's own format.

pub mod ballot;
pub use ballot::{Ballot, BallotCore};

pub mod candidate;
pub use candidate::{Candidate, NewCandidate};

pub mod position;
pub use position::{NewPosition, Position};

pub mod tally;
pub use tally::TallyEntry;

pub mod voter;
pub use voter::{NewVoter, VoteClaim, Voter};
