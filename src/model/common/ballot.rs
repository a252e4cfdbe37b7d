use std::fmt::Debug;

use mongodb::bson::{to_bson, Bson};
use serde::{de::DeserializeOwned, Serialize};
use serde_unit_struct::{Deserialize_unit_struct, Serialize_unit_struct};

/// Position identifiers are strings assigned by the administrative surface.
pub type PositionId = String;
/// Candidate identifiers are strings assigned by the administrative surface.
pub type CandidateId = String;

/// Trait for the ballot lifecycle state, usable both as a typestate marker
/// and as a query filter value.
pub trait BallotState:
    Copy + Debug + Serialize + DeserializeOwned + Send + Sync + Unpin + 'static
{
}

/// Marker type for ballots whose tally increments may still be outstanding.
#[derive(Debug, Eq, PartialEq, Copy, Clone, Deserialize_unit_struct, Serialize_unit_struct)]
pub struct Pending;

impl From<Pending> for Bson {
    fn from(state: Pending) -> Self {
        to_bson(&state).expect("Serialisation is infallible")
    }
}

impl BallotState for Pending {}

/// Marker type for ballots fully reflected in the tallies.
#[derive(Debug, Eq, PartialEq, Copy, Clone, Deserialize_unit_struct, Serialize_unit_struct)]
pub struct Counted;

impl From<Counted> for Bson {
    fn from(state: Counted) -> Self {
        to_bson(&state).expect("Serialisation is infallible")
    }
}

impl BallotState for Counted {}
