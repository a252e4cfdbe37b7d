use std::ops::{Deref, DerefMut};

use mongodb::{bson::doc, options::FindOptions};
use rocket::futures::TryStreamExt;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::model::{common::ballot::PositionId, mongodb::{Coll, Id}};

/// Core position data, as stored in the database.
///
/// Positions are created by the administrative surface before voting opens
/// and are read-only during the voting window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionCore {
    /// Position unique identifier.
    pub position_id: PositionId,
    /// Presentation order.
    pub display_order: u32,
}

/// A position without an ID.
pub type NewPosition = PositionCore;

/// A position from the database, with its unique ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub position: PositionCore,
}

impl Position {
    /// Snapshot of the open positions, sorted by display order.
    pub async fn catalog(positions: &Coll<Position>) -> Result<Vec<Position>> {
        let options = FindOptions::builder()
            .sort(doc! {"display_order": 1})
            .build();
        Ok(positions.find(None, options).await?.try_collect().await?)
    }
}

impl Deref for Position {
    type Target = PositionCore;

    fn deref(&self) -> &Self::Target {
        &self.position
    }
}

impl DerefMut for Position {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.position
    }
}

/// Example data for tests.
#[cfg(test)]
mod examples {
    use super::*;

    impl PositionCore {
        pub fn president() -> Self {
            Self {
                position_id: "president".to_string(),
                display_order: 1,
            }
        }

        pub fn secretary() -> Self {
            Self {
                position_id: "secretary".to_string(),
                display_order: 2,
            }
        }
    }

    impl Position {
        pub fn example(core: PositionCore) -> Self {
            Self {
                id: Id::new(),
                position: core,
            }
        }
    }
}
