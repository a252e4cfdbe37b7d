use std::fmt::{Display, Formatter};

use mongodb::bson::{to_bson, Bson};
use serde::{Deserialize, Serialize};

/// The academic programs voters belong to.
///
/// Tallies are stratified by course, but always as keyed rows: nothing in the
/// stored data has one field per program, so extending this list does not
/// require a schema migration.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Course {
    Bsit,
    Bscs,
    Bsca,
    Bsba,
    Bshm,
    Bstm,
    Bsed,
    Bse,
    Bspsy,
    Bscrim,
}

impl Course {
    /// Every program, for aggregation sweeps.
    pub const ALL: [Course; 10] = [
        Course::Bsit,
        Course::Bscs,
        Course::Bsca,
        Course::Bsba,
        Course::Bshm,
        Course::Bstm,
        Course::Bsed,
        Course::Bse,
        Course::Bspsy,
        Course::Bscrim,
    ];

    /// The program's short code, as serialised.
    pub fn as_str(&self) -> &'static str {
        match self {
            Course::Bsit => "BSIT",
            Course::Bscs => "BSCS",
            Course::Bsca => "BSCA",
            Course::Bsba => "BSBA",
            Course::Bshm => "BSHM",
            Course::Bstm => "BSTM",
            Course::Bsed => "BSED",
            Course::Bse => "BSE",
            Course::Bspsy => "BSPSY",
            Course::Bscrim => "BSCRIM",
        }
    }
}

impl Display for Course {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl From<Course> for Bson {
    fn from(course: Course) -> Self {
        to_bson(&course).expect("Serialisation is infallible")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_codes_round_trip() {
        for course in Course::ALL {
            let json = rocket::serde::json::serde_json::to_string(&course).unwrap();
            assert_eq!(json, format!("\"{course}\""));
            let back: Course = rocket::serde::json::serde_json::from_str(&json).unwrap();
            assert_eq!(back, course);
        }
    }
}
