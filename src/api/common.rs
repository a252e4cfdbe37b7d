use crate::error::{Error, Result};
use crate::model::{api::auth::AuthToken, db::Voter, mongodb::Coll};

/// Return the voter backing the given token.
///
/// A valid token whose voter has disappeared from the roll is treated the
/// same as an unknown voter.
pub async fn voter_by_token(token: &AuthToken, voters: &Coll<Voter>) -> Result<Voter> {
    voters
        .find_one(token.id.as_doc(), None)
        .await?
        .ok_or_else(|| Error::unauthorized(format!("No voter found for token ID {}", token.id)))
}
