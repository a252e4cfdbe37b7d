use rocket::{serde::json::Json, Route};

use crate::error::Result;
use crate::model::{
    api::catalog::{CandidateDesc, PositionDesc},
    db::{Candidate, Position},
    mongodb::Coll,
};

pub fn routes() -> Vec<Route> {
    routes![get_positions, get_candidates]
}

/// The open positions, in display order.
#[get("/positions")]
pub(crate) async fn get_positions(positions: Coll<Position>) -> Result<Json<Vec<PositionDesc>>> {
    let catalog = Position::catalog(&positions).await?;
    Ok(Json(catalog.into_iter().map(Into::into).collect()))
}

/// The full candidate catalog.
#[get("/candidates")]
pub(crate) async fn get_candidates(
    candidates: Coll<Candidate>,
) -> Result<Json<Vec<CandidateDesc>>> {
    let catalog = Candidate::catalog(&candidates).await?;
    Ok(Json(catalog.into_iter().map(Into::into).collect()))
}

#[cfg(test)]
mod tests {
    use super::*;

    use mongodb::Database;
    use rocket::{http::Status, local::asynchronous::Client, serde::json::serde_json};

    use crate::model::db::{candidate::NewCandidate, position::NewPosition};

    #[backend_test]
    async fn positions_are_listed_in_display_order(client: Client, db: Database) {
        // Insert out of order.
        Coll::<NewPosition>::from_db(&db)
            .insert_many([NewPosition::secretary(), NewPosition::president()], None)
            .await
            .unwrap();

        let response = client.get(uri!(get_positions)).dispatch().await;
        assert_eq!(response.status(), Status::Ok);

        let positions: Vec<PositionDesc> =
            serde_json::from_str(&response.into_string().await.unwrap()).unwrap();
        let ids: Vec<&str> = positions.iter().map(|p| p.position_id.as_str()).collect();
        assert_eq!(ids, vec!["president", "secretary"]);
    }

    #[backend_test]
    async fn candidates_are_listed_with_their_positions(client: Client, db: Database) {
        Coll::<NewCandidate>::from_db(&db)
            .insert_many(
                [
                    NewCandidate::president_avila(),
                    NewCandidate::president_bautista(),
                    NewCandidate::secretary_cruz(),
                ],
                None,
            )
            .await
            .unwrap();

        let response = client.get(uri!(get_candidates)).dispatch().await;
        assert_eq!(response.status(), Status::Ok);

        let candidates: Vec<CandidateDesc> =
            serde_json::from_str(&response.into_string().await.unwrap()).unwrap();
        assert_eq!(candidates.len(), 3);
        let cruz = candidates
            .iter()
            .find(|c| c.candidate_id == "cruz")
            .unwrap();
        assert_eq!(cruz.position_id, "secretary");
        assert_eq!(cruz.name, "Carmela Cruz");
    }
}
