use rocket::{serde::json::Json, Route};

use crate::error::Result;
use crate::model::api::results::ElectionSummary;
use crate::voting::ResultAggregator;

pub fn routes() -> Vec<Route> {
    routes![get_results]
}

/// Live turnout and per-candidate totals. Read-only; reflects committed
/// state and never blocks submissions.
#[get("/results")]
pub(crate) async fn get_results(aggregator: ResultAggregator) -> Result<Json<ElectionSummary>> {
    Ok(Json(aggregator.summary().await?))
}
