use rocket::{http::Status, serde::json::Json, Route};

use crate::error::Result;
use crate::model::{
    api::{
        auth::AuthToken,
        ballot::{BallotPaper, SubmissionDesc},
        voter::VoterDesc,
    },
    db::Voter,
    mongodb::Coll,
};
use crate::voting::{Submission, VoteCoordinator};

use super::common::voter_by_token;

pub fn routes() -> Vec<Route> {
    routes![get_voter, submit_ballot]
}

/// The logged-in voter's course and vote status.
#[get("/voter")]
pub(crate) async fn get_voter(token: AuthToken, voters: Coll<Voter>) -> Result<Json<VoterDesc>> {
    let voter = voter_by_token(&token, &voters).await?;
    Ok(Json(voter.into()))
}

/// Submit the voter's ballot paper.
///
/// `Accepted` and `AlreadyVoted` are both 200s: a repeated submission is the
/// correct outcome of the double-voting guard, not an error. A partial
/// failure is a 202: the vote is in, the counters catch up, and the voter
/// must not resubmit.
#[post("/voter/ballot", data = "<paper>", format = "json")]
pub(crate) async fn submit_ballot(
    token: AuthToken,
    paper: Json<BallotPaper>,
    coordinator: VoteCoordinator,
) -> Result<(Status, Json<SubmissionDesc>)> {
    let submission = coordinator.submit(token.id, paper.0).await?;
    let status = match &submission {
        Submission::TallyIncomplete { .. } => Status::Accepted,
        Submission::Accepted | Submission::AlreadyVoted => Status::Ok,
    };
    Ok((status, Json(submission.into())))
}
