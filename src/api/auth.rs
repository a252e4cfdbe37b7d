use mongodb::bson::{doc, to_bson};
use rocket::{http::CookieJar, serde::json::Json, Route, State};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::model::{
    api::{
        auth::{AuthToken, LoginRequest, AUTH_TOKEN_COOKIE},
        voter::VoterDesc,
    },
    db::Voter,
    mongodb::Coll,
};

pub fn routes() -> Vec<Route> {
    routes![login, logout]
}

/// Consume an already-authenticated student identity and start a voter
/// session. The campus sign-on that verified the credential happens before
/// this endpoint; an unknown student number means the voter is not on the
/// roll.
#[post("/auth/login", data = "<request>", format = "json")]
pub(crate) async fn login(
    request: Json<LoginRequest>,
    voters: Coll<Voter>,
    config: &State<Config>,
    cookies: &CookieJar<'_>,
) -> Result<Json<VoterDesc>> {
    let student_hmac = request.0.student_number.into_hmac(config);
    let filter = doc! {
        // Valid because byte-array serialisation doesn't fail.
        "student_hmac": to_bson(&student_hmac).unwrap(),
    };
    let voter = voters
        .find_one(filter, None)
        .await?
        .ok_or_else(|| Error::unauthorized("Student is not on the voter roll"))?;

    cookies.add(AuthToken::for_voter(&voter).into_cookie(config));
    Ok(Json(voter.into()))
}

/// End the voter session.
#[post("/auth/logout")]
pub(crate) async fn logout(cookies: &CookieJar<'_>) {
    cookies.remove(rocket::http::Cookie::named(AUTH_TOKEN_COOKIE));
}

#[cfg(test)]
mod tests {
    use super::*;

    use mongodb::Database;
    use rocket::{http::ContentType, http::Status, local::asynchronous::Client};

    use crate::model::{common::{Course, VoteStatus}, db::voter::NewVoter};

    #[backend_test]
    async fn login_starts_a_session(client: Client, db: Database) {
        let config = client.rocket().state::<Config>().unwrap();
        Coll::<NewVoter>::from_db(&db)
            .insert_one(NewVoter::example(config), None)
            .await
            .unwrap();

        let response = client
            .post(uri!(login))
            .header(ContentType::JSON)
            .body(rocket::serde::json::json!(LoginRequest::example()).to_string())
            .dispatch()
            .await;

        assert_eq!(response.status(), Status::Ok);
        let cookie = response.cookies().get(AUTH_TOKEN_COOKIE);
        assert!(cookie.is_some());

        let desc: VoterDesc =
            rocket::serde::json::serde_json::from_str(&response.into_string().await.unwrap())
                .unwrap();
        assert_eq!(desc.course, Course::Bsit);
        assert_eq!(desc.vote_status, VoteStatus::NotVoted);
    }

    #[backend_test]
    async fn unknown_students_cannot_log_in(client: Client, db: Database) {
        let config = client.rocket().state::<Config>().unwrap();
        // Only the first example voter is on the roll.
        Coll::<NewVoter>::from_db(&db)
            .insert_one(NewVoter::example(config), None)
            .await
            .unwrap();

        let response = client
            .post(uri!(login))
            .header(ContentType::JSON)
            .body(rocket::serde::json::json!(LoginRequest::example2()).to_string())
            .dispatch()
            .await;

        assert_eq!(response.status(), Status::Unauthorized);
        assert!(response.cookies().get(AUTH_TOKEN_COOKIE).is_none());
    }

    #[backend_test(voter)]
    async fn logout_clears_the_session(client: Client) {
        let response = client.post(uri!(logout)).dispatch().await;
        assert_eq!(response.status(), Status::Ok);

        // The session cookie no longer works.
        let response = client.get(uri!(crate::api::voting::get_voter)).dispatch().await;
        assert_eq!(response.status(), Status::Unauthorized);
    }
}
