use rocket::Route;

pub mod auth;
pub mod catalog;
pub mod common;
pub mod results;
pub mod voting;

pub fn routes() -> Vec<Route> {
    let mut routes = Vec::new();
    routes.extend(auth::routes());
    routes.extend(catalog::routes());
    routes.extend(voting::routes());
    routes.extend(results::routes());
    routes
}
