#[macro_use]
extern crate rocket;

#[macro_use]
extern crate log;

#[cfg(test)]
#[macro_use]
extern crate backend_test;

use rocket::{Build, Rocket};

pub mod api;
pub mod config;
pub mod error;
pub mod logging;
pub mod model;
pub mod scheduled_task;
pub mod voting;

pub use config::Config;

/// Assemble the server: routes plus the config, database, reconciler and
/// logging fairings. Fairing order matters; the reconciler needs the
/// database in managed state.
pub fn build() -> Rocket<Build> {
    rocket::build()
        .mount("/", api::routes())
        .attach(config::ConfigFairing)
        .attach(config::DatabaseFairing)
        .attach(voting::TallyReconcilerFairing)
        .attach(logging::LoggerFairing)
}

/// Connect to the database named in the Rocket config.
#[cfg(test)]
pub(crate) async fn db_client() -> mongodb::Client {
    let db_uri = rocket::Config::figment()
        .extract_inner::<String>("db_uri")
        .expect("`db_uri` not set");
    mongodb::Client::with_uri_str(&db_uri)
        .await
        .unwrap_or_else(|_| panic!("Could not connect to database with `db_uri` \"{db_uri}\""))
}

/// Get a fresh database name for a test run.
#[cfg(test)]
pub(crate) fn database() -> String {
    config::get_database_name()
}

/// Build a rocket against an already-connected database, skipping the
/// database fairing. The reconciler is also left out: tests drive sweeps
/// directly.
#[cfg(test)]
pub(crate) async fn rocket_for_db(client: mongodb::Client, db_name: &str) -> Rocket<Build> {
    let db = client.database(db_name);
    model::mongodb::ensure_indexes_exist(&db)
        .await
        .expect("Failed to create indexes");
    rocket::build()
        .mount("/", api::routes())
        .attach(config::ConfigFairing)
        .attach(logging::LoggerFairing)
        .manage(client)
        .manage(db)
}
