#[macro_use]
extern crate rocket;

#[cfg(test)]
#[macro_use]
extern crate backend_test;

use rocket::{Build, Rocket};

pub mod api;
pub mod clock;
pub mod config;
pub mod engine;
pub mod error;
pub mod logging;
pub mod model;
pub mod scheduled_task;
pub mod store;

#[cfg(test)]
mod test_support;

use config::{Config, ConfigFairing, DatabaseFairing};
use engine::{SchedulerFairing, Services};
use logging::LoggerFairing;

/// Build the server: config, then the database, then the scheduler.
pub fn build() -> Rocket<Build> {
    mount(rocket::build())
        .attach(ConfigFairing)
        .attach(DatabaseFairing)
        .attach(SchedulerFairing::default())
}

/// Build the server over ready-made services and config, without touching
/// the database or starting the scheduler.
pub fn rocket_for_services(services: Services, config: Config) -> Rocket<Build> {
    mount(rocket::build()).manage(services).manage(config)
}

fn mount(rocket: Rocket<Build>) -> Rocket<Build> {
    rocket
        .mount("/election", api::routes())
        .register("/", api::catchers())
        .attach(LoggerFairing)
}
