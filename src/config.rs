use std::sync::Arc;

use chrono::Duration;
use log::{error, info};
use mongodb::Client as MongoClient;
use rocket::{
    fairing::{Fairing, Info, Kind},
    Build, Rocket,
};
use serde::Deserialize;

use crate::{
    clock::SystemClock,
    engine::Services,
    model::mongodb::ensure_indexes_exist,
    store::MongoStore,
};

pub const MIN_SCHEDULER_INTERVAL: u64 = 60;
pub const MAX_SCHEDULER_INTERVAL: u64 = 3600;

/// Application configuration, derived from `Rocket.toml` and `ROCKET_*`
/// environment variables. This struct becomes managed state and can be
/// inspected by any endpoint.
#[derive(Deserialize)]
pub struct Config {
    // non-secrets
    #[serde(default = "default_auth_ttl")]
    auth_ttl: u32,
    #[serde(default = "default_scheduler_interval")]
    scheduler_interval: u64,
    #[serde(default = "default_scheduler_enabled")]
    scheduler_enabled: bool,
    // secrets
    jwt_secret: String,
}

fn default_auth_ttl() -> u32 {
    3600
}

fn default_scheduler_interval() -> u64 {
    MIN_SCHEDULER_INTERVAL
}

fn default_scheduler_enabled() -> bool {
    true
}

impl Config {
    /// Valid lifetime of auth token cookies in seconds.
    pub fn auth_ttl(&self) -> Duration {
        Duration::seconds(self.auth_ttl.into())
    }

    /// Secret key used to sign and verify JWTs.
    pub fn jwt_secret(&self) -> &[u8] {
        self.jwt_secret.as_bytes()
    }

    /// Time between scheduler sweeps, between one minute and one hour.
    pub fn scheduler_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(
            self.scheduler_interval
                .clamp(MIN_SCHEDULER_INTERVAL, MAX_SCHEDULER_INTERVAL),
        )
    }

    /// Whether the background scheduler runs at all.
    pub fn scheduler_enabled(&self) -> bool {
        self.scheduler_enabled
    }
}

/// A fairing that loads the application config and puts it in managed state.
/// This could easily be achieved using `AdHoc::config`, but is written out
/// explicitly for symmetry with the other fairings and control over error
/// messages.
pub struct ConfigFairing;

#[rocket::async_trait]
impl Fairing for ConfigFairing {
    fn info(&self) -> Info {
        Info {
            name: "Config",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, mut rocket: Rocket<Build>) -> rocket::fairing::Result {
        // Load the config.
        let config = match rocket.figment().extract::<Config>() {
            Ok(config) => config,
            Err(e) => {
                error!("Failed to load application config");
                rocket::config::pretty_print_error(e);
                return Err(rocket);
            }
        };

        // Manage the state.
        rocket = rocket.manage(config);
        Ok(rocket)
    }
}

/// Configuration for the database.
#[derive(Deserialize)]
pub struct DbConfig {
    // non-secrets
    #[serde(default = "default_db_name")]
    pub db_name: String,
    // secrets
    pub db_uri: String,
}

fn default_db_name() -> String {
    "elections".to_string()
}

impl DbConfig {
    /// Connect to the database, making sure the required indexes exist.
    pub async fn connect(&self) -> mongodb::error::Result<MongoStore> {
        let client = MongoClient::with_uri_str(&self.db_uri).await?;
        let db = client.database(&self.db_name);
        ensure_indexes_exist(&db).await?;
        Ok(MongoStore::new(client, db))
    }
}

/// A fairing that loads the MongoDB config, connects to the database,
/// performs any setup necessary, and places the [`Services`] backed by it
/// into managed state.
pub struct DatabaseFairing;

#[rocket::async_trait]
impl Fairing for DatabaseFairing {
    fn info(&self) -> Info {
        Info {
            name: "MongoDB",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, mut rocket: Rocket<Build>) -> rocket::fairing::Result {
        // Load the config.
        let config = match rocket.figment().extract::<DbConfig>() {
            Ok(config) => config,
            Err(e) => {
                error!("Failed to load database config");
                rocket::config::pretty_print_error(e);
                return Err(rocket);
            }
        };
        info!("Loaded database config, connecting to `{}`...", config.db_name);

        let store = match config.connect().await {
            Ok(store) => store,
            Err(e) => {
                error!("Failed to connect to database: {e}");
                return Err(rocket);
            }
        };
        info!("...database connection online!");

        // Manage the state.
        let services = Services::from_store(Arc::new(store), Arc::new(SystemClock));
        rocket = rocket.manage(services);
        Ok(rocket)
    }
}

/// Example data for tests.
#[cfg(test)]
mod examples {
    use super::*;

    impl Config {
        pub fn example() -> Self {
            Self {
                auth_ttl: 3600,
                scheduler_interval: 60,
                scheduler_enabled: false,
                jwt_secret: "test-secret".to_string(),
            }
        }

        pub fn set_jwt_secret(&mut self, secret: &str) {
            self.jwt_secret = secret.to_string();
        }
    }
}
