use log::{error, info, LevelFilter};
use rocket::Error as RocketError;
use thiserror::Error;

/// Errors that stop the server from coming up or keep it from running.
#[derive(Debug, Error)]
enum Error {
    #[error("Server failed: {0}")]
    Launch(#[from] RocketError),
}

async fn run() -> Result<(), Error> {
    info!("Igniting server...");
    let rocket = election_backend::build().ignite().await?;
    info!("...config loaded, database connected");
    // Rocket's own logging is only useful during ignition.
    log4rs_dynamic_filters::DynamicLevelFilter::set("rocket", LevelFilter::Off);
    let _ = rocket.launch().await?;
    Ok(())
}

#[rocket::main]
async fn main() {
    log4rs::init_file("log4rs.yaml", log4rs_dynamic_filters::default_deserializers())
        .expect("Failed to initialise logging");
    info!("Starting election backend v{}", env!("CARGO_PKG_VERSION"));

    if let Err(err) = run().await {
        error!("{err}");
        error!("Critical failure, shutting down");
        std::process::exit(1)
    }
}
