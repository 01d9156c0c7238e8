use rocket::{http::Status, Catcher, Request, Route};

use crate::{error::GuardFailure, model::api::envelope::ApiResponse};

mod admin;
mod voter;

/// All routes, to be mounted under `/election`.
pub fn routes() -> Vec<Route> {
    let mut routes = Vec::new();
    routes.extend(admin::routes());
    routes.extend(voter::routes());
    routes
}

pub fn catchers() -> Vec<Catcher> {
    catchers![default_catcher]
}

/// Render every unhandled failure in the uniform envelope, with the guard's
/// own message where one failed.
#[catch(default)]
fn default_catcher(status: Status, req: &Request<'_>) -> ApiResponse<()> {
    match GuardFailure::of(req) {
        Some((message, errors)) if status != Status::InternalServerError => {
            ApiResponse::failure(status, message, Some(errors.clone()))
        }
        _ => ApiResponse::failure(status, status.reason().unwrap_or("Request failed"), None),
    }
}
