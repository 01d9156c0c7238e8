use chrono::{DateTime, Utc};
use rocket::{
    http::Status,
    response::{self, Responder},
    serde::json::{Json, Value},
    Request,
};
use serde::{Deserialize, Serialize};

/// Outcome marker at the top of every response body.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnvelopeStatus {
    Success,
    Error,
}

/// The uniform response body.
#[derive(Debug, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub status: EnvelopeStatus,
    pub message: String,
    pub data: Option<T>,
    /// Paging information, for listings.
    pub query: Option<Value>,
    /// Error details: a field map, a list of messages, or the bare message.
    pub errors: Option<Value>,
    pub timestamp: DateTime<Utc>,
}

/// An [`Envelope`] together with the HTTP status it is sent with.
#[derive(Debug)]
pub struct ApiResponse<T> {
    status: Status,
    envelope: Envelope<T>,
}

impl<T> ApiResponse<T> {
    fn success(status: Status, data: T, message: impl Into<String>) -> Self {
        Self {
            status,
            envelope: Envelope {
                status: EnvelopeStatus::Success,
                message: message.into(),
                data: Some(data),
                query: None,
                errors: None,
                timestamp: Utc::now(),
            },
        }
    }

    /// `200 OK` carrying `data`.
    pub fn ok(data: T, message: impl Into<String>) -> Self {
        Self::success(Status::Ok, data, message)
    }

    /// `201 Created` carrying `data`.
    pub fn created(data: T, message: impl Into<String>) -> Self {
        Self::success(Status::Created, data, message)
    }

    /// Attach query/paging information.
    pub fn with_query(mut self, query: Value) -> Self {
        self.envelope.query = Some(query);
        self
    }

    /// An error response. `errors` defaults to the message itself.
    pub fn failure(status: Status, message: impl Into<String>, errors: Option<Value>) -> Self {
        let message = message.into();
        let errors = errors.unwrap_or_else(|| Value::String(message.clone()));
        Self {
            status,
            envelope: Envelope {
                status: EnvelopeStatus::Error,
                message,
                data: None,
                query: None,
                errors: Some(errors),
                timestamp: Utc::now(),
            },
        }
    }

    pub fn status(&self) -> Status {
        self.status
    }
}

impl<'r, 'o: 'r, T> Responder<'r, 'o> for ApiResponse<T>
where
    T: Serialize,
{
    fn respond_to(self, req: &'r Request<'_>) -> response::Result<'o> {
        (self.status, Json(self.envelope)).respond_to(req)
    }
}

#[cfg(test)]
mod tests {
    use rocket::serde::json::{json, serde_json};

    use super::*;

    #[test]
    fn failure_defaults_errors_to_message() {
        let response = ApiResponse::<()>::failure(Status::NotFound, "Election not found", None);
        assert_eq!(response.status(), Status::NotFound);
        let body = serde_json::to_value(&response.envelope).unwrap();
        assert_eq!(body["status"], json!("error"));
        assert_eq!(body["errors"], json!("Election not found"));
        assert_eq!(body["data"], Value::Null);
    }

    #[test]
    fn success_carries_data_and_query() {
        let response =
            ApiResponse::created(vec![1, 2, 3], "Created").with_query(json!({"page": 1}));
        assert_eq!(response.status(), Status::Created);
        let body = serde_json::to_value(&response.envelope).unwrap();
        assert_eq!(body["status"], json!("success"));
        assert_eq!(body["data"], json!([1, 2, 3]));
        assert_eq!(body["query"], json!({"page": 1}));
        assert_eq!(body["errors"], Value::Null);
    }
}
