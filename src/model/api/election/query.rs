use chrono::{DateTime, Utc};
use rocket::form::{self, FromFormField, ValueField};

use crate::{
    model::{
        api::id::ApiId,
        common::election::{ElectionLevel, ElectionStatus, ElectionType},
    },
    store::{ElectionFilter, ElectionSort},
};

/// Optional listing filters and ordering from the query string.
#[derive(Debug, Default, FromForm)]
pub struct ElectionQuery {
    pub status: Option<ElectionStatus>,
    pub election_type: Option<ElectionType>,
    pub level: Option<ElectionLevel>,
    pub constituency_id: Option<ApiId>,
    pub sort_by: Option<ElectionSort>,
}

impl ElectionQuery {
    /// The sort order, defaulting to newest first.
    pub fn sort(&self) -> ElectionSort {
        self.sort_by.unwrap_or_default()
    }

    /// Filters for elections still open for candidacy at `now`.
    pub fn open_at(&self, now: DateTime<Utc>) -> ElectionFilter {
        ElectionFilter {
            status: self.status,
            election_type: self.election_type,
            level: self.level,
            constituency_id: self.constituency_id.map(Into::into),
            result_declared: None,
            ends_after: Some(now),
        }
    }
}

#[rocket::async_trait]
impl<'r> FromFormField<'r> for ElectionSort {
    fn from_value(field: ValueField<'r>) -> form::Result<'r, Self> {
        field
            .value
            .parse()
            .map_err(|msg: String| form::Error::validation(msg).into())
    }
}
