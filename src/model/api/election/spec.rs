use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    error::{Error, FieldErrors, Result},
    model::{
        api::id::ApiId,
        common::election::{ElectionLevel, ElectionStatus, ElectionType},
        db::election::NewElection,
        mongodb::Id,
    },
};

pub const MAX_TITLE_LEN: usize = 200;

/// An election as submitted by an admin.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElectionSpec {
    pub title: String,
    pub purpose: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub election_type: ElectionType,
    pub level: ElectionLevel,
    pub constituency_id: ApiId,
}

impl ElectionSpec {
    /// Check every field, reporting all problems at once.
    pub fn validate(&self, now: DateTime<Utc>) -> Result<()> {
        let mut fields = FieldErrors::new();

        let title = self.title.trim();
        if title.is_empty() {
            fields.insert("title", "must not be blank".to_string());
        } else if title.chars().count() > MAX_TITLE_LEN {
            fields.insert(
                "title",
                format!("must be at most {MAX_TITLE_LEN} characters"),
            );
        }
        if self.purpose.trim().is_empty() {
            fields.insert("purpose", "must not be blank".to_string());
        }
        if self.end_date - self.start_date < Duration::days(1) {
            fields.insert(
                "end_date",
                "must be at least one day after start_date".to_string(),
            );
        } else if self.end_date <= now {
            fields.insert("end_date", "must be in the future".to_string());
        }

        if fields.is_empty() {
            Ok(())
        } else {
            Err(Error::Validation {
                message: "Invalid election data".to_string(),
                fields,
            })
        }
    }

    /// Build the election to insert, with its status computed from `now`.
    pub fn into_election(self, created_by: Id, now: DateTime<Utc>) -> NewElection {
        NewElection {
            title: self.title.trim().to_string(),
            purpose: self.purpose.trim().to_string(),
            status: ElectionStatus::initial(self.start_date, now),
            start_date: self.start_date,
            end_date: self.end_date,
            election_type: self.election_type,
            level: self.level,
            result_declared: false,
            constituency_id: self.constituency_id.into(),
            created_by,
            created_at: now,
        }
    }
}

/// Example data for tests.
#[cfg(test)]
mod examples {
    use super::*;

    impl ElectionSpec {
        /// A municipal election opening in two days and running for three.
        pub fn example(constituency_id: Id, now: DateTime<Utc>) -> Self {
            Self {
                title: "Ward 7 Municipal Election".to_string(),
                purpose: "Elect the ward councillor".to_string(),
                start_date: now + Duration::days(2),
                end_date: now + Duration::days(5),
                election_type: ElectionType::Municipal,
                level: ElectionLevel::Constituency,
                constituency_id: constituency_id.into(),
            }
        }
    }
}
