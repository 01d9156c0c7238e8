use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{
    api::{candidate::CandidateDescription, id::ApiId},
    common::election::{ElectionLevel, ElectionStatus, ElectionType, Priority},
    db::{election::Election, location::LocationPath},
};

/// An API-friendly election description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElectionDescription {
    pub id: ApiId,
    pub title: String,
    pub purpose: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub election_type: ElectionType,
    pub level: ElectionLevel,
    pub status: ElectionStatus,
    pub result_declared: bool,
    pub constituency_id: ApiId,
    pub created_by: ApiId,
    pub created_at: DateTime<Utc>,
    /// Derived from type and level.
    pub priority: Priority,
    /// Derived from type and level.
    pub tags: Vec<String>,
}

impl From<Election> for ElectionDescription {
    fn from(election: Election) -> Self {
        let priority = election.election_type.priority(election.level);
        let tags = election
            .election_type
            .tags(election.level)
            .into_iter()
            .map(String::from)
            .collect();
        let core = election.election;
        Self {
            id: election.id.into(),
            title: core.title,
            purpose: core.purpose,
            start_date: core.start_date,
            end_date: core.end_date,
            election_type: core.election_type,
            level: core.level,
            status: core.status,
            result_declared: core.result_declared,
            constituency_id: core.constituency_id.into(),
            created_by: core.created_by.into(),
            created_at: core.created_at,
            priority,
            tags,
        }
    }
}

/// Where an election is held, by name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationDescription {
    pub constituency_id: ApiId,
    pub constituency: String,
    pub mandal: String,
    pub district: String,
    pub state: String,
}

impl From<LocationPath> for LocationDescription {
    fn from(path: LocationPath) -> Self {
        Self {
            constituency_id: path.constituency_id.into(),
            constituency: path.constituency,
            mandal: path.mandal,
            district: path.district,
            state: path.state,
        }
    }
}

/// Everything a voter sees about one election.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElectionDetail {
    #[serde(flatten)]
    pub election: ElectionDescription,
    /// `None` if the geography service no longer knows the constituency.
    pub location: Option<LocationDescription>,
    pub candidates: Vec<CandidateDescription>,
    pub has_voted: bool,
    /// The candidate the caller voted for, if they have.
    pub voted_candidate_id: Option<ApiId>,
    /// Set once the result is declared.
    pub winners: Option<Vec<ApiId>>,
    /// Set once the result is declared.
    pub is_draw: Option<bool>,
}
