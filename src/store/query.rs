use std::str::FromStr;

use chrono::{DateTime, Utc};

use crate::model::{
    common::election::{ElectionLevel, ElectionStatus, ElectionType},
    db::election::Election,
    mongodb::Id,
};

/// Equality filters over elections. Unset fields match everything.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ElectionFilter {
    pub status: Option<ElectionStatus>,
    pub election_type: Option<ElectionType>,
    pub level: Option<ElectionLevel>,
    pub constituency_id: Option<Id>,
    pub result_declared: Option<bool>,
    /// Only elections ending strictly after this instant.
    pub ends_after: Option<DateTime<Utc>>,
}

impl ElectionFilter {
    /// Does the given election pass every set filter?
    pub fn matches(&self, election: &Election) -> bool {
        self.status.map_or(true, |s| election.status == s)
            && self.election_type.map_or(true, |t| election.election_type == t)
            && self.level.map_or(true, |l| election.level == l)
            && self
                .constituency_id
                .map_or(true, |c| election.constituency_id == c)
            && self
                .result_declared
                .map_or(true, |d| election.result_declared == d)
            && self.ends_after.map_or(true, |t| election.end_date > t)
    }
}

/// Fields a listing can be ordered by.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SortKey {
    CreatedAt,
    StartDate,
    EndDate,
    Title,
}

impl SortKey {
    /// The stored field name.
    pub fn field(&self) -> &'static str {
        match self {
            Self::CreatedAt => "created_at",
            Self::StartDate => "start_date",
            Self::EndDate => "end_date",
            Self::Title => "title",
        }
    }
}

/// Ordering of a listing. Ties are broken by ID in the same direction, so
/// the order is total.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ElectionSort {
    pub key: SortKey,
    pub descending: bool,
}

impl Default for ElectionSort {
    /// Newest first.
    fn default() -> Self {
        Self {
            key: SortKey::CreatedAt,
            descending: true,
        }
    }
}

/// Parses `<field>` or `<field>:<asc|desc>`, e.g. `start_date:asc`.
impl FromStr for ElectionSort {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (field, direction) = s.split_once(':').unwrap_or((s, "asc"));
        let key = match field.trim() {
            "created_at" => SortKey::CreatedAt,
            "start_date" => SortKey::StartDate,
            "end_date" => SortKey::EndDate,
            "title" => SortKey::Title,
            other => return Err(format!("cannot sort by `{other}`")),
        };
        let descending = match direction.trim() {
            "asc" => false,
            "desc" => true,
            other => return Err(format!("unknown sort direction `{other}`")),
        };
        Ok(Self { key, descending })
    }
}
