use std::ops::{Deref, DerefMut};

use chrono::{DateTime, Utc};
use mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime;
use serde::{Deserialize, Serialize};

use crate::model::{
    common::election::{ElectionLevel, ElectionStatus, ElectionType},
    mongodb::Id,
};

/// Core election data, as stored in the database.
#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub struct ElectionCore {
    /// Unique title.
    pub title: String,
    /// What the election is for.
    pub purpose: String,
    /// When voting opens.
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub start_date: DateTime<Utc>,
    /// When voting closes; also the end of the candidacy window.
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub end_date: DateTime<Utc>,
    pub election_type: ElectionType,
    pub level: ElectionLevel,
    /// Lifecycle state. Only the scheduler moves this.
    pub status: ElectionStatus,
    /// Set once, by the result engine.
    pub result_declared: bool,
    /// The constituency this election is scoped to.
    pub constituency_id: Id,
    /// The admin who created the election.
    pub created_by: Id,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

impl ElectionCore {
    /// Is the window `[start, end]` overlapping with this election's?
    pub fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        self.start_date <= end && self.end_date >= start
    }

    /// Can candidates still be added at time `now`?
    pub fn accepts_candidates(&self, now: DateTime<Utc>) -> bool {
        now < self.end_date
    }
}

/// An election without an ID.
pub type NewElection = ElectionCore;

/// An election from the database, with its unique ID.
#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub struct Election {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub election: ElectionCore,
}

impl Deref for Election {
    type Target = ElectionCore;

    fn deref(&self) -> &Self::Target {
        &self.election
    }
}

impl DerefMut for Election {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.election
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;

    fn example() -> ElectionCore {
        let start = Utc.with_ymd_and_hms(2026, 3, 1, 8, 0, 0).unwrap();
        ElectionCore {
            title: "Ward 7 Municipal".to_string(),
            purpose: "Elect the ward councillor".to_string(),
            start_date: start,
            end_date: start + Duration::days(3),
            election_type: ElectionType::Municipal,
            level: ElectionLevel::Constituency,
            status: ElectionStatus::Upcoming,
            result_declared: false,
            constituency_id: Id::new(),
            created_by: Id::new(),
            created_at: start - Duration::days(10),
        }
    }

    #[test]
    fn overlap_is_inclusive() {
        let election = example();
        let start = election.start_date;
        let end = election.end_date;

        assert!(election.overlaps(start, end));
        assert!(election.overlaps(end, end + Duration::days(2)));
        assert!(election.overlaps(start - Duration::days(2), start));
        assert!(election.overlaps(start + Duration::hours(1), start + Duration::hours(2)));
        assert!(!election.overlaps(end + Duration::seconds(1), end + Duration::days(2)));
        assert!(!election.overlaps(start - Duration::days(2), start - Duration::seconds(1)));
    }

    #[test]
    fn candidacy_window_closes_at_end() {
        let election = example();
        assert!(election.accepts_candidates(election.start_date));
        assert!(election.accepts_candidates(election.end_date - Duration::seconds(1)));
        assert!(!election.accepts_candidates(election.end_date));
    }
}
