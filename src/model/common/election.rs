use chrono::{DateTime, Utc};
use mongodb::bson::{to_bson, Bson};
use rocket::FromFormField;
use serde::{Deserialize, Serialize};

/// States in the election lifecycle.
///
/// Transitions only ever go forwards: `Upcoming` -> `Ongoing` -> `Completed`.
#[derive(
    Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, FromFormField,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ElectionStatus {
    /// Scheduled; voting has not opened yet.
    #[field(value = "UPCOMING")]
    Upcoming,
    /// Voting is open.
    #[field(value = "ONGOING")]
    Ongoing,
    /// Voting has closed; results may be declared.
    #[field(value = "COMPLETED")]
    Completed,
}

impl ElectionStatus {
    /// The status a freshly created election starts in.
    pub fn initial(start_date: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        if start_date > now {
            Self::Upcoming
        } else {
            Self::Ongoing
        }
    }

    /// Whether moving from `self` to `next` respects the lifecycle ordering.
    pub fn can_advance_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Upcoming, Self::Ongoing) | (Self::Ongoing, Self::Completed)
        )
    }

    /// Elections in these states occupy their constituency's calendar.
    pub fn is_active(self) -> bool {
        matches!(self, Self::Upcoming | Self::Ongoing)
    }
}

impl From<ElectionStatus> for Bson {
    fn from(status: ElectionStatus) -> Self {
        to_bson(&status).expect("Serialisation is infallible")
    }
}

/// The kind of body being elected.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, FromFormField)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ElectionType {
    #[field(value = "NATIONAL")]
    National,
    #[field(value = "STATE_ASSEMBLY")]
    StateAssembly,
    #[field(value = "MUNICIPAL")]
    Municipal,
    #[field(value = "LOCAL_BODY")]
    LocalBody,
    #[field(value = "BY_ELECTION")]
    ByElection,
}

impl From<ElectionType> for Bson {
    fn from(election_type: ElectionType) -> Self {
        to_bson(&election_type).expect("Serialisation is infallible")
    }
}

impl ElectionType {
    /// The upper-case wire token, as used in messages.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::National => "NATIONAL",
            Self::StateAssembly => "STATE_ASSEMBLY",
            Self::Municipal => "MUNICIPAL",
            Self::LocalBody => "LOCAL_BODY",
            Self::ByElection => "BY_ELECTION",
        }
    }

    /// How prominently an election of this type at the given level should be surfaced.
    pub fn priority(&self, level: ElectionLevel) -> Priority {
        match (self, level) {
            (Self::National, _) => Priority::High,
            (Self::StateAssembly, ElectionLevel::State) => Priority::High,
            (Self::StateAssembly, _) | (Self::Municipal, _) | (Self::ByElection, _) => {
                Priority::Medium
            }
            (Self::LocalBody, _) => Priority::Low,
        }
    }

    /// Display tags for an election of this type at the given level.
    pub fn tags(&self, level: ElectionLevel) -> Vec<&'static str> {
        let mut tags = match self {
            Self::National => vec!["National", "General Election"],
            Self::StateAssembly => vec!["State", "Assembly Election"],
            Self::Municipal => vec!["Urban", "Local Body", "Municipal"],
            Self::LocalBody => vec!["Rural", "Local Body"],
            Self::ByElection => vec!["By-Election", "Mid-Term", "Replacement"],
        };
        tags.push(level.tag());
        tags
    }
}

/// The geographic level an election is held at.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, FromFormField)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ElectionLevel {
    #[field(value = "STATE")]
    State,
    #[field(value = "DISTRICT")]
    District,
    #[field(value = "MANDAL")]
    Mandal,
    #[field(value = "CONSTITUENCY")]
    Constituency,
}

impl ElectionLevel {
    fn tag(&self) -> &'static str {
        match self {
            Self::State => "State Level",
            Self::District => "District Level",
            Self::Mandal => "Mandal Level",
            Self::Constituency => "Constituency Level",
        }
    }
}

impl From<ElectionLevel> for Bson {
    fn from(level: ElectionLevel) -> Self {
        to_bson(&level).expect("Serialisation is infallible")
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Priority {
    High,
    Medium,
    Low,
}
