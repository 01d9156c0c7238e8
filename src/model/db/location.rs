//! Geography reference data. Owned by the geography service; read-only here.

use serde::{Deserialize, Serialize};

use crate::model::mongodb::Id;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct State {
    #[serde(rename = "_id")]
    pub id: Id,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct District {
    #[serde(rename = "_id")]
    pub id: Id,
    pub name: String,
    pub state_id: Id,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Mandal {
    #[serde(rename = "_id")]
    pub id: Id,
    pub name: String,
    pub district_id: Id,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Constituency {
    #[serde(rename = "_id")]
    pub id: Id,
    pub name: String,
    pub mandal_id: Id,
}

/// A constituency resolved all the way up to its state, for display.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct LocationPath {
    pub constituency_id: Id,
    pub constituency: String,
    pub mandal: String,
    pub district: String,
    pub state: String,
}
