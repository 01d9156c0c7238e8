use serde::{Deserialize, Serialize};

use crate::{
    error::{Error, FieldErrors, Result},
    model::{
        api::id::ApiId,
        common::candidate::CandidateStatus,
        db::{candidate::Candidate, user::User},
    },
};

/// One entry of an add-candidates request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateSpec {
    pub user_id: ApiId,
    /// Defaults to the party the user leads.
    #[serde(default)]
    pub party_id: Option<ApiId>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddCandidatesRequest {
    pub election_id: ApiId,
    pub candidates: Vec<CandidateSpec>,
}

impl AddCandidatesRequest {
    pub fn validate(&self) -> Result<()> {
        if self.candidates.is_empty() {
            let mut fields = FieldErrors::new();
            fields.insert("candidates", "must contain at least one candidate".to_string());
            return Err(Error::Validation {
                message: "Invalid candidate data".to_string(),
                fields,
            });
        }
        Ok(())
    }
}

/// A candidate as shown to API callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateDescription {
    pub id: ApiId,
    pub user_id: ApiId,
    pub party_id: ApiId,
    pub election_id: ApiId,
    pub constituency_id: ApiId,
    /// The candidate's display name, if the user directory still knows them.
    pub name: Option<String>,
    pub description: Option<String>,
    pub status: CandidateStatus,
}

impl CandidateDescription {
    pub fn new(candidate: Candidate, user: Option<&User>) -> Self {
        Self {
            id: candidate.id.into(),
            user_id: candidate.user_id.into(),
            party_id: candidate.party_id.into(),
            election_id: candidate.election_id.into(),
            constituency_id: candidate.constituency_id.into(),
            name: user.map(User::display_name),
            description: candidate.candidate.description,
            status: candidate.candidate.status,
        }
    }
}

impl From<Candidate> for CandidateDescription {
    fn from(candidate: Candidate) -> Self {
        Self::new(candidate, None)
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::mongodb::Id;

    #[test]
    fn empty_batch_is_invalid() {
        let request = AddCandidatesRequest {
            election_id: Id::new().into(),
            candidates: Vec::new(),
        };
        assert!(matches!(request.validate(), Err(Error::Validation { .. })));

        let request = AddCandidatesRequest {
            election_id: Id::new().into(),
            candidates: vec![CandidateSpec::example(Id::new())],
        };
        request.validate().unwrap();
    }
}
