use std::{collections::HashMap, sync::Arc};

use log::info;

use super::{ResultEngine, Services};
use crate::{
    clock::Clock,
    error::{Error, Result},
    model::{
        api::{
            candidate::CandidateDescription,
            election::{ElectionDetail, ElectionQuery, ElectionSpec},
            id::ApiId,
            pagination::{Page, Pagination},
            result::{CompletedElection, ElectionResults},
        },
        common::{candidate::CandidateStatus, election::ElectionStatus},
        db::{election::Election, user::User},
        mongodb::Id,
    },
    store::{ElectionFilter, ElectionRepository, ElectionSort, GeographyService, UserDirectory},
};

/// Election creation and the read models built on top of the repository.
pub struct ElectionService {
    elections: Arc<dyn ElectionRepository>,
    users: Arc<dyn UserDirectory>,
    geography: Arc<dyn GeographyService>,
    clock: Arc<dyn Clock>,
    results: ResultEngine,
}

impl ElectionService {
    pub fn new(services: &Services) -> Self {
        Self {
            elections: services.elections.clone(),
            users: services.users.clone(),
            geography: services.geography.clone(),
            clock: services.clock.clone(),
            results: ResultEngine::new(services),
        }
    }

    /// Create an election on behalf of `admin_id`.
    pub async fn create(&self, spec: ElectionSpec, admin_id: Id) -> Result<Election> {
        let now = self.clock.now();
        spec.validate(now)?;

        let constituency_id = Id::from(spec.constituency_id);
        if self
            .geography
            .constituency_path(constituency_id)
            .await?
            .is_none()
        {
            return Err(Error::not_found(format!(
                "Constituency with ID '{constituency_id}'"
            )));
        }

        let overlapping = self
            .elections
            .find_overlapping(
                constituency_id,
                spec.start_date,
                spec.end_date,
                spec.election_type,
            )
            .await?;
        if !overlapping.is_empty() {
            return Err(Error::Conflict(format!(
                "{} election already exists in this constituency",
                spec.election_type.as_str()
            )));
        }

        if self
            .elections
            .find_election_by_title(spec.title.trim())
            .await?
            .is_some()
        {
            return Err(Error::Conflict(
                "Election with this title already exists".to_string(),
            ));
        }

        let election = self
            .elections
            .create_election(spec.into_election(admin_id, now))
            .await?;
        info!(
            "Created {} election {} ({:?}) in constituency {}",
            election.election_type.as_str(),
            election.id,
            election.status,
            election.constituency_id
        );
        Ok(election)
    }

    /// Elections still open for candidacy, filtered and sorted by `query`.
    pub async fn list_open(
        &self,
        query: &ElectionQuery,
        pagination: Pagination,
    ) -> Result<Page<Election>> {
        let filter = query.open_at(self.clock.now());
        self.elections
            .list_elections(&filter, query.sort(), pagination)
            .await
    }

    /// Every election held in the given constituency.
    pub async fn list_for_constituency(
        &self,
        constituency_id: Id,
        query: &ElectionQuery,
        pagination: Pagination,
    ) -> Result<Page<Election>> {
        let filter = ElectionFilter {
            status: query.status,
            election_type: query.election_type,
            level: query.level,
            constituency_id: Some(constituency_id),
            ..Default::default()
        };
        self.elections
            .list_elections(&filter, query.sort(), pagination)
            .await
    }

    /// One election as seen by `voter_id`.
    pub async fn detail(&self, election_id: Id, voter_id: Id) -> Result<ElectionDetail> {
        let election = self
            .elections
            .find_election(election_id)
            .await?
            .ok_or_else(|| Error::not_found(format!("Election with ID '{election_id}'")))?;

        let location = self
            .geography
            .constituency_path(election.constituency_id)
            .await?
            .map(Into::into);

        let candidates = self.elections.candidates_for_election(election_id).await?;
        let user_ids: Vec<Id> = candidates.iter().map(|c| c.user_id).collect();
        let users = self.users.users_by_ids(&user_ids).await?;
        let by_id: HashMap<Id, &User> = users.iter().map(|u| (u.id, u)).collect();

        let vote = self.elections.find_vote(election_id, voter_id).await?;

        let (winners, is_draw) = if election.result_declared {
            let winners: Vec<ApiId> = candidates
                .iter()
                .filter(|c| c.status == CandidateStatus::Win)
                .map(|c| c.id.into())
                .collect();
            let is_draw = winners.len() > 1;
            (Some(winners), Some(is_draw))
        } else {
            (None, None)
        };

        let candidates = candidates
            .into_iter()
            .map(|c| {
                let user = by_id.get(&c.user_id).copied();
                CandidateDescription::new(c, user)
            })
            .collect();

        Ok(ElectionDetail {
            election: election.into(),
            location,
            candidates,
            has_voted: vote.is_some(),
            voted_candidate_id: vote.map(|v| v.candidate_id.into()),
            winners,
            is_draw,
        })
    }

    /// Completed elections with their standings.
    pub async fn completed_results(
        &self,
        sort: ElectionSort,
        pagination: Pagination,
    ) -> Result<Page<CompletedElection>> {
        let filter = ElectionFilter {
            status: Some(ElectionStatus::Completed),
            ..Default::default()
        };
        let page = self
            .elections
            .list_elections(&filter, sort, pagination)
            .await?;

        let Page {
            results: elections,
            page,
            limit,
            total_pages,
            total_results,
        } = page;
        let mut completed = Vec::with_capacity(elections.len());
        for election in elections {
            let standings = self.results.standings(election.id).await?;
            let user_ids: Vec<Id> = standings
                .tallies
                .iter()
                .map(|t| t.candidate.user_id)
                .collect();
            let users = self.users.users_by_ids(&user_ids).await?;
            let results = ElectionResults::new(standings, election.result_declared, &users);
            completed.push(CompletedElection {
                election: election.into(),
                results,
            });
        }

        Ok(Page {
            results: completed,
            page,
            limit,
            total_pages,
            total_results,
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::{
        model::common::election::ElectionType, store::ElectionRepository, test_support::TestEnv,
    };

    #[backend_test]
    async fn creates_upcoming_election(env: TestEnv) {
        let constituency = env.constituency("Ward 7").await;
        let spec = ElectionSpec::example(constituency, env.now());
        let admin = Id::new();

        let election = env.services.election_service().create(spec, admin).await.unwrap();
        assert_eq!(election.status, ElectionStatus::Upcoming);
        assert_eq!(election.created_by, admin);
        assert_eq!(
            env.store.find_election(election.id).await.unwrap(),
            Some(election)
        );
    }

    #[backend_test]
    async fn unknown_constituency_is_not_found(env: TestEnv) {
        let spec = ElectionSpec::example(Id::new(), env.now());
        let err = env
            .services
            .election_service()
            .create(spec, Id::new())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[backend_test]
    async fn overlapping_window_is_a_conflict(env: TestEnv) {
        let constituency = env.constituency("Ward 7").await;
        let service = env.services.election_service();
        service
            .create(ElectionSpec::example(constituency, env.now()), Id::new())
            .await
            .unwrap();

        let mut clash = ElectionSpec::example(constituency, env.now());
        clash.title = "Another title".to_string();
        clash.start_date = clash.end_date;
        clash.end_date = clash.start_date + Duration::days(2);
        match service.create(clash.clone(), Id::new()).await {
            Err(Error::Conflict(msg)) => {
                assert_eq!(msg, "MUNICIPAL election already exists in this constituency")
            }
            other => panic!("expected conflict, got {other:?}"),
        }

        // A different type may share the window.
        clash.election_type = ElectionType::ByElection;
        service.create(clash, Id::new()).await.unwrap();
    }

    #[backend_test]
    async fn duplicate_title_is_a_conflict(env: TestEnv) {
        let service = env.services.election_service();
        let first = env.constituency("Ward 7").await;
        let second = env.constituency("Ward 8").await;
        service
            .create(ElectionSpec::example(first, env.now()), Id::new())
            .await
            .unwrap();
        match service
            .create(ElectionSpec::example(second, env.now()), Id::new())
            .await
        {
            Err(Error::Conflict(msg)) => assert_eq!(msg, "Election with this title already exists"),
            other => panic!("expected conflict, got {other:?}"),
        }
    }

    #[backend_test]
    async fn open_listing_hides_ended_elections(env: TestEnv) {
        let constituency = env.constituency("Ward 7").await;
        let now = env.now();
        let open = env
            .put_election(
                constituency,
                ElectionStatus::Ongoing,
                now - Duration::days(1),
                now + Duration::days(1),
            )
            .await;
        env.put_election(
            constituency,
            ElectionStatus::Completed,
            now - Duration::days(5),
            now - Duration::days(2),
        )
        .await;

        let page = env
            .services
            .election_service()
            .list_open(&ElectionQuery::default(), Pagination::default())
            .await
            .unwrap();
        assert_eq!(page.total_results, 1);
        assert_eq!(page.results[0].id, open.id);
    }

    #[backend_test]
    async fn detail_reports_vote_and_draw(env: TestEnv) {
        let constituency = env.constituency("Ward 7").await;
        let now = env.now();
        let election = env
            .put_election(
                constituency,
                ElectionStatus::Completed,
                now - Duration::days(3),
                now - Duration::days(1),
            )
            .await;
        let candidates = env.candidates(&election, 2).await;
        let voter = env.approved_user(Some(constituency)).await;
        env.record_vote(&election, &candidates[0], voter.id).await;
        env.record_vote(&election, &candidates[1], Id::new()).await;
        env.services.results().declare(election.id).await.unwrap();

        let detail = env
            .services
            .election_service()
            .detail(election.id, voter.id)
            .await
            .unwrap();
        assert!(detail.has_voted);
        assert_eq!(detail.voted_candidate_id, Some(candidates[0].id.into()));
        assert_eq!(detail.is_draw, Some(true));
        assert_eq!(detail.winners.map(|w| w.len()), Some(2));
        assert_eq!(
            detail.location.map(|l| l.constituency),
            Some("Ward 7".to_string())
        );
        assert!(detail.candidates.iter().all(|c| c.name.is_some()));
    }

    #[backend_test]
    async fn completed_results_carry_standings(env: TestEnv) {
        let constituency = env.constituency("Ward 7").await;
        let now = env.now();
        let election = env
            .put_election(
                constituency,
                ElectionStatus::Completed,
                now - Duration::days(3),
                now - Duration::days(1),
            )
            .await;
        let candidates = env.candidates(&election, 2).await;
        for _ in 0..3 {
            env.record_vote(&election, &candidates[1], Id::new()).await;
        }
        env.put_election(
            constituency,
            ElectionStatus::Ongoing,
            now - Duration::days(1),
            now + Duration::days(1),
        )
        .await;

        let page = env
            .services
            .election_service()
            .completed_results(ElectionSort::default(), Pagination::default())
            .await
            .unwrap();
        assert_eq!(page.total_results, 1);
        let results = &page.results[0].results;
        assert_eq!(results.total_votes, 3);
        assert_eq!(results.winners, [ApiId::from(candidates[1].id)]);
        assert!(!results.is_draw);
        assert!(!results.result_declared);
    }
}
