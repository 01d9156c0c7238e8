//! Shared fixtures for tests: an in-memory environment and a local client.

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use rocket::{http::Cookie, local::asynchronous::Client};

use crate::{
    clock::{Clock, FakeClock},
    config::Config,
    engine::Services,
    model::{
        api::auth::{Admin, AnyUser, AuthToken},
        common::{
            candidate::CandidateStatus,
            election::{ElectionLevel, ElectionStatus, ElectionType},
            user::{Role, UserStatus},
        },
        db::{
            candidate::{Candidate, NewCandidate},
            election::{Election, ElectionCore},
            user::{PartyRef, User},
            vote::NewVote,
        },
        mongodb::Id,
    },
    rocket_for_services,
    store::{ElectionRepository, MemoryStore},
};

/// Everything a test needs, backed by a [`MemoryStore`] and a [`FakeClock`].
pub struct TestEnv {
    pub store: Arc<MemoryStore>,
    pub clock: Arc<FakeClock>,
    pub services: Services,
    pub config: Config,
    /// The admin that [`TestEnv::admin_cookie`] authenticates as.
    pub admin_id: Id,
}

impl TestEnv {
    pub fn new() -> Self {
        log4rs_test_utils::test_logging::init_logging_once_for(
            ["election_backend"],
            None,
            None,
        );

        let store = Arc::new(MemoryStore::new());
        let start = Utc.with_ymd_and_hms(2030, 1, 1, 9, 0, 0).unwrap();
        let clock = Arc::new(FakeClock::new(start));
        let services = Services::from_store(store.clone(), clock.clone());
        Self {
            store,
            clock,
            services,
            config: Config::example(),
            admin_id: Id::new(),
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// A local client over this environment's services.
    pub async fn client(&self) -> Client {
        let rocket = rocket_for_services(self.services.clone(), Config::example());
        Client::tracked(rocket).await.unwrap()
    }

    pub fn admin_cookie(&self) -> Cookie<'static> {
        AuthToken::<Admin>::new(self.admin_id, Role::Admin).into_cookie(&self.config)
    }

    pub fn user_cookie(&self, user_id: Id) -> Cookie<'static> {
        AuthToken::<AnyUser>::new(user_id, Role::User).into_cookie(&self.config)
    }

    pub async fn constituency(&self, name: &str) -> Id {
        self.store.add_constituency(name).await
    }

    /// An approved user with a name, optionally registered in a constituency.
    pub async fn approved_user(&self, constituency_id: Option<Id>) -> User {
        let id = Id::new();
        let user = User {
            id,
            wallet_address: format!("0x{id}"),
            status: UserStatus::Approved,
            first_name: Some("Voter".to_string()),
            last_name: Some(id.to_string()[18..].to_string()),
            led_party: None,
            constituency_id,
        };
        self.store.add_user(user.clone()).await;
        user
    }

    /// An approved user leading a new party.
    pub async fn party_head(&self, party: &str) -> User {
        let mut user = self.approved_user(None).await;
        user.first_name = Some(format!("{party} Leader"));
        user.led_party = Some(PartyRef {
            id: Id::new(),
            name: party.to_string(),
        });
        self.store.add_user(user.clone()).await;
        user
    }

    /// Store an election directly, in any state.
    pub async fn put_election(
        &self,
        constituency_id: Id,
        status: ElectionStatus,
        start_date: DateTime<Utc>,
        end_date: DateTime<Utc>,
    ) -> Election {
        let id = Id::new();
        let election = Election {
            id,
            election: ElectionCore {
                title: format!("Election {id}"),
                purpose: "Testing".to_string(),
                start_date,
                end_date,
                election_type: ElectionType::Municipal,
                level: ElectionLevel::Constituency,
                status,
                result_declared: false,
                constituency_id,
                created_by: self.admin_id,
                created_at: self.now(),
            },
        };
        self.store.put_election(election.clone()).await;
        election
    }

    /// Register `count` party heads as candidates, bypassing validation.
    pub async fn candidates(&self, election: &Election, count: usize) -> Vec<Candidate> {
        let mut new = Vec::with_capacity(count);
        for i in 0..count {
            let head = self.party_head(&format!("Party {i}")).await;
            new.push(NewCandidate {
                user_id: head.id,
                party_id: head.led_party.map(|p| p.id).unwrap_or_default(),
                election_id: election.id,
                constituency_id: election.constituency_id,
                description: None,
                status: CandidateStatus::Pending,
            });
        }
        self.store.insert_candidates(new).await.unwrap()
    }

    /// Record a vote whatever the election's status, to seed tallies.
    pub async fn record_vote(&self, election: &Election, candidate: &Candidate, voter_id: Id) {
        self.store
            .put_vote(NewVote {
                voter_id,
                election_id: election.id,
                candidate_id: candidate.id,
                created_at: self.now(),
            })
            .await;
    }
}
