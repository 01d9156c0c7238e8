use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

use log::{debug, info};

use super::Services;
use crate::{
    clock::Clock,
    error::{Error, Result},
    model::{
        api::candidate::{AddCandidatesRequest, CandidateSpec},
        common::{candidate::CandidateStatus, user::UserStatus},
        db::{
            candidate::{Candidate, NewCandidate},
            election::Election,
            user::{PartyRef, User},
        },
        mongodb::Id,
    },
    store::{ElectionRepository, UserDirectory},
};

/// Registers candidates for an election, all or nothing.
pub struct CandidacyValidator {
    elections: Arc<dyn ElectionRepository>,
    users: Arc<dyn UserDirectory>,
    clock: Arc<dyn Clock>,
}

impl CandidacyValidator {
    pub fn new(services: &Services) -> Self {
        Self {
            elections: services.elections.clone(),
            users: services.users.clone(),
            clock: services.clock.clone(),
        }
    }

    /// Validate the whole batch and insert it in one transaction.
    ///
    /// If any entry is invalid nothing is inserted and every problem is
    /// reported in [`Error::CandidacyRejected`].
    pub async fn add_candidates(&self, request: AddCandidatesRequest) -> Result<Vec<Candidate>> {
        request.validate()?;

        let election_id = Id::from(request.election_id);
        let election = self
            .elections
            .find_election(election_id)
            .await?
            .ok_or_else(|| Error::not_found(format!("Election with ID '{election_id}'")))?;
        if !election.accepts_candidates(self.clock.now()) {
            return Err(Error::ElectionClosed(election_id));
        }

        let mut user_ids: Vec<Id> = request.candidates.iter().map(|c| c.user_id.into()).collect();
        user_ids.sort();
        user_ids.dedup();
        let users = self.users.users_by_ids(&user_ids).await?;
        let mut party_ids: Vec<Id> = request
            .candidates
            .iter()
            .filter_map(|c| c.party_id.map(Id::from))
            .collect();
        party_ids.sort();
        party_ids.dedup();
        let parties = if party_ids.is_empty() {
            Vec::new()
        } else {
            self.users.parties_by_ids(&party_ids).await?
        };
        let existing = self.elections.candidates_for_election(election_id).await?;

        let roster = Roster {
            users: &users,
            parties: &parties,
            existing: &existing,
        };
        let accepted = classify_candidates(&election, &request.candidates, roster)
            .map_err(|messages| {
                debug!(
                    "Rejected {} candidate(s) for election {election_id}: {messages:?}",
                    request.candidates.len()
                );
                Error::CandidacyRejected(messages)
            })?;

        let inserted = self.elections.insert_candidates(accepted).await?;
        info!(
            "Registered {} candidate(s) for election {election_id}",
            inserted.len()
        );
        Ok(inserted)
    }
}

/// What a batch of entries is checked against.
#[derive(Debug, Clone, Copy)]
pub struct Roster<'a> {
    /// The users the entries name. Unknown users are simply absent.
    pub users: &'a [User],
    /// The parties the entries name explicitly. Unknown parties are absent.
    pub parties: &'a [PartyRef],
    /// The election's existing candidates.
    pub existing: &'a [Candidate],
}

/// Check a batch of entries against the users and parties they name and the
/// election's existing candidates.
///
/// Entries are processed in input order, so for repeated users or parties the
/// first occurrence wins. Returns the candidates to insert, or every failure
/// message: the grouped user failures first, then party failures in input order.
pub fn classify_candidates(
    election: &Election,
    entries: &[CandidateSpec],
    roster: Roster<'_>,
) -> std::result::Result<Vec<NewCandidate>, Vec<String>> {
    let Roster {
        users,
        parties,
        existing,
    } = roster;
    let by_id: HashMap<Id, &User> = users.iter().map(|u| (u.id, u)).collect();
    let party_names: HashMap<Id, &str> = users
        .iter()
        .filter_map(|u| u.led_party.as_ref())
        .chain(parties)
        .map(|p| (p.id, p.name.as_str()))
        .collect();

    let mut not_found = Vec::new();
    let mut unapproved = Vec::new();
    let mut already = Vec::new();
    let mut party_messages = Vec::new();

    let mut seen_users = HashSet::new();
    let mut seen_parties = HashSet::new();
    let mut accepted = Vec::with_capacity(entries.len());

    for entry in entries {
        let user_id = Id::from(entry.user_id);
        let Some(user) = by_id.get(&user_id) else {
            not_found.push(user_id.to_string());
            continue;
        };
        if user.status != UserStatus::Approved {
            unapproved.push(user.display_name());
            continue;
        }
        let repeated = !seen_users.insert(user_id);
        if repeated || existing.iter().any(|c| c.user_id == user_id) {
            already.push(user.display_name());
            continue;
        }

        let (party_id, party_name) = match (entry.party_id.map(Id::from), &user.led_party) {
            (Some(party_id), _) => match party_names.get(&party_id) {
                Some(name) => (party_id, *name),
                None => {
                    party_messages.push(format!("Party {party_id} does not exist"));
                    continue;
                }
            },
            (None, Some(led)) => (led.id, led.name.as_str()),
            (None, None) => {
                party_messages.push(format!(
                    "User {} is not associated with a party",
                    user.display_name()
                ));
                continue;
            }
        };
        if existing.iter().any(|c| c.party_id == party_id) {
            party_messages.push(format!(
                "{party_name} already has a candidate in this election"
            ));
            continue;
        }
        if !seen_parties.insert(party_id) {
            party_messages.push(format!("Duplicate party in request: {party_name}"));
            continue;
        }

        accepted.push(NewCandidate {
            user_id,
            party_id,
            election_id: election.id,
            constituency_id: election.constituency_id,
            description: entry.description.clone(),
            status: CandidateStatus::Pending,
        });
    }

    let mut messages = Vec::new();
    if !not_found.is_empty() {
        messages.push(format!("User(s) not found: {}", not_found.join(", ")));
    }
    if !unapproved.is_empty() {
        messages.push(format!("Unapproved user(s): {}", unapproved.join(", ")));
    }
    if !already.is_empty() {
        messages.push(format!("Already a candidate: {}", already.join(", ")));
    }
    messages.extend(party_messages);

    if messages.is_empty() {
        Ok(accepted)
    } else {
        Err(messages)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::{
        model::common::election::ElectionStatus, store::ElectionRepository, test_support::TestEnv,
    };

    async fn open_election(env: &TestEnv) -> Election {
        let constituency = env.constituency("Ward 7").await;
        let now = env.now();
        env.put_election(
            constituency,
            ElectionStatus::Upcoming,
            now + Duration::days(1),
            now + Duration::days(3),
        )
        .await
    }

    fn request(election: &Election, candidates: Vec<CandidateSpec>) -> AddCandidatesRequest {
        AddCandidatesRequest {
            election_id: election.id.into(),
            candidates,
        }
    }

    #[backend_test]
    async fn registers_party_heads(env: TestEnv) {
        let election = open_election(&env).await;
        let first = env.party_head("Green").await;
        let second = env.party_head("Blue").await;

        let added = env
            .services
            .candidacy()
            .add_candidates(request(
                &election,
                vec![CandidateSpec::example(first.id), CandidateSpec::example(second.id)],
            ))
            .await
            .unwrap();
        assert_eq!(added.len(), 2);
        assert!(added.iter().all(|c| c.constituency_id == election.constituency_id));
        assert!(added.iter().all(|c| c.status == CandidateStatus::Pending));
        assert_eq!(added[0].party_id, first.led_party.unwrap().id);
    }

    #[backend_test]
    async fn duplicate_party_rejects_whole_batch(env: TestEnv) {
        let election = open_election(&env).await;
        let head = env.party_head("Green").await;
        let party = head.led_party.clone().unwrap().id;
        let member = env.approved_user(None).await;

        let err = env
            .services
            .candidacy()
            .add_candidates(request(
                &election,
                vec![
                    CandidateSpec::example(head.id),
                    CandidateSpec::with_party(member.id, party),
                ],
            ))
            .await
            .unwrap_err();
        match err {
            Error::CandidacyRejected(messages) => {
                assert_eq!(messages, ["Duplicate party in request: Green"])
            }
            other => panic!("expected rejection, got {other:?}"),
        }
        assert!(env
            .store
            .candidates_for_election(election.id)
            .await
            .unwrap()
            .is_empty());
    }

    #[backend_test]
    async fn unknown_party_rejects_whole_batch(env: TestEnv) {
        let election = open_election(&env).await;
        let head = env.party_head("Green").await;
        let member = env.approved_user(None).await;
        let unknown = Id::new();

        let err = env
            .services
            .candidacy()
            .add_candidates(request(
                &election,
                vec![
                    CandidateSpec::example(head.id),
                    CandidateSpec::with_party(member.id, unknown),
                ],
            ))
            .await
            .unwrap_err();
        match err {
            Error::CandidacyRejected(messages) => {
                assert_eq!(messages, [format!("Party {unknown} does not exist")])
            }
            other => panic!("expected rejection, got {other:?}"),
        }
        assert!(env
            .store
            .candidates_for_election(election.id)
            .await
            .unwrap()
            .is_empty());
    }

    #[backend_test]
    async fn closed_window_is_rejected(env: TestEnv) {
        let election = open_election(&env).await;
        let head = env.party_head("Green").await;
        env.clock.set(election.end_date);

        let err = env
            .services
            .candidacy()
            .add_candidates(request(&election, vec![CandidateSpec::example(head.id)]))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ElectionClosed(id) if id == election.id));
    }

    #[backend_test]
    async fn unknown_election_is_not_found(env: TestEnv) {
        let head = env.party_head("Green").await;
        let err = env
            .services
            .candidacy()
            .add_candidates(AddCandidatesRequest {
                election_id: Id::new().into(),
                candidates: vec![CandidateSpec::example(head.id)],
            })
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[backend_test]
    async fn existing_candidacy_and_party_are_reported(env: TestEnv) {
        let election = open_election(&env).await;
        let head = env.party_head("Green").await;
        let candidacy = env.services.candidacy();
        candidacy
            .add_candidates(request(&election, vec![CandidateSpec::example(head.id)]))
            .await
            .unwrap();

        let member = env.approved_user(None).await;
        let party = head.led_party.clone().unwrap().id;
        let err = candidacy
            .add_candidates(request(
                &election,
                vec![
                    CandidateSpec::example(head.id),
                    CandidateSpec::with_party(member.id, party),
                ],
            ))
            .await
            .unwrap_err();
        match err {
            Error::CandidacyRejected(messages) => assert_eq!(
                messages,
                [
                    format!("Already a candidate: {}", head.display_name()),
                    "Green already has a candidate in this election".to_string(),
                ]
            ),
            other => panic!("expected rejection, got {other:?}"),
        }
    }

    mod classify {
        use chrono::Utc;

        use super::*;
        use crate::model::{
            common::election::{ElectionLevel, ElectionType},
            db::election::ElectionCore,
        };

        fn election() -> Election {
            let now = Utc::now();
            Election {
                id: Id::new(),
                election: ElectionCore {
                    title: "Ward 7".to_string(),
                    purpose: "Councillor".to_string(),
                    start_date: now,
                    end_date: now + Duration::days(2),
                    election_type: ElectionType::Municipal,
                    level: ElectionLevel::Constituency,
                    status: ElectionStatus::Upcoming,
                    result_declared: false,
                    constituency_id: Id::new(),
                    created_by: Id::new(),
                    created_at: now,
                },
            }
        }

        fn user(name: &str, status: UserStatus, party: Option<&str>) -> User {
            User {
                id: Id::new(),
                wallet_address: format!("0x{name}"),
                status,
                first_name: Some(name.to_string()),
                last_name: None,
                led_party: party.map(|p| PartyRef {
                    id: Id::new(),
                    name: p.to_string(),
                }),
                constituency_id: None,
            }
        }

        #[test]
        fn messages_are_grouped_in_order() {
            let election = election();
            let missing = Id::new();
            let pending = user("Pat", UserStatus::Pending, Some("Red"));
            let partyless = user("Sam", UserStatus::Approved, None);
            let head = user("Ann", UserStatus::Approved, Some("Green"));
            let users = vec![pending.clone(), partyless.clone(), head.clone()];

            let entries = vec![
                CandidateSpec::example(partyless.id),
                CandidateSpec::example(head.id),
                CandidateSpec::example(missing),
                CandidateSpec::example(pending.id),
                CandidateSpec::example(head.id),
            ];
            let roster = Roster {
                users: &users,
                parties: &[],
                existing: &[],
            };
            let messages = classify_candidates(&election, &entries, roster).unwrap_err();
            assert_eq!(
                messages,
                [
                    format!("User(s) not found: {missing}"),
                    "Unapproved user(s): Pat".to_string(),
                    "Already a candidate: Ann".to_string(),
                    "User Sam is not associated with a party".to_string(),
                ]
            );
        }

        #[test]
        fn explicit_party_overrides_led_party() {
            let election = election();
            let head = user("Ann", UserStatus::Approved, Some("Green"));
            let other_party = PartyRef {
                id: Id::new(),
                name: "Blue".to_string(),
            };
            let entries = vec![CandidateSpec::with_party(head.id, other_party.id)];

            let roster = Roster {
                users: &[head.clone()],
                parties: &[other_party.clone()],
                existing: &[],
            };
            let accepted = classify_candidates(&election, &entries, roster).unwrap();
            assert_eq!(accepted.len(), 1);
            assert_eq!(accepted[0].party_id, other_party.id);
            assert_eq!(accepted[0].election_id, election.id);
            assert_eq!(accepted[0].constituency_id, election.constituency_id);
            assert_eq!(accepted[0].description.as_deref(), Some("Manifesto"));
        }

        #[test]
        fn unknown_explicit_party_is_rejected() {
            let election = election();
            let party = Id::new();
            let first = user("Ann", UserStatus::Approved, None);
            let second = user("Bo", UserStatus::Approved, Some("Green"));
            let entries = vec![
                CandidateSpec::with_party(first.id, party),
                CandidateSpec::with_party(second.id, party),
            ];
            let roster = Roster {
                users: &[first, second],
                parties: &[],
                existing: &[],
            };
            let messages = classify_candidates(&election, &entries, roster).unwrap_err();
            assert_eq!(
                messages,
                [
                    format!("Party {party} does not exist"),
                    format!("Party {party} does not exist"),
                ]
            );
        }

        #[test]
        fn explicit_parties_are_reported_by_name() {
            let election = election();
            let party = PartyRef {
                id: Id::new(),
                name: "Blue".to_string(),
            };
            let first = user("Ann", UserStatus::Approved, None);
            let second = user("Bo", UserStatus::Approved, None);
            let entries = vec![
                CandidateSpec::with_party(first.id, party.id),
                CandidateSpec::with_party(second.id, party.id),
            ];
            let roster = Roster {
                users: &[first, second],
                parties: &[party],
                existing: &[],
            };
            let messages = classify_candidates(&election, &entries, roster).unwrap_err();
            assert_eq!(messages, ["Duplicate party in request: Blue"]);
        }
    }
}
