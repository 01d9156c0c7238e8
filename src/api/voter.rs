use rocket::{serde::json::Json, Route, State};

use crate::{
    engine::Services,
    error::{Error, Result},
    model::api::{
        auth::Voter,
        election::{ElectionDescription, ElectionDetail, ElectionQuery},
        envelope::ApiResponse,
        id::ApiId,
        pagination::Pagination,
        vote::{VoteReceipt, VoteRequest},
    },
};

pub fn routes() -> Vec<Route> {
    routes![cast_vote, get_election, get_constituency_elections]
}

#[post("/cast-vote", data = "<request>", format = "json")]
async fn cast_vote(
    voter: Voter,
    request: Json<VoteRequest>,
    services: &State<Services>,
) -> Result<ApiResponse<VoteReceipt>> {
    let vote = services
        .voting()
        .cast_vote(
            &voter.user,
            request.election_id.into(),
            request.candidate_id.into(),
        )
        .await?;
    Ok(ApiResponse::created(vote.into(), "Vote cast successfully"))
}

#[get("/get-election?<election_id>")]
async fn get_election(
    voter: Voter,
    election_id: ApiId,
    services: &State<Services>,
) -> Result<ApiResponse<ElectionDetail>> {
    let detail = services
        .election_service()
        .detail(election_id.into(), voter.id())
        .await?;
    Ok(ApiResponse::ok(detail, "Election fetched successfully"))
}

#[get("/get-elections/constituency?<query..>")]
async fn get_constituency_elections(
    voter: Voter,
    query: ElectionQuery,
    pagination: Pagination,
    services: &State<Services>,
) -> Result<ApiResponse<Vec<ElectionDescription>>> {
    let constituency_id = voter.constituency_id().ok_or_else(|| {
        Error::Forbidden("User is not registered in a constituency".to_string())
    })?;
    let page = services
        .election_service()
        .list_for_constituency(constituency_id, &query, pagination)
        .await?;
    let (elections, paging) = page.map(ElectionDescription::from).into_parts();
    Ok(ApiResponse::ok(elections, "Elections fetched successfully").with_query(paging))
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use rocket::{
        http::{ContentType, Status},
        local::asynchronous::Client,
        serde::json::{json, Value},
    };

    use crate::{
        model::{common::election::ElectionStatus, mongodb::Id},
        store::ElectionRepository,
        test_support::TestEnv,
    };

    use super::*;

    #[backend_test]
    async fn vote_once(env: TestEnv, client: Client) {
        let constituency = env.constituency("Ward 7").await;
        let now = env.now();
        let election = env
            .put_election(
                constituency,
                ElectionStatus::Ongoing,
                now - Duration::hours(1),
                now + Duration::days(1),
            )
            .await;
        let candidates = env.candidates(&election, 2).await;
        let voter = env.approved_user(Some(constituency)).await;
        let body = json!({
            "election_id": election.id.to_string(),
            "candidate_id": candidates[1].id.to_string(),
        })
        .to_string();

        let response = client
            .post("/election/cast-vote")
            .header(ContentType::JSON)
            .cookie(env.user_cookie(voter.id))
            .body(&body)
            .dispatch()
            .await;
        assert_eq!(Status::Created, response.status());
        let envelope: Value = response.into_json().await.unwrap();
        assert_eq!(envelope["message"], "Vote cast successfully");
        assert_eq!(envelope["data"]["candidate_id"], json!(candidates[1].id.to_string()));

        let response = client
            .post("/election/cast-vote")
            .header(ContentType::JSON)
            .cookie(env.user_cookie(voter.id))
            .body(&body)
            .dispatch()
            .await;
        assert_eq!(Status::Conflict, response.status());
        let envelope: Value = response.into_json().await.unwrap();
        assert_eq!(envelope["message"], "User has already voted in this election");
        assert_eq!(env.store.count_votes(election.id).await.unwrap(), 1);
    }

    #[backend_test]
    async fn unknown_user_is_unauthorized(env: TestEnv, client: Client) {
        let response = client
            .post("/election/cast-vote")
            .header(ContentType::JSON)
            .cookie(env.user_cookie(Id::new()))
            .body(
                json!({
                    "election_id": Id::new().to_string(),
                    "candidate_id": Id::new().to_string(),
                })
                .to_string(),
            )
            .dispatch()
            .await;
        assert_eq!(Status::Unauthorized, response.status());
        let envelope: Value = response.into_json().await.unwrap();
        assert_eq!(envelope["message"], "Unauthorized: User not found");
    }

    #[backend_test]
    async fn election_detail_reflects_vote(env: TestEnv, client: Client) {
        let constituency = env.constituency("Ward 7").await;
        let now = env.now();
        let election = env
            .put_election(
                constituency,
                ElectionStatus::Ongoing,
                now - Duration::hours(1),
                now + Duration::days(1),
            )
            .await;
        let candidates = env.candidates(&election, 2).await;
        let voter = env.approved_user(Some(constituency)).await;
        env.record_vote(&election, &candidates[0], voter.id).await;

        let response = client
            .get(format!("/election/get-election?election_id={}", election.id))
            .cookie(env.user_cookie(voter.id))
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());
        let envelope: Value = response.into_json().await.unwrap();
        let detail = &envelope["data"];
        assert_eq!(detail["has_voted"], true);
        assert_eq!(detail["voted_candidate_id"], json!(candidates[0].id.to_string()));
        assert_eq!(detail["candidates"].as_array().map(Vec::len), Some(2));
        assert_eq!(detail["location"]["state"], "Ward 7 State");
        assert_eq!(detail["winners"], Value::Null);

        let response = client
            .get(format!("/election/get-election?election_id={}", Id::new()))
            .cookie(env.user_cookie(voter.id))
            .dispatch()
            .await;
        assert_eq!(Status::NotFound, response.status());
    }

    #[backend_test]
    async fn constituency_listing_is_scoped(env: TestEnv, client: Client) {
        let home = env.constituency("Ward 7").await;
        let away = env.constituency("Ward 9").await;
        let now = env.now();
        for constituency in [home, home, away] {
            env.put_election(
                constituency,
                ElectionStatus::Upcoming,
                now + Duration::days(1),
                now + Duration::days(3),
            )
            .await;
        }
        let voter = env.approved_user(Some(home)).await;

        let response = client
            .get("/election/get-elections/constituency")
            .cookie(env.user_cookie(voter.id))
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());
        let envelope: Value = response.into_json().await.unwrap();
        assert_eq!(envelope["query"]["total_results"], 2);
        for election in envelope["data"].as_array().unwrap() {
            assert_eq!(election["constituency_id"], json!(home.to_string()));
        }

        let drifter = env.approved_user(None).await;
        let response = client
            .get("/election/get-elections/constituency")
            .cookie(env.user_cookie(drifter.id))
            .dispatch()
            .await;
        assert_eq!(Status::Forbidden, response.status());
    }

    #[backend_test]
    async fn unknown_route_gets_envelope(client: Client) {
        let response = client.get("/election/nowhere").dispatch().await;
        assert_eq!(Status::NotFound, response.status());
        let envelope: Value = response.into_json().await.unwrap();
        assert_eq!(envelope["status"], "error");
        assert_eq!(envelope["message"], "Not Found");
    }
}
