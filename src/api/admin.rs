use rocket::{serde::json::Json, Route, State};

use crate::{
    engine::Services,
    error::Result,
    model::{
        api::{
            auth::{Admin, AuthToken},
            candidate::{AddCandidatesRequest, CandidateDescription},
            election::{ElectionDescription, ElectionQuery, ElectionSpec},
            envelope::ApiResponse,
            pagination::Pagination,
            result::{CompletedElection, ElectionResults, ResultRequest},
        },
        mongodb::Id,
    },
    store::ElectionSort,
};

pub fn routes() -> Vec<Route> {
    routes![
        create_election,
        add_candidates,
        declare_result,
        get_elections,
        result_elections,
    ]
}

#[post("/create", data = "<spec>", format = "json")]
async fn create_election(
    token: AuthToken<Admin>,
    spec: Json<ElectionSpec>,
    services: &State<Services>,
) -> Result<ApiResponse<ElectionDescription>> {
    let election = services
        .election_service()
        .create(spec.into_inner(), token.id())
        .await?;
    Ok(ApiResponse::created(
        election.into(),
        "Election created successfully",
    ))
}

#[post("/add-candidates", data = "<request>", format = "json")]
async fn add_candidates(
    _token: AuthToken<Admin>,
    request: Json<AddCandidatesRequest>,
    services: &State<Services>,
) -> Result<ApiResponse<Vec<CandidateDescription>>> {
    let candidates = services
        .candidacy()
        .add_candidates(request.into_inner())
        .await?;
    let user_ids: Vec<Id> = candidates.iter().map(|c| c.user_id).collect();
    let users = services.users.users_by_ids(&user_ids).await?;
    let candidates = candidates
        .into_iter()
        .map(|c| {
            let user = users.iter().find(|u| u.id == c.user_id);
            CandidateDescription::new(c, user)
        })
        .collect();
    Ok(ApiResponse::created(
        candidates,
        "Candidates added successfully",
    ))
}

#[post("/declare-result", data = "<request>", format = "json")]
async fn declare_result(
    _token: AuthToken<Admin>,
    request: Json<ResultRequest>,
    services: &State<Services>,
) -> Result<ApiResponse<ElectionResults>> {
    let standings = services.results().declare(request.election_id.into()).await?;
    let user_ids: Vec<Id> = standings
        .tallies
        .iter()
        .map(|t| t.candidate.user_id)
        .collect();
    let users = services.users.users_by_ids(&user_ids).await?;
    let message = if standings.is_draw() {
        "Result declared: the election is a draw"
    } else {
        "Result declared successfully"
    };
    Ok(ApiResponse::ok(
        ElectionResults::new(standings, true, &users),
        message,
    ))
}

#[get("/get-elections?<query..>")]
async fn get_elections(
    _token: AuthToken<Admin>,
    query: ElectionQuery,
    pagination: Pagination,
    services: &State<Services>,
) -> Result<ApiResponse<Vec<ElectionDescription>>> {
    let page = services
        .election_service()
        .list_open(&query, pagination)
        .await?;
    let (elections, paging) = page.map(ElectionDescription::from).into_parts();
    Ok(ApiResponse::ok(elections, "Elections fetched successfully").with_query(paging))
}

#[get("/result-elections?<sort_by>")]
async fn result_elections(
    _token: AuthToken<Admin>,
    sort_by: Option<ElectionSort>,
    pagination: Pagination,
    services: &State<Services>,
) -> Result<ApiResponse<Vec<CompletedElection>>> {
    let page = services
        .election_service()
        .completed_results(sort_by.unwrap_or_default(), pagination)
        .await?;
    let (elections, paging) = page.into_parts();
    Ok(ApiResponse::ok(elections, "Election results fetched successfully").with_query(paging))
}
