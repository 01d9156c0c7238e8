//! An operator tool for the election backend.
//! It works directly against the database configured for the server, so it can
//! advance election statuses while the server's scheduler is disabled, and
//! inspect live standings before a result is declared.

use std::fmt::Write;
use std::sync::Arc;

use clap::{Arg, ArgAction, ArgMatches, Command};

use election_backend::{
    clock::SystemClock,
    config::DbConfig,
    engine::Services,
    model::{api::result::ElectionResults, mongodb::Id},
};

const PROGRAM_NAME: &str = "election-cli";

const ABOUT_TEXT: &str = "Operate on the election database configured in Rocket.toml.

EXIT CODES:
     0: Success.
     1: Configuration or database error.
     2: The request was rejected, e.g. an unknown election.";

const SWEEP: &str = "sweep";
const RESULTS: &str = "results";
const ELECTION_ID: &str = "ELECTION_ID";

/// Construct the CLI configuration.
fn cli() -> Command {
    // Make the build dirty when the toml changes.
    include_str!("../Cargo.toml");

    clap::command!(PROGRAM_NAME)
        .about(ABOUT_TEXT)
        .subcommand_required(true)
        .subcommand(
            Command::new(SWEEP)
                .about("Start elections whose window has opened and complete ended ones"),
        )
        .subcommand(
            Command::new(RESULTS)
                .about("Print the current standings of an election")
                .arg(
                    Arg::new(ELECTION_ID)
                        .help("The hex ID of the election")
                        .action(ArgAction::Set)
                        .required(true),
                ),
        )
}

/// Errors that this program may produce.
#[derive(Debug)]
enum Error {
    /// Bad configuration or an unreachable database.
    Setup(String),
    /// The backend refused or failed the request.
    Backend(election_backend::error::Error),
    /// The arguments did not make sense.
    Usage(String),
}

impl From<election_backend::error::Error> for Error {
    fn from(err: election_backend::error::Error) -> Self {
        Self::Backend(err)
    }
}

/// Connect to the database the server would use.
async fn connect() -> Result<Services, Error> {
    let config: DbConfig = rocket::Config::figment()
        .extract()
        .map_err(|e| Error::Setup(e.to_string()))?;
    let store = config
        .connect()
        .await
        .map_err(|e| Error::Setup(e.to_string()))?;
    Ok(Services::from_store(Arc::new(store), Arc::new(SystemClock)))
}

/// Run the requested subcommand and return what to print.
async fn execute(args: &ArgMatches, services: &Services) -> Result<String, Error> {
    match args.subcommand() {
        Some((SWEEP, _)) => {
            let report = services.scheduler().sweep().await?;
            Ok(format!(
                "Started {} election{}, completed {}.",
                report.started,
                plural(report.started),
                report.completed
            ))
        }
        Some((RESULTS, sub)) => {
            // Required argument is guaranteed to be present.
            let raw: &String = sub.get_one(ELECTION_ID).unwrap();
            let id: Id = raw
                .parse()
                .map_err(|_| Error::Usage(format!("`{raw}` is not a valid election ID")))?;
            standings(id, services).await
        }
        _ => unreachable!("a subcommand is required"),
    }
}

/// Render the standings of one election.
async fn standings(id: Id, services: &Services) -> Result<String, Error> {
    let election = services.elections.find_election(id).await?.ok_or_else(|| {
        election_backend::error::Error::not_found(format!("Election with ID '{id}'"))
    })?;
    let standings = services.results().standings(id).await?;
    let user_ids: Vec<Id> = standings
        .tallies
        .iter()
        .map(|t| t.candidate.user_id)
        .collect();
    let users = services.users.users_by_ids(&user_ids).await?;
    let results = ElectionResults::new(standings, election.result_declared, &users);

    let mut out = format!(
        "{} ({:?}, result {})\n",
        election.title,
        election.status,
        if results.result_declared {
            "declared"
        } else {
            "not declared"
        }
    );
    for standing in &results.candidates {
        let name = standing
            .candidate
            .name
            .clone()
            .unwrap_or_else(|| standing.candidate.user_id.to_string());
        let marker = if results.winners.contains(&standing.candidate.id) {
            " *"
        } else {
            ""
        };
        // Writing to a String cannot fail.
        let _ = writeln!(
            out,
            "  {name}: {} vote{}{marker}",
            standing.votes,
            plural(standing.votes)
        );
    }
    let _ = write!(
        out,
        "Total: {} vote{}",
        results.total_votes,
        plural(results.total_votes)
    );
    if results.is_draw {
        let _ = write!(out, ", draw between {} candidates", results.winners.len());
    }
    Ok(out)
}

fn plural(n: u64) -> &'static str {
    if n != 1 {
        "s"
    } else {
        ""
    }
}

/// Report the outcome and return the exit code.
fn report(outcome: Result<String, Error>) -> u8 {
    match outcome {
        Ok(output) => {
            println!("{output}");
            0
        }
        Err(Error::Setup(msg)) => {
            println!("Setup error: {msg}");
            1
        }
        Err(Error::Usage(msg)) => {
            println!("{msg}");
            2
        }
        Err(Error::Backend(err)) => {
            println!("{err}");
            if err.status() == rocket::http::Status::InternalServerError {
                1
            } else {
                2
            }
        }
    }
}

#[rocket::main]
async fn main() {
    let args = cli().get_matches();
    let outcome = match connect().await {
        Ok(services) => execute(&args, &services).await,
        Err(e) => Err(e),
    };
    std::process::exit(report(outcome).into())
}

#[cfg(all(test, feature = "test-util"))]
mod tests {
    use chrono::{Duration, TimeZone, Utc};

    use election_backend::{
        clock::FakeClock,
        model::{
            common::{
                candidate::CandidateStatus,
                election::{ElectionLevel, ElectionStatus, ElectionType},
                user::UserStatus,
            },
            db::{
                candidate::NewCandidate,
                election::{Election, ElectionCore},
                user::{PartyRef, User},
                vote::NewVote,
            },
        },
        store::{ElectionRepository, MemoryStore},
    };

    use super::*;

    /// A store holding one ongoing election with two candidates, the first of
    /// which has two votes and the second one.
    async fn seeded() -> (Arc<MemoryStore>, Arc<FakeClock>, Election) {
        log4rs_test_utils::test_logging::init_logging_once_for(["election_backend"], None, None);

        let now = Utc.with_ymd_and_hms(2030, 1, 1, 9, 0, 0).unwrap();
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(FakeClock::new(now));
        let constituency_id = store.add_constituency("Ward 7").await;
        let election = Election {
            id: Id::new(),
            election: ElectionCore {
                title: "Ward 7 Municipal Election".to_string(),
                purpose: "Elect the ward councillor".to_string(),
                start_date: now - Duration::hours(1),
                end_date: now + Duration::hours(1),
                election_type: ElectionType::Municipal,
                level: ElectionLevel::Constituency,
                status: ElectionStatus::Ongoing,
                result_declared: false,
                constituency_id,
                created_by: Id::new(),
                created_at: now,
            },
        };
        store.put_election(election.clone()).await;

        let mut new = Vec::new();
        for name in ["Asha", "Ravi"] {
            let user = User {
                id: Id::new(),
                wallet_address: format!("0x{name}"),
                status: UserStatus::Approved,
                first_name: Some(name.to_string()),
                last_name: None,
                led_party: Some(PartyRef {
                    id: Id::new(),
                    name: format!("{name} Party"),
                }),
                constituency_id: None,
            };
            new.push(NewCandidate {
                user_id: user.id,
                party_id: user.led_party.as_ref().unwrap().id,
                election_id: election.id,
                constituency_id,
                description: None,
                status: CandidateStatus::Pending,
            });
            store.add_user(user).await;
        }
        let candidates = store.insert_candidates(new).await.unwrap();
        for candidate in [&candidates[0], &candidates[0], &candidates[1]] {
            store
                .insert_vote(NewVote {
                    voter_id: Id::new(),
                    election_id: election.id,
                    candidate_id: candidate.id,
                    created_at: now,
                })
                .await
                .unwrap();
        }
        (store, clock, election)
    }

    #[rocket::async_test]
    async fn sweep_completes_ended_elections() {
        let (store, clock, election) = seeded().await;
        clock.advance(Duration::hours(2));
        let services = Services::from_store(store.clone(), clock);

        let args = cli().try_get_matches_from([PROGRAM_NAME, SWEEP]).unwrap();
        let output = execute(&args, &services).await.unwrap();
        assert_eq!(output, "Started 0 elections, completed 1.");
        assert_eq!(
            store.election(election.id).await.unwrap().status,
            ElectionStatus::Completed
        );
    }

    #[rocket::async_test]
    async fn results_prints_standings() {
        let (store, clock, election) = seeded().await;
        let services = Services::from_store(store, clock);

        let id = election.id.to_string();
        let args = cli()
            .try_get_matches_from([PROGRAM_NAME, RESULTS, &id])
            .unwrap();
        let output = execute(&args, &services).await.unwrap();
        assert_eq!(
            output,
            "Ward 7 Municipal Election (Ongoing, result not declared)\n  \
            Asha: 2 votes *\n  \
            Ravi: 1 vote\n\
            Total: 3 votes"
        );
    }

    #[rocket::async_test]
    async fn results_rejects_bad_ids() {
        let (store, clock, _) = seeded().await;
        let services = Services::from_store(store, clock);

        let args = cli()
            .try_get_matches_from([PROGRAM_NAME, RESULTS, "nonsense"])
            .unwrap();
        assert_eq!(report(execute(&args, &services).await), 2);

        let unknown = Id::new().to_string();
        let args = cli()
            .try_get_matches_from([PROGRAM_NAME, RESULTS, &unknown])
            .unwrap();
        assert_eq!(report(execute(&args, &services).await), 2);
    }

    #[test]
    fn bad_cli_usage() {
        // No subcommand.
        cli().try_get_matches_from([PROGRAM_NAME]).unwrap_err();

        // Missing election.
        cli().try_get_matches_from([PROGRAM_NAME, RESULTS]).unwrap_err();

        // Unknown subcommand.
        cli()
            .try_get_matches_from([PROGRAM_NAME, "vote"])
            .unwrap_err();
    }
}
