use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::{debug, error, info, warn};
use rocket::{
    fairing::{Fairing, Info, Kind},
    tokio::sync::Mutex,
    Orbit, Rocket,
};

use super::Services;
use crate::{
    clock::Clock, config::Config, error::Result, scheduled_task::RecurringTask,
    store::ElectionRepository,
};

/// How many elections one sweep moved along.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct SweepReport {
    pub started: u64,
    pub completed: u64,
}

impl SweepReport {
    pub fn is_idle(&self) -> bool {
        self.started == 0 && self.completed == 0
    }
}

/// Moves elections through their lifecycle as time passes.
#[derive(Clone)]
pub struct ElectionScheduler {
    elections: Arc<dyn ElectionRepository>,
    clock: Arc<dyn Clock>,
}

impl ElectionScheduler {
    pub fn new(services: &Services) -> Self {
        Self {
            elections: services.elections.clone(),
            clock: services.clock.clone(),
        }
    }

    /// Start every due upcoming election, then complete every due ongoing one.
    ///
    /// Starting first means an election whose whole window passed between
    /// sweeps is completed by a single sweep. Running it again straight away
    /// changes nothing.
    pub async fn sweep(&self) -> Result<SweepReport> {
        let now: DateTime<Utc> = self.clock.now();
        let started = self.elections.advance_upcoming_to_ongoing(now).await?;
        let completed = self.elections.advance_ongoing_to_completed(now).await?;
        Ok(SweepReport { started, completed })
    }

    /// Sweep once, logging the outcome. Errors are left for the next tick to retry.
    pub async fn tick(&self) {
        match self.sweep().await {
            Ok(report) if report.is_idle() => debug!("Scheduler sweep: nothing to do"),
            Ok(report) => info!(
                "Scheduler sweep: {} election(s) started, {} completed",
                report.started, report.completed
            ),
            Err(e) => error!("Scheduler sweep failed: {e}"),
        }
    }

    /// Sweep every `period` in the background.
    pub fn spawn(self, period: std::time::Duration) -> RecurringTask {
        let scheduler = Arc::new(self);
        RecurringTask::spawn(period, move || {
            let scheduler = scheduler.clone();
            async move { scheduler.tick().await }
        })
    }
}

/// A fairing that runs the scheduler for the lifetime of the server.
#[derive(Default)]
pub struct SchedulerFairing {
    task: Mutex<Option<RecurringTask>>,
}

#[rocket::async_trait]
impl Fairing for SchedulerFairing {
    fn info(&self) -> Info {
        Info {
            name: "Election scheduler",
            kind: Kind::Liftoff | Kind::Shutdown,
        }
    }

    async fn on_liftoff(&self, rocket: &Rocket<Orbit>) {
        let (Some(config), Some(services)) =
            (rocket.state::<Config>(), rocket.state::<Services>())
        else {
            warn!("Scheduler not started: config or services are not managed");
            return;
        };
        if !config.scheduler_enabled() {
            info!("Scheduler disabled by configuration");
            return;
        }

        let period = config.scheduler_interval();
        info!("Starting scheduler, sweeping every {}s", period.as_secs());
        let task = services.scheduler().spawn(period);
        *self.task.lock().await = Some(task);
    }

    async fn on_shutdown(&self, _rocket: &Rocket<Orbit>) {
        if let Some(task) = self.task.lock().await.take() {
            task.cancel().await;
            info!("Scheduler stopped");
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::{
        model::{api::election::ElectionSpec, common::election::ElectionStatus, mongodb::Id},
        test_support::TestEnv,
    };

    #[backend_test]
    async fn election_moves_through_lifecycle(env: TestEnv) {
        let constituency = env.constituency("Ward 7").await;
        let start = env.now();
        let election = env
            .services
            .election_service()
            .create(ElectionSpec::example(constituency, start), Id::new())
            .await
            .unwrap();
        assert_eq!(election.status, ElectionStatus::Upcoming);
        let scheduler = env.services.scheduler();

        env.clock.set(start + Duration::days(2) + Duration::minutes(1));
        let report = scheduler.sweep().await.unwrap();
        assert_eq!(report, SweepReport { started: 1, completed: 0 });
        let status = env.store.election(election.id).await.unwrap().status;
        assert_eq!(status, ElectionStatus::Ongoing);

        assert!(scheduler.sweep().await.unwrap().is_idle());

        env.clock.set(start + Duration::days(5) + Duration::minutes(1));
        let report = scheduler.sweep().await.unwrap();
        assert_eq!(report, SweepReport { started: 0, completed: 1 });
        let status = env.store.election(election.id).await.unwrap().status;
        assert_eq!(status, ElectionStatus::Completed);
    }

    #[backend_test]
    async fn missed_window_completes_in_one_sweep(env: TestEnv) {
        let constituency = env.constituency("Ward 7").await;
        let now = env.now();
        let election = env
            .put_election(
                constituency,
                ElectionStatus::Upcoming,
                now + Duration::hours(1),
                now + Duration::days(1),
            )
            .await;

        env.clock.advance(Duration::days(2));
        let report = env.services.scheduler().sweep().await.unwrap();
        assert_eq!(report, SweepReport { started: 1, completed: 1 });
        let status = env.store.election(election.id).await.unwrap().status;
        assert_eq!(status, ElectionStatus::Completed);
    }

    #[backend_test]
    async fn completed_elections_stay_completed(env: TestEnv) {
        let constituency = env.constituency("Ward 7").await;
        let now = env.now();
        let election = env
            .put_election(
                constituency,
                ElectionStatus::Completed,
                now + Duration::days(1),
                now + Duration::days(2),
            )
            .await;

        assert!(env.services.scheduler().sweep().await.unwrap().is_idle());
        let status = env.store.election(election.id).await.unwrap().status;
        assert_eq!(status, ElectionStatus::Completed);
    }
}
