use tally_common::clock::Clock;
use tally_common::db::job_registry::Dao as JobRegistryDao;
use tally_common::db::DaoError;

use chrono::{DateTime, Utc};
use futures::future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time;

use crate::jobs::Job;

/// Where the runner remembers when each job last ran, so a restart doesn't rerun everything.
pub trait JobRegistry: Send + Sync + 'static {
    fn last_run(&self, job_name: &str) -> Result<Option<DateTime<Utc>>, DaoError>;
    fn record_run(&self, job_name: &str, timestamp: DateTime<Utc>) -> Result<(), DaoError>;
}

impl JobRegistry for JobRegistryDao {
    fn last_run(&self, job_name: &str) -> Result<Option<DateTime<Utc>>, DaoError> {
        self.get_job_last_run_timestamp(job_name)
    }

    fn record_run(&self, job_name: &str, timestamp: DateTime<Utc>) -> Result<(), DaoError> {
        self.set_job_last_run_timestamp(job_name, timestamp)
    }
}

struct JobContainer {
    job: Box<dyn Job>,
    run_frequency: Duration,
    last_run_time: Option<DateTime<Utc>>,
}

pub struct JobRunner {
    jobs: Vec<JobContainer>,
    update_frequency: Duration,
    clock: Arc<dyn Clock>,
    registry: Arc<dyn JobRegistry>,
}

impl JobRunner {
    pub fn new(
        update_frequency: Duration,
        clock: Arc<dyn Clock>,
        registry: Arc<dyn JobRegistry>,
    ) -> Self {
        Self {
            jobs: Vec::new(),
            update_frequency,
            clock,
            registry,
        }
    }

    pub async fn register(&mut self, job: Box<dyn Job>, run_frequency: Duration) {
        let job_name_ref = job.name();

        log::info!(
            "Registered job \"{}\" to run every {} seconds",
            job_name_ref,
            run_frequency.as_secs()
        );

        let registry = Arc::clone(&self.registry);
        let last_run_time = tokio::task::spawn_blocking(move || {
            registry.last_run(job_name_ref).unwrap_or_else(|e| {
                log::error!(
                    "Failed to get last run timestamp for job '{}': {}",
                    job_name_ref,
                    e
                );
                None
            })
        })
        .await
        .unwrap_or_else(|e| {
            log::error!("Failed to join Tokio task: {}", e);
            None
        });

        let job_container = JobContainer {
            job,
            run_frequency,
            last_run_time,
        };

        self.jobs.push(job_container);
    }

    pub async fn start(&mut self) -> ! {
        loop {
            let before = Instant::now();

            self.run_pending().await;

            let delta = Instant::now() - before;

            if delta < self.update_frequency {
                time::sleep(self.update_frequency - delta).await;
            }
        }
    }

    /// Runs every registered job that is ready and whose run frequency has elapsed since its
    /// last run, then records the run.
    pub async fn run_pending(&mut self) {
        let now = self.clock.now();

        let mut job_names = Vec::with_capacity(self.jobs.len());
        let mut job_futures = Vec::with_capacity(self.jobs.len());
        let mut record_job_run_futures = Vec::with_capacity(self.jobs.len());

        for job_container in &mut self.jobs {
            let JobContainer {
                job,
                run_frequency,
                last_run_time,
            } = job_container;

            if is_time_to_run(*last_run_time, *run_frequency, now) && job.is_ready() {
                let name_ref = job.name();
                log::info!("Executing job \"{}\"", name_ref);

                *last_run_time = Some(now);
                job_names.push(name_ref);
                job_futures.push(job.execute());

                let registry = Arc::clone(&self.registry);
                let record_run_task =
                    tokio::task::spawn_blocking(move || registry.record_run(name_ref, now));

                record_job_run_futures.push(record_run_task);
            }
        }

        let (job_results, recording_results) = future::join(
            future::join_all(job_futures),
            future::join_all(record_job_run_futures),
        )
        .await;

        for (i, result) in job_results.into_iter().enumerate() {
            if let Err(e) = result {
                log::error!("Job \"{}\" failed: {}", job_names[i], e);
            } else {
                log::info!("Job \"{}\" finished successfully", job_names[i]);
            }
        }

        for result in recording_results.into_iter() {
            match result {
                Ok(Err(e)) => log::error!("Error recording job run: {}", e),
                Err(e) => log::error!("Failed to join Tokio task: {}", e),
                Ok(Ok(())) => (),
            }
        }
    }
}

/// A job that has never run is due right away.
fn is_time_to_run(
    last_run_time: Option<DateTime<Utc>>,
    run_frequency: Duration,
    now: DateTime<Utc>,
) -> bool {
    let Some(last_run_time) = last_run_time else {
        return true;
    };

    // A last run in the future (clock moved backwards) counts as no time elapsed
    let elapsed = (now - last_run_time).to_std().unwrap_or(Duration::ZERO);
    elapsed >= run_frequency
}

#[cfg(test)]
mod tests {
    use super::*;

    use tally_common::clock::ManualClock;

    use chrono::TimeZone;
    use std::collections::HashMap;
    use std::sync::Mutex;

    use crate::jobs::tests::MockJob;

    #[derive(Default)]
    struct InMemoryRegistry {
        runs: Mutex<HashMap<String, DateTime<Utc>>>,
    }

    impl JobRegistry for InMemoryRegistry {
        fn last_run(&self, job_name: &str) -> Result<Option<DateTime<Utc>>, DaoError> {
            Ok(self.runs.lock().unwrap().get(job_name).copied())
        }

        fn record_run(&self, job_name: &str, timestamp: DateTime<Utc>) -> Result<(), DaoError> {
            self.runs
                .lock()
                .unwrap()
                .insert(String::from(job_name), timestamp);
            Ok(())
        }
    }

    fn start_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_is_time_to_run() {
        let now = start_time();
        let hour = Duration::from_secs(3600);

        assert!(is_time_to_run(None, hour, now));
        assert!(is_time_to_run(
            Some(now - chrono::Duration::hours(1)),
            hour,
            now
        ));
        assert!(!is_time_to_run(
            Some(now - chrono::Duration::minutes(59)),
            hour,
            now
        ));
        assert!(!is_time_to_run(
            Some(now + chrono::Duration::minutes(5)),
            hour,
            now
        ));
    }

    #[tokio::test]
    async fn test_register() {
        let registry = Arc::new(InMemoryRegistry::default());
        let clock = Arc::new(ManualClock::new(start_time()));

        let mut job_runner = JobRunner::new(Duration::from_micros(200), clock, registry);
        assert_eq!(job_runner.update_frequency, Duration::from_micros(200));
        assert!(job_runner.jobs.is_empty());

        job_runner
            .register(Box::new(MockJob::new("Mock 1")), Duration::from_secs(1))
            .await;
        assert_eq!(job_runner.jobs.len(), 1);

        job_runner
            .register(Box::new(MockJob::new("Mock 2")), Duration::from_secs(3))
            .await;
        assert_eq!(job_runner.jobs.len(), 2);
        assert!(job_runner.jobs.iter().all(|j| j.last_run_time.is_none()));
    }

    #[tokio::test]
    async fn test_run_pending_follows_frequency_and_records_runs() {
        let registry = Arc::new(InMemoryRegistry::default());
        let clock = Arc::new(ManualClock::new(start_time()));

        let mut job_runner = JobRunner::new(
            Duration::from_secs(60),
            clock.clone(),
            registry.clone(),
        );

        let hourly = MockJob::new("Hourly");
        let daily = MockJob::new("Daily");
        let hourly_runs = Arc::clone(&hourly.runs);
        let daily_runs = Arc::clone(&daily.runs);

        // Daily job already ran half a day ago before a restart
        registry
            .record_run("Daily", start_time() - chrono::Duration::hours(12))
            .unwrap();

        job_runner
            .register(Box::new(hourly), Duration::from_secs(3600))
            .await;
        job_runner
            .register(Box::new(daily), Duration::from_secs(86400))
            .await;

        job_runner.run_pending().await;
        assert_eq!(*hourly_runs.lock().unwrap(), 1);
        assert_eq!(*daily_runs.lock().unwrap(), 0);
        assert_eq!(
            registry.last_run("Hourly").unwrap(),
            Some(start_time())
        );

        clock.advance(chrono::Duration::minutes(30));
        job_runner.run_pending().await;
        assert_eq!(*hourly_runs.lock().unwrap(), 1);

        clock.advance(chrono::Duration::minutes(30));
        job_runner.run_pending().await;
        assert_eq!(*hourly_runs.lock().unwrap(), 2);
        assert_eq!(*daily_runs.lock().unwrap(), 0);

        clock.advance(chrono::Duration::hours(11));
        job_runner.run_pending().await;
        assert_eq!(*hourly_runs.lock().unwrap(), 3);
        assert_eq!(*daily_runs.lock().unwrap(), 1);
        assert_eq!(
            registry.last_run("Daily").unwrap(),
            Some(start_time() + chrono::Duration::hours(12))
        );
    }

    #[tokio::test]
    async fn test_failed_or_unready_jobs() {
        let registry = Arc::new(InMemoryRegistry::default());
        let clock = Arc::new(ManualClock::new(start_time()));

        let mut job_runner = JobRunner::new(Duration::from_secs(60), clock, registry.clone());

        let mut busy = MockJob::new("Busy");
        busy.ready = false;
        let busy_runs = Arc::clone(&busy.runs);

        let mut failing = MockJob::new("Failing");
        failing.fail = true;
        let failing_runs = Arc::clone(&failing.runs);

        job_runner
            .register(Box::new(busy), Duration::from_secs(1))
            .await;
        job_runner
            .register(Box::new(failing), Duration::from_secs(1))
            .await;

        job_runner.run_pending().await;

        assert_eq!(*busy_runs.lock().unwrap(), 0);
        assert!(registry.last_run("Busy").unwrap().is_none());

        // A failed run still counts as a run
        assert_eq!(*failing_runs.lock().unwrap(), 1);
        assert_eq!(registry.last_run("Failing").unwrap(), Some(start_time()));
    }
}
