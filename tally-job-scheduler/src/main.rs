use tally_common::clock::{Clock, SystemClock};
use tally_common::db::{budget, create_db_thread_pool, job_registry};

use flexi_logger::{Age, Cleanup, Criterion, Duplicate, FileSpec, Logger, Naming, WriteMode};
use runner::JobRunner;
use std::sync::Arc;
use zeroize::Zeroizing;

mod env;
mod jobs;
mod runner;

use jobs::{ResetBudgetsJob, ResetSettings};

fn main() {
    let db_uri = Zeroizing::new(format!(
        "postgres://{}:{}@{}:{}/{}",
        env::CONF.db_username,
        env::CONF.db_password,
        env::CONF.db_hostname,
        env::CONF.db_port,
        env::CONF.db_name,
    ));

    let db_thread_pool = create_db_thread_pool(
        &db_uri,
        env::CONF.db_max_connections,
        env::CONF.db_idle_timeout,
        env::CONF.db_connection_timeout,
    )
    .expect("Failed to create DB thread pool");

    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(env::CONF.worker_threads)
        .max_blocking_threads(env::CONF.max_blocking_threads)
        .enable_all()
        .build()
        .expect("Failed to launch asynchronous runtime")
        .block_on(async move {
            Logger::try_with_str(&env::CONF.log_level)
                .expect(
                    "Invalid log level. Options: ERROR, WARN, INFO, DEBUG, TRACE. \
                     Example: `info, my::critical::module=trace`",
                )
                .log_to_file(FileSpec::default().directory("./logs"))
                .rotate(
                    Criterion::Age(Age::Day),
                    Naming::Timestamps,
                    Cleanup::KeepLogAndCompressedFiles(60, 365),
                )
                .cleanup_in_background_thread(true)
                .duplicate_to_stdout(Duplicate::All)
                .write_mode(WriteMode::BufferAndFlush)
                .format(|writer, now, record| {
                    write!(
                        writer,
                        "{:5} | {} | {}:{} | {}",
                        record.level(),
                        now.format("%Y-%m-%dT%H:%M:%S%.6fZ"),
                        record.module_path().unwrap_or("<unknown>"),
                        record.line().unwrap_or(0),
                        record.args()
                    )
                })
                .use_utc()
                .start()
                .expect("Failed to start logger");

            let clock: Arc<dyn Clock> = Arc::new(SystemClock);

            let mut job_runner = JobRunner::new(
                env::CONF.update_frequency,
                Arc::clone(&clock),
                Arc::new(job_registry::Dao::new(&db_thread_pool)),
            );

            job_runner
                .register(
                    Box::new(ResetBudgetsJob::new(
                        budget::Dao::new(&db_thread_pool),
                        Arc::clone(&clock),
                        ResetSettings {
                            concurrency: env::CONF.reset_concurrency,
                            item_timeout: env::CONF.reset_item_timeout,
                            max_attempts: env::CONF.reset_max_attempts,
                            retry_delay: env::CONF.reset_retry_delay,
                        },
                    )),
                    env::CONF.reset_budgets_job_frequency,
                )
                .await;

            job_runner.start().await;
        });

    unsafe {
        env::CONF.zeroize();
    }
}
