use once_cell::sync::Lazy;
use std::cell::UnsafeCell;
use std::fmt;
use std::ops::Deref;
use std::str::FromStr;
use std::time::Duration;
use zeroize::Zeroize;

pub static CONF: Lazy<Config> = Lazy::new(|| Config::from_env().expect("Failed to load config"));

const DB_USERNAME_VAR: &str = "TALLY_DB_USERNAME";
const DB_PASSWORD_VAR: &str = "TALLY_DB_PASSWORD";
const DB_HOSTNAME_VAR: &str = "TALLY_DB_HOSTNAME";
const DB_PORT_VAR: &str = "TALLY_DB_PORT";
const DB_NAME_VAR: &str = "TALLY_DB_NAME";
const DB_MAX_CONNECTIONS_VAR: &str = "TALLY_DB_MAX_CONNECTIONS";
const DB_IDLE_TIMEOUT_SECS_VAR: &str = "TALLY_DB_IDLE_TIMEOUT_SECS";
const DB_CONNECTION_TIMEOUT_SECS_VAR: &str = "TALLY_DB_CONNECTION_TIMEOUT_SECS";

const WORKER_THREADS_VAR: &str = "TALLY_WORKER_THREADS";
const MAX_BLOCKING_THREADS_VAR: &str = "TALLY_MAX_BLOCKING_THREADS";

const LOG_LEVEL_VAR: &str = "TALLY_LOG_LEVEL";

const UPDATE_FREQUENCY_SECS_VAR: &str = "TALLY_UPDATE_FREQUENCY_SECS";

const RESET_BUDGETS_JOB_FREQUENCY_SECS_VAR: &str = "TALLY_RESET_BUDGETS_JOB_FREQUENCY_SECS";
const RESET_ITEM_TIMEOUT_SECS_VAR: &str = "TALLY_RESET_ITEM_TIMEOUT_SECS";
const RESET_MAX_ATTEMPTS_VAR: &str = "TALLY_RESET_MAX_ATTEMPTS";
const RESET_RETRY_DELAY_MILLIS_VAR: &str = "TALLY_RESET_RETRY_DELAY_MILLIS";
const RESET_CONCURRENCY_VAR: &str = "TALLY_RESET_CONCURRENCY";

#[derive(Zeroize)]
pub struct ConfigInner {
    pub db_username: String,
    pub db_password: String,
    pub db_hostname: String,
    pub db_port: u16,
    pub db_name: String,
    #[zeroize(skip)]
    pub db_max_connections: u32,
    #[zeroize(skip)]
    pub db_idle_timeout: Duration,
    #[zeroize(skip)]
    pub db_connection_timeout: Duration,

    #[zeroize(skip)]
    pub worker_threads: usize,
    #[zeroize(skip)]
    pub max_blocking_threads: usize,

    #[zeroize(skip)]
    pub log_level: String,

    #[zeroize(skip)]
    pub update_frequency: Duration,

    #[zeroize(skip)]
    pub reset_budgets_job_frequency: Duration,
    #[zeroize(skip)]
    pub reset_item_timeout: Duration,
    #[zeroize(skip)]
    pub reset_max_attempts: u32,
    #[zeroize(skip)]
    pub reset_retry_delay: Duration,
    #[zeroize(skip)]
    pub reset_concurrency: usize,
}

pub struct Config {
    inner: UnsafeCell<ConfigInner>,
}

impl Deref for Config {
    type Target = ConfigInner;

    fn deref(&self) -> &Self::Target {
        // Safe as long as `unsafe Config::zeroize()` hasn't been called
        unsafe { &*self.inner.get() }
    }
}

// Safe to be shared across threads as long as `unsafe Config::zeroize()` hasn't been called
unsafe impl Sync for Config {}

impl Config {
    pub fn from_env() -> Result<Config, ConfigError> {
        let reset_max_attempts = env_var_or(RESET_MAX_ATTEMPTS_VAR, 3u32);
        if reset_max_attempts == 0 {
            return Err(ConfigError::invalid(RESET_MAX_ATTEMPTS_VAR));
        }

        let reset_concurrency = env_var_or(RESET_CONCURRENCY_VAR, 8usize);
        if reset_concurrency == 0 {
            return Err(ConfigError::invalid(RESET_CONCURRENCY_VAR));
        }

        let inner = ConfigInner {
            db_username: env_var(DB_USERNAME_VAR)?,
            db_password: env_var(DB_PASSWORD_VAR)?,
            db_hostname: env_var(DB_HOSTNAME_VAR)?,
            db_port: env_var(DB_PORT_VAR)?,
            db_name: env_var(DB_NAME_VAR)?,
            db_max_connections: env_var_or(DB_MAX_CONNECTIONS_VAR, 16),
            db_idle_timeout: Duration::from_secs(env_var_or(DB_IDLE_TIMEOUT_SECS_VAR, 30)),
            db_connection_timeout: Duration::from_secs(env_var_or(
                DB_CONNECTION_TIMEOUT_SECS_VAR,
                10,
            )),

            worker_threads: env_var_or(WORKER_THREADS_VAR, num_cpus::get()),
            max_blocking_threads: env_var_or(MAX_BLOCKING_THREADS_VAR, 40),

            log_level: env_var_or(LOG_LEVEL_VAR, String::from("info")),

            update_frequency: Duration::from_secs(env_var_or(UPDATE_FREQUENCY_SECS_VAR, 60)),

            reset_budgets_job_frequency: Duration::from_secs(env_var_or(
                RESET_BUDGETS_JOB_FREQUENCY_SECS_VAR,
                3600,
            )),
            reset_item_timeout: Duration::from_secs(env_var_or(RESET_ITEM_TIMEOUT_SECS_VAR, 30)),
            reset_max_attempts,
            reset_retry_delay: Duration::from_millis(env_var_or(
                RESET_RETRY_DELAY_MILLIS_VAR,
                500,
            )),
            reset_concurrency,
        };

        Ok(Config {
            inner: UnsafeCell::new(inner),
        })
    }

    /// # Safety
    ///
    /// Safe only if the Config isn't being used by other threads or across an async
    /// boundary. Generally, this should only be used at the end of the main function once
    /// all threads have been joined.
    pub unsafe fn zeroize(&self) {
        unsafe {
            (*self.inner.get()).zeroize();
        }
    }
}

fn env_var<T: FromStr>(key: &'static str) -> Result<T, ConfigError> {
    let var = std::env::var(key).map_err(|_| ConfigError::missing(key))?;
    let var: T = var.parse().map_err(|_| ConfigError::invalid(key))?;
    Ok(var)
}

fn env_var_or<T: FromStr>(key: &'static str, default: T) -> T {
    let Ok(var) = std::env::var(key) else {
        return default;
    };

    var.parse().unwrap_or(default)
}

#[derive(Clone, Copy, Debug)]
pub enum ConfigError {
    MissingVar(&'static str),
    InvalidVar(&'static str),
}

impl ConfigError {
    fn missing(var_name: &'static str) -> Self {
        Self::MissingVar(var_name)
    }

    fn invalid(var_name: &'static str) -> Self {
        Self::InvalidVar(var_name)
    }
}

impl std::error::Error for ConfigError {}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingVar(key) => write!(f, "Missing environment variable '{}'", key),
            Self::InvalidVar(key) => write!(f, "Environment variable '{}' is invalid", key),
        }
    }
}
