use diesel::pg::PgConnection;
use diesel::r2d2::ConnectionManager;
use diesel::result::DatabaseErrorKind;
use std::fmt;
use std::time::Duration;

pub mod budget;
pub mod budget_history;
pub mod category;
pub mod job_registry;
pub mod ledger;

pub type DbThreadPool = diesel::r2d2::Pool<ConnectionManager<PgConnection>>;

pub fn create_db_thread_pool(
    database_uri: &str,
    max_db_connections: u32,
    idle_timeout: Duration,
    connection_timeout: Duration,
) -> Result<DbThreadPool, r2d2::Error> {
    r2d2::Pool::builder()
        .max_size(max_db_connections)
        .idle_timeout(Some(idle_timeout))
        .connection_timeout(connection_timeout)
        .build(ConnectionManager::<PgConnection>::new(database_uri))
}

#[derive(Debug)]
pub enum DaoError {
    DbThreadPoolFailure(r2d2::Error),
    QueryFailure(diesel::result::Error),
    ValidationFailure(&'static str),
}

impl DaoError {
    /// Whether retrying the same unit of work may succeed without anything else changing
    pub fn is_transient(&self) -> bool {
        match self {
            DaoError::DbThreadPoolFailure(_) => true,
            DaoError::QueryFailure(diesel::result::Error::DatabaseError(kind, _)) => matches!(
                kind,
                DatabaseErrorKind::SerializationFailure | DatabaseErrorKind::ClosedConnection
            ),
            DaoError::QueryFailure(diesel::result::Error::BrokenTransactionManager) => true,
            _ => false,
        }
    }

    pub fn is_unique_violation(&self, constraint: &str) -> bool {
        match self {
            DaoError::QueryFailure(diesel::result::Error::DatabaseError(
                DatabaseErrorKind::UniqueViolation,
                info,
            )) => info.constraint_name() == Some(constraint),
            _ => false,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            DaoError::QueryFailure(diesel::result::Error::NotFound)
        )
    }
}

impl std::error::Error for DaoError {}

impl fmt::Display for DaoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DaoError::DbThreadPoolFailure(e) => {
                write!(f, "DaoError: Failed to obtain DB connection: {e}")
            }
            DaoError::QueryFailure(e) => {
                write!(f, "DaoError: Query failed: {e}")
            }
            DaoError::ValidationFailure(msg) => {
                write!(f, "DaoError: Refusing to write invalid data: {msg}")
            }
        }
    }
}

impl From<r2d2::Error> for DaoError {
    fn from(error: r2d2::Error) -> Self {
        DaoError::DbThreadPoolFailure(error)
    }
}

impl From<diesel::result::Error> for DaoError {
    fn from(error: diesel::result::Error) -> Self {
        DaoError::QueryFailure(error)
    }
}
