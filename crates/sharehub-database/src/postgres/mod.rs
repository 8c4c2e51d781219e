//! PostgreSQL store implementations.

pub mod access_log;
pub mod directory;
pub mod file;
pub mod share;
pub mod user;

pub use access_log::PgAccessLogStore;
pub use directory::PgDirectoryStore;
pub use file::PgFileStore;
pub use share::PgShareStore;
pub use user::PgUserStore;

use sharehub_core::error::{AppError, ErrorKind};

/// Map a sqlx error, turning unique violations on `constraint` into `Conflict`.
pub(crate) fn map_unique(
    err: sqlx::Error,
    constraint: &str,
    conflict_message: impl FnOnce() -> String,
    context: &'static str,
) -> AppError {
    match err {
        sqlx::Error::Database(ref db_err) if db_err.constraint() == Some(constraint) => {
            AppError::conflict(conflict_message())
        }
        _ => AppError::with_source(ErrorKind::Database, context, err),
    }
}
