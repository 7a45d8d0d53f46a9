use std::time::Duration;

use anyhow::Result;
use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr, RuntimeErr};
use sea_orm_migration::MigratorTrait;

use crate::migration::Migrator;

/// Create a SeaORM connection.
pub async fn create_orm_conn(database_url: &str, max_connections: u32) -> Result<DatabaseConnection> {
    let mut options = ConnectOptions::new(database_url.to_owned());
    options
        .max_connections(max_connections)
        .connect_timeout(Duration::from_secs(8))
        .acquire_timeout(Duration::from_secs(8))
        .sqlx_logging(false);
    let conn = Database::connect(options).await?;
    Ok(conn)
}

/// Apply every pending schema migration.
pub async fn run_migrations(conn: &DatabaseConnection) -> Result<()> {
    Migrator::up(conn, None).await?;
    Ok(())
}

// SQLSTATE / SQLite result codes that signal a lost race rather than a bad request:
// serialization failure, deadlock, lock not available, SQLITE_BUSY, SQLITE_LOCKED,
// SQLITE_BUSY_SNAPSHOT.
const TRANSIENT_CODES: [&str; 6] = ["40001", "40P01", "55P03", "5", "6", "517"];

/// Whether a storage error is a transient conflict worth retrying the whole transaction for.
pub fn is_transient(err: &DbErr) -> bool {
    let runtime = match err {
        DbErr::Query(e) | DbErr::Exec(e) | DbErr::Conn(e) => e,
        _ => return false,
    };
    match runtime {
        RuntimeErr::SqlxError(sqlx::Error::Database(db)) => db
            .code()
            .is_some_and(|code| TRANSIENT_CODES.contains(&&*code)),
        _ => false,
    }
}

/// Driver errors carrying a fixed SQLSTATE / SQLite code.
#[cfg(test)]
pub(crate) mod test_support {
    use std::{borrow::Cow, error::Error as StdError, fmt};

    use sea_orm::{DbErr, RuntimeErr};
    use sqlx::error::{DatabaseError, ErrorKind};

    #[derive(Debug)]
    struct CodedError(&'static str);

    impl fmt::Display for CodedError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "database error {}", self.0)
        }
    }

    impl StdError for CodedError {}

    impl DatabaseError for CodedError {
        fn message(&self) -> &str {
            "database error"
        }

        fn code(&self) -> Option<Cow<'_, str>> {
            Some(Cow::Borrowed(self.0))
        }

        fn as_error(&self) -> &(dyn StdError + Send + Sync + 'static) {
            self
        }

        fn as_error_mut(&mut self) -> &mut (dyn StdError + Send + Sync + 'static) {
            self
        }

        fn into_error(self: Box<Self>) -> Box<dyn StdError + Send + Sync + 'static> {
            self
        }

        fn kind(&self) -> ErrorKind {
            ErrorKind::Other
        }
    }

    pub(crate) fn coded_error(code: &'static str) -> DbErr {
        DbErr::Exec(RuntimeErr::SqlxError(sqlx::Error::Database(Box::new(
            CodedError(code),
        ))))
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::coded_error;
    use super::*;

    #[test]
    fn lock_and_serialization_codes_are_transient() {
        for code in ["40001", "40P01", "55P03", "5", "6", "517"] {
            assert!(is_transient(&coded_error(code)), "{code} should be transient");
        }
        // unique violation, SQLite constraint
        assert!(!is_transient(&coded_error("23505")));
        assert!(!is_transient(&coded_error("19")));
    }

    #[test]
    fn non_driver_errors_are_not_transient() {
        assert!(!is_transient(&DbErr::Custom("boom".into())));
        assert!(!is_transient(&DbErr::RecordNotFound("review".into())));
        assert!(!is_transient(&DbErr::Query(RuntimeErr::Internal(
            "connection reset".into()
        ))));
    }
}
