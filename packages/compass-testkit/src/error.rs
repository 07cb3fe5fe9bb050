pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("{var} is not a valid Postgres DSN: {source}")]
	InvalidDsn { var: &'static str, source: sqlx::Error },
	#[error("No admin database is reachable (tried postgres, template1): {0}")]
	AdminUnreachable(sqlx::Error),
	#[error("Failed to {action} test database {name}: {source}")]
	Database { action: &'static str, name: String, source: sqlx::Error },
}
