mod error;

pub use error::{Error, Result};

use std::{env, str::FromStr, thread};

use sqlx::{
	ConnectOptions, Connection, Executor,
	postgres::{PgConnectOptions, PgConnection},
};
use tokio::runtime::Builder;
use uuid::Uuid;

pub const DSN_ENV: &str = "COMPASS_PG_DSN";
/// Stand-in for the database DSN inside config templates used by tests.
pub const DSN_PLACEHOLDER: &str = "__DSN__";

const ADMIN_DATABASES: [&str; 2] = ["postgres", "template1"];

/// The base DSN for database tests, if one is configured and non-blank.
pub fn env_dsn() -> Option<String> {
	env::var(DSN_ENV).ok().filter(|dsn| !dsn.trim().is_empty())
}

/// A `compass_test_*` database created on the server named by `COMPASS_PG_DSN`. It is dropped by
/// [`TestDatabase::cleanup`], or on drop when a test panics before reaching it.
pub struct TestDatabase {
	name: String,
	dsn: String,
	admin: PgConnectOptions,
	dropped: bool,
}
impl TestDatabase {
	pub async fn new(base_dsn: &str) -> Result<Self> {
		let base = PgConnectOptions::from_str(base_dsn)
			.map_err(|source| Error::InvalidDsn { var: DSN_ENV, source })?;
		let (admin, mut conn) = connect_admin(&base).await?;
		let name = format!("compass_test_{}", Uuid::new_v4().simple());

		conn.execute(format!(r#"CREATE DATABASE "{name}""#).as_str()).await.map_err(|source| {
			Error::Database { action: "create", name: name.clone(), source }
		})?;

		let dsn = base.database(&name).to_url_lossy().to_string();

		Ok(Self { name, dsn, admin, dropped: false })
	}

	pub fn dsn(&self) -> &str {
		&self.dsn
	}

	/// Substitutes this database's DSN into a TOML config template.
	pub fn render_config(&self, template: &str) -> String {
		template.replace(DSN_PLACEHOLDER, &self.dsn)
	}

	pub async fn cleanup(mut self) -> Result<()> {
		drop_database(&self.name, &self.admin).await?;

		self.dropped = true;

		Ok(())
	}
}
impl Drop for TestDatabase {
	fn drop(&mut self) {
		if self.dropped {
			return;
		}

		let name = self.name.clone();
		let admin = self.admin.clone();
		// The caller's runtime may be shutting down, so the drop runs on a private one.
		let handle = thread::spawn(move || {
			let runtime = match Builder::new_current_thread().enable_all().build() {
				Ok(runtime) => runtime,
				Err(err) => {
					eprintln!("Could not start a runtime to drop {name}: {err}.");

					return;
				},
			};

			if let Err(err) = runtime.block_on(drop_database(&name, &admin)) {
				eprintln!("{err}.");
			}
		});

		let _ = handle.join();
	}
}

async fn connect_admin(base: &PgConnectOptions) -> Result<(PgConnectOptions, PgConnection)> {
	let mut last_err = None;

	for database in ADMIN_DATABASES {
		let options = base.clone().database(database);

		match PgConnection::connect_with(&options).await {
			Ok(conn) => return Ok((options, conn)),
			Err(err) => last_err = Some(err),
		}
	}

	Err(Error::AdminUnreachable(last_err.unwrap_or(sqlx::Error::PoolClosed)))
}

async fn drop_database(name: &str, admin: &PgConnectOptions) -> Result<()> {
	let failed = |action: &'static str| {
		move |source: sqlx::Error| Error::Database { action, name: name.to_string(), source }
	};
	let mut conn = PgConnection::connect_with(admin).await.map_err(failed("connect to drop"))?;

	// Pooled connections left behind by the test would otherwise block the drop.
	sqlx::query(
		"\
SELECT pg_terminate_backend(pid)
FROM pg_stat_activity
WHERE datname = $1 AND pid <> pg_backend_pid()",
	)
	.bind(name)
	.fetch_all(&mut conn)
	.await
	.map_err(failed("disconnect clients of"))?;
	conn.execute(format!(r#"DROP DATABASE IF EXISTS "{name}""#).as_str())
		.await
		.map_err(failed("drop"))?;

	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn invalid_dsn_names_the_variable() {
		let runtime =
			Builder::new_current_thread().enable_all().build().expect("Failed to build runtime.");
		let result = runtime.block_on(TestDatabase::new("not a dsn"));

		assert!(matches!(result, Err(Error::InvalidDsn { var: DSN_ENV, .. })));
	}
}
