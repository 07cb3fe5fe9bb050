use sqlx::PgExecutor;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{Error, Result, models::Account};

pub async fn insert_account<'e, E>(executor: E, account: &Account) -> Result<()>
where
	E: PgExecutor<'e>,
{
	sqlx::query(
		"\
INSERT INTO accounts (email, profile_id, contact_method, job_notifications, created_at, updated_at)
VALUES ($1,$2,$3,$4,$5,$6)",
	)
	.bind(account.email.as_str())
	.bind(account.profile_id)
	.bind(account.contact_method.as_str())
	.bind(account.job_notifications)
	.bind(account.created_at)
	.bind(account.updated_at)
	.execute(executor)
	.await?;

	Ok(())
}

pub async fn get_account<'e, E>(executor: E, email: &str) -> Result<Option<Account>>
where
	E: PgExecutor<'e>,
{
	let row = sqlx::query_as::<_, Account>(
		"\
SELECT email, profile_id, contact_method, job_notifications, created_at, updated_at
FROM accounts
WHERE email = $1 AND deleted_at IS NULL",
	)
	.bind(email)
	.fetch_optional(executor)
	.await?;

	Ok(row)
}

pub async fn get_account_by_profile<'e, E>(executor: E, profile_id: Uuid) -> Result<Option<Account>>
where
	E: PgExecutor<'e>,
{
	let row = sqlx::query_as::<_, Account>(
		"\
SELECT email, profile_id, contact_method, job_notifications, created_at, updated_at
FROM accounts
WHERE profile_id = $1 AND deleted_at IS NULL",
	)
	.bind(profile_id)
	.fetch_optional(executor)
	.await?;

	Ok(row)
}

pub async fn update_preferences<'e, E>(
	executor: E,
	email: &str,
	contact_method: &str,
	job_notifications: bool,
	now: OffsetDateTime,
) -> Result<Account>
where
	E: PgExecutor<'e>,
{
	let row = sqlx::query_as::<_, Account>(
		"\
UPDATE accounts
SET contact_method = $2,
\tjob_notifications = $3,
\tupdated_at = $4
WHERE email = $1 AND deleted_at IS NULL
RETURNING email, profile_id, contact_method, job_notifications, created_at, updated_at",
	)
	.bind(email)
	.bind(contact_method)
	.bind(job_notifications)
	.bind(now)
	.fetch_optional(executor)
	.await?;

	row.ok_or_else(|| Error::NotFound(format!("account {email}")))
}
