use sqlx::PgExecutor;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{Result, models::Profile};

/// Records an application. The `(opening_id, profile_id)` primary key makes a repeat a no-op that
/// returns `false`.
pub async fn insert_applicant<'e, E>(
	executor: E,
	opening_id: Uuid,
	profile_id: Uuid,
	now: OffsetDateTime,
) -> Result<bool>
where
	E: PgExecutor<'e>,
{
	let result = sqlx::query(
		"\
INSERT INTO job_opening_applicants (opening_id, profile_id, created_at)
VALUES ($1,$2,$3)
ON CONFLICT (opening_id, profile_id) DO NOTHING",
	)
	.bind(opening_id)
	.bind(profile_id)
	.bind(now)
	.execute(executor)
	.await?;

	Ok(result.rows_affected() == 1)
}

pub async fn count_applicants<'e, E>(executor: E, opening_id: Uuid) -> Result<i64>
where
	E: PgExecutor<'e>,
{
	let count: i64 = sqlx::query_scalar(
		"\
SELECT count(*)
FROM job_opening_applicants a
JOIN profiles p ON p.profile_id = a.profile_id
WHERE a.opening_id = $1 AND p.deleted_at IS NULL",
	)
	.bind(opening_id)
	.fetch_one(executor)
	.await?;

	Ok(count)
}

/// Applicant profiles in application order.
pub async fn list_applicants<'e, E>(
	executor: E,
	opening_id: Uuid,
	limit: i64,
	offset: i64,
) -> Result<Vec<Profile>>
where
	E: PgExecutor<'e>,
{
	let rows = sqlx::query_as::<_, Profile>(
		"\
SELECT p.*
FROM job_opening_applicants a
JOIN profiles p ON p.profile_id = a.profile_id
WHERE a.opening_id = $1 AND p.deleted_at IS NULL
ORDER BY a.created_at ASC, p.profile_id ASC
LIMIT $2 OFFSET $3",
	)
	.bind(opening_id)
	.bind(limit)
	.bind(offset)
	.fetch_all(executor)
	.await?;

	Ok(rows)
}
