use sqlx::PgExecutor;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::Result;

/// Adds the `recommended_by -> profile_id` edge. Returns `false` when it already exists.
pub async fn insert_recommendation<'e, E>(
	executor: E,
	profile_id: Uuid,
	recommended_by: Uuid,
	now: OffsetDateTime,
) -> Result<bool>
where
	E: PgExecutor<'e>,
{
	let result = sqlx::query(
		"\
INSERT INTO profile_recommendations (profile_id, recommended_by, created_at)
VALUES ($1,$2,$3)
ON CONFLICT (profile_id, recommended_by) DO NOTHING",
	)
	.bind(profile_id)
	.bind(recommended_by)
	.bind(now)
	.execute(executor)
	.await?;

	Ok(result.rows_affected() == 1)
}

/// Removes the edge. Returns `false` when there was nothing to remove.
pub async fn delete_recommendation<'e, E>(
	executor: E,
	profile_id: Uuid,
	recommended_by: Uuid,
) -> Result<bool>
where
	E: PgExecutor<'e>,
{
	let result = sqlx::query(
		"DELETE FROM profile_recommendations WHERE profile_id = $1 AND recommended_by = $2",
	)
	.bind(profile_id)
	.bind(recommended_by)
	.execute(executor)
	.await?;

	Ok(result.rows_affected() == 1)
}

/// Recounts the edge set into `profiles.recommendations_count` and returns the new value.
pub async fn refresh_count<'e, E>(executor: E, profile_id: Uuid, now: OffsetDateTime) -> Result<i32>
where
	E: PgExecutor<'e>,
{
	let count: i32 = sqlx::query_scalar(
		"\
UPDATE profiles
SET recommendations_count = (
\tSELECT count(*)::int4
\tFROM profile_recommendations
\tWHERE profile_id = $1
),
\tupdated_at = $2
WHERE profile_id = $1
RETURNING recommendations_count",
	)
	.bind(profile_id)
	.bind(now)
	.fetch_one(executor)
	.await?;

	Ok(count)
}
