use sqlx::PgExecutor;
use uuid::Uuid;

use crate::{
	Error, Result,
	models::{Job, JobOpening},
};

pub async fn insert_job<'e, E>(executor: E, job: &Job) -> Result<()>
where
	E: PgExecutor<'e>,
{
	sqlx::query(
		"\
INSERT INTO jobs (
\tjob_id,
\trequester_email,
\tcontact_start_date,
\tcontact_end_date,
\tcontact_email,
\twhatsapp,
\tphone_numbers,
\twork_mode,
\twork_radius,
\temployment,
\tdescription,
\tspecial_requirements,
\tbenefits,
\tnotes,
\tbudget_low,
\tbudget_high,
\tjob_start_date,
\tjob_end_date,
\tcreated_at,
\tupdated_at
)
VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13,$14,$15,$16,$17,$18,$19,$20)",
	)
	.bind(job.job_id)
	.bind(job.requester_email.as_str())
	.bind(job.contact_start_date)
	.bind(job.contact_end_date)
	.bind(job.contact_email.as_deref())
	.bind(job.whatsapp.as_deref())
	.bind(&job.phone_numbers)
	.bind(job.work_mode.as_str())
	.bind(job.work_radius.as_str())
	.bind(job.employment.as_str())
	.bind(job.description.as_str())
	.bind(job.special_requirements.as_deref())
	.bind(job.benefits.as_deref())
	.bind(job.notes.as_deref())
	.bind(job.budget_low)
	.bind(job.budget_high)
	.bind(job.job_start_date)
	.bind(job.job_end_date)
	.bind(job.created_at)
	.bind(job.updated_at)
	.execute(executor)
	.await?;

	Ok(())
}

pub async fn get_job<'e, E>(executor: E, job_id: Uuid) -> Result<Option<Job>>
where
	E: PgExecutor<'e>,
{
	let row = sqlx::query_as::<_, Job>(
		"\
SELECT
\tjob_id,
\trequester_email,
\tcontact_start_date,
\tcontact_end_date,
\tcontact_email,
\twhatsapp,
\tphone_numbers,
\twork_mode,
\twork_radius,
\temployment,
\tdescription,
\tspecial_requirements,
\tbenefits,
\tnotes,
\tbudget_low,
\tbudget_high,
\tjob_start_date,
\tjob_end_date,
\tcreated_at,
\tupdated_at
FROM jobs
WHERE job_id = $1 AND deleted_at IS NULL",
	)
	.bind(job_id)
	.fetch_optional(executor)
	.await?;

	Ok(row)
}

pub async fn insert_opening<'e, E>(executor: E, opening: &JobOpening) -> Result<()>
where
	E: PgExecutor<'e>,
{
	sqlx::query(
		"\
INSERT INTO job_openings (
\topening_id,
\tjob_id,
\tactivity,
\theadcount,
\tprobono,
\tgender,
\tage_range_min,
\tage_range_max,
\tschool,
\tlanguages,
\tsearch_string,
\tcreated_at,
\tupdated_at
)
VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13)",
	)
	.bind(opening.opening_id)
	.bind(opening.job_id)
	.bind(opening.activity.as_str())
	.bind(opening.headcount)
	.bind(opening.probono)
	.bind(opening.gender.as_deref())
	.bind(opening.age_range_min)
	.bind(opening.age_range_max)
	.bind(opening.school.as_deref())
	.bind(&opening.languages)
	.bind(opening.search_string.as_str())
	.bind(opening.created_at)
	.bind(opening.updated_at)
	.execute(executor)
	.await?;

	Ok(())
}

pub async fn get_opening<'e, E>(executor: E, opening_id: Uuid) -> Result<Option<JobOpening>>
where
	E: PgExecutor<'e>,
{
	let row = sqlx::query_as::<_, JobOpening>(
		"\
SELECT
\topening_id,
\tjob_id,
\tactivity,
\theadcount,
\tprobono,
\tgender,
\tage_range_min,
\tage_range_max,
\tschool,
\tlanguages,
\tsearch_string,
\tcreated_at,
\tupdated_at
FROM job_openings
WHERE opening_id = $1 AND deleted_at IS NULL",
	)
	.bind(opening_id)
	.fetch_optional(executor)
	.await?;

	Ok(row)
}

/// [`get_opening`] with a row lock held until the surrounding transaction ends.
pub async fn lock_opening<'e, E>(executor: E, opening_id: Uuid) -> Result<Option<JobOpening>>
where
	E: PgExecutor<'e>,
{
	let row = sqlx::query_as::<_, JobOpening>(
		"\
SELECT
\topening_id,
\tjob_id,
\tactivity,
\theadcount,
\tprobono,
\tgender,
\tage_range_min,
\tage_range_max,
\tschool,
\tlanguages,
\tsearch_string,
\tcreated_at,
\tupdated_at
FROM job_openings
WHERE opening_id = $1 AND deleted_at IS NULL
FOR UPDATE",
	)
	.bind(opening_id)
	.fetch_optional(executor)
	.await?;

	Ok(row)
}

pub async fn update_opening<'e, E>(executor: E, opening: &JobOpening) -> Result<()>
where
	E: PgExecutor<'e>,
{
	let result = sqlx::query(
		"\
UPDATE job_openings
SET activity = $2,
\theadcount = $3,
\tprobono = $4,
\tgender = $5,
\tage_range_min = $6,
\tage_range_max = $7,
\tschool = $8,
\tlanguages = $9,
\tsearch_string = $10,
\tupdated_at = $11
WHERE opening_id = $1 AND deleted_at IS NULL",
	)
	.bind(opening.opening_id)
	.bind(opening.activity.as_str())
	.bind(opening.headcount)
	.bind(opening.probono)
	.bind(opening.gender.as_deref())
	.bind(opening.age_range_min)
	.bind(opening.age_range_max)
	.bind(opening.school.as_deref())
	.bind(&opening.languages)
	.bind(opening.search_string.as_str())
	.bind(opening.updated_at)
	.execute(executor)
	.await?;

	if result.rows_affected() == 0 {
		return Err(Error::NotFound(format!("opening {}", opening.opening_id)));
	}

	Ok(())
}
