use sqlx::PgExecutor;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{Result, db::Db, models::JobAlertOutboxEntry};

/// Queues the alert fan-out for `opening_id`. Call inside the transaction that writes the opening
/// so a rolled-back job never produces alerts.
pub async fn enqueue_job_alert<'e, E>(
	executor: E,
	opening_id: Uuid,
	now: OffsetDateTime,
) -> Result<Uuid>
where
	E: PgExecutor<'e>,
{
	let outbox_id = Uuid::new_v4();

	sqlx::query(
		"\
INSERT INTO job_alert_outbox (outbox_id, opening_id, status, available_at, created_at, updated_at)
VALUES ($1,$2,'PENDING',$3,$3,$3)",
	)
	.bind(outbox_id)
	.bind(opening_id)
	.bind(now)
	.execute(executor)
	.await?;

	Ok(outbox_id)
}

pub async fn claim_next_job_alert(
	db: &Db,
	now: OffsetDateTime,
	lease_seconds: i64,
) -> Result<Option<JobAlertOutboxEntry>> {
	let mut tx = db.pool.begin().await?;
	let row = sqlx::query_as::<_, JobAlertOutboxEntry>(
		"\
SELECT
\toutbox_id,
\topening_id,
\tstatus,
\tattempts,
\tlast_error,
\tavailable_at,
\tcreated_at,
\tupdated_at
FROM job_alert_outbox
WHERE status IN ('PENDING','FAILED','CLAIMED') AND available_at <= $1
ORDER BY available_at ASC
LIMIT 1
FOR UPDATE SKIP LOCKED",
	)
	.bind(now)
	.fetch_optional(&mut *tx)
	.await?;
	let job = if let Some(mut job) = row {
		let lease_until = now + time::Duration::seconds(lease_seconds);

		sqlx::query(
			"\
UPDATE job_alert_outbox
SET status = 'CLAIMED', available_at = $1, updated_at = $2
WHERE outbox_id = $3",
		)
		.bind(lease_until)
		.bind(now)
		.bind(job.outbox_id)
		.execute(&mut *tx)
		.await?;

		job.status = "CLAIMED".to_string();
		job.available_at = lease_until;
		job.updated_at = now;

		Some(job)
	} else {
		None
	};

	tx.commit().await?;

	Ok(job)
}

pub async fn mark_job_alert_done(db: &Db, outbox_id: Uuid, now: OffsetDateTime) -> Result<()> {
	sqlx::query(
		"UPDATE job_alert_outbox SET status = 'DONE', updated_at = $1 WHERE outbox_id = $2",
	)
	.bind(now)
	.bind(outbox_id)
	.execute(&db.pool)
	.await?;

	Ok(())
}

pub async fn mark_job_alert_failed(
	db: &Db,
	outbox_id: Uuid,
	attempts: i32,
	error_text: &str,
	available_at: OffsetDateTime,
	now: OffsetDateTime,
) -> Result<()> {
	sqlx::query(
		"\
UPDATE job_alert_outbox
SET status = 'FAILED',
\tattempts = $1,
\tlast_error = $2,
\tavailable_at = $3,
\tupdated_at = $4
WHERE outbox_id = $5",
	)
	.bind(attempts)
	.bind(error_text)
	.bind(available_at)
	.bind(now)
	.bind(outbox_id)
	.execute(&db.pool)
	.await?;

	Ok(())
}

/// Parks the row for good. Used when the opening it points at can no longer be resolved.
pub async fn mark_job_alert_dead(
	db: &Db,
	outbox_id: Uuid,
	attempts: i32,
	error_text: &str,
	now: OffsetDateTime,
) -> Result<()> {
	sqlx::query(
		"\
UPDATE job_alert_outbox
SET status = 'DEAD',
\tattempts = $1,
\tlast_error = $2,
\tupdated_at = $3
WHERE outbox_id = $4",
	)
	.bind(attempts)
	.bind(error_text)
	.bind(now)
	.bind(outbox_id)
	.execute(&db.pool)
	.await?;

	Ok(())
}

pub async fn get_job_alert<'e, E>(
	executor: E,
	outbox_id: Uuid,
) -> Result<Option<JobAlertOutboxEntry>>
where
	E: PgExecutor<'e>,
{
	let row = sqlx::query_as::<_, JobAlertOutboxEntry>(
		"\
SELECT
\toutbox_id,
\topening_id,
\tstatus,
\tattempts,
\tlast_error,
\tavailable_at,
\tcreated_at,
\tupdated_at
FROM job_alert_outbox
WHERE outbox_id = $1",
	)
	.bind(outbox_id)
	.fetch_optional(executor)
	.await?;

	Ok(row)
}
