use sqlx::PgExecutor;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{Result, models::JobAlertDelivery};

pub const STATUS_SENT: &str = "SENT";
pub const STATUS_FAILED: &str = "FAILED";

/// Profiles that already received the alert for `opening_id`.
pub async fn sent_profile_ids<'e, E>(executor: E, opening_id: Uuid) -> Result<Vec<Uuid>>
where
	E: PgExecutor<'e>,
{
	let ids: Vec<Uuid> = sqlx::query_scalar(
		"SELECT profile_id FROM job_alert_deliveries WHERE opening_id = $1 AND status = 'SENT'",
	)
	.bind(opening_id)
	.fetch_all(executor)
	.await?;

	Ok(ids)
}

/// Upserts the delivery attempt for `(opening_id, profile_id)`. A later attempt overwrites an
/// earlier failure.
pub async fn record_delivery<'e, E>(executor: E, delivery: &JobAlertDelivery) -> Result<()>
where
	E: PgExecutor<'e>,
{
	sqlx::query(
		"\
INSERT INTO job_alert_deliveries (
\topening_id,
\tprofile_id,
\tchannel,
\taddress,
\tstatus,
\tlast_error,
\tcreated_at,
\tupdated_at
)
VALUES ($1,$2,$3,$4,$5,$6,$7,$8)
ON CONFLICT (opening_id, profile_id) DO UPDATE
SET channel = EXCLUDED.channel,
\taddress = EXCLUDED.address,
\tstatus = EXCLUDED.status,
\tlast_error = EXCLUDED.last_error,
\tupdated_at = EXCLUDED.updated_at",
	)
	.bind(delivery.opening_id)
	.bind(delivery.profile_id)
	.bind(delivery.channel.as_str())
	.bind(delivery.address.as_str())
	.bind(delivery.status.as_str())
	.bind(delivery.last_error.as_deref())
	.bind(delivery.created_at)
	.bind(delivery.updated_at)
	.execute(executor)
	.await?;

	Ok(())
}

pub async fn list_deliveries<'e, E>(executor: E, opening_id: Uuid) -> Result<Vec<JobAlertDelivery>>
where
	E: PgExecutor<'e>,
{
	let rows = sqlx::query_as::<_, JobAlertDelivery>(
		"\
SELECT opening_id, profile_id, channel, address, status, last_error, created_at, updated_at
FROM job_alert_deliveries
WHERE opening_id = $1
ORDER BY created_at ASC, profile_id ASC",
	)
	.bind(opening_id)
	.fetch_all(executor)
	.await?;

	Ok(rows)
}

/// Convenience for building a row stamped at `now`.
pub fn delivery_row(
	opening_id: Uuid,
	profile_id: Uuid,
	channel: &str,
	address: &str,
	last_error: Option<String>,
	now: OffsetDateTime,
) -> JobAlertDelivery {
	let status = if last_error.is_some() { STATUS_FAILED } else { STATUS_SENT };

	JobAlertDelivery {
		opening_id,
		profile_id,
		channel: channel.to_string(),
		address: address.to_string(),
		status: status.to_string(),
		last_error,
		created_at: now,
		updated_at: now,
	}
}
