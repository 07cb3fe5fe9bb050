use std::time::Duration as StdDuration;

use color_eyre::Result;
use time::{Duration, OffsetDateTime};
use tokio::time as tokio_time;

use compass_service::{CompassService, FanOutReport};
use compass_storage::{models::JobAlertOutboxEntry, outbox};

const BASE_BACKOFF_MS: i64 = 500;
const MAX_BACKOFF_MS: i64 = 30_000;
const MAX_OUTBOX_ERROR_CHARS: usize = 1_024;
/// Batches with undelivered alerts are retried this many times before the row is closed.
const MAX_PARTIAL_RETRIES: i32 = 5;

/// What happened to one claimed outbox row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
	Done,
	Retry,
	Dead,
}

pub async fn run_worker(service: &CompassService) -> Result<()> {
	let poll_interval =
		to_std_duration(Duration::milliseconds(service.cfg.worker.poll_interval_ms as i64));

	tracing::info!("Job alert worker started.");

	loop {
		match process_job_alert_once(service).await {
			// Keep draining without sleeping while rows are waiting.
			Ok(Some(_)) => continue,
			Ok(None) => {},
			Err(err) => tracing::error!(error = %err, "Job alert outbox processing failed."),
		}

		tokio_time::sleep(poll_interval).await;
	}
}

/// Claims and handles at most one due outbox row. Returns `None` when nothing was due.
pub async fn process_job_alert_once(service: &CompassService) -> Result<Option<Disposition>> {
	let now = OffsetDateTime::now_utc();
	let lease_seconds = service.cfg.worker.claim_lease_seconds;
	let Some(job) = outbox::claim_next_job_alert(&service.db, now, lease_seconds).await? else {
		return Ok(None);
	};
	let result = service.on_job_opening_committed(job.opening_id).await;
	let disposition = disposition_for(&result, job.attempts);
	let now = OffsetDateTime::now_utc();
	let next_attempts = job.attempts.saturating_add(1);

	match (disposition, &result) {
		(Disposition::Done, Ok(report)) => {
			if report.failed > 0 {
				tracing::warn!(
					outbox_id = %job.outbox_id,
					opening_id = %job.opening_id,
					failed = report.failed,
					"Closing job alert with undelivered alerts after retries."
				);
			}

			outbox::mark_job_alert_done(&service.db, job.outbox_id, now).await?;
		},
		(Disposition::Retry, _) => {
			let error_text = sanitize_outbox_error(&failure_text(&result));
			let available_at = now + backoff_for_attempt(next_attempts);

			outbox::mark_job_alert_failed(
				&service.db,
				job.outbox_id,
				next_attempts,
				&error_text,
				available_at,
				now,
			)
			.await?;
			log_failure(&job, &error_text);
		},
		(Disposition::Dead, _) | (Disposition::Done, Err(_)) => {
			let error_text = sanitize_outbox_error(&failure_text(&result));

			outbox::mark_job_alert_dead(&service.db, job.outbox_id, next_attempts, &error_text, now)
				.await?;
			tracing::error!(
				outbox_id = %job.outbox_id,
				opening_id = %job.opening_id,
				error = %error_text,
				"Job alert parked as dead."
			);
		},
	}

	Ok(Some(disposition))
}

/// Rows whose opening cannot be resolved, or whose input is rejected, never recover and go dead.
/// Storage and provider failures retry. A batch with failed deliveries retries until
/// `MAX_PARTIAL_RETRIES`; deliveries already sent are skipped on the next run.
pub fn disposition_for(
	result: &compass_service::Result<FanOutReport>,
	attempts: i32,
) -> Disposition {
	match result {
		Ok(report) if report.failed > 0 && attempts.saturating_add(1) < MAX_PARTIAL_RETRIES =>
			Disposition::Retry,
		Ok(_) => Disposition::Done,
		Err(err) if err.is_retryable() => Disposition::Retry,
		Err(_) => Disposition::Dead,
	}
}

fn failure_text(result: &compass_service::Result<FanOutReport>) -> String {
	match result {
		Ok(report) =>
			format!("{} of {} alerts failed to deliver.", report.failed, report.candidates),
		Err(err) => err.to_string(),
	}
}

fn log_failure(job: &JobAlertOutboxEntry, error_text: &str) {
	tracing::error!(
		outbox_id = %job.outbox_id,
		opening_id = %job.opening_id,
		attempts = job.attempts.saturating_add(1),
		error = %error_text,
		"Job alert failed. Retrying with backoff."
	);
}

pub fn sanitize_outbox_error(text: &str) -> String {
	let mut parts = Vec::new();
	let mut redact_next = false;

	for raw in text.split_whitespace() {
		let mut word = raw.to_string();

		if redact_next {
			word = "[REDACTED]".to_string();
			redact_next = false;
		}
		if raw.eq_ignore_ascii_case("bearer") {
			redact_next = true;
		}

		let lowered = raw.to_ascii_lowercase();

		for key in ["api_key", "apikey", "password", "secret", "token"] {
			if lowered.contains(key) && (lowered.contains('=') || lowered.contains(':')) {
				let sep = if raw.contains('=') { '=' } else { ':' };
				let prefix = raw.split(sep).next().unwrap_or(raw);

				word = format!("{prefix}{sep}[REDACTED]");

				break;
			}
		}

		parts.push(word);
	}

	let mut out = parts.join(" ");

	if out.chars().count() > MAX_OUTBOX_ERROR_CHARS {
		out = out.chars().take(MAX_OUTBOX_ERROR_CHARS).collect();
		out.push_str("...");
	}

	out
}

pub fn backoff_for_attempt(attempt: i32) -> Duration {
	let attempts = attempt.max(1) as u32;
	let exp = attempts.saturating_sub(1).min(6);
	let base = BASE_BACKOFF_MS.saturating_mul(1 << exp);

	Duration::milliseconds(base.min(MAX_BACKOFF_MS))
}

fn to_std_duration(duration: Duration) -> StdDuration {
	let millis = duration.whole_milliseconds();

	if millis <= 0 {
		return StdDuration::from_millis(0);
	}

	StdDuration::from_millis(millis as u64)
}

#[cfg(test)]
mod tests {
	use super::*;
	use compass_service::Error;
	use uuid::Uuid;

	fn report(failed: usize) -> FanOutReport {
		FanOutReport {
			opening_id: Uuid::nil(),
			candidates: 3,
			sent: 3 - failed,
			failed,
			..Default::default()
		}
	}

	#[test]
	fn backoff_doubles_then_caps() {
		assert_eq!(backoff_for_attempt(0), Duration::milliseconds(500));
		assert_eq!(backoff_for_attempt(1), Duration::milliseconds(500));
		assert_eq!(backoff_for_attempt(2), Duration::milliseconds(1_000));
		assert_eq!(backoff_for_attempt(4), Duration::milliseconds(4_000));
		assert_eq!(backoff_for_attempt(7), Duration::milliseconds(30_000));
		assert_eq!(backoff_for_attempt(50), Duration::milliseconds(30_000));
	}

	#[test]
	fn sanitizer_redacts_credentials() {
		let raw = "401 from gateway: Bearer abc123 api_key=sk-live token:xyz";
		let out = sanitize_outbox_error(raw);

		assert_eq!(
			out,
			"401 from gateway: Bearer [REDACTED] api_key=[REDACTED] token:[REDACTED]"
		);
	}

	#[test]
	fn sanitizer_truncates_long_errors() {
		let out = sanitize_outbox_error(&"x".repeat(2_000));

		assert_eq!(out.chars().count(), MAX_OUTBOX_ERROR_CHARS + 3);
		assert!(out.ends_with("..."));
	}

	#[test]
	fn missing_rows_go_dead_and_storage_errors_retry() {
		let missing = Err(Error::NotFound { message: "opening".to_string() });
		let storage = Err(Error::Storage { message: "connection reset".to_string() });
		let invalid = Err(Error::InvalidRequest { message: "bad".to_string() });

		assert_eq!(disposition_for(&missing, 0), Disposition::Dead);
		assert_eq!(disposition_for(&invalid, 0), Disposition::Dead);
		assert_eq!(disposition_for(&storage, 9), Disposition::Retry);
	}

	#[test]
	fn partial_failures_retry_until_the_cap() {
		assert_eq!(disposition_for(&Ok(report(0)), 0), Disposition::Done);
		assert_eq!(disposition_for(&Ok(report(1)), 0), Disposition::Retry);
		assert_eq!(disposition_for(&Ok(report(1)), MAX_PARTIAL_RETRIES - 2), Disposition::Retry);
		assert_eq!(disposition_for(&Ok(report(1)), MAX_PARTIAL_RETRIES - 1), Disposition::Done);
	}
}
