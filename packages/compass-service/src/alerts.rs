use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{CompassService, Error, Notification, Result, matching::Candidate};
use compass_domain::{
	contact::{self, AlertParts, Channel, Delivery, Recipient},
	job::{Place, WorkRadius},
	profile::Gender,
};
use compass_storage::deliveries;

/// Outcome of one alert batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FanOutReport {
	pub opening_id: Uuid,
	pub candidates: usize,
	pub sent: usize,
	pub failed: usize,
	/// Candidates that already received this alert, or every candidate when alerts are disabled.
	pub skipped: usize,
	/// Deliveries that went to email because the preferred messaging channel had no address.
	pub fell_back: usize,
}

impl CompassService {
	/// Announces a committed opening to every matched candidate. Missing opening, job, requester
	/// or taxonomy entry fails the batch; a failed delivery is logged and recorded and the batch
	/// moves on.
	pub async fn on_job_opening_committed(&self, opening_id: Uuid) -> Result<FanOutReport> {
		let ctx = self.load_match_context(opening_id).await?;
		let gender = ctx.opening.gender.as_deref().and_then(|gender| gender.parse::<Gender>().ok());
		let Some(activity_title) = self.taxonomy.resolve(&ctx.opening.activity, gender) else {
			return Err(Error::not_found(format!(
				"Activity {} is not in the taxonomy.",
				ctx.opening.activity
			)));
		};
		let radius = ctx.job.work_radius.parse::<WorkRadius>()?;
		let candidates = self.find_candidates(&ctx).await?;
		let mut report =
			FanOutReport { opening_id, candidates: candidates.len(), ..Default::default() };

		if !self.cfg.notifications.enabled {
			report.skipped = candidates.len();

			tracing::info!(
				opening_id = %opening_id,
				candidates = report.candidates,
				"Notifications are disabled. Skipping job alert fan-out."
			);

			return Ok(report);
		}

		let already_sent: HashSet<Uuid> =
			deliveries::sent_profile_ids(&self.db.pool, opening_id).await?.into_iter().collect();
		let requester_name = contact::display_name(
			ctx.requester.nick_name.as_deref(),
			ctx.requester.full_name.as_deref(),
			&ctx.requester_account.email,
		);
		let requester_place = Place {
			city: ctx.requester.city.as_deref(),
			state: ctx.requester.state.as_deref(),
			country: ctx.requester.country.as_deref(),
		};
		let opening_ref = opening_id.to_string();

		for candidate in &candidates {
			if already_sent.contains(&candidate.profile_id) {
				report.skipped += 1;

				continue;
			}

			let delivery = select_delivery(candidate);
			let recipient_name = contact::display_name(
				candidate.nick_name.as_deref(),
				candidate.full_name.as_deref(),
				&candidate.account_email,
			);
			let variables = contact::alert_variables(&AlertParts {
				requester_name,
				requester_place,
				radius,
				activity_title: &activity_title,
				headcount: ctx.opening.headcount,
				opening_id: &opening_ref,
				recipient_name,
			});

			if delivery.fell_back {
				report.fell_back += 1;

				tracing::info!(
					opening_id = %opening_id,
					profile_id = %candidate.profile_id,
					"No messaging address on file. Falling back to email."
				);
			}

			let cfg = self.channel_config(delivery.channel);
			let notification = Notification {
				channel: delivery.channel,
				address: delivery.address,
				template: cfg.template.clone(),
				subject: match delivery.channel {
					Channel::Email => cfg.subject.clone(),
					Channel::Whatsapp => None,
				},
				variables,
			};
			let last_error = match self.transport.send(cfg, &notification).await {
				Ok(()) => {
					report.sent += 1;

					None
				},
				Err(err) => {
					report.failed += 1;

					tracing::warn!(
						opening_id = %opening_id,
						profile_id = %candidate.profile_id,
						channel = notification.channel.as_str(),
						error = %err,
						"Job alert delivery failed."
					);

					Some(err.to_string())
				},
			};
			let row = deliveries::delivery_row(
				opening_id,
				candidate.profile_id,
				notification.channel.as_str(),
				&notification.address,
				last_error,
				OffsetDateTime::now_utc(),
			);

			if let Err(err) = deliveries::record_delivery(&self.db.pool, &row).await {
				tracing::error!(
					opening_id = %opening_id,
					profile_id = %candidate.profile_id,
					error = %err,
					"Failed to record job alert delivery."
				);
			}
		}

		tracing::info!(
			opening_id = %opening_id,
			candidates = report.candidates,
			sent = report.sent,
			failed = report.failed,
			skipped = report.skipped,
			fell_back = report.fell_back,
			"Job alert fan-out finished."
		);

		Ok(report)
	}
}

fn select_delivery(candidate: &Candidate) -> Delivery {
	// Unknown stored methods behave like the default channel.
	let preferred = candidate.contact_method.parse::<Channel>().unwrap_or_default();

	contact::select_channel(&Recipient {
		account_email: &candidate.account_email,
		preferred,
		whatsapp: candidate.whatsapp.as_deref(),
		phone_numbers: &candidate.phone_numbers,
	})
}
