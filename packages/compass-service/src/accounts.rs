use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{CompassService, Result};
use compass_domain::contact::Channel;
use compass_storage::accounts;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreferencesRequest {
	pub contact_method: Channel,
	pub job_notifications: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreferencesResponse {
	pub email: String,
	pub profile_id: Uuid,
	pub contact_method: String,
	pub job_notifications: bool,
	#[serde(with = "time::serde::rfc3339")]
	pub updated_at: OffsetDateTime,
}

impl CompassService {
	pub async fn update_notification_preferences(
		&self,
		email: &str,
		req: PreferencesRequest,
	) -> Result<PreferencesResponse> {
		let now = OffsetDateTime::now_utc();
		let email = email.trim().to_lowercase();
		let account = accounts::update_preferences(
			&self.db.pool,
			&email,
			req.contact_method.as_str(),
			req.job_notifications,
			now,
		)
		.await?;

		tracing::info!(
			profile_id = %account.profile_id,
			channel = %account.contact_method,
			job_notifications = account.job_notifications,
			"Notification preferences updated."
		);

		Ok(PreferencesResponse {
			email: account.email,
			profile_id: account.profile_id,
			contact_method: account.contact_method,
			job_notifications: account.job_notifications,
			updated_at: account.updated_at,
		})
	}
}
