use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{CompassService, ConflictCode, Error, Result};
use compass_storage::{profiles, recommendations};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationResponse {
	pub profile_id: Uuid,
	pub recommendations_count: i32,
}

impl CompassService {
	/// Records that `recommender_id` vouches for `profile_id` and refreshes the cached count in the
	/// same transaction.
	pub async fn recommend(
		&self,
		profile_id: Uuid,
		recommender_id: Uuid,
	) -> Result<RecommendationResponse> {
		if profile_id == recommender_id {
			return Err(Error::invalid("A profile cannot recommend itself."));
		}

		let now = OffsetDateTime::now_utc();
		let mut tx = self.db.pool.begin().await?;

		// The target row lock serializes edge changes and count refreshes per profile.
		if profiles::lock_profile(&mut *tx, profile_id).await?.is_none() {
			return Err(Error::not_found(format!("Profile {profile_id} does not exist.")));
		}
		if profiles::get_profile(&mut *tx, recommender_id).await?.is_none() {
			return Err(Error::not_found(format!("Profile {recommender_id} does not exist.")));
		}
		let inserted = recommendations::insert_recommendation(
			&mut *tx,
			profile_id,
			recommender_id,
			now,
		)
		.await?;

		if !inserted {
			return Err(Error::conflict(
				ConflictCode::AlreadyRecommended,
				format!("Profile {recommender_id} already recommends {profile_id}."),
			));
		}

		let recommendations_count =
			recommendations::refresh_count(&mut *tx, profile_id, now).await?;

		tx.commit().await?;

		tracing::info!(
			profile_id = %profile_id,
			recommender_id = %recommender_id,
			recommendations_count,
			"Recommendation added."
		);

		Ok(RecommendationResponse { profile_id, recommendations_count })
	}

	pub async fn revoke_recommendation(
		&self,
		profile_id: Uuid,
		recommender_id: Uuid,
	) -> Result<RecommendationResponse> {
		let now = OffsetDateTime::now_utc();
		let mut tx = self.db.pool.begin().await?;

		if profiles::lock_profile(&mut *tx, profile_id).await?.is_none() {
			return Err(Error::not_found(format!("Profile {profile_id} does not exist.")));
		}
		if !recommendations::delete_recommendation(&mut *tx, profile_id, recommender_id).await? {
			return Err(Error::conflict(
				ConflictCode::NotRecommended,
				format!("Profile {recommender_id} does not recommend {profile_id}."),
			));
		}

		let recommendations_count =
			recommendations::refresh_count(&mut *tx, profile_id, now).await?;

		tx.commit().await?;

		tracing::info!(
			profile_id = %profile_id,
			recommender_id = %recommender_id,
			recommendations_count,
			"Recommendation revoked."
		);

		Ok(RecommendationResponse { profile_id, recommendations_count })
	}
}
