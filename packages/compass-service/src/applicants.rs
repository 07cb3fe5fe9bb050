use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
	CompassService, ConflictCode, Error, ProfileView, Result, jobs::ensure_owner,
	search::ranking::Page,
};
use compass_storage::{accounts, applicants, profiles};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplyRequest {
	pub profile_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplyResponse {
	pub opening_id: Uuid,
	pub profile_id: Uuid,
	pub applicants: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicantsRequest {
	pub requester_email: String,
	#[serde(default)]
	pub limit: Option<i64>,
	#[serde(default)]
	pub offset: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicantsResponse {
	pub opening_id: Uuid,
	pub total: i64,
	pub limit: i64,
	pub offset: i64,
	pub items: Vec<ProfileView>,
}

impl CompassService {
	/// Applies `profile_id` to an opening. The store keeps one application per pair.
	pub async fn apply_to_opening(
		&self,
		opening_id: Uuid,
		req: ApplyRequest,
	) -> Result<ApplyResponse> {
		let now = OffsetDateTime::now_utc();
		let (_, job) = self.load_opening(opening_id).await?;

		if profiles::get_profile(&self.db.pool, req.profile_id).await?.is_none() {
			return Err(Error::not_found(format!("Profile {} does not exist.", req.profile_id)));
		}

		let requester = accounts::get_account(&self.db.pool, &job.requester_email).await?;

		if requester.is_some_and(|account| account.profile_id == req.profile_id) {
			return Err(Error::invalid("Requesters cannot apply to their own openings."));
		}
		if !applicants::insert_applicant(&self.db.pool, opening_id, req.profile_id, now).await? {
			return Err(Error::conflict(
				ConflictCode::AlreadyApplied,
				format!("Profile {} already applied to opening {opening_id}.", req.profile_id),
			));
		}

		let count = applicants::count_applicants(&self.db.pool, opening_id).await?;

		tracing::info!(
			opening_id = %opening_id,
			profile_id = %req.profile_id,
			applicants = count,
			"Application recorded."
		);

		Ok(ApplyResponse { opening_id, profile_id: req.profile_id, applicants: count })
	}

	/// Applicants in application order. Only the job's requester may list them.
	pub async fn list_applicants(
		&self,
		opening_id: Uuid,
		req: ApplicantsRequest,
	) -> Result<ApplicantsResponse> {
		let page = Page::resolve(req.limit, req.offset, &self.cfg.search)?;
		let (_, job) = self.load_opening(opening_id).await?;

		ensure_owner(&job, &req.requester_email)?;

		let total = applicants::count_applicants(&self.db.pool, opening_id).await?;
		let items = if total == 0 || page.offset >= total {
			Vec::new()
		} else {
			applicants::list_applicants(&self.db.pool, opening_id, page.limit, page.offset).await?
		};

		Ok(ApplicantsResponse {
			opening_id,
			total,
			limit: page.limit,
			offset: page.offset,
			items: items.into_iter().map(ProfileView::from).collect(),
		})
	}
}
