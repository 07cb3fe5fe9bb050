pub mod filter;
pub mod plan;
pub mod ranking;

pub use filter::{JobSearchFilter, SearchFilter};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
	CompassService, ProfileView, Result,
	jobs::{JobOpeningHit, OpeningView},
	search::ranking::Page,
};
use compass_storage::models::Profile;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileSearchRequest {
	#[serde(default)]
	pub filter: SearchFilter,
	#[serde(default)]
	pub limit: Option<i64>,
	#[serde(default)]
	pub offset: Option<i64>,
	/// Attach the compiled plan to the response.
	#[serde(default)]
	pub explain: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileSearchResponse {
	pub total: i64,
	pub limit: i64,
	pub offset: i64,
	pub items: Vec<ProfileView>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub plan: Option<Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobSearchRequest {
	#[serde(default)]
	pub filter: JobSearchFilter,
	#[serde(default)]
	pub limit: Option<i64>,
	#[serde(default)]
	pub offset: Option<i64>,
	#[serde(default)]
	pub explain: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobSearchResponse {
	pub total: i64,
	pub limit: i64,
	pub offset: i64,
	pub items: Vec<OpeningView>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub plan: Option<Value>,
}

impl CompassService {
	pub async fn search_profiles(
		&self,
		req: ProfileSearchRequest,
	) -> Result<ProfileSearchResponse> {
		let page = Page::resolve(req.limit, req.offset, &self.cfg.search)?;
		let plan = filter::profile_plan(&req.filter, &self.cfg.search)?;
		let (total, rows) = ranking::fetch_page::<Profile>(&self.db.pool, &plan, page).await?;

		tracing::debug!(
			total,
			limit = page.limit,
			offset = page.offset,
			"Profile search finished."
		);

		Ok(ProfileSearchResponse {
			total,
			limit: page.limit,
			offset: page.offset,
			items: rows.into_iter().map(ProfileView::from).collect(),
			plan: req.explain.then(|| plan.to_value()),
		})
	}

	pub async fn search_jobs(&self, req: JobSearchRequest) -> Result<JobSearchResponse> {
		let page = Page::resolve(req.limit, req.offset, &self.cfg.search)?;
		let plan = filter::job_plan(&req.filter, &self.cfg.search)?;
		let (total, rows) = ranking::fetch_page::<JobOpeningHit>(&self.db.pool, &plan, page).await?;

		tracing::debug!(total, limit = page.limit, offset = page.offset, "Job search finished.");

		Ok(JobSearchResponse {
			total,
			limit: page.limit,
			offset: page.offset,
			items: rows
				.into_iter()
				.map(|hit| OpeningView::from_hit(hit, self.taxonomy.as_ref()))
				.collect(),
			plan: req.explain.then(|| plan.to_value()),
		})
	}
}
