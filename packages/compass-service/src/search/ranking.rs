use serde::Serialize;
use sqlx::{FromRow, PgPool, postgres::PgRow};

use crate::{
	Error, Result,
	search::plan::{Column, OrderKey, Score, SearchPlan},
};

pub const PROFILE_ACTIVITY_COLUMNS: [Column; 3] =
	[Column::PrimaryActivity, Column::SecondaryActivity, Column::ThirdActivity];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Page {
	pub limit: i64,
	pub offset: i64,
}
impl Page {
	/// Applies defaults and bounds: `limit` in `1..=max_limit`, `offset` non-negative.
	pub fn resolve(
		limit: Option<i64>,
		offset: Option<i64>,
		cfg: &compass_config::Search,
	) -> Result<Self> {
		let max_limit = i64::from(cfg.max_limit);
		let limit = limit.unwrap_or(i64::from(cfg.default_limit));
		let offset = offset.unwrap_or(0);

		if !(1..=max_limit).contains(&limit) {
			return Err(Error::invalid(format!("limit must be between 1 and {max_limit}.")));
		}
		if offset < 0 {
			return Err(Error::invalid("offset must be zero or greater."));
		}

		Ok(Self { limit, offset })
	}
}

/// Profile order: query score, subscriber, recommendations, activity weight, name, id.
pub fn profile_order(query: Option<&str>, activity: Option<&str>) -> Vec<OrderKey> {
	let mut order = Vec::with_capacity(6);

	if let Some(query) = query {
		order.push(OrderKey::Score { score: Score::Profile, query: query.to_string() });
	}

	order.push(OrderKey::Desc(Column::Subscriber));
	order.push(OrderKey::Desc(Column::RecommendationsCount));

	if let Some(prefix) = activity {
		order.push(OrderKey::PrefixWeight {
			columns: PROFILE_ACTIVITY_COLUMNS.to_vec(),
			prefix: prefix.to_string(),
		});
	}

	order.push(OrderKey::Desc(Column::FullName));
	order.push(OrderKey::Asc(Column::ProfileId));

	order
}

/// Opening order: query score, requester subscriber and recommendations, activity weight, newest
/// first, id.
pub fn job_order(query: Option<&str>, activity: Option<&str>) -> Vec<OrderKey> {
	let mut order = Vec::with_capacity(6);

	if let Some(query) = query {
		order.push(OrderKey::Score { score: Score::Opening, query: query.to_string() });
	}

	order.push(OrderKey::Desc(Column::RequesterSubscriber));
	order.push(OrderKey::Desc(Column::RequesterRecommendations));

	if let Some(prefix) = activity {
		order.push(OrderKey::PrefixWeight {
			columns: vec![Column::OpeningActivity],
			prefix: prefix.to_string(),
		});
	}

	order.push(OrderKey::Desc(Column::OpeningCreatedAt));
	order.push(OrderKey::Asc(Column::OpeningId));

	order
}

/// Runs the count and the page query built from the same plan.
pub(crate) async fn fetch_page<T>(
	pool: &PgPool,
	plan: &SearchPlan,
	page: Page,
) -> Result<(i64, Vec<T>)>
where
	T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
{
	let mut count = plan.count_query();
	let total: i64 = count.build_query_scalar().fetch_one(pool).await?;

	if total == 0 || page.offset >= total {
		return Ok((total, Vec::new()));
	}

	let mut query = plan.page_query(page.limit, page.offset);
	let items = query.build_query_as::<T>().fetch_all(pool).await?;

	Ok((total, items))
}
