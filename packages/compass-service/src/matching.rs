//! Finds the profiles an opening should be announced to.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
	CompassService, Error, Result,
	search::{
		plan::{Clause, Column, OrderKey, Param, SearchPlan, Source},
		ranking::PROFILE_ACTIVITY_COLUMNS,
	},
};
use compass_domain::{
	job::{GeoField, Place, WorkMode, WorkRadius},
	text,
};
use compass_storage::{
	accounts,
	models::{Account, Job, JobOpening, Profile},
	profiles,
};

/// A matched profile with what channel selection needs from its account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Candidate {
	pub profile_id: Uuid,
	pub nick_name: Option<String>,
	pub full_name: Option<String>,
	pub gender: Option<String>,
	pub whatsapp: Option<String>,
	pub phone_numbers: Vec<String>,
	pub account_email: String,
	pub contact_method: String,
}

/// Everything matching and alert rendering read about an opening.
pub(crate) struct MatchContext {
	pub opening: JobOpening,
	pub job: Job,
	pub requester_account: Account,
	pub requester: Profile,
}

impl CompassService {
	/// Candidates for a committed opening, unordered and uncapped.
	pub async fn match_candidates(&self, opening_id: Uuid) -> Result<Vec<Candidate>> {
		let ctx = self.load_match_context(opening_id).await?;

		self.find_candidates(&ctx).await
	}

	pub(crate) async fn load_match_context(&self, opening_id: Uuid) -> Result<MatchContext> {
		let (opening, job) = self.load_opening(opening_id).await?;
		let Some(requester_account) =
			accounts::get_account(&self.db.pool, &job.requester_email).await?
		else {
			return Err(Error::not_found(format!(
				"Requester account {} does not exist.",
				job.requester_email
			)));
		};
		let Some(requester) =
			profiles::get_profile(&self.db.pool, requester_account.profile_id).await?
		else {
			return Err(Error::not_found(format!(
				"Requester profile {} does not exist.",
				requester_account.profile_id
			)));
		};

		Ok(MatchContext { opening, job, requester_account, requester })
	}

	pub(crate) async fn find_candidates(&self, ctx: &MatchContext) -> Result<Vec<Candidate>> {
		let plan = candidate_plan(&ctx.opening, &ctx.job, &ctx.requester)?;
		let mut query = plan.rows_query();
		let candidates = query.build_query_as::<Candidate>().fetch_all(&self.db.pool).await?;

		tracing::debug!(
			opening_id = %ctx.opening.opening_id,
			candidates = candidates.len(),
			"Candidates matched."
		);

		Ok(candidates)
	}
}

/// Compiles the matching rules for one opening into a plan over profiles joined with accounts.
pub fn candidate_plan(opening: &JobOpening, job: &Job, requester: &Profile) -> Result<SearchPlan> {
	let mode = job.work_mode.parse::<WorkMode>()?;
	let radius = job.work_radius.parse::<WorkRadius>()?;
	let place = Place {
		city: requester.city.as_deref(),
		state: requester.state.as_deref(),
		country: requester.country.as_deref(),
	};
	let mut plan = SearchPlan::new(Source::Candidates);

	plan.predicate.push(Clause::AnyOf(
		PROFILE_ACTIVITY_COLUMNS
			.iter()
			.map(|column| Clause::eq_text(*column, &opening.activity))
			.collect(),
	));

	let geography = geography_clause(radius, &place);

	if mode.admits_remote() {
		plan.predicate.push(Clause::AnyOf(vec![geography, Clause::is_true(Column::Remote)]));
	} else {
		plan.predicate.push(geography);
	}

	if opening.probono {
		plan.predicate.push(Clause::is_true(Column::Probono));
	}
	if let Some(gender) = text::non_blank(opening.gender.as_deref()) {
		plan.predicate.push(Clause::eq_text(Column::Gender, gender));
	}

	plan.predicate.push(Clause::is_true(Column::JobNotifications));
	plan.predicate.push(Clause::Not(Box::new(Clause::Eq {
		column: Column::ProfileId,
		value: Param::Uuid(requester.profile_id),
	})));
	let applied = Clause::AppliedTo { opening_id: opening.opening_id };

	plan.predicate.push(Clause::Not(Box::new(applied)));
	plan.order.push(OrderKey::Asc(Column::ProfileId));

	Ok(plan)
}

/// Equality on every field the radius shares. A field the requester lacks matches nobody.
fn geography_clause(radius: WorkRadius, place: &Place<'_>) -> Clause {
	let mut clauses = Vec::new();

	for field in radius.shared_fields() {
		let Some(value) = place.get(*field) else {
			return Clause::never();
		};

		clauses.push(Clause::eq_text(geo_column(*field), value));
	}

	Clause::AllOf(clauses)
}

fn geo_column(field: GeoField) -> Column {
	match field {
		GeoField::Country => Column::Country,
		GeoField::State => Column::State,
		GeoField::City => Column::City,
	}
}
