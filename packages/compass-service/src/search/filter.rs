use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
	Error, Result,
	search::{
		plan::{Clause, Column, Param, Score, SearchPlan, Source},
		ranking::{self, PROFILE_ACTIVITY_COLUMNS},
	},
};
use compass_domain::{
	activity,
	job::Employment,
	profile::{Gender, Proficiency, ProfileType, is_language_code},
	text,
};

pub const MAX_FILTER_STRING_BYTES: usize = 256;

/// Sparse search criteria. Absent and blank values impose no constraint; `remote` and `probono`
/// only constrain when `true`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchFilter {
	pub query: Option<String>,
	pub name: Option<String>,
	pub activity: Option<String>,
	pub location: Option<String>,
	pub gender: Option<String>,
	pub remote: Option<bool>,
	#[serde(rename = "type")]
	pub profile_type: Option<String>,
	pub language: Option<String>,
	pub university: Option<String>,
	pub probono: Option<bool>,
	pub associations: Option<String>,
	pub certifications: Option<String>,
	pub email: Option<String>,
	pub country: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct JobSearchFilter {
	#[serde(flatten)]
	pub common: SearchFilter,
	pub employment: Option<String>,
	pub requester_id: Option<String>,
}

/// Validated, trimmed filter values.
#[derive(Debug)]
struct Criteria {
	query: Option<String>,
	name: Option<String>,
	activity: Option<String>,
	location: Option<String>,
	gender: Option<Gender>,
	remote: bool,
	profile_type: Option<ProfileType>,
	language: Option<String>,
	university: Option<String>,
	probono: bool,
	associations: Option<String>,
	certifications: Option<String>,
	email: Option<String>,
	country: Option<String>,
}
impl Criteria {
	fn parse(filter: &SearchFilter) -> Result<Self> {
		let query = text_field("query", filter.query.as_deref())?
			.map(|query| text::normalize(&query))
			.filter(|query| !query.is_empty());
		let activity = text_field("activity", filter.activity.as_deref())?;

		if let Some(prefix) = activity.as_deref()
			&& !activity::is_activity_prefix(prefix)
		{
			return Err(Error::invalid(format!(
				"activity must be a code prefix such as 203 or 203-04, got '{prefix}'."
			)));
		}

		let language = text_field("language", filter.language.as_deref())?
			.map(|language| parse_language(&language))
			.transpose()?;
		let gender = text_field("gender", filter.gender.as_deref())?
			.map(|gender| gender.parse::<Gender>())
			.transpose()?;
		let profile_type = text_field("type", filter.profile_type.as_deref())?
			.map(|kind| kind.parse::<ProfileType>())
			.transpose()?;

		Ok(Self {
			query,
			name: text_field("name", filter.name.as_deref())?,
			activity,
			location: text_field("location", filter.location.as_deref())?,
			gender,
			remote: filter.remote.unwrap_or(false),
			profile_type,
			language,
			university: text_field("university", filter.university.as_deref())?,
			probono: filter.probono.unwrap_or(false),
			associations: text_field("associations", filter.associations.as_deref())?,
			certifications: text_field("certifications", filter.certifications.as_deref())?,
			email: text_field("email", filter.email.as_deref())?,
			country: text_field("country", filter.country.as_deref())?,
		})
	}
}

/// Compiles a profile filter. Profiles without the searchable flag only show up when the email
/// filter names one of their addresses exactly.
pub fn profile_plan(filter: &SearchFilter, cfg: &compass_config::Search) -> Result<SearchPlan> {
	let criteria = Criteria::parse(filter)?;
	let fuzzy = |columns: &[Column], value: &str| Clause::Fuzzy {
		columns: columns.to_vec(),
		value: value.to_string(),
		threshold: cfg.field_similarity_threshold,
	};
	let mut plan = SearchPlan::new(Source::Profiles);

	match criteria.email.as_deref() {
		Some(email) => plan.predicate.push(Clause::AnyOf(vec![
			Clause::is_true(Column::Searchable),
			Clause::EmailIs { email: email.to_string() },
		])),
		None => plan.predicate.push(Clause::is_true(Column::Searchable)),
	}
	if let Some(query) = criteria.query.as_deref() {
		plan.predicate.push(Clause::Similar {
			score: Score::Profile,
			query: query.to_string(),
			threshold: cfg.profile_query_threshold,
		});
	}
	if let Some(name) = criteria.name.as_deref() {
		plan.predicate.push(fuzzy(&[Column::FullName, Column::NickName], name));
	}
	if let Some(prefix) = criteria.activity.as_deref() {
		plan.predicate.push(Clause::Prefix {
			columns: PROFILE_ACTIVITY_COLUMNS.to_vec(),
			prefix: prefix.to_string(),
		});
	}
	if let Some(location) = criteria.location.as_deref() {
		plan.predicate.push(fuzzy(&[Column::Location], location));
	}
	if let Some(gender) = criteria.gender {
		plan.predicate.push(Clause::eq_text(Column::Gender, gender.as_str()));
	}
	if criteria.remote {
		plan.predicate.push(Clause::is_true(Column::Remote));
	}
	if let Some(kind) = criteria.profile_type {
		plan.predicate.push(Clause::eq_text(Column::ProfileType, kind.as_str()));
	}
	if let Some(language) = criteria.language {
		plan.predicate.push(Clause::Contains { column: Column::Languages, value: language });
	}
	if let Some(university) = criteria.university.as_deref() {
		plan.predicate.push(fuzzy(&[Column::University], university));
	}
	if criteria.probono {
		plan.predicate.push(Clause::is_true(Column::Probono));
	}
	if let Some(associations) = criteria.associations.as_deref() {
		plan.predicate.push(fuzzy(&[Column::Associations], associations));
	}
	if let Some(certifications) = criteria.certifications.as_deref() {
		plan.predicate.push(fuzzy(&[Column::Certifications], certifications));
	}
	if let Some(email) = criteria.email.as_deref() {
		plan.predicate.push(fuzzy(&[Column::PrimaryEmail, Column::SecondaryEmails], email));
	}
	if let Some(country) = criteria.country.as_deref() {
		plan.predicate.push(Clause::eq_text(Column::Country, country));
	}

	plan.order = ranking::profile_order(criteria.query.as_deref(), criteria.activity.as_deref());

	Ok(plan)
}

/// Compiles a job filter over openings. Person-level fields apply to the requester's profile,
/// requirement fields to the opening.
pub fn job_plan(filter: &JobSearchFilter, cfg: &compass_config::Search) -> Result<SearchPlan> {
	let criteria = Criteria::parse(&filter.common)?;
	let employment = text_field("employment", filter.employment.as_deref())?
		.map(|employment| employment.parse::<Employment>())
		.transpose()?;
	let requester_id = text_field("requester_id", filter.requester_id.as_deref())?
		.map(|raw| {
			Uuid::parse_str(&raw)
				.map_err(|_| Error::invalid(format!("requester_id must be a UUID, got '{raw}'.")))
		})
		.transpose()?;
	let fuzzy = |columns: &[Column], value: &str| Clause::Fuzzy {
		columns: columns.to_vec(),
		value: value.to_string(),
		threshold: cfg.field_similarity_threshold,
	};
	let mut plan = SearchPlan::new(Source::Openings);

	if let Some(query) = criteria.query.as_deref() {
		plan.predicate.push(Clause::Similar {
			score: Score::Opening,
			query: query.to_string(),
			threshold: cfg.job_query_threshold,
		});
	}
	if let Some(name) = criteria.name.as_deref() {
		plan.predicate.push(fuzzy(&[Column::RequesterFullName, Column::RequesterNickName], name));
	}
	if let Some(prefix) = criteria.activity.as_deref() {
		plan.predicate.push(Clause::Prefix {
			columns: vec![Column::OpeningActivity],
			prefix: prefix.to_string(),
		});
	}
	if let Some(location) = criteria.location.as_deref() {
		plan.predicate.push(fuzzy(&[Column::RequesterLocation], location));
	}
	if let Some(gender) = criteria.gender {
		plan.predicate.push(Clause::eq_text(Column::OpeningGender, gender.as_str()));
	}
	if criteria.remote {
		plan.predicate.push(Clause::Not(Box::new(Clause::eq_text(Column::WorkMode, "in-person"))));
	}
	if let Some(kind) = criteria.profile_type {
		plan.predicate.push(Clause::eq_text(Column::RequesterType, kind.as_str()));
	}
	if let Some(language) = criteria.language {
		plan.predicate.push(Clause::Contains { column: Column::OpeningLanguages, value: language });
	}
	if let Some(university) = criteria.university.as_deref() {
		plan.predicate.push(fuzzy(&[Column::OpeningSchool], university));
	}
	if criteria.probono {
		plan.predicate.push(Clause::is_true(Column::OpeningProbono));
	}
	if let Some(associations) = criteria.associations.as_deref() {
		plan.predicate.push(fuzzy(&[Column::RequesterAssociations], associations));
	}
	if let Some(certifications) = criteria.certifications.as_deref() {
		plan.predicate.push(fuzzy(&[Column::RequesterCertifications], certifications));
	}
	if let Some(email) = criteria.email.as_deref() {
		plan.predicate.push(fuzzy(&[Column::RequesterEmail], email));
	}
	if let Some(country) = criteria.country.as_deref() {
		plan.predicate.push(Clause::eq_text(Column::RequesterCountry, country));
	}
	if let Some(employment) = employment {
		plan.predicate.push(Clause::eq_text(Column::Employment, employment.as_str()));
	}
	if let Some(requester_id) = requester_id {
		plan.predicate
			.push(Clause::Eq { column: Column::RequesterId, value: Param::Uuid(requester_id) });
	}

	plan.order = ranking::job_order(criteria.query.as_deref(), criteria.activity.as_deref());

	Ok(plan)
}

fn text_field(name: &str, raw: Option<&str>) -> Result<Option<String>> {
	let Some(value) = text::non_blank(raw) else {
		return Ok(None);
	};

	if value.len() > MAX_FILTER_STRING_BYTES {
		return Err(Error::invalid(format!(
			"{name} must be at most {MAX_FILTER_STRING_BYTES} bytes."
		)));
	}

	Ok(Some(value.to_string()))
}

/// Accepts `lang` or `lang:proficiency` and returns the lowercase substring to look for.
fn parse_language(raw: &str) -> Result<String> {
	let lowered = raw.to_ascii_lowercase();
	let (lang, proficiency) = match lowered.split_once(':') {
		Some((lang, proficiency)) => (lang.trim(), Some(proficiency.trim())),
		None => (lowered.trim(), None),
	};

	if !is_language_code(lang) {
		return Err(Error::invalid(format!(
			"language must start with a two-letter code, got '{raw}'."
		)));
	}

	match proficiency.filter(|value| !value.is_empty()) {
		Some(proficiency) => {
			let proficiency = proficiency.parse::<Proficiency>()?;

			Ok(format!("{lang}:{}", proficiency.as_str()))
		},
		None => Ok(format!("{lang}:")),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::search::plan::OrderKey;

	fn cfg() -> compass_config::Search {
		compass_config::Search::default()
	}

	#[test]
	fn empty_filter_only_applies_searchable_gate() {
		let plan = profile_plan(&SearchFilter::default(), &cfg()).expect("Empty filter is valid.");

		assert_eq!(plan.predicate, vec![Clause::is_true(Column::Searchable)]);
	}

	#[test]
	fn blank_values_are_wildcards() {
		let filter = SearchFilter {
			name: Some("   ".to_string()),
			remote: Some(false),
			probono: Some(false),
			..Default::default()
		};
		let plan = profile_plan(&filter, &cfg()).expect("Blank filter is valid.");

		assert_eq!(plan.predicate.len(), 1);
	}

	#[test]
	fn only_exact_email_lifts_searchable_gate() {
		let filter = SearchFilter { email: Some("ana@".to_string()), ..Default::default() };
		let plan = profile_plan(&filter, &cfg()).expect("Email filter is valid.");

		assert_eq!(
			plan.predicate[0],
			Clause::AnyOf(vec![
				Clause::is_true(Column::Searchable),
				Clause::EmailIs { email: "ana@".to_string() },
			])
		);
		assert!(matches!(&plan.predicate[1], Clause::Fuzzy { columns, .. } if columns.len() == 2));
	}

	#[test]
	fn activity_and_location_compile_to_prefix_and_fuzzy() {
		let filter = SearchFilter {
			activity: Some("203".to_string()),
			location: Some("Guadalajara".to_string()),
			..Default::default()
		};
		let plan = profile_plan(&filter, &cfg()).expect("Filter is valid.");

		assert_eq!(
			plan.predicate,
			vec![
				Clause::is_true(Column::Searchable),
				Clause::Prefix {
					columns: PROFILE_ACTIVITY_COLUMNS.to_vec(),
					prefix: "203".to_string(),
				},
				Clause::Fuzzy {
					columns: vec![Column::Location],
					value: "Guadalajara".to_string(),
					threshold: 0.5,
				},
			]
		);
		assert!(plan.order.iter().any(|key| matches!(key, OrderKey::PrefixWeight { .. })));
	}

	#[test]
	fn query_is_normalized_and_scored() {
		let filter =
			SearchFilter { query: Some("  Fotógrafa ".to_string()), ..Default::default() };
		let plan = profile_plan(&filter, &cfg()).expect("Filter is valid.");

		assert_eq!(
			plan.predicate[1],
			Clause::Similar {
				score: Score::Profile,
				query: "fotografa".to_string(),
				threshold: 0.3
			}
		);
		assert!(matches!(plan.order[0], OrderKey::Score { .. }));
	}

	#[test]
	fn rejects_malformed_values_before_querying() {
		let bad = [
			SearchFilter { activity: Some("2a3".to_string()), ..Default::default() },
			SearchFilter { activity: Some("203-041".to_string()), ..Default::default() },
			SearchFilter { language: Some("spa".to_string()), ..Default::default() },
			SearchFilter { language: Some("es:fluent".to_string()), ..Default::default() },
			SearchFilter { gender: Some("unknown".to_string()), ..Default::default() },
			SearchFilter {
				name: Some("x".repeat(MAX_FILTER_STRING_BYTES + 1)),
				..Default::default()
			},
		];

		for filter in bad {
			assert!(
				matches!(profile_plan(&filter, &cfg()), Err(Error::InvalidRequest { .. })),
				"Expected {filter:?} to be rejected."
			);
		}
	}

	#[test]
	fn language_filter_matches_pair_prefix() {
		assert_eq!(parse_language("ES").expect("Valid code."), "es:");
		assert_eq!(parse_language("en:Native").expect("Valid pair."), "en:native");
	}

	#[test]
	fn job_filter_targets_openings_and_requester() {
		let filter = JobSearchFilter {
			common: SearchFilter {
				activity: Some("090".to_string()),
				remote: Some(true),
				..Default::default()
			},
			employment: Some("freelance".to_string()),
			requester_id: Some(Uuid::nil().to_string()),
		};
		let plan = job_plan(&filter, &cfg()).expect("Filter is valid.");

		assert_eq!(plan.source, Source::Openings);
		assert_eq!(plan.predicate.len(), 4);
		assert!(plan.predicate.contains(&Clause::eq_text(Column::Employment, "freelance")));
		assert!(plan.predicate.contains(&Clause::Eq {
			column: Column::RequesterId,
			value: Param::Uuid(Uuid::nil())
		}));
		assert_eq!(plan.order.last(), Some(&OrderKey::Asc(Column::OpeningId)));

		let bad = JobSearchFilter { requester_id: Some("nope".to_string()), ..Default::default() };

		assert!(job_plan(&bad, &cfg()).is_err());
	}
}
