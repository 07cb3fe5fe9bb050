//! Inspectable predicate and ordering IR shared by search and candidate matching.
//!
//! A [`SearchPlan`] renders to SQL through `sqlx::QueryBuilder`, so every user value travels as a
//! bound parameter and the same predicate backs both the count and the page query.

use serde_json::{Value, json};
use sqlx::{Postgres, QueryBuilder};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
	ProfileId,
	PrimaryEmail,
	SecondaryEmails,
	ProfileType,
	FullName,
	NickName,
	Gender,
	PrimaryActivity,
	SecondaryActivity,
	ThirdActivity,
	Languages,
	City,
	State,
	Country,
	Location,
	University,
	Associations,
	Certifications,
	Remote,
	Probono,
	Subscriber,
	RecommendationsCount,
	Searchable,
	JobNotifications,
	OpeningId,
	OpeningActivity,
	OpeningGender,
	OpeningProbono,
	OpeningLanguages,
	OpeningSchool,
	OpeningCreatedAt,
	WorkMode,
	Employment,
	RequesterId,
	RequesterEmail,
	RequesterFullName,
	RequesterNickName,
	RequesterType,
	RequesterCountry,
	RequesterLocation,
	RequesterAssociations,
	RequesterCertifications,
	RequesterSubscriber,
	RequesterRecommendations,
}
impl Column {
	pub fn sql(self) -> &'static str {
		match self {
			Self::ProfileId => "p.profile_id",
			Self::PrimaryEmail => "p.primary_email",
			Self::SecondaryEmails => "array_to_string(p.secondary_emails, ' ')",
			Self::ProfileType => "p.profile_type",
			Self::FullName => "p.full_name",
			Self::NickName => "p.nick_name",
			Self::Gender => "p.gender",
			Self::PrimaryActivity => "p.primary_activity",
			Self::SecondaryActivity => "p.secondary_activity",
			Self::ThirdActivity => "p.third_activity",
			Self::Languages => "array_to_string(p.languages, ',')",
			Self::City => "p.city",
			Self::State => "p.state",
			Self::Country => "p.country",
			Self::Location => "p.location",
			Self::University => "p.university",
			Self::Associations => "p.associations",
			Self::Certifications => "p.certifications",
			Self::Remote => "p.remote",
			Self::Probono => "p.probono",
			Self::Subscriber => "p.subscriber",
			Self::RecommendationsCount => "p.recommendations_count",
			Self::Searchable => "p.searchable",
			Self::JobNotifications => "a.job_notifications",
			Self::OpeningId => "o.opening_id",
			Self::OpeningActivity => "o.activity",
			Self::OpeningGender => "o.gender",
			Self::OpeningProbono => "o.probono",
			Self::OpeningLanguages => "array_to_string(o.languages, ',')",
			Self::OpeningSchool => "o.school",
			Self::OpeningCreatedAt => "o.created_at",
			Self::WorkMode => "j.work_mode",
			Self::Employment => "j.employment",
			Self::RequesterId => "rp.profile_id",
			Self::RequesterEmail => "j.requester_email",
			Self::RequesterFullName => "rp.full_name",
			Self::RequesterNickName => "rp.nick_name",
			Self::RequesterType => "rp.profile_type",
			Self::RequesterCountry => "rp.country",
			Self::RequesterLocation => "rp.location",
			Self::RequesterAssociations => "rp.associations",
			Self::RequesterCertifications => "rp.certifications",
			Self::RequesterSubscriber => "rp.subscriber",
			Self::RequesterRecommendations => "rp.recommendations_count",
		}
	}
}

#[derive(Debug, Clone, PartialEq)]
pub enum Param {
	Text(String),
	Bool(bool),
	Uuid(Uuid),
}
impl Param {
	fn push(&self, builder: &mut QueryBuilder<'static, Postgres>) {
		match self {
			Self::Text(value) => builder.push_bind(value.clone()),
			Self::Bool(value) => builder.push_bind(*value),
			Self::Uuid(value) => builder.push_bind(*value),
		};
	}

	fn to_value(&self) -> Value {
		match self {
			Self::Text(value) => Value::String(value.clone()),
			Self::Bool(value) => Value::Bool(*value),
			Self::Uuid(value) => Value::String(value.to_string()),
		}
	}
}

/// Free-text relevance expressions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Score {
	/// `strict_word_similarity` against the profile search string.
	Profile,
	/// Opening keywords weighted 4 plus job free text weighted 2.
	Opening,
}
impl Score {
	fn push(self, builder: &mut QueryBuilder<'static, Postgres>, query: &str) {
		match self {
			Self::Profile => {
				builder.push("strict_word_similarity(");
				builder.push_bind(query.to_string());
				builder.push(", p.search_string)");
			},
			Self::Opening => {
				builder.push("(strict_word_similarity(");
				builder.push_bind(query.to_string());
				builder.push(", o.search_string) * 4 + strict_word_similarity(");
				builder.push_bind(query.to_string());
				builder.push(
					", concat_ws(' ', j.description, j.notes, j.special_requirements)) * 2)",
				);
			},
		}
	}

	fn as_str(self) -> &'static str {
		match self {
			Self::Profile => "profile",
			Self::Opening => "opening",
		}
	}
}

#[derive(Debug, Clone, PartialEq)]
pub enum Clause {
	Eq { column: Column, value: Param },
	/// Any of `columns` starts with `prefix`.
	Prefix { columns: Vec<Column>, prefix: String },
	/// Any of `columns` contains `value` case-insensitively or is word-similar to it.
	Fuzzy { columns: Vec<Column>, value: String, threshold: f32 },
	Similar { score: Score, query: String, threshold: f32 },
	Contains { column: Column, value: String },
	/// The profile owns `email` as its primary or a secondary address, ignoring case.
	EmailIs { email: String },
	/// Renders `FALSE` when empty.
	AnyOf(Vec<Clause>),
	/// Renders `TRUE` when empty.
	AllOf(Vec<Clause>),
	Not(Box<Clause>),
	/// The candidate profile already applied to the opening.
	AppliedTo { opening_id: Uuid },
}
impl Clause {
	pub fn eq_text(column: Column, value: &str) -> Self {
		Self::Eq { column, value: Param::Text(value.to_string()) }
	}

	pub fn is_true(column: Column) -> Self {
		Self::Eq { column, value: Param::Bool(true) }
	}

	/// A clause no row satisfies.
	pub fn never() -> Self {
		Self::AnyOf(Vec::new())
	}

	pub fn push(&self, builder: &mut QueryBuilder<'static, Postgres>) {
		match self {
			Self::Eq { column, value } => {
				builder.push(column.sql());
				builder.push(" = ");
				value.push(builder);
			},
			Self::Prefix { columns, prefix } => {
				let pattern = format!("{}%", escape_like(prefix));

				push_joined(builder, columns, " OR ", "FALSE", |builder, column| {
					builder.push(column.sql());
					builder.push(" ILIKE ");
					builder.push_bind(pattern.clone());
				});
			},
			Self::Fuzzy { columns, value, threshold } => {
				let pattern = format!("%{}%", escape_like(value));

				push_joined(builder, columns, " OR ", "FALSE", |builder, column| {
					builder.push(column.sql());
					builder.push(" ILIKE ");
					builder.push_bind(pattern.clone());
					builder.push(" OR word_similarity(");
					builder.push_bind(value.clone());
					builder.push(", ");
					builder.push(column.sql());
					builder.push(") >= ");
					builder.push_bind(*threshold);
				});
			},
			Self::Similar { score, query, threshold } => {
				score.push(builder, query);
				builder.push(" >= ");
				builder.push_bind(*threshold);
			},
			Self::Contains { column, value } => {
				builder.push(column.sql());
				builder.push(" ILIKE ");
				builder.push_bind(format!("%{}%", escape_like(value)));
			},
			Self::EmailIs { email } => {
				let email = email.to_lowercase();

				builder.push("(lower(p.primary_email) = ");
				builder.push_bind(email.clone());
				builder.push(
					" OR EXISTS (SELECT 1 FROM unnest(p.secondary_emails) se WHERE lower(se) = ",
				);
				builder.push_bind(email);
				builder.push("))");
			},
			Self::AnyOf(clauses) =>
				push_joined(builder, clauses, " OR ", "FALSE", |builder, clause| {
					clause.push(builder);
				}),
			Self::AllOf(clauses) =>
				push_joined(builder, clauses, " AND ", "TRUE", |builder, clause| {
					clause.push(builder);
				}),
			Self::Not(clause) => {
				builder.push("NOT (");
				clause.push(builder);
				builder.push(")");
			},
			Self::AppliedTo { opening_id } => {
				builder.push(
					"EXISTS (SELECT 1 FROM job_opening_applicants ja WHERE ja.opening_id = ",
				);
				builder.push_bind(*opening_id);
				builder.push(" AND ja.profile_id = p.profile_id)");
			},
		}
	}

	pub fn to_value(&self) -> Value {
		match self {
			Self::Eq { column, value } =>
				json!({ "op": "eq", "field": column.sql(), "value": value.to_value() }),
			Self::Prefix { columns, prefix } =>
				json!({ "op": "prefix", "fields": column_names(columns), "value": prefix }),
			Self::Fuzzy { columns, value, threshold } => json!({
				"op": "fuzzy",
				"fields": column_names(columns),
				"value": value,
				"threshold": threshold
			}),
			Self::Similar { score, query, threshold } => json!({
				"op": "similar",
				"score": score.as_str(),
				"value": query,
				"threshold": threshold
			}),
			Self::Contains { column, value } =>
				json!({ "op": "contains", "field": column.sql(), "value": value }),
			Self::EmailIs { email } => json!({ "op": "email_is", "value": email }),
			Self::AnyOf(clauses) => json!({ "op": "any", "args": values(clauses) }),
			Self::AllOf(clauses) => json!({ "op": "all", "args": values(clauses) }),
			Self::Not(clause) => json!({ "op": "not", "expr": clause.to_value() }),
			Self::AppliedTo { opening_id } =>
				json!({ "op": "applied_to", "value": opening_id.to_string() }),
		}
	}
}

#[derive(Debug, Clone, PartialEq)]
pub enum OrderKey {
	Score { score: Score, query: String },
	Desc(Column),
	Asc(Column),
	/// `CASE` weight over `columns`: the first matching column scores `columns.len()`, the last 1.
	PrefixWeight { columns: Vec<Column>, prefix: String },
}
impl OrderKey {
	fn push(&self, builder: &mut QueryBuilder<'static, Postgres>) {
		match self {
			Self::Score { score, query } => {
				score.push(builder, query);
				builder.push(" DESC");
			},
			Self::Desc(column) => {
				builder.push(column.sql());
				builder.push(" DESC NULLS LAST");
			},
			Self::Asc(column) => {
				builder.push(column.sql());
				builder.push(" ASC");
			},
			Self::PrefixWeight { columns, prefix } => {
				let pattern = format!("{}%", escape_like(prefix));

				builder.push("CASE");

				for (idx, column) in columns.iter().enumerate() {
					builder.push(" WHEN ");
					builder.push(column.sql());
					builder.push(" ILIKE ");
					builder.push_bind(pattern.clone());
					builder.push(format!(" THEN {}", columns.len() - idx));
				}

				builder.push(" ELSE 0 END DESC");
			},
		}
	}

	pub fn to_value(&self) -> Value {
		match self {
			Self::Score { score, .. } => json!({ "key": "score", "score": score.as_str() }),
			Self::Desc(column) => json!({ "key": column.sql(), "dir": "desc" }),
			Self::Asc(column) => json!({ "key": column.sql(), "dir": "asc" }),
			Self::PrefixWeight { columns, prefix } => json!({
				"key": "prefix_weight",
				"fields": column_names(columns),
				"value": prefix
			}),
		}
	}
}

/// Row sets a plan can run against. Each carries its joins and the always-on soft-delete filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
	Profiles,
	Openings,
	Candidates,
}
impl Source {
	fn select(self) -> &'static str {
		match self {
			Self::Profiles => "p.*",
			Self::Openings =>
				"\
o.opening_id, o.job_id, o.activity, o.headcount, o.probono, o.gender, o.age_range_min, \
o.age_range_max, o.school, o.languages, o.created_at, j.requester_email, j.contact_start_date, \
j.contact_end_date, j.work_mode, j.work_radius, j.employment, j.description, j.benefits, j.notes, \
j.special_requirements, j.budget_low, j.budget_high, j.job_start_date, j.job_end_date",
			Self::Candidates =>
				"\
p.profile_id, p.nick_name, p.full_name, p.gender, p.whatsapp, p.phone_numbers, \
a.email AS account_email, a.contact_method",
		}
	}

	fn from(self) -> &'static str {
		match self {
			Self::Profiles => "profiles p",
			Self::Openings =>
				"\
job_openings o \
JOIN jobs j ON j.job_id = o.job_id \
JOIN accounts ra ON ra.email = j.requester_email \
JOIN profiles rp ON rp.profile_id = ra.profile_id",
			Self::Candidates => "profiles p JOIN accounts a ON a.profile_id = p.profile_id",
		}
	}

	fn base(self) -> &'static str {
		match self {
			Self::Profiles => "p.deleted_at IS NULL",
			Self::Openings => "o.deleted_at IS NULL AND j.deleted_at IS NULL",
			Self::Candidates => "p.deleted_at IS NULL AND a.deleted_at IS NULL",
		}
	}

	fn as_str(self) -> &'static str {
		match self {
			Self::Profiles => "profiles",
			Self::Openings => "openings",
			Self::Candidates => "candidates",
		}
	}
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchPlan {
	pub source: Source,
	pub predicate: Vec<Clause>,
	pub order: Vec<OrderKey>,
}
impl SearchPlan {
	pub fn new(source: Source) -> Self {
		Self { source, predicate: Vec::new(), order: Vec::new() }
	}

	pub fn count_query(&self) -> QueryBuilder<'static, Postgres> {
		let mut builder = QueryBuilder::new("SELECT count(*) FROM ");

		builder.push(self.source.from());
		self.push_where(&mut builder);

		builder
	}

	pub fn page_query(&self, limit: i64, offset: i64) -> QueryBuilder<'static, Postgres> {
		let mut builder = self.rows_query();

		builder.push(" LIMIT ");
		builder.push_bind(limit);
		builder.push(" OFFSET ");
		builder.push_bind(offset);

		builder
	}

	/// Every matching row in plan order.
	pub fn rows_query(&self) -> QueryBuilder<'static, Postgres> {
		let mut builder = QueryBuilder::new("SELECT ");

		builder.push(self.source.select());
		builder.push(" FROM ");
		builder.push(self.source.from());
		self.push_where(&mut builder);

		if !self.order.is_empty() {
			builder.push(" ORDER BY ");

			for (idx, key) in self.order.iter().enumerate() {
				if idx > 0 {
					builder.push(", ");
				}

				key.push(&mut builder);
			}
		}

		builder
	}

	pub fn to_value(&self) -> Value {
		json!({
			"source": self.source.as_str(),
			"predicate": self.predicate.iter().map(Clause::to_value).collect::<Vec<_>>(),
			"order": self.order.iter().map(OrderKey::to_value).collect::<Vec<_>>(),
		})
	}

	fn push_where(&self, builder: &mut QueryBuilder<'static, Postgres>) {
		builder.push(" WHERE ");
		builder.push(self.source.base());

		for clause in &self.predicate {
			builder.push(" AND ");
			clause.push(builder);
		}
	}
}

/// Escapes `%`, `_` and `\` so user text matches literally inside an `ILIKE` pattern.
pub fn escape_like(raw: &str) -> String {
	let mut out = String::with_capacity(raw.len());

	for ch in raw.chars() {
		if matches!(ch, '%' | '_' | '\\') {
			out.push('\\');
		}

		out.push(ch);
	}

	out
}

fn push_joined<T>(
	builder: &mut QueryBuilder<'static, Postgres>,
	items: &[T],
	separator: &str,
	empty: &str,
	mut push_item: impl FnMut(&mut QueryBuilder<'static, Postgres>, &T),
) {
	if items.is_empty() {
		builder.push(empty);

		return;
	}

	builder.push("(");

	for (idx, item) in items.iter().enumerate() {
		if idx > 0 {
			builder.push(separator);
		}

		push_item(builder, item);
	}

	builder.push(")");
}

fn values(clauses: &[Clause]) -> Vec<Value> {
	clauses.iter().map(Clause::to_value).collect()
}

fn column_names(columns: &[Column]) -> Vec<&'static str> {
	columns.iter().map(|column| column.sql()).collect()
}
