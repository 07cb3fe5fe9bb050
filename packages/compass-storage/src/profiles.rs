use sqlx::PgExecutor;
use uuid::Uuid;

use crate::{Error, Result, models::Profile};

macro_rules! profile_columns {
	() => {
		"\
\tprofile_id,
\tprimary_email,
\tprofile_type,
\tfirst_name,
\tlast_name,
\tnick_name,
\tfull_name,
\tgender,
\tprimary_activity,
\tsecondary_activity,
\tthird_activity,
\tsecondary_emails,
\tphone_numbers,
\tlanguages,
\twhatsapp,
\tcity,
\tstate,
\tcountry,
\tpostal_code,
\tlocation,
\tuniversity,
\tassociations,
\tcertifications,
\tremote,
\tprobono,
\twork_radius,
\tsubscriber,
\trecommendations_count,
\tsearchable,
\tsearch_string,
\tcreated_at,
\tupdated_at,
\tdeleted_at"
	};
}

/// Profile columns whose distinct values can be listed for filter pickers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DistinctField {
	City,
	State,
	Country,
	University,
}
impl DistinctField {
	pub fn column(self) -> &'static str {
		match self {
			Self::City => "city",
			Self::State => "state",
			Self::Country => "country",
			Self::University => "university",
		}
	}
}

/// Inserts a new profile. Returns `false` when the primary email is already taken.
pub async fn insert_profile<'e, E>(executor: E, profile: &Profile) -> Result<bool>
where
	E: PgExecutor<'e>,
{
	let result = sqlx::query(concat!(
		"INSERT INTO profiles (\n",
		profile_columns!(),
		"
)
VALUES (
\t$1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13,$14,$15,$16,$17,
\t$18,$19,$20,$21,$22,$23,$24,$25,$26,$27,$28,$29,$30,$31,$32,$33
)
ON CONFLICT (primary_email) DO NOTHING",
	))
	.bind(profile.profile_id)
	.bind(profile.primary_email.as_str())
	.bind(profile.profile_type.as_str())
	.bind(profile.first_name.as_deref())
	.bind(profile.last_name.as_deref())
	.bind(profile.nick_name.as_deref())
	.bind(profile.full_name.as_deref())
	.bind(profile.gender.as_deref())
	.bind(profile.primary_activity.as_deref())
	.bind(profile.secondary_activity.as_deref())
	.bind(profile.third_activity.as_deref())
	.bind(&profile.secondary_emails)
	.bind(&profile.phone_numbers)
	.bind(&profile.languages)
	.bind(profile.whatsapp.as_deref())
	.bind(profile.city.as_deref())
	.bind(profile.state.as_deref())
	.bind(profile.country.as_deref())
	.bind(profile.postal_code.as_deref())
	.bind(profile.location.as_str())
	.bind(profile.university.as_deref())
	.bind(profile.associations.as_deref())
	.bind(profile.certifications.as_deref())
	.bind(profile.remote)
	.bind(profile.probono)
	.bind(profile.work_radius.as_deref())
	.bind(profile.subscriber)
	.bind(profile.recommendations_count)
	.bind(profile.searchable)
	.bind(profile.search_string.as_str())
	.bind(profile.created_at)
	.bind(profile.updated_at)
	.bind(profile.deleted_at)
	.execute(executor)
	.await?;

	Ok(result.rows_affected() == 1)
}

/// Writes every caller-editable and derived column. `recommendations_count` is owned by the
/// recommendation paths and left untouched.
pub async fn update_profile<'e, E>(executor: E, profile: &Profile) -> Result<()>
where
	E: PgExecutor<'e>,
{
	let result = sqlx::query(
		"\
UPDATE profiles
SET profile_type = $2,
\tfirst_name = $3,
\tlast_name = $4,
\tnick_name = $5,
\tfull_name = $6,
\tgender = $7,
\tprimary_activity = $8,
\tsecondary_activity = $9,
\tthird_activity = $10,
\tsecondary_emails = $11,
\tphone_numbers = $12,
\tlanguages = $13,
\twhatsapp = $14,
\tcity = $15,
\tstate = $16,
\tcountry = $17,
\tpostal_code = $18,
\tlocation = $19,
\tuniversity = $20,
\tassociations = $21,
\tcertifications = $22,
\tremote = $23,
\tprobono = $24,
\twork_radius = $25,
\tsubscriber = $26,
\tsearchable = $27,
\tsearch_string = $28,
\tupdated_at = $29
WHERE profile_id = $1 AND deleted_at IS NULL",
	)
	.bind(profile.profile_id)
	.bind(profile.profile_type.as_str())
	.bind(profile.first_name.as_deref())
	.bind(profile.last_name.as_deref())
	.bind(profile.nick_name.as_deref())
	.bind(profile.full_name.as_deref())
	.bind(profile.gender.as_deref())
	.bind(profile.primary_activity.as_deref())
	.bind(profile.secondary_activity.as_deref())
	.bind(profile.third_activity.as_deref())
	.bind(&profile.secondary_emails)
	.bind(&profile.phone_numbers)
	.bind(&profile.languages)
	.bind(profile.whatsapp.as_deref())
	.bind(profile.city.as_deref())
	.bind(profile.state.as_deref())
	.bind(profile.country.as_deref())
	.bind(profile.postal_code.as_deref())
	.bind(profile.location.as_str())
	.bind(profile.university.as_deref())
	.bind(profile.associations.as_deref())
	.bind(profile.certifications.as_deref())
	.bind(profile.remote)
	.bind(profile.probono)
	.bind(profile.work_radius.as_deref())
	.bind(profile.subscriber)
	.bind(profile.searchable)
	.bind(profile.search_string.as_str())
	.bind(profile.updated_at)
	.execute(executor)
	.await?;

	if result.rows_affected() == 0 {
		return Err(Error::NotFound(format!("profile {}", profile.profile_id)));
	}

	Ok(())
}

pub async fn get_profile<'e, E>(executor: E, profile_id: Uuid) -> Result<Option<Profile>>
where
	E: PgExecutor<'e>,
{
	let row = sqlx::query_as::<_, Profile>(concat!(
		"SELECT\n",
		profile_columns!(),
		"
FROM profiles
WHERE profile_id = $1 AND deleted_at IS NULL",
	))
	.bind(profile_id)
	.fetch_optional(executor)
	.await?;

	Ok(row)
}

/// Same as [`get_profile`] but takes a row lock held until the surrounding transaction ends.
pub async fn lock_profile<'e, E>(executor: E, profile_id: Uuid) -> Result<Option<Profile>>
where
	E: PgExecutor<'e>,
{
	let row = sqlx::query_as::<_, Profile>(concat!(
		"SELECT\n",
		profile_columns!(),
		"
FROM profiles
WHERE profile_id = $1 AND deleted_at IS NULL
FOR UPDATE",
	))
	.bind(profile_id)
	.fetch_optional(executor)
	.await?;

	Ok(row)
}

pub async fn get_profile_by_email<'e, E>(executor: E, email: &str) -> Result<Option<Profile>>
where
	E: PgExecutor<'e>,
{
	let row = sqlx::query_as::<_, Profile>(concat!(
		"SELECT\n",
		profile_columns!(),
		"
FROM profiles
WHERE primary_email = $1 AND deleted_at IS NULL",
	))
	.bind(email)
	.fetch_optional(executor)
	.await?;

	Ok(row)
}

/// Distinct non-empty values of `field` across live profiles, sorted.
pub async fn distinct_values<'e, E>(executor: E, field: DistinctField) -> Result<Vec<String>>
where
	E: PgExecutor<'e>,
{
	let column = field.column();
	let sql = format!(
		"\
SELECT DISTINCT {column}
FROM profiles
WHERE deleted_at IS NULL AND {column} IS NOT NULL AND btrim({column}) <> ''
ORDER BY {column} ASC"
	);
	let values: Vec<String> = sqlx::query_scalar(&sql).fetch_all(executor).await?;

	Ok(values)
}
