use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{CompassService, ConflictCode, Error, Result};
use compass_domain::{
	activity::ActivityCode,
	job::WorkRadius,
	profile::{self, Gender, Language, ProfileFields, ProfileType},
	taxonomy::ActivityTaxonomy,
};
use compass_storage::{
	accounts,
	models::{Account, Profile},
	profiles::{self as profile_store, DistinctField},
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateProfileRequest {
	pub email: String,
	#[serde(rename = "type", default)]
	pub profile_type: ProfileType,
}

/// Partial profile update. `None` leaves a field alone; a blank string clears an optional text
/// field.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfilePatch {
	#[serde(rename = "type")]
	pub profile_type: Option<ProfileType>,
	pub first_name: Option<String>,
	pub last_name: Option<String>,
	pub nick_name: Option<String>,
	pub gender: Option<String>,
	pub primary_activity: Option<String>,
	pub secondary_activity: Option<String>,
	pub third_activity: Option<String>,
	pub secondary_emails: Option<Vec<String>>,
	pub phone_numbers: Option<Vec<String>>,
	/// `lang:proficiency` pairs.
	pub languages: Option<Vec<String>>,
	pub whatsapp: Option<String>,
	pub city: Option<String>,
	pub state: Option<String>,
	pub country: Option<String>,
	pub postal_code: Option<String>,
	pub university: Option<String>,
	pub associations: Option<String>,
	pub certifications: Option<String>,
	pub remote: Option<bool>,
	pub probono: Option<bool>,
	pub work_radius: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileView {
	pub profile_id: Uuid,
	pub primary_email: String,
	#[serde(rename = "type")]
	pub profile_type: String,
	pub first_name: Option<String>,
	pub last_name: Option<String>,
	pub nick_name: Option<String>,
	pub full_name: Option<String>,
	pub gender: Option<String>,
	pub primary_activity: Option<String>,
	pub secondary_activity: Option<String>,
	pub third_activity: Option<String>,
	pub secondary_emails: Vec<String>,
	pub phone_numbers: Vec<String>,
	pub languages: Vec<String>,
	pub whatsapp: Option<String>,
	pub city: Option<String>,
	pub state: Option<String>,
	pub country: Option<String>,
	pub postal_code: Option<String>,
	pub location: String,
	pub university: Option<String>,
	pub associations: Option<String>,
	pub certifications: Option<String>,
	pub remote: bool,
	pub probono: bool,
	pub work_radius: Option<String>,
	pub subscriber: bool,
	pub recommendations_count: i32,
	pub searchable: bool,
	#[serde(with = "time::serde::rfc3339")]
	pub created_at: OffsetDateTime,
	#[serde(with = "time::serde::rfc3339")]
	pub updated_at: OffsetDateTime,
}
impl From<Profile> for ProfileView {
	fn from(profile: Profile) -> Self {
		Self {
			profile_id: profile.profile_id,
			primary_email: profile.primary_email,
			profile_type: profile.profile_type,
			first_name: profile.first_name,
			last_name: profile.last_name,
			nick_name: profile.nick_name,
			full_name: profile.full_name,
			gender: profile.gender,
			primary_activity: profile.primary_activity,
			secondary_activity: profile.secondary_activity,
			third_activity: profile.third_activity,
			secondary_emails: profile.secondary_emails,
			phone_numbers: profile.phone_numbers,
			languages: profile.languages,
			whatsapp: profile.whatsapp,
			city: profile.city,
			state: profile.state,
			country: profile.country,
			postal_code: profile.postal_code,
			location: profile.location,
			university: profile.university,
			associations: profile.associations,
			certifications: profile.certifications,
			remote: profile.remote,
			probono: profile.probono,
			work_radius: profile.work_radius,
			subscriber: profile.subscriber,
			recommendations_count: profile.recommendations_count,
			searchable: profile.searchable,
			created_at: profile.created_at,
			updated_at: profile.updated_at,
		}
	}
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldValuesResponse {
	pub field: String,
	pub values: Vec<String>,
}

impl CompassService {
	/// Creates a profile and its account. The account starts on email with job alerts enabled.
	pub async fn create_profile(&self, req: CreateProfileRequest) -> Result<ProfileView> {
		let now = OffsetDateTime::now_utc();
		let email = normalize_email(&req.email)?;
		let mut profile = blank_profile(Uuid::new_v4(), email, req.profile_type, now);

		self.rematerialize(&mut profile);

		let account = Account {
			email: profile.primary_email.clone(),
			profile_id: profile.profile_id,
			contact_method: "email".to_string(),
			job_notifications: true,
			created_at: now,
			updated_at: now,
		};
		let mut tx = self.db.pool.begin().await?;

		if !profile_store::insert_profile(&mut *tx, &profile).await? {
			return Err(Error::conflict(
				ConflictCode::EmailTaken,
				format!("{} already has a profile.", profile.primary_email),
			));
		}

		accounts::insert_account(&mut *tx, &account).await?;

		tx.commit().await?;

		tracing::info!(profile_id = %profile.profile_id, "Profile created.");

		Ok(profile.into())
	}

	/// Applies `patch` under a row lock and recomputes the derived columns before writing.
	pub async fn update_profile(
		&self,
		profile_id: Uuid,
		patch: ProfilePatch,
	) -> Result<ProfileView> {
		let now = OffsetDateTime::now_utc();
		let mut tx = self.db.pool.begin().await?;
		let Some(mut profile) = profile_store::lock_profile(&mut *tx, profile_id).await? else {
			return Err(Error::not_found(format!("Profile {profile_id} does not exist.")));
		};

		apply_patch(&mut profile, patch, self.taxonomy.as_ref())?;
		self.rematerialize(&mut profile);

		profile.updated_at = now;

		profile_store::update_profile(&mut *tx, &profile).await?;

		tx.commit().await?;

		tracing::info!(
			profile_id = %profile.profile_id,
			searchable = profile.searchable,
			"Profile updated."
		);

		Ok(profile.into())
	}

	pub async fn get_profile(&self, profile_id: Uuid) -> Result<ProfileView> {
		let Some(profile) = profile_store::get_profile(&self.db.pool, profile_id).await? else {
			return Err(Error::not_found(format!("Profile {profile_id} does not exist.")));
		};

		Ok(profile.into())
	}

	/// Distinct non-empty values of a location or credential column, for filter pickers.
	pub async fn enumerate_profile_field(&self, field: &str) -> Result<FieldValuesResponse> {
		let distinct = match field.trim() {
			"city" => DistinctField::City,
			"state" => DistinctField::State,
			"country" => DistinctField::Country,
			"university" => DistinctField::University,
			other => {
				return Err(Error::invalid(format!(
					"field must be one of city, state, country, university, got '{other}'."
				)));
			},
		};
		let values = profile_store::distinct_values(&self.db.pool, distinct).await?;

		Ok(FieldValuesResponse { field: distinct.column().to_string(), values })
	}

	fn rematerialize(&self, profile: &mut Profile) {
		let fields = fields_of(profile);
		let derived =
			profile::materialize_profile(&fields, self.taxonomy.as_ref(), &self.searchable_rule);

		profile.full_name = derived.full_name;
		profile.location = derived.location;
		profile.search_string = derived.search_string;
		profile.searchable = derived.searchable;
	}
}

/// The stored columns that feed materialization.
pub(crate) fn fields_of(profile: &Profile) -> ProfileFields {
	ProfileFields {
		primary_email: profile.primary_email.clone(),
		first_name: profile.first_name.clone(),
		last_name: profile.last_name.clone(),
		nick_name: profile.nick_name.clone(),
		gender: profile.gender.as_deref().and_then(|gender| gender.parse::<Gender>().ok()),
		primary_activity: profile.primary_activity.clone(),
		secondary_activity: profile.secondary_activity.clone(),
		third_activity: profile.third_activity.clone(),
		secondary_emails: profile.secondary_emails.clone(),
		phone_numbers: profile.phone_numbers.clone(),
		city: profile.city.clone(),
		state: profile.state.clone(),
		country: profile.country.clone(),
		postal_code: profile.postal_code.clone(),
	}
}

fn normalize_email(raw: &str) -> Result<String> {
	let email = raw.trim().to_lowercase();
	let valid = email
		.split_once('@')
		.is_some_and(|(local, domain)| !local.is_empty() && !domain.is_empty());

	if !valid || email.chars().any(char::is_whitespace) {
		return Err(Error::invalid(format!("'{}' is not an email address.", raw.trim())));
	}

	Ok(email)
}

fn blank_profile(
	profile_id: Uuid,
	primary_email: String,
	profile_type: ProfileType,
	now: OffsetDateTime,
) -> Profile {
	Profile {
		profile_id,
		primary_email,
		profile_type: profile_type.as_str().to_string(),
		first_name: None,
		last_name: None,
		nick_name: None,
		full_name: None,
		gender: None,
		primary_activity: None,
		secondary_activity: None,
		third_activity: None,
		secondary_emails: Vec::new(),
		phone_numbers: Vec::new(),
		languages: Vec::new(),
		whatsapp: None,
		city: None,
		state: None,
		country: None,
		postal_code: None,
		location: String::new(),
		university: None,
		associations: None,
		certifications: None,
		remote: false,
		probono: false,
		work_radius: None,
		subscriber: false,
		recommendations_count: 0,
		searchable: false,
		search_string: String::new(),
		created_at: now,
		updated_at: now,
		deleted_at: None,
	}
}

fn apply_patch(
	profile: &mut Profile,
	patch: ProfilePatch,
	taxonomy: &dyn ActivityTaxonomy,
) -> Result<()> {
	if let Some(kind) = patch.profile_type {
		profile.profile_type = kind.as_str().to_string();
	}
	if let Some(gender) = patch.gender {
		profile.gender = crate::clean(Some(&gender))
			.map(|gender| gender.parse::<Gender>().map(|gender| gender.as_str().to_string()))
			.transpose()?;
	}
	if let Some(radius) = patch.work_radius {
		profile.work_radius = crate::clean(Some(&radius))
			.map(|radius| radius.parse::<WorkRadius>().map(|radius| radius.as_str().to_string()))
			.transpose()?;
	}
	if let Some(languages) = patch.languages {
		profile.languages = crate::clean_list(&languages)
			.iter()
			.map(|pair| Language::parse_pair(pair).map(|language| language.to_pair()))
			.collect::<compass_domain::Result<Vec<_>>>()?;
	}

	for (slot, value) in [
		(&mut profile.primary_activity, patch.primary_activity),
		(&mut profile.secondary_activity, patch.secondary_activity),
		(&mut profile.third_activity, patch.third_activity),
	] {
		if let Some(value) = value {
			*slot =
				crate::clean(Some(&value)).map(|code| known_activity(&code, taxonomy)).transpose()?;
		}
	}
	for (slot, value) in [
		(&mut profile.first_name, patch.first_name),
		(&mut profile.last_name, patch.last_name),
		(&mut profile.nick_name, patch.nick_name),
		(&mut profile.whatsapp, patch.whatsapp),
		(&mut profile.city, patch.city),
		(&mut profile.state, patch.state),
		(&mut profile.country, patch.country),
		(&mut profile.postal_code, patch.postal_code),
		(&mut profile.university, patch.university),
		(&mut profile.associations, patch.associations),
		(&mut profile.certifications, patch.certifications),
	] {
		if let Some(value) = value {
			*slot = crate::clean(Some(&value));
		}
	}

	if let Some(emails) = patch.secondary_emails {
		profile.secondary_emails = crate::clean_list(&emails)
			.iter()
			.map(|email| normalize_email(email))
			.collect::<Result<_>>()?;
	}
	if let Some(phones) = patch.phone_numbers {
		profile.phone_numbers = crate::clean_list(&phones);
	}
	if let Some(remote) = patch.remote {
		profile.remote = remote;
	}
	if let Some(probono) = patch.probono {
		profile.probono = probono;
	}

	Ok(())
}

/// Parses `raw` as a full activity code the taxonomy knows.
pub(crate) fn known_activity(raw: &str, taxonomy: &dyn ActivityTaxonomy) -> Result<String> {
	let code = ActivityCode::parse(raw)?;

	if !taxonomy.contains(code.as_str()) {
		return Err(Error::invalid(format!("Activity {code} is not in the taxonomy.")));
	}

	Ok(code.into())
}
