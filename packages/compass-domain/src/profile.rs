use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{Error, Result, taxonomy::ActivityTaxonomy, text};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
	Male,
	Female,
	Other,
}
impl Gender {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Male => "male",
			Self::Female => "female",
			Self::Other => "other",
		}
	}
}
impl FromStr for Gender {
	type Err = Error;

	fn from_str(raw: &str) -> Result<Self> {
		match raw {
			"male" => Ok(Self::Male),
			"female" => Ok(Self::Female),
			"other" => Ok(Self::Other),
			other => Err(invalid("gender", other)),
		}
	}
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProfileType {
	#[default]
	Individual,
	Organization,
}
impl ProfileType {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Individual => "individual",
			Self::Organization => "organization",
		}
	}
}
impl FromStr for ProfileType {
	type Err = Error;

	fn from_str(raw: &str) -> Result<Self> {
		match raw {
			"individual" => Ok(Self::Individual),
			"organization" => Ok(Self::Organization),
			other => Err(invalid("type", other)),
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Proficiency {
	Basic,
	Intermediate,
	Advanced,
	Native,
}
impl Proficiency {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Basic => "basic",
			Self::Intermediate => "intermediate",
			Self::Advanced => "advanced",
			Self::Native => "native",
		}
	}
}
impl FromStr for Proficiency {
	type Err = Error;

	fn from_str(raw: &str) -> Result<Self> {
		match raw {
			"basic" => Ok(Self::Basic),
			"intermediate" => Ok(Self::Intermediate),
			"advanced" => Ok(Self::Advanced),
			"native" => Ok(Self::Native),
			other => Err(invalid("proficiency", other)),
		}
	}
}

/// A language and how well it is spoken. Stored as a `lang:proficiency` pair so that search can
/// match either half by substring.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Language {
	pub lang: String,
	pub proficiency: Proficiency,
}
impl Language {
	pub fn new(lang: &str, proficiency: Proficiency) -> Result<Self> {
		let lang = lang.trim().to_ascii_lowercase();

		if !is_language_code(&lang) {
			return Err(invalid("language", &lang));
		}

		Ok(Self { lang, proficiency })
	}

	pub fn to_pair(&self) -> String {
		format!("{}:{}", self.lang, self.proficiency.as_str())
	}

	pub fn parse_pair(raw: &str) -> Result<Self> {
		let Some((lang, proficiency)) = raw.split_once(':') else {
			return Err(invalid("language", raw));
		};

		Self::new(lang, proficiency.trim().parse()?)
	}
}
impl fmt::Display for Language {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}:{}", self.lang, self.proficiency.as_str())
	}
}

/// Two ASCII letters, ISO 639-1 style.
pub fn is_language_code(raw: &str) -> bool {
	raw.len() == 2 && raw.bytes().all(|byte| byte.is_ascii_alphabetic())
}

/// Fields a profile can be required to carry before it is searchable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileField {
	PrimaryActivity,
	FirstName,
	LastName,
	Gender,
	City,
	State,
	Country,
}
impl FromStr for ProfileField {
	type Err = Error;

	fn from_str(raw: &str) -> Result<Self> {
		match raw {
			"primary_activity" => Ok(Self::PrimaryActivity),
			"first_name" => Ok(Self::FirstName),
			"last_name" => Ok(Self::LastName),
			"gender" => Ok(Self::Gender),
			"city" => Ok(Self::City),
			"state" => Ok(Self::State),
			"country" => Ok(Self::Country),
			other => Err(invalid("searchable field", other)),
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchableRule {
	required: Vec<ProfileField>,
}
impl SearchableRule {
	pub fn new(required: Vec<ProfileField>) -> Self {
		Self { required }
	}

	pub fn from_names(names: &[String]) -> Result<Self> {
		let required =
			names.iter().map(|name| name.parse::<ProfileField>()).collect::<Result<Vec<_>>>()?;

		Ok(Self { required })
	}

	pub fn is_satisfied(&self, fields: &ProfileFields) -> bool {
		self.required.iter().all(|field| match field {
			ProfileField::PrimaryActivity => present(&fields.primary_activity),
			ProfileField::FirstName => present(&fields.first_name),
			ProfileField::LastName => present(&fields.last_name),
			ProfileField::Gender => fields.gender.is_some(),
			ProfileField::City => present(&fields.city),
			ProfileField::State => present(&fields.state),
			ProfileField::Country => present(&fields.country),
		})
	}
}
impl Default for SearchableRule {
	fn default() -> Self {
		Self::new(vec![
			ProfileField::PrimaryActivity,
			ProfileField::FirstName,
			ProfileField::Gender,
		])
	}
}

/// The profile columns that feed derived fields, as they are about to be written.
#[derive(Debug, Clone, Default)]
pub struct ProfileFields {
	pub primary_email: String,
	pub first_name: Option<String>,
	pub last_name: Option<String>,
	pub nick_name: Option<String>,
	pub gender: Option<Gender>,
	pub primary_activity: Option<String>,
	pub secondary_activity: Option<String>,
	pub third_activity: Option<String>,
	pub secondary_emails: Vec<String>,
	pub phone_numbers: Vec<String>,
	pub city: Option<String>,
	pub state: Option<String>,
	pub country: Option<String>,
	pub postal_code: Option<String>,
}
impl ProfileFields {
	pub fn activities(&self) -> impl Iterator<Item = &str> {
		[&self.primary_activity, &self.secondary_activity, &self.third_activity]
			.into_iter()
			.filter_map(|code| text::non_blank(code.as_deref()))
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaterializedProfile {
	pub full_name: Option<String>,
	pub location: String,
	pub search_string: String,
	pub searchable: bool,
}

pub fn full_name(first_name: Option<&str>, last_name: Option<&str>) -> Option<String> {
	let parts =
		[first_name, last_name].into_iter().filter_map(text::non_blank).collect::<Vec<_>>();

	if parts.is_empty() { None } else { Some(parts.join(" ")) }
}

/// `"city, state, country, CP: postal"` with absent parts dropped.
pub fn location(
	city: Option<&str>,
	state: Option<&str>,
	country: Option<&str>,
	postal_code: Option<&str>,
) -> String {
	let postal = text::non_blank(postal_code).map(|code| format!("CP: {code}"));
	let mut parts = [city, state, country]
		.into_iter()
		.filter_map(text::non_blank)
		.map(str::to_string)
		.collect::<Vec<_>>();

	parts.extend(postal);

	parts.join(", ")
}

/// Recomputes every derived profile column from `fields`. Same inputs always give the same output.
pub fn materialize_profile(
	fields: &ProfileFields,
	taxonomy: &dyn ActivityTaxonomy,
	rule: &SearchableRule,
) -> MaterializedProfile {
	let full_name = full_name(fields.first_name.as_deref(), fields.last_name.as_deref());
	let location = location(
		fields.city.as_deref(),
		fields.state.as_deref(),
		fields.country.as_deref(),
		fields.postal_code.as_deref(),
	);
	let mut keywords = Vec::new();

	for code in fields.activities() {
		for keyword in taxonomy.keywords(code) {
			text::push_unique(&mut keywords, keyword);
		}
	}

	let mut parts: Vec<&str> = Vec::new();

	parts.extend(full_name.as_deref());
	parts.extend(text::non_blank(fields.nick_name.as_deref()));
	parts.extend(text::non_blank(Some(fields.primary_email.as_str())));
	parts.extend(fields.secondary_emails.iter().filter_map(|email| text::non_blank(Some(email))));
	parts.extend(fields.phone_numbers.iter().filter_map(|phone| text::non_blank(Some(phone))));

	if !location.is_empty() {
		parts.push(&location);
	}

	parts.extend(keywords.iter().map(String::as_str));

	let search_string = text::normalize(&parts.join(" "));

	let searchable = rule.is_satisfied(fields);

	MaterializedProfile { full_name, location, search_string, searchable }
}

fn present(value: &Option<String>) -> bool {
	text::non_blank(value.as_deref()).is_some()
}

fn invalid(field: &'static str, value: &str) -> Error {
	Error::InvalidValue { field, message: format!("'{value}' is not recognized.") }
}
