use std::{collections::HashMap, fs, path::Path};

use serde::Deserialize;

use crate::{Error, Result, activity::ActivityCode, profile::Gender, text};

const BUILTIN_TAXONOMY_JSON: &str = include_str!("../data/activities.json");
const FALLBACK_LOCALE: &str = "es";

/// Read-only lookup from activity codes to titles and search keywords.
pub trait ActivityTaxonomy
where
	Self: Send + Sync,
{
	/// Title for `code` in the taxonomy's locale. Male and female pick the gendered variant when
	/// one exists; `other`, `None`, or a missing variant use the generic title. Unknown codes
	/// return `None`.
	fn resolve(&self, code: &str, gender: Option<Gender>) -> Option<String>;

	/// Normalized keywords for `code`, empty for unknown codes.
	fn keywords(&self, code: &str) -> Vec<String>;

	fn contains(&self, code: &str) -> bool {
		self.resolve(code, None).is_some()
	}
}

#[derive(Debug, Deserialize)]
struct TaxonomyDocument {
	areas: Vec<AreaDocument>,
}

#[derive(Debug, Deserialize)]
struct AreaDocument {
	activities: HashMap<String, ActivityEntry>,
}

#[derive(Debug, Clone, Deserialize)]
struct ActivityEntry {
	titles: HashMap<String, Titles>,
	#[serde(default)]
	keywords: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct Titles {
	#[serde(default)]
	male: Option<String>,
	#[serde(default)]
	female: Option<String>,
	generic: String,
}

#[derive(Debug)]
pub struct StaticTaxonomy {
	locale: String,
	entries: HashMap<String, ActivityEntry>,
}
impl StaticTaxonomy {
	pub fn builtin(locale: &str) -> Result<Self> {
		Self::from_json(BUILTIN_TAXONOMY_JSON, locale)
	}

	pub fn from_path(path: &Path, locale: &str) -> Result<Self> {
		let raw = fs::read_to_string(path)
			.map_err(|err| Error::ReadTaxonomy { path: path.to_path_buf(), source: err })?;

		Self::from_json(&raw, locale)
	}

	pub fn from_json(raw: &str, locale: &str) -> Result<Self> {
		let document: TaxonomyDocument = serde_json::from_str(raw)?;
		let mut entries = HashMap::new();

		for area in document.areas {
			for (code, mut entry) in area.activities {
				let code = ActivityCode::parse(&code)?;

				if !entry.titles.contains_key(FALLBACK_LOCALE) {
					return Err(Error::InvalidValue {
						field: "taxonomy",
						message: format!("{code} has no '{FALLBACK_LOCALE}' titles."),
					});
				}

				let mut keywords = Vec::with_capacity(entry.keywords.len());

				for keyword in &entry.keywords {
					let keyword = text::normalize(keyword);

					if !keyword.is_empty() {
						text::push_unique(&mut keywords, keyword);
					}
				}

				entry.keywords = keywords;

				if entries.insert(code.to_string(), entry).is_some() {
					return Err(Error::InvalidValue {
						field: "taxonomy",
						message: format!("{code} is listed more than once."),
					});
				}
			}
		}

		Ok(Self { locale: locale.to_string(), entries })
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}
}
impl ActivityTaxonomy for StaticTaxonomy {
	fn resolve(&self, code: &str, gender: Option<Gender>) -> Option<String> {
		let entry = self.entries.get(code.trim())?;
		let titles =
			entry.titles.get(&self.locale).or_else(|| entry.titles.get(FALLBACK_LOCALE))?;
		let gendered = match gender {
			Some(Gender::Male) => titles.male.as_ref(),
			Some(Gender::Female) => titles.female.as_ref(),
			Some(Gender::Other) | None => None,
		};

		Some(gendered.unwrap_or(&titles.generic).clone())
	}

	fn keywords(&self, code: &str) -> Vec<String> {
		self.entries.get(code.trim()).map(|entry| entry.keywords.clone()).unwrap_or_default()
	}
}
