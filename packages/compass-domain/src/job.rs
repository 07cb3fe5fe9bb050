use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{Error, Result, taxonomy::ActivityTaxonomy, text};

pub const MAX_OPENINGS_PER_JOB: usize = 10;
pub const MAX_DESCRIPTION_CHARS: usize = 1_024;
pub const MAX_AGE: i32 = 120;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorkMode {
	#[serde(rename = "online")]
	Online,
	#[serde(rename = "hybrid")]
	Hybrid,
	#[serde(rename = "in-person")]
	InPerson,
}
impl WorkMode {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Online => "online",
			Self::Hybrid => "hybrid",
			Self::InPerson => "in-person",
		}
	}

	/// Remote candidates qualify regardless of geography unless the work is in person.
	pub fn admits_remote(self) -> bool {
		!matches!(self, Self::InPerson)
	}
}
impl FromStr for WorkMode {
	type Err = Error;

	fn from_str(raw: &str) -> Result<Self> {
		match raw {
			"online" => Ok(Self::Online),
			"hybrid" => Ok(Self::Hybrid),
			"in-person" => Ok(Self::InPerson),
			other => Err(invalid("work_mode", other)),
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkRadius {
	Local,
	State,
	National,
	International,
}
impl WorkRadius {
	pub const ALL: [Self; 4] = [Self::Local, Self::State, Self::National, Self::International];

	pub fn as_str(self) -> &'static str {
		match self {
			Self::Local => "local",
			Self::State => "state",
			Self::National => "national",
			Self::International => "international",
		}
	}

	/// Location fields a candidate must share with the requester. Each wider tier drops the
	/// narrowest field of the tier below it.
	pub fn shared_fields(self) -> &'static [GeoField] {
		match self {
			Self::Local => &[GeoField::Country, GeoField::State, GeoField::City],
			Self::State => &[GeoField::Country, GeoField::State],
			Self::National => &[GeoField::Country],
			Self::International => &[],
		}
	}

	/// The requester location rendered at this tier's granularity.
	pub fn location_label(self, place: &Place<'_>) -> String {
		let fields: &[GeoField] = match self {
			Self::Local | Self::International =>
				&[GeoField::City, GeoField::State, GeoField::Country],
			Self::State => &[GeoField::State, GeoField::Country],
			Self::National => &[GeoField::Country],
		};

		fields.iter().filter_map(|field| place.get(*field)).collect::<Vec<_>>().join(", ")
	}
}
impl FromStr for WorkRadius {
	type Err = Error;

	fn from_str(raw: &str) -> Result<Self> {
		match raw {
			"local" => Ok(Self::Local),
			"state" => Ok(Self::State),
			"national" => Ok(Self::National),
			"international" => Ok(Self::International),
			other => Err(invalid("work_radius", other)),
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Employment {
	Freelance,
	Determinate,
	Indeterminate,
}
impl Employment {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Freelance => "freelance",
			Self::Determinate => "determinate",
			Self::Indeterminate => "indeterminate",
		}
	}
}
impl FromStr for Employment {
	type Err = Error;

	fn from_str(raw: &str) -> Result<Self> {
		match raw {
			"freelance" => Ok(Self::Freelance),
			"determinate" => Ok(Self::Determinate),
			"indeterminate" => Ok(Self::Indeterminate),
			other => Err(invalid("employment", other)),
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GeoField {
	Country,
	State,
	City,
}

/// Borrowed view of a location; blank parts count as absent.
#[derive(Debug, Clone, Copy, Default)]
pub struct Place<'a> {
	pub city: Option<&'a str>,
	pub state: Option<&'a str>,
	pub country: Option<&'a str>,
}
impl<'a> Place<'a> {
	pub fn get(&self, field: GeoField) -> Option<&'a str> {
		let value = match field {
			GeoField::Country => self.country,
			GeoField::State => self.state,
			GeoField::City => self.city,
		};

		text::non_blank(value)
	}
}

/// Search text for an opening: the normalized keywords of its activity.
pub fn opening_search_string(activity: &str, taxonomy: &dyn ActivityTaxonomy) -> String {
	text::normalize(&taxonomy.keywords(activity).join(" "))
}

fn invalid(field: &'static str, value: &str) -> Error {
	Error::InvalidValue { field, message: format!("'{value}' is not recognized.") }
}
