use std::{fmt, str::FromStr};

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

const CODE_PATTERN: &str = r"^[0-9]{3}-[0-9]{2}$";
const PREFIX_PATTERN: &str = r"^[0-9]{1,3}(-[0-9]{0,2})?$";

/// A hierarchical activity code `AAA-BB`. Search matches on its prefixes, so the leading digits
/// group related activities.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ActivityCode(String);
impl ActivityCode {
	pub fn parse(raw: &str) -> Result<Self> {
		let trimmed = raw.trim();

		if !matches_pattern(CODE_PATTERN, trimmed) {
			return Err(Error::InvalidValue {
				field: "activity",
				message: format!("'{trimmed}' is not an AAA-BB activity code."),
			});
		}

		Ok(Self(trimmed.to_string()))
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}
}
impl FromStr for ActivityCode {
	type Err = Error;

	fn from_str(raw: &str) -> Result<Self> {
		Self::parse(raw)
	}
}
impl TryFrom<String> for ActivityCode {
	type Error = Error;

	fn try_from(raw: String) -> Result<Self> {
		Self::parse(&raw)
	}
}
impl From<ActivityCode> for String {
	fn from(code: ActivityCode) -> Self {
		code.0
	}
}
impl fmt::Display for ActivityCode {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

/// Accepts the partial codes search allows: `"2"`, `"203"`, `"203-"`, `"203-0"`, `"203-04"`.
pub fn is_activity_prefix(raw: &str) -> bool {
	matches_pattern(PREFIX_PATTERN, raw)
}

fn matches_pattern(pattern: &str, text: &str) -> bool {
	Regex::new(pattern).map(|re| re.is_match(text)).unwrap_or(false)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parses_trimmed_code() {
		let code = ActivityCode::parse(" 203-04 ").expect("Expected a valid code.");

		assert_eq!(code.as_str(), "203-04");
		assert_eq!(code.to_string(), "203-04");
	}

	#[test]
	fn rejects_malformed_codes() {
		for raw in ["", "20-04", "203-4", "2030-04", "abc-de", "203_04"] {
			assert!(ActivityCode::parse(raw).is_err(), "{raw} should be rejected");
		}
	}

	#[test]
	fn prefixes_accept_partial_codes_only() {
		for raw in ["0", "090", "090-", "090-1", "090-12"] {
			assert!(is_activity_prefix(raw), "{raw} should be a prefix");
		}
		for raw in ["", "-12", "0901", "090-123", "09a"] {
			assert!(!is_activity_prefix(raw), "{raw} should not be a prefix");
		}
	}
}
