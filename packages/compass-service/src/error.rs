use std::fmt;

use serde::Serialize;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Machine-readable reason carried by [`Error::Conflict`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictCode {
	AlreadyRecommended,
	NotRecommended,
	AlreadyApplied,
	EmailTaken,
}
impl ConflictCode {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::AlreadyRecommended => "already_recommended",
			Self::NotRecommended => "not_recommended",
			Self::AlreadyApplied => "already_applied",
			Self::EmailTaken => "email_taken",
		}
	}
}
impl fmt::Display for ConflictCode {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Invalid request: {message}")]
	InvalidRequest { message: String },
	#[error("Forbidden: {message}")]
	Forbidden { message: String },
	#[error("Not found: {message}")]
	NotFound { message: String },
	#[error("Conflict ({code}): {message}")]
	Conflict { code: ConflictCode, message: String },
	#[error("Taxonomy error: {message}")]
	Taxonomy { message: String },
	#[error("Provider error: {message}")]
	Provider { message: String },
	#[error("Storage error: {message}")]
	Storage { message: String },
}
impl Error {
	pub(crate) fn invalid(message: impl Into<String>) -> Self {
		Self::InvalidRequest { message: message.into() }
	}

	pub(crate) fn not_found(message: impl Into<String>) -> Self {
		Self::NotFound { message: message.into() }
	}

	pub(crate) fn conflict(code: ConflictCode, message: impl Into<String>) -> Self {
		Self::Conflict { code, message: message.into() }
	}

	/// Whether retrying the same call can succeed. Missing rows and rejected input never will.
	pub fn is_retryable(&self) -> bool {
		matches!(self, Self::Provider { .. } | Self::Storage { .. })
	}
}
impl From<sqlx::Error> for Error {
	fn from(err: sqlx::Error) -> Self {
		Self::Storage { message: err.to_string() }
	}
}

impl From<compass_storage::Error> for Error {
	fn from(err: compass_storage::Error) -> Self {
		match err {
			compass_storage::Error::Sqlx(inner) => Self::Storage { message: inner.to_string() },
			compass_storage::Error::NotFound(message) => Self::NotFound { message },
		}
	}
}

impl From<compass_domain::Error> for Error {
	fn from(err: compass_domain::Error) -> Self {
		match err {
			compass_domain::Error::InvalidValue { .. } =>
				Self::InvalidRequest { message: err.to_string() },
			compass_domain::Error::ReadTaxonomy { .. } | compass_domain::Error::ParseTaxonomy(_) =>
				Self::Taxonomy { message: err.to_string() },
		}
	}
}

impl From<color_eyre::Report> for Error {
	fn from(err: color_eyre::Report) -> Self {
		Self::Provider { message: err.to_string() }
	}
}
