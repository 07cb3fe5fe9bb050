pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Invalid {field}: {message}")]
	InvalidValue { field: &'static str, message: String },
	#[error("Failed to read taxonomy file at {path:?}.")]
	ReadTaxonomy { path: std::path::PathBuf, source: std::io::Error },
	#[error("Taxonomy document is malformed: {0}")]
	ParseTaxonomy(#[from] serde_json::Error),
}
