use std::path::PathBuf;

use serde::Deserialize;
use serde_json::{Map, Value};

pub const MAX_PAGE_LIMIT: u32 = 10;

#[derive(Debug, Deserialize)]
pub struct Config {
	pub service: Service,
	pub storage: Storage,
	#[serde(default)]
	pub search: Search,
	#[serde(default)]
	pub taxonomy: Taxonomy,
	pub notifications: Notifications,
	#[serde(default)]
	pub worker: Worker,
	#[serde(default)]
	pub security: Security,
}

#[derive(Debug, Deserialize)]
pub struct Service {
	pub http_bind: String,
	pub log_level: String,
}

#[derive(Debug, Deserialize)]
pub struct Storage {
	pub postgres: Postgres,
}

#[derive(Debug, Deserialize)]
pub struct Postgres {
	pub dsn: String,
	pub pool_max_conns: u32,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Search {
	pub default_limit: u32,
	pub max_limit: u32,
	/// Minimum `strict_word_similarity` between a free-text query and a profile search string.
	pub profile_query_threshold: f32,
	/// Minimum weighted similarity for job search. Opening keywords weigh 4, job free text 2.
	pub job_query_threshold: f32,
	/// Minimum `word_similarity` for name, location and credential filters that miss as substrings.
	pub field_similarity_threshold: f32,
	/// Profile fields that must all be present before a profile shows up in open search.
	pub searchable_required_fields: Vec<String>,
}
impl Default for Search {
	fn default() -> Self {
		Self {
			default_limit: MAX_PAGE_LIMIT,
			max_limit: MAX_PAGE_LIMIT,
			profile_query_threshold: 0.3,
			job_query_threshold: 0.9,
			field_similarity_threshold: 0.5,
			searchable_required_fields: vec![
				"primary_activity".to_string(),
				"first_name".to_string(),
				"gender".to_string(),
			],
		}
	}
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Taxonomy {
	pub locale: String,
	/// Optional JSON file replacing the built-in activity table.
	pub path: Option<PathBuf>,
}
impl Default for Taxonomy {
	fn default() -> Self {
		Self { locale: "es".to_string(), path: None }
	}
}

#[derive(Debug, Deserialize)]
pub struct Notifications {
	#[serde(default = "default_true")]
	pub enabled: bool,
	pub email: ChannelConfig,
	pub whatsapp: ChannelConfig,
}

#[derive(Debug, Deserialize)]
pub struct ChannelConfig {
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub template: String,
	#[serde(default)]
	pub subject: Option<String>,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Worker {
	pub poll_interval_ms: u64,
	pub claim_lease_seconds: i64,
}
impl Default for Worker {
	fn default() -> Self {
		Self { poll_interval_ms: 500, claim_lease_seconds: 120 }
	}
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Security {
	pub bind_localhost_only: bool,
	pub api_auth_token: Option<String>,
}
impl Default for Security {
	fn default() -> Self {
		Self { bind_localhost_only: true, api_auth_token: None }
	}
}

fn default_true() -> bool {
	true
}
