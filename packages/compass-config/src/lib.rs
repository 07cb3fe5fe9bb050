mod error;
mod types;

pub use error::{Error, Result};
pub use types::{
	ChannelConfig, Config, MAX_PAGE_LIMIT, Notifications, Postgres, Search, Security, Service,
	Storage, Taxonomy, Worker,
};

use std::{fs, path::Path};

pub const SEARCHABLE_FIELDS: [&str; 7] =
	["primary_activity", "first_name", "last_name", "gender", "city", "state", "country"];
pub const LOCALES: [&str; 2] = ["es", "en"];

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;
	let mut cfg: Config = toml::from_str(&raw)
		.map_err(|err| Error::ParseConfig { path: path.to_path_buf(), source: err })?;

	normalize(&mut cfg);

	validate(&cfg)?;

	Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
	if cfg.service.http_bind.trim().is_empty() {
		return Err(Error::Validation {
			message: "service.http_bind must be non-empty.".to_string(),
		});
	}
	if cfg.storage.postgres.dsn.trim().is_empty() {
		return Err(Error::Validation {
			message: "storage.postgres.dsn must be non-empty.".to_string(),
		});
	}
	if cfg.storage.postgres.pool_max_conns == 0 {
		return Err(Error::Validation {
			message: "storage.postgres.pool_max_conns must be greater than zero.".to_string(),
		});
	}

	validate_search(&cfg.search)?;

	if !LOCALES.contains(&cfg.taxonomy.locale.as_str()) {
		return Err(Error::Validation {
			message: "taxonomy.locale must be one of es or en.".to_string(),
		});
	}

	if cfg.notifications.enabled {
		for (label, channel) in
			[("email", &cfg.notifications.email), ("whatsapp", &cfg.notifications.whatsapp)]
		{
			validate_channel(label, channel)?;
		}
	}

	if cfg.worker.poll_interval_ms == 0 {
		return Err(Error::Validation {
			message: "worker.poll_interval_ms must be greater than zero.".to_string(),
		});
	}
	if cfg.worker.claim_lease_seconds <= 0 {
		return Err(Error::Validation {
			message: "worker.claim_lease_seconds must be greater than zero.".to_string(),
		});
	}

	Ok(())
}

fn validate_search(search: &Search) -> Result<()> {
	if !(1..=MAX_PAGE_LIMIT).contains(&search.max_limit) {
		return Err(Error::Validation {
			message: format!("search.max_limit must be in the range 1-{MAX_PAGE_LIMIT}."),
		});
	}
	if search.default_limit == 0 || search.default_limit > search.max_limit {
		return Err(Error::Validation {
			message: "search.default_limit must be between 1 and search.max_limit.".to_string(),
		});
	}

	for (label, value, max) in [
		("search.profile_query_threshold", search.profile_query_threshold, 1.0),
		("search.field_similarity_threshold", search.field_similarity_threshold, 1.0),
		("search.job_query_threshold", search.job_query_threshold, 6.0),
	] {
		if !value.is_finite() {
			return Err(Error::Validation { message: format!("{label} must be a finite number.") });
		}
		if !(0.0..=max).contains(&value) {
			return Err(Error::Validation {
				message: format!("{label} must be in the range 0.0-{max:.1}."),
			});
		}
	}

	if search.searchable_required_fields.is_empty() {
		return Err(Error::Validation {
			message: "search.searchable_required_fields must be non-empty.".to_string(),
		});
	}

	for field in &search.searchable_required_fields {
		if !SEARCHABLE_FIELDS.contains(&field.as_str()) {
			return Err(Error::Validation {
				message: format!(
					"search.searchable_required_fields contains unknown field '{field}'."
				),
			});
		}
	}

	Ok(())
}

fn validate_channel(label: &str, channel: &ChannelConfig) -> Result<()> {
	for (key, value) in [
		("api_base", &channel.api_base),
		("api_key", &channel.api_key),
		("template", &channel.template),
	] {
		if value.trim().is_empty() {
			return Err(Error::Validation {
				message: format!("notifications.{label}.{key} must be non-empty."),
			});
		}
	}

	if channel.timeout_ms == 0 {
		return Err(Error::Validation {
			message: format!("notifications.{label}.timeout_ms must be greater than zero."),
		});
	}

	Ok(())
}

fn normalize(cfg: &mut Config) {
	if cfg.security.api_auth_token.as_deref().map(|token| token.trim().is_empty()).unwrap_or(false)
	{
		cfg.security.api_auth_token = None;
	}
	if cfg
		.taxonomy
		.path
		.as_deref()
		.map(|path| path.as_os_str().to_string_lossy().trim().is_empty())
		.unwrap_or(false)
	{
		cfg.taxonomy.path = None;
	}

	cfg.taxonomy.locale = cfg.taxonomy.locale.trim().to_ascii_lowercase();

	for channel in [&mut cfg.notifications.email, &mut cfg.notifications.whatsapp] {
		if channel.subject.as_deref().map(|subject| subject.trim().is_empty()).unwrap_or(false) {
			channel.subject = None;
		}
	}
	for field in &mut cfg.search.searchable_required_fields {
		*field = field.trim().to_string();
	}
}
