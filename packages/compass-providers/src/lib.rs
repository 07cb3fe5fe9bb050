pub mod delivery;

use color_eyre::{Result, eyre};
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderName, HeaderValue};

use compass_config::ChannelConfig;

/// Request headers for one delivery gateway: bearer auth, JSON accept, then the channel's
/// configured extras. Extras may override the first two.
pub fn gateway_headers(cfg: &ChannelConfig) -> Result<HeaderMap> {
	let mut headers = HeaderMap::new();

	headers.insert(AUTHORIZATION, HeaderValue::from_str(&format!("Bearer {}", cfg.api_key))?);
	headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

	for (key, value) in &cfg.default_headers {
		let Some(raw) = value.as_str() else {
			return Err(eyre::eyre!("Header {key} for {} must be a string.", cfg.path));
		};

		headers.insert(HeaderName::from_bytes(key.as_bytes())?, HeaderValue::from_str(raw)?);
	}

	Ok(headers)
}
