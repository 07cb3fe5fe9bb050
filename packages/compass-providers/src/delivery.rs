use std::{collections::BTreeMap, time::Duration as StdDuration};

use color_eyre::{Result, eyre};
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;

use compass_config::ChannelConfig;

/// One rendered alert handed to a delivery gateway.
#[derive(Debug, Serialize)]
pub struct OutboundMessage<'a> {
	pub channel: &'a str,
	pub to: &'a str,
	pub template: &'a str,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub subject: Option<&'a str>,
	pub variables: &'a BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receipt {
	pub message_id: Option<String>,
}

/// Posts `message` to the gateway configured for its channel.
pub async fn send(cfg: &ChannelConfig, message: &OutboundMessage<'_>) -> Result<Receipt> {
	let client = Client::builder().timeout(StdDuration::from_millis(cfg.timeout_ms)).build()?;
	let url = format!("{}{}", cfg.api_base, cfg.path);
	let res = client
		.post(url)
		.headers(crate::gateway_headers(cfg)?)
		.json(message)
		.send()
		.await?;
	let json: Value = res.error_for_status()?.json().await?;

	parse_delivery_response(json)
}

fn parse_delivery_response(json: Value) -> Result<Receipt> {
	let status = json.get("status").and_then(|v| v.as_str()).unwrap_or("accepted");

	if matches!(status, "rejected" | "failed" | "error") {
		let reason = json
			.get("error")
			.or_else(|| json.get("message"))
			.and_then(|v| v.as_str())
			.unwrap_or("no reason given");

		return Err(eyre::eyre!("Delivery gateway {status} the message: {reason}."));
	}

	let message_id = json
		.get("id")
		.or_else(|| json.get("message_id"))
		.and_then(|v| v.as_str())
		.map(str::to_string);

	Ok(Receipt { message_id })
}
