use std::{collections::BTreeMap, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{
	Error, Result,
	job::{Place, WorkRadius},
	text,
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
	#[default]
	Email,
	Whatsapp,
}
impl Channel {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Email => "email",
			Self::Whatsapp => "whatsapp",
		}
	}
}
impl FromStr for Channel {
	type Err = Error;

	fn from_str(raw: &str) -> Result<Self> {
		match raw {
			"email" => Ok(Self::Email),
			"whatsapp" => Ok(Self::Whatsapp),
			other => Err(Error::InvalidValue {
				field: "contact_method",
				message: format!("'{other}' is not recognized."),
			}),
		}
	}
}

/// What the selector needs to know about one matched candidate.
#[derive(Debug, Clone, Copy)]
pub struct Recipient<'a> {
	pub account_email: &'a str,
	pub preferred: Channel,
	pub whatsapp: Option<&'a str>,
	pub phone_numbers: &'a [String],
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
	pub channel: Channel,
	pub address: String,
	/// True when the preferred channel had no usable address and email was used instead.
	pub fell_back: bool,
}

/// Picks the account's preferred channel. Messaging goes to the whatsapp handle, else the first
/// phone number; with neither on file the alert goes to the account email.
pub fn select_channel(recipient: &Recipient<'_>) -> Delivery {
	if recipient.preferred == Channel::Whatsapp {
		let first_phone = recipient.phone_numbers.first();
		let address =
			text::non_blank(recipient.whatsapp).or_else(|| text::non_blank(first_phone));

		if let Some(address) = address {
			return Delivery {
				channel: Channel::Whatsapp,
				address: address.to_string(),
				fell_back: false,
			};
		}

		return Delivery {
			channel: Channel::Email,
			address: recipient.account_email.to_string(),
			fell_back: true,
		};
	}

	Delivery {
		channel: Channel::Email,
		address: recipient.account_email.to_string(),
		fell_back: false,
	}
}

/// Nickname, else full name, else email.
pub fn display_name<'a>(
	nick_name: Option<&'a str>,
	full_name: Option<&'a str>,
	email: &'a str,
) -> &'a str {
	text::non_blank(nick_name).or_else(|| text::non_blank(full_name)).unwrap_or(email)
}

/// Inputs for one alert's template variables. `activity_title` is already resolved through the
/// taxonomy.
#[derive(Debug, Clone, Copy)]
pub struct AlertParts<'a> {
	pub requester_name: &'a str,
	pub requester_place: Place<'a>,
	pub radius: WorkRadius,
	pub activity_title: &'a str,
	pub headcount: i32,
	pub opening_id: &'a str,
	pub recipient_name: &'a str,
}

pub fn alert_variables(parts: &AlertParts<'_>) -> BTreeMap<String, String> {
	BTreeMap::from([
		("requester".to_string(), parts.requester_name.to_string()),
		("location".to_string(), parts.radius.location_label(&parts.requester_place)),
		("activity".to_string(), parts.activity_title.to_string()),
		("headcount".to_string(), parts.headcount.to_string()),
		("opening_id".to_string(), parts.opening_id.to_string()),
		("recipient".to_string(), parts.recipient_name.to_string()),
	])
}
