pub mod accounts;
pub mod alerts;
pub mod applicants;
pub mod jobs;
pub mod matching;
pub mod profiles;
pub mod recommend;
pub mod search;

mod error;

pub use accounts::{PreferencesRequest, PreferencesResponse};
pub use alerts::FanOutReport;
pub use applicants::{ApplicantsRequest, ApplicantsResponse, ApplyRequest, ApplyResponse};
pub use error::{ConflictCode, Error, Result};
pub use jobs::{CreateJobRequest, CreateJobResponse, OpeningInput, OpeningPatch, OpeningView};
pub use matching::Candidate;
pub use profiles::{CreateProfileRequest, FieldValuesResponse, ProfilePatch, ProfileView};
pub use recommend::RecommendationResponse;
pub use search::{
	JobSearchFilter, JobSearchRequest, JobSearchResponse, ProfileSearchRequest,
	ProfileSearchResponse, SearchFilter,
};

use std::{collections::BTreeMap, future::Future, pin::Pin, sync::Arc};

use compass_config::{ChannelConfig, Config};
use compass_domain::{
	contact::Channel,
	profile::SearchableRule,
	taxonomy::{ActivityTaxonomy, StaticTaxonomy},
};
use compass_providers::delivery::{self, OutboundMessage};
use compass_storage::db::Db;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// One rendered alert for one recipient.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
	pub channel: Channel,
	pub address: String,
	pub template: String,
	pub subject: Option<String>,
	pub variables: BTreeMap<String, String>,
}

/// Hands a rendered alert to whatever actually delivers it.
pub trait NotificationTransport
where
	Self: Send + Sync,
{
	fn send<'a>(
		&'a self,
		cfg: &'a ChannelConfig,
		notification: &'a Notification,
	) -> BoxFuture<'a, color_eyre::Result<()>>;
}

struct GatewayTransport;
impl NotificationTransport for GatewayTransport {
	fn send<'a>(
		&'a self,
		cfg: &'a ChannelConfig,
		notification: &'a Notification,
	) -> BoxFuture<'a, color_eyre::Result<()>> {
		Box::pin(async move {
			let message = OutboundMessage {
				channel: notification.channel.as_str(),
				to: notification.address.as_str(),
				template: notification.template.as_str(),
				subject: notification.subject.as_deref(),
				variables: &notification.variables,
			};
			let receipt = delivery::send(cfg, &message).await?;

			tracing::debug!(
				channel = notification.channel.as_str(),
				message_id = receipt.message_id.as_deref().unwrap_or("-"),
				"Delivery gateway accepted alert."
			);

			Ok(())
		})
	}
}

pub struct CompassService {
	pub cfg: Config,
	pub db: Db,
	pub taxonomy: Arc<dyn ActivityTaxonomy>,
	pub transport: Arc<dyn NotificationTransport>,
	searchable_rule: SearchableRule,
}
impl CompassService {
	/// Builds the service with the configured taxonomy and the HTTP delivery gateway.
	pub fn new(cfg: Config, db: Db) -> Result<Self> {
		let taxonomy = match cfg.taxonomy.path.as_deref() {
			Some(path) => StaticTaxonomy::from_path(path, &cfg.taxonomy.locale)?,
			None => StaticTaxonomy::builtin(&cfg.taxonomy.locale)?,
		};

		if taxonomy.is_empty() {
			tracing::warn!("Activity taxonomy has no entries. Activity titles will not resolve.");
		} else {
			tracing::info!(
				activities = taxonomy.len(),
				locale = %cfg.taxonomy.locale,
				"Activity taxonomy loaded."
			);
		}

		Self::with_parts(cfg, db, Arc::new(taxonomy), Arc::new(GatewayTransport))
	}

	pub fn with_parts(
		cfg: Config,
		db: Db,
		taxonomy: Arc<dyn ActivityTaxonomy>,
		transport: Arc<dyn NotificationTransport>,
	) -> Result<Self> {
		let searchable_rule = SearchableRule::from_names(&cfg.search.searchable_required_fields)?;

		Ok(Self { cfg, db, taxonomy, transport, searchable_rule })
	}

	pub(crate) fn channel_config(&self, channel: Channel) -> &ChannelConfig {
		match channel {
			Channel::Email => &self.cfg.notifications.email,
			Channel::Whatsapp => &self.cfg.notifications.whatsapp,
		}
	}
}

/// Trims and drops blank strings, keeping the first occurrence of each value.
pub(crate) fn clean_list(values: &[String]) -> Vec<String> {
	let mut out: Vec<String> = Vec::with_capacity(values.len());

	for value in values {
		let value = value.trim();

		if !value.is_empty() && !out.iter().any(|existing| existing == value) {
			out.push(value.to_string());
		}
	}

	out
}

pub(crate) fn clean(value: Option<&str>) -> Option<String> {
	compass_domain::text::non_blank(value).map(str::to_string)
}
