use time::OffsetDateTime;
use uuid::Uuid;

/// A profile row. `full_name`, `location`, `search_string` and `searchable` are derived and only
/// written by the materializing write paths.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Profile {
	pub profile_id: Uuid,
	pub primary_email: String,
	pub profile_type: String,
	pub first_name: Option<String>,
	pub last_name: Option<String>,
	pub nick_name: Option<String>,
	pub full_name: Option<String>,
	pub gender: Option<String>,
	pub primary_activity: Option<String>,
	pub secondary_activity: Option<String>,
	pub third_activity: Option<String>,
	pub secondary_emails: Vec<String>,
	pub phone_numbers: Vec<String>,
	pub languages: Vec<String>,
	pub whatsapp: Option<String>,
	pub city: Option<String>,
	pub state: Option<String>,
	pub country: Option<String>,
	pub postal_code: Option<String>,
	pub location: String,
	pub university: Option<String>,
	pub associations: Option<String>,
	pub certifications: Option<String>,
	pub remote: bool,
	pub probono: bool,
	pub work_radius: Option<String>,
	pub subscriber: bool,
	pub recommendations_count: i32,
	pub searchable: bool,
	pub search_string: String,
	pub created_at: OffsetDateTime,
	pub updated_at: OffsetDateTime,
	pub deleted_at: Option<OffsetDateTime>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Account {
	pub email: String,
	pub profile_id: Uuid,
	pub contact_method: String,
	pub job_notifications: bool,
	pub created_at: OffsetDateTime,
	pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Job {
	pub job_id: Uuid,
	pub requester_email: String,
	pub contact_start_date: OffsetDateTime,
	pub contact_end_date: OffsetDateTime,
	pub contact_email: Option<String>,
	pub whatsapp: Option<String>,
	pub phone_numbers: Vec<String>,
	pub work_mode: String,
	pub work_radius: String,
	pub employment: String,
	pub description: String,
	pub special_requirements: Option<String>,
	pub benefits: Option<String>,
	pub notes: Option<String>,
	pub budget_low: Option<f64>,
	pub budget_high: Option<f64>,
	pub job_start_date: Option<OffsetDateTime>,
	pub job_end_date: Option<OffsetDateTime>,
	pub created_at: OffsetDateTime,
	pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct JobOpening {
	pub opening_id: Uuid,
	pub job_id: Uuid,
	pub activity: String,
	pub headcount: i32,
	pub probono: bool,
	pub gender: Option<String>,
	pub age_range_min: Option<i32>,
	pub age_range_max: Option<i32>,
	pub school: Option<String>,
	pub languages: Vec<String>,
	pub search_string: String,
	pub created_at: OffsetDateTime,
	pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct JobAlertOutboxEntry {
	pub outbox_id: Uuid,
	pub opening_id: Uuid,
	pub status: String,
	pub attempts: i32,
	pub last_error: Option<String>,
	pub available_at: OffsetDateTime,
	pub created_at: OffsetDateTime,
	pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct JobAlertDelivery {
	pub opening_id: Uuid,
	pub profile_id: Uuid,
	pub channel: String,
	pub address: String,
	pub status: String,
	pub last_error: Option<String>,
	pub created_at: OffsetDateTime,
	pub updated_at: OffsetDateTime,
}
