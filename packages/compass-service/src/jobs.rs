use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{CompassService, Error, Result, profiles::known_activity};
use compass_domain::{
	job::{
		self, Employment, MAX_AGE, MAX_DESCRIPTION_CHARS, MAX_OPENINGS_PER_JOB, WorkMode,
		WorkRadius,
	},
	profile::{Gender, Language},
	taxonomy::ActivityTaxonomy,
};
use compass_storage::{
	accounts,
	jobs as job_store,
	models::{Job, JobOpening},
	outbox,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateJobRequest {
	pub requester_email: String,
	#[serde(with = "time::serde::rfc3339")]
	pub contact_start_date: OffsetDateTime,
	#[serde(with = "time::serde::rfc3339")]
	pub contact_end_date: OffsetDateTime,
	#[serde(default)]
	pub contact_email: Option<String>,
	#[serde(default)]
	pub whatsapp: Option<String>,
	#[serde(default)]
	pub phone_numbers: Vec<String>,
	pub work_mode: WorkMode,
	pub work_radius: WorkRadius,
	pub employment: Employment,
	pub description: String,
	#[serde(default)]
	pub special_requirements: Option<String>,
	#[serde(default)]
	pub benefits: Option<String>,
	#[serde(default)]
	pub notes: Option<String>,
	#[serde(default)]
	pub budget_low: Option<f64>,
	#[serde(default)]
	pub budget_high: Option<f64>,
	#[serde(default, with = "time::serde::rfc3339::option")]
	pub job_start_date: Option<OffsetDateTime>,
	#[serde(default, with = "time::serde::rfc3339::option")]
	pub job_end_date: Option<OffsetDateTime>,
	pub openings: Vec<OpeningInput>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpeningInput {
	pub activity: String,
	#[serde(default = "default_headcount")]
	pub headcount: i32,
	#[serde(default)]
	pub probono: bool,
	#[serde(default)]
	pub gender: Option<Gender>,
	#[serde(default)]
	pub age_range_min: Option<i32>,
	#[serde(default)]
	pub age_range_max: Option<i32>,
	#[serde(default)]
	pub school: Option<String>,
	/// `lang:proficiency` pairs.
	#[serde(default)]
	pub languages: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateJobResponse {
	pub job_id: Uuid,
	pub opening_ids: Vec<Uuid>,
}

/// Partial opening update. A blank `gender` or `school` clears it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OpeningPatch {
	pub activity: Option<String>,
	pub headcount: Option<i32>,
	pub probono: Option<bool>,
	pub gender: Option<String>,
	pub age_range_min: Option<i32>,
	pub age_range_max: Option<i32>,
	pub school: Option<String>,
	pub languages: Option<Vec<String>>,
}

/// An opening row joined with its job, as returned by job search.
#[derive(Debug, Clone, sqlx::FromRow)]
pub(crate) struct JobOpeningHit {
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
	pub created_at: OffsetDateTime,
	pub requester_email: String,
	pub contact_start_date: OffsetDateTime,
	pub contact_end_date: OffsetDateTime,
	pub work_mode: String,
	pub work_radius: String,
	pub employment: String,
	pub description: String,
	pub benefits: Option<String>,
	pub notes: Option<String>,
	pub special_requirements: Option<String>,
	pub budget_low: Option<f64>,
	pub budget_high: Option<f64>,
	pub job_start_date: Option<OffsetDateTime>,
	pub job_end_date: Option<OffsetDateTime>,
}
impl JobOpeningHit {
	fn new(opening: JobOpening, job: Job) -> Self {
		Self {
			opening_id: opening.opening_id,
			job_id: opening.job_id,
			activity: opening.activity,
			headcount: opening.headcount,
			probono: opening.probono,
			gender: opening.gender,
			age_range_min: opening.age_range_min,
			age_range_max: opening.age_range_max,
			school: opening.school,
			languages: opening.languages,
			created_at: opening.created_at,
			requester_email: job.requester_email,
			contact_start_date: job.contact_start_date,
			contact_end_date: job.contact_end_date,
			work_mode: job.work_mode,
			work_radius: job.work_radius,
			employment: job.employment,
			description: job.description,
			benefits: job.benefits,
			notes: job.notes,
			special_requirements: job.special_requirements,
			budget_low: job.budget_low,
			budget_high: job.budget_high,
			job_start_date: job.job_start_date,
			job_end_date: job.job_end_date,
		}
	}
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpeningView {
	pub opening_id: Uuid,
	pub job_id: Uuid,
	pub activity: String,
	/// Activity title in the configured locale, gendered when the opening asks for a gender.
	pub activity_title: Option<String>,
	pub headcount: i32,
	pub probono: bool,
	pub gender: Option<String>,
	pub age_range_min: Option<i32>,
	pub age_range_max: Option<i32>,
	pub school: Option<String>,
	pub languages: Vec<String>,
	pub requester_email: String,
	#[serde(with = "time::serde::rfc3339")]
	pub contact_start_date: OffsetDateTime,
	#[serde(with = "time::serde::rfc3339")]
	pub contact_end_date: OffsetDateTime,
	pub work_mode: String,
	pub work_radius: String,
	pub employment: String,
	pub description: String,
	pub benefits: Option<String>,
	pub notes: Option<String>,
	pub special_requirements: Option<String>,
	pub budget_low: Option<f64>,
	pub budget_high: Option<f64>,
	#[serde(with = "time::serde::rfc3339::option")]
	pub job_start_date: Option<OffsetDateTime>,
	#[serde(with = "time::serde::rfc3339::option")]
	pub job_end_date: Option<OffsetDateTime>,
	#[serde(with = "time::serde::rfc3339")]
	pub created_at: OffsetDateTime,
}
impl OpeningView {
	pub(crate) fn from_hit(hit: JobOpeningHit, taxonomy: &dyn ActivityTaxonomy) -> Self {
		let gender = hit.gender.as_deref().and_then(|gender| gender.parse::<Gender>().ok());
		let activity_title = taxonomy.resolve(&hit.activity, gender);

		Self {
			opening_id: hit.opening_id,
			job_id: hit.job_id,
			activity: hit.activity,
			activity_title,
			headcount: hit.headcount,
			probono: hit.probono,
			gender: hit.gender,
			age_range_min: hit.age_range_min,
			age_range_max: hit.age_range_max,
			school: hit.school,
			languages: hit.languages,
			requester_email: hit.requester_email,
			contact_start_date: hit.contact_start_date,
			contact_end_date: hit.contact_end_date,
			work_mode: hit.work_mode,
			work_radius: hit.work_radius,
			employment: hit.employment,
			description: hit.description,
			benefits: hit.benefits,
			notes: hit.notes,
			special_requirements: hit.special_requirements,
			budget_low: hit.budget_low,
			budget_high: hit.budget_high,
			job_start_date: hit.job_start_date,
			job_end_date: hit.job_end_date,
			created_at: hit.created_at,
		}
	}
}

impl CompassService {
	/// Writes the job, its openings and one alert outbox row per opening in a single transaction.
	/// Alerts go out only after the worker claims those rows.
	pub async fn create_job(&self, req: CreateJobRequest) -> Result<CreateJobResponse> {
		let now = OffsetDateTime::now_utc();
		let job = build_job(&req, Uuid::new_v4(), now)?;
		let openings = req
			.openings
			.iter()
			.map(|input| build_opening(input, job.job_id, self.taxonomy.as_ref(), now))
			.collect::<Result<Vec<_>>>()?;

		if accounts::get_account(&self.db.pool, &job.requester_email).await?.is_none() {
			return Err(Error::not_found(format!(
				"Account {} does not exist.",
				job.requester_email
			)));
		}

		let mut tx = self.db.pool.begin().await?;

		job_store::insert_job(&mut *tx, &job).await?;

		for opening in &openings {
			job_store::insert_opening(&mut *tx, opening).await?;
			outbox::enqueue_job_alert(&mut *tx, opening.opening_id, now).await?;
		}

		tx.commit().await?;

		tracing::info!(job_id = %job.job_id, openings = openings.len(), "Job created.");

		Ok(CreateJobResponse {
			job_id: job.job_id,
			opening_ids: openings.iter().map(|opening| opening.opening_id).collect(),
		})
	}

	/// Patches an opening owned by `requester_email` and recomputes its search text.
	pub async fn update_opening(
		&self,
		opening_id: Uuid,
		requester_email: &str,
		patch: OpeningPatch,
	) -> Result<OpeningView> {
		let now = OffsetDateTime::now_utc();
		let mut tx = self.db.pool.begin().await?;
		let Some(mut opening) = job_store::lock_opening(&mut *tx, opening_id).await? else {
			return Err(Error::not_found(format!("Opening {opening_id} does not exist.")));
		};
		let Some(job) = job_store::get_job(&mut *tx, opening.job_id).await? else {
			return Err(Error::not_found(format!("Job {} does not exist.", opening.job_id)));
		};

		ensure_owner(&job, requester_email)?;
		apply_opening_patch(&mut opening, patch, self.taxonomy.as_ref())?;

		opening.updated_at = now;

		job_store::update_opening(&mut *tx, &opening).await?;

		tx.commit().await?;

		tracing::info!(opening_id = %opening_id, "Opening updated.");

		Ok(OpeningView::from_hit(JobOpeningHit::new(opening, job), self.taxonomy.as_ref()))
	}

	pub async fn get_opening(&self, opening_id: Uuid) -> Result<OpeningView> {
		let (opening, job) = self.load_opening(opening_id).await?;

		Ok(OpeningView::from_hit(JobOpeningHit::new(opening, job), self.taxonomy.as_ref()))
	}

	pub(crate) async fn load_opening(&self, opening_id: Uuid) -> Result<(JobOpening, Job)> {
		let Some(opening) = job_store::get_opening(&self.db.pool, opening_id).await? else {
			return Err(Error::not_found(format!("Opening {opening_id} does not exist.")));
		};
		let Some(job) = job_store::get_job(&self.db.pool, opening.job_id).await? else {
			return Err(Error::not_found(format!("Job {} does not exist.", opening.job_id)));
		};

		Ok((opening, job))
	}
}

pub(crate) fn ensure_owner(job: &Job, requester_email: &str) -> Result<()> {
	if !job.requester_email.eq_ignore_ascii_case(requester_email.trim()) {
		return Err(Error::Forbidden {
			message: format!("Job {} belongs to another account.", job.job_id),
		});
	}

	Ok(())
}

fn default_headcount() -> i32 {
	1
}

fn build_job(req: &CreateJobRequest, job_id: Uuid, now: OffsetDateTime) -> Result<Job> {
	let requester_email = req.requester_email.trim().to_lowercase();
	let Some(description) = crate::clean(Some(&req.description)) else {
		return Err(Error::invalid("description is required."));
	};

	if requester_email.is_empty() {
		return Err(Error::invalid("requester_email is required."));
	}
	if description.chars().count() > MAX_DESCRIPTION_CHARS {
		return Err(Error::invalid(format!(
			"description must be at most {MAX_DESCRIPTION_CHARS} characters."
		)));
	}
	if req.openings.is_empty() || req.openings.len() > MAX_OPENINGS_PER_JOB {
		return Err(Error::invalid(format!(
			"A job must have between 1 and {MAX_OPENINGS_PER_JOB} openings."
		)));
	}
	if req.contact_start_date > req.contact_end_date {
		return Err(Error::invalid("contact_start_date must not be after contact_end_date."));
	}
	if let (Some(start), Some(end)) = (req.job_start_date, req.job_end_date)
		&& start > end
	{
		return Err(Error::invalid("job_start_date must not be after job_end_date."));
	}

	validate_budget(req.budget_low, req.budget_high)?;

	let contact_email = crate::clean(req.contact_email.as_deref());
	let whatsapp = crate::clean(req.whatsapp.as_deref());
	let phone_numbers = crate::clean_list(&req.phone_numbers);

	if contact_email.is_none() && whatsapp.is_none() && phone_numbers.is_empty() {
		return Err(Error::invalid(
			"At least one of contact_email, whatsapp or phone_numbers is required.",
		));
	}

	Ok(Job {
		job_id,
		requester_email,
		contact_start_date: req.contact_start_date,
		contact_end_date: req.contact_end_date,
		contact_email,
		whatsapp,
		phone_numbers,
		work_mode: req.work_mode.as_str().to_string(),
		work_radius: req.work_radius.as_str().to_string(),
		employment: req.employment.as_str().to_string(),
		description,
		special_requirements: crate::clean(req.special_requirements.as_deref()),
		benefits: crate::clean(req.benefits.as_deref()),
		notes: crate::clean(req.notes.as_deref()),
		budget_low: req.budget_low,
		budget_high: req.budget_high,
		job_start_date: req.job_start_date,
		job_end_date: req.job_end_date,
		created_at: now,
		updated_at: now,
	})
}

fn validate_budget(low: Option<f64>, high: Option<f64>) -> Result<()> {
	for (name, value) in [("budget_low", low), ("budget_high", high)] {
		if let Some(value) = value
			&& (!value.is_finite() || value < 0.0)
		{
			return Err(Error::invalid(format!("{name} must be a non-negative number.")));
		}
	}

	if let (Some(low), Some(high)) = (low, high)
		&& low > high
	{
		return Err(Error::invalid("budget_low must not exceed budget_high."));
	}

	Ok(())
}

fn build_opening(
	input: &OpeningInput,
	job_id: Uuid,
	taxonomy: &dyn ActivityTaxonomy,
	now: OffsetDateTime,
) -> Result<JobOpening> {
	let activity = known_activity(&input.activity, taxonomy)?;
	let opening = JobOpening {
		opening_id: Uuid::new_v4(),
		job_id,
		search_string: job::opening_search_string(&activity, taxonomy),
		activity,
		headcount: input.headcount,
		probono: input.probono,
		gender: input.gender.map(|gender| gender.as_str().to_string()),
		age_range_min: input.age_range_min,
		age_range_max: input.age_range_max,
		school: crate::clean(input.school.as_deref()),
		languages: language_pairs(&input.languages)?,
		created_at: now,
		updated_at: now,
	};

	validate_opening(&opening)?;

	Ok(opening)
}

fn apply_opening_patch(
	opening: &mut JobOpening,
	patch: OpeningPatch,
	taxonomy: &dyn ActivityTaxonomy,
) -> Result<()> {
	if let Some(activity) = patch.activity {
		opening.activity = known_activity(&activity, taxonomy)?;
		opening.search_string = job::opening_search_string(&opening.activity, taxonomy);
	}
	if let Some(headcount) = patch.headcount {
		opening.headcount = headcount;
	}
	if let Some(probono) = patch.probono {
		opening.probono = probono;
	}
	if let Some(gender) = patch.gender {
		opening.gender = crate::clean(Some(&gender))
			.map(|gender| gender.parse::<Gender>().map(|gender| gender.as_str().to_string()))
			.transpose()?;
	}
	if let Some(min) = patch.age_range_min {
		opening.age_range_min = Some(min);
	}
	if let Some(max) = patch.age_range_max {
		opening.age_range_max = Some(max);
	}
	if let Some(school) = patch.school {
		opening.school = crate::clean(Some(&school));
	}
	if let Some(languages) = patch.languages {
		opening.languages = language_pairs(&languages)?;
	}

	validate_opening(opening)
}

fn validate_opening(opening: &JobOpening) -> Result<()> {
	if opening.headcount < 1 {
		return Err(Error::invalid("headcount must be at least 1."));
	}

	let ages = [("age_range_min", opening.age_range_min), ("age_range_max", opening.age_range_max)];

	for (name, age) in ages {
		if let Some(age) = age
			&& !(0..=MAX_AGE).contains(&age)
		{
			return Err(Error::invalid(format!("{name} must be between 0 and {MAX_AGE}.")));
		}
	}

	if let (Some(min), Some(max)) = (opening.age_range_min, opening.age_range_max)
		&& min > max
	{
		return Err(Error::invalid("age_range_min must not exceed age_range_max."));
	}

	Ok(())
}

fn language_pairs(raw: &[String]) -> Result<Vec<String>> {
	let pairs = crate::clean_list(raw)
		.iter()
		.map(|pair| Language::parse_pair(pair).map(|language| language.to_pair()))
		.collect::<compass_domain::Result<Vec<_>>>()?;

	Ok(pairs)
}
