use std::{
	collections::HashSet,
	sync::{Arc, Mutex},
};

use time::macros::datetime;
use uuid::Uuid;

use compass_config::{ChannelConfig, Config};
use compass_domain::{
	contact::Channel,
	job::{Employment, WorkMode, WorkRadius},
	profile::ProfileType,
	taxonomy::StaticTaxonomy,
};
use compass_service::{
	ApplyRequest, BoxFuture, CompassService, ConflictCode, CreateJobRequest, CreateProfileRequest,
	Error, JobSearchFilter, JobSearchRequest, Notification, NotificationTransport, OpeningInput,
	PreferencesRequest, ProfilePatch, ProfileSearchRequest, ProfileView, SearchFilter,
};
use compass_storage::{db::Db, deliveries};
use compass_testkit::TestDatabase;

const CONFIG_TOML: &str = r#"
[service]
http_bind = "127.0.0.1:8080"
log_level = "info"

[storage.postgres]
dsn            = "__DSN__"
pool_max_conns = 4

[notifications.email]
api_base   = "http://127.0.0.1:9"
api_key    = "email-key"
path       = "/v1/email"
template   = "job-alert"
subject    = "Nueva vacante para ti"
timeout_ms = 1000

[notifications.whatsapp]
api_base   = "http://127.0.0.1:9"
api_key    = "whatsapp-key"
path       = "/v1/whatsapp"
template   = "job_alert_v1"
timeout_ms = 1000
"#;

/// Records every alert and fails the ones addressed to `fail_address`.
#[derive(Default)]
struct SpyTransport {
	sent: Mutex<Vec<Notification>>,
	fail_address: Option<String>,
}
impl SpyTransport {
	fn failing_for(address: &str) -> Self {
		Self { sent: Mutex::new(Vec::new()), fail_address: Some(address.to_string()) }
	}

	fn sent(&self) -> Vec<Notification> {
		self.sent.lock().expect("Spy lock must not be poisoned.").clone()
	}
}
impl NotificationTransport for SpyTransport {
	fn send<'a>(
		&'a self,
		_cfg: &'a ChannelConfig,
		notification: &'a Notification,
	) -> BoxFuture<'a, color_eyre::Result<()>> {
		Box::pin(async move {
			if self.fail_address.as_deref() == Some(notification.address.as_str()) {
				return Err(color_eyre::eyre::eyre!("Gateway rejected {}.", notification.address));
			}

			self.sent.lock().expect("Spy lock must not be poisoned.").push(notification.clone());

			Ok(())
		})
	}
}

async fn bootstrap(test_db: &TestDatabase, transport: Arc<SpyTransport>) -> CompassService {
	let cfg: Config = toml::from_str(&test_db.render_config(CONFIG_TOML))
		.expect("Failed to parse test config.");
	let db = Db::connect(&cfg.storage.postgres).await.expect("Failed to connect to Postgres.");

	db.ensure_schema().await.expect("Failed to ensure schema.");

	let taxonomy = StaticTaxonomy::builtin("es").expect("Builtin taxonomy must parse.");

	CompassService::with_parts(cfg, db, Arc::new(taxonomy), transport)
		.expect("Failed to build service.")
}

fn person(first_name: &str, activity: &str, city: &str, state: &str) -> ProfilePatch {
	ProfilePatch {
		first_name: Some(first_name.to_string()),
		gender: Some("female".to_string()),
		primary_activity: Some(activity.to_string()),
		city: Some(city.to_string()),
		state: Some(state.to_string()),
		country: Some("MX".to_string()),
		..Default::default()
	}
}

async fn seed(service: &CompassService, email: &str, patch: ProfilePatch) -> ProfileView {
	let created = service
		.create_profile(CreateProfileRequest {
			email: email.to_string(),
			profile_type: ProfileType::Individual,
		})
		.await
		.expect("Failed to create profile.");

	service.update_profile(created.profile_id, patch).await.expect("Failed to update profile.")
}

fn job_request(requester_email: &str, mode: WorkMode, radius: WorkRadius) -> CreateJobRequest {
	CreateJobRequest {
		requester_email: requester_email.to_string(),
		contact_start_date: datetime!(2026-03-01 00:00 UTC),
		contact_end_date: datetime!(2026-03-31 00:00 UTC),
		contact_email: Some(requester_email.to_string()),
		whatsapp: None,
		phone_numbers: Vec::new(),
		work_mode: mode,
		work_radius: radius,
		employment: Employment::Freelance,
		description: "Retratos para catálogo de temporada.".to_string(),
		special_requirements: None,
		benefits: None,
		notes: None,
		budget_low: None,
		budget_high: None,
		job_start_date: None,
		job_end_date: None,
		openings: vec![OpeningInput {
			activity: "203-04".to_string(),
			headcount: 2,
			probono: false,
			gender: None,
			age_range_min: None,
			age_range_max: None,
			school: None,
			languages: Vec::new(),
		}],
	}
}

fn filter(activity: Option<&str>, location: Option<&str>) -> SearchFilter {
	SearchFilter {
		activity: activity.map(str::to_string),
		location: location.map(str::to_string),
		..Default::default()
	}
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set COMPASS_PG_DSN to run."]
async fn activity_prefix_and_location_narrow_profiles() {
	let Some(base_dsn) = compass_testkit::env_dsn() else {
		eprintln!("Skipping activity_prefix_and_location_narrow_profiles; set COMPASS_PG_DSN.");

		return;
	};
	let test_db = TestDatabase::new(&base_dsn).await.expect("Failed to create test database.");
	let service = bootstrap(&test_db, Arc::new(SpyTransport::default())).await;
	let first = seed(&service, "ana@example.mx", person("Ana", "203-04", "Guadalajara", "Jalisco"))
		.await;

	seed(&service, "bea@example.mx", person("Bea", "203-04", "Monterrey", "Nuevo León")).await;
	seed(&service, "cata@example.mx", person("Cata", "101-01", "Guadalajara", "Jalisco")).await;

	let response = service
		.search_profiles(ProfileSearchRequest {
			filter: filter(Some("203"), Some("Guadalajara")),
			..Default::default()
		})
		.await
		.expect("Search must succeed.");

	assert_eq!(response.total, 1);
	assert_eq!(response.items[0].profile_id, first.profile_id);

	let by_prefix = service
		.search_profiles(ProfileSearchRequest {
			filter: filter(Some("20"), None),
			..Default::default()
		})
		.await
		.expect("Search must succeed.");

	assert_eq!(by_prefix.total, 2);

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set COMPASS_PG_DSN to run."]
async fn pages_partition_the_result_set() {
	let Some(base_dsn) = compass_testkit::env_dsn() else {
		eprintln!("Skipping pages_partition_the_result_set; set COMPASS_PG_DSN to run.");

		return;
	};
	let test_db = TestDatabase::new(&base_dsn).await.expect("Failed to create test database.");
	let service = bootstrap(&test_db, Arc::new(SpyTransport::default())).await;

	for idx in 0..5 {
		seed(
			&service,
			&format!("perfil{idx}@example.mx"),
			person("Ana", "203-04", "Guadalajara", "Jalisco"),
		)
		.await;
	}

	let mut seen = HashSet::new();

	for offset in [0, 2, 4] {
		let page = service
			.search_profiles(ProfileSearchRequest {
				filter: filter(Some("203-04"), None),
				limit: Some(2),
				offset: Some(offset),
				explain: false,
			})
			.await
			.expect("Search must succeed.");

		assert_eq!(page.total, 5);

		for item in page.items {
			assert!(seen.insert(item.profile_id), "Pages must not overlap.");
		}
	}

	assert_eq!(seen.len(), 5);

	let beyond = service
		.search_profiles(ProfileSearchRequest {
			filter: filter(Some("203-04"), None),
			offset: Some(50),
			..Default::default()
		})
		.await
		.expect("Search past the end must succeed.");

	assert_eq!(beyond.total, 5);
	assert!(beyond.items.is_empty());

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set COMPASS_PG_DSN to run."]
async fn incomplete_profiles_only_surface_by_email() {
	let Some(base_dsn) = compass_testkit::env_dsn() else {
		eprintln!("Skipping incomplete_profiles_only_surface_by_email; set COMPASS_PG_DSN to run.");

		return;
	};
	let test_db = TestDatabase::new(&base_dsn).await.expect("Failed to create test database.");
	let service = bootstrap(&test_db, Arc::new(SpyTransport::default())).await;
	let mut patch = person("Dora", "203-04", "Guadalajara", "Jalisco");

	patch.gender = None;
	patch.secondary_emails = Some(vec!["dora@estudio.mx".to_string()]);

	let hidden = seed(&service, "dora@example.mx", patch).await;
	let mut other = person("Eva", "203-04", "Guadalajara", "Jalisco");

	other.gender = None;

	seed(&service, "eva@otro.mx", other).await;

	let visible =
		seed(&service, "ana@example.mx", person("Ana", "203-04", "Guadalajara", "Jalisco")).await;

	assert!(!hidden.searchable);

	let open = service
		.search_profiles(ProfileSearchRequest::default())
		.await
		.expect("Search must succeed.");

	assert_eq!(open.total, 1);
	assert_eq!(open.items[0].profile_id, visible.profile_id);

	let by_email = |email: &str| ProfileSearchRequest {
		filter: SearchFilter { email: Some(email.to_string()), ..Default::default() },
		..Default::default()
	};

	for partial in ["@", ".", "dora@"] {
		let response =
			service.search_profiles(by_email(partial)).await.expect("Search must succeed.");

		assert!(
			response.items.iter().all(|item| item.searchable),
			"Partial email {partial} must not reveal incomplete profiles."
		);
	}

	for exact in ["Dora@Example.MX", "dora@estudio.mx"] {
		let response =
			service.search_profiles(by_email(exact)).await.expect("Search must succeed.");

		assert_eq!(response.total, 1);
		assert_eq!(response.items[0].profile_id, hidden.profile_id);
	}

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set COMPASS_PG_DSN to run."]
async fn job_search_filters_openings_and_their_requesters() {
	let Some(base_dsn) = compass_testkit::env_dsn() else {
		eprintln!(
			"Skipping job_search_filters_openings_and_their_requesters; set COMPASS_PG_DSN to run."
		);

		return;
	};
	let test_db = TestDatabase::new(&base_dsn).await.expect("Failed to create test database.");
	let service = bootstrap(&test_db, Arc::new(SpyTransport::default())).await;
	let luz =
		seed(&service, "estudio@luz.mx", person("Luz", "090-12", "Guadalajara", "Jalisco")).await;

	seed(&service, "taller@norte.mx", person("Nora", "090-12", "Monterrey", "Nuevo León")).await;

	let photo = service
		.create_job(job_request("estudio@luz.mx", WorkMode::Hybrid, WorkRadius::Local))
		.await
		.expect("Job must be created.");
	let mut mural = job_request("taller@norte.mx", WorkMode::InPerson, WorkRadius::State);

	mural.employment = Employment::Determinate;
	mural.description = "Murales para una cafetería.".to_string();
	mural.openings[0].activity = "204-02".to_string();

	let mural = service.create_job(mural).await.expect("Job must be created.");
	let jobs = &service;
	let search = move |filter: JobSearchFilter| async move {
		jobs.search_jobs(JobSearchRequest { filter, ..Default::default() })
			.await
			.expect("Job search must succeed.")
	};
	let common = |common: SearchFilter| JobSearchFilter { common, ..Default::default() };

	assert_eq!(search(JobSearchFilter::default()).await.total, 2);

	let by_query = search(common(SearchFilter {
		query: Some("fotografo".to_string()),
		..Default::default()
	}))
	.await;

	assert_eq!(by_query.total, 1);
	assert_eq!(by_query.items[0].opening_id, photo.opening_ids[0]);
	assert_eq!(by_query.items[0].activity_title.as_deref(), Some("Fotografía"));
	assert_eq!(by_query.items[0].requester_email, "estudio@luz.mx");

	let remote_photo = search(common(SearchFilter {
		activity: Some("203".to_string()),
		remote: Some(true),
		..Default::default()
	}))
	.await;

	assert_eq!(remote_photo.total, 1);
	assert_eq!(remote_photo.items[0].work_mode, "hybrid");

	let remote_mural = search(common(SearchFilter {
		activity: Some("204".to_string()),
		remote: Some(true),
		..Default::default()
	}))
	.await;

	assert_eq!(remote_mural.total, 0);

	let by_requester = search(common(SearchFilter {
		location: Some("Guadalajara".to_string()),
		name: Some("Luz".to_string()),
		..Default::default()
	}))
	.await;

	assert_eq!(by_requester.total, 1);
	assert_eq!(by_requester.items[0].opening_id, photo.opening_ids[0]);

	let by_employment = search(JobSearchFilter {
		employment: Some("determinate".to_string()),
		..Default::default()
	})
	.await;

	assert_eq!(by_employment.total, 1);
	assert_eq!(by_employment.items[0].opening_id, mural.opening_ids[0]);

	let by_id = search(JobSearchFilter {
		requester_id: Some(luz.profile_id.to_string()),
		..Default::default()
	})
	.await;

	assert_eq!(by_id.total, 1);
	assert_eq!(by_id.items[0].requester_email, "estudio@luz.mx");

	let mut seen = HashSet::new();

	for offset in [0, 1] {
		let page = service
			.search_jobs(JobSearchRequest {
				filter: JobSearchFilter::default(),
				limit: Some(1),
				offset: Some(offset),
				explain: false,
			})
			.await
			.expect("Job search must succeed.");

		assert_eq!(page.total, 2);
		assert_eq!(page.items.len(), 1);
		assert!(seen.insert(page.items[0].opening_id), "Pages must not overlap.");
	}

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set COMPASS_PG_DSN to run."]
async fn wider_radius_never_loses_candidates() {
	let Some(base_dsn) = compass_testkit::env_dsn() else {
		eprintln!("Skipping wider_radius_never_loses_candidates; set COMPASS_PG_DSN to run.");

		return;
	};
	let test_db = TestDatabase::new(&base_dsn).await.expect("Failed to create test database.");
	let service = bootstrap(&test_db, Arc::new(SpyTransport::default())).await;

	seed(&service, "estudio@luz.mx", person("Luz", "090-12", "Guadalajara", "Jalisco")).await;
	seed(&service, "ana@example.mx", person("Ana", "203-04", "Guadalajara", "Jalisco")).await;
	seed(&service, "eva@example.mx", person("Eva", "203-04", "Zapopan", "Jalisco")).await;
	seed(&service, "ines@example.mx", person("Inés", "203-04", "Monterrey", "Nuevo León")).await;

	let mut abroad = person("Olga", "203-04", "Madrid", "Madrid");

	abroad.country = Some("ES".to_string());

	seed(&service, "olga@example.es", abroad).await;

	let mut previous: HashSet<Uuid> = HashSet::new();
	let mut sizes = Vec::new();

	for radius in WorkRadius::ALL {
		let created = service
			.create_job(job_request("estudio@luz.mx", WorkMode::InPerson, radius))
			.await
			.expect("Job must be created.");
		let matched: HashSet<Uuid> = service
			.match_candidates(created.opening_ids[0])
			.await
			.expect("Matching must succeed.")
			.into_iter()
			.map(|candidate| candidate.profile_id)
			.collect();

		assert!(previous.is_subset(&matched), "{} dropped a candidate.", radius.as_str());

		sizes.push(matched.len());
		previous = matched;
	}

	assert_eq!(sizes, vec![1, 2, 3, 4]);

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set COMPASS_PG_DSN to run."]
async fn recommendations_are_idempotent() {
	let Some(base_dsn) = compass_testkit::env_dsn() else {
		eprintln!("Skipping recommendations_are_idempotent; set COMPASS_PG_DSN to run.");

		return;
	};
	let test_db = TestDatabase::new(&base_dsn).await.expect("Failed to create test database.");
	let service = bootstrap(&test_db, Arc::new(SpyTransport::default())).await;
	let target =
		seed(&service, "ana@example.mx", person("Ana", "203-04", "León", "Guanajuato")).await;
	let fan = seed(&service, "bea@example.mx", person("Bea", "204-02", "León", "Guanajuato")).await;
	let added =
		service.recommend(target.profile_id, fan.profile_id).await.expect("First recommend.");

	assert_eq!(added.recommendations_count, 1);

	let again = service.recommend(target.profile_id, fan.profile_id).await;

	assert!(matches!(
		again,
		Err(Error::Conflict { code: ConflictCode::AlreadyRecommended, .. })
	));

	let revoked = service
		.revoke_recommendation(target.profile_id, fan.profile_id)
		.await
		.expect("Revoke must succeed.");

	assert_eq!(revoked.recommendations_count, 0);

	let missing = service.revoke_recommendation(target.profile_id, fan.profile_id).await;

	assert!(matches!(
		missing,
		Err(Error::Conflict { code: ConflictCode::NotRecommended, .. })
	));
	assert!(matches!(
		service.recommend(target.profile_id, target.profile_id).await,
		Err(Error::InvalidRequest { .. })
	));
	assert!(matches!(
		service.recommend(Uuid::new_v4(), fan.profile_id).await,
		Err(Error::NotFound { .. })
	));

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set COMPASS_PG_DSN to run."]
async fn committed_opening_alerts_matching_candidates_once() {
	let Some(base_dsn) = compass_testkit::env_dsn() else {
		eprintln!(
			"Skipping committed_opening_alerts_matching_candidates_once; set COMPASS_PG_DSN to run."
		);

		return;
	};
	let test_db = TestDatabase::new(&base_dsn).await.expect("Failed to create test database.");
	let transport = Arc::new(SpyTransport::default());
	let service = bootstrap(&test_db, transport.clone()).await;

	seed(&service, "estudio@luz.mx", person("Luz", "090-12", "Guadalajara", "Jalisco")).await;

	let local = seed(&service, "ana@example.mx", person("Ana", "203-04", "Guadalajara", "Jalisco"))
		.await;
	let messaging =
		seed(&service, "bea@example.mx", person("Bea", "203-04", "Guadalajara", "Jalisco")).await;
	let mut remote_patch = person("Cata", "203-04", "Monterrey", "Nuevo León");

	remote_patch.remote = Some(true);

	let remote = seed(&service, "cata@example.mx", remote_patch).await;

	seed(&service, "dora@example.mx", person("Dora", "203-04", "Monterrey", "Nuevo León")).await;
	service
		.update_notification_preferences(
			"bea@example.mx",
			PreferencesRequest { contact_method: Channel::Whatsapp, job_notifications: true },
		)
		.await
		.expect("Failed to update preferences.");

	let created = service
		.create_job(job_request("estudio@luz.mx", WorkMode::Hybrid, WorkRadius::Local))
		.await
		.expect("Job must be created.");
	let opening_id = created.opening_ids[0];
	let pending: i64 =
		sqlx::query_scalar("SELECT count(*) FROM job_alert_outbox WHERE opening_id = $1")
			.bind(opening_id)
			.fetch_one(&service.db.pool)
			.await
			.expect("Failed to count outbox rows.");

	assert_eq!(pending, 1);

	let expected: HashSet<Uuid> =
		[local.profile_id, messaging.profile_id, remote.profile_id].into_iter().collect();
	let matched: HashSet<Uuid> = service
		.match_candidates(opening_id)
		.await
		.expect("Matching must succeed.")
		.into_iter()
		.map(|candidate| candidate.profile_id)
		.collect();

	assert_eq!(matched, expected);

	let report = service.on_job_opening_committed(opening_id).await.expect("Fan-out must succeed.");

	assert_eq!(report.candidates, 3);
	assert_eq!(report.sent, 3);
	assert_eq!(report.fell_back, 1);

	let sent = transport.sent();

	assert!(sent.iter().all(|notification| notification.channel == Channel::Email));
	assert!(sent.iter().all(|notification| notification.variables["location"]
		== "Guadalajara, Jalisco, MX"));
	assert!(sent.iter().any(|notification| notification.address == "bea@example.mx"));

	let retry = service.on_job_opening_committed(opening_id).await.expect("Retry must succeed.");

	assert_eq!(retry.sent, 0);
	assert_eq!(retry.skipped, 3);
	assert_eq!(transport.sent().len(), 3);

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set COMPASS_PG_DSN to run."]
async fn failed_delivery_is_recorded_without_aborting_batch() {
	let Some(base_dsn) = compass_testkit::env_dsn() else {
		eprintln!(
			"Skipping failed_delivery_is_recorded_without_aborting_batch; set COMPASS_PG_DSN."
		);

		return;
	};
	let test_db = TestDatabase::new(&base_dsn).await.expect("Failed to create test database.");
	let transport = Arc::new(SpyTransport::failing_for("ana@example.mx"));
	let service = bootstrap(&test_db, transport.clone()).await;

	seed(&service, "estudio@luz.mx", person("Luz", "090-12", "León", "Guanajuato")).await;
	seed(&service, "ana@example.mx", person("Ana", "203-04", "Puebla", "Puebla")).await;
	seed(&service, "bea@example.mx", person("Bea", "203-04", "Mérida", "Yucatán")).await;

	let created = service
		.create_job(job_request("estudio@luz.mx", WorkMode::InPerson, WorkRadius::National))
		.await
		.expect("Job must be created.");
	let opening_id = created.opening_ids[0];
	let report = service.on_job_opening_committed(opening_id).await.expect("Fan-out must succeed.");

	assert_eq!(report.candidates, 2);
	assert_eq!(report.sent, 1);
	assert_eq!(report.failed, 1);

	let rows = deliveries::list_deliveries(&service.db.pool, opening_id)
		.await
		.expect("Failed to list deliveries.");
	let failed = rows
		.iter()
		.find(|row| row.address == "ana@example.mx")
		.expect("Failed delivery must be recorded.");

	assert_eq!(failed.status, deliveries::STATUS_FAILED);
	assert!(failed.last_error.is_some());

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set COMPASS_PG_DSN to run."]
async fn second_application_conflicts() {
	let Some(base_dsn) = compass_testkit::env_dsn() else {
		eprintln!("Skipping second_application_conflicts; set COMPASS_PG_DSN to run.");

		return;
	};
	let test_db = TestDatabase::new(&base_dsn).await.expect("Failed to create test database.");
	let service = bootstrap(&test_db, Arc::new(SpyTransport::default())).await;
	let requester =
		seed(&service, "estudio@luz.mx", person("Luz", "090-12", "Guadalajara", "Jalisco")).await;
	let applicant =
		seed(&service, "ana@example.mx", person("Ana", "203-04", "Guadalajara", "Jalisco")).await;
	let created = service
		.create_job(job_request("estudio@luz.mx", WorkMode::Online, WorkRadius::International))
		.await
		.expect("Job must be created.");
	let opening_id = created.opening_ids[0];
	let applied = service
		.apply_to_opening(opening_id, ApplyRequest { profile_id: applicant.profile_id })
		.await
		.expect("First application must succeed.");

	assert_eq!(applied.applicants, 1);
	let again = ApplyRequest { profile_id: applicant.profile_id };

	assert!(matches!(
		service.apply_to_opening(opening_id, again).await,
		Err(Error::Conflict { code: ConflictCode::AlreadyApplied, .. })
	));

	let own = ApplyRequest { profile_id: requester.profile_id };

	assert!(matches!(
		service.apply_to_opening(opening_id, own).await,
		Err(Error::InvalidRequest { .. })
	));

	let matched = service.match_candidates(opening_id).await.expect("Matching must succeed.");

	assert!(matched.iter().all(|candidate| candidate.profile_id != applicant.profile_id));

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}
