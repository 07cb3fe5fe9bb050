use time::OffsetDateTime;
use uuid::Uuid;

use compass_config::Postgres;
use compass_storage::{
	accounts, applicants,
	db::Db,
	deliveries, jobs,
	models::{Account, Job, JobOpening, Profile},
	outbox, profiles, recommendations,
};
use compass_testkit::TestDatabase;

async fn bootstrap(test_db: &TestDatabase) -> Db {
	let cfg = Postgres { dsn: test_db.dsn().to_string(), pool_max_conns: 2 };
	let db = Db::connect(&cfg).await.expect("Failed to connect to Postgres.");

	db.ensure_schema().await.expect("Failed to ensure schema.");

	db
}

fn profile(email: &str, now: OffsetDateTime) -> Profile {
	Profile {
		profile_id: Uuid::new_v4(),
		primary_email: email.to_string(),
		profile_type: "individual".to_string(),
		first_name: Some("Ana".to_string()),
		last_name: None,
		nick_name: None,
		full_name: Some("Ana".to_string()),
		gender: Some("female".to_string()),
		primary_activity: Some("203-04".to_string()),
		secondary_activity: None,
		third_activity: None,
		secondary_emails: Vec::new(),
		phone_numbers: Vec::new(),
		languages: vec!["es:native".to_string()],
		whatsapp: None,
		city: Some("Guadalajara".to_string()),
		state: Some("Jalisco".to_string()),
		country: Some("MX".to_string()),
		postal_code: None,
		location: "Guadalajara, Jalisco, MX".to_string(),
		university: None,
		associations: None,
		certifications: None,
		remote: false,
		probono: false,
		work_radius: None,
		subscriber: false,
		recommendations_count: 0,
		searchable: true,
		search_string: "ana".to_string(),
		created_at: now,
		updated_at: now,
		deleted_at: None,
	}
}

async fn insert_with_account(db: &Db, profile: &Profile) {
	assert!(profiles::insert_profile(&db.pool, profile).await.expect("Failed to insert profile."));

	let account = Account {
		email: profile.primary_email.clone(),
		profile_id: profile.profile_id,
		contact_method: "email".to_string(),
		job_notifications: true,
		created_at: profile.created_at,
		updated_at: profile.created_at,
	};

	accounts::insert_account(&db.pool, &account).await.expect("Failed to insert account.");
}

async fn insert_opening(db: &Db, requester_email: &str, now: OffsetDateTime) -> Uuid {
	let job = Job {
		job_id: Uuid::new_v4(),
		requester_email: requester_email.to_string(),
		contact_start_date: now,
		contact_end_date: now + time::Duration::days(7),
		contact_email: Some(requester_email.to_string()),
		whatsapp: None,
		phone_numbers: Vec::new(),
		work_mode: "in-person".to_string(),
		work_radius: "local".to_string(),
		employment: "freelance".to_string(),
		description: "Sesión de fotos".to_string(),
		special_requirements: None,
		benefits: None,
		notes: None,
		budget_low: None,
		budget_high: None,
		job_start_date: None,
		job_end_date: None,
		created_at: now,
		updated_at: now,
	};
	let opening = JobOpening {
		opening_id: Uuid::new_v4(),
		job_id: job.job_id,
		activity: "203-04".to_string(),
		headcount: 1,
		probono: false,
		gender: None,
		age_range_min: None,
		age_range_max: None,
		school: None,
		languages: Vec::new(),
		search_string: "fotografia".to_string(),
		created_at: now,
		updated_at: now,
	};

	jobs::insert_job(&db.pool, &job).await.expect("Failed to insert job.");
	jobs::insert_opening(&db.pool, &opening).await.expect("Failed to insert opening.");

	opening.opening_id
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set COMPASS_PG_DSN to run."]
async fn schema_bootstrap_is_idempotent() {
	let Some(base_dsn) = compass_testkit::env_dsn() else {
		eprintln!("Skipping schema_bootstrap_is_idempotent; set COMPASS_PG_DSN to run this test.");

		return;
	};
	let test_db = TestDatabase::new(&base_dsn).await.expect("Failed to create test database.");
	let db = bootstrap(&test_db).await;

	db.ensure_schema().await.expect("Second bootstrap must succeed.");

	let count: i64 = sqlx::query_scalar(
		"SELECT count(*) FROM information_schema.tables WHERE table_name = 'job_alert_outbox'",
	)
	.fetch_one(&db.pool)
	.await
	.expect("Failed to query schema tables.");

	assert_eq!(count, 1);

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set COMPASS_PG_DSN to run."]
async fn duplicate_primary_email_is_rejected() {
	let Some(base_dsn) = compass_testkit::env_dsn() else {
		eprintln!("Skipping duplicate_primary_email_is_rejected; set COMPASS_PG_DSN to run.");

		return;
	};
	let test_db = TestDatabase::new(&base_dsn).await.expect("Failed to create test database.");
	let db = bootstrap(&test_db).await;
	let now = OffsetDateTime::now_utc();

	insert_with_account(&db, &profile("ana@example.mx", now)).await;

	let inserted = profiles::insert_profile(&db.pool, &profile("ana@example.mx", now))
		.await
		.expect("Insert must not error on conflict.");

	assert!(!inserted);

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set COMPASS_PG_DSN to run."]
async fn recommendation_count_tracks_edges() {
	let Some(base_dsn) = compass_testkit::env_dsn() else {
		eprintln!("Skipping recommendation_count_tracks_edges; set COMPASS_PG_DSN to run.");

		return;
	};
	let test_db = TestDatabase::new(&base_dsn).await.expect("Failed to create test database.");
	let db = bootstrap(&test_db).await;
	let now = OffsetDateTime::now_utc();
	let target = profile("target@example.mx", now);
	let fan = profile("fan@example.mx", now);

	insert_with_account(&db, &target).await;
	insert_with_account(&db, &fan).await;

	let mut tx = db.pool.begin().await.expect("Failed to begin transaction.");

	assert!(
		recommendations::insert_recommendation(&mut *tx, target.profile_id, fan.profile_id, now)
			.await
			.expect("Failed to insert edge.")
	);
	assert!(
		!recommendations::insert_recommendation(&mut *tx, target.profile_id, fan.profile_id, now)
			.await
			.expect("Repeat insert must not error.")
	);
	assert_eq!(
		recommendations::refresh_count(&mut *tx, target.profile_id, now)
			.await
			.expect("Failed to refresh count."),
		1
	);

	tx.commit().await.expect("Failed to commit.");

	assert!(
		recommendations::delete_recommendation(&db.pool, target.profile_id, fan.profile_id)
			.await
			.expect("Failed to delete edge.")
	);
	assert!(
		!recommendations::delete_recommendation(&db.pool, target.profile_id, fan.profile_id)
			.await
			.expect("Repeat delete must not error.")
	);
	assert_eq!(
		recommendations::refresh_count(&db.pool, target.profile_id, now)
			.await
			.expect("Failed to refresh count."),
		0
	);

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set COMPASS_PG_DSN to run."]
async fn second_application_is_a_no_op() {
	let Some(base_dsn) = compass_testkit::env_dsn() else {
		eprintln!("Skipping second_application_is_a_no_op; set COMPASS_PG_DSN to run.");

		return;
	};
	let test_db = TestDatabase::new(&base_dsn).await.expect("Failed to create test database.");
	let db = bootstrap(&test_db).await;
	let now = OffsetDateTime::now_utc();
	let requester = profile("studio@example.mx", now);
	let applicant = profile("ana@example.mx", now);

	insert_with_account(&db, &requester).await;
	insert_with_account(&db, &applicant).await;

	let opening_id = insert_opening(&db, &requester.primary_email, now).await;

	assert!(
		applicants::insert_applicant(&db.pool, opening_id, applicant.profile_id, now)
			.await
			.expect("Failed to apply.")
	);
	assert!(
		!applicants::insert_applicant(&db.pool, opening_id, applicant.profile_id, now)
			.await
			.expect("Repeat application must not error.")
	);
	assert_eq!(
		applicants::count_applicants(&db.pool, opening_id).await.expect("Failed to count."),
		1
	);

	let listed = applicants::list_applicants(&db.pool, opening_id, 10, 0)
		.await
		.expect("Failed to list applicants.");

	assert_eq!(listed.len(), 1);
	assert_eq!(listed[0].profile_id, applicant.profile_id);

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set COMPASS_PG_DSN to run."]
async fn outbox_claim_leases_and_settles_rows() {
	let Some(base_dsn) = compass_testkit::env_dsn() else {
		eprintln!("Skipping outbox_claim_leases_and_settles_rows; set COMPASS_PG_DSN to run.");

		return;
	};
	let test_db = TestDatabase::new(&base_dsn).await.expect("Failed to create test database.");
	let db = bootstrap(&test_db).await;
	let now = OffsetDateTime::now_utc();
	let requester = profile("studio@example.mx", now);

	insert_with_account(&db, &requester).await;

	let opening_id = insert_opening(&db, &requester.primary_email, now).await;
	let outbox_id = outbox::enqueue_job_alert(&db.pool, opening_id, now)
		.await
		.expect("Failed to enqueue job alert.");
	let claimed = outbox::claim_next_job_alert(&db, now, 60)
		.await
		.expect("Failed to claim.")
		.expect("Expected a claimable row.");

	assert_eq!(claimed.outbox_id, outbox_id);
	assert_eq!(claimed.status, "CLAIMED");
	assert!(
		outbox::claim_next_job_alert(&db, now, 60).await.expect("Failed to claim.").is_none(),
		"A leased row must not be claimed again before the lease expires."
	);

	let retry_at = now + time::Duration::seconds(1);

	outbox::mark_job_alert_failed(&db, outbox_id, 1, "gateway timeout", retry_at, now)
		.await
		.expect("Failed to mark failed.");

	let reclaimed = outbox::claim_next_job_alert(&db, retry_at, 60)
		.await
		.expect("Failed to claim.")
		.expect("Failed rows become claimable after their backoff.");

	assert_eq!(reclaimed.attempts, 1);
	assert_eq!(reclaimed.last_error.as_deref(), Some("gateway timeout"));

	outbox::mark_job_alert_done(&db, outbox_id, retry_at).await.expect("Failed to mark done.");

	let row = outbox::get_job_alert(&db.pool, outbox_id)
		.await
		.expect("Failed to load row.")
		.expect("Row must exist.");

	assert_eq!(row.status, "DONE");

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set COMPASS_PG_DSN to run."]
async fn delivery_log_upserts_per_candidate() {
	let Some(base_dsn) = compass_testkit::env_dsn() else {
		eprintln!("Skipping delivery_log_upserts_per_candidate; set COMPASS_PG_DSN to run.");

		return;
	};
	let test_db = TestDatabase::new(&base_dsn).await.expect("Failed to create test database.");
	let db = bootstrap(&test_db).await;
	let now = OffsetDateTime::now_utc();
	let requester = profile("studio@example.mx", now);
	let candidate = profile("ana@example.mx", now);

	insert_with_account(&db, &requester).await;
	insert_with_account(&db, &candidate).await;

	let opening_id = insert_opening(&db, &requester.primary_email, now).await;
	let failed = deliveries::delivery_row(
		opening_id,
		candidate.profile_id,
		"email",
		"ana@example.mx",
		Some("503".to_string()),
		now,
	);

	deliveries::record_delivery(&db.pool, &failed).await.expect("Failed to record delivery.");

	assert!(
		deliveries::sent_profile_ids(&db.pool, opening_id)
			.await
			.expect("Failed to list sent.")
			.is_empty()
	);

	let sent = deliveries::delivery_row(
		opening_id,
		candidate.profile_id,
		"email",
		"ana@example.mx",
		None,
		now,
	);

	deliveries::record_delivery(&db.pool, &sent).await.expect("Failed to record delivery.");

	assert_eq!(
		deliveries::sent_profile_ids(&db.pool, opening_id).await.expect("Failed to list sent."),
		vec![candidate.profile_id]
	);
	assert_eq!(
		deliveries::list_deliveries(&db.pool, opening_id).await.expect("Failed to list.").len(),
		1
	);

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}
