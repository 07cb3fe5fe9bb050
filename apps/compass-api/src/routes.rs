use axum::{
	Json, Router,
	body::Body,
	extract::{Path, Query, State},
	http::{HeaderMap, Request, StatusCode, header},
	middleware::{self, Next},
	response::{IntoResponse, Response},
	routing::{delete, get, post, put},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::state::AppState;
use compass_service::{
	ApplicantsRequest, ApplicantsResponse, ApplyRequest, ApplyResponse, CreateJobRequest,
	CreateJobResponse, CreateProfileRequest, Error, FieldValuesResponse, JobSearchRequest,
	JobSearchResponse, OpeningPatch, OpeningView, PreferencesRequest, PreferencesResponse,
	ProfilePatch, ProfileSearchRequest, ProfileSearchResponse, ProfileView,
	RecommendationResponse,
};

#[derive(Debug, Deserialize)]
pub struct RecommendBody {
	pub recommender_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct OpeningUpdateBody {
	pub requester_email: String,
	#[serde(flatten)]
	pub patch: OpeningPatch,
}

pub fn router(state: AppState) -> Router {
	let api = Router::new()
		.route("/v1/profiles", post(create_profile))
		.route("/v1/profiles/search", post(search_profiles))
		.route("/v1/profiles/fields/{field}", get(profile_field_values))
		.route("/v1/profiles/{id}", get(get_profile).patch(update_profile))
		.route("/v1/profiles/{id}/recommendations", post(recommend))
		.route("/v1/profiles/{id}/recommendations/{recommender}", delete(revoke_recommendation))
		.route("/v1/jobs", post(create_job))
		.route("/v1/jobs/search", post(search_jobs))
		.route("/v1/openings/{id}", get(get_opening).patch(update_opening))
		.route("/v1/openings/{id}/applicants", post(apply).get(list_applicants))
		.route("/v1/accounts/{email}/preferences", put(update_preferences))
		.route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

	Router::new().route("/health", get(health)).merge(api).with_state(state)
}

async fn health() -> StatusCode {
	StatusCode::OK
}

async fn create_profile(
	State(state): State<AppState>,
	Json(payload): Json<CreateProfileRequest>,
) -> Result<(StatusCode, Json<ProfileView>), ApiError> {
	let response = state.service.create_profile(payload).await?;

	Ok((StatusCode::CREATED, Json(response)))
}

async fn get_profile(
	State(state): State<AppState>,
	Path(profile_id): Path<Uuid>,
) -> Result<Json<ProfileView>, ApiError> {
	let response = state.service.get_profile(profile_id).await?;

	Ok(Json(response))
}

async fn update_profile(
	State(state): State<AppState>,
	Path(profile_id): Path<Uuid>,
	Json(payload): Json<ProfilePatch>,
) -> Result<Json<ProfileView>, ApiError> {
	let response = state.service.update_profile(profile_id, payload).await?;

	Ok(Json(response))
}

async fn search_profiles(
	State(state): State<AppState>,
	Json(payload): Json<ProfileSearchRequest>,
) -> Result<Json<ProfileSearchResponse>, ApiError> {
	let response = state.service.search_profiles(payload).await?;

	Ok(Json(response))
}

async fn profile_field_values(
	State(state): State<AppState>,
	Path(field): Path<String>,
) -> Result<Json<FieldValuesResponse>, ApiError> {
	let response = state.service.enumerate_profile_field(&field).await?;

	Ok(Json(response))
}

async fn recommend(
	State(state): State<AppState>,
	Path(profile_id): Path<Uuid>,
	Json(payload): Json<RecommendBody>,
) -> Result<Json<RecommendationResponse>, ApiError> {
	let response = state.service.recommend(profile_id, payload.recommender_id).await?;

	Ok(Json(response))
}

async fn revoke_recommendation(
	State(state): State<AppState>,
	Path((profile_id, recommender_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<RecommendationResponse>, ApiError> {
	let response = state.service.revoke_recommendation(profile_id, recommender_id).await?;

	Ok(Json(response))
}

async fn create_job(
	State(state): State<AppState>,
	Json(payload): Json<CreateJobRequest>,
) -> Result<(StatusCode, Json<CreateJobResponse>), ApiError> {
	let response = state.service.create_job(payload).await?;

	Ok((StatusCode::CREATED, Json(response)))
}

async fn search_jobs(
	State(state): State<AppState>,
	Json(payload): Json<JobSearchRequest>,
) -> Result<Json<JobSearchResponse>, ApiError> {
	let response = state.service.search_jobs(payload).await?;

	Ok(Json(response))
}

async fn get_opening(
	State(state): State<AppState>,
	Path(opening_id): Path<Uuid>,
) -> Result<Json<OpeningView>, ApiError> {
	let response = state.service.get_opening(opening_id).await?;

	Ok(Json(response))
}

async fn update_opening(
	State(state): State<AppState>,
	Path(opening_id): Path<Uuid>,
	Json(payload): Json<OpeningUpdateBody>,
) -> Result<Json<OpeningView>, ApiError> {
	let response = state
		.service
		.update_opening(opening_id, &payload.requester_email, payload.patch)
		.await?;

	Ok(Json(response))
}

async fn apply(
	State(state): State<AppState>,
	Path(opening_id): Path<Uuid>,
	Json(payload): Json<ApplyRequest>,
) -> Result<(StatusCode, Json<ApplyResponse>), ApiError> {
	let response = state.service.apply_to_opening(opening_id, payload).await?;

	Ok((StatusCode::CREATED, Json(response)))
}

async fn list_applicants(
	State(state): State<AppState>,
	Path(opening_id): Path<Uuid>,
	Query(query): Query<ApplicantsRequest>,
) -> Result<Json<ApplicantsResponse>, ApiError> {
	let response = state.service.list_applicants(opening_id, query).await?;

	Ok(Json(response))
}

async fn update_preferences(
	State(state): State<AppState>,
	Path(email): Path<String>,
	Json(payload): Json<PreferencesRequest>,
) -> Result<Json<PreferencesResponse>, ApiError> {
	let response = state.service.update_notification_preferences(&email, payload).await?;

	Ok(Json(response))
}

async fn auth_middleware(
	State(state): State<AppState>,
	req: Request<Body>,
	next: Next,
) -> Response {
	if let Some(expected) = state.service.cfg.security.api_auth_token.as_deref()
		&& read_bearer_token(req.headers()) != Some(expected)
	{
		return ApiError::new(
			StatusCode::UNAUTHORIZED,
			"unauthorized",
			"A valid Bearer token is required.",
			None,
		)
		.into_response();
	}

	next.run(req).await
}

fn read_bearer_token(headers: &HeaderMap) -> Option<&str> {
	let raw = headers.get(header::AUTHORIZATION)?;
	let value = raw.to_str().ok()?.trim();
	let token = value.strip_prefix("Bearer ")?.trim();

	if token.is_empty() { None } else { Some(token) }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
	error_code: String,
	message: String,
	fields: Option<Vec<String>>,
}

#[derive(Debug)]
pub struct ApiError {
	status: StatusCode,
	error_code: String,
	message: String,
	fields: Option<Vec<String>>,
}
impl ApiError {
	fn new(
		status: StatusCode,
		error_code: impl Into<String>,
		message: impl Into<String>,
		fields: Option<Vec<String>>,
	) -> Self {
		Self { status, error_code: error_code.into(), message: message.into(), fields }
	}

	pub fn status(&self) -> StatusCode {
		self.status
	}

	pub fn error_code(&self) -> &str {
		&self.error_code
	}
}
impl From<Error> for ApiError {
	fn from(err: Error) -> Self {
		match err {
			Error::InvalidRequest { message } =>
				ApiError::new(StatusCode::BAD_REQUEST, "invalid_request", message, None),
			Error::Forbidden { message } =>
				ApiError::new(StatusCode::FORBIDDEN, "forbidden", message, None),
			Error::NotFound { message } =>
				ApiError::new(StatusCode::NOT_FOUND, "not_found", message, None),
			Error::Conflict { code, message } =>
				ApiError::new(StatusCode::CONFLICT, code.as_str(), message, None),
			Error::Taxonomy { .. } | Error::Provider { .. } | Error::Storage { .. } => {
				tracing::error!(error = %err, "Request failed.");

				ApiError::new(
					StatusCode::INTERNAL_SERVER_ERROR,
					"internal",
					"Internal error.",
					None,
				)
			},
		}
	}
}
impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		let body =
			ErrorBody { error_code: self.error_code, message: self.message, fields: self.fields };

		(self.status, Json(body)).into_response()
	}
}
