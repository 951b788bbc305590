//! # API REST
//!
//! REST API implementation for Saúde.
//!
//! Handles:
//! - HTTP endpoints with axum
//! - OpenAPI documentation served at `/api-docs/openapi.json`
//! - REST-specific concerns (bearer authentication, JSON error bodies, CORS)
//!
//! Uses `api-shared` for the wire types and `saude-core` for everything else.

#![warn(rust_2018_idioms)]

use api_shared::auth::bearer_token;
use api_shared::{dto, HealthService};
use axum::{
    async_trait,
    extract::{FromRequestParts, Path as AxumPath, State},
    http::{header::AUTHORIZATION, request::Parts, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use saude_core::ports::AuthError;
use saude_core::repositories::accounts::SignUp;
use saude_core::{Backend, NewVital, RecordId, Role, ServiceError, Session};
use tower_http::cors::CorsLayer;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

/// Application state shared across REST API handlers
#[derive(Clone)]
pub struct AppState {
    pub backend: Backend,
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health,
        sign_up,
        login,
        logout,
        me_patient,
        me_doctor,
        get_patient,
        link_patient,
        doctor_vitals,
        doctor_patients,
        add_vital,
        get_vital,
        update_vital,
        delete_vital,
        patient_vitals,
        patient_recommendations,
        send_recommendation,
    ),
    components(schemas(
        dto::HealthRes,
        dto::ErrorResponse,
        dto::SignUpReq,
        dto::LoginReq,
        dto::SessionRes,
        dto::PatientRes,
        dto::DoctorRes,
        dto::LinkPatientReq,
        dto::LinkPatientRes,
        dto::VitalReq,
        dto::VitalRes,
        dto::ListVitalsRes,
        dto::DoctorVitalsRes,
        dto::ListPatientsRes,
        dto::RecommendationReq,
        dto::RecommendationRes,
        dto::ListRecommendationsRes,
    )),
    modifiers(&BearerAuth)
)]
pub struct ApiDoc;

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Bearer).build()),
            );
        }
    }
}

/// Builds the REST router over `state`.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api-docs/openapi.json", get(openapi_json))
        .route("/auth/signup", post(sign_up))
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
        .route("/me/patient", get(me_patient))
        .route("/me/doctor", get(me_doctor))
        .route("/patients/:id", get(get_patient))
        .route("/patients/:id/vitals", get(patient_vitals))
        .route(
            "/patients/:id/recommendations",
            get(patient_recommendations).post(send_recommendation),
        )
        .route("/doctor/links", post(link_patient))
        .route("/doctor/vitals", get(doctor_vitals))
        .route("/doctor/patients", get(doctor_patients))
        .route("/vitals", post(add_vital))
        .route(
            "/vitals/:id",
            get(get_vital).put(update_vital).delete(delete_vital),
        )
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// ============================================================================
// ERRORS AND AUTHENTICATION
// ============================================================================

/// A service failure rendered as a status code and `{ "error": message }`.
#[derive(Debug)]
pub struct ApiError(ServiceError);

impl From<ServiceError> for ApiError {
    fn from(e: ServiceError) -> Self {
        Self(e)
    }
}

fn status_for(e: &ServiceError) -> StatusCode {
    match e {
        ServiceError::NotAuthenticated => StatusCode::UNAUTHORIZED,
        ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
        ServiceError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        ServiceError::WrongRole { .. } | ServiceError::NotLinked(_) | ServiceError::NotOwner(_) => {
            StatusCode::FORBIDDEN
        }
        ServiceError::Auth(auth) => match auth {
            AuthError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            AuthError::EmailInUse(_) => StatusCode::CONFLICT,
            AuthError::WeakPassword(_) => StatusCode::BAD_REQUEST,
            AuthError::AccountNotFound(_) => StatusCode::NOT_FOUND,
            AuthError::Hashing(_) | AuthError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        },
        ServiceError::Store(_) | ServiceError::CompensationFailed { .. } => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_for(&self.0);
        if status.is_server_error() {
            tracing::error!("request failed: {:?}", self.0);
        } else {
            tracing::debug!("request rejected ({}): {}", status, self.0);
        }

        let body = dto::ErrorResponse {
            error: self.0.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

/// The caller's session, resolved from `Authorization: Bearer <token>`.
pub struct Authenticated(pub Session);

#[async_trait]
impl FromRequestParts<AppState> for Authenticated {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(bearer_token)
            .ok_or(ServiceError::NotAuthenticated)?;

        let session = state.backend.accounts.resolve_session(token).await?;
        Ok(Authenticated(session))
    }
}

fn parse_id(raw: &str) -> ApiResult<RecordId> {
    RecordId::parse(raw).map_err(|e| ApiError(e.into()))
}

// ============================================================================
// HANDLERS
// ============================================================================

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Health check response", body = dto::HealthRes)
    )
)]
/// Health check endpoint for the REST API
///
/// Used for monitoring and load balancer health checks.
async fn health() -> Json<dto::HealthRes> {
    Json(HealthService::check_health())
}

/// The OpenAPI document of this API.
async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

#[utoipa::path(
    post,
    path = "/auth/signup",
    request_body = dto::SignUpReq,
    responses(
        (status = 201, description = "Account created and signed in", body = dto::SessionRes),
        (status = 400, description = "Invalid input", body = dto::ErrorResponse),
        (status = 409, description = "Email already registered", body = dto::ErrorResponse),
        (status = 500, description = "Internal server error", body = dto::ErrorResponse)
    )
)]
/// Create an account and its patient or doctor profile
#[axum::debug_handler]
async fn sign_up(
    State(state): State<AppState>,
    Json(req): Json<dto::SignUpReq>,
) -> ApiResult<(StatusCode, Json<dto::SessionRes>)> {
    let role: Role = req.role.parse()?;
    let (session, profile) = state
        .backend
        .accounts
        .sign_up(SignUp {
            name: req.name,
            email: req.email,
            password: req.password,
            role,
            license_id: req.license_id,
            specialties: req.specialties,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(session_res(&session, profile.role())),
    ))
}

fn session_res(session: &Session, role: Role) -> dto::SessionRes {
    dto::SessionRes {
        token: session.token().to_string(),
        account_id: session.account_id().to_string(),
        role: role.to_string(),
    }
}

#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = dto::LoginReq,
    responses(
        (status = 200, description = "Signed in", body = dto::SessionRes),
        (status = 401, description = "Invalid credentials", body = dto::ErrorResponse),
        (status = 404, description = "Profile missing", body = dto::ErrorResponse)
    )
)]
/// Sign in and learn the account's role
#[axum::debug_handler]
async fn login(
    State(state): State<AppState>,
    Json(req): Json<dto::LoginReq>,
) -> ApiResult<Json<dto::SessionRes>> {
    let (session, role) = state
        .backend
        .accounts
        .login(&req.email, &req.password)
        .await?;
    Ok(Json(session_res(&session, role)))
}

#[utoipa::path(
    post,
    path = "/auth/logout",
    responses(
        (status = 204, description = "Session revoked"),
        (status = 401, description = "Not authenticated", body = dto::ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
#[axum::debug_handler]
async fn logout(
    State(state): State<AppState>,
    Authenticated(session): Authenticated,
) -> ApiResult<StatusCode> {
    state.backend.accounts.logout(&session).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/me/patient",
    responses(
        (status = 200, description = "Signed-in patient", body = dto::PatientRes),
        (status = 401, description = "Not authenticated", body = dto::ErrorResponse),
        (status = 403, description = "Not a patient", body = dto::ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
#[axum::debug_handler]
async fn me_patient(
    State(state): State<AppState>,
    Authenticated(session): Authenticated,
) -> ApiResult<Json<dto::PatientRes>> {
    let patient = state.backend.accounts.current_patient(&session).await?;
    Ok(Json(patient.into()))
}

#[utoipa::path(
    get,
    path = "/me/doctor",
    responses(
        (status = 200, description = "Signed-in doctor", body = dto::DoctorRes),
        (status = 401, description = "Not authenticated", body = dto::ErrorResponse),
        (status = 403, description = "Not a doctor", body = dto::ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
#[axum::debug_handler]
async fn me_doctor(
    State(state): State<AppState>,
    Authenticated(session): Authenticated,
) -> ApiResult<Json<dto::DoctorRes>> {
    let doctor = state.backend.accounts.current_doctor(&session).await?;
    Ok(Json(doctor.into()))
}

#[utoipa::path(
    get,
    path = "/patients/{id}",
    params(("id" = String, Path, description = "Patient id")),
    responses(
        (status = 200, description = "Patient profile", body = dto::PatientRes),
        (status = 403, description = "Not the patient or a linked doctor", body = dto::ErrorResponse),
        (status = 404, description = "Patient not found", body = dto::ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
/// Read a patient's profile (the patient themself or a linked doctor)
#[axum::debug_handler]
async fn get_patient(
    State(state): State<AppState>,
    Authenticated(session): Authenticated,
    AxumPath(id): AxumPath<String>,
) -> ApiResult<Json<dto::PatientRes>> {
    let id = parse_id(&id)?;
    state.backend.access.read_patient(&session, &id).await?;
    let patient = state.backend.accounts.patient_details(&id).await?;
    Ok(Json(patient.into()))
}

#[utoipa::path(
    post,
    path = "/doctor/links",
    request_body = dto::LinkPatientReq,
    responses(
        (status = 200, description = "Patient linked", body = dto::LinkPatientRes),
        (status = 403, description = "Not a doctor", body = dto::ErrorResponse),
        (status = 404, description = "No patient with this code", body = dto::ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
/// Link a patient to the signed-in doctor by sharing code
#[axum::debug_handler]
async fn link_patient(
    State(state): State<AppState>,
    Authenticated(session): Authenticated,
    Json(req): Json<dto::LinkPatientReq>,
) -> ApiResult<Json<dto::LinkPatientRes>> {
    let patient_id = state
        .backend
        .linking
        .link_patient(&session, &req.code)
        .await?;
    Ok(Json(dto::LinkPatientRes {
        patient_id: patient_id.to_string(),
    }))
}

#[utoipa::path(
    get,
    path = "/doctor/vitals",
    responses(
        (status = 200, description = "Vitals per linked patient", body = dto::DoctorVitalsRes),
        (status = 403, description = "Not a doctor", body = dto::ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
#[axum::debug_handler]
async fn doctor_vitals(
    State(state): State<AppState>,
    Authenticated(session): Authenticated,
) -> ApiResult<Json<dto::DoctorVitalsRes>> {
    let by_patient = state.backend.vitals.vitals_for_doctor(&session).await?;
    let patients = by_patient
        .into_iter()
        .map(|(id, vitals)| (id.to_string(), vitals.into_iter().map(Into::into).collect()))
        .collect();
    Ok(Json(dto::DoctorVitalsRes { patients }))
}

#[utoipa::path(
    get,
    path = "/doctor/patients",
    responses(
        (status = 200, description = "Linked patients", body = dto::ListPatientsRes),
        (status = 403, description = "Not a doctor", body = dto::ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
#[axum::debug_handler]
async fn doctor_patients(
    State(state): State<AppState>,
    Authenticated(session): Authenticated,
) -> ApiResult<Json<dto::ListPatientsRes>> {
    let patients = state.backend.linking.linked_patients(&session).await?;
    Ok(Json(dto::ListPatientsRes {
        patients: patients.into_iter().map(Into::into).collect(),
    }))
}

#[utoipa::path(
    post,
    path = "/vitals",
    request_body = dto::VitalReq,
    responses(
        (status = 201, description = "Vital recorded", body = dto::VitalRes),
        (status = 400, description = "Invalid input", body = dto::ErrorResponse),
        (status = 403, description = "Not a patient", body = dto::ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
/// Record vitals for the signed-in patient
#[axum::debug_handler]
async fn add_vital(
    State(state): State<AppState>,
    Authenticated(session): Authenticated,
    Json(req): Json<dto::VitalReq>,
) -> ApiResult<(StatusCode, Json<dto::VitalRes>)> {
    let new = NewVital::from_request(req, chrono::Utc::now())?;
    let vital = state.backend.vitals.add_vital(&session, new).await?;
    Ok((StatusCode::CREATED, Json(vital.into())))
}

#[utoipa::path(
    get,
    path = "/vitals/{id}",
    params(("id" = String, Path, description = "Vital record id")),
    responses(
        (status = 200, description = "Vital record", body = dto::VitalRes),
        (status = 404, description = "Vital record not found or not readable", body = dto::ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
#[axum::debug_handler]
async fn get_vital(
    State(state): State<AppState>,
    Authenticated(session): Authenticated,
    AxumPath(id): AxumPath<String>,
) -> ApiResult<Json<dto::VitalRes>> {
    let id = parse_id(&id)?;
    let vital = state.backend.access.read_vital(&session, &id).await?;
    Ok(Json(vital.into()))
}

#[utoipa::path(
    put,
    path = "/vitals/{id}",
    params(("id" = String, Path, description = "Vital record id")),
    request_body = dto::VitalReq,
    responses(
        (status = 200, description = "Vital record updated", body = dto::VitalRes),
        (status = 403, description = "Record belongs to a linked patient", body = dto::ErrorResponse),
        (status = 404, description = "Vital record not found", body = dto::ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
/// Replace the measurements of one of the signed-in patient's records
///
/// The record keeps its timestamp when `recorded_at` is omitted.
#[axum::debug_handler]
async fn update_vital(
    State(state): State<AppState>,
    Authenticated(session): Authenticated,
    AxumPath(id): AxumPath<String>,
    Json(req): Json<dto::VitalReq>,
) -> ApiResult<Json<dto::VitalRes>> {
    let id = parse_id(&id)?;
    let existing = state.backend.access.own_vital(&session, &id).await?;
    let new = NewVital::from_request(req, existing.recorded_at)?;
    let updated = existing.with_measurements(new);

    state.backend.vitals.update_vital(&updated).await?;
    Ok(Json(updated.into()))
}

#[utoipa::path(
    delete,
    path = "/vitals/{id}",
    params(("id" = String, Path, description = "Vital record id")),
    responses(
        (status = 204, description = "Vital record deleted"),
        (status = 403, description = "Record belongs to a linked patient", body = dto::ErrorResponse),
        (status = 404, description = "Vital record not found", body = dto::ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
#[axum::debug_handler]
async fn delete_vital(
    State(state): State<AppState>,
    Authenticated(session): Authenticated,
    AxumPath(id): AxumPath<String>,
) -> ApiResult<StatusCode> {
    let id = parse_id(&id)?;
    let vital = state.backend.access.own_vital(&session, &id).await?;
    state.backend.vitals.delete_vital(&vital.id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/patients/{id}/vitals",
    params(("id" = String, Path, description = "Patient id")),
    responses(
        (status = 200, description = "Vitals, most recent first", body = dto::ListVitalsRes),
        (status = 403, description = "Not the patient or a linked doctor", body = dto::ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
#[axum::debug_handler]
async fn patient_vitals(
    State(state): State<AppState>,
    Authenticated(session): Authenticated,
    AxumPath(id): AxumPath<String>,
) -> ApiResult<Json<dto::ListVitalsRes>> {
    let id = parse_id(&id)?;
    state.backend.access.read_patient(&session, &id).await?;
    let vitals = state.backend.vitals.vitals_for_patient(&id).await?;
    Ok(Json(dto::ListVitalsRes {
        vitals: vitals.into_iter().map(Into::into).collect(),
    }))
}

#[utoipa::path(
    get,
    path = "/patients/{id}/recommendations",
    params(("id" = String, Path, description = "Patient id")),
    responses(
        (status = 200, description = "Recommendations, most recent first", body = dto::ListRecommendationsRes),
        (status = 403, description = "Not the patient or a linked doctor", body = dto::ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
#[axum::debug_handler]
async fn patient_recommendations(
    State(state): State<AppState>,
    Authenticated(session): Authenticated,
    AxumPath(id): AxumPath<String>,
) -> ApiResult<Json<dto::ListRecommendationsRes>> {
    let id = parse_id(&id)?;
    state.backend.access.read_patient(&session, &id).await?;
    let recommendations = state
        .backend
        .recommendations
        .recommendations_for_patient(&id)
        .await?;
    Ok(Json(dto::ListRecommendationsRes {
        recommendations: recommendations.into_iter().map(Into::into).collect(),
    }))
}

#[utoipa::path(
    post,
    path = "/patients/{id}/recommendations",
    params(("id" = String, Path, description = "Patient id")),
    request_body = dto::RecommendationReq,
    responses(
        (status = 201, description = "Recommendation sent", body = dto::RecommendationRes),
        (status = 400, description = "Empty or oversized text", body = dto::ErrorResponse),
        (status = 403, description = "Not a doctor linked to this patient", body = dto::ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
/// Send a recommendation from the signed-in doctor to a linked patient
#[axum::debug_handler]
async fn send_recommendation(
    State(state): State<AppState>,
    Authenticated(session): Authenticated,
    AxumPath(id): AxumPath<String>,
    Json(req): Json<dto::RecommendationReq>,
) -> ApiResult<(StatusCode, Json<dto::RecommendationRes>)> {
    let id = parse_id(&id)?;
    let recommendation = state
        .backend
        .recommendations
        .send_recommendation(&session, &id, &req.text)
        .await?;
    Ok((StatusCode::CREATED, Json(recommendation.into())))
}
