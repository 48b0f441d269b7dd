use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::NaiveDate;
use diesel::prelude::*;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{error, info};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::config::security_config::{caller_id, load_user, require_admin, Claims};
use crate::error::ApiError;
use crate::models::models::{AppState, KycSubmission, MessageResponse, NewKycSubmission, StatusFilter};
use crate::schema::{kyc_submissions, users};

const DOCUMENT_TYPES: &[&str] = &["id", "passport", "drivers_license"];

#[derive(Deserialize, ToSchema, Validate)]
pub struct KycSubmissionRequest {
    pub document_type: String,
    #[validate(length(min = 1, max = 100, message = "Document number is required"))]
    pub document_number: String,
    #[validate(length(min = 1, max = 100, message = "Country is required"))]
    pub country: String,
    pub date_of_birth: NaiveDate,
}

#[derive(Deserialize, ToSchema, Validate)]
pub struct RejectKycRequest {
    #[validate(length(min = 1, max = 1000, message = "Rejection reason is required"))]
    pub reason: String,
}

#[utoipa::path(
    post,
    path = "/api/kyc",
    request_body = KycSubmissionRequest,
    responses(
        (status = 201, description = "KYC submission created", body = KycSubmission),
        (status = 422, description = "Active submission already exists or validation error")
    ),
    security(("bearerAuth" = [])),
    tag = "KYC"
)]
pub async fn submit_kyc(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<KycSubmissionRequest>,
) -> Result<(StatusCode, Json<KycSubmission>), (StatusCode, String)> {
    req.validate().map_err(ApiError::Validation)?;
    if !DOCUMENT_TYPES.contains(&req.document_type.as_str()) {
        return Err((
            StatusCode::UNPROCESSABLE_ENTITY,
            "document_type must be id, passport or drivers_license".to_string(),
        ));
    }
    let user_id = caller_id(&claims)?;

    let conn = &mut state.db.get().map_err(|e| {
        error!("Database connection error: {}", e);
        ApiError::DatabaseConnection(e.to_string())
    })?;

    // One active (pending or approved) submission per user. A rejected
    // submission does not block resubmission. The check and the insert
    // share a transaction so concurrent submits cannot both pass.
    let submission = conn.transaction(|conn| {
        let active: i64 = kyc_submissions::table
            .filter(kyc_submissions::user_id.eq(user_id))
            .filter(kyc_submissions::status.eq_any(["pending", "approved"]))
            .count()
            .get_result(conn)?;

        if active > 0 {
            return Err(ApiError::Validation({
                let mut errs = validator::ValidationErrors::new();
                errs.add(
                    "status",
                    validator::ValidationError::new(
                        "You already have a pending or approved KYC submission",
                    ),
                );
                errs
            }));
        }

        let submission = diesel::insert_into(kyc_submissions::table)
            .values(NewKycSubmission {
                user_id,
                document_type: req.document_type.clone(),
                document_number: req.document_number.clone(),
                country: req.country.clone(),
                date_of_birth: req.date_of_birth,
                status: "pending".to_string(),
            })
            .returning(KycSubmission::as_returning())
            .get_result::<KycSubmission>(conn)?;

        Ok::<KycSubmission, ApiError>(submission)
    })?;

    info!("KYC submission {} created for user {}", submission.id, user_id);
    Ok((StatusCode::CREATED, Json(submission)))
}

#[utoipa::path(
    get,
    path = "/api/kyc",
    responses(
        (status = 200, description = "All KYC submissions", body = [KycSubmission]),
        (status = 403, description = "Admin only")
    ),
    security(("bearerAuth" = [])),
    tag = "KYC"
)]
pub async fn list_kyc_submissions(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Query(filter): Query<StatusFilter>,
) -> Result<Json<Vec<KycSubmission>>, (StatusCode, String)> {
    let admin_id = caller_id(&claims)?;

    let conn = &mut state.db.get().map_err(|e| {
        error!("Database connection error: {}", e);
        ApiError::DatabaseConnection(e.to_string())
    })?;

    require_admin(conn, admin_id)?;

    let mut query = kyc_submissions::table.into_boxed();
    if let Some(status) = &filter.status {
        query = query.filter(kyc_submissions::status.eq(status));
    }

    let rows = query
        .order(kyc_submissions::created_at.desc())
        .select(KycSubmission::as_select())
        .load::<KycSubmission>(conn)
        .map_err(ApiError::Database)?;

    Ok(Json(rows))
}

#[utoipa::path(
    get,
    path = "/api/kyc/{id}",
    params(("id" = Uuid, Path, description = "Submission id")),
    responses(
        (status = 200, description = "Submission details", body = KycSubmission),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Submission not found")
    ),
    security(("bearerAuth" = [])),
    tag = "KYC"
)]
pub async fn get_kyc_submission(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<Json<KycSubmission>, (StatusCode, String)> {
    let user_id = caller_id(&claims)?;

    let conn = &mut state.db.get().map_err(|e| {
        error!("Database connection error: {}", e);
        ApiError::DatabaseConnection(e.to_string())
    })?;

    let submission = kyc_submissions::table
        .find(id)
        .select(KycSubmission::as_select())
        .first::<KycSubmission>(conn)
        .optional()
        .map_err(ApiError::Database)?
        .ok_or_else(|| ApiError::NotFound("KYC submission not found".to_string()))?;

    if submission.user_id != user_id {
        let caller = load_user(conn, user_id)?;
        if !caller.is_admin {
            return Err(ApiError::Forbidden(
                "You do not have access to this submission".to_string(),
            )
            .into());
        }
    }

    Ok(Json(submission))
}

#[utoipa::path(
    post,
    path = "/api/kyc/{id}/approve",
    params(("id" = Uuid, Path, description = "Submission id")),
    responses(
        (status = 200, description = "Submission approved", body = KycSubmission),
        (status = 403, description = "Admin only"),
        (status = 404, description = "Submission not found")
    ),
    security(("bearerAuth" = [])),
    tag = "KYC"
)]
pub async fn approve_kyc(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<Json<KycSubmission>, (StatusCode, String)> {
    let admin_id = caller_id(&claims)?;

    let conn = &mut state.db.get().map_err(|e| {
        error!("Database connection error: {}", e);
        ApiError::DatabaseConnection(e.to_string())
    })?;

    require_admin(conn, admin_id)?;

    // Approval also flips the user's verified flag, in the same
    // transaction so the two never diverge.
    let submission = conn.transaction(|conn| {
        let submission = diesel::update(kyc_submissions::table.find(id))
            .set(kyc_submissions::status.eq("approved"))
            .returning(KycSubmission::as_returning())
            .get_result::<KycSubmission>(conn)
            .optional()?
            .ok_or_else(|| ApiError::NotFound("KYC submission not found".to_string()))?;

        diesel::update(users::table.find(submission.user_id))
            .set(users::kyc_verified.eq(true))
            .execute(conn)?;

        Ok::<KycSubmission, ApiError>(submission)
    })?;

    info!("KYC submission {} approved by admin {}", id, admin_id);
    Ok(Json(submission))
}

#[utoipa::path(
    post,
    path = "/api/kyc/{id}/reject",
    params(("id" = Uuid, Path, description = "Submission id")),
    request_body = RejectKycRequest,
    responses(
        (status = 200, description = "Submission rejected", body = KycSubmission),
        (status = 403, description = "Admin only"),
        (status = 404, description = "Submission not found")
    ),
    security(("bearerAuth" = [])),
    tag = "KYC"
)]
pub async fn reject_kyc(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(req): Json<RejectKycRequest>,
) -> Result<Json<KycSubmission>, (StatusCode, String)> {
    req.validate().map_err(ApiError::Validation)?;
    let admin_id = caller_id(&claims)?;

    let conn = &mut state.db.get().map_err(|e| {
        error!("Database connection error: {}", e);
        ApiError::DatabaseConnection(e.to_string())
    })?;

    require_admin(conn, admin_id)?;

    let submission = diesel::update(kyc_submissions::table.find(id))
        .set((
            kyc_submissions::status.eq("rejected"),
            kyc_submissions::rejection_reason.eq(&req.reason),
        ))
        .returning(KycSubmission::as_returning())
        .get_result::<KycSubmission>(conn)
        .optional()
        .map_err(ApiError::Database)?
        .ok_or_else(|| ApiError::NotFound("KYC submission not found".to_string()))?;

    info!("KYC submission {} rejected by admin {}", id, admin_id);
    Ok(Json(submission))
}

#[utoipa::path(
    delete,
    path = "/api/kyc/{id}",
    params(("id" = Uuid, Path, description = "Submission id")),
    responses(
        (status = 200, description = "Submission deleted", body = MessageResponse),
        (status = 403, description = "Admin only"),
        (status = 404, description = "Submission not found")
    ),
    security(("bearerAuth" = [])),
    tag = "KYC"
)]
pub async fn delete_kyc(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<Json<MessageResponse>, (StatusCode, String)> {
    let admin_id = caller_id(&claims)?;

    let conn = &mut state.db.get().map_err(|e| {
        error!("Database connection error: {}", e);
        ApiError::DatabaseConnection(e.to_string())
    })?;

    require_admin(conn, admin_id)?;

    let deleted = diesel::delete(kyc_submissions::table.find(id))
        .execute(conn)
        .map_err(ApiError::Database)?;
    if deleted == 0 {
        return Err(ApiError::NotFound("KYC submission not found".to_string()).into());
    }

    info!("KYC submission {} deleted by admin {}", id, admin_id);
    Ok(Json(MessageResponse::new("KYC submission deleted successfully")))
}
