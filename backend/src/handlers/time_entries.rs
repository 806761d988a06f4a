use actix_web::{web, HttpResponse, Result};
use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

use shared::{ApiError, ApiSuccess, StartTimeEntryRequest, StopSessionResponse, TimeEntry};

use crate::models::AppState;
use crate::services::settlement::SettlementError;
use crate::services::time_entries::{self as time_entry_service, TimeEntryError};

#[derive(Debug, Serialize)]
struct StopTimeEntryResponse {
    entry: TimeEntry,
    settlement: Option<StopSessionResponse>,
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/time-entries")
            .route("", web::get().to(list_entries))
            .route("/start", web::post().to(start_entry))
            .route("/{entry_id}/stop", web::post().to(stop_entry)),
    );
}

async fn start_entry(
    state: web::Data<AppState>,
    req: actix_web::HttpRequest,
    body: web::Json<StartTimeEntryRequest>,
) -> Result<HttpResponse> {
    let user_id = match crate::middleware::auth::extract_user_id(&req, &state.config.jwt_secret) {
        Ok(id) => id,
        Err(_) => {
            return Ok(HttpResponse::Unauthorized().json(ApiError {
                error: "unauthorized".to_string(),
                message: "Invalid or missing token".to_string(),
            }));
        }
    };

    let request = body.into_inner();

    match time_entry_service::start_entry(
        &state.db,
        &user_id,
        request.challenge_id.as_ref(),
        Utc::now(),
    )
    .await
    {
        Ok(entry) => Ok(HttpResponse::Created().json(ApiSuccess::new(entry))),
        Err(e) => {
            log::error!("Error starting time entry: {:?}", e);
            Ok(HttpResponse::InternalServerError().json(ApiError {
                error: "internal_error".to_string(),
                message: "Failed to start time entry".to_string(),
            }))
        }
    }
}

async fn stop_entry(
    state: web::Data<AppState>,
    req: actix_web::HttpRequest,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let user_id = match crate::middleware::auth::extract_user_id(&req, &state.config.jwt_secret) {
        Ok(id) => id,
        Err(_) => {
            return Ok(HttpResponse::Unauthorized().json(ApiError {
                error: "unauthorized".to_string(),
                message: "Invalid or missing token".to_string(),
            }));
        }
    };

    match time_entry_service::stop_entry(
        &state.db,
        &user_id,
        &path.into_inner(),
        Utc::now(),
        state.config.tz_offset_minutes,
    )
    .await
    {
        Ok((entry, settlement)) => {
            Ok(HttpResponse::Ok().json(ApiSuccess::new(StopTimeEntryResponse { entry, settlement })))
        }
        Err(TimeEntryError::NotFound) => Ok(HttpResponse::NotFound().json(ApiError {
            error: "not_found".to_string(),
            message: "Time entry not found".to_string(),
        })),
        Err(TimeEntryError::NotRunning) => Ok(HttpResponse::Conflict().json(ApiError {
            error: "not_running".to_string(),
            message: "Time entry is already stopped".to_string(),
        })),
        Err(TimeEntryError::SettlementError(SettlementError::ChallengeNotFound)) => {
            Ok(HttpResponse::NotFound().json(ApiError {
                error: "not_found".to_string(),
                message: "Challenge not found".to_string(),
            }))
        }
        Err(TimeEntryError::SettlementError(SettlementError::ChallengeNotActive)) => {
            Ok(HttpResponse::Conflict().json(ApiError {
                error: "challenge_not_active".to_string(),
                message: "Challenge is completed or failed and no longer accepts sessions"
                    .to_string(),
            }))
        }
        Err(e) => {
            log::error!("Error stopping time entry: {:?}", e);
            Ok(HttpResponse::InternalServerError().json(ApiError {
                error: "internal_error".to_string(),
                message: "Failed to stop time entry".to_string(),
            }))
        }
    }
}

async fn list_entries(
    state: web::Data<AppState>,
    req: actix_web::HttpRequest,
) -> Result<HttpResponse> {
    let user_id = match crate::middleware::auth::extract_user_id(&req, &state.config.jwt_secret) {
        Ok(id) => id,
        Err(_) => {
            return Ok(HttpResponse::Unauthorized().json(ApiError {
                error: "unauthorized".to_string(),
                message: "Invalid or missing token".to_string(),
            }));
        }
    };

    match time_entry_service::list_entries(&state.db, &user_id).await {
        Ok(entries) => Ok(HttpResponse::Ok().json(ApiSuccess::new(entries))),
        Err(e) => {
            log::error!("Error listing time entries: {:?}", e);
            Ok(HttpResponse::InternalServerError().json(ApiError {
                error: "internal_error".to_string(),
                message: "Failed to list time entries".to_string(),
            }))
        }
    }
}
