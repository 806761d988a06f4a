use actix_web::{web, HttpResponse, Result};
use chrono::Utc;
use uuid::Uuid;

use shared::{
    ApiError, ApiSuccess, BetAccessDenied, CreateChallengeRequest, DeleteWindowClosed,
    StopSessionRequest,
};

use crate::models::AppState;
use crate::services::challenges::{self as challenge_service, ChallengeError, DELETE_WINDOW_HOURS};
use crate::services::settlement::{self, SettlementError};
use crate::services::clock;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/challenges")
            .route("", web::post().to(create_challenge))
            .route("", web::get().to(list_challenges))
            .route("/{challenge_id}", web::get().to(get_challenge))
            .route("/{challenge_id}", web::delete().to(delete_challenge))
            .route("/{challenge_id}/bet", web::get().to(download_bet))
            .route("/{challenge_id}/sessions/stop", web::post().to(stop_session)),
    );
}

async fn create_challenge(
    state: web::Data<AppState>,
    req: actix_web::HttpRequest,
    body: web::Json<CreateChallengeRequest>,
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

    match challenge_service::create_challenge(&state.db, &user_id, &body.into_inner(), Utc::now())
        .await
    {
        Ok(challenge) => Ok(HttpResponse::Created().json(ApiSuccess::new(challenge))),
        Err(ChallengeError::Validation(message)) => Ok(HttpResponse::BadRequest().json(ApiError {
            error: "validation_error".to_string(),
            message,
        })),
        Err(e) => {
            log::error!("Error creating challenge: {:?}", e);
            Ok(HttpResponse::InternalServerError().json(ApiError {
                error: "internal_error".to_string(),
                message: "Failed to create challenge".to_string(),
            }))
        }
    }
}

async fn list_challenges(
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

    let today = clock::local_day(Utc::now(), state.config.tz_offset_minutes);

    match challenge_service::list_challenges(&state.db, &user_id, &today).await {
        Ok(challenges) => Ok(HttpResponse::Ok().json(ApiSuccess::new(challenges))),
        Err(e) => {
            log::error!("Error listing challenges: {:?}", e);
            Ok(HttpResponse::InternalServerError().json(ApiError {
                error: "internal_error".to_string(),
                message: "Failed to list challenges".to_string(),
            }))
        }
    }
}

async fn get_challenge(
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

    match challenge_service::get_challenge(&state.db, &user_id, &path.into_inner()).await {
        Ok(Some(challenge)) => Ok(HttpResponse::Ok().json(ApiSuccess::new(challenge))),
        Ok(None) => Ok(HttpResponse::NotFound().json(ApiError {
            error: "not_found".to_string(),
            message: "Challenge not found".to_string(),
        })),
        Err(e) => {
            log::error!("Error fetching challenge: {:?}", e);
            Ok(HttpResponse::InternalServerError().json(ApiError {
                error: "internal_error".to_string(),
                message: "Failed to fetch challenge".to_string(),
            }))
        }
    }
}

async fn delete_challenge(
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

    match challenge_service::delete_challenge(&state.db, &user_id, &path.into_inner(), Utc::now())
        .await
    {
        Ok(()) => Ok(HttpResponse::NoContent().finish()),
        Err(ChallengeError::NotFound) => Ok(HttpResponse::NotFound().json(ApiError {
            error: "not_found".to_string(),
            message: "Challenge not found".to_string(),
        })),
        Err(ChallengeError::DeleteWindowClosed {
            created_at,
            deadline,
            hours_elapsed,
        }) => Ok(HttpResponse::Forbidden().json(DeleteWindowClosed {
            error: "delete_window_closed".to_string(),
            message: format!(
                "Challenges can only be deleted within {} hours of creation",
                DELETE_WINDOW_HOURS
            ),
            created_at,
            deadline,
            hours_elapsed,
        })),
        Err(e) => {
            log::error!("Error deleting challenge: {:?}", e);
            Ok(HttpResponse::InternalServerError().json(ApiError {
                error: "internal_error".to_string(),
                message: "Failed to delete challenge".to_string(),
            }))
        }
    }
}

async fn download_bet(
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

    match challenge_service::download_bet(&state.db, &user_id, &path.into_inner()).await {
        Ok(download) => Ok(HttpResponse::Ok().json(ApiSuccess::new(download))),
        Err(ChallengeError::NotFound) => Ok(HttpResponse::NotFound().json(ApiError {
            error: "not_found".to_string(),
            message: "Challenge not found".to_string(),
        })),
        Err(ChallengeError::BetLocked {
            is_completed,
            is_bet_locked,
            has_failed,
        }) => Ok(HttpResponse::Forbidden().json(BetAccessDenied {
            error: "bet_locked".to_string(),
            message: if has_failed {
                "The bet was destroyed when the challenge failed".to_string()
            } else {
                "The bet stays locked until the challenge is completed".to_string()
            },
            is_completed,
            is_bet_locked,
            has_failed,
        })),
        Err(e) => {
            log::error!("Error downloading bet: {:?}", e);
            Ok(HttpResponse::InternalServerError().json(ApiError {
                error: "internal_error".to_string(),
                message: "Failed to download bet".to_string(),
            }))
        }
    }
}

async fn stop_session(
    state: web::Data<AppState>,
    req: actix_web::HttpRequest,
    path: web::Path<Uuid>,
    body: web::Json<StopSessionRequest>,
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

    match settlement::stop_session(
        &state.db,
        &user_id,
        &path.into_inner(),
        request.start_time,
        request.end_time,
        Utc::now(),
        state.config.tz_offset_minutes,
    )
    .await
    {
        Ok(response) => Ok(HttpResponse::Ok().json(ApiSuccess::new(response))),
        Err(SettlementError::ChallengeNotFound) => Ok(HttpResponse::NotFound().json(ApiError {
            error: "not_found".to_string(),
            message: "Challenge not found".to_string(),
        })),
        Err(SettlementError::ChallengeNotActive) => Ok(HttpResponse::Conflict().json(ApiError {
            error: "challenge_not_active".to_string(),
            message: "Challenge is completed or failed and no longer accepts sessions".to_string(),
        })),
        Err(e) => {
            log::error!("Error settling session: {:?}", e);
            Ok(HttpResponse::InternalServerError().json(ApiError {
                error: "internal_error".to_string(),
                message: "Failed to settle session".to_string(),
            }))
        }
    }
}
