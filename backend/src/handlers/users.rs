use actix_web::{web, HttpResponse, Result};

use shared::{ApiError, ApiSuccess};

use crate::models::AppState;
use crate::services::users::{self as user_service, UserError};

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(web::scope("/users").route("/me/streak", web::get().to(get_streak_summary)));
}

async fn get_streak_summary(
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

    match user_service::get_streak_summary(&state.db, &user_id).await {
        Ok(summary) => Ok(HttpResponse::Ok().json(ApiSuccess::new(summary))),
        Err(UserError::NotFound) => Ok(HttpResponse::NotFound().json(ApiError {
            error: "not_found".to_string(),
            message: "User not found".to_string(),
        })),
        Err(e) => {
            log::error!("Error fetching streak summary: {:?}", e);
            Ok(HttpResponse::InternalServerError().json(ApiError {
                error: "internal_error".to_string(),
                message: "Failed to fetch streak summary".to_string(),
            }))
        }
    }
}
