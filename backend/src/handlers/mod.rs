use actix_web::web;

pub mod auth;
pub mod challenges;
pub mod time_entries;
pub mod users;

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .configure(auth::configure)
            .configure(challenges::configure)
            .configure(time_entries::configure)
            .configure(users::configure),
    );
}
